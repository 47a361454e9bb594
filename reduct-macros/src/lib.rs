//! Procedural macros for reduct

use darling::ast::Style;
use darling::{FromDeriveInput, FromMeta, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Namespace the store reserves for its own actions
const RESERVED_PREFIX: &str = "@@reduct/";

/// Case conventions accepted by `#[action(rename_all = "..")]`
#[derive(Debug, Clone, Copy)]
enum RenameRule {
    Snake,
    ScreamingSnake,
    Kebab,
}

impl FromMeta for RenameRule {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value {
            "snake_case" => Ok(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
            "kebab-case" => Ok(RenameRule::Kebab),
            other => Err(darling::Error::unknown_value(other)),
        }
    }
}

impl RenameRule {
    fn apply(self, variant: &str) -> String {
        let parts = split_pascal_case(variant);
        match self {
            RenameRule::Snake => join_lower(&parts, "_"),
            RenameRule::ScreamingSnake => join_lower(&parts, "_").to_uppercase(),
            RenameRule::Kebab => join_lower(&parts, "-"),
        }
    }
}

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Prepended to every generated name, e.g. `"todos/"`
    #[darling(default)]
    prefix: Option<String>,

    /// Case convention for variant names without an explicit rename
    #[darling(default)]
    rename_all: Option<RenameRule>,

    /// Also implement `ActionSummary` with its default (Debug) summary
    #[darling(default)]
    summary: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit action type, used verbatim apart from the container prefix
    #[darling(default)]
    rename: Option<String>,
}

/// Split a PascalCase string into parts
fn split_pascal_case(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in s.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            parts.push(current);
            current = String::new();
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Match arm mapping one variant, whatever its field style, to its type
fn name_arm(
    enum_name: &Ident,
    variant: &Ident,
    style: &Style,
    action_type: &str,
) -> proc_macro2::TokenStream {
    match style {
        Style::Unit => quote! { #enum_name::#variant => #action_type },
        Style::Tuple => quote! { #enum_name::#variant(..) => #action_type },
        Style::Struct => quote! { #enum_name::#variant { .. } => #action_type },
    }
}

fn join_lower(parts: &[String], separator: &str) -> String {
    parts
        .iter()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method returning the action type of each variant.
/// By default the type is the variant name.
///
/// # Attributes
///
/// - `#[action(prefix = "todos/")]` on the enum prepends a namespace
/// - `#[action(rename_all = "snake_case")]` on the enum changes the case
///   convention (`snake_case`, `SCREAMING_SNAKE_CASE`, `kebab-case`)
/// - `#[action(summary)]` on the enum also implements `ActionSummary`
/// - `#[action(rename = "added")]` on a variant sets its type explicitly
///
/// Types in the `@@reduct/` namespace are rejected at compile time.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(prefix = "todos/", rename_all = "snake_case")]
/// enum TodoAction {
///     AddTodo { text: String },
///     #[action(rename = "toggle")]
///     ToggleTodo(usize),
/// }
///
/// assert_eq!(TodoAction::AddTodo { text: "x".into() }.name(), "todos/add_todo");
/// assert_eq!(TodoAction::ToggleTodo(0).name(), "todos/toggle");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let prefix = opts.prefix.as_deref().unwrap_or_default();
    let mut errors = darling::Error::accumulator();

    let name_arms: Vec<_> = variants
        .iter()
        .map(|v| {
            let variant_name = &v.ident;
            let base = match (&v.rename, opts.rename_all) {
                (Some(rename), _) => rename.clone(),
                (None, Some(rule)) => rule.apply(&variant_name.to_string()),
                (None, None) => variant_name.to_string(),
            };
            let action_type = format!("{prefix}{base}");

            if action_type.starts_with(RESERVED_PREFIX) {
                errors.push(
                    darling::Error::custom(format!(
                        "action type \"{action_type}\" uses the reserved \"{RESERVED_PREFIX}\" namespace"
                    ))
                    .with_span(variant_name),
                );
            }

            name_arm(name, variant_name, &v.fields.style, &action_type)
        })
        .collect();

    if let Err(e) = errors.finish() {
        return e.write_errors().into();
    }

    let match_body = if name_arms.is_empty() {
        quote! { match *self {} }
    } else {
        quote! {
            match self {
                #(#name_arms),*
            }
        }
    };

    let mut expanded = quote! {
        impl #impl_generics ::reduct::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &str {
                #match_body
            }
        }
    };

    if opts.summary {
        expanded.extend(quote! {
            impl #impl_generics ::reduct::ActionSummary for #name #ty_generics #where_clause {}
        });
    }

    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pascal_case() {
        assert_eq!(split_pascal_case("AddTodo"), vec!["Add", "Todo"]);
        assert_eq!(split_pascal_case("Tick"), vec!["Tick"]);
    }

    #[test]
    fn test_rename_rules() {
        assert_eq!(RenameRule::Snake.apply("SetVisibilityFilter"), "set_visibility_filter");
        assert_eq!(RenameRule::ScreamingSnake.apply("AddTodo"), "ADD_TODO");
        assert_eq!(RenameRule::Kebab.apply("AddTodo"), "add-todo");
    }

    #[test]
    fn test_name_arm_per_style() {
        let span = proc_macro2::Span::call_site();
        let enum_name = Ident::new("TodoAction", span);
        let variant = Ident::new("Add", span);

        let arm = |style| name_arm(&enum_name, &variant, &style, "add").to_string();
        assert_eq!(arm(Style::Unit), quote! { TodoAction::Add => "add" }.to_string());
        assert_eq!(arm(Style::Tuple), quote! { TodoAction::Add(..) => "add" }.to_string());
        assert_eq!(
            arm(Style::Struct),
            quote! { TodoAction::Add { .. } => "add" }.to_string()
        );
    }
}
