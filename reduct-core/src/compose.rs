//! Right-to-left function composition

/// A boxed single-argument function from `T` to `T`
pub type BoxedFn<T> = Box<dyn Fn(T) -> T>;

/// Compose functions right to left.
///
/// `compose(vec![f1, f2, f3])(x)` is `f1(f2(f3(x)))`. An empty list yields
/// the identity function and a single function is returned unchanged.
///
/// # Example
/// ```
/// use reduct_core::compose;
///
/// let double_then_inc = compose::<i32>(vec![
///     Box::new(|x: i32| x + 1),
///     Box::new(|x: i32| x * 2),
/// ]);
/// assert_eq!(double_then_inc(5), 11);
/// ```
pub fn compose<T: 'static>(fns: Vec<BoxedFn<T>>) -> BoxedFn<T> {
    fns.into_iter()
        .reduce(|outer, inner| -> BoxedFn<T> { Box::new(move |x: T| outer(inner(x))) })
        .unwrap_or_else(|| -> BoxedFn<T> { Box::new(|x: T| x) })
}
