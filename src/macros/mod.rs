//! Convenience macros.

/// Build a [`Predicate`](crate::Predicate) from ordered `field => value` pairs.
///
/// # Example
/// ```
/// use lifeguard_search::{predicate, SearchQuery};
///
/// let query = SearchQuery::new().filter(predicate! { "tags" => "nerd", "age" => 30 });
/// assert_eq!(query.selector(), "(tags:nerd AND age:30)");
///
/// let price = predicate! { "price" => 10..=20 };
/// assert_eq!(SearchQuery::new().between(price).selector(), "((price:[10 TO 20]))");
/// ```
#[macro_export]
macro_rules! predicate {
    () => {
        $crate::Predicate::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Predicate::new()$(.with($field, $value))+
    };
}
