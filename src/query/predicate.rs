//! Ordered field → value mappings.

use super::value::SearchValue;

/// An ordered mapping of field names to values
///
/// Insertion order is kept so the compiled fragment is deterministic. Setting
/// the same field twice replaces the earlier value in place.
///
/// # Example
///
/// ```
/// use lifeguard_search::Predicate;
///
/// let predicate = Predicate::new().with("tags", "nerd").with("name", "Joe");
/// assert_eq!(predicate.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    fields: Vec<(String, SearchValue)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field
    pub fn with(mut self, field: impl Into<String>, value: impl Into<SearchValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<SearchValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&SearchValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SearchValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Rewrite every value with `f`, keeping field order
    pub(crate) fn map_values(self, f: impl Fn(SearchValue) -> SearchValue) -> Self {
        Self {
            fields: self
                .fields
                .into_iter()
                .map(|(name, value)| (name, f(value)))
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Predicate
where
    K: Into<String>,
    V: Into<SearchValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut predicate = Predicate::new();
        for (field, value) in iter {
            predicate.insert(field, value);
        }
        predicate
    }
}

impl<K, V> From<(K, V)> for Predicate
where
    K: Into<String>,
    V: Into<SearchValue>,
{
    fn from((field, value): (K, V)) -> Self {
        Predicate::new().with(field, value)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Predicate
where
    K: Into<String>,
    V: Into<SearchValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let predicate = Predicate::new().with("b", 1).with("a", 2);
        let names: Vec<&str> = predicate.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_field_replaces_in_place() {
        let predicate = Predicate::new().with("a", 1).with("b", 2).with("a", 3);
        assert_eq!(predicate.len(), 2);
        assert_eq!(predicate.get("a"), Some(&SearchValue::Int(3)));
        assert_eq!(predicate.iter().next().map(|(name, _)| name), Some("a"));
    }

    #[test]
    fn test_from_array() {
        let predicate = Predicate::from([("name", "Pants"), ("color", "blue")]);
        assert_eq!(predicate.get("color"), Some(&SearchValue::from("blue")));
    }
}
