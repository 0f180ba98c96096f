//! Exact-match list filters.

use std::fmt;

/// A single filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// String equality.
    Str(String),
    /// Boolean equality.
    Bool(bool),
}

impl FilterValue {
    /// Render the value as a query-string parameter.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        match self {
            Self::Str(value) => value.clone(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// An ordered set of exact-match filters keyed by wire field name.
///
/// Every filter must match for a record to be returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, FilterValue)>);

impl Filters {
    /// Create an empty filter set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add an exact-match filter on `field`.
    ///
    /// A later filter on the same field replaces the earlier one.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(existing) => existing.1 = value,
            None => self.0.push((field, value)),
        }
        self
    }

    /// Iterate over `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    /// Returns true if no filters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (field, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_keep_insertion_order() {
        let filters = Filters::new().eq("clusterId", "c-1").eq("name", "billing");
        let fields: Vec<_> = filters.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, ["clusterId", "name"]);
    }

    #[test]
    fn filters_replace_duplicate_field() {
        let filters = Filters::new().eq("expired", true).eq("expired", false);
        assert_eq!(filters.iter().count(), 1);
        assert_eq!(
            filters.iter().next().unwrap().1,
            &FilterValue::Bool(false)
        );
    }

    #[test]
    fn filters_display() {
        let filters = Filters::new().eq("userId", "u-1").eq("expired", false);
        assert_eq!(filters.to_string(), r#"userId="u-1", expired=false"#);
    }

    #[test]
    fn query_values() {
        assert_eq!(FilterValue::from(true).to_query_value(), "true");
        assert_eq!(FilterValue::from("prod").to_query_value(), "prod");
    }
}
