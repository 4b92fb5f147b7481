//! Error type for criteria execution.

/// Error returned by [`Criteria`](super::Criteria) and scope dispatch
///
/// Backend and store failures are folded into `QueryFailed`; callers tell the
/// categories apart with the `is_*` helpers or by matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    /// Execution was attempted before any restriction was added
    EmptySelector,
    /// The backend call, response parsing, or record fetch failed
    QueryFailed(String),
    /// `call` named an operation nothing on the criteria or model provides
    UnknownOperation(String),
}

impl CriteriaError {
    pub fn is_empty_selector(&self) -> bool {
        matches!(self, CriteriaError::EmptySelector)
    }

    pub fn is_query_failed(&self) -> bool {
        matches!(self, CriteriaError::QueryFailed(_))
    }

    pub fn is_unknown_operation(&self) -> bool {
        matches!(self, CriteriaError::UnknownOperation(_))
    }
}

impl std::fmt::Display for CriteriaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriteriaError::EmptySelector => {
                write!(f, "Criteria selector is empty, add a restriction before searching")
            }
            CriteriaError::QueryFailed(msg) => write!(f, "Search query failed: {}", msg),
            CriteriaError::UnknownOperation(name) => {
                write!(f, "Unknown criteria operation: {}", name)
            }
        }
    }
}

impl std::error::Error for CriteriaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(CriteriaError::EmptySelector.is_empty_selector());
        assert!(CriteriaError::QueryFailed("x".into()).is_query_failed());
        assert!(CriteriaError::UnknownOperation("x".into()).is_unknown_operation());
        assert!(!CriteriaError::EmptySelector.is_query_failed());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CriteriaError::QueryFailed("timeout".into()).to_string(),
            "Search query failed: timeout"
        );
        assert!(CriteriaError::EmptySelector.to_string().contains("empty"));
    }
}
