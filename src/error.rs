use thiserror::Error;

/// Failures reported by a collaborator (profile source or snapshot store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),
    /// A stored snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn backend<M: Into<String>>(message: M) -> Self {
        StoreError::Backend(message.into())
    }
}

/// Errors produced by the matching layer.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The subject has no profile. Not retried.
    #[error("no profile found for subject `{0}`")]
    NotFound(String),
    /// Candidate pool load or persistence failed. Nothing was cached.
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] StoreError),
    /// Caller supplied an unusable argument.
    #[error("invalid request: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_into_collaborator() {
        let err: MatchError = StoreError::backend("connection reset").into();
        assert!(matches!(err, MatchError::Collaborator(StoreError::Backend(_))));
        assert_eq!(
            err.to_string(),
            "collaborator failure: store backend error: connection reset"
        );
    }

    #[test]
    fn not_found_names_the_subject() {
        let err = MatchError::NotFound("student-7".into());
        assert!(err.to_string().contains("student-7"));
    }
}
