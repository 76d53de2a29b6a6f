use thiserror::Error;

/// Failures inside one pipeline invocation. These are internal: the public
/// operations fail closed to a skip outcome and never surface them to the
/// caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Capability output did not conform to its schema or violated a
    /// structural invariant.
    #[error("validation failure: {0}")]
    Validation(String),
    /// A consumed capability (classification, retrieval, generation) was
    /// unreachable or returned an error.
    #[error("upstream capability failure: {0}")]
    Upstream(String),
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn errors_render_their_category() {
        assert_eq!(
            PipelineError::Validation("missing creative_brief".to_string()).to_string(),
            "validation failure: missing creative_brief"
        );
        assert_eq!(
            PipelineError::Upstream("connection refused".to_string()).to_string(),
            "upstream capability failure: connection refused"
        );
    }
}
