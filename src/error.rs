use thiserror::Error;

pub type DesignResult<T> = Result<T, DesignError>;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("template parse error: {reason}")]
    TemplateParse { reason: String },

    // A reference without the alias segment means the design settings are
    // broken, not that the entity is missing data.
    #[error("malformed variable '{variable}': missing $entity.variable type")]
    MalformedVariable { variable: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DesignError {
    pub(crate) fn template(reason: impl Into<String>) -> Self {
        DesignError::TemplateParse {
            reason: reason.into(),
        }
    }

    /// True for the errors that abort a single render (as opposed to engine setup).
    pub fn is_render_fatal(&self) -> bool {
        matches!(
            self,
            DesignError::TemplateParse { .. } | DesignError::MalformedVariable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = DesignError::MalformedVariable {
            variable: "$invoice".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed variable '$invoice': missing $entity.variable type"
        );
        assert!(err.is_render_fatal());

        let err = DesignError::template("template is empty");
        assert_eq!(err.to_string(), "template parse error: template is empty");
    }

    #[test]
    fn io_errors_are_not_render_fatal() {
        let err: DesignError = std::io::Error::other("disk full").into();
        assert!(!err.is_render_fatal());
        assert!(matches!(err, DesignError::Io(_)));
    }
}
