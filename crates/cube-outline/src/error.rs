use crate::native::NativeError;

pub type OutlineResult<T> = Result<T, OutlineError>;

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("unrecognized member in {dimension}: {spec}")]
    UnknownMember { dimension: String, spec: String },

    #[error("member selection in {dimension} is empty: {spec}")]
    EmptySelection { dimension: String, spec: String },

    #[error("invalid member specification in {dimension}: {spec} ({reason})")]
    InvalidSpec {
        dimension: String,
        spec: String,
        reason: String,
    },

    #[error("corrupt hierarchy for {dimension}: {reason}")]
    CorruptHierarchy { dimension: String, reason: String },

    #[error(
        "member query in {dimension} returned {member} under {parent}, \
         but no instance of {member} has that parent"
    )]
    NativeMismatch {
        dimension: String,
        member: String,
        parent: String,
    },

    #[error("{spec} in {dimension} needs a live session to resolve")]
    SessionRequired { dimension: String, spec: String },

    #[error(transparent)]
    Native(#[from] NativeError),
}

impl OutlineError {
    pub(crate) fn unknown_member(dimension: &str, spec: &str) -> Self {
        OutlineError::UnknownMember {
            dimension: dimension.to_string(),
            spec: spec.to_string(),
        }
    }

    pub(crate) fn invalid_spec(dimension: &str, spec: &str, reason: impl Into<String>) -> Self {
        OutlineError::InvalidSpec {
            dimension: dimension.to_string(),
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(dimension: &str, reason: impl Into<String>) -> Self {
        OutlineError::CorruptHierarchy {
            dimension: dimension.to_string(),
            reason: reason.into(),
        }
    }
}
