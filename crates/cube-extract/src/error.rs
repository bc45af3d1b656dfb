use crate::axis::Axis;
use crate::config::Backend;
use crate::session::QueryDialect;
use cube_outline::{NativeError, OutlineError};

pub type ExtractResult<T> = Result<T, ExtractError>;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Outline(#[from] OutlineError),

    #[error("unknown dimension on the {axis} axis: {dimension}")]
    UnknownDimension { axis: Axis, dimension: String },

    #[error("dimension {dimension} is assigned to both the {first} and {second} axes")]
    DuplicateDimension {
        dimension: String,
        first: Axis,
        second: Axis,
    },

    #[error("extract has no column dimension")]
    NoColumnDimension,

    #[error("{backend} does not support the {axis} axis (dimensions: {dimensions})")]
    UnsupportedAxis {
        backend: Backend,
        axis: Axis,
        dimensions: String,
    },

    #[error("{backend} supports a single column dimension, got {count}: {dimensions}")]
    TooManyColumnDimensions {
        backend: Backend,
        count: usize,
        dimensions: String,
    },

    #[error("cannot partition on {dimension}: {reason}")]
    InvalidPartition { dimension: String, reason: String },

    #[error("invalid {option}: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("unexpected {got} response to {dialect} query")]
    UnexpectedResponse {
        dialect: QueryDialect,
        got: &'static str,
    },

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
