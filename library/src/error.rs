use thiserror::Error;

use crate::procedure::ValidationError;
use crate::types::DataType;

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Requested {fields} fields but got {outputs} output buffers")]
    OutputCountMismatch { fields: usize, outputs: usize },
    #[error("Output buffer {index} holds {len} elements, mask needs {required}")]
    BufferTooSmall {
        index: usize,
        len: usize,
        required: usize,
    },
    #[error("Invalid index mask: {0}")]
    InvalidMask(String),
    #[error("Invalid field: {0}")]
    InvalidField(String),
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: DataType,
        found: DataType,
    },
    #[error("Invalid procedure: {}", format_validation_errors(.0))]
    InvalidProcedure(Vec<ValidationError>),
    #[error("Parameter not bound: {0}")]
    UnboundParameter(String),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Execution error: {0}")]
    Execution(String),
}

impl FieldError {
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        FieldError::InvalidField(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        FieldError::Input(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        FieldError::Execution(msg.into())
    }

    pub fn type_mismatch(context: impl Into<String>, expected: DataType, found: DataType) -> Self {
        FieldError::TypeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
