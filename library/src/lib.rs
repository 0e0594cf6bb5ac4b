//! Lazily composed per-element computations ("fields") compiled into procedures and
//! evaluated in batches over index masks.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod field;
pub mod function;
pub mod procedure;
pub mod types;
mod util;

pub use config::EvaluationConfig;
pub use error::FieldError;
pub use evaluation::{
    FieldEvaluator, build_procedure, evaluate_constant_field, evaluate_fields,
    evaluate_fields_with_config,
};
pub use field::{ArrayInput, Field, FieldInput, FieldSource, FieldSourceKind, IndexInput};
pub use function::{
    ConstantFunction, ElementwiseFunction, ExecutionContext, FunctionParams, MultiFunction,
    Signature,
};
pub use procedure::{Procedure, ValidationError};
pub use types::{DataType, IndexMask, VArray, Value};
