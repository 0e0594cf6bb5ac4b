//! Field graph nodes.
//!
//! A `Field` is a cheap handle to one output of a shared, immutable `FieldSource`.
//! Sources are either leaf inputs or operations over other fields. Every source gets a
//! unique id when it is created; evaluation deduplicates by that id, so two sources
//! built separately are never merged even if they compute the same thing.

mod input;

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::FieldError;
use crate::function::{ConstantFunction, MultiFunction};
use crate::types::{DataType, Value};

pub use input::{ArrayInput, FieldInput, IndexInput};

/// Shared graph node behind one or more fields.
///
/// Not `Clone`: a copy would carry the same id, so share it through `Arc` instead.
pub struct FieldSource {
    id: Uuid,
    kind: FieldSourceKind,
}

pub enum FieldSourceKind {
    Input(Arc<dyn FieldInput>),
    Operation(FieldOperation),
}

/// A function applied to input fields.
pub struct FieldOperation {
    function: Arc<dyn MultiFunction>,
    inputs: Vec<Field>,
}

impl FieldOperation {
    pub fn function(&self) -> &Arc<dyn MultiFunction> {
        &self.function
    }

    pub fn inputs(&self) -> &[Field] {
        &self.inputs
    }
}

impl Drop for FieldOperation {
    // Unlink with a worklist; recursive drops overflow the stack on deep chains.
    // Sources still referenced elsewhere keep their inputs.
    fn drop(&mut self) {
        let mut fields_to_release = std::mem::take(&mut self.inputs);
        while let Some(field) = fields_to_release.pop() {
            let Some(mut source) = Arc::into_inner(field.source) else {
                continue;
            };
            if let FieldSourceKind::Operation(operation) = &mut source.kind {
                fields_to_release.append(&mut operation.inputs);
            }
        }
    }
}

impl FieldSource {
    pub fn new_input(input: Arc<dyn FieldInput>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            kind: FieldSourceKind::Input(input),
        })
    }

    /// Create an operation node. Input fields must match the function's signature.
    ///
    /// Inputs have to exist before the operation, so graphs are acyclic by construction.
    pub fn new_operation(
        function: Arc<dyn MultiFunction>,
        inputs: Vec<Field>,
    ) -> Result<Arc<Self>, FieldError> {
        let signature = function.signature();
        if signature.inputs.len() != inputs.len() {
            return Err(FieldError::invalid_field(format!(
                "{} takes {} inputs, got {}",
                signature.name,
                signature.inputs.len(),
                inputs.len()
            )));
        }
        for (param, field) in signature.inputs.iter().zip(&inputs) {
            if param.data_type != field.data_type() {
                return Err(FieldError::type_mismatch(
                    format!("{}.{}", signature.name, param.name),
                    param.data_type,
                    field.data_type(),
                ));
            }
        }
        Ok(Arc::new(Self {
            id: Uuid::new_v4(),
            kind: FieldSourceKind::Operation(FieldOperation { function, inputs }),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &FieldSourceKind {
        &self.kind
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, FieldSourceKind::Input(_))
    }

    pub fn output_count(&self) -> usize {
        match &self.kind {
            FieldSourceKind::Input(_) => 1,
            FieldSourceKind::Operation(op) => op.function.signature().outputs.len(),
        }
    }

    pub fn output_type(&self, index: usize) -> Option<DataType> {
        match &self.kind {
            FieldSourceKind::Input(input) if index == 0 => Some(input.data_type()),
            FieldSourceKind::Input(_) => None,
            FieldSourceKind::Operation(op) => op
                .function
                .signature()
                .outputs
                .get(index)
                .map(|p| p.data_type),
        }
    }
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldSourceKind::Input(input) => {
                write!(f, "Input({}, {})", input.debug_name(), self.id)
            }
            FieldSourceKind::Operation(op) => {
                write!(f, "Operation({}, {})", op.function.name(), self.id)
            }
        }
    }
}

/// Handle to one output of a field source.
#[derive(Clone)]
pub struct Field {
    source: Arc<FieldSource>,
    output_index: usize,
    data_type: DataType,
}

impl Field {
    pub fn new(source: Arc<FieldSource>, output_index: usize) -> Result<Self, FieldError> {
        let data_type = source.output_type(output_index).ok_or_else(|| {
            FieldError::invalid_field(format!(
                "output {} requested from {:?}, which has {} outputs",
                output_index,
                source,
                source.output_count()
            ))
        })?;
        Ok(Self {
            source,
            output_index,
            data_type,
        })
    }

    pub fn from_input(input: impl FieldInput + 'static) -> Self {
        Self::from_shared_input(Arc::new(input))
    }

    pub fn from_shared_input(input: Arc<dyn FieldInput>) -> Self {
        let data_type = input.data_type();
        Self {
            source: FieldSource::new_input(input),
            output_index: 0,
            data_type,
        }
    }

    /// First output of a new operation.
    pub fn from_operation(
        function: Arc<dyn MultiFunction>,
        inputs: Vec<Field>,
    ) -> Result<Self, FieldError> {
        Self::new(FieldSource::new_operation(function, inputs)?, 0)
    }

    /// One field per output of a new operation, sharing a single source.
    pub fn operation_outputs(
        function: Arc<dyn MultiFunction>,
        inputs: Vec<Field>,
    ) -> Result<Vec<Self>, FieldError> {
        let source = FieldSource::new_operation(function, inputs)?;
        (0..source.output_count())
            .map(|i| Self::new(source.clone(), i))
            .collect()
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        let data_type = value.data_type();
        let source = Arc::new(FieldSource {
            id: Uuid::new_v4(),
            kind: FieldSourceKind::Operation(FieldOperation {
                function: Arc::new(ConstantFunction::new(value)),
                inputs: Vec::new(),
            }),
        });
        Self {
            source,
            output_index: 0,
            data_type,
        }
    }

    pub fn source(&self) -> &Arc<FieldSource> {
        &self.source
    }

    pub fn source_id(&self) -> Uuid {
        self.source.id
    }

    pub fn output_index(&self) -> usize {
        self.output_index
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_input(&self) -> bool {
        self.source.is_input()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("source", &self.source)
            .field("output_index", &self.output_index)
            .field("data_type", &self.data_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{ElementwiseFunction, Signature};

    fn add() -> Arc<dyn MultiFunction> {
        Arc::new(ElementwiseFunction::binary(
            "add",
            DataType::Float,
            DataType::Float,
            DataType::Float,
            |a, b| Ok(Value::Float(a.as_float().unwrap_or(0.0) + b.as_float().unwrap_or(0.0))),
        ))
    }

    #[test]
    fn test_clones_share_source() {
        let field = Field::constant(1.0f32);
        let copy = field.clone();
        assert_eq!(field.source_id(), copy.source_id());
        assert!(Arc::ptr_eq(field.source(), copy.source()));
    }

    #[test]
    fn test_identical_inputs_have_distinct_ids() {
        let a = Field::from_input(IndexInput);
        let b = Field::from_input(IndexInput);
        assert_ne!(a.source_id(), b.source_id());
    }

    #[test]
    fn test_operation_checks_arity() {
        let result = Field::from_operation(add(), vec![Field::constant(1.0f32)]);
        assert!(matches!(result, Err(FieldError::InvalidField(_))));
    }

    #[test]
    fn test_operation_checks_input_types() {
        let result =
            Field::from_operation(add(), vec![Field::constant(1.0f32), Field::constant(2)]);
        assert!(matches!(result, Err(FieldError::TypeMismatch { .. })));
    }

    #[test]
    fn test_output_index_out_of_range() {
        let inputs = vec![Field::constant(1.0f32), Field::constant(2.0f32)];
        let source = FieldSource::new_operation(add(), inputs).unwrap();
        assert!(Field::new(source.clone(), 0).is_ok());
        assert!(Field::new(source, 1).is_err());
    }

    #[test]
    fn test_operation_outputs_types() {
        let split = Arc::new(ElementwiseFunction::new(
            Signature::new("split")
                .input("v", DataType::Float3)
                .output("x", DataType::Float)
                .output("positive", DataType::Bool),
            |args| {
                let v = args[0].as_float3().unwrap_or_default();
                Ok(vec![Value::Float(v[0]), Value::Bool(v[0] > 0.0)])
            },
        ));
        let outputs =
            Field::operation_outputs(split, vec![Field::constant([1.0f32, 0.0, 0.0])]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].data_type(), DataType::Float);
        assert_eq!(outputs[1].data_type(), DataType::Bool);
        assert_eq!(outputs[0].source_id(), outputs[1].source_id());
    }

    fn negate() -> Arc<dyn MultiFunction> {
        Arc::new(ElementwiseFunction::unary("negate", DataType::Float, DataType::Float, |a| {
            Ok(Value::Float(-a.as_float().unwrap_or(0.0)))
        }))
    }

    #[test]
    fn test_drop_deep_chain() {
        let mut field = Field::constant(1.0f32);
        for _ in 0..100_000 {
            field = Field::from_operation(negate(), vec![field]).unwrap();
        }
        drop(field);
    }

    #[test]
    fn test_drop_keeps_shared_inputs() {
        let shared = Field::from_operation(negate(), vec![Field::constant(1.0f32)]).unwrap();
        let mut field = shared.clone();
        for _ in 0..1_000 {
            field = Field::from_operation(negate(), vec![field]).unwrap();
        }
        drop(field);
        assert_eq!(Arc::strong_count(shared.source()), 1);
        match shared.source().kind() {
            FieldSourceKind::Operation(operation) => assert_eq!(operation.inputs().len(), 1),
            FieldSourceKind::Input(_) => panic!("expected an operation"),
        }
    }
}
