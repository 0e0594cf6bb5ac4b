//! Builds one procedure computing a batch of fields.

use std::collections::HashSet;

use super::variable_map::UniqueVariableMap;
use crate::config::EvaluationConfig;
use crate::error::FieldError;
use crate::field::{Field, FieldSourceKind};
use crate::procedure::{Procedure, ProcedureBuilder, VariableId};

/// Create variables and calls for every source reachable from `fields`.
///
/// Uses an explicit stack instead of recursion. An operation whose inputs are not all
/// mapped yet stays on the stack and its first missing input is pushed on top of it, so
/// dependencies are always emitted before the calls that read them. Each source is
/// materialized once no matter how many fields reference it.
pub(crate) fn add_unique_variables(
    fields: &[Field],
    builder: &mut ProcedureBuilder<'_>,
    unique_variables: &mut UniqueVariableMap,
) -> Result<(), FieldError> {
    let mut fields_to_visit: Vec<&Field> = fields.iter().collect();

    while let Some(&field) = fields_to_visit.last() {
        let source = field.source();
        if unique_variables.contains(source.id()) {
            fields_to_visit.pop();
            continue;
        }

        match source.kind() {
            FieldSourceKind::Input(input) => {
                fields_to_visit.pop();
                let variable = builder.add_input_parameter(field.data_type(), input.debug_name());
                unique_variables.add(source.id(), vec![variable]);
            }
            FieldSourceKind::Operation(operation) => {
                let missing = operation
                    .inputs()
                    .iter()
                    .find(|input| !unique_variables.contains(input.source_id()));
                if let Some(missing) = missing {
                    fields_to_visit.push(missing);
                    continue;
                }

                fields_to_visit.pop();

                let mut inputs = Vec::with_capacity(operation.inputs().len());
                let mut unique_inputs = HashSet::new();
                for input_field in operation.inputs() {
                    let variable = field_variable(input_field, unique_variables)?;
                    unique_inputs.insert(variable);
                    inputs.push(variable);
                }
                if unique_inputs.len() < inputs.len() {
                    log::trace!(
                        "{} reads {} distinct variables through {} inputs",
                        operation.function().name(),
                        unique_inputs.len(),
                        inputs.len()
                    );
                }

                let outputs = builder.add_call(operation.function(), &inputs);
                unique_variables.add(source.id(), outputs);
            }
        }
    }
    Ok(())
}

/// Release every variable that is not one of the requested outputs.
///
/// All destructs go at the end, in the order sources were materialized. Interleaving
/// them with the calls would need liveness analysis.
pub(crate) fn add_destructs(
    fields: &[Field],
    builder: &mut ProcedureBuilder<'_>,
    unique_variables: &UniqueVariableMap,
) -> Result<(), FieldError> {
    let mut outputs = HashSet::new();
    for field in fields {
        outputs.insert(field_variable(field, unique_variables)?);
    }

    for variable in unique_variables.variables() {
        if !outputs.contains(&variable) {
            builder.add_destruct(variable);
        }
    }
    Ok(())
}

/// Build and validate the procedure for a batch of operation fields.
///
/// Input fields must be handled by the caller; an input variable cannot also be an
/// output parameter.
pub(crate) fn build_procedure(
    fields: &[Field],
    config: &EvaluationConfig,
) -> Result<(Procedure, UniqueVariableMap), FieldError> {
    if let Some(input) = fields.iter().find(|f| f.is_input()) {
        return Err(FieldError::invalid_field(format!(
            "{:?} is an input and cannot be a procedure output",
            input.source()
        )));
    }

    let mut procedure = Procedure::new();
    let mut unique_variables = UniqueVariableMap::new();
    {
        let mut builder = ProcedureBuilder::new(&mut procedure);
        add_unique_variables(fields, &mut builder, &mut unique_variables)?;
        add_destructs(fields, &mut builder, &unique_variables)?;
        builder.add_return();
        for field in fields {
            builder.add_output_parameter(field_variable(field, &unique_variables)?);
        }
    }

    if config.dump_procedures {
        log::trace!("built procedure:\n{}", procedure.to_dot());
    }
    if config.validate_procedures {
        procedure
            .validate()
            .map_err(FieldError::InvalidProcedure)?;
    }

    Ok((procedure, unique_variables))
}

pub(crate) fn field_variable(
    field: &Field,
    unique_variables: &UniqueVariableMap,
) -> Result<VariableId, FieldError> {
    unique_variables.variable_for(field).ok_or_else(|| {
        FieldError::invalid_field(format!(
            "no variable for output {} of {:?}",
            field.output_index(),
            field.source()
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::field::ArrayInput;
    use crate::function::{ElementwiseFunction, MultiFunction, Signature};
    use crate::procedure::Instruction;
    use crate::types::{DataType, Value};

    fn unary(name: &str) -> Arc<dyn MultiFunction> {
        Arc::new(ElementwiseFunction::unary(name, DataType::Float, DataType::Float, |a| Ok(a)))
    }

    fn input(name: &str) -> Field {
        Field::from_input(ArrayInput::new(name, DataType::Float, vec![Value::Float(1.0)]).unwrap())
    }

    #[test]
    fn test_shared_input_single_parameter() {
        let a = input("A");
        let double = Field::from_operation(unary("double"), vec![a.clone()]).unwrap();
        let square = Field::from_operation(unary("square"), vec![a]).unwrap();

        let (procedure, map) =
            build_procedure(&[double, square], &EvaluationConfig::default()).unwrap();
        assert_eq!(procedure.input_params().count(), 1);
        assert_eq!(procedure.call_count(), 2);
        assert_eq!(procedure.destruct_count(), 1);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_calls_follow_dependencies() {
        let a = input("A");
        let inner = Field::from_operation(unary("inner"), vec![a]).unwrap();
        let outer = Field::from_operation(unary("outer"), vec![inner]).unwrap();

        let (procedure, _) = build_procedure(&[outer], &EvaluationConfig::default()).unwrap();
        let names: Vec<&str> = procedure
            .instructions()
            .iter()
            .filter_map(|i| match i {
                Instruction::Call { function, .. } => Some(function.name()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["inner", "outer"]);
    }

    #[test]
    fn test_same_variable_passed_twice() {
        let a = input("A");
        let add: Arc<dyn MultiFunction> = Arc::new(ElementwiseFunction::binary(
            "add",
            DataType::Float,
            DataType::Float,
            DataType::Float,
            |x, y| Ok(Value::Float(x.as_float().unwrap_or(0.0) + y.as_float().unwrap_or(0.0))),
        ));
        let sum = Field::from_operation(add, vec![a.clone(), a]).unwrap();

        let (procedure, _) = build_procedure(&[sum], &EvaluationConfig::default()).unwrap();
        match &procedure.instructions()[0] {
            Instruction::Call { inputs, .. } => assert_eq!(inputs[0], inputs[1]),
            _ => panic!("expected a call first"),
        }
    }

    #[test]
    fn test_unused_output_destructed() {
        let split: Arc<dyn MultiFunction> = Arc::new(ElementwiseFunction::new(
            Signature::new("split")
                .input("v", DataType::Float)
                .output("low", DataType::Float)
                .output("high", DataType::Float),
            |args| Ok(vec![args[0], args[0]]),
        ));
        let outputs = Field::operation_outputs(split, vec![input("A")]).unwrap();

        let (procedure, map) =
            build_procedure(&outputs[..1], &EvaluationConfig::default()).unwrap();
        let high = map.variable_for(&outputs[1]).unwrap();
        let low = map.variable_for(&outputs[0]).unwrap();
        let destructed = procedure.destructed_variables();
        assert!(destructed.contains(&high));
        assert!(!destructed.contains(&low));
    }

    #[test]
    fn test_input_field_rejected() {
        let result = build_procedure(&[input("A")], &EvaluationConfig::default());
        assert!(matches!(result, Err(FieldError::InvalidField(_))));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut field = input("A");
        for _ in 0..10_000 {
            field = Field::from_operation(unary("step"), vec![field]).unwrap();
        }
        let (procedure, _) = build_procedure(&[field], &EvaluationConfig::default()).unwrap();
        assert_eq!(procedure.call_count(), 10_000);
    }
}
