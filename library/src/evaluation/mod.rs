//! Batch evaluation of fields.
//!
//! All requested fields are compiled into a single procedure so that sources shared
//! between them are computed once. Fields that are plain inputs skip the procedure and
//! are copied straight into their buffers.

mod build;
pub mod evaluator;
mod gather;
pub mod variable_map;

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::EvaluationConfig;
use crate::error::FieldError;
use crate::field::{Field, FieldSourceKind};
use crate::function::ExecutionContext;
use crate::procedure::{ParamsBuilder, Procedure, ProcedureExecutor};
use crate::types::{IndexMask, Value};
use crate::util::timing::measure_phase;

pub use evaluator::FieldEvaluator;
use gather::{InputCache, gather_inputs};
pub use variable_map::UniqueVariableMap;

/// Evaluate `fields` over `mask`, writing field `i` into `outputs[i]`.
///
/// Only masked positions are written. Every buffer must hold at least
/// `mask.min_array_size()` elements.
pub fn evaluate_fields(
    fields: &[Field],
    mask: &IndexMask,
    outputs: &mut [&mut [Value]],
) -> Result<(), FieldError> {
    evaluate_fields_with_config(fields, mask, outputs, &EvaluationConfig::default())
}

pub fn evaluate_fields_with_config(
    fields: &[Field],
    mask: &IndexMask,
    outputs: &mut [&mut [Value]],
    config: &EvaluationConfig,
) -> Result<(), FieldError> {
    check_request(fields, mask, outputs)?;
    if mask.is_empty() || fields.is_empty() {
        return Ok(());
    }

    log::debug!(
        "evaluating {} fields over {} elements",
        fields.len(),
        mask.len()
    );

    let mut cache = InputCache::default();
    let mut operation_fields: Vec<Field> = Vec::new();
    // Request index -> position in `operation_fields`.
    let mut slots: Vec<Option<usize>> = vec![None; fields.len()];
    let mut slot_by_output: HashMap<(Uuid, usize), usize> = HashMap::new();

    for (index, field) in fields.iter().enumerate() {
        match field.source().kind() {
            FieldSourceKind::Input(input) => {
                let data = cache.get_or_compute(field.source_id(), input.as_ref(), mask)?;
                data.materialize(mask, outputs[index]);
            }
            FieldSourceKind::Operation(_) => {
                let key = (field.source_id(), field.output_index());
                let slot = *slot_by_output.entry(key).or_insert_with(|| {
                    operation_fields.push(field.clone());
                    operation_fields.len() - 1
                });
                slots[index] = Some(slot);
            }
        }
    }

    if operation_fields.is_empty() {
        log::debug!(
            "all {} fields were inputs ({} distinct)",
            fields.len(),
            cache.len()
        );
        return Ok(());
    }

    // The first request of each distinct output receives the procedure result; repeats
    // are copied from it afterwards.
    let mut primary: Vec<Option<usize>> = vec![None; operation_fields.len()];
    for (index, slot) in slots.iter().enumerate() {
        if let Some(slot) = *slot {
            primary[slot].get_or_insert(index);
        }
    }

    {
        let mut buffers: Vec<Option<&mut [Value]>> =
            (0..operation_fields.len()).map(|_| None).collect();
        for (index, buffer) in outputs.iter_mut().enumerate() {
            if let Some(slot) = slots[index] {
                if primary[slot] == Some(index) {
                    buffers[slot] = Some(&mut **buffer);
                }
            }
        }
        let buffers = buffers
            .into_iter()
            .map(|b| b.ok_or_else(|| FieldError::execution("request has no output buffer")))
            .collect::<Result<Vec<_>, _>>()?;

        evaluate_operation_fields(&operation_fields, mask, buffers, &mut cache, config)?;
    }

    for (index, slot) in slots.iter().enumerate() {
        let Some(slot) = *slot else { continue };
        let Some(source) = primary[slot] else { continue };
        if source == index {
            continue;
        }
        let values: Vec<Value> = mask.iter().map(|i| outputs[source][i]).collect();
        for (i, value) in mask.iter().zip(values) {
            outputs[index][i] = value;
        }
    }

    Ok(())
}

/// Evaluate a field that does not depend on any per-element input.
///
/// The field is evaluated for a single element. Fields that read varying inputs
/// yield whatever their first element would be.
pub fn evaluate_constant_field(field: &Field) -> Result<Value, FieldError> {
    let mut value = [field.data_type().default_value()];
    evaluate_fields(
        std::slice::from_ref(field),
        &IndexMask::full(1),
        &mut [&mut value[..]],
    )?;
    Ok(value[0])
}

/// Build the procedure that `evaluate_fields` would run for `fields`.
///
/// All fields must be operation outputs. Useful for inspecting or dumping what an
/// evaluation computes.
pub fn build_procedure(
    fields: &[Field],
    config: &EvaluationConfig,
) -> Result<Procedure, FieldError> {
    build::build_procedure(fields, config).map(|(procedure, _)| procedure)
}

fn check_request(
    fields: &[Field],
    mask: &IndexMask,
    outputs: &[&mut [Value]],
) -> Result<(), FieldError> {
    if fields.len() != outputs.len() {
        return Err(FieldError::OutputCountMismatch {
            fields: fields.len(),
            outputs: outputs.len(),
        });
    }
    let required = mask.min_array_size();
    for (index, buffer) in outputs.iter().enumerate() {
        if buffer.len() < required {
            return Err(FieldError::BufferTooSmall {
                index,
                len: buffer.len(),
                required,
            });
        }
    }
    Ok(())
}

fn evaluate_operation_fields(
    fields: &[Field],
    mask: &IndexMask,
    outputs: Vec<&mut [Value]>,
    cache: &mut InputCache,
    config: &EvaluationConfig,
) -> Result<(), FieldError> {
    let (procedure, unique_variables) = measure_phase(
        || format!("building procedure for {} fields", fields.len()),
        || build::build_procedure(fields, config),
    )?;
    log::debug!(
        "procedure: {} sources, {} calls, {} destructs",
        unique_variables.len(),
        procedure.call_count(),
        procedure.destruct_count()
    );

    let mut params = ParamsBuilder::new(mask.min_array_size());
    let bound = gather_inputs(fields, &unique_variables, mask, &mut params, cache)?;
    log::debug!("bound {} inputs", bound);
    for buffer in outputs {
        params.add_uninitialized_output(buffer)?;
    }

    let executor = ProcedureExecutor::new("Evaluate Field", &procedure);
    let context = ExecutionContext::new(config);
    measure_phase(
        || format!("executing procedure over {} elements", mask.len()),
        || executor.call(mask, params, &context),
    )
}
