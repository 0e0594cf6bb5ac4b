use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::build::field_variable;
use super::variable_map::UniqueVariableMap;
use crate::error::FieldError;
use crate::field::{Field, FieldInput, FieldSourceKind};
use crate::procedure::ParamsBuilder;
use crate::types::{IndexMask, VArray};

/// Input data produced during one evaluation call, keyed by input source.
///
/// Each input is asked for its data at most once, however many requests and
/// operations reach it.
#[derive(Default)]
pub(crate) struct InputCache {
    data: HashMap<Uuid, VArray>,
}

impl InputCache {
    pub fn get_or_compute(
        &mut self,
        source_id: Uuid,
        input: &dyn FieldInput,
        mask: &IndexMask,
    ) -> Result<VArray, FieldError> {
        if let Some(data) = self.data.get(&source_id) {
            return Ok(data.clone());
        }
        let data = input.get_varray(mask)?;
        if data.data_type() != input.data_type() {
            return Err(FieldError::type_mismatch(
                format!("input \"{}\"", input.debug_name()),
                input.data_type(),
                data.data_type(),
            ));
        }
        if data.len() < mask.min_array_size() {
            return Err(FieldError::input(format!(
                "\"{}\" produced {} elements, mask needs {}",
                input.debug_name(),
                data.len(),
                mask.min_array_size()
            )));
        }
        log::trace!(
            "computed input \"{}\": {} elements",
            input.debug_name(),
            data.len()
        );
        self.data.insert(source_id, data.clone());
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Bind the data of every input reachable from `fields` to its procedure parameter.
///
/// Returns the number of inputs bound.
pub(crate) fn gather_inputs(
    fields: &[Field],
    unique_variables: &UniqueVariableMap,
    mask: &IndexMask,
    params: &mut ParamsBuilder<'_>,
    cache: &mut InputCache,
) -> Result<usize, FieldError> {
    let mut visited_sources = HashSet::new();
    let mut fields_to_visit: Vec<&Field> = fields.iter().collect();
    let mut bound = 0;

    while let Some(field) = fields_to_visit.pop() {
        let source = field.source();
        if !visited_sources.insert(source.id()) {
            continue;
        }
        match source.kind() {
            FieldSourceKind::Input(input) => {
                let variable = field_variable(field, unique_variables)?;
                let data = cache.get_or_compute(source.id(), input.as_ref(), mask)?;
                params.add_readonly_input(variable, data)?;
                bound += 1;
            }
            FieldSourceKind::Operation(operation) => {
                fields_to_visit.extend(operation.inputs());
            }
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::{DataType, Value};

    struct CountingInput {
        calls: AtomicUsize,
    }

    impl FieldInput for CountingInput {
        fn data_type(&self) -> DataType {
            DataType::Int
        }

        fn debug_name(&self) -> &str {
            "Counting"
        }

        fn get_varray(&self, mask: &IndexMask) -> Result<VArray, FieldError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(VArray::single(Value::Int(1), mask.min_array_size()))
        }
    }

    struct WrongTypeInput;

    impl FieldInput for WrongTypeInput {
        fn data_type(&self) -> DataType {
            DataType::Float
        }

        fn debug_name(&self) -> &str {
            "Wrong"
        }

        fn get_varray(&self, mask: &IndexMask) -> Result<VArray, FieldError> {
            Ok(VArray::single(Value::Bool(true), mask.min_array_size()))
        }
    }

    #[test]
    fn test_cache_computes_once() {
        let input = Arc::new(CountingInput {
            calls: AtomicUsize::new(0),
        });
        let id = Uuid::new_v4();
        let mask = IndexMask::full(4);
        let mut cache = InputCache::default();

        let first = cache.get_or_compute(id, input.as_ref(), &mask).unwrap();
        let second = cache.get_or_compute(id, input.as_ref(), &mask).unwrap();
        assert_eq!(first, second);
        assert_eq!(input.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_checks_type() {
        let mut cache = InputCache::default();
        let result = cache.get_or_compute(Uuid::new_v4(), &WrongTypeInput, &IndexMask::full(1));
        assert!(matches!(result, Err(FieldError::TypeMismatch { .. })));
    }
}
