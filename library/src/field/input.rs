//! Leaf data providers for input fields.

use std::sync::Arc;

use crate::error::FieldError;
use crate::types::{DataType, IndexMask, VArray, Value};

/// Provides per-element data for an input field.
///
/// `get_varray` is called at most once per distinct input per evaluation and may be
/// expensive. The returned array must cover `mask.min_array_size()` elements.
pub trait FieldInput: Send + Sync {
    fn data_type(&self) -> DataType;

    /// Name used for procedure parameters and diagnostics.
    fn debug_name(&self) -> &str;

    fn get_varray(&self, mask: &IndexMask) -> Result<VArray, FieldError>;
}

/// Input backed by a fixed array of values.
pub struct ArrayInput {
    name: String,
    data_type: DataType,
    values: Arc<[Value]>,
}

impl ArrayInput {
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        values: Vec<Value>,
    ) -> Result<Self, FieldError> {
        let name = name.into();
        if let Some(bad) = values.iter().find(|v| v.data_type() != data_type) {
            return Err(FieldError::type_mismatch(
                format!("array input '{}'", name),
                data_type,
                bad.data_type(),
            ));
        }
        Ok(Self {
            name,
            data_type,
            values: values.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FieldInput for ArrayInput {
    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn debug_name(&self) -> &str {
        &self.name
    }

    fn get_varray(&self, mask: &IndexMask) -> Result<VArray, FieldError> {
        if mask.min_array_size() > self.values.len() {
            return Err(FieldError::input(format!(
                "'{}' has {} elements, mask needs {}",
                self.name,
                self.values.len(),
                mask.min_array_size()
            )));
        }
        Ok(VArray::from_shared(self.data_type, self.values.clone()))
    }
}

/// The element index itself, as an integer.
#[derive(Default)]
pub struct IndexInput;

impl FieldInput for IndexInput {
    fn data_type(&self) -> DataType {
        DataType::Int
    }

    fn debug_name(&self) -> &str {
        "Index"
    }

    fn get_varray(&self, mask: &IndexMask) -> Result<VArray, FieldError> {
        let size = mask.min_array_size();
        let size = i32::try_from(size)
            .map_err(|_| FieldError::input(format!("index {} does not fit an int", size)))?;
        let values = (0..size).map(Value::Int).collect();
        Ok(VArray::from_values(DataType::Int, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_input_rejects_mixed_types() {
        let values = vec![Value::Float(1.0), Value::Int(2)];
        let result = ArrayInput::new("pos", DataType::Float, values);
        assert!(matches!(result, Err(FieldError::TypeMismatch { .. })));
    }

    #[test]
    fn test_array_input_too_short_for_mask() {
        let input = ArrayInput::new("pos", DataType::Float, vec![Value::Float(1.0)]).unwrap();
        assert!(input.get_varray(&IndexMask::full(1)).is_ok());
        assert!(matches!(
            input.get_varray(&IndexMask::full(2)),
            Err(FieldError::Input(_))
        ));
    }

    #[test]
    fn test_index_input_values() {
        let mask = IndexMask::from_indices(vec![1, 4]).unwrap();
        let data = IndexInput.get_varray(&mask).unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(*data.get(4), Value::Int(4));
    }
}
