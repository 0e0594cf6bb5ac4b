//! Read-only virtual arrays of element values.

use std::sync::Arc;

use super::data_type::{DataType, Value};
use super::index_mask::IndexMask;

/// Per-element data of one `DataType`, either one repeated value or a shared span.
///
/// Cloning is cheap: spans are reference-counted.
#[derive(Clone, Debug, PartialEq)]
pub enum VArray {
    Single {
        value: Value,
        len: usize,
    },
    Span {
        data_type: DataType,
        values: Arc<[Value]>,
    },
}

impl VArray {
    pub fn single(value: Value, len: usize) -> Self {
        VArray::Single { value, len }
    }

    /// Wrap owned values. All values are expected to have `data_type`.
    pub fn from_values(data_type: DataType, values: Vec<Value>) -> Self {
        debug_assert!(values.iter().all(|v| v.data_type() == data_type));
        VArray::Span {
            data_type,
            values: values.into(),
        }
    }

    pub fn from_shared(data_type: DataType, values: Arc<[Value]>) -> Self {
        VArray::Span { data_type, values }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            VArray::Single { value, .. } => value.data_type(),
            VArray::Span { data_type, .. } => *data_type,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VArray::Single { len, .. } => *len,
            VArray::Span { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`. Panics when out of bounds, like slice indexing.
    pub fn get(&self, index: usize) -> &Value {
        match self {
            VArray::Single { value, len } => {
                assert!(index < *len, "index {} out of bounds for length {}", index, len);
                value
            }
            VArray::Span { values, .. } => &values[index],
        }
    }

    /// Copy the masked elements into `out`. Other positions are left untouched.
    pub fn materialize(&self, mask: &IndexMask, out: &mut [Value]) {
        match self {
            VArray::Single { value, .. } => {
                for i in mask.iter() {
                    out[i] = *value;
                }
            }
            VArray::Span { values, .. } => {
                for i in mask.iter() {
                    out[i] = values[i];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_get() {
        let array = VArray::single(Value::Float(2.5), 4);
        assert_eq!(array.len(), 4);
        assert_eq!(*array.get(3), Value::Float(2.5));
        assert_eq!(array.data_type(), DataType::Float);
    }

    #[test]
    fn test_materialize_only_masked() {
        let array = VArray::from_values(
            DataType::Int,
            vec![Value::Int(10), Value::Int(11), Value::Int(12)],
        );
        let mut out = vec![Value::Int(-1); 3];
        let mask = IndexMask::from_indices(vec![0, 2]).unwrap();
        array.materialize(&mask, &mut out);
        assert_eq!(out, vec![Value::Int(10), Value::Int(-1), Value::Int(12)]);
    }
}
