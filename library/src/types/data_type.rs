//! Element types and single element values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of one element flowing through a field.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 32-bit float
    Float,
    /// 32-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 3D float vector
    Float3,
}

impl DataType {
    /// Value written into freshly allocated slots before a function fills them.
    pub fn default_value(self) -> Value {
        match self {
            DataType::Float => Value::Float(0.0),
            DataType::Int => Value::Int(0),
            DataType::Bool => Value::Bool(false),
            DataType::Float3 => Value::Float3([0.0; 3]),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::Bool => "bool",
            DataType::Float3 => "float3",
        };
        f.write_str(name)
    }
}

/// A single element value. Each variant corresponds to a `DataType`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Float(f32),
    Int(i32),
    Bool(bool),
    Float3([f32; 3]),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Float(_) => DataType::Float,
            Value::Int(_) => DataType::Int,
            Value::Bool(_) => DataType::Bool,
            Value::Float3(_) => DataType::Float3,
        }
    }

    /// Extract as float. Integers are converted.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<[f32; 3]> {
        match self {
            Value::Float3(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Float3([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Value::Float3(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_value_matches_type() {
        for ty in [DataType::Float, DataType::Int, DataType::Bool, DataType::Float3] {
            assert_eq!(ty.default_value().data_type(), ty);
        }
    }

    #[test]
    fn test_value_serialization() {
        let json = serde_json::to_string(&Value::Int(7)).expect("Failed to serialize value");
        assert_eq!(json, r#"{"type":"int","value":7}"#);

        let loaded: Value =
            serde_json::from_str(r#"{"type":"float3","value":[1.0,2.0,3.0]}"#)
                .expect("Failed to parse value");
        assert_eq!(loaded, Value::Float3([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_as_float_converts_int() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Bool(true).as_float(), None);
    }
}
