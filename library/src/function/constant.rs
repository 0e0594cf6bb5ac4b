use super::{ExecutionContext, FunctionParams, MultiFunction, Signature};
use crate::error::FieldError;
use crate::types::{IndexMask, Value};

/// Writes one value to every masked element. Takes no inputs.
pub struct ConstantFunction {
    signature: Signature,
    value: Value,
}

impl ConstantFunction {
    pub fn new(value: Value) -> Self {
        let signature =
            Signature::new(format!("constant {}", value)).output("value", value.data_type());
        Self { signature, value }
    }

    pub fn value(&self) -> Value {
        self.value
    }
}

impl MultiFunction for ConstantFunction {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(
        &self,
        mask: &IndexMask,
        params: &mut FunctionParams<'_>,
        _context: &ExecutionContext,
    ) -> Result<(), FieldError> {
        let output = params.uninitialized_output(0);
        for i in mask.iter() {
            output[i] = self.value;
        }
        Ok(())
    }
}
