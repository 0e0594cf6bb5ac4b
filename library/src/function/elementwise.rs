use rayon::prelude::*;

use super::{ExecutionContext, FunctionParams, MultiFunction, Signature};
use crate::error::FieldError;
use crate::types::{DataType, IndexMask, VArray, Value};

type ElementFn = dyn Fn(&[Value]) -> Result<Vec<Value>, FieldError> + Send + Sync;

/// A function applied independently to each masked element.
///
/// The closure receives one value per declared input and returns one value per declared
/// output. Large masks are evaluated on the rayon thread pool.
pub struct ElementwiseFunction {
    signature: Signature,
    function: Box<ElementFn>,
}

impl ElementwiseFunction {
    pub fn new<F>(signature: Signature, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, FieldError> + Send + Sync + 'static,
    {
        Self {
            signature,
            function: Box::new(function),
        }
    }

    /// One input, one output.
    pub fn unary<F>(name: &str, input: DataType, output: DataType, function: F) -> Self
    where
        F: Fn(Value) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        let signature = Signature::new(name)
            .input("a", input)
            .output("result", output);
        Self::new(signature, move |args| Ok(vec![function(args[0])?]))
    }

    /// Two inputs, one output.
    pub fn binary<F>(name: &str, a: DataType, b: DataType, output: DataType, function: F) -> Self
    where
        F: Fn(Value, Value) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        let signature = Signature::new(name)
            .input("a", a)
            .input("b", b)
            .output("result", output);
        Self::new(signature, move |args| Ok(vec![function(args[0], args[1])?]))
    }

    fn evaluate_element(&self, inputs: &[&VArray], index: usize) -> Result<Vec<Value>, FieldError> {
        let args: Vec<Value> = inputs.iter().map(|input| *input.get(index)).collect();
        let results = (self.function)(&args)?;
        if results.len() != self.signature.outputs.len() {
            return Err(FieldError::execution(format!(
                "{} returned {} values, expected {}",
                self.signature.name,
                results.len(),
                self.signature.outputs.len()
            )));
        }
        for (value, param) in results.iter().zip(&self.signature.outputs) {
            if value.data_type() != param.data_type {
                return Err(FieldError::type_mismatch(
                    format!("{}.{}", self.signature.name, param.name),
                    param.data_type,
                    value.data_type(),
                ));
            }
        }
        Ok(results)
    }
}

impl MultiFunction for ElementwiseFunction {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(
        &self,
        mask: &IndexMask,
        params: &mut FunctionParams<'_>,
        context: &ExecutionContext,
    ) -> Result<(), FieldError> {
        let (inputs, outputs) = params.split_mut();

        if mask.len() >= context.parallel_grain_size() {
            let indices = mask.to_vec();
            let rows: Vec<Vec<Value>> = indices
                .par_iter()
                .map(|&i| self.evaluate_element(inputs, i))
                .collect::<Result<_, _>>()?;
            for (&i, row) in indices.iter().zip(rows) {
                for (output, value) in outputs.iter_mut().zip(row) {
                    output[i] = value;
                }
            }
        } else {
            for i in mask.iter() {
                let row = self.evaluate_element(inputs, i)?;
                for (output, value) in outputs.iter_mut().zip(row) {
                    output[i] = value;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationConfig;

    fn square() -> ElementwiseFunction {
        ElementwiseFunction::unary("square", DataType::Float, DataType::Float, |a| {
            let v = a.as_float().unwrap_or_default();
            Ok(Value::Float(v * v))
        })
    }

    fn run(
        function: &ElementwiseFunction,
        input: &VArray,
        mask: &IndexMask,
        grain: usize,
    ) -> Vec<Value> {
        let mut out = vec![Value::Float(-1.0); input.len()];
        let context = ExecutionContext::new(&EvaluationConfig {
            parallel_grain_size: grain,
            ..EvaluationConfig::default()
        });
        let mut params = FunctionParams::new(vec![input], vec![out.as_mut_slice()]);
        function.call(mask, &mut params, &context).unwrap();
        out
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let values: Vec<Value> = (0..64).map(|i| Value::Float(i as f32)).collect();
        let input = VArray::from_values(DataType::Float, values);
        let mask = IndexMask::full(64);

        let serial = run(&square(), &input, &mask, usize::MAX);
        let parallel = run(&square(), &input, &mask, 1);
        assert_eq!(serial, parallel);
        assert_eq!(serial[7], Value::Float(49.0));
    }

    #[test]
    fn test_unmasked_elements_untouched() {
        let input = VArray::single(Value::Float(3.0), 4);
        let mask = IndexMask::from_indices(vec![1, 3]).unwrap();
        let out = run(&square(), &input, &mask, usize::MAX);
        assert_eq!(
            out,
            vec![
                Value::Float(-1.0),
                Value::Float(9.0),
                Value::Float(-1.0),
                Value::Float(9.0)
            ]
        );
    }

    #[test]
    fn test_wrong_output_type_is_reported() {
        let broken = ElementwiseFunction::unary("broken", DataType::Float, DataType::Float, |_| {
            Ok(Value::Int(1))
        });
        let input = VArray::single(Value::Float(1.0), 1);
        let mut out = vec![Value::Float(0.0)];
        let mut params = FunctionParams::new(vec![&input], vec![out.as_mut_slice()]);
        let result = broken.call(&IndexMask::full(1), &mut params, &ExecutionContext::default());
        assert!(matches!(result, Err(FieldError::TypeMismatch { .. })));
    }
}
