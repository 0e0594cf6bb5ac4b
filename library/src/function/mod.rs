//! Function descriptors evaluated by procedure call instructions.
//!
//! A `MultiFunction` computes all of its outputs for every element of an index mask in
//! one call. Operation field nodes hold a shared reference to one and the procedure
//! executor invokes it.

mod constant;
mod elementwise;

use std::fmt;

use crate::config::EvaluationConfig;
use crate::error::FieldError;
use crate::types::{DataType, IndexMask, VArray, Value};

pub use constant::ConstantFunction;
pub use elementwise::ElementwiseFunction;

/// Name and element type of one function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSignature {
    pub name: String,
    pub data_type: DataType,
}

/// Declared inputs and outputs of a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub inputs: Vec<ParamSignature>,
    pub outputs: Vec<ParamSignature>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.inputs.push(ParamSignature {
            name: name.into(),
            data_type,
        });
        self
    }

    pub fn output(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.outputs.push(ParamSignature {
            name: name.into(),
            data_type,
        });
        self
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self
            .inputs
            .iter()
            .map(|p| format!("{}: {}", p.name, p.data_type))
            .collect();
        let outputs: Vec<String> = self
            .outputs
            .iter()
            .map(|p| format!("{}: {}", p.name, p.data_type))
            .collect();
        write!(
            f,
            "{}({}) -> ({})",
            self.name,
            inputs.join(", "),
            outputs.join(", ")
        )
    }
}

/// Settings visible to functions while a procedure runs.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    parallel_grain_size: usize,
}

impl ExecutionContext {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            parallel_grain_size: config.parallel_grain_size.max(1),
        }
    }

    /// Masks with at least this many elements may be processed in parallel.
    pub fn parallel_grain_size(&self) -> usize {
        self.parallel_grain_size
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(&EvaluationConfig::default())
    }
}

/// Inputs and outputs handed to one function call.
///
/// Output slices are sized for the whole array; only masked positions are meaningful.
pub struct FunctionParams<'a> {
    inputs: Vec<&'a VArray>,
    outputs: Vec<&'a mut [Value]>,
}

impl<'a> FunctionParams<'a> {
    pub fn new(inputs: Vec<&'a VArray>, outputs: Vec<&'a mut [Value]>) -> Self {
        Self { inputs, outputs }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn readonly_input(&self, index: usize) -> &VArray {
        self.inputs[index]
    }

    pub fn uninitialized_output(&mut self, index: usize) -> &mut [Value] {
        &mut *self.outputs[index]
    }

    /// Borrow inputs and outputs at the same time.
    pub fn split_mut(&mut self) -> (&[&'a VArray], &mut [&'a mut [Value]]) {
        (&self.inputs, &mut self.outputs)
    }
}

/// A pure function evaluated over an index mask.
pub trait MultiFunction: Send + Sync {
    fn signature(&self) -> &Signature;

    /// Compute every output for every masked element.
    ///
    /// Implementations must only write masked positions of the outputs and must not
    /// have side effects beyond them.
    fn call(
        &self,
        mask: &IndexMask,
        params: &mut FunctionParams<'_>,
        context: &ExecutionContext,
    ) -> Result<(), FieldError>;

    fn name(&self) -> &str {
        &self.signature().name
    }
}

impl fmt::Debug for dyn MultiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultiFunction({})", self.signature())
    }
}
