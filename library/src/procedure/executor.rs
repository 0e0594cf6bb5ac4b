//! Runs a procedure over an index mask.

use std::collections::HashMap;

use super::{Instruction, Procedure, Variable, VariableId};
use crate::error::FieldError;
use crate::function::{ExecutionContext, FunctionParams};
use crate::types::{IndexMask, VArray, Value};

/// Executes the instructions of one procedure.
pub struct ProcedureExecutor<'p> {
    name: String,
    procedure: &'p Procedure,
}

/// Collects the data bound to a procedure's parameters for one call.
///
/// Inputs are bound by variable; outputs are positional, in the order the procedure
/// declares its output parameters.
pub struct ParamsBuilder<'a> {
    array_size: usize,
    inputs: HashMap<VariableId, VArray>,
    outputs: Vec<&'a mut [Value]>,
}

impl<'a> ParamsBuilder<'a> {
    pub fn new(array_size: usize) -> Self {
        Self {
            array_size,
            inputs: HashMap::new(),
            outputs: Vec::new(),
        }
    }

    pub fn array_size(&self) -> usize {
        self.array_size
    }

    pub fn add_readonly_input(
        &mut self,
        variable: VariableId,
        data: VArray,
    ) -> Result<(), FieldError> {
        if data.len() < self.array_size {
            return Err(FieldError::input(format!(
                "data for {} has {} elements, expected at least {}",
                variable,
                data.len(),
                self.array_size
            )));
        }
        if self.inputs.insert(variable, data).is_some() {
            return Err(FieldError::input(format!("{} is bound twice", variable)));
        }
        Ok(())
    }

    pub fn add_uninitialized_output(&mut self, buffer: &'a mut [Value]) -> Result<(), FieldError> {
        if buffer.len() < self.array_size {
            return Err(FieldError::BufferTooSmall {
                index: self.outputs.len(),
                len: buffer.len(),
                required: self.array_size,
            });
        }
        self.outputs.push(buffer);
        Ok(())
    }

    pub fn is_bound(&self, variable: VariableId) -> bool {
        self.inputs.contains_key(&variable)
    }
}

impl<'p> ProcedureExecutor<'p> {
    pub fn new(name: impl Into<String>, procedure: &'p Procedure) -> Self {
        Self {
            name: name.into(),
            procedure,
        }
    }

    /// Run every instruction over `mask`, then write the output parameters.
    ///
    /// Output buffers are only written once all calls succeeded. A failing function
    /// call is returned unchanged.
    pub fn call(
        &self,
        mask: &IndexMask,
        params: ParamsBuilder<'_>,
        context: &ExecutionContext,
    ) -> Result<(), FieldError> {
        let ParamsBuilder {
            array_size,
            inputs: mut bound_inputs,
            outputs: mut output_buffers,
        } = params;

        if mask.min_array_size() > array_size {
            return Err(FieldError::execution(format!(
                "{}: mask needs {} elements, parameters hold {}",
                self.name,
                mask.min_array_size(),
                array_size
            )));
        }

        let mut storage: Vec<Option<VArray>> = vec![None; self.procedure.variables().len()];
        for variable in self.procedure.input_params() {
            let var = self.variable(variable)?;
            let data = bound_inputs.remove(&variable).ok_or_else(|| {
                FieldError::UnboundParameter(format!(
                    "{}: {} \"{}\"",
                    self.name, variable, var.name
                ))
            })?;
            if data.data_type() != var.data_type {
                return Err(FieldError::type_mismatch(
                    format!("{}: input {}", self.name, variable),
                    var.data_type,
                    data.data_type(),
                ));
            }
            storage[variable.0] = Some(data);
        }
        if let Some(extra) = bound_inputs.keys().next() {
            return Err(FieldError::execution(format!(
                "{}: {} is bound but is not an input parameter",
                self.name, extra
            )));
        }

        let output_params: Vec<VariableId> = self.procedure.output_params().collect();
        if output_params.len() != output_buffers.len() {
            return Err(FieldError::OutputCountMismatch {
                fields: output_params.len(),
                outputs: output_buffers.len(),
            });
        }

        for instruction in self.procedure.instructions() {
            match instruction {
                Instruction::Call {
                    function,
                    inputs,
                    outputs,
                } => {
                    let mut results: Vec<Vec<Value>> = outputs
                        .iter()
                        .map(|v| {
                            self.variable(*v)
                                .map(|var| vec![var.data_type.default_value(); array_size])
                        })
                        .collect::<Result<_, _>>()?;
                    {
                        let input_data: Vec<&VArray> = inputs
                            .iter()
                            .map(|v| {
                                storage
                                    .get(v.0)
                                    .and_then(Option::as_ref)
                                    .ok_or_else(|| {
                                        FieldError::execution(format!(
                                            "{}: {} read before it was computed",
                                            self.name, v
                                        ))
                                    })
                            })
                            .collect::<Result<_, _>>()?;
                        let mut call_params = FunctionParams::new(
                            input_data,
                            results.iter_mut().map(Vec::as_mut_slice).collect(),
                        );
                        log::trace!("{}: calling {}", self.name, function.name());
                        function.call(mask, &mut call_params, context)?;
                    }
                    for (variable, values) in outputs.iter().zip(results) {
                        let data_type = self.variable(*variable)?.data_type;
                        storage[variable.0] = Some(VArray::from_values(data_type, values));
                    }
                }
                Instruction::Destruct(variable) => {
                    if let Some(slot) = storage.get_mut(variable.0) {
                        *slot = None;
                    }
                }
                Instruction::Return => break,
            }
        }

        for (variable, buffer) in output_params.iter().zip(output_buffers.iter_mut()) {
            let data = storage.get(variable.0).and_then(Option::as_ref).ok_or_else(|| {
                FieldError::execution(format!(
                    "{}: output {} was never computed",
                    self.name, variable
                ))
            })?;
            data.materialize(mask, buffer);
        }
        Ok(())
    }

    fn variable(&self, id: VariableId) -> Result<&Variable, FieldError> {
        self.procedure
            .variable(id)
            .ok_or_else(|| FieldError::execution(format!("{}: unknown variable {}", self.name, id)))
    }
}
