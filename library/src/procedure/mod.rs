//! Procedures: instruction lists over typed variables.
//!
//! A procedure declares input and output parameters, then runs a flat list of call and
//! destruct instructions ending in a return. Procedures are built fresh for every
//! evaluation and are checked with `validate` before they run.

mod builder;
mod dot;
mod executor;
mod validate;

use std::fmt;
use std::sync::Arc;

use crate::function::MultiFunction;
use crate::types::DataType;

pub use builder::ProcedureBuilder;
pub use executor::{ParamsBuilder, ProcedureExecutor};
pub use validate::ValidationError;

/// Index of a variable within its procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub usize);

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub id: VariableId,
    pub data_type: DataType,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Read-only data bound by the caller.
    Input,
    /// Written into a caller buffer after the procedure returns.
    Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub param_type: ParamType,
    pub variable: VariableId,
}

pub enum Instruction {
    Call {
        function: Arc<dyn MultiFunction>,
        inputs: Vec<VariableId>,
        outputs: Vec<VariableId>,
    },
    /// Release the data held by a variable.
    Destruct(VariableId),
    Return,
}

#[derive(Default)]
pub struct Procedure {
    variables: Vec<Variable>,
    params: Vec<Parameter>,
    instructions: Vec<Instruction>,
}

impl Procedure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn input_params(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.params_of(ParamType::Input)
    }

    pub fn output_params(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.params_of(ParamType::Output)
    }

    fn params_of(&self, param_type: ParamType) -> impl Iterator<Item = VariableId> + '_ {
        self.params
            .iter()
            .filter(move |p| p.param_type == param_type)
            .map(|p| p.variable)
    }

    pub fn call_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Call { .. }))
            .count()
    }

    pub fn destruct_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Destruct(_)))
            .count()
    }

    /// Variables released by destruct instructions, in instruction order.
    pub fn destructed_variables(&self) -> Vec<VariableId> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Destruct(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    fn variable_label(&self, id: VariableId) -> String {
        match self.variable(id) {
            Some(var) if !var.name.is_empty() => format!("{} \"{}\"", id, var.name),
            _ => id.to_string(),
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "procedure")?;
        for param in &self.params {
            let direction = match param.param_type {
                ParamType::Input => "in ",
                ParamType::Output => "out",
            };
            let data_type = self
                .variable(param.variable)
                .map(|v| v.data_type.to_string())
                .unwrap_or_else(|| "?".to_string());
            writeln!(
                f,
                "  {} {}: {}",
                direction,
                self.variable_label(param.variable),
                data_type
            )?;
        }
        for instruction in &self.instructions {
            match instruction {
                Instruction::Call {
                    function,
                    inputs,
                    outputs,
                } => {
                    let inputs: Vec<String> = inputs.iter().map(|v| v.to_string()).collect();
                    let outputs: Vec<String> = outputs.iter().map(|v| v.to_string()).collect();
                    writeln!(
                        f,
                        "  {} = {}({})",
                        outputs.join(", "),
                        function.name(),
                        inputs.join(", ")
                    )?;
                }
                Instruction::Destruct(v) => writeln!(f, "  destruct {}", v)?,
                Instruction::Return => writeln!(f, "  return")?,
            }
        }
        Ok(())
    }
}
