//! Structural validation of procedures.
//!
//! Checks that a procedure is well-formed:
//! - Every call reads only initialized variables
//! - Every variable is written once
//! - Calls agree with their function signatures
//! - The instruction list ends in a single return
//! - At return, exactly the output parameters are still alive

use std::collections::HashSet;

use thiserror::Error;

use super::{Instruction, ParamType, Procedure, VariableId};
use crate::types::DataType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown variable {variable} (instruction {instruction:?})")]
    UnknownVariable {
        instruction: Option<usize>,
        variable: VariableId,
    },
    #[error("variable {variable} is declared as a parameter more than once")]
    DuplicateParameter { variable: VariableId },
    #[error("instruction {instruction} ({function}) reads {variable} before it is initialized")]
    UninitializedInput {
        instruction: usize,
        function: String,
        variable: VariableId,
    },
    #[error("instruction {instruction} ({function}) writes {variable}, which was already initialized")]
    AlreadyInitialized {
        instruction: usize,
        function: String,
        variable: VariableId,
    },
    #[error("instruction {instruction} ({function}) has {found} {kind}, signature declares {expected}")]
    ArityMismatch {
        instruction: usize,
        function: String,
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("instruction {instruction} ({function}) passes {variable} of type {found} where {expected} is expected")]
    ParamTypeMismatch {
        instruction: usize,
        function: String,
        variable: VariableId,
        expected: DataType,
        found: DataType,
    },
    #[error("instruction {instruction} destructs {variable}, which is not initialized")]
    DestructUninitialized {
        instruction: usize,
        variable: VariableId,
    },
    #[error("instruction {instruction} follows the return")]
    UnreachableInstruction { instruction: usize },
    #[error("procedure does not end with a return")]
    MissingReturn,
    #[error("output {variable} is not initialized at return")]
    OutputNotInitialized { variable: VariableId },
    #[error("variable {variable} is still alive at return")]
    NotDestructed { variable: VariableId },
}

impl Procedure {
    /// Validate the procedure.
    ///
    /// Returns Ok(()) if the procedure is valid, or every error found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut declared = HashSet::new();
        for param in &self.params {
            if self.variable(param.variable).is_none() {
                errors.push(ValidationError::UnknownVariable {
                    instruction: None,
                    variable: param.variable,
                });
            }
            if !declared.insert(param.variable) {
                errors.push(ValidationError::DuplicateParameter {
                    variable: param.variable,
                });
            }
        }

        // `alive` holds initialized, not yet destructed variables. `defined` remembers
        // every variable that was ever written, to enforce single assignment.
        let mut alive: HashSet<VariableId> = self.input_params().collect();
        let mut defined = alive.clone();
        let mut returned = false;

        for (index, instruction) in self.instructions.iter().enumerate() {
            if returned {
                errors.push(ValidationError::UnreachableInstruction { instruction: index });
                continue;
            }
            match instruction {
                Instruction::Call {
                    function,
                    inputs,
                    outputs,
                } => {
                    let signature = function.signature();
                    self.check_arity(
                        index,
                        &signature.name,
                        "inputs",
                        signature.inputs.len(),
                        inputs.len(),
                        &mut errors,
                    );
                    self.check_arity(
                        index,
                        &signature.name,
                        "outputs",
                        signature.outputs.len(),
                        outputs.len(),
                        &mut errors,
                    );

                    for (variable, param) in inputs.iter().zip(&signature.inputs) {
                        self.check_type(
                            index,
                            &signature.name,
                            *variable,
                            param.data_type,
                            &mut errors,
                        );
                        if !alive.contains(variable) {
                            errors.push(ValidationError::UninitializedInput {
                                instruction: index,
                                function: signature.name.clone(),
                                variable: *variable,
                            });
                        }
                    }
                    for (variable, param) in outputs.iter().zip(&signature.outputs) {
                        self.check_type(
                            index,
                            &signature.name,
                            *variable,
                            param.data_type,
                            &mut errors,
                        );
                        if !defined.insert(*variable) {
                            errors.push(ValidationError::AlreadyInitialized {
                                instruction: index,
                                function: signature.name.clone(),
                                variable: *variable,
                            });
                        }
                        alive.insert(*variable);
                    }
                }
                Instruction::Destruct(variable) => {
                    if !alive.remove(variable) {
                        errors.push(ValidationError::DestructUninitialized {
                            instruction: index,
                            variable: *variable,
                        });
                    }
                }
                Instruction::Return => {
                    returned = true;
                    self.check_return(&alive, &mut errors);
                }
            }
        }

        if !returned {
            errors.push(ValidationError::MissingReturn);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_arity(
        &self,
        instruction: usize,
        function: &str,
        kind: &'static str,
        expected: usize,
        found: usize,
        errors: &mut Vec<ValidationError>,
    ) {
        if expected != found {
            errors.push(ValidationError::ArityMismatch {
                instruction,
                function: function.to_string(),
                kind,
                expected,
                found,
            });
        }
    }

    fn check_type(
        &self,
        instruction: usize,
        function: &str,
        variable: VariableId,
        expected: DataType,
        errors: &mut Vec<ValidationError>,
    ) {
        match self.variable(variable) {
            None => errors.push(ValidationError::UnknownVariable {
                instruction: Some(instruction),
                variable,
            }),
            Some(var) if var.data_type != expected => {
                errors.push(ValidationError::ParamTypeMismatch {
                    instruction,
                    function: function.to_string(),
                    variable,
                    expected,
                    found: var.data_type,
                })
            }
            Some(_) => {}
        }
    }

    fn check_return(&self, alive: &HashSet<VariableId>, errors: &mut Vec<ValidationError>) {
        let outputs: HashSet<VariableId> = self
            .params
            .iter()
            .filter(|p| p.param_type == ParamType::Output)
            .map(|p| p.variable)
            .collect();

        for param in &self.params {
            if param.param_type == ParamType::Output && !alive.contains(&param.variable) {
                errors.push(ValidationError::OutputNotInitialized {
                    variable: param.variable,
                });
            }
        }
        for var in &self.variables {
            if alive.contains(&var.id) && !outputs.contains(&var.id) {
                errors.push(ValidationError::NotDestructed { variable: var.id });
            }
        }
    }
}
