use std::sync::Arc;

use super::{Instruction, ParamType, Parameter, Procedure, Variable, VariableId};
use crate::function::MultiFunction;
use crate::types::DataType;

/// Appends variables, parameters and instructions to a procedure.
///
/// The builder does not check anything; run `Procedure::validate` on the result.
pub struct ProcedureBuilder<'a> {
    procedure: &'a mut Procedure,
}

impl<'a> ProcedureBuilder<'a> {
    pub fn new(procedure: &'a mut Procedure) -> Self {
        Self { procedure }
    }

    /// Create a variable with no producer.
    pub fn add_variable(&mut self, data_type: DataType, name: impl Into<String>) -> VariableId {
        let id = VariableId(self.procedure.variables.len());
        self.procedure.variables.push(Variable {
            id,
            data_type,
            name: name.into(),
        });
        id
    }

    pub fn add_input_parameter(
        &mut self,
        data_type: DataType,
        name: impl Into<String>,
    ) -> VariableId {
        let variable = self.add_variable(data_type, name);
        self.add_parameter(ParamType::Input, variable);
        variable
    }

    pub fn add_output_parameter(&mut self, variable: VariableId) {
        self.add_parameter(ParamType::Output, variable);
    }

    fn add_parameter(&mut self, param_type: ParamType, variable: VariableId) {
        self.procedure.params.push(Parameter {
            param_type,
            variable,
        });
    }

    /// Emit a call and return fresh variables for each of the function's outputs.
    pub fn add_call(
        &mut self,
        function: &Arc<dyn MultiFunction>,
        inputs: &[VariableId],
    ) -> Vec<VariableId> {
        let outputs: Vec<VariableId> = function
            .signature()
            .outputs
            .iter()
            .map(|param| self.add_variable(param.data_type, param.name.clone()))
            .collect();
        self.add_call_with_outputs(function, inputs, &outputs);
        outputs
    }

    /// Emit a call writing into existing variables.
    pub fn add_call_with_outputs(
        &mut self,
        function: &Arc<dyn MultiFunction>,
        inputs: &[VariableId],
        outputs: &[VariableId],
    ) {
        self.procedure.instructions.push(Instruction::Call {
            function: function.clone(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });
    }

    pub fn add_destruct(&mut self, variable: VariableId) {
        self.procedure
            .instructions
            .push(Instruction::Destruct(variable));
    }

    pub fn add_return(&mut self) {
        self.procedure.instructions.push(Instruction::Return);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::ConstantFunction;
    use crate::types::Value;

    #[test]
    fn test_add_call_creates_typed_outputs() {
        let mut procedure = Procedure::new();
        let function: Arc<dyn MultiFunction> = Arc::new(ConstantFunction::new(Value::Int(3)));
        let mut builder = ProcedureBuilder::new(&mut procedure);
        let outputs = builder.add_call(&function, &[]);
        builder.add_output_parameter(outputs[0]);
        builder.add_return();

        assert_eq!(outputs, vec![VariableId(0)]);
        assert_eq!(procedure.variables()[0].data_type, DataType::Int);
        assert_eq!(procedure.call_count(), 1);
        assert_eq!(procedure.output_params().collect::<Vec<_>>(), outputs);
    }

    #[test]
    fn test_input_parameter_named() {
        let mut procedure = Procedure::new();
        let variable =
            ProcedureBuilder::new(&mut procedure).add_input_parameter(DataType::Float, "pos");
        assert_eq!(procedure.variable(variable).unwrap().name, "pos");
        assert_eq!(procedure.input_params().count(), 1);
    }
}
