//! Graphviz export for debugging built procedures.

use std::fmt::Write;

use super::{Instruction, ParamType, Procedure};

impl Procedure {
    /// Render the procedure as a Graphviz digraph.
    ///
    /// Variables are ellipses, instructions are boxes chained in execution order.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_dot(&mut dot);
        dot
    }

    fn write_dot(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "digraph procedure {{")?;
        writeln!(out, "  node [fontname=\"monospace\"];")?;

        for var in &self.variables {
            let role = self
                .params
                .iter()
                .find(|p| p.variable == var.id)
                .map(|p| match p.param_type {
                    ParamType::Input => " [in]",
                    ParamType::Output => " [out]",
                })
                .unwrap_or("");
            writeln!(
                out,
                "  {} [shape=ellipse, label=\"{}: {}{}\"];",
                var.id,
                escape(&self.variable_label(var.id)),
                var.data_type,
                role
            )?;
        }

        for (index, instruction) in self.instructions.iter().enumerate() {
            let node = format!("i{}", index);
            match instruction {
                Instruction::Call {
                    function,
                    inputs,
                    outputs,
                } => {
                    writeln!(
                        out,
                        "  {} [shape=box, label=\"{}\"];",
                        node,
                        escape(function.name())
                    )?;
                    for input in inputs {
                        writeln!(out, "  {} -> {};", input, node)?;
                    }
                    for output in outputs {
                        writeln!(out, "  {} -> {};", node, output)?;
                    }
                }
                Instruction::Destruct(variable) => {
                    writeln!(out, "  {} [shape=box, label=\"destruct\"];", node)?;
                    writeln!(out, "  {} -> {} [style=dashed];", variable, node)?;
                }
                Instruction::Return => {
                    writeln!(out, "  {} [shape=box, label=\"return\"];", node)?;
                }
            }
            if index > 0 {
                writeln!(out, "  i{} -> {} [color=gray];", index - 1, node)?;
            }
        }

        writeln!(out, "}}")
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::function::{ConstantFunction, MultiFunction};
    use crate::procedure::{Procedure, ProcedureBuilder};
    use crate::types::Value;

    #[test]
    fn test_dot_lists_variables_and_instructions() {
        let mut procedure = Procedure::new();
        let function: Arc<dyn MultiFunction> = Arc::new(ConstantFunction::new(Value::Float(1.5)));
        let mut builder = ProcedureBuilder::new(&mut procedure);
        let output = builder.add_call(&function, &[])[0];
        builder.add_return();
        builder.add_output_parameter(output);

        let dot = procedure.to_dot();
        assert!(dot.starts_with("digraph procedure {"));
        assert!(dot.contains("v0 [shape=ellipse, label=\"v0 \\\"value\\\": float [out]\"];"));
        assert!(dot.contains("i0 [shape=box, label=\"constant 1.5\"];"));
        assert!(dot.contains("i0 -> v0;"));
        assert!(dot.contains("i0 -> i1 [color=gray];"));
    }

    #[test]
    fn test_display_listing() {
        let mut procedure = Procedure::new();
        let function: Arc<dyn MultiFunction> = Arc::new(ConstantFunction::new(Value::Int(2)));
        let mut builder = ProcedureBuilder::new(&mut procedure);
        let output = builder.add_call(&function, &[])[0];
        builder.add_return();
        builder.add_output_parameter(output);

        assert_eq!(
            procedure.to_string(),
            "procedure\n  out v0 \"value\": int\n  v0 = constant 2()\n  return\n"
        );
    }
}
