use crate::analyzer::extract::find_module_exports;
use crate::analyzer::metadata::ExportEntry;
use crate::env::build_environment;
use crate::eval::evaluate;
use crate::node::{Node, Scalar};

/// Named exports of a module with their rendered values. Exports whose
/// value renders to nothing are dropped.
pub fn extract_exports(program: &Node) -> Vec<ExportEntry> {
    let statements = program.nodes("body");
    let env = build_environment(statements);

    find_module_exports(statements)
        .into_iter()
        .filter_map(|assignment| {
            let key = export_key(assignment.node("left")?)?;
            let value = evaluate(assignment.node("right")?, &env);
            value.is_truthy().then(|| ExportEntry { key, value: value.to_string() })
        })
        .collect()
}

/// `exports.NAME` -> `NAME`. A bare `module.exports = ...` yields `exports`.
fn export_key(left: &Node) -> Option<String> {
    let property = left.node("property")?;
    property
        .identifier_name()
        .map(str::to_string)
        .or_else(|| property.scalar("value").map(Scalar::to_string))
}
