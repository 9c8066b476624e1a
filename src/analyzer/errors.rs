use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

use crate::analyzer::extract::{
    assert_kind, exactly_one, find_assignments_to, find_property, identifier, member_of, Extractor, OBJECT_KINDS,
};
use crate::analyzer::metadata::{AdditionalErrorParams, ErrorRecord, ErrorTable};
use crate::env::{Environment, EMPTY};
use crate::error::Result;
use crate::eval::{property_key, Value};
use crate::node::{kinds, Node};
use crate::pattern::{find, Mode, Pattern};

const ERROR_PROPERTY_KINDS: &[&str] = &[kinds::LITERAL, kinds::MEMBER, kinds::BINARY, kinds::LOGICAL];

/// Lookup tables an error module declares up front.
struct Tables {
    errno_name: String,
    errno: Environment,
    defaults: Environment,
}

impl Tables {
    fn default_value(&self, name: &str) -> Value {
        self.defaults.get(name).cloned().unwrap_or(Value::Unresolved)
    }
}

impl Extractor {
    /// Extract every error an error module can construct, sorted by errno.
    pub fn extract_errors(&self, program: &Node, file: &Path) -> Result<ErrorTable> {
        let path = file.display().to_string();
        let statements = program.nodes("body");

        let errno = find_table(statements, &self.config.errno_table, &path)?;
        let defaults = find_table(statements, &self.config.defaults_table, &path)?;
        let errno = Environment::from_object(errno, &EMPTY);
        let defaults = Environment::from_object(defaults, &errno);
        let tables = Tables { errno_name: self.config.errno_table.clone(), errno, defaults };

        let error_type = self.config.error_type.as_str();
        let constructor = Pattern::node(kinds::RETURN).field(
            "argument",
            Pattern::node(kinds::NEW).field("callee", identifier(error_type)),
        );

        let mut table = ErrorTable::default();
        for assignment in find_assignments_to(statements, member_of(identifier(error_type))) {
            let helper = assignment
                .node("left")
                .and_then(|left| left.node("property"))
                .and_then(Node::identifier_name);
            if helper.is_some_and(|name| self.config.not_errors.contains(name)) {
                continue;
            }
            for construct in find(assignment, &constructor, Mode::Recursive) {
                let arguments = construct.node("argument").map(|new| new.nodes("arguments")).unwrap_or_default();
                marshall_error(arguments, &tables, &path, &mut table)?;
            }
        }

        table.errors.sort_by(|lhs, rhs| by_errno(&lhs.errno, &rhs.errno));
        table.additional_error_params.sort_by(|lhs, rhs| by_errno(&lhs.errno, &rhs.errno));
        debug!(
            file = %path,
            errors = table.errors.len(),
            additional = table.additional_error_params.len(),
            "extracted error table"
        );
        Ok(table)
    }
}

/// The object literal initialising the top-level declaration `name`.
fn find_table<'a>(statements: &'a [Node], name: &str, path: &str) -> Result<&'a Node> {
    let declarators: Vec<&Node> = find(statements, &Pattern::node(kinds::VARIABLE_DECLARATION), Mode::Array)
        .into_iter()
        .flat_map(|declaration| declaration.nodes("declarations"))
        .filter(|declarator| {
            declarator.node("init").is_some()
                && declarator.node("id").and_then(Node::identifier_name) == Some(name)
        })
        .collect();
    let declarator = exactly_one(declarators, &format!("{} declaration", name), path)?;
    assert_kind(declarator.node("init"), OBJECT_KINDS, path)
}

fn marshall_error(arguments: &[Node], tables: &Tables, path: &str, table: &mut ErrorTable) -> Result<()> {
    let error = assert_kind(arguments.first(), OBJECT_KINDS, path)?;
    let code = error_property(error, "code", None, path)?;
    let errno = error_property(error, "errno", Some(tables), path)?;
    let message = error_property(error, "message", None, path)?;
    let errno = errno.or_else(|| tables.default_value("errno"));

    if let Some(extra) = arguments.get(1) {
        let params = extra
            .is(kinds::OBJECT)
            .then(|| extra.nodes("properties").iter().filter_map(property_key).collect::<Vec<_>>());
        table.additional_error_params.push(AdditionalErrorParams {
            errno: errno.clone(),
            has_params: params.as_ref().is_some_and(|params| !params.is_empty()),
            params: params.map(|params| params.join(", ")),
        });
    }

    table.errors.push(ErrorRecord {
        code: code.or_else(|| tables.default_value("code")),
        errno,
        definition: message.or_else(|| tables.default_value("message")),
    });
    Ok(())
}

fn error_property(error: &Node, name: &str, errno: Option<&Tables>, path: &str) -> Result<Value> {
    Ok(find_property(error, name, ERROR_PROPERTY_KINDS, path)?
        .map(|value| error_property_fallback(value, errno))
        .unwrap_or(Value::Unresolved))
}

/// Narrow resolution rule for error fields, valid only for the shapes
/// error modules actually use: `a + b` keeps `a`, `a || b` keeps `b`, and
/// `ERRNO.NAME` is looked up in the errno table when one is given.
fn error_property_fallback(value: &Node, errno: Option<&Tables>) -> Value {
    let literal = |node: Option<&Node>| {
        node.and_then(|node| node.scalar("value"))
            .cloned()
            .map(Value::Scalar)
            .unwrap_or(Value::Unresolved)
    };
    match value.kind() {
        kinds::LITERAL => literal(Some(value)),
        kinds::BINARY => literal(value.node("left")),
        kinds::LOGICAL => literal(value.node("right")),
        kinds::MEMBER => {
            let Some(tables) = errno else {
                return Value::Unresolved;
            };
            let object = value.node("object").and_then(Node::identifier_name);
            let property = value.node("property").and_then(Node::identifier_name);
            match (object, property) {
                (Some(object), Some(property)) if object == tables.errno_name => {
                    tables.errno.get(property).cloned().unwrap_or(Value::Unresolved)
                }
                _ => Value::Unresolved,
            }
        }
        _ => Value::Unresolved,
    }
}

/// Numeric errno order; anything non-numeric sorts last.
fn by_errno(lhs: &Value, rhs: &Value) -> Ordering {
    let key = |value: &Value| value.as_f64().unwrap_or(f64::INFINITY);
    key(lhs).total_cmp(&key(rhs))
}
