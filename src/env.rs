use std::collections::BTreeMap;

use crate::eval::{evaluate, property_key, Value};
use crate::node::{kinds, Node};
use crate::pattern::{find, Mode, Pattern};

/// Variable bindings consulted by the evaluator. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
}

/// Environment with no bindings, for evaluations that must not substitute.
pub static EMPTY: Environment = Environment::empty();

impl Environment {
    pub const fn empty() -> Self {
        Environment { bindings: BTreeMap::new() }
    }

    /// Raw binding, falsy values included.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Binding usable as a substitution: falsy values do not count.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.get(name).filter(|value| value.is_truthy())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bind every property of an object literal, evaluated under `env`.
    pub fn from_object(object: &Node, env: &Environment) -> Environment {
        object
            .nodes("properties")
            .iter()
            .filter_map(|property| {
                let key = property_key(property)?;
                let value = property.node("value").map(|v| evaluate(v, env)).unwrap_or(Value::Unresolved);
                Some((key, value))
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Environment { bindings: iter.into_iter().collect() }
    }
}

/// Bind the variables declared directly in `statements`.
///
/// Nested scopes are not visited. Initialisers are evaluated under
/// [`EMPTY`], so declarations never see each other, and only truthy
/// results are bound.
pub fn build_environment(statements: &[Node]) -> Environment {
    let mut bindings = BTreeMap::new();
    for declaration in find(statements, &Pattern::node(kinds::VARIABLE_DECLARATION), Mode::Array) {
        for declarator in declaration.nodes("declarations") {
            let Some(name) = declarator.node("id").and_then(Node::identifier_name) else {
                continue;
            };
            let Some(init) = declarator.node("init") else {
                continue;
            };
            let value = evaluate(init, &EMPTY);
            if value.is_truthy() {
                bindings.insert(name.to_string(), value);
            }
        }
    }
    tracing::trace!(bindings = bindings.len(), "built environment");
    Environment { bindings }
}
