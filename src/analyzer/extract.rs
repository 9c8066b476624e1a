use std::path::Path;

use crate::config::{ExtractionConfig, TokenAliases};
use crate::error::{ExtractError, Result};
use crate::node::{kinds, Node};
use crate::parser::parse_source;
use crate::pattern::{find, Mode, Pattern, Target};

pub const FUNCTION_KINDS: &[&str] = &[kinds::FUNCTION, kinds::ARROW_FUNCTION];
pub const OBJECT_KINDS: &[&str] = &[kinds::OBJECT];
pub const ARRAY_KINDS: &[&str] = &[kinds::ARRAY];
pub const LITERAL_KINDS: &[&str] = &[kinds::LITERAL];

/// Entry point for the extraction pipelines: holds the configuration and
/// everything compiled from it.
#[derive(Debug, Clone)]
pub struct Extractor {
    pub(crate) config: ExtractionConfig,
    pub(crate) aliases: TokenAliases,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let aliases = config.token_aliases()?;
        Ok(Extractor { config, aliases })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }
}

/// Read a module from disk and build its tree. `.json` files are ESTree
/// dumps from an external parser, anything else is JavaScript.
pub fn load_module(path: &Path) -> Result<Node> {
    let source = read_source(path)?;
    parse_module_source(&source, path)
}

pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })
}

pub fn parse_module_source(source: &str, path: &Path) -> Result<Node> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let value: serde_json::Value = serde_json::from_str(source).map_err(|err| ExtractError::Parse {
            path: path.display().to_string(),
            line: Some(err.line()),
            message: err.to_string(),
        })?;
        Node::from_estree(&value)
    } else {
        parse_source(source, &path.display().to_string())
    }
}

pub fn identifier(name: &str) -> Pattern {
    Pattern::node(kinds::IDENTIFIER).field("name", name)
}

/// Member access on `object`, any property.
pub fn member_of(object: Pattern) -> Pattern {
    Pattern::node(kinds::MEMBER).field("object", object)
}

/// Plain `=` assignments whose left side matches `lhs`, at any depth.
pub fn find_assignments_to<'a>(target: impl Into<Target<'a>>, lhs: Pattern) -> Vec<&'a Node> {
    let pattern = Pattern::node(kinds::ASSIGNMENT).field("operator", "=").field("left", lhs);
    find(target, &pattern, Mode::Recursive)
}

/// Assignments to `module.exports`, then to `module.exports.<name>`, then
/// to `exports.<name>`. Each group keeps source order.
pub fn find_module_exports(statements: &[Node]) -> Vec<&Node> {
    let module_exports = Pattern::node(kinds::MEMBER)
        .field("object", identifier("module"))
        .field("property", identifier("exports"));

    let mut found = find_assignments_to(statements, module_exports.clone());
    found.extend(find_assignments_to(statements, member_of(module_exports)));
    found.extend(find_assignments_to(statements, member_of(identifier("exports"))));
    found
}

/// Value of the first `init` property named `key` on an object literal.
/// The value must be one of `allowed`.
pub fn find_property<'a>(object: &'a Node, key: &str, allowed: &[&str], path: &str) -> Result<Option<&'a Node>> {
    match lookup_property(object, key) {
        Some(value) => assert_kind(Some(value), allowed, path).map(Some),
        None => Ok(None),
    }
}

/// Like [`find_property`] without the kind check.
pub fn lookup_property<'a>(object: &'a Node, key: &str) -> Option<&'a Node> {
    let pattern = Pattern::node(kinds::PROPERTY).field("kind", "init").field("key", identifier(key));
    find(object.nodes("properties"), &pattern, Mode::Array)
        .first()
        .and_then(|property| property.node("value"))
}

pub fn assert_kind<'a>(node: Option<&'a Node>, allowed: &[&str], path: &str) -> Result<&'a Node> {
    let expected = allowed.join(",");
    let node = node.ok_or_else(|| ExtractError::shape(path, format!("Expected type [{}], found nothing", expected)))?;
    if !allowed.contains(&node.kind()) {
        return Err(ExtractError::shape_at(
            path,
            node,
            format!("Expected type [{}], found \"{}\" at column \"{}\"", expected, node.kind(), node.loc().column),
        ));
    }
    Ok(node)
}

/// Cardinality assertion: `found` must hold exactly one node.
pub fn exactly_one<'a>(found: Vec<&'a Node>, what: &str, path: &str) -> Result<&'a Node> {
    match found.as_slice() {
        [only] => Ok(*only),
        _ => Err(ExtractError::shape(path, format!("Expected 1 {}, found {}", what, found.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn program(source: &str) -> Node {
        parse_source(source, "test.js").unwrap()
    }

    #[test]
    fn test_module_exports_grouped_by_form() {
        let program = program(
            "exports.a = 1\nmodule.exports.b = 2\nmodule.exports = {}\nfoo.exports.c = 3\nmodule.exports += 4\n",
        );
        let found = find_module_exports(program.nodes("body"));
        let lines: Vec<usize> = found.iter().map(|node| node.loc().line).collect();
        assert_eq!(lines, vec![3, 2, 1]);
    }

    #[test]
    fn test_find_property_checks_kind() {
        let program = program("x = { method: 'GET', config: 1 }");
        let object = find(&program, &Pattern::node(kinds::OBJECT), Mode::Recursive)[0];

        let method = find_property(object, "method", LITERAL_KINDS, "test.js").unwrap();
        assert_eq!(method.and_then(|m| m.str_field("value")), Some("GET"));
        assert!(find_property(object, "path", LITERAL_KINDS, "test.js").unwrap().is_none());

        let err = find_property(object, "config", OBJECT_KINDS, "test.js").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error parsing \"test.js\" at line 1:\nExpected type [ObjectExpression], found \"Literal\" at column \"29\""
        );
    }

    #[test]
    fn test_assert_kind_nothing() {
        let err = assert_kind(None, FUNCTION_KINDS, "a.js").unwrap_err();
        assert!(err.to_string().ends_with("Expected type [FunctionExpression,ArrowFunctionExpression], found nothing"));
    }

    #[test]
    fn test_exactly_one() {
        let program = program("a = 1; b = 2");
        let assignments = find_assignments_to(&program, Pattern::node(kinds::IDENTIFIER));
        let err = exactly_one(assignments, "export", "x.js").unwrap_err();
        assert!(err.to_string().ends_with("Expected 1 export, found 2"));
    }

    #[test]
    fn test_parse_module_source_reads_estree_json() {
        let tree = json!({ "type": "Program", "body": [], "sourceType": "script" });
        let node = parse_module_source(&tree.to_string(), Path::new("error.json")).unwrap();
        assert!(node.is(kinds::PROGRAM));
    }
}
