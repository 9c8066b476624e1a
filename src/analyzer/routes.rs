use std::path::Path;
use tracing::debug;

use crate::analyzer::extract::{
    assert_kind, exactly_one, find_module_exports, find_property, identifier, lookup_property, Extractor,
    ARRAY_KINDS, FUNCTION_KINDS, LITERAL_KINDS, OBJECT_KINDS,
};
use crate::analyzer::metadata::{module_name, slug, Parameter, Route, RouteModule};
use crate::env::{build_environment, Environment};
use crate::error::{ExtractError, Result};
use crate::eval::{evaluate, property_key};
use crate::node::{kinds, Node, Scalar};
use crate::pattern::{find, Mode, Pattern};

impl Extractor {
    /// Extract the route definitions exported by one route module.
    pub fn extract_routes(&self, program: &Node, file: &Path) -> Result<RouteModule> {
        let path = file.display().to_string();
        let statements = program.nodes("body");
        let env = build_environment(statements);

        let export = exactly_one(find_module_exports(statements), "export", &path)?;
        let function = assert_kind(export.node("right"), FUNCTION_KINDS, &path)?;
        let definitions = find_returned_routes(function, &path)?;

        let routes = definitions
            .iter()
            .map(|definition| self.extract_route(definition, &env, &path))
            .collect::<Result<Vec<_>>>()?;

        let name = module_name(file);
        debug!(file = %path, module = %name, routes = routes.len(), "extracted route module");
        Ok(RouteModule { slug: slug(&name), name, routes })
    }

    fn extract_route(&self, definition: &Node, env: &Environment, path: &str) -> Result<Route> {
        let definition = assert_kind(Some(definition), OBJECT_KINDS, path)?;
        let method = required_literal(definition, "method", path)?;
        let route_path = required_literal(definition, "path", path)?;

        let mut authentication = None;
        let mut validate = None;
        let mut response = None;
        if let Some(config) = find_property(definition, "config", OBJECT_KINDS, path)? {
            authentication = self
                .find_route_authentication(config, path)?
                .map(|requirement| self.describe_authentication(&requirement));
            validate = find_property(config, "validate", OBJECT_KINDS, path)?;
            response = find_property(config, "response", OBJECT_KINDS, path)?;
        }

        Ok(Route::new(
            method,
            route_path,
            authentication,
            parameters(validate, "query", env),
            parameters(validate, "payload", env),
            parameters(response, "schema", env),
        ))
    }
}

/// The array of route definitions a module's exported function returns,
/// either directly or through a single local variable. An arrow with an
/// expression body returns that expression.
fn find_returned_routes<'a>(function: &'a Node, path: &str) -> Result<&'a [Node]> {
    let body = function.node("body");
    let mut returned = match body {
        Some(block) if block.is(kinds::BLOCK) => {
            let returns = find(block.nodes("body"), &Pattern::node(kinds::RETURN), Mode::Array);
            exactly_one(returns, "return statement", path)?.node("argument")
        }
        expression => expression,
    };

    if let Some(name) = returned.and_then(Node::identifier_name) {
        let pattern = Pattern::node(kinds::VARIABLE_DECLARATOR).field("id", identifier(name));
        let declarators = body.map(|body| find(body, &pattern, Mode::Recursive)).unwrap_or_default();
        returned = exactly_one(declarators, "set of route definitions", path)?.node("init");
    }

    Ok(assert_kind(returned, ARRAY_KINDS, path)?.nodes("elements"))
}

fn required_literal(definition: &Node, key: &str, path: &str) -> Result<String> {
    find_property(definition, key, LITERAL_KINDS, path)?
        .and_then(|literal| literal.scalar("value"))
        .map(Scalar::to_string)
        .ok_or_else(|| ExtractError::missing_field(path, definition, key))
}

/// Named, evaluated entries of `container.key`. Absent or non-object
/// containers yield nothing.
fn parameters(container: Option<&Node>, key: &str, env: &Environment) -> Vec<Parameter> {
    let Some(object) = container.and_then(|c| lookup_property(c, key)).filter(|o| o.is(kinds::OBJECT)) else {
        return Vec::new();
    };
    object
        .nodes("properties")
        .iter()
        .filter_map(|property| {
            let name = property_key(property)?;
            let value = property.node("value").map(|value| evaluate(value, env));
            let validation = value.filter(|value| value.is_resolved()).map(|value| value.to_string());
            Some(Parameter::new(name, validation))
        })
        .collect()
}
