use std::fs;
use std::path::Path;

use api_docs_core::cache::IncrementalCache;
use api_docs_core::{DocInputs, ExtractError, ExtractionConfig, Extractor, RouteModule};
use serde_json::json;

const ACCOUNT: &str = r#"
'use strict'

const validators = require('./validators')
const HEX_STRING = validators.HEX_STRING

module.exports = (log, db, mailer) => {
  const routes = [
    {
      method: 'POST',
      path: '/account/create',
      config: {
        validate: {
          query: {
            keys: isA.boolean().optional(),
            service: validators.service
          },
          payload: {
            email: validators.email().required(),
            authPW: isA.string().min(64).max(64).regex(HEX_STRING).required()
          }
        },
        response: {
          schema: {
            uid: isA.string().regex(HEX_STRING).required(),
            sessionToken: isA.string().regex(HEX_STRING).required()
          }
        }
      },
      handler: async function (request) {
        return {}
      }
    },
    {
      method: 'GET',
      path: '/account/devices',
      config: {
        auth: {
          strategies: ['sessionTokenWithDevice', 'oauthToken']
        }
      },
      handler: async function () {}
    }
  ]

  return routes
}
"#;

const SESSION: &str = r#"
module.exports = function (log, db) {
  return [
    {
      method: 'POST',
      path: '/session/destroy',
      config: {
        auth: { mode: 'try', strategy: 'sessionToken' }
      }
    }
  ]
}
"#;

const VALIDATORS: &str = r#"
const isA = require('joi')

module.exports.HEX_STRING = /^(?:[a-fA-F0-9]{2})+$/
module.exports.service = isA.string().max(16).regex(/^[a-zA-Z0-9\-]*$/)
module.exports.email = function () { return isA.string() }
"#;

const METRICS_CONTEXT: &str = r#"
const SCHEMA = isA.object({ flowId: isA.string() }).optional()

module.exports.schema = SCHEMA
"#;

const ERRORS: &str = r#"
var ERRNO = {
  ACCOUNT_EXISTS: 101,
  ACCOUNT_UNKNOWN: 102,
  INVALID_PARAMETER: 107,
  UNEXPECTED_ERROR: 999
}

var DEFAULTS = {
  code: 400,
  error: 'Bad Request',
  errno: ERRNO.UNEXPECTED_ERROR,
  message: 'Unspecified error'
}

function AppError(options, extra, headers) {
  this.message = options.message || DEFAULTS.message
}

AppError.prototype.toString = function () {
  return 'Error: ' + this.message
}

AppError.translate = function (response) {
  return new AppError({ errno: 1 })
}

AppError.unknownAccount = function (email) {
  return new AppError({
    code: 400,
    error: 'Bad Request',
    errno: ERRNO.ACCOUNT_UNKNOWN,
    message: 'Unknown account'
  }, {
    email: email
  })
}

AppError.accountExists = function (email) {
  return new AppError({
    code: 400,
    errno: ERRNO.ACCOUNT_EXISTS,
    message: 'Account already exists'
  })
}

AppError.invalidRequestParameter = function (val) {
  return new AppError({
    code: 400,
    errno: ERRNO.INVALID_PARAMETER,
    message: 'Invalid parameter in request body'
  }, {
    validation: val
  })
}

module.exports = AppError
"#;

fn write_project(root: &Path) -> DocInputs {
    let routes = root.join("routes");
    fs::create_dir(&routes).unwrap();
    fs::write(routes.join("account.js"), ACCOUNT).unwrap();
    fs::write(routes.join("session.js"), SESSION).unwrap();
    fs::write(routes.join("validators.js"), VALIDATORS).unwrap();
    fs::write(routes.join("index.js"), "module.exports = {}").unwrap();
    fs::write(root.join("context.js"), METRICS_CONTEXT).unwrap();
    fs::write(root.join("error.js"), ERRORS).unwrap();

    DocInputs {
        routes_dir: routes.clone(),
        validators: routes.join("validators.js"),
        metrics_context: root.join("context.js"),
        errors: root.join("error.js"),
    }
}

fn extractor() -> Extractor {
    Extractor::new(ExtractionConfig::default()).unwrap()
}

#[test]
fn generates_complete_document_data() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_project(dir.path());
    let docs = extractor().generate(&inputs, None).unwrap();
    let json = serde_json::to_value(&docs).unwrap();

    assert_eq!(json["modules"].as_array().unwrap().len(), 2);
    assert_eq!(json["modules"][0]["name"], "Account");
    assert_eq!(json["modules"][1]["slug"], "session");

    let create = &json["modules"][0]["routes"][0];
    assert_eq!(create["slug"], "post-accountcreate");
    assert!(create.get("authentication").is_none());
    assert_eq!(
        create["queryParameters"],
        json!([
            { "name": "keys", "description": "TODO: description goes here", "validation": "isA.boolean.optional" },
            { "name": "service", "description": "TODO: description goes here", "validation": "validators.service" }
        ])
    );
    assert_eq!(
        create["requestBody"][1]["validation"],
        "isA.string.min(64).max(64).regex(validators.HEX_STRING).required"
    );
    assert_eq!(create["hasResponseBody"], true);

    let devices = &json["modules"][0]["routes"][1];
    assert_eq!(
        devices["authentication"],
        json!({
            "emojis": ":lock:",
            "token": "sessionToken, oauthToken",
            "summary": "authenticated with OAuth bearer token, or HAWK-authenticated with session token"
        })
    );
    assert_eq!(devices["hasQueryParameters"], false);

    let destroy = &json["modules"][1]["routes"][0];
    assert_eq!(destroy["authentication"]["emojis"], ":lock::question:");
    assert_eq!(destroy["authentication"]["summary"], "Optionally HAWK-authenticated with session token");

    assert_eq!(
        json["validators"],
        json!([
            { "key": "HEX_STRING", "value": "/^(?:[a-fA-F0-9]{2})+$/" },
            { "key": "service", "value": "isA.string.max(16).regex(/^[a-zA-Z0-9\\-]*$/)" }
        ])
    );
    assert_eq!(
        json["metricsContext"],
        json!([{ "key": "schema", "value": "isA.object({ flowId: isA.string }).optional" }])
    );

    assert_eq!(
        json["errors"],
        json!([
            { "code": 400, "errno": 101, "definition": "Account already exists" },
            { "code": 400, "errno": 102, "definition": "Unknown account" },
            { "code": 400, "errno": 107, "definition": "Invalid parameter in request body" }
        ])
    );
    assert_eq!(
        json["additionalErrorParams"],
        json!([
            { "errno": 102, "hasParams": true, "params": "email" },
            { "errno": 107, "hasParams": true, "params": "validation" }
        ])
    );
}

#[test]
fn repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_project(dir.path());
    let first = serde_json::to_string(&extractor().generate(&inputs, None).unwrap()).unwrap();
    let second = serde_json::to_string(&extractor().generate(&inputs, None).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn cached_run_matches_fresh_run() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_project(dir.path());
    let cache = IncrementalCache::<RouteModule>::new(dir.path().join("cache"), "test").unwrap();

    let fresh = extractor().index_routes(&inputs.routes_dir, Some(&cache)).unwrap();
    let cached = extractor().index_routes(&inputs.routes_dir, Some(&cache)).unwrap();
    assert_eq!(fresh, cached);

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (2, 2));
}

#[test]
fn malformed_module_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_project(dir.path());
    fs::write(inputs.routes_dir.join("broken.js"), "module.exports = () => [{ path: '/x' }]").unwrap();

    let err = extractor().generate(&inputs, None).unwrap_err();
    assert!(matches!(err, ExtractError::MissingField { ref field, .. } if field == "method"));
    assert!(err.to_string().contains("broken.js"));
}

#[test]
fn syntax_errors_are_reported_with_a_line() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_project(dir.path());
    fs::write(inputs.routes_dir.join("broken.js"), "module.exports = () => [\n  {\n]").unwrap();

    let err = extractor().index_routes(&inputs.routes_dir, None).unwrap_err();
    assert!(matches!(err, ExtractError::Parse { line: Some(3), .. }));
}

#[test]
fn estree_json_modules_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("validators.json");
    let tree = json!({
        "type": "Program",
        "body": [{
            "type": "ExpressionStatement",
            "loc": { "start": { "line": 1, "column": 0 } },
            "expression": {
                "type": "AssignmentExpression",
                "operator": "=",
                "loc": { "start": { "line": 1, "column": 0 } },
                "left": {
                    "type": "MemberExpression",
                    "object": {
                        "type": "MemberExpression",
                        "object": { "type": "Identifier", "name": "module" },
                        "property": { "type": "Identifier", "name": "exports" }
                    },
                    "property": { "type": "Identifier", "name": "DIGITS" }
                },
                "right": { "type": "Literal", "value": "/^[0-9]+$/", "regex": { "pattern": "^[0-9]+$", "flags": "" } }
            }
        }]
    });
    fs::write(&path, tree.to_string()).unwrap();

    let exports = extractor().exports_from_file(&path).unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].key, "DIGITS");
    assert_eq!(exports[0].value, "/^[0-9]+$/");
}
