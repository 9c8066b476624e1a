use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{ExtractError, Result};

/// Knobs for the extraction pipelines. Every field has a default, so a
/// config file only needs the entries it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Route directory entries that are not route modules.
    pub ignore: BTreeSet<String>,
    /// Assignments on the error type that do not construct errors.
    pub not_errors: BTreeSet<String>,
    /// Name of the error constructor, e.g. `AppError`.
    pub error_type: String,
    pub errno_table: String,
    pub defaults_table: String,
    /// `auth.mode` values that make authentication optional.
    pub optional_auth_modes: BTreeSet<String>,
    /// Token that is listed first and described as an OAuth bearer token.
    pub bearer_token: String,
    pub token_aliases: Vec<TokenAlias>,
}

/// Canonicalise every strategy matching `pattern` to `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAlias {
    pub pattern: String,
    pub name: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let set = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        ExtractionConfig {
            ignore: set(&["defaults.js", "idp.js", "index.js", "validators.js"]),
            not_errors: set(&["toString", "header", "backtrace", "translate"]),
            error_type: "AppError".into(),
            errno_table: "ERRNO".into(),
            defaults_table: "DEFAULTS".into(),
            optional_auth_modes: set(&["try", "optional"]),
            bearer_token: "oauthToken".into(),
            token_aliases: vec![
                TokenAlias { pattern: "^sessionToken".into(), name: "sessionToken".into() },
                TokenAlias { pattern: "^keyFetchToken".into(), name: "keyFetchToken".into() },
            ],
        }
    }
}

impl ExtractionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text).map_err(|err| ExtractError::Config {
            message: format!("{}: {}", path.display(), err),
        })
    }

    pub fn token_aliases(&self) -> Result<TokenAliases> {
        TokenAliases::compile(&self.token_aliases)
    }
}

/// Compiled [`TokenAlias`] rules, applied in order.
#[derive(Debug, Clone)]
pub struct TokenAliases {
    rules: Vec<(Regex, String)>,
}

impl TokenAliases {
    pub fn compile(aliases: &[TokenAlias]) -> Result<Self> {
        let rules = aliases
            .iter()
            .map(|alias| {
                Regex::new(&alias.pattern)
                    .map(|re| (re, alias.name.clone()))
                    .map_err(|err| ExtractError::Config {
                        message: format!("token alias \"{}\": {}", alias.pattern, err),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TokenAliases { rules })
    }

    pub fn canonical<'a>(&'a self, token: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(token))
            .map(|(_, name)| name.as_str())
            .unwrap_or(token)
    }
}
