use crate::analyzer::extract::{assert_kind, find_property, Extractor, ARRAY_KINDS, LITERAL_KINDS, OBJECT_KINDS};
use crate::analyzer::metadata::Authentication;
use crate::error::{ExtractError, Result};
use crate::node::{Node, Scalar};

/// Raw `config.auth` settings of one route.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequirement {
    pub optional: bool,
    pub tokens: Vec<String>,
}

impl Extractor {
    /// Read the `auth` object of a route's `config`, if any.
    pub fn find_route_authentication(&self, config: &Node, path: &str) -> Result<Option<AuthRequirement>> {
        let Some(auth) = find_property(config, "auth", OBJECT_KINDS, path)? else {
            return Ok(None);
        };

        let optional = find_property(auth, "mode", LITERAL_KINDS, path)?
            .and_then(|mode| mode.str_field("value"))
            .is_some_and(|mode| self.config.optional_auth_modes.contains(mode));

        let tokens = if let Some(strategies) = find_property(auth, "strategies", ARRAY_KINDS, path)? {
            strategies
                .nodes("elements")
                .iter()
                .map(|strategy| Ok(strategy_name(assert_kind(Some(strategy), LITERAL_KINDS, path)?)))
                .collect::<Result<Vec<_>>>()?
        } else if let Some(strategy) = find_property(auth, "strategy", LITERAL_KINDS, path)? {
            vec![strategy_name(strategy)]
        } else {
            return Err(ExtractError::shape_at(path, auth, "Missing authentication strategy"));
        };

        Ok(Some(AuthRequirement { optional, tokens }))
    }

    /// Canonicalise, de-duplicate and describe a route's tokens.
    pub fn describe_authentication(&self, requirement: &AuthRequirement) -> Authentication {
        let mut tokens: Vec<&str> = Vec::with_capacity(requirement.tokens.len());
        for token in &requirement.tokens {
            let token = self.aliases.canonical(token);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }

        let token = tokens.join(", ");

        let bearer = self.config.bearer_token.as_str();
        tokens.sort_by_key(|token| *token != bearer);
        let mut summary = String::from(if requirement.optional { "Optionally " } else { "" });
        for (index, token) in tokens.iter().enumerate() {
            if *token == bearer {
                summary.push_str("authenticated with OAuth bearer token");
            } else {
                if index > 0 {
                    summary.push_str(", or ");
                }
                summary.push_str("HAWK-authenticated with ");
                summary.push_str(&uncamel(token));
            }
        }

        Authentication {
            emojis: format!(":lock:{}", if requirement.optional { ":question:" } else { "" }),
            token,
            summary,
        }
    }
}

fn strategy_name(literal: &Node) -> String {
    literal.scalar("value").map(Scalar::to_string).unwrap_or_default()
}

/// `sessionToken` -> `session token`
pub fn uncamel(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        if c.is_ascii_uppercase() {
            out.push(' ');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::node::kinds;
    use crate::parser::parse_source;
    use crate::pattern::{find, Mode, Pattern};

    fn extractor() -> Extractor {
        Extractor::new(ExtractionConfig::default()).unwrap()
    }

    fn requirement(optional: bool, tokens: &[&str]) -> AuthRequirement {
        AuthRequirement { optional, tokens: tokens.iter().map(|t| t.to_string()).collect() }
    }

    fn route_config(source: &str) -> Node {
        let program = parse_source(source, "auth.js").unwrap();
        find(&program, &Pattern::node(kinds::OBJECT), Mode::Recursive)[0].clone()
    }

    #[test]
    fn test_uncamel() {
        assert_eq!(uncamel("sessionToken"), "session token");
        assert_eq!(uncamel("keyFetchToken"), "key fetch token");
        assert_eq!(uncamel("plain"), "plain");
    }

    #[test]
    fn test_bearer_token_sorted_first() {
        let auth = extractor().describe_authentication(&requirement(false, &["sessionTokenWithDevice", "oauthToken"]));
        assert_eq!(auth.emojis, ":lock:");
        assert_eq!(auth.token, "sessionToken, oauthToken");
        assert_eq!(auth.summary, "authenticated with OAuth bearer token, or HAWK-authenticated with session token");
    }

    #[test]
    fn test_optional_and_deduplicated() {
        let auth = extractor().describe_authentication(&requirement(
            true,
            &["sessionToken", "sessionTokenWithVerificationStatus", "keyFetchTokenWithVerificationStatus"],
        ));
        assert_eq!(auth.emojis, ":lock::question:");
        assert_eq!(auth.token, "sessionToken, keyFetchToken");
        assert_eq!(
            auth.summary,
            "Optionally HAWK-authenticated with session token, or HAWK-authenticated with key fetch token"
        );
    }

    #[test]
    fn test_strategies_and_mode() {
        let config = route_config("x = { auth: { mode: 'optional', strategies: ['sessionToken', 'oauthToken'] } }");
        let found = extractor().find_route_authentication(&config, "auth.js").unwrap();
        assert_eq!(found, Some(requirement(true, &["sessionToken", "oauthToken"])));
    }

    #[test]
    fn test_single_strategy() {
        let config = route_config("x = { auth: { strategy: 'keyFetchToken' } }");
        let found = extractor().find_route_authentication(&config, "auth.js").unwrap();
        assert_eq!(found, Some(requirement(false, &["keyFetchToken"])));
    }

    #[test]
    fn test_no_auth_object() {
        let config = route_config("x = { validate: {} }");
        assert_eq!(extractor().find_route_authentication(&config, "auth.js").unwrap(), None);
    }

    #[test]
    fn test_missing_strategy_is_fatal() {
        let config = route_config("x = {\n  auth: {\n    mode: 'try'\n  }\n}");
        let err = extractor().find_route_authentication(&config, "auth.js").unwrap_err();
        assert_eq!(err.to_string(), "Error parsing \"auth.js\" at line 2:\nMissing authentication strategy");
    }

    #[test]
    fn test_non_literal_strategy_is_fatal() {
        let config = route_config("x = { auth: { strategies: [TOKEN] } }");
        let err = extractor().find_route_authentication(&config, "auth.js").unwrap_err();
        assert!(err.to_string().contains("Expected type [Literal], found \"Identifier\""));
    }
}
