//! @ai:module:intent Parse the `(code, Representation, errorCode, CAPABILITY) - description` shorthand
//! @ai:module:layer domain
//! @ai:module:public_api ResponseDescriptor
//! @ai:module:depends_on mson, registry, error
//! @ai:module:stateless true

use super::collapse_description;
use crate::error::{Error, ErrorContext, Result};
use crate::registry::CapabilityRegistry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// @ai:intent Parsed HTTP response shorthand shared by `@api-return` and `@api-throws`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub http_code: u16,
    #[serde(default)]
    pub representation: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn response_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\((?P<attrs>[^)]*)\)(?:\s*-\s*(?P<description>.*?))?\s*$")
            .expect("Invalid regex")
    })
}

impl ResponseDescriptor {
    /// @ai:intent Parse a response shorthand, consulting the registry to tell capabilities from error codes
    /// @ai:pre content is the annotation body without the `@api-` tag
    /// @ai:effects pure
    pub fn parse(
        annotation: &str,
        content: &str,
        registry: &dyn CapabilityRegistry,
    ) -> Result<Self> {
        let invalid = || Error::InvalidMsonSyntax {
            annotation: annotation.to_string(),
            content: content.trim().to_string(),
            context: ErrorContext::default(),
        };

        let captures = response_regex().captures(content.trim()).ok_or_else(invalid)?;
        let tokens: Vec<&str> = captures["attrs"].split(',').map(str::trim).collect();

        if tokens.len() > 4 || tokens.iter().any(|t| t.is_empty()) {
            return Err(invalid());
        }

        let http_code = tokens[0]
            .parse::<u16>()
            .ok()
            .filter(|code| (100..=599).contains(code))
            .ok_or_else(invalid)?;

        let representation = tokens.get(1).map(|t| t.to_string());

        let (error_code, capability) = match (tokens.get(2), tokens.get(3)) {
            (None, _) => (None, None),
            (Some(third), None) if registry.has_capability(third) => {
                (None, Some(third.to_string()))
            }
            (Some(third), None) => (Some(third.to_string()), None),
            (Some(third), Some(fourth)) => (Some(third.to_string()), Some(fourth.to_string())),
        };

        let description = captures
            .name("description")
            .map(|m| collapse_description(m.as_str()))
            .filter(|d| !d.is_empty());

        Ok(Self {
            http_code,
            representation,
            error_code,
            capability,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;

    fn registry() -> StaticRegistry {
        StaticRegistry::with_capabilities(&["BUY_TICKETS", "MOVIE_RATINGS"])
    }

    #[test]
    fn test_full_response() {
        let response = ResponseDescriptor::parse(
            "throws",
            r"(403, \Representation\CodedError, 666, BUY_TICKETS) - If the user
    cannot buy tickets.",
            &registry(),
        )
        .unwrap();

        assert_eq!(response.http_code, 403);
        assert_eq!(
            response.representation.as_deref(),
            Some(r"\Representation\CodedError")
        );
        assert_eq!(response.error_code.as_deref(), Some("666"));
        assert_eq!(response.capability.as_deref(), Some("BUY_TICKETS"));
        assert_eq!(
            response.description.as_deref(),
            Some("If the user cannot buy tickets.")
        );
    }

    #[test]
    fn test_third_token_capability_disambiguation() {
        let response = ResponseDescriptor::parse(
            "throws",
            r"(404, \Representation\Error, MOVIE_RATINGS)",
            &registry(),
        )
        .unwrap();
        assert_eq!(response.capability.as_deref(), Some("MOVIE_RATINGS"));
        assert_eq!(response.error_code, None);

        let response = ResponseDescriptor::parse(
            "throws",
            r"(404, \Representation\Error, 1337)",
            &registry(),
        )
        .unwrap();
        assert_eq!(response.error_code.as_deref(), Some("1337"));
        assert_eq!(response.capability, None);
        assert_eq!(response.description, None);
    }

    #[test]
    fn test_code_only() {
        let response = ResponseDescriptor::parse("return", "(204)", &registry()).unwrap();
        assert_eq!(response.http_code, 204);
        assert_eq!(response.representation, None);
    }

    #[test]
    fn test_invalid_response() {
        for content in ["404", "(abc)", "(200, )", "(999)", "(200, A, B, C, D)"] {
            assert!(
                matches!(
                    ResponseDescriptor::parse("return", content, &registry()),
                    Err(Error::InvalidMsonSyntax { .. })
                ),
                "content {:?}",
                content
            );
        }
    }
}
