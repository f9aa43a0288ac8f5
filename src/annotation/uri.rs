//! @ai:module:intent URI and URI segment (path parameter) annotations
//! @ai:module:layer domain
//! @ai:module:public_api UriAnnotation, UriSegmentAnnotation
//! @ai:module:stateless true

use super::{missing_field, AnnotationKind, AnnotationMeta};
use crate::docblock::RawAnnotation;
use crate::error::Result;
use crate::mson::FieldDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\{(?P<group>[^}]*)\}\s*(?P<rest>.*)$").expect("Invalid regex")
    })
}

fn path_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+(\w+)").expect("Invalid regex"))
}

/// @ai:intent `@api-uri:public {Group} /path/+param` - one routable path of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriAnnotation {
    pub group: String,
    pub path: String,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl UriAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let captures = group_regex()
            .captures(raw.body.trim())
            .ok_or_else(|| missing_field(AnnotationKind::Uri, "group"))?;

        let group = captures["group"].trim().to_string();
        if group.is_empty() {
            return Err(missing_field(AnnotationKind::Uri, "group"));
        }

        let path = captures["rest"]
            .split_whitespace()
            .next()
            .filter(|p| p.starts_with('/'))
            .ok_or_else(|| missing_field(AnnotationKind::Uri, "path"))?
            .to_string();

        Ok(Self { group, path, meta })
    }

    /// @ai:intent Path with `+param` markers rewritten as `{param}`
    /// @ai:example "/movies/+id" -> "/movies/{id}"
    pub fn clean_path(&self) -> String {
        path_param_regex()
            .replace_all(&self.path, "{$1}")
            .into_owned()
    }
}

/// @ai:intent `@api-uriSegment {/path} <MSON>` or `@api-pathParam <MSON>` - a path parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriSegmentAnnotation {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub field: FieldDescriptor,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl UriSegmentAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let kind = AnnotationKind::UriSegment;

        let (uri, mson) = if raw.tag == "urisegment" {
            let captures = group_regex()
                .captures(raw.body.trim())
                .ok_or_else(|| missing_field(kind, "uri"))?;
            let uri = captures["group"].trim().to_string();
            if uri.is_empty() {
                return Err(missing_field(kind, "uri"));
            }
            (Some(uri), captures["rest"].to_string())
        } else {
            (None, raw.body.clone())
        };

        let field = FieldDescriptor::parse(kind.name(), &mson)?;
        if field.description.is_none() {
            return Err(missing_field(kind, "description"));
        }

        Ok(Self { uri, field, meta })
    }

    /// @ai:intent Whether this segment documents the given uri path
    pub fn applies_to(&self, path: &str) -> bool {
        self.uri.as_deref().map_or(true, |uri| uri == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn raw(tag: &str, body: &str) -> RawAnnotation {
        RawAnnotation {
            tag: tag.to_string(),
            decorators: vec!["public".to_string()],
            body: body.to_string(),
            line: 1,
        }
    }

    #[test]
    fn test_uri() {
        let uri = UriAnnotation::parse(
            &raw("uri", "{Movies} /movies/+id"),
            AnnotationMeta::default(),
        )
        .unwrap();

        assert_eq!(uri.group, "Movies");
        assert_eq!(uri.path, "/movies/+id");
        assert_eq!(uri.clean_path(), "/movies/{id}");
    }

    #[test]
    fn test_uri_missing_parts() {
        let err = UriAnnotation::parse(&raw("uri", "/movies"), AnnotationMeta::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { ref field, .. } if field == "group"));

        let err = UriAnnotation::parse(&raw("uri", "{Movies}"), AnnotationMeta::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { ref field, .. } if field == "path"));
    }

    #[test]
    fn test_uri_segment_forms() {
        let segment = UriSegmentAnnotation::parse(
            &raw("urisegment", "{/movies/+id} id (integer) - Movie ID"),
            AnnotationMeta::default(),
        )
        .unwrap();
        assert_eq!(segment.uri.as_deref(), Some("/movies/+id"));
        assert_eq!(segment.field.field, "id");
        assert!(segment.applies_to("/movies/+id"));
        assert!(!segment.applies_to("/films/+id"));

        let param = UriSegmentAnnotation::parse(
            &raw("pathparam", "id (integer) - Movie ID"),
            AnnotationMeta::default(),
        )
        .unwrap();
        assert_eq!(param.uri, None);
        assert!(param.applies_to("/films/+id"));
    }
}
