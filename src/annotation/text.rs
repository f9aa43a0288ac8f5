//! @ai:module:intent Single-value annotations: label, description, content type, scope, vendor tag, minimum version
//! @ai:module:layer domain
//! @ai:module:public_api LabelAnnotation, DescriptionAnnotation, ContentTypeAnnotation, ScopeAnnotation, VendorTagAnnotation, MinVersionAnnotation
//! @ai:module:stateless true

use super::{missing_field, AnnotationKind, AnnotationMeta};
use crate::docblock::RawAnnotation;
use crate::error::{Error, ErrorContext, Result};
use crate::mson::collapse_description;
use crate::registry::CapabilityRegistry;
use crate::version::VersionNumber;
use serde::{Deserialize, Serialize};

/// @ai:intent `@api-label` - short human name for an action or representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAnnotation {
    pub label: String,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl LabelAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let label = collapse_description(&raw.body);
        if label.is_empty() {
            return Err(missing_field(AnnotationKind::Label, "label"));
        }
        Ok(Self { label, meta })
    }
}

/// @ai:intent `@api-description` - free Markdown text, kept as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionAnnotation {
    pub description: String,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl DescriptionAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let description = dedent(&raw.body);
        if description.is_empty() {
            return Err(missing_field(AnnotationKind::Description, "description"));
        }
        Ok(Self { description, meta })
    }
}

/// Strip the indentation shared by every continuation line.
fn dedent(body: &str) -> String {
    let mut lines = body.lines();
    let first = lines.next().unwrap_or_default().trim().to_string();
    let rest: Vec<&str> = lines.collect();

    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = first;
    for line in rest {
        out.push('\n');
        out.push_str(line.get(indent..).unwrap_or_else(|| line.trim_start()));
    }

    out.trim().to_string()
}

/// @ai:intent `@api-contentType` - media type of the response, optionally version-forked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeAnnotation {
    pub content_type: String,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl ContentTypeAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let content_type = raw
            .body
            .split_whitespace()
            .next()
            .ok_or_else(|| missing_field(AnnotationKind::ContentType, "content_type"))?
            .to_string();
        Ok(Self { content_type, meta })
    }
}

/// @ai:intent `@api-scope` - authentication scope required to call an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAnnotation {
    pub scope: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl ScopeAnnotation {
    pub(crate) fn parse(
        raw: &RawAnnotation,
        meta: AnnotationMeta,
        registry: &dyn CapabilityRegistry,
    ) -> Result<Self> {
        let body = raw.body.trim();
        let (scope, description) = match body.split_once(char::is_whitespace) {
            Some((scope, rest)) => (scope, Some(collapse_description(rest))),
            None => (body, None),
        };

        if scope.is_empty() {
            return Err(missing_field(AnnotationKind::Scope, "scope"));
        }

        if !registry.has_scope(scope) {
            return Err(Error::UnknownScope {
                scope: scope.to_string(),
                context: ErrorContext::default(),
            });
        }

        Ok(Self {
            scope: scope.to_string(),
            description: description.filter(|d| !d.is_empty()),
            meta,
        })
    }
}

/// @ai:intent `@api-capability` / `@api-vendorTag` - gates an action or field behind a named capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorTagAnnotation {
    pub vendor_tag: String,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl VendorTagAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let vendor_tag = raw
            .body
            .split_whitespace()
            .next()
            .ok_or_else(|| missing_field(AnnotationKind::VendorTag, "vendor_tag"))?;

        Ok(Self {
            vendor_tag: vendor_tag.to_string(),
            meta,
        })
    }
}

/// @ai:intent `@api-minVersion` - first API version an action exists in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinVersionAnnotation {
    pub minimum_version: VersionNumber,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl MinVersionAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let body = raw.body.trim();
        if body.is_empty() {
            return Err(missing_field(AnnotationKind::MinVersion, "minimum_version"));
        }

        Ok(Self {
            minimum_version: body.parse()?,
            meta,
        })
    }
}
