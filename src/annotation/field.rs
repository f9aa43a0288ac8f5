//! @ai:module:intent MSON-backed field annotations: request parameters, representation data, field reuse
//! @ai:module:layer domain
//! @ai:module:public_api ParamAnnotation, DataAnnotation, SeeAnnotation
//! @ai:module:stateless true

use super::{missing_field, AnnotationKind, AnnotationMeta};
use crate::docblock::RawAnnotation;
use crate::error::Result;
use crate::mson::FieldDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn parse_described_field(kind: AnnotationKind, body: &str) -> Result<FieldDescriptor> {
    let field = FieldDescriptor::parse(kind.name(), body)?;
    if field.description.is_none() {
        return Err(missing_field(kind, "description"));
    }
    Ok(field)
}

/// @ai:intent `@api-param:public <MSON>` - a request parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamAnnotation {
    #[serde(flatten)]
    pub field: FieldDescriptor,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl ParamAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        Ok(Self {
            field: parse_described_field(AnnotationKind::Param, &raw.body)?,
            meta,
        })
    }
}

/// @ai:intent `@api-data <MSON>` - one field of a representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAnnotation {
    #[serde(flatten)]
    pub field: FieldDescriptor,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl DataAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        Ok(Self {
            field: parse_described_field(AnnotationKind::Data, &raw.body)?,
            meta,
        })
    }

    pub fn name(&self) -> &str {
        &self.field.field
    }
}

fn see_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<class>[\w\\]+)::(?P<method>\w+)(?:\s+(?P<prefix>[\w.]+))?$")
            .expect("Invalid regex")
    })
}

/// @ai:intent `@api-see \Class::method [prefix]` - reuse the data fields of another docblock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeeAnnotation {
    pub class: String,
    pub method: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl SeeAnnotation {
    pub(crate) fn parse(raw: &RawAnnotation, meta: AnnotationMeta) -> Result<Self> {
        let captures = see_regex()
            .captures(raw.body.trim())
            .ok_or_else(|| missing_field(AnnotationKind::See, "target"))?;

        Ok(Self {
            class: captures["class"].to_string(),
            method: captures["method"].to_string(),
            prefix: captures.name("prefix").map(|m| m.as_str().to_string()),
            meta,
        })
    }

    pub fn target(&self) -> String {
        format!("{}::{}", self.class, self.method)
    }

    /// @ai:intent Field name as seen through this reference
    /// @ai:example prefix "external_urls", field "imdb" -> "external_urls.imdb"
    pub fn prefixed(&self, field: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        }
    }
}
