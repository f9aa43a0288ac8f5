//! @ai:module:intent Parse one MSON field line with optional enum members
//! @ai:module:layer domain
//! @ai:module:public_api FieldDescriptor
//! @ai:module:depends_on mson, error
//! @ai:module:stateless true

use super::{collapse_description, is_supported_type};
use crate::error::{Error, ErrorContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// @ai:intent Parsed form of `field `sample` (type, required, CAPABILITY) - description`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field: String,
    #[serde(default)]
    pub sample_data: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub values: Option<BTreeMap<String, String>>,
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^(?P<field>[\w.*\-]+)(?:\s+`(?P<sample>[^`]*)`)?\s*\((?P<attrs>[^)]*)\)(?:\s*-\s*(?P<description>.*?))?\s*$",
        )
        .expect("Invalid regex")
    })
}

fn type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<type>[A-Za-z_]\w*)(?:<(?P<subtype>\\?[\w\\]+)>)?$").expect("Invalid regex")
    })
}

fn members_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\+\s*Members\s*$").expect("Invalid regex"))
}

fn member_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*-\s*`(?P<value>[^`]*)`\s*(?:-\s*(?P<description>.*))?$")
            .expect("Invalid regex")
    })
}

fn capability_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][\w\-]*$").expect("Invalid regex"))
}

impl FieldDescriptor {
    /// @ai:intent Parse an MSON field body for the named annotation
    /// @ai:pre content is the annotation body without the `@api-` tag
    /// @ai:post values is Some only when a `+ Members` block was present
    /// @ai:effects pure
    pub fn parse(annotation: &str, content: &str) -> Result<Self> {
        let invalid = || Error::InvalidMsonSyntax {
            annotation: annotation.to_string(),
            content: content.trim().to_string(),
            context: ErrorContext::default(),
        };

        let captures = field_regex().captures(content.trim()).ok_or_else(invalid)?;
        let field = captures["field"].to_string();
        let sample_data = captures.name("sample").map(|m| m.as_str().to_string());

        let mut attrs = captures["attrs"].split(',').map(str::trim);
        let type_token = attrs.next().filter(|t| !t.is_empty()).ok_or_else(invalid)?;
        let type_captures = type_regex().captures(type_token).ok_or_else(invalid)?;

        let type_name = type_captures["type"].to_string();
        if !is_supported_type(&type_name) {
            return Err(Error::UnsupportedType {
                type_name,
                annotation: annotation.to_string(),
                context: ErrorContext::default(),
            });
        }

        let subtype = type_captures.name("subtype").map(|m| m.as_str().to_string());
        if let Some(subtype) = &subtype {
            if !subtype.starts_with('\\') && !is_supported_type(subtype) {
                return Err(Error::UnsupportedType {
                    type_name: subtype.clone(),
                    annotation: annotation.to_string(),
                    context: ErrorContext::default(),
                });
            }
        }

        let mut required = false;
        let mut nullable = false;
        let mut capability = None;

        for attr in attrs {
            match attr {
                "required" => required = true,
                "optional" => required = false,
                "nullable" => nullable = true,
                token if capability.is_none() && capability_regex().is_match(token) => {
                    capability = Some(token.to_string());
                }
                _ => return Err(invalid()),
            }
        }

        let (description, values) = match captures.name("description") {
            Some(raw) => split_members(raw.as_str()),
            None => (None, None),
        };

        if type_name == "enum" && values.as_ref().map_or(true, BTreeMap::is_empty) {
            return Err(Error::MissingEnumOptions {
                field,
                annotation: annotation.to_string(),
                context: ErrorContext::default(),
            });
        }

        Ok(Self {
            field,
            sample_data,
            type_name,
            subtype,
            required,
            nullable,
            capability,
            description,
            values,
        })
    }
}

/// @ai:intent Separate the free-text description from a trailing `+ Members` list
/// @ai:effects pure
fn split_members(raw: &str) -> (Option<String>, Option<BTreeMap<String, String>>) {
    let (text, members) = match members_header_regex().find(raw) {
        Some(header) => (&raw[..header.start()], Some(&raw[header.end()..])),
        None => (raw, None),
    };

    let description = Some(collapse_description(text)).filter(|d| !d.is_empty());
    let values = members.map(parse_members);

    (description, values)
}

fn parse_members(block: &str) -> BTreeMap<String, String> {
    let mut members: Vec<(String, String)> = Vec::new();

    for line in block.lines() {
        if let Some(captures) = member_regex().captures(line) {
            let description = captures
                .name("description")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            members.push((captures["value"].to_string(), description));
        } else if !line.trim().is_empty() {
            // Wrapped member description.
            if let Some((_, description)) = members.last_mut() {
                description.push('\n');
                description.push_str(line);
            }
        }
    }

    members
        .into_iter()
        .map(|(value, description)| (value, collapse_description(&description)))
        .collect()
}
