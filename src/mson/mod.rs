//! @ai:module:intent Parse the MSON field and HTTP response shorthand grammars
//! @ai:module:layer domain
//! @ai:module:public_api FieldDescriptor, ResponseDescriptor, SUPPORTED_TYPES
//! @ai:module:stateless true

pub mod field;
pub mod response;

pub use field::FieldDescriptor;
pub use response::ResponseDescriptor;

use regex::Regex;
use std::sync::OnceLock;

/// Types a field may declare.
pub const SUPPORTED_TYPES: &[&str] = &[
    "array",
    "boolean",
    "datetime",
    "enum",
    "float",
    "integer",
    "number",
    "object",
    "string",
    "timestamp",
];

/// @ai:intent Check a type token against the supported set
pub fn is_supported_type(type_name: &str) -> bool {
    SUPPORTED_TYPES.contains(&type_name)
}

/// @ai:intent Collapse a multi-line description onto one line
/// @ai:example "first\n    second" -> "first second"
/// @ai:effects pure
pub fn collapse_description(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[ \t]*\r?\n\s*").expect("Invalid regex"));
    re.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_description() {
        assert_eq!(
            collapse_description("The movie's\n     runtime,\n  in minutes.  "),
            "The movie's runtime, in minutes."
        );
        assert_eq!(collapse_description("single"), "single");
    }

    #[test]
    fn test_supported_types() {
        assert!(is_supported_type("timestamp"));
        assert!(!is_supported_type("ARRRRRRR"));
    }
}
