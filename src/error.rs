//! @ai:module:intent Define error types for annotation parsing, compilation and changelogs
//! @ai:module:layer domain
//! @ai:module:public_api Error, ErrorContext, Result
//! @ai:module:stateless true

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Where an annotation came from, carried verbatim through every error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub class: Option<String>,
    pub method: Option<String>,
    pub docblock: Option<String>,
}

impl ErrorContext {
    /// @ai:intent Build a context for a class-level or method-level docblock
    pub fn new(class: &str, method: Option<&str>, docblock: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            method: method.map(str::to_string),
            docblock: Some(docblock.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.class.is_none() && self.method.is_none() && self.docblock.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.class, &self.method) {
            (Some(class), Some(method)) => write!(f, " (in {}::{})", class, method),
            (Some(class), None) => write!(f, " (in {})", class),
            _ => Ok(()),
        }
    }
}

/// @ai:intent Unified error type for parsing, compiling and changelog building
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unrecognized version schema `{constraint}`{context}")]
    UnrecognizedSchema {
        constraint: String,
        context: ErrorContext,
    },

    #[error("Version range `{constraint}` ends before it starts{context}")]
    LopsidedRange {
        constraint: String,
        context: ErrorContext,
    },

    #[error("Version range `{constraint}` starts and ends on the same version, use a plain version instead{context}")]
    BadRangeUse {
        constraint: String,
        context: ErrorContext,
    },

    #[error("Version range `{constraint}` may not contain operators{context}")]
    OperatorsWithinRange {
        constraint: String,
        context: ErrorContext,
    },

    #[error("`@api-{annotation}` is missing its required `{field}` field{context}")]
    MissingRequiredField {
        field: String,
        annotation: String,
        context: ErrorContext,
    },

    #[error("`@api-{annotation}` has invalid MSON syntax: `{content}`{context}")]
    InvalidMsonSyntax {
        annotation: String,
        content: String,
        context: ErrorContext,
    },

    #[error("`@api-{annotation}` uses unsupported type `{type_name}`{context}")]
    UnsupportedType {
        type_name: String,
        annotation: String,
        context: ErrorContext,
    },

    #[error("Enum field `{field}` on `@api-{annotation}` has no `+ Members` options{context}")]
    MissingEnumOptions {
        field: String,
        annotation: String,
        context: ErrorContext,
    },

    #[error("`@api-{annotation}` requires a `:public` or `:private` visibility decorator{context}")]
    MissingVisibilityDecorator {
        annotation: String,
        context: ErrorContext,
    },

    #[error("`@api-{annotation}` does not support the `:{decorator}` decorator{context}")]
    UnsupportedDecorator {
        decorator: String,
        annotation: String,
        context: ErrorContext,
    },

    #[error("`@api-{annotation}` is marked `:public` on an action that is only private{context}")]
    PublicDecoratorOnPrivateAction {
        annotation: String,
        context: ErrorContext,
    },

    #[error("Required annotation `@api-{annotation}` is missing{context}")]
    RequiredAnnotation {
        annotation: String,
        context: ErrorContext,
    },

    #[error("Only one `@api-{annotation}` annotation is allowed{context}")]
    MultipleAnnotations {
        annotation: String,
        context: ErrorContext,
    },

    #[error("No `@api-` annotations found{context}")]
    NoAnnotations { context: ErrorContext },

    #[error("Field `{field}` is documented more than once on `{representation}`{context}")]
    DuplicateField {
        field: String,
        representation: String,
        context: ErrorContext,
    },

    #[error("Field `{field}` is nested under `{parent}`, which is a `{parent_type}` instead of an object{context}")]
    ScalarParent {
        field: String,
        parent: String,
        parent_type: String,
        context: ErrorContext,
    },

    #[error("Scope `{scope}` is not declared in the configuration{context}")]
    UnknownScope {
        scope: String,
        context: ErrorContext,
    },

    #[error("Representation `{representation}` is not documented{context}")]
    UnknownRepresentation {
        representation: String,
        context: ErrorContext,
    },

    #[error("`@api-see {target}` does not point at a documented field docblock{context}")]
    UnresolvedSee {
        target: String,
        context: ErrorContext,
    },

    #[error("Cannot compile a `{definition}` changeset for `{change_type}` changes")]
    UnsupportedChangeset {
        definition: String,
        change_type: String,
    },
}

impl Error {
    /// @ai:intent Attach docblock context to an error that does not carry one yet
    /// @ai:post an existing non-empty context is never overwritten
    pub fn in_context(mut self, ctx: &ErrorContext) -> Self {
        if let Some(slot) = self.context_mut() {
            if slot.is_empty() {
                *slot = ctx.clone();
            }
        }
        self
    }

    /// @ai:intent Access the docblock context of annotation-level errors
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::UnrecognizedSchema { context, .. }
            | Error::LopsidedRange { context, .. }
            | Error::BadRangeUse { context, .. }
            | Error::OperatorsWithinRange { context, .. }
            | Error::MissingRequiredField { context, .. }
            | Error::InvalidMsonSyntax { context, .. }
            | Error::UnsupportedType { context, .. }
            | Error::MissingEnumOptions { context, .. }
            | Error::MissingVisibilityDecorator { context, .. }
            | Error::UnsupportedDecorator { context, .. }
            | Error::PublicDecoratorOnPrivateAction { context, .. }
            | Error::RequiredAnnotation { context, .. }
            | Error::MultipleAnnotations { context, .. }
            | Error::NoAnnotations { context }
            | Error::DuplicateField { context, .. }
            | Error::ScalarParent { context, .. }
            | Error::UnknownScope { context, .. }
            | Error::UnknownRepresentation { context, .. }
            | Error::UnresolvedSee { context, .. } => Some(context),
            Error::Io(_)
            | Error::FileRead { .. }
            | Error::Config(_)
            | Error::Json(_)
            | Error::UnsupportedChangeset { .. } => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            Error::UnrecognizedSchema { context, .. }
            | Error::LopsidedRange { context, .. }
            | Error::BadRangeUse { context, .. }
            | Error::OperatorsWithinRange { context, .. }
            | Error::MissingRequiredField { context, .. }
            | Error::InvalidMsonSyntax { context, .. }
            | Error::UnsupportedType { context, .. }
            | Error::MissingEnumOptions { context, .. }
            | Error::MissingVisibilityDecorator { context, .. }
            | Error::UnsupportedDecorator { context, .. }
            | Error::PublicDecoratorOnPrivateAction { context, .. }
            | Error::RequiredAnnotation { context, .. }
            | Error::MultipleAnnotations { context, .. }
            | Error::NoAnnotations { context }
            | Error::DuplicateField { context, .. }
            | Error::ScalarParent { context, .. }
            | Error::UnknownScope { context, .. }
            | Error::UnknownRepresentation { context, .. }
            | Error::UnresolvedSee { context, .. } => Some(context),
            Error::Io(_)
            | Error::FileRead { .. }
            | Error::Config(_)
            | Error::Json(_)
            | Error::UnsupportedChangeset { .. } => None,
        }
    }

    /// @ai:intent Stable lint code for reporting
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) | Error::FileRead { .. } => "E000",
            Error::UnrecognizedSchema { .. } => "E101",
            Error::LopsidedRange { .. } => "E102",
            Error::BadRangeUse { .. } => "E103",
            Error::OperatorsWithinRange { .. } => "E104",
            Error::MissingRequiredField { .. } => "E201",
            Error::InvalidMsonSyntax { .. } => "E202",
            Error::UnsupportedType { .. } => "E203",
            Error::MissingEnumOptions { .. } => "E204",
            Error::RequiredAnnotation { .. } => "E205",
            Error::NoAnnotations { .. } => "E206",
            Error::MissingVisibilityDecorator { .. } => "E301",
            Error::UnsupportedDecorator { .. } => "E302",
            Error::PublicDecoratorOnPrivateAction { .. } => "E303",
            Error::MultipleAnnotations { .. } => "E304",
            Error::DuplicateField { .. } => "E305",
            Error::UnknownScope { .. } => "E306",
            Error::UnknownRepresentation { .. } => "E307",
            Error::UnresolvedSee { .. } => "E308",
            Error::ScalarParent { .. } => "E309",
            Error::UnsupportedChangeset { .. } => "E401",
            Error::Config(_) => "E901",
            Error::Json(_) => "E902",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_attached_once() {
        let err = Error::LopsidedRange {
            constraint: "3.3 - 3.0".to_string(),
            context: ErrorContext::default(),
        };

        let first = ErrorContext::new("Movie", Some("GET"), "/** */");
        let second = ErrorContext::new("Theater", None, "/** */");
        let err = err.in_context(&first).in_context(&second);

        assert_eq!(err.context(), Some(&first));
        assert!(err.to_string().ends_with("(in Movie::GET)"));
    }

    #[test]
    fn test_ambient_errors_have_no_context() {
        let err = Error::Config("bad".to_string());
        assert!(err.context().is_none());
        assert_eq!(err.code(), "E901");
    }
}
