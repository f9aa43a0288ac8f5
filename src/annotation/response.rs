//! @ai:module:intent Response annotations: successful returns and thrown errors
//! @ai:module:layer domain
//! @ai:module:public_api ReturnAnnotation, ErrorAnnotation
//! @ai:module:stateless true

use super::{missing_field, AnnotationKind, AnnotationMeta};
use crate::docblock::RawAnnotation;
use crate::error::{Error, ErrorContext, Result};
use crate::mson::ResponseDescriptor;
use crate::registry::CapabilityRegistry;
use serde::{Deserialize, Serialize};

/// @ai:intent `@api-return:public (200, \Representation) - description`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAnnotation {
    #[serde(flatten)]
    pub response: ResponseDescriptor,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl ReturnAnnotation {
    pub(crate) fn parse(
        raw: &RawAnnotation,
        meta: AnnotationMeta,
        registry: &dyn CapabilityRegistry,
    ) -> Result<Self> {
        let kind = AnnotationKind::Return;
        let response = ResponseDescriptor::parse(kind.name(), &raw.body, registry)?;

        // Only capabilities may follow the representation on a return.
        if response.error_code.is_some() {
            return Err(Error::InvalidMsonSyntax {
                annotation: kind.name().to_string(),
                content: raw.body.trim().to_string(),
                context: ErrorContext::default(),
            });
        }

        Ok(Self { response, meta })
    }
}

/// @ai:intent `@api-throws:public (404, \Representation, 1337, CAPABILITY) - description`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnnotation {
    #[serde(flatten)]
    pub response: ResponseDescriptor,
    #[serde(flatten)]
    pub meta: AnnotationMeta,
}

impl ErrorAnnotation {
    pub(crate) fn parse(
        raw: &RawAnnotation,
        meta: AnnotationMeta,
        registry: &dyn CapabilityRegistry,
    ) -> Result<Self> {
        let kind = AnnotationKind::Error;
        let response = ResponseDescriptor::parse(kind.name(), &raw.body, registry)?;

        if response.representation.is_none() {
            return Err(missing_field(kind, "representation"));
        }

        Ok(Self { response, meta })
    }

    pub fn representation(&self) -> &str {
        self.response.representation.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;

    fn raw(body: &str) -> RawAnnotation {
        RawAnnotation {
            tag: "throws".to_string(),
            decorators: vec!["public".to_string()],
            body: body.to_string(),
            line: 1,
        }
    }

    #[test]
    fn test_error_requires_representation() {
        let err = ErrorAnnotation::parse(
            &raw("(404) - Not found"),
            AnnotationMeta::default(),
            &StaticRegistry::default(),
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::MissingRequiredField { ref field, .. } if field == "representation")
        );
    }

    #[test]
    fn test_return_rejects_error_code() {
        let registry = StaticRegistry::with_capabilities(&["MOVIE_RATINGS"]);

        let ok = ReturnAnnotation::parse(
            &raw(r"(200, \Representations\Movie, MOVIE_RATINGS)"),
            AnnotationMeta::default(),
            &registry,
        )
        .unwrap();
        assert_eq!(ok.response.capability.as_deref(), Some("MOVIE_RATINGS"));

        let err = ReturnAnnotation::parse(
            &raw(r"(200, \Representations\Movie, 1337)"),
            AnnotationMeta::default(),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidMsonSyntax { .. }));
    }
}
