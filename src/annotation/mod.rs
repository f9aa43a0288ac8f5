//! @ai:module:intent Typed `@api-` annotations: kinds, shared metadata, parsing and hydration
//! @ai:module:layer domain
//! @ai:module:public_api Annotation, AnnotationKind, AnnotationMeta, Visibility, parse, parse_docblock, resolve_version_scopes
//! @ai:module:depends_on docblock, mson, version, registry, error
//! @ai:module:stateless true

pub mod field;
pub mod response;
pub mod text;
pub mod uri;

pub use field::{DataAnnotation, ParamAnnotation, SeeAnnotation};
pub use response::{ErrorAnnotation, ReturnAnnotation};
pub use text::{
    ContentTypeAnnotation, DescriptionAnnotation, LabelAnnotation, MinVersionAnnotation,
    ScopeAnnotation, VendorTagAnnotation,
};
pub use uri::{UriAnnotation, UriSegmentAnnotation};

use crate::docblock::RawAnnotation;
use crate::error::{Error, ErrorContext, Result};
use crate::registry::CapabilityRegistry;
use crate::version::{Version, VersionNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// @ai:intent Closed set of annotation kinds this compiler understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Label,
    Description,
    Uri,
    UriSegment,
    Param,
    Return,
    Error,
    ContentType,
    Scope,
    VendorTag,
    MinVersion,
    Data,
    See,
}

impl AnnotationKind {
    /// @ai:intent Map a lowercased tag name (`uri`, `pathparam`, `throws`, ...) to its kind
    /// @ai:post unknown tags map to None so callers can drop them
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "label" => AnnotationKind::Label,
            "description" => AnnotationKind::Description,
            "uri" | "path" => AnnotationKind::Uri,
            "urisegment" | "pathparam" => AnnotationKind::UriSegment,
            "param" => AnnotationKind::Param,
            "return" => AnnotationKind::Return,
            "throws" | "error" => AnnotationKind::Error,
            "contenttype" => AnnotationKind::ContentType,
            "scope" => AnnotationKind::Scope,
            "capability" | "vendortag" => AnnotationKind::VendorTag,
            "minversion" => AnnotationKind::MinVersion,
            "data" => AnnotationKind::Data,
            "see" => AnnotationKind::See,
            _ => return None,
        };
        Some(kind)
    }

    /// @ai:intent Canonical tag name used in messages
    pub fn name(self) -> &'static str {
        match self {
            AnnotationKind::Label => "label",
            AnnotationKind::Description => "description",
            AnnotationKind::Uri => "uri",
            AnnotationKind::UriSegment => "uriSegment",
            AnnotationKind::Param => "param",
            AnnotationKind::Return => "return",
            AnnotationKind::Error => "throws",
            AnnotationKind::ContentType => "contentType",
            AnnotationKind::Scope => "scope",
            AnnotationKind::VendorTag => "vendorTag",
            AnnotationKind::MinVersion => "minVersion",
            AnnotationKind::Data => "data",
            AnnotationKind::See => "see",
        }
    }

    pub fn supports_versioning(self) -> bool {
        matches!(
            self,
            AnnotationKind::Param
                | AnnotationKind::Return
                | AnnotationKind::Error
                | AnnotationKind::ContentType
                | AnnotationKind::Data
                | AnnotationKind::See
        )
    }

    /// @ai:intent Kinds that must carry an explicit `:public` or `:private` decorator
    pub fn requires_visibility_decorator(self) -> bool {
        matches!(
            self,
            AnnotationKind::Uri
                | AnnotationKind::Param
                | AnnotationKind::Return
                | AnnotationKind::Error
        )
    }

    pub fn supports_deprecation(self) -> bool {
        matches!(
            self,
            AnnotationKind::Uri | AnnotationKind::Param | AnnotationKind::Data
        )
    }

    pub fn supports_scopes(self) -> bool {
        matches!(self, AnnotationKind::Data | AnnotationKind::See)
    }

    pub fn supports_vendor_tags(self) -> bool {
        matches!(
            self,
            AnnotationKind::Param
                | AnnotationKind::Return
                | AnnotationKind::Error
                | AnnotationKind::Data
                | AnnotationKind::See
        )
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// @ai:intent Visibility decorator value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// @ai:intent Capabilities shared by every annotation kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vendor_tags: Vec<String>,
    #[serde(skip)]
    pub context: ErrorContext,
}

impl AnnotationMeta {
    pub fn is_public(&self) -> bool {
        self.visibility == Some(Visibility::Public)
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Some(Visibility::Private)
    }

    /// @ai:intent Unversioned annotations are visible in every version
    pub fn matches_version(&self, version: VersionNumber) -> bool {
        self.version.as_ref().map_or(true, |v| v.contains(version))
    }
}

/// @ai:intent One parsed annotation; consumers match over every variant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Label(LabelAnnotation),
    Description(DescriptionAnnotation),
    Uri(UriAnnotation),
    UriSegment(UriSegmentAnnotation),
    Param(ParamAnnotation),
    Return(ReturnAnnotation),
    Error(ErrorAnnotation),
    ContentType(ContentTypeAnnotation),
    Scope(ScopeAnnotation),
    VendorTag(VendorTagAnnotation),
    MinVersion(MinVersionAnnotation),
    Data(DataAnnotation),
    See(SeeAnnotation),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Label(_) => AnnotationKind::Label,
            Annotation::Description(_) => AnnotationKind::Description,
            Annotation::Uri(_) => AnnotationKind::Uri,
            Annotation::UriSegment(_) => AnnotationKind::UriSegment,
            Annotation::Param(_) => AnnotationKind::Param,
            Annotation::Return(_) => AnnotationKind::Return,
            Annotation::Error(_) => AnnotationKind::Error,
            Annotation::ContentType(_) => AnnotationKind::ContentType,
            Annotation::Scope(_) => AnnotationKind::Scope,
            Annotation::VendorTag(_) => AnnotationKind::VendorTag,
            Annotation::MinVersion(_) => AnnotationKind::MinVersion,
            Annotation::Data(_) => AnnotationKind::Data,
            Annotation::See(_) => AnnotationKind::See,
        }
    }

    pub fn meta(&self) -> &AnnotationMeta {
        match self {
            Annotation::Label(a) => &a.meta,
            Annotation::Description(a) => &a.meta,
            Annotation::Uri(a) => &a.meta,
            Annotation::UriSegment(a) => &a.meta,
            Annotation::Param(a) => &a.meta,
            Annotation::Return(a) => &a.meta,
            Annotation::Error(a) => &a.meta,
            Annotation::ContentType(a) => &a.meta,
            Annotation::Scope(a) => &a.meta,
            Annotation::VendorTag(a) => &a.meta,
            Annotation::MinVersion(a) => &a.meta,
            Annotation::Data(a) => &a.meta,
            Annotation::See(a) => &a.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut AnnotationMeta {
        match self {
            Annotation::Label(a) => &mut a.meta,
            Annotation::Description(a) => &mut a.meta,
            Annotation::Uri(a) => &mut a.meta,
            Annotation::UriSegment(a) => &mut a.meta,
            Annotation::Param(a) => &mut a.meta,
            Annotation::Return(a) => &mut a.meta,
            Annotation::Error(a) => &mut a.meta,
            Annotation::ContentType(a) => &mut a.meta,
            Annotation::Scope(a) => &mut a.meta,
            Annotation::VendorTag(a) => &mut a.meta,
            Annotation::MinVersion(a) => &mut a.meta,
            Annotation::Data(a) => &mut a.meta,
            Annotation::See(a) => &mut a.meta,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        self.meta().version.as_ref()
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.meta().visibility
    }

    /// @ai:intent Every vendor tag gating this annotation, inline capability tokens included
    pub fn vendor_tags(&self) -> Vec<&str> {
        let inline = match self {
            Annotation::Param(a) => a.field.capability.as_deref(),
            Annotation::Data(a) => a.field.capability.as_deref(),
            Annotation::UriSegment(a) => a.field.capability.as_deref(),
            Annotation::Return(a) => a.response.capability.as_deref(),
            Annotation::Error(a) => a.response.capability.as_deref(),
            Annotation::Label(_)
            | Annotation::Description(_)
            | Annotation::Uri(_)
            | Annotation::ContentType(_)
            | Annotation::Scope(_)
            | Annotation::VendorTag(_)
            | Annotation::MinVersion(_)
            | Annotation::See(_) => None,
        };

        inline
            .into_iter()
            .chain(self.meta().vendor_tags.iter().map(String::as_str))
            .collect()
    }

    /// @ai:intent Canonical serialized form used for hydration and tests
    /// @ai:post never includes the docblock context
    pub fn to_array(&self) -> Result<serde_json::Value> {
        let value = match self {
            Annotation::Label(a) => serde_json::to_value(a)?,
            Annotation::Description(a) => serde_json::to_value(a)?,
            Annotation::Uri(a) => serde_json::to_value(a)?,
            Annotation::UriSegment(a) => serde_json::to_value(a)?,
            Annotation::Param(a) => serde_json::to_value(a)?,
            Annotation::Return(a) => serde_json::to_value(a)?,
            Annotation::Error(a) => serde_json::to_value(a)?,
            Annotation::ContentType(a) => serde_json::to_value(a)?,
            Annotation::Scope(a) => serde_json::to_value(a)?,
            Annotation::VendorTag(a) => serde_json::to_value(a)?,
            Annotation::MinVersion(a) => serde_json::to_value(a)?,
            Annotation::Data(a) => serde_json::to_value(a)?,
            Annotation::See(a) => serde_json::to_value(a)?,
        };
        Ok(value)
    }

    /// @ai:intent Rebuild an annotation from its `to_array` form under an externally supplied version
    /// @ai:post the serialized version is replaced; scopes and vendor tags are restored as serialized
    pub fn hydrate(
        kind: AnnotationKind,
        serialized: serde_json::Value,
        version: Option<Version>,
        ctx: &ErrorContext,
    ) -> Result<Self> {
        let mut annotation = match kind {
            AnnotationKind::Label => Annotation::Label(serde_json::from_value(serialized)?),
            AnnotationKind::Description => {
                Annotation::Description(serde_json::from_value(serialized)?)
            }
            AnnotationKind::Uri => Annotation::Uri(serde_json::from_value(serialized)?),
            AnnotationKind::UriSegment => {
                Annotation::UriSegment(serde_json::from_value(serialized)?)
            }
            AnnotationKind::Param => Annotation::Param(serde_json::from_value(serialized)?),
            AnnotationKind::Return => Annotation::Return(serde_json::from_value(serialized)?),
            AnnotationKind::Error => Annotation::Error(serde_json::from_value(serialized)?),
            AnnotationKind::ContentType => {
                Annotation::ContentType(serde_json::from_value(serialized)?)
            }
            AnnotationKind::Scope => Annotation::Scope(serde_json::from_value(serialized)?),
            AnnotationKind::VendorTag => {
                Annotation::VendorTag(serde_json::from_value(serialized)?)
            }
            AnnotationKind::MinVersion => {
                Annotation::MinVersion(serde_json::from_value(serialized)?)
            }
            AnnotationKind::Data => Annotation::Data(serde_json::from_value(serialized)?),
            AnnotationKind::See => Annotation::See(serde_json::from_value(serialized)?),
        };

        let meta = annotation.meta_mut();
        meta.version = if kind.supports_versioning() { version } else { None };
        meta.context = ctx.clone();

        Ok(annotation)
    }
}

/// @ai:intent Translate decorators into metadata, enforcing what each kind supports
/// @ai:effects pure
fn decorate(kind: AnnotationKind, raw: &RawAnnotation) -> Result<AnnotationMeta> {
    let mut meta = AnnotationMeta::default();

    for decorator in &raw.decorators {
        let supported = match decorator.as_str() {
            "public" => {
                meta.visibility = Some(Visibility::Public);
                kind.requires_visibility_decorator()
            }
            "private" => {
                meta.visibility = Some(Visibility::Private);
                kind.requires_visibility_decorator()
            }
            "deprecated" => {
                meta.deprecated = true;
                kind.supports_deprecation()
            }
            _ => false,
        };

        if !supported {
            return Err(Error::UnsupportedDecorator {
                decorator: decorator.clone(),
                annotation: kind.name().to_string(),
                context: ErrorContext::default(),
            });
        }
    }

    if kind.requires_visibility_decorator() && meta.visibility.is_none() {
        return Err(Error::MissingVisibilityDecorator {
            annotation: kind.name().to_string(),
            context: ErrorContext::default(),
        });
    }

    Ok(meta)
}

/// @ai:intent Parse one raw annotation of a known kind
/// @ai:pre kind == AnnotationKind::from_tag(&raw.tag)
/// @ai:post every error carries ctx
pub fn parse(
    kind: AnnotationKind,
    raw: &RawAnnotation,
    version: Option<&Version>,
    ctx: &ErrorContext,
    registry: &dyn CapabilityRegistry,
) -> Result<Annotation> {
    parse_inner(kind, raw, version, registry)
        .map(|mut annotation| {
            annotation.meta_mut().context = ctx.clone();
            annotation
        })
        .map_err(|e| e.in_context(ctx))
}

fn parse_inner(
    kind: AnnotationKind,
    raw: &RawAnnotation,
    version: Option<&Version>,
    registry: &dyn CapabilityRegistry,
) -> Result<Annotation> {
    let mut meta = decorate(kind, raw)?;
    if kind.supports_versioning() {
        meta.version = version.cloned();
    }

    let annotation = match kind {
        AnnotationKind::Label => Annotation::Label(LabelAnnotation::parse(raw, meta)?),
        AnnotationKind::Description => {
            Annotation::Description(DescriptionAnnotation::parse(raw, meta)?)
        }
        AnnotationKind::Uri => Annotation::Uri(UriAnnotation::parse(raw, meta)?),
        AnnotationKind::UriSegment => {
            Annotation::UriSegment(UriSegmentAnnotation::parse(raw, meta)?)
        }
        AnnotationKind::Param => Annotation::Param(ParamAnnotation::parse(raw, meta)?),
        AnnotationKind::Return => {
            Annotation::Return(ReturnAnnotation::parse(raw, meta, registry)?)
        }
        AnnotationKind::Error => Annotation::Error(ErrorAnnotation::parse(raw, meta, registry)?),
        AnnotationKind::ContentType => {
            Annotation::ContentType(ContentTypeAnnotation::parse(raw, meta)?)
        }
        AnnotationKind::Scope => Annotation::Scope(ScopeAnnotation::parse(raw, meta, registry)?),
        AnnotationKind::VendorTag => {
            Annotation::VendorTag(VendorTagAnnotation::parse(raw, meta)?)
        }
        AnnotationKind::MinVersion => {
            Annotation::MinVersion(MinVersionAnnotation::parse(raw, meta)?)
        }
        AnnotationKind::Data => Annotation::Data(DataAnnotation::parse(raw, meta)?),
        AnnotationKind::See => Annotation::See(SeeAnnotation::parse(raw, meta)?),
    };

    Ok(annotation)
}

/// @ai:intent Pair every annotation with the `@api-version` scope it sits under
/// @ai:post `@api-version` entries themselves are consumed
pub fn resolve_version_scopes<'a>(
    raw: &'a [RawAnnotation],
    ctx: &ErrorContext,
) -> Result<Vec<(&'a RawAnnotation, Option<Version>)>> {
    let mut scope: Option<Version> = None;
    let mut scoped = Vec::with_capacity(raw.len());

    for annotation in raw {
        if annotation.tag == "version" {
            scope = Some(Version::parse_in(&annotation.body, ctx)?);
            continue;
        }
        scoped.push((annotation, scope.clone()));
    }

    Ok(scoped)
}

/// @ai:intent Parse every known annotation of a docblock, dropping unknown tags
/// @ai:effects pure
pub fn parse_docblock(
    raw: &[RawAnnotation],
    ctx: &ErrorContext,
    registry: &dyn CapabilityRegistry,
) -> Result<Vec<Annotation>> {
    let mut annotations = Vec::new();

    for (annotation, version) in resolve_version_scopes(raw, ctx)? {
        match AnnotationKind::from_tag(&annotation.tag) {
            Some(kind) => annotations.push(parse(kind, annotation, version.as_ref(), ctx, registry)?),
            None => tracing::debug!("Dropping unknown annotation @api-{}", annotation.tag),
        }
    }

    Ok(annotations)
}

/// @ai:intent Shorthand for a missing-field error on the given kind
pub(crate) fn missing_field(kind: AnnotationKind, field: &str) -> Error {
    Error::MissingRequiredField {
        field: field.to_string(),
        annotation: kind.name().to_string(),
        context: ErrorContext::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docblock::tokenize;
    use crate::registry::StaticRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> ErrorContext {
        ErrorContext::new("MovieController", Some("GET"), "/** */")
    }

    #[test]
    fn test_version_scope_applies_to_following_annotations() {
        let raw = tokenize(
            r"/**
 * @api-param:public title (string) - Title
 * @api-version >=1.1
 * @api-param:public runtime (integer) - Runtime
 * @api-label Not versioned
 */",
        );

        let annotations = parse_docblock(&raw, &ctx(), &StaticRegistry::default()).unwrap();
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[0].version(), None);
        assert_eq!(annotations[1].version().map(Version::constraint), Some(">=1.1"));
        assert_eq!(annotations[2].version(), None);
    }

    #[test]
    fn test_missing_visibility_decorator() {
        let raw = tokenize("/** @api-param title (string) - Title */");
        let err = parse_docblock(&raw, &ctx(), &StaticRegistry::default()).unwrap_err();

        assert!(matches!(err, Error::MissingVisibilityDecorator { ref annotation, .. } if annotation == "param"));
        assert_eq!(err.context(), Some(&ctx()));
    }

    #[test]
    fn test_unsupported_decorator() {
        let raw = tokenize("/** @api-label:public Movies */");
        let err = parse_docblock(&raw, &ctx(), &StaticRegistry::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDecorator { ref decorator, .. } if decorator == "public"));
    }

    #[test]
    fn test_unknown_tags_are_dropped() {
        let raw = tokenize("/** @api-somethingnew whatever\n * @api-label Movies */");
        let annotations = parse_docblock(&raw, &ctx(), &StaticRegistry::default()).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].kind(), AnnotationKind::Label);
    }

    #[test]
    fn test_hydrate_replaces_version() {
        let raw = tokenize(
            r"/**
 * @api-version <1.2
 * @api-data rating `G` (string, MOVIE_RATINGS) - Rating
 */",
        );
        let mut annotations = parse_docblock(&raw, &ctx(), &StaticRegistry::default()).unwrap();
        if let Annotation::Data(data) = &mut annotations[0] {
            data.meta.scopes.push("edit".to_string());
        }

        let serialized = annotations[0].to_array().unwrap();
        assert_eq!(
            serialized,
            json!({
                "field": "rating",
                "sample_data": "G",
                "type": "string",
                "subtype": null,
                "required": false,
                "nullable": false,
                "capability": "MOVIE_RATINGS",
                "description": "Rating",
                "values": null,
                "version": "<1.2",
                "scopes": ["edit"],
            })
        );

        let hydrated = Annotation::hydrate(
            AnnotationKind::Data,
            serialized,
            Some(Version::parse(">=1.1").unwrap()),
            &ctx(),
        )
        .unwrap();

        assert_eq!(hydrated.version().map(Version::constraint), Some(">=1.1"));
        assert_eq!(hydrated.meta().scopes, vec!["edit".to_string()]);
        assert_eq!(hydrated.vendor_tags(), vec!["MOVIE_RATINGS"]);
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(AnnotationKind::Param.supports_versioning());
        assert!(!AnnotationKind::Label.supports_versioning());
        assert!(AnnotationKind::Uri.requires_visibility_decorator());
        assert!(!AnnotationKind::Data.requires_visibility_decorator());
        assert_eq!(AnnotationKind::from_tag("pathparam"), Some(AnnotationKind::UriSegment));
        assert_eq!(AnnotationKind::from_tag("throws"), Some(AnnotationKind::Error));
        assert_eq!(AnnotationKind::from_tag("nope"), None);
    }
}
