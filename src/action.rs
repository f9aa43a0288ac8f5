//! @ai:module:intent Aggregate the annotations of one controller method into a resource action
//! @ai:module:layer application
//! @ai:module:public_api ActionSource, ActionDocumentation, Action
//! @ai:module:depends_on annotation, docblock, version, registry, error
//! @ai:module:stateless true

use crate::annotation::{
    self, Annotation, AnnotationKind, ContentTypeAnnotation, DescriptionAnnotation,
    ErrorAnnotation, LabelAnnotation, ParamAnnotation, ReturnAnnotation, ScopeAnnotation,
    UriAnnotation, UriSegmentAnnotation, Visibility,
};
use crate::docblock::{tokenize, RawAnnotation};
use crate::error::{Error, ErrorContext, Result};
use crate::registry::CapabilityRegistry;
use crate::version::{Version, VersionNumber};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Annotation kinds an action keeps after label, description and content type.
const ACCEPTED_ANNOTATIONS: &[AnnotationKind] = &[
    AnnotationKind::VendorTag,
    AnnotationKind::Param,
    AnnotationKind::MinVersion,
    AnnotationKind::Return,
    AnnotationKind::Scope,
    AnnotationKind::Error,
    AnnotationKind::Uri,
    AnnotationKind::UriSegment,
];

const REQUIRED_ANNOTATIONS: &[AnnotationKind] = &[AnnotationKind::Uri];

/// @ai:intent Raw docblock of one controller method as handed over by the source reader
#[derive(Debug, Clone)]
pub struct ActionSource {
    pub class: String,
    pub method: String,
    pub docblock: String,
    pub file: Option<PathBuf>,
    pub line: usize,
}

impl ActionSource {
    pub fn new(class: &str, method: &str, docblock: &str) -> Self {
        Self {
            class: class.to_string(),
            method: method.to_uppercase(),
            docblock: docblock.to_string(),
            file: None,
            line: 0,
        }
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext::new(&self.class, Some(&self.method), &self.docblock)
    }
}

/// @ai:intent An unparsed action; `parse` is the only transition and either yields an Action or fails
#[derive(Debug, Clone)]
pub struct ActionDocumentation {
    source: ActionSource,
}

type Scoped<'a> = (&'a RawAnnotation, Option<Version>);

impl ActionDocumentation {
    pub fn new(source: ActionSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &ActionSource {
        &self.source
    }

    /// @ai:intent Validate and aggregate the docblock, stopping at the first failed gate
    /// @ai:post the returned Action has exactly one label, at least one content type and at least one uri
    /// @ai:effects pure
    pub fn parse(&self, registry: &dyn CapabilityRegistry) -> Result<Action> {
        let ctx = self.source.context();
        let raw = tokenize(&self.source.docblock);
        let scoped = annotation::resolve_version_scopes(&raw, &ctx)?;

        // 1. Exactly one label.
        let labels = of_kind(&scoped, AnnotationKind::Label);
        let (raw_label, _) = require_one(&labels, AnnotationKind::Label, &ctx)?;
        let label = match annotation::parse(AnnotationKind::Label, raw_label, None, &ctx, registry)? {
            Annotation::Label(label) => label,
            _ => return Err(required(AnnotationKind::Label, &ctx)),
        };

        // 2. Optional description.
        let descriptions = of_kind(&scoped, AnnotationKind::Description);
        if descriptions.len() > 1 {
            return Err(multiple(AnnotationKind::Description, &ctx));
        }
        let description = match descriptions.first() {
            Some((raw, version)) => {
                match annotation::parse(
                    AnnotationKind::Description,
                    raw,
                    version.as_ref(),
                    &ctx,
                    registry,
                )? {
                    Annotation::Description(description) => Some(description),
                    _ => None,
                }
            }
            None => None,
        };

        // 3. Content type, possibly forked by version.
        let content_types = parse_content_types(&scoped, &ctx, registry)?;

        // 4. Everything else the action understands.
        let mut annotations = Vec::new();
        let mut min_versions = 0;
        for (raw, version) in &scoped {
            let kind = match AnnotationKind::from_tag(&raw.tag) {
                Some(kind) if ACCEPTED_ANNOTATIONS.contains(&kind) => kind,
                Some(
                    AnnotationKind::Label
                    | AnnotationKind::Description
                    | AnnotationKind::ContentType,
                ) => continue,
                _ => {
                    tracing::debug!(
                        "Dropping @api-{} on {}::{}",
                        raw.tag,
                        self.source.class,
                        self.source.method
                    );
                    continue;
                }
            };

            if kind == AnnotationKind::MinVersion {
                min_versions += 1;
                if min_versions > 1 {
                    return Err(multiple(kind, &ctx));
                }
            }

            annotations.push(annotation::parse(kind, raw, version.as_ref(), &ctx, registry)?);
        }

        // 5. Required annotations.
        for required in REQUIRED_ANNOTATIONS {
            if !annotations.iter().any(|a| a.kind() == *required) {
                return Err(Error::RequiredAnnotation {
                    annotation: required.name().to_string(),
                    context: ctx,
                });
            }
        }

        let action = Action {
            class: self.source.class.clone(),
            method: self.source.method.clone(),
            label,
            description,
            content_types,
            annotations,
        };

        // 6. Nothing public may hide under a private-only action.
        action.check_visibility(&ctx)?;

        Ok(action)
    }
}

fn of_kind<'a, 'b>(scoped: &'b [Scoped<'a>], kind: AnnotationKind) -> Vec<&'b Scoped<'a>> {
    scoped
        .iter()
        .filter(|(raw, _)| AnnotationKind::from_tag(&raw.tag) == Some(kind))
        .collect()
}

fn multiple(kind: AnnotationKind, ctx: &ErrorContext) -> Error {
    Error::MultipleAnnotations {
        annotation: kind.name().to_string(),
        context: ctx.clone(),
    }
}

fn required(kind: AnnotationKind, ctx: &ErrorContext) -> Error {
    Error::RequiredAnnotation {
        annotation: kind.name().to_string(),
        context: ctx.clone(),
    }
}

fn require_one<'s, T>(found: &[&'s T], kind: AnnotationKind, ctx: &ErrorContext) -> Result<&'s T> {
    match found {
        [] => Err(required(kind, ctx)),
        [one] => Ok(*one),
        _ => Err(multiple(kind, ctx)),
    }
}

fn parse_content_types(
    scoped: &[Scoped<'_>],
    ctx: &ErrorContext,
    registry: &dyn CapabilityRegistry,
) -> Result<Vec<ContentTypeAnnotation>> {
    let found = of_kind(scoped, AnnotationKind::ContentType);
    if found.is_empty() {
        return Err(required(AnnotationKind::ContentType, ctx));
    }

    let unversioned = found.iter().filter(|(_, version)| version.is_none()).count();
    if unversioned > 1 {
        return Err(multiple(AnnotationKind::ContentType, ctx));
    }

    found
        .into_iter()
        .map(|(raw, version)| {
            match annotation::parse(
                AnnotationKind::ContentType,
                raw,
                version.as_ref(),
                ctx,
                registry,
            )? {
                Annotation::ContentType(content_type) => Ok(content_type),
                _ => Err(required(AnnotationKind::ContentType, ctx)),
            }
        })
        .collect()
}

/// @ai:intent One HTTP method on one controller, fully parsed and immutable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub class: String,
    pub method: String,
    pub label: LabelAnnotation,
    pub description: Option<DescriptionAnnotation>,
    pub content_types: Vec<ContentTypeAnnotation>,
    pub annotations: Vec<Annotation>,
}

impl Action {
    pub fn uris(&self) -> impl Iterator<Item = &UriAnnotation> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Uri(uri) => Some(uri),
            _ => None,
        })
    }

    pub fn uri_segments(&self) -> impl Iterator<Item = &UriSegmentAnnotation> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::UriSegment(segment) => Some(segment),
            _ => None,
        })
    }

    pub fn params(&self) -> impl Iterator<Item = &ParamAnnotation> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Param(param) => Some(param),
            _ => None,
        })
    }

    pub fn returns(&self) -> impl Iterator<Item = &ReturnAnnotation> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Return(ret) => Some(ret),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorAnnotation> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Error(error) => Some(error),
            _ => None,
        })
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeAnnotation> {
        self.annotations.iter().filter_map(|a| match a {
            Annotation::Scope(scope) => Some(scope),
            _ => None,
        })
    }

    /// @ai:intent Capabilities that gate the whole action
    pub fn capabilities(&self) -> Vec<&str> {
        self.annotations
            .iter()
            .filter_map(|a| match a {
                Annotation::VendorTag(tag) => Some(tag.vendor_tag.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn min_version(&self) -> Option<VersionNumber> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::MinVersion(min) => Some(min.minimum_version),
            _ => None,
        })
    }

    /// @ai:intent Return annotations followed by error annotations
    pub fn responses(&self) -> Vec<&Annotation> {
        let returns = self
            .annotations
            .iter()
            .filter(|a| matches!(a, Annotation::Return(_)));
        let errors = self
            .annotations
            .iter()
            .filter(|a| matches!(a, Annotation::Error(_)));
        returns.chain(errors).collect()
    }

    /// @ai:intent Resource group, taken from the first uri
    pub fn group(&self) -> &str {
        self.uris().next().map(|u| u.group.as_str()).unwrap_or_default()
    }

    /// @ai:intent Content type in effect for a version, versioned forks winning over the default
    pub fn content_type(&self, version: Option<VersionNumber>) -> Option<&str> {
        let forked = version.and_then(|v| {
            self.content_types
                .iter()
                .filter(|c| c.meta.version.as_ref().map_or(false, |cv| cv.contains(v)))
                .last()
        });

        forked
            .or_else(|| self.content_types.iter().find(|c| c.meta.version.is_none()))
            .or_else(|| self.content_types.last())
            .map(|c| c.content_type.as_str())
    }

    pub fn is_public(&self) -> bool {
        self.uris().any(|u| u.meta.is_public())
    }

    /// @ai:intent Visibility shared by every uri, None when the action is dual-visibility
    pub fn uniform_visibility(&self) -> Option<Visibility> {
        let visibilities: BTreeSet<_> = self
            .uris()
            .filter_map(|u| u.meta.visibility)
            .map(|v| v == Visibility::Public)
            .collect();

        match visibilities.len() {
            1 if visibilities.contains(&true) => Some(Visibility::Public),
            1 => Some(Visibility::Private),
            _ => None,
        }
    }

    fn check_visibility(&self, ctx: &ErrorContext) -> Result<()> {
        if self.uniform_visibility() != Some(Visibility::Private) {
            return Ok(());
        }

        match self
            .annotations
            .iter()
            .find(|a| a.kind() != AnnotationKind::Uri && a.meta().is_public())
        {
            Some(offending) => Err(Error::PublicDecoratorOnPrivateAction {
                annotation: offending.kind().name().to_string(),
                context: ctx.clone(),
            }),
            None => Ok(()),
        }
    }

    /// @ai:intent Every version break-point this action documents, starting at `since`
    /// @ai:post sorted ascending, no duplicates, nothing below max(since, minVersion)
    pub fn supported_versions(&self, since: VersionNumber) -> Vec<VersionNumber> {
        let lower = self.min_version().map_or(since, |min| min.max(since));

        let versions: Vec<&Version> = self
            .annotations
            .iter()
            .filter_map(Annotation::version)
            .chain(self.content_types.iter().filter_map(|c| c.meta.version.as_ref()))
            .collect();

        let max_found = versions
            .iter()
            .flat_map(|v| [v.start().number(), v.end().number()])
            .flatten()
            .fold(lower, VersionNumber::max);

        let mut points = BTreeSet::from([lower]);
        for version in versions {
            let start = version.start().number().unwrap_or(lower).max(lower);
            let end = version.end().number().unwrap_or(max_found);

            let mut current = Some(start);
            while let Some(point) = current.filter(|p| *p <= end) {
                points.insert(point);
                current = point.next();
            }
        }

        points.into_iter().collect()
    }

    /// @ai:intent The action as it exists in one version, or None before its minVersion
    pub fn at_version(&self, version: VersionNumber) -> Option<Action> {
        if self.min_version().map_or(false, |min| version < min) {
            return None;
        }

        let content_type = self.content_type(Some(version));
        Some(Action {
            class: self.class.clone(),
            method: self.method.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            content_types: self
                .content_types
                .iter()
                .filter(|c| Some(c.content_type.as_str()) == content_type)
                .take(1)
                .cloned()
                .collect(),
            annotations: self
                .annotations
                .iter()
                .filter(|a| a.meta().matches_version(version))
                .cloned()
                .collect(),
        })
    }
}
