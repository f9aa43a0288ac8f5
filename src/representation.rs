//! @ai:module:intent Aggregate a representation class and its field docblocks into a documented response shape
//! @ai:module:layer application
//! @ai:module:public_api RepresentationSource, FieldSource, RepresentationDocumentation, Representation, FieldNode, DocblockResolver, DocblockIndex
//! @ai:module:depends_on annotation, docblock, version, registry, error
//! @ai:module:stateless true

use crate::annotation::{
    self, Annotation, AnnotationKind, DataAnnotation, DescriptionAnnotation, LabelAnnotation,
};
use crate::docblock::tokenize;
use crate::error::{Error, ErrorContext, Result};
use crate::registry::CapabilityRegistry;
use crate::version::{Version, VersionNumber};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Key under which a node's own field data sits in the exploded tree.
pub const FIELD_DATA_KEY: &str = "__FIELD_DATA__";

/// `@api-see` chains deeper than this are treated as cycles.
const MAX_SEE_DEPTH: usize = 8;

/// @ai:intent Canonical `\Namespace\Class` spelling used for lookups
pub fn normalize_class(class: &str) -> String {
    format!("\\{}", class.trim().trim_start_matches('\\'))
}

/// @ai:intent Docblock of one member (method or property) of a representation class
#[derive(Debug, Clone)]
pub struct FieldSource {
    pub method: String,
    pub docblock: String,
}

/// @ai:intent Raw docblocks of one representation class
#[derive(Debug, Clone)]
pub struct RepresentationSource {
    pub class: String,
    pub docblock: String,
    pub fields: Vec<FieldSource>,
    pub file: Option<PathBuf>,
    pub line: usize,
}

impl RepresentationSource {
    pub fn new(class: &str, docblock: &str) -> Self {
        Self {
            class: normalize_class(class),
            docblock: docblock.to_string(),
            fields: Vec::new(),
            file: None,
            line: 0,
        }
    }

    pub fn field(mut self, method: &str, docblock: &str) -> Self {
        self.fields.push(FieldSource {
            method: method.to_string(),
            docblock: docblock.to_string(),
        });
        self
    }
}

/// @ai:intent Look up the docblock of `Class::method` for `@api-see` resolution
pub trait DocblockResolver {
    fn docblock(&self, class: &str, method: &str) -> Option<&str>;
}

/// @ai:intent In-memory docblock lookup keyed by normalized class and method
#[derive(Debug, Clone, Default)]
pub struct DocblockIndex {
    docblocks: BTreeMap<(String, String), String>,
}

impl DocblockIndex {
    pub fn insert(&mut self, class: &str, method: &str, docblock: &str) {
        self.docblocks.insert(
            (normalize_class(class), method.to_string()),
            docblock.to_string(),
        );
    }

    /// @ai:intent Index every member docblock of the given representations
    pub fn from_sources(sources: &[RepresentationSource]) -> Self {
        let mut index = Self::default();
        for source in sources {
            for field in &source.fields {
                index.insert(&source.class, &field.method, &field.docblock);
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.docblocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docblocks.is_empty()
    }
}

impl DocblockResolver for DocblockIndex {
    fn docblock(&self, class: &str, method: &str) -> Option<&str> {
        self.docblocks
            .get(&(normalize_class(class), method.to_string()))
            .map(String::as_str)
    }
}

/// @ai:intent An unparsed representation; `parse` yields a Representation or fails
#[derive(Debug, Clone)]
pub struct RepresentationDocumentation {
    source: RepresentationSource,
}

impl RepresentationDocumentation {
    pub fn new(source: RepresentationSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &RepresentationSource {
        &self.source
    }

    /// @ai:intent Parse the class docblock and every field docblock
    /// @ai:post field names are unique; at least one field exists
    /// @ai:effects pure
    pub fn parse(
        &self,
        registry: &dyn CapabilityRegistry,
        resolver: &dyn DocblockResolver,
    ) -> Result<Representation> {
        let class = &self.source.class;
        let ctx = ErrorContext::new(class, None, &self.source.docblock);

        let raw = tokenize(&self.source.docblock);
        if raw.is_empty() {
            return Err(Error::NoAnnotations { context: ctx });
        }

        let annotations = annotation::parse_docblock(&raw, &ctx, registry)?;
        let mut label: Option<LabelAnnotation> = None;
        let mut description: Option<DescriptionAnnotation> = None;

        for parsed in annotations {
            match parsed {
                Annotation::Label(found) => {
                    if label.replace(found).is_some() {
                        return Err(multiple(AnnotationKind::Label, &ctx));
                    }
                }
                Annotation::Description(found) => {
                    if description.replace(found).is_some() {
                        return Err(multiple(AnnotationKind::Description, &ctx));
                    }
                }
                other => tracing::debug!(
                    "Ignoring @api-{} on representation {}",
                    other.kind(),
                    class
                ),
            }
        }

        let label = label.ok_or_else(|| Error::RequiredAnnotation {
            annotation: AnnotationKind::Label.name().to_string(),
            context: ctx.clone(),
        })?;

        let mut fields = Vec::new();
        let mut seen = BTreeSet::new();
        for member in &self.source.fields {
            let member_ctx = ErrorContext::new(class, Some(&member.method), &member.docblock);
            for data in parse_field_docblock(&member_ctx, &member.docblock, registry, resolver, 0)? {
                if !seen.insert(data.name().to_string()) {
                    return Err(Error::DuplicateField {
                        field: data.name().to_string(),
                        representation: class.clone(),
                        context: member_ctx,
                    });
                }
                fields.push(data);
            }
        }

        if fields.is_empty() {
            return Err(Error::NoAnnotations { context: ctx });
        }
        check_parents(&fields)?;

        Ok(Representation {
            class: class.clone(),
            label,
            description,
            fields,
        })
    }
}

/// @ai:intent Dotted fields may only nest under an undocumented wrapper, an object, or an array of objects
fn check_parents(fields: &[DataAnnotation]) -> Result<()> {
    for data in fields {
        let Some((parent, _)) = data.name().rsplit_once('.') else {
            continue;
        };
        let Some(documented) = fields.iter().find(|f| f.name() == parent) else {
            continue;
        };

        let field = &documented.field;
        let nestable = match field.type_name.as_str() {
            "object" => true,
            "array" => field
                .subtype
                .as_deref()
                .map_or(true, |sub| sub == "object" || sub.starts_with('\\')),
            _ => false,
        };

        if !nestable {
            let parent_type = match &field.subtype {
                Some(sub) => format!("{}<{}>", field.type_name, sub),
                None => field.type_name.clone(),
            };
            return Err(Error::ScalarParent {
                field: data.name().to_string(),
                parent: parent.to_string(),
                parent_type,
                context: data.meta.context.clone(),
            });
        }
    }
    Ok(())
}

fn multiple(kind: AnnotationKind, ctx: &ErrorContext) -> Error {
    Error::MultipleAnnotations {
        annotation: kind.name().to_string(),
        context: ctx.clone(),
    }
}

/// @ai:intent Collect the data fields of one member docblock, following `@api-see` references
/// @ai:post scope and vendor tag annotations of the docblock are attached to every field it yields
fn parse_field_docblock(
    ctx: &ErrorContext,
    docblock: &str,
    registry: &dyn CapabilityRegistry,
    resolver: &dyn DocblockResolver,
    depth: usize,
) -> Result<Vec<DataAnnotation>> {
    let raw = tokenize(docblock);
    let annotations = annotation::parse_docblock(&raw, ctx, registry)?;

    let mut scopes = Vec::new();
    let mut vendor_tags = Vec::new();
    for parsed in &annotations {
        match parsed {
            Annotation::Scope(scope) => scopes.push(scope.scope.clone()),
            Annotation::VendorTag(tag) => vendor_tags.push(tag.vendor_tag.clone()),
            _ => {}
        }
    }

    let mut fields = Vec::new();
    for parsed in annotations {
        match parsed {
            Annotation::Data(data) => fields.push(data),
            Annotation::See(see) => {
                let target = see.target();
                let unresolved = || Error::UnresolvedSee {
                    target: target.clone(),
                    context: ctx.clone(),
                };

                if depth >= MAX_SEE_DEPTH {
                    return Err(unresolved());
                }

                let nested_docblock = resolver
                    .docblock(&see.class, &see.method)
                    .ok_or_else(unresolved)?;
                let nested_ctx =
                    ErrorContext::new(&normalize_class(&see.class), Some(&see.method), nested_docblock);
                let nested = parse_field_docblock(
                    &nested_ctx,
                    nested_docblock,
                    registry,
                    resolver,
                    depth + 1,
                )?;

                for data in nested {
                    fields.push(reuse_field(&data, &see, ctx)?);
                }
            }
            Annotation::Scope(_) | Annotation::VendorTag(_) => {}
            other => tracing::debug!("Ignoring @api-{} in field docblock{}", other.kind(), ctx),
        }
    }

    for field in &mut fields {
        merge_unique(&mut field.meta.scopes, &scopes);
        merge_unique(&mut field.meta.vendor_tags, &vendor_tags);
    }

    Ok(fields)
}

/// @ai:intent Re-home a referenced field under the referencing `@api-see`
/// @ai:post the field name gains the see prefix; the see version wins over the field's own
fn reuse_field(
    data: &DataAnnotation,
    see: &annotation::SeeAnnotation,
    ctx: &ErrorContext,
) -> Result<DataAnnotation> {
    let mut serialized = serde_json::to_value(data)?;
    if let Some(object) = serialized.as_object_mut() {
        object.insert(
            "field".to_string(),
            serde_json::Value::String(see.prefixed(data.name())),
        );
    }

    let version: Option<Version> = see
        .meta
        .version
        .clone()
        .or_else(|| data.meta.version.clone());

    match Annotation::hydrate(AnnotationKind::Data, serialized, version, ctx)? {
        Annotation::Data(mut hydrated) => {
            merge_unique(&mut hydrated.meta.scopes, &see.meta.scopes);
            merge_unique(&mut hydrated.meta.vendor_tags, &see.meta.vendor_tags);
            Ok(hydrated)
        }
        _ => Ok(data.clone()),
    }
}

fn merge_unique(into: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

/// @ai:intent A documented response shape: label, optional description, ordered data fields
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Representation {
    pub class: String,
    pub label: LabelAnnotation,
    pub description: Option<DescriptionAnnotation>,
    pub fields: Vec<DataAnnotation>,
}

impl Representation {
    pub fn label(&self) -> &str {
        &self.label.label
    }

    pub fn field(&self, name: &str) -> Option<&DataAnnotation> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// @ai:intent Fields visible in one version
    pub fn fields_at_version(&self, version: VersionNumber) -> Vec<&DataAnnotation> {
        self.fields
            .iter()
            .filter(|f| f.meta.matches_version(version))
            .collect()
    }

    /// @ai:intent Dotted field names turned into a nested tree
    pub fn explode(&self) -> FieldNode {
        FieldNode::explode(self.fields.iter())
    }
}

/// @ai:intent One node of the exploded field tree; `data` is set when the dotted path itself is documented
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldNode {
    pub data: Option<DataAnnotation>,
    pub children: BTreeMap<String, FieldNode>,
}

impl FieldNode {
    /// @ai:intent Build a tree from dotted field names
    /// @ai:example ["urls", "urls.imdb"] -> {urls: {__FIELD_DATA__, imdb: {__FIELD_DATA__}}}
    pub fn explode<'a>(fields: impl IntoIterator<Item = &'a DataAnnotation>) -> Self {
        let mut root = FieldNode::default();
        for field in fields {
            let mut node = &mut root;
            for part in field.name().split('.') {
                node = node.children.entry(part.to_string()).or_default();
            }
            node.data = Some(field.clone());
        }
        root
    }

    pub fn child(&self, path: &str) -> Option<&FieldNode> {
        path.split('.')
            .try_fold(self, |node, part| node.children.get(part))
    }
}

impl Serialize for FieldNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.children.len() + usize::from(self.data.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(data) = &self.data {
            map.serialize_entry(FIELD_DATA_KEY, data)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}
