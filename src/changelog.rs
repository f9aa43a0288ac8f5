//! @ai:module:intent Diff versioned annotations across the supported version timeline into a grouped changelog
//! @ai:module:layer application
//! @ai:module:public_api build, version_introduced, version_removed, Changelog, ChangelogBuilder, Changeset, ChangeType, Definition, Section
//! @ai:module:depends_on action, representation, version, error
//! @ai:module:stateless true

use crate::action::Action;
use crate::annotation::Annotation;
use crate::error::{Error, Result};
use crate::representation::Representation;
use crate::version::{compare_version_strings, Version, VersionNumber};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// @ai:intent Kind of delta a changeset records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Definition {
    Added,
    Changed,
    Removed,
}

/// @ai:intent What part of the API a changeset is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Action,
    ActionParam,
    ActionReturn,
    ActionThrows,
    ContentType,
    RepresentationData,
}

/// @ai:intent Top-level split between resource actions and representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Representations,
    Resources,
}

macro_rules! snake_display {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(Self::$variant => $name),+
                };
                f.write_str(name)
            }
        }
    };
}

snake_display!(Definition {
    Added => "added",
    Changed => "changed",
    Removed => "removed",
});

snake_display!(ChangeType {
    Action => "action",
    ActionParam => "action_param",
    ActionReturn => "action_return",
    ActionThrows => "action_throws",
    ContentType => "content_type",
    RepresentationData => "representation_data",
});

snake_display!(Section {
    Representations => "representations",
    Resources => "resources",
});

impl ChangeType {
    pub fn section(self) -> Section {
        match self {
            ChangeType::RepresentationData => Section::Representations,
            ChangeType::Action
            | ChangeType::ActionParam
            | ChangeType::ActionReturn
            | ChangeType::ActionThrows
            | ChangeType::ContentType => Section::Resources,
        }
    }
}

/// @ai:intent First supported version a range covers, None when that is the very first version
/// @ai:pre supported is ascending
pub fn version_introduced(version: &Version, supported: &[VersionNumber]) -> Option<VersionNumber> {
    let first = supported.iter().copied().find(|v| version.contains(*v))?;
    if supported.first() == Some(&first) {
        None
    } else {
        Some(first)
    }
}

/// @ai:intent Supported version right after the last one a range covers, None while still present in the latest
/// @ai:pre supported is ascending
pub fn version_removed(version: &Version, supported: &[VersionNumber]) -> Option<VersionNumber> {
    let last = supported.iter().rposition(|v| version.contains(*v))?;
    supported.get(last + 1).copied()
}

/// @ai:intent One diffed unit of change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Changeset {
    pub version: VersionNumber,
    pub definition: Definition,
    pub change_type: ChangeType,
    pub group: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub payload: Value,
}

impl Changeset {
    /// @ai:intent Content hash over everything but positional keys
    /// @ai:post identical changes on different paths hash the same
    pub fn hash(&self) -> String {
        let canonical = json!({
            "definition": self.definition,
            "change_type": self.change_type,
            "payload": self.payload,
        });

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Changes sharing one content hash.
pub type HashedChanges = BTreeMap<String, Vec<Changeset>>;
pub type ByChangeType = BTreeMap<ChangeType, HashedChanges>;
pub type ByNamespace = BTreeMap<String, ByChangeType>;
pub type ByGroup = BTreeMap<String, ByNamespace>;
pub type BySection = BTreeMap<Section, ByGroup>;
pub type ByDefinition = BTreeMap<Definition, BySection>;

/// @ai:intent Every change introduced by one API version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionChangelog {
    pub version: String,
    pub changes: ByDefinition,
}

/// @ai:intent Borrowed view of one merged changelog entry
#[derive(Debug, Clone, Copy)]
pub struct ChangelogEntry<'a> {
    pub version: &'a str,
    pub definition: Definition,
    pub section: Section,
    pub group: &'a str,
    pub namespace: &'a str,
    pub change_type: ChangeType,
    pub hash: &'a str,
    pub changes: &'a [Changeset],
}

impl<'a> ChangelogEntry<'a> {
    pub fn payload(&self) -> &'a Value {
        static NULL: Value = Value::Null;
        self.changes.first().map_or(&NULL, |c| &c.payload)
    }

    pub fn paths(&self) -> Vec<&'a str> {
        self.changes.iter().filter_map(|c| c.path.as_deref()).collect()
    }
}

/// @ai:intent Changelog ordered newest version first, every other level alphabetical
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Changelog {
    pub versions: Vec<VersionChangelog>,
}

impl Changelog {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn version(&self, version: &str) -> Option<&VersionChangelog> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// @ai:intent Flatten the nested index into merged entries, keeping its order
    pub fn entries(&self) -> Vec<ChangelogEntry<'_>> {
        let mut entries = Vec::new();
        for version in &self.versions {
            for (definition, sections) in &version.changes {
                for (section, groups) in sections {
                    for (group, namespaces) in groups {
                        for (namespace, types) in namespaces {
                            for (change_type, hashed) in types {
                                for (hash, changes) in hashed {
                                    entries.push(ChangelogEntry {
                                        version: &version.version,
                                        definition: *definition,
                                        section: *section,
                                        group,
                                        namespace,
                                        change_type: *change_type,
                                        hash,
                                        changes,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        entries
    }
}

/// @ai:intent Accumulates changesets into the nested index, then fixes the final ordering
#[derive(Debug, Default)]
pub struct ChangelogBuilder {
    index: BTreeMap<String, ByDefinition>,
    recorded: usize,
}

impl ChangelogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Insert a changeset under its version, definition, section, group, namespace, type and hash
    /// @ai:pre the definition and change type form a supported combination
    pub fn record(&mut self, changeset: Changeset) -> Result<()> {
        validate(changeset.definition, changeset.change_type)?;

        let hash = changeset.hash();
        let bucket = self
            .index
            .entry(changeset.version.to_string())
            .or_default()
            .entry(changeset.definition)
            .or_default()
            .entry(changeset.change_type.section())
            .or_default()
            .entry(changeset.group.clone())
            .or_default()
            .entry(changeset.namespace.clone())
            .or_default()
            .entry(changeset.change_type)
            .or_default()
            .entry(hash)
            .or_default();

        if !bucket.contains(&changeset) {
            bucket.push(changeset);
            self.recorded += 1;
        }
        Ok(())
    }

    pub fn build(self) -> Changelog {
        let mut versions: Vec<VersionChangelog> = self
            .index
            .into_iter()
            .map(|(version, changes)| VersionChangelog { version, changes })
            .collect();
        versions.sort_by(|a, b| compare_version_strings(&b.version, &a.version));

        tracing::debug!("Built changelog from {} changesets", self.recorded);
        Changelog { versions }
    }
}

/// Only these definition and change type pairs can be rendered.
fn validate(definition: Definition, change_type: ChangeType) -> Result<()> {
    let supported = match definition {
        Definition::Added => !matches!(change_type, ChangeType::ContentType),
        Definition::Removed => !matches!(change_type, ChangeType::ContentType | ChangeType::Action),
        Definition::Changed => matches!(change_type, ChangeType::ContentType),
    };

    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedChangeset {
            definition: definition.to_string(),
            change_type: change_type.to_string(),
        })
    }
}

/// @ai:intent Diff every parsed action and representation over the supported versions
/// @ai:pre supported is ascending; actions are already filtered for visibility and vendor tags
/// @ai:effects pure
pub fn build(
    supported: &[VersionNumber],
    actions: &[Action],
    representations: &[Representation],
) -> Result<Changelog> {
    let mut builder = ChangelogBuilder::new();

    for action in actions {
        record_action(&mut builder, supported, action)?;
    }
    for representation in representations {
        record_representation(&mut builder, supported, representation)?;
    }

    Ok(builder.build())
}

fn record_action(
    builder: &mut ChangelogBuilder,
    supported: &[VersionNumber],
    action: &Action,
) -> Result<()> {
    let paths: Vec<(String, String)> = action
        .uris()
        .map(|uri| (uri.group.clone(), uri.clean_path()))
        .collect();

    let mut emit = |version: VersionNumber,
                    definition: Definition,
                    change_type: ChangeType,
                    payload: Value|
     -> Result<()> {
        for (group, path) in &paths {
            builder.record(Changeset {
                version,
                definition,
                change_type,
                group: group.clone(),
                namespace: action.class.clone(),
                path: Some(path.clone()),
                payload: payload.clone(),
            })?;
        }
        Ok(())
    };

    if let Some(min) = action.min_version() {
        let since = Version::parse(&format!(">={}", min))?;
        if let Some(added) = version_introduced(&since, supported) {
            emit(
                added,
                Definition::Added,
                ChangeType::Action,
                json!({ "method": action.method, "label": action.label.label }),
            )?;
        }
    }

    for annotation in &action.annotations {
        let Some(version) = annotation.version() else {
            continue;
        };

        let (change_type, payload) = match annotation {
            Annotation::Param(param) => (
                ChangeType::ActionParam,
                json!({
                    "method": action.method,
                    "field": param.field.field,
                    "description": param.field.description,
                }),
            ),
            Annotation::Return(ret) => (
                ChangeType::ActionReturn,
                json!({
                    "method": action.method,
                    "http_code": ret.response.http_code,
                    "representation": ret.response.representation,
                }),
            ),
            Annotation::Error(error) => (
                ChangeType::ActionThrows,
                json!({
                    "method": action.method,
                    "http_code": error.response.http_code,
                    "representation": error.response.representation,
                    "description": error.response.description,
                }),
            ),
            Annotation::Label(_)
            | Annotation::Description(_)
            | Annotation::Uri(_)
            | Annotation::UriSegment(_)
            | Annotation::ContentType(_)
            | Annotation::Scope(_)
            | Annotation::VendorTag(_)
            | Annotation::MinVersion(_)
            | Annotation::Data(_)
            | Annotation::See(_) => continue,
        };

        if let Some(added) = version_introduced(version, supported) {
            emit(added, Definition::Added, change_type, payload.clone())?;
        }
        if let Some(removed) = version_removed(version, supported) {
            emit(removed, Definition::Removed, change_type, payload)?;
        }
    }

    for content_type in &action.content_types {
        let Some(version) = content_type.meta.version.as_ref() else {
            continue;
        };

        let switches = [
            version_introduced(version, supported),
            version_removed(version, supported),
        ];
        for at in switches.into_iter().flatten() {
            if let Some(current) = action.content_type(Some(at)) {
                emit(
                    at,
                    Definition::Changed,
                    ChangeType::ContentType,
                    json!({ "method": action.method, "content_type": current }),
                )?;
            }
        }
    }

    Ok(())
}

fn record_representation(
    builder: &mut ChangelogBuilder,
    supported: &[VersionNumber],
    representation: &Representation,
) -> Result<()> {
    for data in &representation.fields {
        let Some(version) = data.meta.version.as_ref() else {
            continue;
        };

        let payload = json!({
            "field": data.field.field,
            "type": data.field.type_name,
            "description": data.field.description,
        });

        let definitions = [
            (Definition::Added, version_introduced(version, supported)),
            (Definition::Removed, version_removed(version, supported)),
        ];
        for (definition, at) in definitions {
            if let Some(at) = at {
                builder.record(Changeset {
                    version: at,
                    definition,
                    change_type: ChangeType::RepresentationData,
                    group: representation.label().to_string(),
                    namespace: representation.class.clone(),
                    path: None,
                    payload: payload.clone(),
                })?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionDocumentation, ActionSource};
    use crate::registry::StaticRegistry;
    use crate::representation::{DocblockIndex, RepresentationDocumentation, RepresentationSource};
    use pretty_assertions::assert_eq;

    fn versions(list: &[&str]) -> Vec<VersionNumber> {
        list.iter().map(|v| v.parse().unwrap()).collect()
    }

    fn action(docblock: &str) -> Action {
        ActionDocumentation::new(ActionSource::new(r"\Controllers\Movie", "get", docblock))
            .parse(&StaticRegistry::default())
            .unwrap()
    }

    #[test]
    fn test_version_introduced_and_removed() {
        let supported = versions(&["1.0", "1.1", "1.2", "1.3"]);

        let since_11 = Version::parse(">=1.1").unwrap();
        assert_eq!(version_introduced(&since_11, &supported), Some("1.1".parse().unwrap()));
        assert_eq!(version_removed(&since_11, &supported), None);

        let until_11 = Version::parse("<=1.1").unwrap();
        assert_eq!(version_introduced(&until_11, &supported), None);
        assert_eq!(version_removed(&until_11, &supported), Some("1.2".parse().unwrap()));

        let never = Version::parse("2.0").unwrap();
        assert_eq!(version_introduced(&never, &supported), None);
        assert_eq!(version_removed(&never, &supported), None);
    }

    #[test]
    fn test_identical_changes_on_two_paths_merge() {
        let movie = action(
            r"/**
 * @api-label Get a movie.
 * @api-uri:public {Movies} /movies/+id
 * @api-uri:public {Movies} /films/+id
 * @api-contentType application/json
 * @api-version >=1.1
 * @api-return:public (200, \Representations\Movie)
 */",
        );

        let changelog = build(&versions(&["1.0", "1.1"]), &[movie], &[]).unwrap();
        let entries = changelog.entries();

        assert_eq!(entries.len(), 1);
        let entry = entries[0];
        assert_eq!(entry.version, "1.1");
        assert_eq!(entry.definition, Definition::Added);
        assert_eq!(entry.change_type, ChangeType::ActionReturn);
        assert_eq!(entry.group, "Movies");
        assert_eq!(entry.paths(), vec!["/movies/{id}", "/films/{id}"]);
        assert_eq!(entry.payload()["http_code"], 200);
    }

    #[test]
    fn test_content_type_fork_is_a_change() {
        let movie = action(
            r"/**
 * @api-label Get a movie.
 * @api-uri:public {Movies} /movies/+id
 * @api-contentType application/json
 * @api-version 1.1 - 1.2
 * @api-contentType application/mill.movie+json
 */",
        );

        let changelog = build(&versions(&["1.0", "1.1", "1.2", "1.3"]), &[movie], &[]).unwrap();
        let changes: Vec<(String, String)> = changelog
            .entries()
            .iter()
            .map(|e| {
                (
                    e.version.to_string(),
                    e.payload()["content_type"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        assert_eq!(
            changes,
            vec![
                ("1.3".to_string(), "application/json".to_string()),
                ("1.1".to_string(), "application/mill.movie+json".to_string()),
            ]
        );
    }

    #[test]
    fn test_representation_fields_and_ordering() {
        let source = RepresentationSource::new(r"\Representations\Movie", "/** @api-label Movie */")
            .field("getId", "/** @api-data id (integer) - ID */")
            .field(
                "getRuntime",
                r"/**
 * @api-version >=9.0
 * @api-data runtime (integer) - Runtime
 */",
            )
            .field(
                "getCast",
                r"/**
 * @api-version >=10.0
 * @api-data cast (array) - Cast
 */",
            );
        let representation = RepresentationDocumentation::new(source)
            .parse(&StaticRegistry::default(), &DocblockIndex::default())
            .unwrap();

        let changelog = build(
            &versions(&["1.0", "9.0", "10.0"]),
            &[],
            &[representation],
        )
        .unwrap();

        let order: Vec<&str> = changelog.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(order, vec!["10.0", "9.0"]);

        let entry = changelog.entries()[0];
        assert_eq!(entry.section, Section::Representations);
        assert_eq!(entry.group, "Movie");
        assert_eq!(entry.payload()["field"], "cast");
    }

    #[test]
    fn test_min_version_adds_action() {
        let movie = action(
            r"/**
 * @api-label Get a movie.
 * @api-uri:public {Movies} /movies/+id
 * @api-contentType application/json
 * @api-minVersion 1.1
 */",
        );

        let changelog = build(&versions(&["1.0", "1.1"]), &[movie], &[]).unwrap();
        let entries = changelog.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].change_type, ChangeType::Action);
        assert_eq!(entries[0].payload()["method"], "GET");
    }

    #[test]
    fn test_unsupported_combination() {
        let mut builder = ChangelogBuilder::new();
        let err = builder
            .record(Changeset {
                version: "1.1".parse().unwrap(),
                definition: Definition::Changed,
                change_type: ChangeType::ActionParam,
                group: "Movies".to_string(),
                namespace: "Movie".to_string(),
                path: None,
                payload: Value::Null,
            })
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedChangeset { ref definition, .. } if definition == "changed"));
    }
}
