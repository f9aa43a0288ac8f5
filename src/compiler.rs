//! @ai:module:intent Parse every documented action and representation into one graph and project it per version
//! @ai:module:layer application
//! @ai:module:public_api Compiler, CompiledGraph, Compilation, VersionView, Filter
//! @ai:module:depends_on action, representation, changelog, config, registry, error
//! @ai:module:stateless true

use crate::action::{Action, ActionDocumentation, ActionSource};
use crate::annotation::Annotation;
use crate::changelog::{self, Changelog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::CapabilityRegistry;
use crate::representation::{
    normalize_class, DocblockIndex, Representation, RepresentationDocumentation,
    RepresentationSource,
};
use crate::version::VersionNumber;
use serde::Serialize;
use std::collections::BTreeSet;

/// @ai:intent Visibility, vendor tag and group restrictions applied to compiled output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub include_private: bool,
    pub vendor_tags: Option<Vec<String>>,
    pub excluded_groups: Vec<String>,
}

impl Filter {
    /// @ai:intent Whether every given vendor tag is allowed
    pub fn allows_vendor_tags(&self, tags: &[&str]) -> bool {
        match &self.vendor_tags {
            None => true,
            Some(allowed) => tags.iter().all(|tag| allowed.iter().any(|a| a == tag)),
        }
    }

    fn allows(&self, annotation: &Annotation) -> bool {
        (self.include_private || !annotation.meta().is_private())
            && self.allows_vendor_tags(&annotation.vendor_tags())
    }

    /// @ai:intent Strip what this filter hides from an action, None when nothing routable is left
    /// @ai:effects pure
    pub fn apply_action(&self, action: &Action) -> Option<Action> {
        if self.excluded_groups.iter().any(|g| g == action.group()) {
            return None;
        }
        if !self.allows_vendor_tags(&action.capabilities()) {
            return None;
        }

        let annotations: Vec<Annotation> = action
            .annotations
            .iter()
            .filter(|a| self.allows(a))
            .cloned()
            .collect();

        if !annotations.iter().any(|a| matches!(a, Annotation::Uri(_))) {
            return None;
        }

        Some(Action {
            annotations,
            ..action.clone()
        })
    }

    /// @ai:intent Drop representation fields gated by a vendor tag this filter does not allow
    pub fn apply_representation(&self, representation: &Representation) -> Representation {
        Representation {
            fields: representation
                .fields
                .iter()
                .filter(|f| {
                    let inline = f.field.capability.as_deref();
                    let tags: Vec<&str> = inline
                        .into_iter()
                        .chain(f.meta.vendor_tags.iter().map(String::as_str))
                        .collect();
                    self.allows_vendor_tags(&tags)
                })
                .cloned()
                .collect(),
            ..representation.clone()
        }
    }
}

/// @ai:intent The documented API as it exists in one version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionView {
    pub version: VersionNumber,
    pub actions: Vec<Action>,
    pub representations: Vec<Representation>,
}

/// @ai:intent Every configured version, newest first, plus the changelog between them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compilation {
    pub versions: Vec<VersionView>,
    pub changelog: Changelog,
}

/// @ai:intent Owns every parsed action and representation for the lifetime of a run
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    supported: Vec<VersionNumber>,
    actions: Vec<Action>,
    representations: Vec<Representation>,
}

impl CompiledGraph {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    pub fn supported_versions(&self) -> &[VersionNumber] {
        &self.supported
    }

    pub fn representation(&self, class: &str) -> Option<&Representation> {
        let class = normalize_class(class);
        self.representations.iter().find(|r| r.class == class)
    }

    /// @ai:intent Read-only view of the graph in one version under a filter
    /// @ai:post actions below their minVersion and non-matching versioned annotations are gone
    pub fn for_version(&self, version: VersionNumber, filter: &Filter) -> VersionView {
        let actions = self
            .actions
            .iter()
            .filter_map(|a| filter.apply_action(a))
            .filter_map(|a| a.at_version(version))
            .collect();

        let representations = self
            .representations
            .iter()
            .map(|r| {
                let filtered = filter.apply_representation(r);
                Representation {
                    fields: filtered
                        .fields_at_version(version)
                        .into_iter()
                        .cloned()
                        .collect(),
                    ..filtered.clone()
                }
            })
            .collect();

        VersionView {
            version,
            actions,
            representations,
        }
    }

    /// @ai:intent Changelog over the supported versions of what the filter lets through
    pub fn changelog(&self, filter: &Filter) -> Result<Changelog> {
        let actions: Vec<Action> = self
            .actions
            .iter()
            .filter_map(|a| filter.apply_action(a))
            .collect();
        let representations: Vec<Representation> = self
            .representations
            .iter()
            .map(|r| filter.apply_representation(r))
            .collect();

        changelog::build(&self.supported, &actions, &representations)
    }

    /// @ai:intent Views for every supported version, newest first, and the changelog
    pub fn compile_all(&self, filter: &Filter) -> Result<Compilation> {
        let versions = self
            .supported
            .iter()
            .rev()
            .map(|v| self.for_version(*v, filter))
            .collect();

        Ok(Compilation {
            versions,
            changelog: self.changelog(filter)?,
        })
    }
}

/// @ai:intent Turns raw sources into a CompiledGraph, stopping at the first error
pub struct Compiler<'a> {
    supported: Vec<VersionNumber>,
    registry: &'a dyn CapabilityRegistry,
}

impl<'a> Compiler<'a> {
    pub fn new(supported: &[VersionNumber], registry: &'a dyn CapabilityRegistry) -> Self {
        Self {
            supported: supported.to_vec(),
            registry,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(config.supported_versions(), config)
    }

    /// @ai:intent Parse all sources in discovery order and cross-check representation references
    /// @ai:post every return and throws representation names a parsed representation
    /// @ai:effects pure
    pub fn compile(
        &self,
        actions: &[ActionSource],
        representations: &[RepresentationSource],
    ) -> Result<CompiledGraph> {
        let index = DocblockIndex::from_sources(representations);

        let representations = representations
            .iter()
            .map(|source| {
                RepresentationDocumentation::new(source.clone()).parse(self.registry, &index)
            })
            .collect::<Result<Vec<_>>>()?;

        let actions = actions
            .iter()
            .map(|source| ActionDocumentation::new(source.clone()).parse(self.registry))
            .collect::<Result<Vec<_>>>()?;

        let known: BTreeSet<&str> = representations.iter().map(|r| r.class.as_str()).collect();
        for action in &actions {
            for response in action.responses() {
                let referenced = match response {
                    Annotation::Return(ret) => ret.response.representation.as_deref(),
                    Annotation::Error(error) => Some(error.representation()),
                    _ => None,
                };
                let Some(referenced) = referenced else {
                    continue;
                };

                if !known.contains(normalize_class(referenced).as_str()) {
                    return Err(Error::UnknownRepresentation {
                        representation: referenced.to_string(),
                        context: response.meta().context.clone(),
                    });
                }
            }
        }

        tracing::info!(
            "Compiled {} actions and {} representations across {} versions",
            actions.len(),
            representations.len(),
            self.supported.len()
        );

        Ok(CompiledGraph {
            supported: self.supported.clone(),
            actions,
            representations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use pretty_assertions::assert_eq;

    fn supported() -> Vec<VersionNumber> {
        ["1.0", "1.1", "1.2"].iter().map(|v| v.parse().unwrap()).collect()
    }

    fn movie_representation() -> RepresentationSource {
        RepresentationSource::new(r"\Representations\Movie", "/** @api-label Movie */")
            .field("getId", "/** @api-data id (integer) - ID */")
            .field(
                "getTickets",
                r"/**
 * @api-version >=1.1
 * @api-data tickets (string, BUY_TICKETS) - Tickets URL
 */",
            )
    }

    fn error_representation() -> RepresentationSource {
        RepresentationSource::new(r"\Representations\Error", "/** @api-label Error */")
            .field("getError", "/** @api-data error (string) - Message */")
    }

    fn movie_action() -> ActionSource {
        ActionSource::new(
            r"\Controllers\Movie",
            "get",
            r"/**
 * @api-label Get a movie.
 * @api-uri:public {Movies} /movies/+id
 * @api-uri:private {Movies} /internal/movies/+id
 * @api-contentType application/json
 * @api-return:public (200, \Representations\Movie)
 * @api-throws:public (404, \Representations\Error) - Not found.
 * @api-version >=1.1
 * @api-param:public include (string, BUY_TICKETS) - Extra fields
 */",
        )
    }

    fn compile() -> CompiledGraph {
        let registry = StaticRegistry::with_capabilities(&["BUY_TICKETS"]);
        Compiler::new(&supported(), &registry)
            .compile(
                &[movie_action()],
                &[movie_representation(), error_representation()],
            )
            .unwrap()
    }

    #[test]
    fn test_for_version_applies_versions_and_visibility() {
        let graph = compile();
        assert_eq!(graph.actions().len(), 1);
        assert!(graph.representation(r"Representations\Movie").is_some());

        let v10 = graph.for_version("1.0".parse().unwrap(), &Filter::default());
        let action = &v10.actions[0];
        assert_eq!(action.uris().count(), 1);
        assert_eq!(action.params().count(), 0);
        assert_eq!(v10.representations[0].fields.len(), 1);

        let with_private = Filter {
            include_private: true,
            ..Default::default()
        };
        let v11 = graph.for_version("1.1".parse().unwrap(), &with_private);
        assert_eq!(v11.actions[0].uris().count(), 2);
        assert_eq!(v11.actions[0].params().count(), 1);
        assert_eq!(v11.representations[0].fields.len(), 2);
    }

    #[test]
    fn test_vendor_tag_filter() {
        let graph = compile();
        let filter = Filter {
            vendor_tags: Some(vec![]),
            ..Default::default()
        };

        let view = graph.for_version("1.2".parse().unwrap(), &filter);
        assert_eq!(view.actions[0].params().count(), 0);
        assert_eq!(view.representations[0].fields.len(), 1);
    }

    #[test]
    fn test_excluded_groups() {
        let graph = compile();
        let filter = Filter {
            excluded_groups: vec!["Movies".to_string()],
            ..Default::default()
        };

        assert!(graph.for_version("1.2".parse().unwrap(), &filter).actions.is_empty());
    }

    #[test]
    fn test_compile_all_is_newest_first() {
        let compilation = compile().compile_all(&Filter::default()).unwrap();
        let versions: Vec<String> = compilation
            .versions
            .iter()
            .map(|v| v.version.to_string())
            .collect();

        assert_eq!(versions, vec!["1.2", "1.1", "1.0"]);
        assert_eq!(compilation.changelog.versions[0].version, "1.1");
    }

    #[test]
    fn test_unknown_representation() {
        let registry = StaticRegistry::default();
        let err = Compiler::new(&supported(), &registry)
            .compile(&[movie_action()], &[movie_representation()])
            .unwrap_err();

        assert!(matches!(err, Error::UnknownRepresentation { ref representation, .. }
            if representation == r"\Representations\Error"));
        assert_eq!(
            err.context().and_then(|c| c.class.as_deref()),
            Some(r"\Controllers\Movie")
        );
    }
}
