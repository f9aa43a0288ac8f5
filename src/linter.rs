//! @ai:module:intent Lint documented actions and representations, collecting every docblock failure
//! @ai:module:layer application
//! @ai:module:public_api lint_project, lint_sources, LintResult, LintIssue, Severity
//! @ai:module:depends_on extractor, action, representation, registry, error
//! @ai:module:stateless true

use crate::action::ActionDocumentation;
use crate::annotation::Annotation;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::{collect_files, extract_actions, extract_representations, Location, Sources};
use crate::registry::CapabilityRegistry;
use crate::representation::{normalize_class, DocblockIndex, RepresentationDocumentation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// @ai:intent Severity level for lint issues
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// @ai:intent A single lint issue found in the documentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub location: Location,
    pub suggestion: Option<String>,
}

/// @ai:intent Result of linting a project
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LintResult {
    pub files_checked: usize,
    pub actions_checked: usize,
    pub representations_checked: usize,
    pub issues: Vec<LintIssue>,
    pub errors: usize,
    pub warnings: usize,
}

impl LintResult {
    /// @ai:intent Check if linting passed (no errors)
    pub fn passed(&self) -> bool {
        self.errors == 0
    }

    /// @ai:intent Merge another lint result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.files_checked += other.files_checked;
        self.actions_checked += other.actions_checked;
        self.representations_checked += other.representations_checked;
        self.issues.extend(other.issues);
        self.errors += other.errors;
        self.warnings += other.warnings;
    }

    fn push(&mut self, issue: LintIssue) {
        match issue.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        self.issues.push(issue);
    }

    fn push_error(&mut self, error: &Error, location: Location) {
        self.push(LintIssue {
            severity: Severity::Error,
            code: error.code().to_string(),
            message: error.to_string(),
            location,
            suggestion: suggestion(error),
        });
    }
}

/// @ai:intent Hint for the errors an author can fix mechanically
fn suggestion(error: &Error) -> Option<String> {
    match error {
        Error::MissingVisibilityDecorator { annotation, .. } => Some(format!(
            "Write `@api-{}:public` or `@api-{}:private`",
            annotation, annotation
        )),
        Error::RequiredAnnotation { annotation, .. } => {
            Some(format!("Add an `@api-{}` annotation", annotation))
        }
        Error::UnknownScope { .. } => Some("Declare the scope under [[scopes]] in apidoc.toml".to_string()),
        Error::UnknownRepresentation { .. } => {
            Some("Document the representation or fix the class name".to_string())
        }
        Error::BadRangeUse { .. } => Some("Use a plain version like `3.2` instead".to_string()),
        Error::ScalarParent { parent, .. } => {
            Some(format!("Document `{}` as `object` or `array<object>`", parent))
        }
        _ => None,
    }
}

fn location(file: &Option<PathBuf>, line: usize) -> Location {
    Location::new(file.clone().unwrap_or_default(), line)
}

/// @ai:intent Lint already extracted sources
/// @ai:post every failing action or representation yields exactly one error issue; scanning never stops early
/// @ai:effects pure
pub fn lint_sources(sources: &Sources, registry: &dyn CapabilityRegistry) -> LintResult {
    let mut result = LintResult::default();
    let index = DocblockIndex::from_sources(&sources.representations);
    let mut known = BTreeSet::new();

    for source in &sources.representations {
        result.representations_checked += 1;
        match RepresentationDocumentation::new(source.clone()).parse(registry, &index) {
            Ok(representation) => {
                known.insert(representation.class);
            }
            Err(e) => result.push_error(&e, location(&source.file, source.line)),
        }
    }

    for source in &sources.actions {
        result.actions_checked += 1;
        let at = location(&source.file, source.line);

        let action = match ActionDocumentation::new(source.clone()).parse(registry) {
            Ok(action) => action,
            Err(e) => {
                result.push_error(&e, at);
                continue;
            }
        };

        for response in action.responses() {
            let referenced = match response {
                Annotation::Return(ret) => ret.response.representation.as_deref(),
                Annotation::Error(error) => Some(error.representation()),
                _ => None,
            };
            if let Some(referenced) = referenced {
                if !known.contains(&normalize_class(referenced)) {
                    let error = Error::UnknownRepresentation {
                        representation: referenced.to_string(),
                        context: response.meta().context.clone(),
                    };
                    result.push_error(&error, at.clone());
                }
            }
        }

        if action.description.is_none() {
            result.push(LintIssue {
                severity: Severity::Warning,
                code: "W001".to_string(),
                message: format!("{}::{} has no @api-description", action.class, action.method),
                location: at.clone(),
                suggestion: Some("Add @api-description <text>".to_string()),
            });
        }

        if action.responses().is_empty() {
            result.push(LintIssue {
                severity: Severity::Warning,
                code: "W002".to_string(),
                message: format!("{}::{} documents no responses", action.class, action.method),
                location: at,
                suggestion: Some("Add @api-return or @api-throws".to_string()),
            });
        }
    }

    result
}

/// @ai:intent Read every configured directory and lint what it contains
/// @ai:effects fs:read
pub fn lint_project(config: &Config) -> Result<LintResult> {
    let mut result = LintResult::default();
    let mut sources = Sources::default();

    let controllers = collect_files(&config.controller_dirs());
    let representations = collect_files(&config.representation_dirs());
    result.files_checked = controllers.len() + representations.len();

    for path in &controllers {
        match extract_actions(path) {
            Ok(actions) => sources.actions.extend(actions),
            Err(e) => result.push_error(&e, unreadable(path)),
        }
    }
    for path in &representations {
        match extract_representations(path) {
            Ok(found) => sources.representations.extend(found),
            Err(e) => result.push_error(&e, unreadable(path)),
        }
    }

    result.merge(lint_sources(&sources, config));
    Ok(result)
}

fn unreadable(path: &Path) -> Location {
    Location::new(path.to_path_buf(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionSource;
    use crate::registry::StaticRegistry;
    use crate::representation::RepresentationSource;

    fn sources() -> Sources {
        Sources {
            actions: vec![
                ActionSource::new(
                    "Movie",
                    "get",
                    r"/**
 * @api-label Get a movie.
 * @api-description Returns a movie.
 * @api-uri:public {Movies} /movies/+id
 * @api-contentType application/json
 * @api-return:public (200, \Movie)
 * @api-throws:public (404, \Error) - Not found
 */",
                ),
                ActionSource::new(
                    "Movie",
                    "delete",
                    r"/**
 * @api-label Delete a movie.
 * @api-uri {Movies} /movies/+id
 * @api-contentType application/json
 */",
                ),
                ActionSource::new(
                    "Movie",
                    "patch",
                    r"/**
 * @api-label Update a movie.
 * @api-uri:public {Movies} /movies/+id
 * @api-contentType application/json
 */",
                ),
            ],
            representations: vec![
                RepresentationSource::new("Movie", "/** @api-label Movie */")
                    .field("getId", "/** @api-data id (integer) - ID */"),
                RepresentationSource::new("Person", "/** @api-label Person */"),
            ],
        }
    }

    #[test]
    fn test_lint_collects_every_failure() {
        let result = lint_sources(&sources(), &StaticRegistry::default());

        assert!(!result.passed());
        assert_eq!(result.actions_checked, 3);
        assert_eq!(result.representations_checked, 2);

        let codes: Vec<&str> = result.issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["E206", "E307", "E301", "W001", "W002"]);
        assert_eq!(result.errors, 3);
        assert_eq!(result.warnings, 2);
    }

    #[test]
    fn test_visibility_suggestion() {
        let result = lint_sources(&sources(), &StaticRegistry::default());
        let issue = result.issues.iter().find(|i| i.code == "E301").unwrap();
        assert_eq!(
            issue.suggestion.as_deref(),
            Some("Write `@api-uri:public` or `@api-uri:private`")
        );
    }

    #[test]
    fn test_merge() {
        let mut first = LintResult {
            files_checked: 1,
            errors: 1,
            ..Default::default()
        };
        first.merge(LintResult {
            files_checked: 2,
            warnings: 3,
            ..Default::default()
        });

        assert_eq!(first.files_checked, 3);
        assert_eq!(first.errors, 1);
        assert_eq!(first.warnings, 3);
    }
}
