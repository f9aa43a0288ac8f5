//! @ai:module:intent Parse `@api-` docblock annotations into versioned API documentation and changelogs
//! @ai:module:layer infrastructure
//! @ai:module:public_api action, annotation, changelog, compiler, config, docblock, extractor, linter, mson, output, registry, representation, version, error
//! @ai:module:stateless true
//!
//! # apidoc
//!
//! A library for reading `@api-` annotations out of controller and
//! representation docblocks, validating them, and compiling them into a
//! per-version view of a REST API together with a changelog between the
//! supported versions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use apidoc_parser::{extractor, linter, output, Compiler, Config};
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("apidoc.toml")).unwrap();
//!
//! // Report every docblock problem in the project
//! let result = linter::lint_project(&config).unwrap();
//! println!("{}", output::format_lint_result(&result, output::OutputFormat::Text));
//!
//! // Compile the default version and the changelog
//! let sources = extractor::extract_project(&config).unwrap();
//! let graph = Compiler::from_config(&config)
//!     .compile(&sources.actions, &sources.representations)
//!     .unwrap();
//! let view = graph.for_version(config.default_version(), &config.filter());
//! println!("{}", output::format_version_view(&view, output::OutputFormat::JsonPretty));
//! ```

pub mod action;
pub mod annotation;
pub mod changelog;
pub mod compiler;
pub mod config;
pub mod docblock;
pub mod error;
pub mod extractor;
pub mod linter;
pub mod mson;
pub mod output;
pub mod registry;
pub mod representation;
pub mod version;

pub use action::{Action, ActionDocumentation, ActionSource};
pub use annotation::{Annotation, AnnotationKind, AnnotationMeta, Visibility};
pub use changelog::{ChangeType, Changelog, ChangelogBuilder, Changeset, Definition};
pub use compiler::{Compilation, CompiledGraph, Compiler, Filter, VersionView};
pub use config::Config;
pub use error::{Error, ErrorContext, Result};
pub use extractor::{extract_project, Location, Sources};
pub use linter::{lint_project, lint_sources, LintIssue, LintResult, Severity};
pub use output::{
    format_changelog, format_compilation, format_lint_result, format_version_view, to_json,
    OutputFormat,
};
pub use registry::{CapabilityRegistry, StaticRegistry};
pub use representation::{
    DocblockIndex, DocblockResolver, Representation, RepresentationDocumentation,
    RepresentationSource,
};
pub use version::{Version, VersionNumber};
