//! @ai:module:intent Read controller and representation files into raw action and representation sources
//! @ai:module:layer infrastructure
//! @ai:module:public_api extract_project, extract_actions, extract_representations, actions_from_source, representations_from_source, collect_files, Sources, Location
//! @ai:module:depends_on docblock, action, representation, config, error
//! @ai:module:stateless true

use crate::action::ActionSource;
use crate::config::Config;
use crate::docblock::{has_api_annotations, scan_source, Declaration};
use crate::error::{Error, Result};
use crate::representation::RepresentationSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions scanned for docblocks.
pub const SOURCE_EXTENSIONS: &[&str] = &["php", "rs", "ts", "js", "java", "py", "go"];

/// Controller methods named after one of these become actions.
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// @ai:intent Represents a source code location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize) -> Self {
        Self { file, line }
    }
}

/// @ai:intent Everything read from disk for one run, in discovery order
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub actions: Vec<ActionSource>,
    pub representations: Vec<RepresentationSource>,
}

/// @ai:intent Check if a file extension is one we scan
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn http_method(name: &str) -> Option<String> {
    let upper = name.to_uppercase();
    HTTP_METHODS.contains(&upper.as_str()).then_some(upper)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// @ai:intent Every source file under the given directories, sorted for a stable discovery order
/// @ai:effects fs:read
pub fn collect_files(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in dirs {
        if !dir.exists() {
            tracing::warn!("Source directory {} does not exist", dir.display());
            continue;
        }

        files.extend(
            WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_source_file(p)),
        );
    }
    files
}

/// @ai:intent Actions documented in a controller source string
/// @ai:post only methods named after an HTTP verb with `@api-` annotations are returned
/// @ai:effects pure
pub fn actions_from_source(content: &str, file: Option<&Path>) -> Vec<ActionSource> {
    let scanned = scan_source(content);
    let mut actions = Vec::new();

    for block in &scanned.blocks {
        let (Some(Declaration::Method(name)), Some(class)) = (&block.declaration, &block.class)
        else {
            continue;
        };
        let Some(method) = http_method(name) else {
            continue;
        };
        if !has_api_annotations(&block.text) {
            continue;
        }

        actions.push(ActionSource {
            class: scanned.qualify(class),
            method,
            docblock: block.text.clone(),
            file: file.map(Path::to_path_buf),
            line: block.start_line,
        });
    }

    actions
}

/// @ai:intent Representations documented in a source string, member docblocks grouped under their class
/// @ai:effects pure
pub fn representations_from_source(content: &str, file: Option<&Path>) -> Vec<RepresentationSource> {
    let scanned = scan_source(content);
    let mut representations: Vec<RepresentationSource> = Vec::new();

    for block in &scanned.blocks {
        if !has_api_annotations(&block.text) {
            continue;
        }
        let Some(class) = &block.class else {
            continue;
        };
        let qualified = scanned.qualify(class);

        let position = match representations.iter().position(|r| r.class == qualified) {
            Some(position) => position,
            None => {
                let mut source = RepresentationSource::new(&qualified, "");
                source.file = file.map(Path::to_path_buf);
                source.line = block.start_line;
                representations.push(source);
                representations.len() - 1
            }
        };
        let representation = &mut representations[position];

        match &block.declaration {
            Some(Declaration::Class(_)) => {
                representation.docblock = block.text.clone();
                representation.line = block.start_line;
            }
            Some(Declaration::Method(method)) => {
                representation.fields.push(crate::representation::FieldSource {
                    method: method.clone(),
                    docblock: block.text.clone(),
                });
            }
            None => tracing::debug!("Docblock at line {} has no declaration", block.start_line),
        }
    }

    representations
}

/// @ai:intent Extract actions from a controller file
/// @ai:effects fs:read
pub fn extract_actions(path: &Path) -> Result<Vec<ActionSource>> {
    let content = read(path)?;
    Ok(actions_from_source(&content, Some(path)))
}

/// @ai:intent Extract representations from a representation file
/// @ai:effects fs:read
pub fn extract_representations(path: &Path) -> Result<Vec<RepresentationSource>> {
    let content = read(path)?;
    Ok(representations_from_source(&content, Some(path)))
}

/// @ai:intent Read every configured controller and representation directory
/// @ai:effects fs:read
pub fn extract_project(config: &Config) -> Result<Sources> {
    let mut sources = Sources::default();

    for path in collect_files(&config.controller_dirs()) {
        tracing::debug!("Scanning controller {}", path.display());
        sources.actions.extend(extract_actions(&path)?);
    }
    for path in collect_files(&config.representation_dirs()) {
        tracing::debug!("Scanning representation {}", path.display());
        sources.representations.extend(extract_representations(&path)?);
    }

    tracing::info!(
        "Found {} actions and {} representations",
        sources.actions.len(),
        sources.representations.len()
    );
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONTROLLER: &str = r#"<?php
namespace Controllers;

class Movie
{
    /**
     * @api-label Get a movie.
     * @api-uri:public {Movies} /movies/+id
     * @api-contentType application/json
     */
    public function GET()
    {
    }

    /**
     * Internal helper.
     */
    private function helper()
    {
    }

    /**
     * @api-label Not an HTTP verb.
     */
    public function refresh()
    {
    }
}
"#;

    const REPRESENTATION: &str = r#"<?php
namespace Representations;

/**
 * @api-label Movie
 */
class Movie
{
    /**
     * @api-data id (integer) - ID
     */
    public function getId()
    {
    }
}
"#;

    #[test]
    fn test_actions_from_source() {
        let actions = actions_from_source(CONTROLLER, None);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].class, r"\Controllers\Movie");
        assert_eq!(actions[0].method, "GET");
        assert_eq!(actions[0].line, 6);
        assert!(actions[0].docblock.contains("@api-uri:public"));
    }

    #[test]
    fn test_representations_from_source() {
        let representations = representations_from_source(REPRESENTATION, None);

        assert_eq!(representations.len(), 1);
        let movie = &representations[0];
        assert_eq!(movie.class, r"\Representations\Movie");
        assert!(movie.docblock.contains("@api-label Movie"));
        assert_eq!(movie.fields.len(), 1);
        assert_eq!(movie.fields[0].method, "getId");
    }

    #[test]
    fn test_extract_actions_from_file() {
        let mut file = NamedTempFile::with_suffix(".php").unwrap();
        write!(file, "{}", CONTROLLER).unwrap();

        let actions = extract_actions(file.path()).unwrap();
        assert_eq!(actions[0].file.as_deref(), Some(file.path()));
        assert!(is_source_file(file.path()));
        assert!(!is_source_file(Path::new("notes.txt")));
    }
}
