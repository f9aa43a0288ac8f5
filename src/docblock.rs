//! @ai:module:intent Split source text into docblocks and docblocks into raw `@api-` annotations
//! @ai:module:layer application
//! @ai:module:public_api tokenize, scan_source, RawAnnotation, SourceDocBlock, ScannedSource, Declaration
//! @ai:module:stateless true

use regex::Regex;
use std::sync::OnceLock;

/// @ai:intent One `@api-<tag>` occurrence with its decorators and (possibly multi-line) body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnnotation {
    pub tag: String,
    pub decorators: Vec<String>,
    pub body: String,
    pub line: usize,
}

/// @ai:intent What a docblock is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Class(String),
    Method(String),
}

/// @ai:intent A `/** ... */` block found in a source file
#[derive(Debug, Clone)]
pub struct SourceDocBlock {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub class: Option<String>,
    pub declaration: Option<Declaration>,
}

/// @ai:intent Docblocks of one source file in discovery order
#[derive(Debug, Clone, Default)]
pub struct ScannedSource {
    pub namespace: Option<String>,
    pub blocks: Vec<SourceDocBlock>,
}

impl ScannedSource {
    /// @ai:intent Fully qualify a class name with the file namespace, if any
    pub fn qualify(&self, class: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("\\{}\\{}", ns.trim_matches('\\'), class),
            None => class.to_string(),
        }
    }
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@api-(?P<tag>[A-Za-z][\w\-]*)(?P<decorators>(?::[\w\-]+)*)(?:\s+(?P<body>.*))?$")
            .expect("Invalid regex")
    })
}

fn foreign_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@[A-Za-z]").expect("Invalid regex"))
}

fn class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:pub|public|abstract|final|export)\s+)*(?:class|struct|trait|interface)\s+(\w+)")
            .expect("Invalid regex")
    })
}

fn method_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:pub|public|private|protected|static|async|final|abstract)\s+)*(?:function|fn|def)\s+(\w+)")
            .expect("Invalid regex")
    })
}

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*namespace\s+([\w\\]+)\s*;").expect("Invalid regex"))
}

/// @ai:intent Remove comment delimiters and the `*` gutter from one docblock line
/// @ai:effects pure
fn strip_gutter(line: &str) -> &str {
    let line = line.trim_end();
    let line = line.strip_suffix("*/").unwrap_or(line);
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed.strip_prefix("/**") {
        return rest.strip_prefix(' ').unwrap_or(rest);
    }

    match trimmed.strip_prefix('*') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}

/// @ai:intent Split a raw docblock into `@api-` annotations
/// @ai:post tags and decorators are lowercased; bodies keep continuation lines and their indentation
/// @ai:effects pure
pub fn tokenize(text: &str) -> Vec<RawAnnotation> {
    let mut annotations = Vec::new();
    let mut current: Option<RawAnnotation> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = strip_gutter(raw_line);
        let trimmed = line.trim_start();

        if let Some(captures) = tag_regex().captures(trimmed) {
            if let Some(done) = current.take() {
                annotations.push(finish(done));
            }

            let decorators = captures
                .name("decorators")
                .map(|m| {
                    m.as_str()
                        .split(':')
                        .filter(|d| !d.is_empty())
                        .map(str::to_lowercase)
                        .collect()
                })
                .unwrap_or_default();

            current = Some(RawAnnotation {
                tag: captures["tag"].to_lowercase(),
                decorators,
                body: captures
                    .name("body")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                line: idx + 1,
            });
        } else if foreign_tag_regex().is_match(trimmed) {
            if let Some(done) = current.take() {
                annotations.push(finish(done));
            }
        } else if let Some(annotation) = current.as_mut() {
            annotation.body.push('\n');
            annotation.body.push_str(line);
        }
    }

    if let Some(done) = current {
        annotations.push(finish(done));
    }

    annotations
}

fn finish(mut annotation: RawAnnotation) -> RawAnnotation {
    annotation.body = annotation.body.trim_end().to_string();
    annotation
}

/// @ai:intent Check if a docblock contains any `@api-` annotations
pub fn has_api_annotations(text: &str) -> bool {
    text.contains("@api-")
}

/// @ai:intent Find every docblock in a source string and the declaration that follows it
/// @ai:effects pure
pub fn scan_source(content: &str) -> ScannedSource {
    let lines: Vec<&str> = content.lines().collect();
    let mut scanned = ScannedSource::default();
    let mut current_class: Option<String> = None;
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];

        if scanned.namespace.is_none() {
            if let Some(captures) = namespace_regex().captures(line) {
                scanned.namespace = Some(captures[1].to_string());
            }
        }

        if let Some(captures) = class_regex().captures(line) {
            current_class = Some(captures[1].to_string());
        }

        if !line.trim_start().starts_with("/**") {
            idx += 1;
            continue;
        }

        let start = idx;
        while idx < lines.len() && !lines[idx].contains("*/") {
            idx += 1;
        }
        let end = idx.min(lines.len() - 1);
        let text = lines[start..=end].join("\n");

        let declaration = find_declaration(&lines[end + 1..]);
        let class = match &declaration {
            Some(Declaration::Class(name)) => Some(name.clone()),
            _ => current_class.clone(),
        };

        scanned.blocks.push(SourceDocBlock {
            text,
            start_line: start + 1,
            end_line: end + 1,
            class,
            declaration,
        });

        idx = end + 1;
    }

    scanned
}

/// @ai:intent Locate the class or method declared right after a docblock
/// @ai:effects pure
fn find_declaration(following: &[&str]) -> Option<Declaration> {
    let line = following
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty() && !l.starts_with("#[") && !l.starts_with('@'))?;

    if let Some(captures) = class_regex().captures(line) {
        return Some(Declaration::Class(captures[1].to_string()));
    }

    method_regex()
        .captures(line)
        .map(|captures| Declaration::Method(captures[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_tags_and_bodies() {
        let block = r"/**
 * Free text that is not an annotation.
 *
 * @api-label Get a movie.
 * @api-uri:public:deprecated {Movies} /movies/+id
 * @api-data content_rating `G` (string) - MPAA rating
 *   + Members
 *     - `G` - G rated
 *
 * @param int $id
 * @api-contentType application/json
 */";

        let annotations = tokenize(block);
        let tags: Vec<_> = annotations.iter().map(|a| a.tag.as_str()).collect();
        assert_eq!(tags, vec!["label", "uri", "data", "contenttype"]);

        assert_eq!(annotations[0].body, "Get a movie.");
        assert_eq!(annotations[1].decorators, vec!["public", "deprecated"]);
        assert_eq!(annotations[1].body, "{Movies} /movies/+id");
        assert_eq!(
            annotations[2].body,
            "content_rating `G` (string) - MPAA rating\n  + Members\n    - `G` - G rated"
        );
        assert_eq!(annotations[3].body, "application/json");
        assert_eq!(annotations[3].line, 11);
    }

    #[test]
    fn test_single_line_docblock() {
        let annotations = tokenize("/** @api-label Movies */");
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].body, "Movies");
    }

    #[test]
    fn test_scan_source_finds_declarations() {
        let source = r"<?php
namespace Showtimes\Representations;

/**
 * @api-label Movie
 */
class Movie extends Representation
{
    /**
     * @api-data uri (string) - Movie URI
     */
    public function getUri() {}
}";

        let scanned = scan_source(source);
        assert_eq!(scanned.namespace.as_deref(), Some(r"Showtimes\Representations"));
        assert_eq!(scanned.blocks.len(), 2);

        assert_eq!(
            scanned.blocks[0].declaration,
            Some(Declaration::Class("Movie".to_string()))
        );
        assert_eq!(scanned.blocks[0].start_line, 4);
        assert_eq!(scanned.blocks[0].end_line, 6);

        assert_eq!(
            scanned.blocks[1].declaration,
            Some(Declaration::Method("getUri".to_string()))
        );
        assert_eq!(scanned.blocks[1].class.as_deref(), Some("Movie"));
        assert_eq!(scanned.qualify("Movie"), r"\Showtimes\Representations\Movie");
    }
}
