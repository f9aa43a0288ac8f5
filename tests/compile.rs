use apidoc_parser::changelog::{ChangeType, Definition};
use apidoc_parser::{
    extract_project, lint_project, output, CompiledGraph, Compiler, Config, Filter, OutputFormat,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
name = "Movies"
capabilities = ["BUY_TICKETS"]

[versions]
supported = ["1.0", "1.1", "1.2"]

[paths]
controllers = ["Controllers"]
representations = ["Representations"]
"#;

const MOVIE_CONTROLLER: &str = r#"<?php
namespace Controllers;

class Movie
{
    /**
     * @api-label Get a movie.
     * @api-description Returns a single movie.
     * @api-uri:public {Movies} /movies/+id
     * @api-uri:public {Movies} /films/+id
     * @api-contentType application/json
     * @api-return:public (200, \Representations\Movie)
     * @api-throws:public (404, \Representations\Error) - Not found.
     * @api-version >=1.1
     * @api-throws:public (403, \Representations\Error) - Forbidden.
     */
    public function GET()
    {
    }
}
"#;

const MOVIE_REPRESENTATION: &str = r#"<?php
namespace Representations;

/**
 * @api-label Movie
 */
class Movie
{
    /**
     * @api-data id (integer) - Unique ID
     */
    public function getId()
    {
    }

    /**
     * @api-data urls (object) - External URLs
     * @api-data urls.imdb (string) - IMDB URL
     * @api-version >=1.1
     * @api-data urls.tickets (string, BUY_TICKETS) - Tickets URL
     */
    public function getUrls()
    {
    }
}
"#;

const ERROR_REPRESENTATION: &str = r#"<?php
namespace Representations;

/**
 * @api-label Error
 */
class Error
{
    /**
     * @api-data error (string) - Message
     */
    public function getError()
    {
    }
}
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "apidoc.toml", CONFIG);
    write(dir.path(), "Controllers/Movie.php", MOVIE_CONTROLLER);
    write(dir.path(), "Representations/Error.php", ERROR_REPRESENTATION);
    write(dir.path(), "Representations/Movie.php", MOVIE_REPRESENTATION);
    dir
}

fn load(dir: &TempDir) -> Config {
    Config::load(&dir.path().join("apidoc.toml")).unwrap()
}

fn compile(config: &Config) -> CompiledGraph {
    let sources = extract_project(config).unwrap();
    Compiler::from_config(config)
        .compile(&sources.actions, &sources.representations)
        .unwrap()
}

#[test]
fn test_extract_and_compile_project() {
    let dir = project();
    let config = load(&dir);

    let sources = extract_project(&config).unwrap();
    assert_eq!(sources.actions.len(), 1);
    assert_eq!(sources.representations.len(), 2);
    assert_eq!(sources.actions[0].class, r"\Controllers\Movie");

    let graph = compile(&config);
    assert_eq!(graph.actions().len(), 1);
    assert!(graph.representation(r"\Representations\Movie").is_some());
    assert!(graph.representation(r"Representations\Error").is_some());
}

#[test]
fn test_version_views() {
    let dir = project();
    let config = load(&dir);
    let graph = compile(&config);

    let v10 = graph.for_version("1.0".parse().unwrap(), &Filter::default());
    assert_eq!(v10.actions[0].errors().count(), 1);
    let movie = v10
        .representations
        .iter()
        .find(|r| r.label() == "Movie")
        .unwrap();
    let names: Vec<&str> = movie.fields.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "urls", "urls.imdb"]);

    let latest = graph.for_version(config.default_version(), &config.filter());
    assert_eq!(latest.version.to_string(), "1.2");
    assert_eq!(latest.actions[0].errors().count(), 2);
    assert_eq!(latest.actions[0].uris().count(), 2);
}

#[test]
fn test_exploded_fields() {
    let dir = project();
    let graph = compile(&load(&dir));

    let tree = graph
        .representation(r"\Representations\Movie")
        .unwrap()
        .explode();
    let urls = tree.child("urls").unwrap();

    assert!(urls.data.is_some());
    assert_eq!(
        urls.children.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["imdb", "tickets"]
    );
    assert!(tree.child("urls.tickets").and_then(|n| n.data.as_ref()).is_some());
}

#[test]
fn test_changelog_merges_identical_changes_across_paths() {
    let dir = project();
    let config = load(&dir);
    let changelog = compile(&config).changelog(&config.filter()).unwrap();

    assert_eq!(
        changelog
            .versions
            .iter()
            .map(|v| v.version.as_str())
            .collect::<Vec<_>>(),
        vec!["1.1"]
    );

    let entries = changelog.entries();
    let throws = entries
        .iter()
        .find(|e| e.change_type == ChangeType::ActionThrows)
        .unwrap();
    assert_eq!(throws.definition, Definition::Added);
    assert_eq!(throws.group, "Movies");
    assert_eq!(throws.namespace, r"\Controllers\Movie");
    assert_eq!(throws.paths(), vec!["/movies/{id}", "/films/{id}"]);

    let data = entries
        .iter()
        .find(|e| e.change_type == ChangeType::RepresentationData)
        .unwrap();
    assert_eq!(data.group, "Movie");
    assert_eq!(data.payload()["field"], "urls.tickets");

    let text = {
        colored::control::set_override(false);
        output::format_changelog(&changelog, OutputFormat::Text)
    };
    assert!(text.contains("GET /movies/{id}, /films/{id} now throws a 403"));
}

#[test]
fn test_lint_clean_project() {
    let dir = project();
    let result = lint_project(&load(&dir)).unwrap();

    assert!(result.passed());
    assert_eq!(result.files_checked, 3);
    assert_eq!(result.actions_checked, 1);
    assert_eq!(result.representations_checked, 2);
    assert_eq!(result.warnings, 0);
}

#[test]
fn test_lint_reports_missing_visibility() {
    let dir = project();
    write(
        dir.path(),
        "Controllers/Person.php",
        r#"<?php
namespace Controllers;

class Person
{
    /**
     * @api-label Get a person.
     * @api-uri {People} /people/+id
     * @api-contentType application/json
     */
    public function GET()
    {
    }
}
"#,
    );

    let result = lint_project(&load(&dir)).unwrap();
    assert!(!result.passed());

    let issue = result.issues.iter().find(|i| i.code == "E301").unwrap();
    assert!(issue.location.file.ends_with("Controllers/Person.php"));
    assert_eq!(issue.location.line, 6);

    let json = output::format_lint_result(&result, OutputFormat::Json);
    assert!(json.contains("\"E301\""));
}
