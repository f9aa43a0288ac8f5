//! @ai:module:intent Format lint results, compiled versions and changelogs as text or JSON
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_lint_result, format_version_view, format_compilation, format_changelog, describe_entry, to_json
//! @ai:module:depends_on linter, compiler, changelog
//! @ai:module:stateless true

use crate::changelog::{ChangeType, Changelog, ChangelogEntry, Definition};
use crate::compiler::{Compilation, VersionView};
use crate::linter::{LintResult, Severity};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

/// @ai:intent Format any serializable value as JSON
/// @ai:effects pure
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}

/// @ai:intent Format lint results as a string
/// @ai:effects pure
pub fn format_lint_result(result: &LintResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(result, false),
        OutputFormat::JsonPretty => to_json(result, true),
        OutputFormat::Text => format_lint_result_text(result),
    }
}

/// @ai:intent Format lint results as human-readable text
/// @ai:effects pure
fn format_lint_result_text(result: &LintResult) -> String {
    let mut output = String::new();

    for issue in &result.issues {
        let severity_str = match issue.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN".yellow().bold(),
            Severity::Info => "INFO".blue(),
        };

        let location = format!(
            "{}:{}",
            issue.location.file.display(),
            issue.location.line
        );

        output.push_str(&format!(
            "{} {} - {} ({})\n",
            severity_str,
            location.dimmed(),
            issue.message,
            issue.code.dimmed()
        ));

        if let Some(suggestion) = &issue.suggestion {
            output.push_str(&format!("  {} {}\n", "hint:".cyan(), suggestion));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Checked {} files, {} actions, {} representations\n",
        result.files_checked, result.actions_checked, result.representations_checked
    ));

    if result.errors > 0 {
        output.push_str(&format!(
            "{} errors, {} warnings\n",
            result.errors.to_string().red().bold(),
            result.warnings.to_string().yellow()
        ));
    } else if result.warnings > 0 {
        output.push_str(&format!(
            "{} {} warnings\n",
            "OK".green().bold(),
            result.warnings.to_string().yellow()
        ));
    } else {
        output.push_str(&format!("{} No issues found\n", "OK".green().bold()));
    }

    output
}

/// @ai:intent Format one compiled version
/// @ai:effects pure
pub fn format_version_view(view: &VersionView, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(view, false),
        OutputFormat::JsonPretty => to_json(view, true),
        OutputFormat::Text => format_version_view_text(view),
    }
}

fn format_version_view_text(view: &VersionView) -> String {
    let mut output = format!("{}\n", format!("Version {}", view.version).bold());

    output.push_str(&format!("\n  Actions ({}):\n", view.actions.len()));
    for action in &view.actions {
        for uri in action.uris() {
            output.push_str(&format!(
                "    {} {} {}\n",
                action.method.cyan(),
                uri.clean_path(),
                format!("[{}]", uri.group).dimmed()
            ));
        }
        output.push_str(&format!("      {}\n", action.label.label));
        if let Some(content_type) = action.content_type(Some(view.version)) {
            output.push_str(&format!("      content type: {}\n", content_type));
        }
    }

    output.push_str(&format!("\n  Representations ({}):\n", view.representations.len()));
    for representation in &view.representations {
        output.push_str(&format!(
            "    {} ({} fields)\n",
            representation.label().cyan(),
            representation.fields.len()
        ));
    }

    output
}

/// @ai:intent Format every compiled version, newest first, followed by the changelog
/// @ai:effects pure
pub fn format_compilation(compilation: &Compilation, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(compilation, false),
        OutputFormat::JsonPretty => to_json(compilation, true),
        OutputFormat::Text => {
            let mut output = String::new();
            for view in &compilation.versions {
                output.push_str(&format_version_view_text(view));
                output.push('\n');
            }
            output.push_str(&format!("{}\n", "Changelog".bold()));
            output.push_str(&format_changelog_text(&compilation.changelog));
            output
        }
    }
}

/// @ai:intent Format the changelog as a string
/// @ai:effects pure
pub fn format_changelog(changelog: &Changelog, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(changelog, false),
        OutputFormat::JsonPretty => to_json(changelog, true),
        OutputFormat::Text => format_changelog_text(changelog),
    }
}

fn format_changelog_text(changelog: &Changelog) -> String {
    if changelog.is_empty() {
        return format!("{}\n", "No changes between supported versions".dimmed());
    }

    let mut output = String::new();
    let mut heading: Option<(&str, Definition)> = None;

    for entry in changelog.entries() {
        if heading.map(|(v, _)| v) != Some(entry.version) {
            output.push_str(&format!("\n{}\n", entry.version.bold()));
            heading = None;
        }
        if heading.map(|(_, d)| d) != Some(entry.definition) {
            let title = match entry.definition {
                Definition::Added => "Added".green(),
                Definition::Changed => "Changed".yellow(),
                Definition::Removed => "Removed".red(),
            };
            output.push_str(&format!("  {}\n", title.bold()));
            heading = Some((entry.version, entry.definition));
        }

        output.push_str(&format!(
            "    - {} {}\n",
            format!("[{}]", entry.group).dimmed(),
            describe_entry(&entry)
        ));
    }

    output
}

fn text(payload: &Value, key: &str) -> String {
    match &payload[key] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// @ai:intent One-line human description of a merged changelog entry
/// @ai:example ActionReturn added on two paths -> "GET /movies/{id}, /films/{id} now returns a 200 `\Movie`"
pub fn describe_entry(entry: &ChangelogEntry<'_>) -> String {
    let payload = entry.payload();
    let target = format!("{} {}", text(payload, "method"), entry.paths().join(", "));
    let removed = entry.definition == Definition::Removed;

    match entry.change_type {
        ChangeType::Action => format!("{} was added", target),
        ChangeType::ActionParam => format!(
            "{} {} `{}`",
            target,
            if removed { "no longer accepts" } else { "now accepts" },
            text(payload, "field")
        ),
        ChangeType::ActionReturn => format!(
            "{} {} a {} `{}`",
            target,
            if removed { "no longer returns" } else { "now returns" },
            text(payload, "http_code"),
            text(payload, "representation")
        ),
        ChangeType::ActionThrows => format!(
            "{} {} a {} `{}` {}",
            target,
            if removed { "no longer throws" } else { "now throws" },
            text(payload, "http_code"),
            text(payload, "representation"),
            text(payload, "description")
        )
        .trim_end()
        .to_string(),
        ChangeType::ContentType => format!(
            "{} now returns a `{}` content type",
            target,
            text(payload, "content_type")
        ),
        ChangeType::RepresentationData => format!(
            "`{}` {} `{}`",
            text(payload, "field"),
            if removed { "was removed from" } else { "was added to" },
            entry.namespace
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::{ChangelogBuilder, Changeset};
    use crate::extractor::Location;
    use crate::linter::LintIssue;
    use serde_json::json;

    fn changelog() -> Changelog {
        let mut builder = ChangelogBuilder::new();
        for path in ["/movies/{id}", "/films/{id}"] {
            builder
                .record(Changeset {
                    version: "1.1".parse().unwrap(),
                    definition: Definition::Added,
                    change_type: ChangeType::ActionReturn,
                    group: "Movies".to_string(),
                    namespace: r"\Controllers\Movie".to_string(),
                    path: Some(path.to_string()),
                    payload: json!({
                        "method": "GET",
                        "http_code": 200,
                        "representation": r"\Movie",
                    }),
                })
                .unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_describe_merged_entry() {
        let changelog = changelog();
        let entries = changelog.entries();
        assert_eq!(
            describe_entry(&entries[0]),
            r"GET /movies/{id}, /films/{id} now returns a 200 `\Movie`"
        );
    }

    #[test]
    fn test_changelog_text_and_json() {
        colored::control::set_override(false);
        let changelog = changelog();

        let text = format_changelog(&changelog, OutputFormat::Text);
        assert!(text.contains("1.1\n  Added\n"));
        assert!(text.contains("[Movies] GET"));

        let json: Value = serde_json::from_str(&format_changelog(&changelog, OutputFormat::Json)).unwrap();
        assert_eq!(json["versions"][0]["version"], "1.1");
        assert!(json["versions"][0]["changes"]["added"]["resources"]["Movies"].is_object());
    }

    #[test]
    fn test_compilation_text_lists_every_version() {
        colored::control::set_override(false);
        let compilation = Compilation {
            versions: ["1.1", "1.0"]
                .iter()
                .map(|v| VersionView {
                    version: v.parse().unwrap(),
                    actions: Vec::new(),
                    representations: Vec::new(),
                })
                .collect(),
            changelog: changelog(),
        };

        let text = format_compilation(&compilation, OutputFormat::Text);
        let newest = text.find("Version 1.1").unwrap();
        let oldest = text.find("Version 1.0").unwrap();
        assert!(newest < oldest);
        assert!(text.contains("Changelog\n"));
        assert!(text.contains("[Movies] GET /movies/{id}, /films/{id} now returns"));

        let json: Value =
            serde_json::from_str(&format_compilation(&compilation, OutputFormat::Json)).unwrap();
        assert_eq!(json["versions"][0]["version"], "1.1");
    }

    #[test]
    fn test_lint_text_summary() {
        colored::control::set_override(false);
        let result = LintResult {
            files_checked: 2,
            actions_checked: 1,
            issues: vec![LintIssue {
                severity: Severity::Error,
                code: "E301".to_string(),
                message: "missing decorator".to_string(),
                location: Location::new("Movie.php".into(), 12),
                suggestion: Some("Write `@api-uri:public`".to_string()),
            }],
            errors: 1,
            ..Default::default()
        };

        let text = format_lint_result(&result, OutputFormat::Text);
        assert!(text.contains("ERROR Movie.php:12 - missing decorator (E301)"));
        assert!(text.contains("hint: Write `@api-uri:public`"));
        assert!(text.contains("1 errors, 0 warnings"));
    }
}
