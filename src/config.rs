//! @ai:module:intent Project configuration loaded from apidoc.toml
//! @ai:module:layer infrastructure
//! @ai:module:public_api Config, VersionsConfig, ScopeConfig, PathConfig, CompileConfig
//! @ai:module:stateless true

use crate::compiler::Filter;
use crate::error::{Error, Result};
use crate::registry::CapabilityRegistry;
use crate::version::VersionNumber;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "apidoc.toml";

/// Version used when nothing else is configured (`1.0`).
const FALLBACK_VERSION: VersionNumber = VersionNumber::from_tenths(10);

/// @ai:intent Main configuration for an API documentation project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    /// Only reachable through `parse`, `load` or `Default`, so never empty.
    versions: VersionsConfig,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
    #[serde(default)]
    pub paths: PathConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

/// @ai:intent Supported API versions, ascending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsConfig {
    pub supported: Vec<VersionNumber>,
    #[serde(default)]
    pub default: Option<VersionNumber>,
}

/// @ai:intent An authentication scope that `@api-scope` may reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// @ai:intent Where controllers and representations live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_controllers")]
    pub controllers: Vec<PathBuf>,
    #[serde(default = "default_representations")]
    pub representations: Vec<PathBuf>,
}

/// @ai:intent What ends up in compiled output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileConfig {
    #[serde(default)]
    pub excluded_groups: Vec<String>,
    #[serde(default)]
    pub include_private: bool,
    /// None keeps every vendor tag; Some restricts output to the listed ones.
    #[serde(default)]
    pub vendor_tags: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            versions: VersionsConfig {
                supported: vec![FALLBACK_VERSION],
                default: None,
            },
            capabilities: Vec::new(),
            scopes: Vec::new(),
            paths: PathConfig::default(),
            compile: CompileConfig::default(),
            root: PathBuf::from("."),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            controllers: default_controllers(),
            representations: default_representations(),
        }
    }
}

fn default_name() -> String {
    "API".to_string()
}

fn default_controllers() -> Vec<PathBuf> {
    vec![PathBuf::from("src/Controllers")]
}

fn default_representations() -> Vec<PathBuf> {
    vec![PathBuf::from("src/Representations")]
}

impl Config {
    /// @ai:intent Load and validate configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:post relative paths resolve against the file's directory
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config = Self::parse(&content)?;
        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::debug!(
            "Loaded {} with {} supported versions",
            path.display(),
            config.versions.supported.len()
        );
        Ok(config)
    }

    /// @ai:intent Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let supported = &self.versions.supported;
        if supported.is_empty() {
            return Err(Error::Config(
                "versions.supported must list at least one version".to_string(),
            ));
        }

        if let Some(pair) = supported.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(Error::Config(format!(
                "versions.supported must be ascending, found {} before {}",
                pair[0], pair[1]
            )));
        }

        if let Some(default) = self.versions.default {
            if !supported.contains(&default) {
                return Err(Error::Config(format!(
                    "versions.default {} is not a supported version",
                    default
                )));
            }
        }

        Ok(())
    }

    pub fn supported_versions(&self) -> &[VersionNumber] {
        &self.versions.supported
    }

    pub fn first_version(&self) -> VersionNumber {
        self.versions
            .supported
            .first()
            .copied()
            .unwrap_or(FALLBACK_VERSION)
    }

    /// @ai:intent Version compiled when none is requested: the configured default, else the latest
    pub fn default_version(&self) -> VersionNumber {
        self.versions
            .default
            .or_else(|| self.versions.supported.last().copied())
            .unwrap_or(FALLBACK_VERSION)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn controller_dirs(&self) -> Vec<PathBuf> {
        self.paths.controllers.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn representation_dirs(&self) -> Vec<PathBuf> {
        self.paths
            .representations
            .iter()
            .map(|p| self.resolve(p))
            .collect()
    }

    /// @ai:intent Output filter described by the `[compile]` table
    pub fn filter(&self) -> Filter {
        Filter {
            include_private: self.compile.include_private,
            vendor_tags: self.compile.vendor_tags.clone(),
            excluded_groups: self.compile.excluded_groups.clone(),
        }
    }
}

impl CapabilityRegistry for Config {
    fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    /// No declared scopes means scopes are not checked.
    fn has_scope(&self, name: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const CONFIG: &str = r#"
name = "Mill Movies"
capabilities = ["BUY_TICKETS", "MOVIE_RATINGS"]

[versions]
supported = ["1.0", "1.1", "1.2"]
default = "1.1"

[[scopes]]
name = "edit"
description = "Edit movies"

[paths]
controllers = ["app/Controllers"]

[compile]
excluded_groups = ["Internal"]
vendor_tags = ["BUY_TICKETS"]
"#;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(CONFIG).unwrap();

        assert_eq!(config.name, "Mill Movies");
        assert_eq!(config.default_version().to_string(), "1.1");
        assert_eq!(config.first_version().to_string(), "1.0");
        assert_eq!(config.paths.controllers, vec![PathBuf::from("app/Controllers")]);
        assert_eq!(config.paths.representations, default_representations());
        assert!(config.has_capability("MOVIE_RATINGS"));
        assert!(!config.has_capability("DELETE_CONTENT"));
        assert!(config.has_scope("edit"));
        assert!(!config.has_scope("delete"));

        let filter = config.filter();
        assert!(!filter.include_private);
        assert_eq!(filter.excluded_groups, vec!["Internal".to_string()]);
    }

    #[test]
    fn test_default_version_falls_back_to_latest() {
        let config = Config::parse("[versions]\nsupported = [\"1.0\", \"2.0\"]\n").unwrap();
        assert_eq!(config.default_version().to_string(), "2.0");
        assert!(config.has_scope("anything"));
    }

    #[test]
    fn test_rejects_unordered_versions() {
        let err = Config::parse("[versions]\nsupported = [\"1.1\", \"1.0\"]\n").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("ascending")));

        let err = Config::parse("[versions]\nsupported = []\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::parse("[versions]\nsupported = [\"1.0\"]\ndefault = \"2.0\"\n")
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("default")));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.controller_dirs(),
            vec![dir.path().join("app/Controllers")]
        );
    }

    #[test]
    fn test_versions_without_supported_list() {
        let mut config = Config::default();
        assert_eq!(config.supported_versions().len(), 1);

        config.versions.supported.clear();
        assert_eq!(config.first_version().to_string(), "1.0");
        assert_eq!(config.default_version().to_string(), "1.0");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/apidoc.toml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
