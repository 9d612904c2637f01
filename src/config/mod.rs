//! Pipeline configuration from `kiln.toml`.
//!
//! # Sections
//!
//! | Section        | Purpose                                        |
//! |----------------|------------------------------------------------|
//! | `[output]`     | Artifact directory, extension, manifest name   |
//! | `meta_extension` | Extension of sidecar metadata files          |
//! | `[watch]`      | Watch mode toggle and debounce window          |
//! | `[[types]]`    | Resource types and the extensions they claim   |
//!
//! A missing file means defaults. Unknown keys are reported and ignored.

mod error;

pub use error::ConfigError;

use crate::{compiler::CompilerOptions, log};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "kiln.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub output: OutputConfig,

    /// Extension of sidecar metadata files (`foo.png` → `foo.meta`)
    pub meta_extension: String,

    pub watch: WatchConfig,

    /// Registered resource types
    pub types: Vec<TypeConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            output: OutputConfig::default(),
            meta_extension: "meta".into(),
            watch: WatchConfig::default(),
            types: Vec::new(),
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Artifact directory, relative to the project root
    pub dir: String,
    pub artifact_extension: String,
    /// Manifest file name inside `dir`
    pub manifest: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".kiln/assets".into(),
            artifact_extension: "res".into(),
            manifest: "_list.json".into(),
        }
    }
}

/// `[watch]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    /// Quiet period before a burst of events is flushed
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 300,
        }
    }
}

/// One `[[types]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl PipelineConfig {
    /// Load the config at `path`, or search upward from cwd for
    /// `kiln.toml` when no path is given.
    ///
    /// Without a config file the defaults apply and the root is cwd.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;

        let found = match path {
            Some(path) => {
                let path = cwd.join(path);
                if !path.exists() {
                    return Err(ConfigError::Io(
                        path,
                        std::io::Error::from(std::io::ErrorKind::NotFound),
                    )
                    .into());
                }
                Some(path)
            }
            None => find_config_file(&cwd, Path::new(CONFIG_FILE)),
        };

        let mut config = match &found {
            Some(path) => Self::from_path(path)?,
            None => {
                crate::debug!("config"; "no {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };

        config.root = found
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| cwd.clone(), Path::to_path_buf);
        config.config_path = found.unwrap_or_else(|| cwd.join(CONFIG_FILE));
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Check paths and the extension table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dir = Path::new(&self.output.dir);
        if self.output.dir.trim().is_empty() || dir.is_absolute() {
            return Err(ConfigError::Validation(format!(
                "[output] dir `{}` must be a relative path",
                self.output.dir
            )));
        }
        if dir.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(ConfigError::Validation(format!(
                "[output] dir `{}` must stay inside the project",
                self.output.dir
            )));
        }
        if self.output.manifest.is_empty() || self.output.manifest.contains('/') {
            return Err(ConfigError::Validation(format!(
                "[output] manifest `{}` must be a plain file name",
                self.output.manifest
            )));
        }
        check_extension("[output] artifact_extension", &self.output.artifact_extension)?;
        check_extension("meta_extension", &self.meta_extension)?;

        let mut claimed: FxHashMap<String, &str> = FxHashMap::default();
        for ty in &self.types {
            if ty.name.trim().is_empty() {
                return Err(ConfigError::Validation("[[types]] name must not be empty".into()));
            }
            for ext in &ty.extensions {
                check_extension(&format!("[[types]] `{}`", ty.name), ext)?;
                let key = ext.to_ascii_lowercase();
                if let Some(existing) = claimed.insert(key, &ty.name)
                    && existing != ty.name
                {
                    return Err(ConfigError::Validation(format!(
                        "extension `{ext}` is claimed by both `{existing}` and `{}`",
                        ty.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Compiler layout derived from `[output]` and `meta_extension`.
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            output_dir: self.output.dir.clone(),
            artifact_extension: self.output.artifact_extension.clone(),
            manifest: self.output.manifest.clone(),
            meta_extension: self.meta_extension.clone(),
        }
    }

    /// Every configured extension, for the pass-through plugin.
    pub fn extensions(&self) -> Vec<&str> {
        self.types
            .iter()
            .flat_map(|t| t.extensions.iter().map(String::as_str))
            .collect()
    }
}

fn check_extension(field: &str, ext: &str) -> Result<(), ConfigError> {
    if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
        return Err(ConfigError::Validation(format!(
            "{field}: `{ext}` is not a valid extension (no leading dot, not empty)"
        )));
    }
    Ok(())
}

/// Find config file by searching upward from `start`.
///
/// ```text
/// /home/user/game/assets/textures/  ← start
/// /home/user/game/kiln.toml         ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
meta_extension = "kmeta"

[output]
dir = "build/cache"
artifact_extension = "bin"

[watch]
debounce_ms = 50

[[types]]
name = "texture"
extensions = ["png", "tga"]

[[types]]
name = "shader"
extensions = ["glsl"]
"#;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_str("").unwrap();
        assert_eq!(config.output.dir, ".kiln/assets");
        assert_eq!(config.output.artifact_extension, "res");
        assert_eq!(config.output.manifest, "_list.json");
        assert_eq!(config.meta_extension, "meta");
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 300);
        assert!(config.types.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_sections() {
        let config = PipelineConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.output.dir, "build/cache");
        assert_eq!(config.output.manifest, "_list.json");
        assert_eq!(config.meta_extension, "kmeta");
        assert_eq!(config.watch.debounce_ms, 50);
        assert_eq!(config.types.len(), 2);
        assert_eq!(config.extensions(), vec!["png", "tga", "glsl"]);

        let options = config.compiler_options();
        assert_eq!(options.output_dir, "build/cache");
        assert_eq!(options.artifact_extension, "bin");
        assert_eq!(options.meta_extension, "kmeta");
    }

    #[test]
    fn test_unknown_fields_collected() {
        let content = "colour = true\n[output]\ndir = \"out\"\nzip = 1\n";
        let (config, mut ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.output.dir, "out");
        ignored.sort();
        assert_eq!(ignored, vec!["colour".to_string(), "output.zip".to_string()]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            PipelineConfig::from_str("[output\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_validate_rejects() {
        let cases = [
            "[output]\ndir = \"/abs\"",
            "[output]\ndir = \"../up\"",
            "[output]\nartifact_extension = \".res\"",
            "[[types]]\nname = \"texture\"\nextensions = [\"\"]",
            "[[types]]\nname = \"a\"\nextensions = [\"png\"]\n[[types]]\nname = \"b\"\nextensions = [\"PNG\"]",
        ];
        for case in cases {
            let config = PipelineConfig::from_str(case).unwrap();
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation(_))),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn test_find_config_file_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("assets/textures");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();

        let found = find_config_file(&nested, Path::new(CONFIG_FILE)).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE));
        assert!(find_config_file(&nested, Path::new("kiln-missing.toml")).is_none());
    }
}
