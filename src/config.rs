//! Repository configuration (`.trimerge.toml`).
//!
//! Defines the typed configuration for the auto-resolve run and the import
//! merge. A missing file means all defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use trimerge_core::{BUILTIN_OPTION_NAMES, DEFAULT_IMPORT_EXTENSIONS, ResolveOptions};

use crate::sequence::{AutoResolveMode, DEFAULT_MAX_CHANGED_LINES, DEFAULT_MAX_CHARS, SkipLimits};

/// Name of the configuration file at the repository root.
pub const CONFIG_FILE_NAME: &str = ".trimerge.toml";

/// Environment variable overriding `resolve.max_changed_lines`.
pub const MAX_LINES_ENV: &str = "TRIMERGE_RESOLVE_MAX_LINES";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level trimerge configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrimergeConfig {
    /// Auto-resolve settings.
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Import merge settings.
    #[serde(default)]
    pub imports: ImportsConfig,
}

// ---------------------------------------------------------------------------
// ResolveConfig
// ---------------------------------------------------------------------------

/// Auto-resolve settings.
///
/// ```toml
/// [resolve]
/// mode = "always"
/// max_changed_lines = 50
/// max_chars = 80000
/// options = ["same", "enclosed", "import", "word"]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConfig {
    /// `always`, `never` or `ask` (default). Unrecognised values mean `never`.
    #[serde(default)]
    pub mode: AutoResolveMode,

    /// Large files changing more lines than this are skipped; 0 skips every
    /// large file.
    #[serde(default = "default_max_changed_lines")]
    pub max_changed_lines: usize,

    /// Text length above which a file counts as large.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Resolve options to use, by name.
    #[serde(default = "default_options")]
    pub options: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            mode: AutoResolveMode::default(),
            max_changed_lines: default_max_changed_lines(),
            max_chars: default_max_chars(),
            options: default_options(),
        }
    }
}

const fn default_max_changed_lines() -> usize {
    DEFAULT_MAX_CHANGED_LINES
}

const fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_options() -> Vec<String> {
    BUILTIN_OPTION_NAMES.iter().map(|&name| name.to_owned()).collect()
}

// ---------------------------------------------------------------------------
// ImportsConfig
// ---------------------------------------------------------------------------

/// Import merge settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportsConfig {
    /// File extensions (without dot) holding ES modules.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ImportsConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_IMPORT_EXTENSIONS
        .iter()
        .map(|&ext| ext.to_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a trimerge configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl TrimergeConfig {
    /// Load `.trimerge.toml` from `root` and apply environment overrides.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file is invalid or an override does not
    /// parse.
    pub fn load_from_root(root: &Path) -> Result<Self, ConfigError> {
        Self::load(&root.join(CONFIG_FILE_NAME))?
            .with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }

    /// Apply [`MAX_LINES_ENV`] as looked up through `lookup`.
    ///
    /// # Errors
    /// Returns `ConfigError` if the override is not a number.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(MAX_LINES_ENV) {
            self.resolve.max_changed_lines =
                raw.trim().parse::<usize>().map_err(|e| ConfigError {
                    path: None,
                    message: format!("{MAX_LINES_ENV}={raw:?}: {e}"),
                })?;
        }
        Ok(self)
    }

    /// The configured resolve options.
    ///
    /// # Errors
    /// Returns `ConfigError` naming the first unknown option.
    pub fn resolve_options(&self) -> Result<ResolveOptions, ConfigError> {
        ResolveOptions::from_names(&self.resolve.options, &self.imports.extensions).map_err(
            |name| ConfigError {
                path: None,
                message: format!(
                    "unknown resolve option `{name}` (known: {})",
                    BUILTIN_OPTION_NAMES.join(", ")
                ),
            },
        )
    }

    #[must_use]
    pub const fn skip_limits(&self) -> SkipLimits {
        SkipLimits {
            max_changed_lines: self.resolve.max_changed_lines,
            max_chars: self.resolve.max_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
