use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::KestrelError;

/// Top-level configuration loaded from `.kestrel.toml`.
///
/// Supports layered resolution: CLI flags > env vars > config file > defaults.
/// When running as a GitHub Action, action inputs arrive through the
/// `INPUT_*` environment convention and are applied with [`KestrelConfig::apply_env`].
///
/// # Examples
///
/// ```
/// use kestrel_core::KestrelConfig;
///
/// let config = KestrelConfig::default();
/// assert_eq!(config.llm.model, "gpt-4-1106-preview");
/// assert!(config.review.exclude.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KestrelConfig {
    /// Completion provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewSettings,
}

impl KestrelConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Io`] if the file cannot be read, or
    /// [`KestrelError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kestrel_core::KestrelConfig;
    /// use std::path::Path;
    ///
    /// let config = KestrelConfig::from_file(Path::new(".kestrel.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, KestrelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_core::KestrelConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// exclude = ["*.md"]
    /// "#;
    /// let config = KestrelConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.exclude, vec!["*.md"]);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, KestrelError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    ///
    /// Recognizes the GitHub Actions input convention (`INPUT_OPENAI_API_MODEL`,
    /// `INPUT_OPENAI_API_KEY`, `INPUT_EXCLUDE`) with the bare variable name as
    /// fallback. Empty values are ignored, matching how the Actions runner
    /// represents unset inputs.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay values from an arbitrary lookup. Seam for [`KestrelConfig::apply_env`].
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| {
            lookup(&format!("INPUT_{name}"))
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(name).filter(|v| !v.is_empty()))
        };

        if let Some(model) = get("OPENAI_API_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(base_url) = get("OPENAI_API_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(raw) = get("EXCLUDE") {
            self.review.exclude = parse_exclude_list(&raw);
        }
    }
}

/// Split a comma-separated exclusion list into trimmed, non-empty patterns.
///
/// # Examples
///
/// ```
/// use kestrel_core::config::parse_exclude_list;
///
/// let patterns = parse_exclude_list("*.md, dist/**, ");
/// assert_eq!(patterns, vec!["*.md", "dist/**"]);
/// ```
pub fn parse_exclude_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Completion provider configuration.
///
/// # Examples
///
/// ```
/// use kestrel_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4-1106-preview");
/// assert!(config.api_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "gpt-4-1106-preview".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Review behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Glob patterns for files to exclude from review.
    #[serde(default)]
    pub exclude: Vec<String>,
}
