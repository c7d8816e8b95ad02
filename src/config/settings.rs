//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable consulted when `llm.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// ValidationMode
// ---------------------------------------------------------------------------

/// How user answers are accepted by the dialogue.
///
/// | Variant    | Accepted input                                   | Gateway call |
/// |------------|--------------------------------------------------|--------------|
/// | `Literal`  | one of the offered options                       | No           |
/// | `FreeText` | any text, checked by the language model first    | Yes          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationMode {
    Literal,
    FreeText,
}

impl Default for ValidationMode {
    fn default() -> Self {
        Self::Literal
    }
}

// ---------------------------------------------------------------------------
// LlmProvider
// ---------------------------------------------------------------------------

/// Selects which language-model backend the gateway talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LlmProvider {
    /// Ollama running locally in OpenAI mode. Only an explicitly configured
    /// key is sent; `OPENAI_API_KEY` is never forwarded to it.
    Ollama,
    /// Any OpenAI-compatible REST API (OpenAI, Groq, LM Studio …).
    OpenAiCompatible,
    /// Gateway disabled: every call fails with `GatewayError::Disabled`.
    Disabled,
}

impl Default for LlmProvider {
    fn default() -> Self {
        Self::OpenAiCompatible
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the language model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which backend to use.
    pub provider: LlmProvider,
    /// Base URL of the API endpoint.
    ///
    /// - OpenAI: `https://api.openai.com`
    /// - Ollama: `http://localhost:11434`
    pub base_url: String,
    /// API key, `None` for local providers. Falls back to
    /// `OPENAI_API_KEY` when unset, except for [`LlmProvider::Ollama`].
    pub api_key: Option<String>,
    /// Model used for question phrasing, explanations and validation.
    pub chat_model: String,
    /// Model used for description embeddings.
    pub embedding_model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a single gateway response.
    pub timeout_secs: u64,
    /// Prompt language as an ISO-639-1 code (`"en"` or `"de"`).
    pub language: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
            chat_model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            temperature: 0.3,
            timeout_secs: 30,
            language: "en".into(),
        }
    }
}

impl LlmConfig {
    /// The configured key, or the `OPENAI_API_KEY` environment variable.
    ///
    /// Empty strings count as "no key". Ollama never picks up the
    /// environment key.
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self.api_key.clone().filter(|k| !k.is_empty());
        if self.provider == LlmProvider::Ollama {
            return configured;
        }
        configured.or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Behaviour of the narrowing engine and its sub-flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rank the full catalog by embedding similarity when all attributes
    /// are answered and several fish remain.
    pub embedding_fallback: bool,
    /// Literal-only answers or language-model validated free text.
    pub validation: ValidationMode,
    /// Clarification requests allowed per attribute before a literal choice
    /// is forced.
    pub max_clarifications: u32,
    /// Number of ranked matches returned by the similarity fallback.
    pub top_k: usize,
    /// Offer a "skip" option that records the attribute as not given.
    pub allow_skip: bool,
    /// Label of the synthetic "unsure" option.
    pub unsure_label: String,
    /// Label of the synthetic "skip" option.
    pub skip_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_fallback: true,
            validation: ValidationMode::default(),
            max_clarifications: 2,
            top_k: 3,
            allow_skip: false,
            unsure_label: "I'm not sure".into(),
            skip_label: "Skip".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogConfig
// ---------------------------------------------------------------------------

/// Where the fish table comes from and which columns are asked about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// CSV or JSON file with one row per species. `None` uses
    /// [`AppPaths::default_catalog_file`] when it exists, else the bundled
    /// data set.
    pub data_file: Option<PathBuf>,
    /// Attribute columns in question order.
    pub attributes: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            attributes: vec![
                "habitat".into(),
                "diet".into(),
                "fin shape".into(),
                "color".into(),
                "eye color".into(),
                "scales".into(),
                "body form".into(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Which presenter drives the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frontend {
    /// egui desktop window.
    Window,
    /// Line-based prompt on stdin/stdout.
    Terminal,
}

impl Default for Frontend {
    fn default() -> Self {
        Self::Window
    }
}

/// Window appearance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Presenter backend.
    pub frontend: Frontend,
    /// Initial window size `(width, height)` in logical pixels.
    pub window_size: (f32, f32),
    /// Keep the window above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            frontend: Frontend::default(),
            window_size: (520.0, 560.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Default glossary: fin and mouth position terms beginners stumble over.
fn default_glossary() -> BTreeMap<String, String> {
    [
        ("abdominal", "The pelvic fins sit underneath the belly."),
        ("torpedo", "The body is long and spindle-shaped like a torpedo."),
        ("superior", "The mouth points obliquely upwards."),
        ("inferior", "The mouth points downwards."),
        ("terminal", "The mouth sits at the front of the head and points straight ahead."),
    ]
    .into_iter()
    .map(|(term, text)| (term.to_string(), text.to_string()))
    .collect()
}

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use finfinder::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert!(!config.catalog.attributes.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model gateway settings.
    pub llm: LlmConfig,
    /// Narrowing engine settings.
    pub engine: EngineConfig,
    /// Candidate data settings.
    pub catalog: CatalogConfig,
    /// Presenter settings.
    pub ui: UiConfig,
    /// Term → explanation pairs shown next to matching questions.
    #[serde(default = "default_glossary")]
    pub glossary: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            engine: EngineConfig::default(),
            catalog: CatalogConfig::default(),
            ui: UiConfig::default(),
            glossary: default_glossary(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
