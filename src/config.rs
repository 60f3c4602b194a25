//! Configuration module for the corpus analysis engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CM_` and use double underscores
//! to separate nested levels:
//! - `CM_ANALYSIS__INPUT_DIR=/data/production` sets `analysis.input_dir`
//! - `CM_LLM__MODEL=mistral` sets `llm.model`
//! - `CM_CLUSTERING__SEED=7` sets `clustering.seed`

use crate::narration::WordCloudParams;
use crate::vector::{ClusteringParams, ProjectionParams};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file, searched upward from the
/// current directory.
pub const CONFIG_DIR: &str = ".corpusmap";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "CM_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Pipeline inputs, outputs and stage choices
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub clustering: ClusteringParams,

    #[serde(default)]
    pub projection: ProjectionParams,

    /// LLM collaborator used for cluster narration
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub wordcloud: WordCloudParams,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Directory containing `*_vector.json` records
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_json")]
    pub output_json: PathBuf,

    #[serde(default = "default_output_html")]
    pub output_html: PathBuf,

    /// Where word-cloud images are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// "kmeans" or "dbscan"
    #[serde(default = "default_clustering_method")]
    pub clustering_method: String,

    /// Requested cluster count; unset picks max(2, sqrt(n))
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<usize>,

    /// "cosine", "euclidean" or "correlation"
    #[serde(default = "default_similarity_metric")]
    pub similarity_metric: String,

    /// Minimum similarity for a network edge
    #[serde(default = "default_network_threshold")]
    pub network_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LlmConfig {
    /// Set to false to skip narration entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout for generation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Character budget for titles and summaries in the prompt
    #[serde(default = "default_prompt_char_budget")]
    pub prompt_char_budget: usize,

    /// Timeout for the reachability check
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_input_dir() -> PathBuf {
    PathBuf::from("./production")
}
fn default_output_json() -> PathBuf {
    PathBuf::from("analysis_results.json")
}
fn default_output_html() -> PathBuf {
    PathBuf::from("visualization.html")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_clustering_method() -> String {
    "kmeans".to_string()
}
fn default_similarity_metric() -> String {
    "cosine".to_string()
}
fn default_network_threshold() -> f64 {
    0.7
}
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama2".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_prompt_char_budget() -> usize {
    5000
}
fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            analysis: AnalysisConfig::default(),
            clustering: ClusteringParams::default(),
            projection: ProjectionParams::default(),
            llm: LlmConfig::default(),
            wordcloud: WordCloudParams::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_json: default_output_json(),
            output_html: default_output_html(),
            output_dir: default_output_dir(),
            clustering_method: default_clustering_method(),
            n_clusters: None,
            similarity_metric: default_similarity_metric(),
            network_threshold: default_network_threshold(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            prompt_char_budget: default_prompt_char_budget(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_layered(&config_path)
    }

    /// Load configuration from a specific file, still honouring
    /// environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::load_layered(path.as_ref())
    }

    fn load_layered(config_path: &Path) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels; single
            // underscores stay inside field names.
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
            .map(Settings::normalized)
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.llm.endpoint.trim_end_matches('/').len();
        self.llm.endpoint.truncate(trimmed);
        self
    }

    /// Find the settings file by looking for the config directory from the
    /// current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments in the
    /// current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    /// Create a default settings file under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, SETTINGS_TEMPLATE)?;
        Ok(config_path)
    }
}

const SETTINGS_TEMPLATE: &str = r#"# corpusmap configuration file

# Version of the configuration schema
version = 1

# Global debug mode (DEBUG-level logging)
debug = false

[analysis]
# Directory containing the *_vector.json records from the production stage
input_dir = "./production"

# Report outputs
output_json = "analysis_results.json"
output_html = "visualization.html"

# Directory for cluster_<id>_wordcloud.png images
output_dir = "."

# Clustering algorithm: "kmeans" or "dbscan"
clustering_method = "kmeans"

# Number of K-means clusters; leave unset for max(2, sqrt(documents))
# n_clusters = 5

# Similarity metric: "cosine", "euclidean" or "correlation"
similarity_metric = "cosine"

# Minimum similarity for an edge in the document network
network_threshold = 0.7

[clustering]
seed = 42
n_init = 10
max_iterations = 300
tolerance = 0.0001
# DBSCAN radius in cosine distance and minimum neighborhood size
dbscan_eps = 0.5
dbscan_min_samples = 2

[projection]
n_components = 2
# Clamped automatically for small corpora
perplexity = 30.0
seed = 42
max_iterations = 1000
early_exaggeration = 12.0

[llm]
# Set to false to skip LLM cluster descriptions
enabled = true
endpoint = "http://localhost:11434"
model = "llama2"
timeout_secs = 120
prompt_char_budget = 5000
connect_timeout_secs = 5

[wordcloud]
width = 800
height = 400
max_words = 100
min_font_size = 10
relative_scaling = 0.5
background = "white"
"#;
