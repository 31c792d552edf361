//! Configuration management for PaperRank
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use crate::embeddings::{EmbeddingFormat, LoadOptions};
use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest writer budget the text index accepts for its single indexing thread
pub const MIN_WRITER_MEMORY: usize = 15_000_000;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Citation dataset
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Word embedding model
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Authority (PageRank) scoring
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Lexical index
    #[serde(default)]
    pub index: IndexConfig,

    /// Score fusion weights
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Clustering engine
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Default query parameters
    #[serde(default)]
    pub query: QueryConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// Path to the line-oriented citation dataset
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,

    /// Log parsing progress every N records
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Path to the word2vec model
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Model file format
    #[serde(default)]
    pub format: EmbeddingFormat,

    /// Only load the first N words of the model
    pub max_words: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityConfig {
    /// Damping factor
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Propagation rounds
    #[serde(default = "default_rounds")]
    pub rounds: usize,

    /// Stop early once the L1 change between rounds drops below this
    pub convergence_epsilon: Option<f64>,

    /// Spread mass held by dangling papers and unknown references evenly
    #[serde(default = "default_true")]
    pub redistribute_leaked_mass: bool,

    /// Multiplier applied to final scores
    #[serde(default = "default_authority_scale")]
    pub scale: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Analyze title and abstract with the English stemmer
    #[serde(default = "default_true")]
    pub stemming: bool,

    /// Field searched by unqualified query terms
    #[serde(default = "default_field")]
    pub default_field: String,

    /// Keep the index on disk in this directory and reuse it while the
    /// corpus is unchanged. Unset means an in-memory index.
    pub directory: Option<PathBuf>,

    /// Index writer memory budget in bytes
    #[serde(default = "default_writer_memory")]
    pub writer_memory_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FusionConfig {
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    #[serde(default = "default_authority_weight")]
    pub authority_weight: f64,

    /// Lexical candidates fetched per requested result
    #[serde(default = "default_over_fetch")]
    pub over_fetch: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusteringConfig {
    /// Iteration cap handed to the clustering engine
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,

    /// Centroid movement below which k-means stops
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_num_clusters")]
    pub num_clusters: usize,

    /// Per-query deadline in seconds
    #[serde(default = "default_query_timeout")]
    pub timeout_secs: u64,

    /// Report format: text or json
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for log records
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_dataset_path() -> PathBuf { PathBuf::from("data/citations.txt") }
fn default_progress_every() -> usize { 10_000 }
fn default_model_path() -> PathBuf { PathBuf::from("data/vectors.bin") }
fn default_damping() -> f64 { 0.85 }
fn default_rounds() -> usize { 1 }
fn default_authority_scale() -> f64 { crate::AUTHORITY_SCALE }
fn default_writer_memory() -> usize { 50_000_000 }
fn default_field() -> String { "title".to_string() }
fn default_lexical_weight() -> f64 { 0.5 }
fn default_semantic_weight() -> f64 { 0.2 }
fn default_authority_weight() -> f64 { 0.3 }
fn default_over_fetch() -> usize { 10 }
fn default_max_iterations() -> u64 { 100 }
fn default_tolerance() -> f64 { 1e-4 }
fn default_top_n() -> usize { 20 }
fn default_num_clusters() -> usize { 5 }
fn default_query_timeout() -> u64 { 30 }
fn default_output_format() -> String { "text".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "paperrank".to_string() }
fn default_true() -> bool { true }

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            progress_every: default_progress_every(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            format: EmbeddingFormat::default(),
            max_words: None,
        }
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            rounds: default_rounds(),
            convergence_epsilon: None,
            redistribute_leaked_mass: true,
            scale: default_authority_scale(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            default_field: default_field(),
            directory: None,
            writer_memory_bytes: default_writer_memory(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            lexical_weight: default_lexical_weight(),
            semantic_weight: default_semantic_weight(),
            authority_weight: default_authority_weight(),
            over_fetch: default_over_fetch(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            num_clusters: default_num_clusters(),
            timeout_secs: default_query_timeout(),
            output_format: default_output_format(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__AUTHORITY__ROUNDS=20
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(AppError::Configuration { message });

        if !(0.0..=1.0).contains(&self.authority.damping) {
            return invalid(format!(
                "authority.damping must be within [0, 1], got {}",
                self.authority.damping
            ));
        }
        if self.authority.rounds == 0 {
            return invalid("authority.rounds must be at least 1".to_string());
        }
        if self.authority.scale <= 0.0 {
            return invalid("authority.scale must be positive".to_string());
        }
        let weights = [
            ("fusion.lexical_weight", self.fusion.lexical_weight),
            ("fusion.semantic_weight", self.fusion.semantic_weight),
            ("fusion.authority_weight", self.fusion.authority_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return invalid(format!("{} must be a non-negative number, got {}", name, weight));
            }
        }
        if self.fusion.over_fetch == 0 {
            return invalid("fusion.over_fetch must be at least 1".to_string());
        }
        if self.clustering.max_iterations == 0 {
            return invalid("clustering.max_iterations must be at least 1".to_string());
        }
        if self.index.writer_memory_bytes < MIN_WRITER_MEMORY {
            return invalid(format!(
                "index.writer_memory_bytes must be at least {}",
                MIN_WRITER_MEMORY
            ));
        }
        Ok(())
    }

    /// Options for loading the embedding model
    pub fn embedding_load_options(&self) -> LoadOptions {
        LoadOptions {
            format: self.embedding.format,
            max_words: self.embedding.max_words,
        }
    }

    /// Get query timeout as Duration
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query.timeout_secs)
    }
}
