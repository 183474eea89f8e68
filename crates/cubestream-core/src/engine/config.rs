use crate::core::density::DensityNormalizer;
use crate::core::io::cube::{CubeReadOptions, Dialect, SkewPolicy};
use crate::core::sequence::{Sequencer, SnapshotPathPattern};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FILE_EXTENSION: &str = "cube";
pub const DEFAULT_INDEX_DIGIT_WIDTH: usize = 4;
pub const DEFAULT_INTER_FRAME_DELAY_MS: u64 = 33;
pub const DEFAULT_PURGE_BATCH_SIZE: usize = 10;
pub const DEFAULT_PURGE_KEEP_MINIMUM: usize = 10;
pub const DEFAULT_POSITION_SCALING_FACTOR: f64 = 1.0;
pub const DEFAULT_ATOM_RADIUS: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Where snapshot files live and how they are read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub base_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    pub index_digit_width: usize,
    pub first_index: u64,
    pub last_index_exclusive: u64,
    pub cube_dialect: Dialect,
    pub skew_policy: SkewPolicy,
}

impl SourceConfig {
    pub fn path_pattern(&self) -> SnapshotPathPattern {
        SnapshotPathPattern::new(
            self.base_dir.clone(),
            self.file_prefix.clone(),
            self.file_extension.clone(),
            self.index_digit_width,
        )
    }

    pub fn sequencer(&self) -> Sequencer {
        Sequencer::new(self.first_index, self.last_index_exclusive)
    }

    pub fn read_options(&self) -> CubeReadOptions {
        CubeReadOptions::new(self.cube_dialect).with_skew_policy(self.skew_policy)
    }
}

/// Bounded retention of buffered timepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub purge_batch_size: usize,
    pub purge_keep_minimum: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub source: SourceConfig,
    pub retention: RetentionConfig,
    pub normalize_density_to: f64,
    pub inter_frame_delay: Duration,
    pub position_scaling_factor: f64,
    /// Render radius of the atom spheres, in scene units. Carried for the scene
    /// adapter; the pipeline itself never reads it.
    pub atom_radius: f64,
}

impl StreamConfig {
    pub fn normalizer(&self) -> DensityNormalizer {
        DensityNormalizer::new(self.normalize_density_to)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileStreamConfig = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })?;
        file.into_builder().build()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: FileStreamConfig = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        file.into_builder().build()
    }
}

#[derive(Default)]
pub struct StreamConfigBuilder {
    base_dir: Option<PathBuf>,
    file_prefix: Option<String>,
    file_extension: Option<String>,
    index_digit_width: Option<usize>,
    first_index: Option<u64>,
    last_index_exclusive: Option<u64>,
    cube_dialect: Option<Dialect>,
    skew_policy: Option<SkewPolicy>,
    normalize_density_to: Option<f64>,
    inter_frame_delay_ms: Option<u64>,
    purge_batch_size: Option<usize>,
    purge_keep_minimum: Option<usize>,
    position_scaling_factor: Option<f64>,
    atom_radius: Option<f64>,
}

impl StreamConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, dir: PathBuf) -> Self {
        self.base_dir = Some(dir);
        self
    }
    pub fn file_prefix(mut self, prefix: &str) -> Self {
        self.file_prefix = Some(prefix.to_string());
        self
    }
    pub fn file_extension(mut self, extension: &str) -> Self {
        self.file_extension = Some(extension.to_string());
        self
    }
    pub fn index_digit_width(mut self, width: usize) -> Self {
        self.index_digit_width = Some(width);
        self
    }
    pub fn first_index(mut self, index: u64) -> Self {
        self.first_index = Some(index);
        self
    }
    pub fn last_index_exclusive(mut self, index: u64) -> Self {
        self.last_index_exclusive = Some(index);
        self
    }
    pub fn cube_dialect(mut self, dialect: Dialect) -> Self {
        self.cube_dialect = Some(dialect);
        self
    }
    pub fn skew_policy(mut self, policy: SkewPolicy) -> Self {
        self.skew_policy = Some(policy);
        self
    }
    pub fn normalize_density_to(mut self, target: f64) -> Self {
        self.normalize_density_to = Some(target);
        self
    }
    pub fn inter_frame_delay_ms(mut self, millis: u64) -> Self {
        self.inter_frame_delay_ms = Some(millis);
        self
    }
    pub fn purge_batch_size(mut self, count: usize) -> Self {
        self.purge_batch_size = Some(count);
        self
    }
    pub fn purge_keep_minimum(mut self, count: usize) -> Self {
        self.purge_keep_minimum = Some(count);
        self
    }
    pub fn position_scaling_factor(mut self, factor: f64) -> Self {
        self.position_scaling_factor = Some(factor);
        self
    }
    pub fn atom_radius(mut self, radius: f64) -> Self {
        self.atom_radius = Some(radius);
        self
    }

    pub fn build(self) -> Result<StreamConfig, ConfigError> {
        let source = SourceConfig {
            base_dir: self
                .base_dir
                .ok_or(ConfigError::MissingParameter("base_dir"))?,
            file_prefix: self
                .file_prefix
                .ok_or(ConfigError::MissingParameter("file_prefix"))?,
            file_extension: self
                .file_extension
                .unwrap_or_else(|| DEFAULT_FILE_EXTENSION.to_string()),
            index_digit_width: self
                .index_digit_width
                .unwrap_or(DEFAULT_INDEX_DIGIT_WIDTH),
            first_index: self
                .first_index
                .ok_or(ConfigError::MissingParameter("first_index"))?,
            last_index_exclusive: self
                .last_index_exclusive
                .ok_or(ConfigError::MissingParameter("last_index_exclusive"))?,
            cube_dialect: self.cube_dialect.unwrap_or_default(),
            skew_policy: self.skew_policy.unwrap_or_default(),
        };
        let retention = RetentionConfig {
            purge_batch_size: self.purge_batch_size.unwrap_or(DEFAULT_PURGE_BATCH_SIZE),
            purge_keep_minimum: self
                .purge_keep_minimum
                .unwrap_or(DEFAULT_PURGE_KEEP_MINIMUM),
        };
        let config = StreamConfig {
            source,
            retention,
            normalize_density_to: self.normalize_density_to.unwrap_or(0.0),
            inter_frame_delay: Duration::from_millis(
                self.inter_frame_delay_ms
                    .unwrap_or(DEFAULT_INTER_FRAME_DELAY_MS),
            ),
            position_scaling_factor: self
                .position_scaling_factor
                .unwrap_or(DEFAULT_POSITION_SCALING_FACTOR),
            atom_radius: self.atom_radius.unwrap_or(DEFAULT_ATOM_RADIUS),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter,
        reason: reason.into(),
    }
}

fn validate(config: &StreamConfig) -> Result<(), ConfigError> {
    let source = &config.source;
    if source.first_index >= source.last_index_exclusive {
        return Err(invalid(
            "last_index_exclusive",
            format!(
                "must be greater than first_index ({} >= {})",
                source.first_index, source.last_index_exclusive
            ),
        ));
    }
    if source.index_digit_width == 0 {
        return Err(invalid("index_digit_width", "must be at least 1"));
    }
    if !config.normalize_density_to.is_finite() || config.normalize_density_to < 0.0 {
        return Err(invalid(
            "normalize_density_to",
            format!("must be a finite, non-negative number (got {})", config.normalize_density_to),
        ));
    }
    if !config.position_scaling_factor.is_finite() || config.position_scaling_factor <= 0.0 {
        return Err(invalid(
            "position_scaling_factor",
            format!("must be positive (got {})", config.position_scaling_factor),
        ));
    }
    if !config.atom_radius.is_finite() || config.atom_radius < 0.0 {
        return Err(invalid("atom_radius", "must be a finite, non-negative number"));
    }
    if config.retention.purge_batch_size == 0 {
        return Err(invalid(
            "purge_batch_size",
            "must purge at least one timepoint per frame to bound the buffer",
        ));
    }
    if config.retention.purge_keep_minimum == 0 {
        return Err(invalid(
            "purge_keep_minimum",
            "must keep at least one timepoint for the renderer",
        ));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileStreamConfig {
    base_dir: Option<PathBuf>,
    file_prefix: Option<String>,
    file_extension: Option<String>,
    index_digit_width: Option<usize>,
    first_index: Option<u64>,
    last_index_exclusive: Option<u64>,
    cube_dialect: Option<Dialect>,
    skew_policy: Option<SkewPolicy>,
    normalize_density_to: Option<f64>,
    inter_frame_delay_ms: Option<u64>,
    purge_batch_size: Option<usize>,
    purge_keep_minimum: Option<usize>,
    position_scaling_factor: Option<f64>,
    atom_radius: Option<f64>,
}

impl FileStreamConfig {
    fn into_builder(self) -> StreamConfigBuilder {
        StreamConfigBuilder {
            base_dir: self.base_dir,
            file_prefix: self.file_prefix,
            file_extension: self.file_extension,
            index_digit_width: self.index_digit_width,
            first_index: self.first_index,
            last_index_exclusive: self.last_index_exclusive,
            cube_dialect: self.cube_dialect,
            skew_policy: self.skew_policy,
            normalize_density_to: self.normalize_density_to,
            inter_frame_delay_ms: self.inter_frame_delay_ms,
            purge_batch_size: self.purge_batch_size,
            purge_keep_minimum: self.purge_keep_minimum,
            position_scaling_factor: self.position_scaling_factor,
            atom_radius: self.atom_radius,
        }
    }
}
