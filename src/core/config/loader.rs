#![allow(clippy::result_large_err)]

use super::GraphConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "pipegraph.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from an explicit file, or from `dir/pipegraph.toml` when none is given.
    /// Environment variables override config file values.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<GraphConfig, AppError> {
        match explicit {
            Some(path) => {
                let config = Self::load_from_file(path)?.ok_or_else(|| {
                    AppError::new(
                        ErrorCategory::ConfigError,
                        format!("config file {} does not exist", path.display()),
                    )
                    .with_code("RG-CFG-002")
                })?;
                Self::finish(config)
            }
            None => Self::load_from_dir(dir),
        }
    }

    /// Load config from `dir/pipegraph.toml`, falling back to defaults when absent.
    pub fn load_from_dir(dir: &Path) -> Result<GraphConfig, AppError> {
        let config = Self::load_from_file(&dir.join(CONFIG_FILE_NAME))?.unwrap_or_default();
        Self::finish(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<GraphConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: GraphConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("RG-CFG-001")
        })?;

        Ok(Some(config))
    }

    fn finish(mut config: GraphConfig) -> Result<GraphConfig, AppError> {
        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(config: &mut GraphConfig) {
        if let Ok(width) = env::var("PIPEGRAPH_NODE_WIDTH") {
            if let Ok(width) = width.parse::<u32>() {
                config.graph.node_width = width;
            }
        }

        if let Ok(height) = env::var("PIPEGRAPH_NODE_HEIGHT") {
            if let Ok(height) = height.parse::<u32>() {
                config.graph.node_height = height;
            }
        }

        if let Ok(color) = env::var("PIPEGRAPH_EXIT_HANDLER_COLOR") {
            config.graph.exit_handler_color = color;
        }

        if let Ok(variant) = env::var("PIPEGRAPH_PIPELINE_VARIANT") {
            match variant.parse() {
                Ok(variant) => config.graph.pipeline_variant = variant,
                Err(err) => tracing::warn!("ignoring PIPEGRAPH_PIPELINE_VARIANT: {}", err),
            }
        }

        if let Ok(prefix) = env::var("PIPEGRAPH_ANNOTATION_PREFIX") {
            config.artifacts.annotation_prefix = prefix;
        }

        if let Ok(label) = env::var("PIPEGRAPH_CACHE_LABEL") {
            config.artifacts.cache_label = label;
        }
    }

    fn validate(config: &GraphConfig) -> Result<(), AppError> {
        if config.graph.node_width == 0 || config.graph.node_height == 0 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "graph.node_width and graph.node_height must be positive",
            )
            .with_code("RG-CFG-003"));
        }
        if config.artifacts.annotation_prefix.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "artifacts.annotation_prefix must not be empty",
            )
            .with_code("RG-CFG-003"));
        }
        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "PIPEGRAPH_NODE_WIDTH - Override node width (default: 172)",
            "PIPEGRAPH_NODE_HEIGHT - Override node height (default: 64)",
            "PIPEGRAPH_EXIT_HANDLER_COLOR - Override exit handler node color (default: #fef7f0)",
            "PIPEGRAPH_PIPELINE_VARIANT - Pipeline variant, v1 or v2 (default: v1)",
            "PIPEGRAPH_ANNOTATION_PREFIX - Artifact annotation prefix (default: tekton.dev)",
            "PIPEGRAPH_CACHE_LABEL - Cache-enabled task label (default: pipelines.kubeflow.org/cache_enabled)",
        ]
    }
}
