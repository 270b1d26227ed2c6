use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use directories::ProjectDirs;
use serde::Deserialize;

use crate::aggregator::AggregatorConfig;
use crate::cli::{CliArgs, CliSources, ReappearanceArg, RectifyArg, StrategyArg};
use crate::extractor::ExtractorConfig;
use crate::geometry::GeometryConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    fps: Option<f64>,
    sample_rate: Option<f64>,
    confidence_threshold: Option<f32>,
    disappear_threshold: Option<u32>,
    similarity_threshold: Option<f64>,
    history_capacity: Option<usize>,
    strategy: Option<String>,
    reappearance: Option<String>,
    rectify: Option<String>,
    geometry: Option<GeometryFileConfig>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
struct GeometryFileConfig {
    center_ratio: Option<f32>,
    bottom_ratio: Option<f32>,
    min_width_ratio: Option<f32>,
    horizontal_ratio: Option<f32>,
    max_height_ratio: Option<f32>,
}

/// Fully merged runtime settings: CLI values win over the config file,
/// which wins over the built-in defaults.
#[derive(Debug)]
pub struct EffectiveSettings {
    pub fps: f64,
    pub extractor: ExtractorConfig,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let config = read_config(&path)?;
        return Ok((config, Some(path)));
    }

    if let Some(project_path) = project_config_path() {
        if project_path.exists() {
            let config = read_config(&project_path)?;
            return Ok((config, Some(project_path)));
        }
    }

    let Some(default_path) = default_config_path() else {
        return Ok((FileConfig::default(), None));
    };
    if !default_path.exists() {
        return Ok((FileConfig::default(), None));
    }
    let config = read_config(&default_path)?;
    Ok((config, Some(default_path)))
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let FileConfig {
        fps: file_fps,
        sample_rate: file_sample_rate,
        confidence_threshold: file_confidence,
        disappear_threshold: file_disappear,
        similarity_threshold: file_similarity,
        history_capacity: file_history,
        strategy: file_strategy,
        reappearance: file_reappearance,
        rectify: file_rectify,
        geometry: file_geometry,
    } = file;

    let fps = pick_positive_f64(
        cli.fps,
        sources.fps_from_cli,
        file_fps,
        "fps",
        config_path.as_ref(),
    )?;

    let sample_rate = pick_positive_f64(
        cli.sample_rate,
        sources.sample_rate_from_cli,
        file_sample_rate,
        "sample_rate",
        config_path.as_ref(),
    )?;

    let mut confidence_threshold = cli.confidence_threshold;
    if !sources.confidence_threshold_from_cli {
        if let Some(value) = file_confidence {
            confidence_threshold = value;
        }
    }
    if !(0.0..=1.0).contains(&confidence_threshold) {
        return Err(invalid(
            config_path,
            "confidence_threshold",
            confidence_threshold.to_string(),
        ));
    }

    let mut disappear_threshold = cli.disappear_threshold;
    if !sources.disappear_threshold_from_cli {
        if let Some(value) = file_disappear {
            if value < 1 {
                return Err(invalid(
                    config_path,
                    "disappear_threshold",
                    value.to_string(),
                ));
            }
            disappear_threshold = value;
        }
    }

    let mut similarity_threshold = cli.similarity_threshold;
    if !sources.similarity_threshold_from_cli {
        if let Some(value) = file_similarity {
            similarity_threshold = value;
        }
    }
    if !(0.0..=1.0).contains(&similarity_threshold) {
        return Err(invalid(
            config_path,
            "similarity_threshold",
            similarity_threshold.to_string(),
        ));
    }

    let mut history_capacity = cli.history_capacity;
    if !sources.history_capacity_from_cli {
        if let Some(value) = file_history {
            history_capacity = value;
        }
    }
    if history_capacity == 0 {
        return Err(invalid(
            config_path,
            "history_capacity",
            history_capacity.to_string(),
        ));
    }

    let mut strategy = cli.strategy;
    if !sources.strategy_from_cli {
        if let Some(value) = normalize_string(file_strategy) {
            strategy = parse_variant::<StrategyArg>(&value, "strategy", config_path.as_ref())?;
        }
    }

    let mut reappearance = cli.reappearance;
    if !sources.reappearance_from_cli {
        if let Some(value) = normalize_string(file_reappearance) {
            reappearance =
                parse_variant::<ReappearanceArg>(&value, "reappearance", config_path.as_ref())?;
        }
    }

    let mut rectify = cli.rectify;
    if !sources.rectify_from_cli {
        if let Some(value) = normalize_string(file_rectify) {
            rectify = parse_variant::<RectifyArg>(&value, "rectify", config_path.as_ref())?;
        }
    }

    let mut geometry = GeometryConfig::default();
    if let Some(section) = file_geometry {
        merge_geometry(&mut geometry, section, config_path.as_ref())?;
    }

    let extractor = ExtractorConfig {
        sample_rate,
        geometry,
        rectify_mode: rectify.to_mode(),
        aggregator: AggregatorConfig {
            confidence_threshold,
            disappear_threshold,
            similarity_threshold,
            history_capacity,
            strategy: strategy.to_strategy(),
            reappearance: reappearance.to_policy(),
        },
    };

    Ok(EffectiveSettings {
        fps,
        extractor,
        config_path,
    })
}

fn merge_geometry(
    geometry: &mut GeometryConfig,
    section: GeometryFileConfig,
    config_path: Option<&PathBuf>,
) -> Result<(), ConfigError> {
    let fields = [
        ("center_ratio", section.center_ratio),
        ("bottom_ratio", section.bottom_ratio),
        ("min_width_ratio", section.min_width_ratio),
        ("horizontal_ratio", section.horizontal_ratio),
        ("max_height_ratio", section.max_height_ratio),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(config_path.cloned(), field, value.to_string()));
            }
            match field {
                "center_ratio" => geometry.center_ratio = value,
                "bottom_ratio" => geometry.bottom_ratio = value,
                "min_width_ratio" => geometry.min_width_ratio = value,
                "horizontal_ratio" => geometry.horizontal_ratio = value,
                _ => geometry.max_height_ratio = value,
            }
        }
    }
    Ok(())
}

fn pick_positive_f64(
    cli_value: f64,
    from_cli: bool,
    file_value: Option<f64>,
    field: &'static str,
    config_path: Option<&PathBuf>,
) -> Result<f64, ConfigError> {
    let mut value = cli_value;
    let mut from_file = false;
    if !from_cli {
        if let Some(file_value) = file_value {
            value = file_value;
            from_file = true;
        }
    }
    if !value.is_finite() || value <= 0.0 {
        let path = if from_file {
            config_path.cloned()
        } else {
            None
        };
        return Err(ConfigError::InvalidValue {
            path,
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_variant<T: ValueEnum>(
    value: &str,
    field: &'static str,
    config_path: Option<&PathBuf>,
) -> Result<T, ConfigError> {
    T::from_str(value, false).map_err(|_| ConfigError::InvalidValue {
        path: config_path.cloned(),
        field,
        value: value.to_string(),
    })
}

fn invalid(path: Option<PathBuf>, field: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { path, field, value }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "subtitle-lift", "subtitle-lift")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join("config.toml"))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
