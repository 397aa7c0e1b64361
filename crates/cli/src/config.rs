//! Configuration loading.
//!
//! Precedence, lowest first: built-in profile, TOML file, environment,
//! command-line flags. Environment variables reach us through clap's `env`
//! support, so they arrive here as [`Overrides`] alongside the flags.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::info;
use trendfeed_core::PipelineConfig;
use trendfeed_core::config::{BucketConfig, Profile, SourceConfig};
use trendfeed_metadata::normalize::Normalizer;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "trendfeed.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub profile: Option<Profile>,
    pub output: Option<PathBuf>,
    pub utc_offset_hours: Option<i32>,
    pub fetch: FetchSection,
    pub tmdb: TmdbSection,
    pub images: ImagesSection,
    pub defaults: DefaultsSection,
    /// Replaces the profile's sources entirely.
    pub sources: Option<Vec<SourceConfig>>,
    /// Replaces the profile's buckets entirely.
    pub buckets: Option<Vec<BucketConfig>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TmdbSection {
    pub api_key: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesSection {
    pub base_url: Option<String>,
    pub size: Option<String>,
    pub overlay_endpoint: Option<String>,
    pub overlay_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsSection {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub year: Option<i32>,
}

/// Values from flags or environment variables.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub profile: Option<Profile>,
    pub output: Option<PathBuf>,
    pub utc_offset_hours: Option<i32>,
    pub tmdb_api_key: Option<String>,
}

impl FileConfig {
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }
}

/// Resolve the configuration for one invocation.
///
/// An explicit `path` must exist; otherwise `trendfeed.toml` is used when
/// present and the built-in profile when not.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<PipelineConfig> {
    let file = match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfig::load_from_path(path)?
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!(path = DEFAULT_CONFIG_FILE, "loading config");
            FileConfig::load_from_path(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => FileConfig::default(),
    };

    let config = resolve(file, overrides);
    config.validate().context("invalid configuration")?;
    Normalizer::new(config.images.clone(), config.defaults.clone())
        .context("invalid image configuration")?;
    Ok(config)
}

/// Layer file values and overrides over the selected profile.
pub fn resolve(file: FileConfig, overrides: &Overrides) -> PipelineConfig {
    let profile = overrides.profile.or(file.profile).unwrap_or_default();
    let mut config = PipelineConfig::for_profile(profile);

    if let Some(output) = file.output {
        config.output = output;
    }
    if let Some(hours) = file.utc_offset_hours {
        config.utc_offset_hours = hours;
    }
    if let Some(secs) = file.fetch.timeout_secs {
        config.fetch.timeout_secs = secs;
    }
    if let Some(key) = file.tmdb.api_key {
        config.fetch.api_key = Some(key);
    }
    if let Some(language) = file.tmdb.language {
        config.fetch.language = language;
    }
    if let Some(base_url) = file.images.base_url {
        config.images.base_url = base_url;
    }
    if let Some(size) = file.images.size {
        config.images.size = size;
    }
    if file.images.overlay_endpoint.is_some() {
        config.images.overlay_endpoint = file.images.overlay_endpoint;
    }
    if let Some(size) = file.images.overlay_size {
        config.images.overlay_size = size;
    }
    if let Some(title) = file.defaults.title {
        config.defaults.title = title;
    }
    if let Some(overview) = file.defaults.overview {
        config.defaults.overview = overview;
    }
    if let Some(year) = file.defaults.year {
        config.defaults.year = year;
    }
    if let Some(sources) = file.sources {
        config.sources = sources;
    }
    if let Some(buckets) = file.buckets {
        config.buckets = buckets;
    }

    if let Some(output) = &overrides.output {
        config.output = output.clone();
    }
    if let Some(hours) = overrides.utc_offset_hours {
        config.utc_offset_hours = hours;
    }
    if let Some(key) = &overrides.tmdb_api_key {
        config.fetch.api_key = Some(key.clone());
    }

    config
}
