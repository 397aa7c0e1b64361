use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::MediaType;

const FEED_BASE: &str = "https://raw.githubusercontent.com/saxdyo/FWWidgets/main/data";
const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

pub const DEFAULT_OUTPUT: &str = "data/TMDB_Trending.json";

/// How a source is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Pre-processed JSON feed, fetched as-is.
    #[default]
    Feed,
    /// TMDB v3 endpoint; `api_key` and `language` are appended to the query.
    Tmdb,
}

/// One upstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// Media type assumed for records that do not state their own.
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

impl SourceConfig {
    pub fn feed(name: &str, url: String, media_type: Option<MediaType>) -> Self {
        Self {
            name: name.to_string(),
            url,
            kind: SourceKind::Feed,
            media_type,
        }
    }

    pub fn tmdb(name: &str, path: &str, media_type: Option<MediaType>) -> Self {
        Self {
            name: name.to_string(),
            url: format!("{TMDB_API_BASE}{path}"),
            kind: SourceKind::Tmdb,
            media_type,
        }
    }
}

/// Take at most `cap` records from a named source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTake {
    pub source: String,
    pub cap: usize,
}

/// One output bucket: sources in priority order plus the global cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    pub max_items: usize,
    pub take: Vec<SourceTake>,
}

impl BucketConfig {
    fn new(name: &str, max_items: usize, take: &[(&str, usize)]) -> Self {
        Self {
            name: name.to_string(),
            max_items,
            take: take
                .iter()
                .map(|(source, cap)| SourceTake {
                    source: (*source).to_string(),
                    cap: *cap,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub api_key: Option<String>,
    pub language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            api_key: None,
            language: "zh-CN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub base_url: String,
    pub size: String,
    /// Image-compositing endpoint; when set, `title_backdrop` points at it.
    pub overlay_endpoint: Option<String>,
    pub overlay_size: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://image.tmdb.org/t/p".to_string(),
            size: "original".to_string(),
            overlay_endpoint: None,
            overlay_size: "w1280".to_string(),
        }
    }
}

/// Placeholders used when an upstream record lacks a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefaults {
    pub title: String,
    pub overview: String,
    pub year: i32,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            title: "未知标题".to_string(),
            overview: "暂无简介".to_string(),
            year: 2025,
        }
    }
}

/// Built-in source lists and bucket mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Pre-processed trending/movies/TV feeds.
    #[default]
    Feeds,
    /// TMDB v3 API trending and popular endpoints.
    Tmdb,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feeds => "feeds",
            Self::Tmdb => "tmdb",
        }
    }

    pub fn sources(self) -> Vec<SourceConfig> {
        match self {
            Self::Feeds => vec![
                SourceConfig::feed(
                    "trending",
                    format!("{FEED_BASE}/tmdb-backdrops-trending.json"),
                    None,
                ),
                SourceConfig::feed(
                    "movies",
                    format!("{FEED_BASE}/tmdb-backdrops-movies.json"),
                    Some(MediaType::Movie),
                ),
                SourceConfig::feed(
                    "tv",
                    format!("{FEED_BASE}/tmdb-backdrops-tv.json"),
                    Some(MediaType::Tv),
                ),
            ],
            Self::Tmdb => vec![
                SourceConfig::tmdb("trending_day", "/trending/all/day", None),
                SourceConfig::tmdb("trending_week", "/trending/all/week", None),
                SourceConfig::tmdb(
                    "popular_movies",
                    "/movie/popular?region=CN",
                    Some(MediaType::Movie),
                ),
                SourceConfig::tmdb("popular_tv", "/tv/popular", Some(MediaType::Tv)),
            ],
        }
    }

    pub fn buckets(self) -> Vec<BucketConfig> {
        match self {
            Self::Feeds => {
                let mixed = [("trending", 8), ("movies", 6), ("tv", 6)];
                vec![
                    BucketConfig::new("today_global", 20, &mixed),
                    BucketConfig::new("week_global_all", 20, &mixed),
                    BucketConfig::new("popular_movies", 20, &[("movies", 20)]),
                    BucketConfig::new("popular_tvshows", 20, &[("tv", 20)]),
                ]
            }
            Self::Tmdb => vec![
                BucketConfig::new("today_global", 15, &[("trending_day", 15)]),
                BucketConfig::new("week_global_all", 15, &[("trending_week", 15)]),
                BucketConfig::new("popular_movies", 15, &[("popular_movies", 15)]),
                BucketConfig::new("popular_tvshows", 15, &[("popular_tv", 15)]),
            ],
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feeds" => Ok(Self::Feeds),
            "tmdb" => Ok(Self::Tmdb),
            other => Err(format!("unknown profile `{other}` (expected feeds or tmdb)")),
        }
    }
}

/// Everything one pipeline run needs. Each stage takes its own section.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub output: PathBuf,
    /// Fixed offset from UTC used to render `last_updated`.
    pub utc_offset_hours: i32,
    pub fetch: FetchConfig,
    pub images: ImageConfig,
    pub defaults: RecordDefaults,
    pub sources: Vec<SourceConfig>,
    pub buckets: Vec<BucketConfig>,
}

impl PipelineConfig {
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            utc_offset_hours: 0,
            fetch: FetchConfig::default(),
            images: ImageConfig::default(),
            defaults: RecordDefaults::default(),
            sources: profile.sources(),
            buckets: profile.buckets(),
        }
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Sources referenced by at least one bucket, in declaration order.
    pub fn referenced_sources(&self) -> Vec<&SourceConfig> {
        self.sources
            .iter()
            .filter(|s| {
                self.buckets
                    .iter()
                    .any(|b| b.take.iter().any(|t| t.source == s.name))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.output.as_os_str().is_empty() {
            return Err(PipelineError::Config("output path is empty".into()));
        }
        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(PipelineError::Config(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(PipelineError::Config("timeout_secs must be positive".into()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            if source.url.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "source {} has an empty url",
                    source.name
                )));
            }
        }

        if self.buckets.is_empty() {
            return Err(PipelineError::Config("no buckets configured".into()));
        }
        let mut bucket_names = HashSet::new();
        for bucket in &self.buckets {
            if bucket.name == crate::types::LAST_UPDATED_KEY || !bucket_names.insert(&bucket.name)
            {
                return Err(PipelineError::Config(format!(
                    "invalid or duplicate bucket name: {}",
                    bucket.name
                )));
            }
            if bucket.max_items == 0 {
                return Err(PipelineError::Config(format!(
                    "bucket {} has max_items = 0",
                    bucket.name
                )));
            }
            for take in &bucket.take {
                if !names.contains(take.source.as_str()) {
                    return Err(PipelineError::Config(format!(
                        "bucket {} references unknown source {}",
                        bucket.name, take.source
                    )));
                }
                if take.cap == 0 {
                    return Err(PipelineError::Config(format!(
                        "bucket {} takes 0 items from {}",
                        bucket.name, take.source
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_validate() {
        PipelineConfig::for_profile(Profile::Feeds).validate().unwrap();
        PipelineConfig::for_profile(Profile::Tmdb).validate().unwrap();
    }

    #[test]
    fn feeds_profile_mixes_eight_six_six() {
        let buckets = Profile::Feeds.buckets();
        let today = &buckets[0];
        assert_eq!(today.name, "today_global");
        assert_eq!(today.max_items, 20);
        let caps: Vec<(&str, usize)> = today
            .take
            .iter()
            .map(|t| (t.source.as_str(), t.cap))
            .collect();
        assert_eq!(caps, vec![("trending", 8), ("movies", 6), ("tv", 6)]);
    }

    #[test]
    fn unknown_source_reference_is_rejected() {
        let mut config = PipelineConfig::default();
        config.buckets[0].take.push(SourceTake {
            source: "nope".into(),
            cap: 3,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown source nope"));
    }

    #[test]
    fn last_updated_is_not_a_bucket_name() {
        let mut config = PipelineConfig::default();
        config.buckets[0].name = "last_updated".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn referenced_sources_skips_unused() {
        let mut config = PipelineConfig::default();
        config.sources.push(SourceConfig::feed(
            "unused",
            "http://localhost/x.json".into(),
            None,
        ));
        let names: Vec<&str> = config
            .referenced_sources()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["trending", "movies", "tv"]);
    }
}
