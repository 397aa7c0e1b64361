//! Upstream record normalization.
//!
//! Upstream feeds disagree on field names (`title` vs `name`, `vote_average`
//! vs `rating`, `posterPath` vs `poster_path`, ...). Every canonical field is
//! resolved through an ordered list of candidate keys; the first present,
//! non-empty value wins and a fixed default covers the rest, so normalizing
//! a record never fails.

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;
use trendfeed_core::config::{ImageConfig, RecordDefaults, SourceConfig, SourceKind};
use trendfeed_core::{CanonicalRecord, MediaType};
use url::Url;

use crate::MetadataError;

const ID_KEYS: &[&str] = &["id"];
const TITLE_KEYS: &[&str] = &[
    "title",
    "name",
    "originalTitle",
    "original_title",
    "original_name",
    "t",
];
const MEDIA_TYPE_KEYS: &[&str] = &["mediaType", "media_type", "type", "mt"];
const RATING_KEYS: &[&str] = &["rating", "vote_average", "r"];
const RELEASE_DATE_KEYS: &[&str] = &["releaseDate", "release_date", "first_air_date", "rd"];
const YEAR_KEYS: &[&str] = &["releaseYear", "year", "y"];
const OVERVIEW_KEYS: &[&str] = &["overview", "o"];
const POSTER_KEYS: &[&str] = &["posterPath", "poster_path", "p"];
const BACKDROP_KEYS: &[&str] = &["backdropPath", "backdrop_path", "b"];
const POPULARITY_KEYS: &[&str] = &["popularity", "hs"];
const VOTE_COUNT_KEYS: &[&str] = &["voteCount", "vote_count"];

pub const GENRE_SEPARATOR: &str = "•";
const GENRE_MOVIE: &str = "电影";
const GENRE_TV: &str = "剧集";
const GENRE_ANIME: &str = "动画";
const GENRE_CONTEMPORARY: &str = "现代";
const GENRE_HIGH_RATED: &str = "高分";
const GENRE_RECOMMENDED: &str = "推荐";
const GENRE_FALLBACK: &str = "剧情";

const CONTEMPORARY_FROM_YEAR: i32 = 2020;
const HIGH_RATED_FROM: f64 = 8.0;
const RECOMMENDED_FROM: f64 = 7.0;

/// Synthesized ids stay in the same range the upstream feeds used for random ids.
const FALLBACK_ID_SPACE: u64 = 1_000_000;

/// Maps raw upstream records onto [`CanonicalRecord`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    images: ImageConfig,
    overlay: Option<Url>,
    defaults: RecordDefaults,
}

impl Normalizer {
    pub fn new(images: ImageConfig, defaults: RecordDefaults) -> Result<Self, MetadataError> {
        let overlay = images
            .overlay_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| {
                Url::parse(e).map_err(|err| MetadataError::InvalidOverlay(format!("{e}: {err}")))
            })
            .transpose()?;

        Ok(Self {
            images,
            overlay,
            defaults,
        })
    }

    /// Normalize the usable records of one source, preserving upstream order.
    pub fn normalize_all(&self, items: &[Value], source: &SourceConfig) -> Vec<CanonicalRecord> {
        let records: Vec<CanonicalRecord> = items
            .iter()
            .filter(|raw| is_usable(raw, source.kind))
            .map(|raw| self.normalize(raw, source.media_type))
            .collect();

        let dropped = items.len() - records.len();
        if dropped > 0 {
            debug!(dropped, kept = records.len(), "dropped unusable records");
        }
        records
    }

    /// Normalize one record. `source_type` applies when the record does not
    /// state its own media type.
    pub fn normalize(&self, raw: &Value, source_type: Option<MediaType>) -> CanonicalRecord {
        let declared = declared_media_type(raw).or(source_type);
        let media_type = declared.unwrap_or(MediaType::Movie);

        let title = first_str(raw, TITLE_KEYS)
            .unwrap_or(self.defaults.title.as_str())
            .to_string();
        let rating = first_number(raw, RATING_KEYS).unwrap_or(0.0).max(0.0);

        let upstream_date = first_str(raw, RELEASE_DATE_KEYS);
        let year = first_number(raw, YEAR_KEYS)
            .map(|y| y as i32)
            .or_else(|| upstream_date.and_then(year_prefix));
        let release_date = match upstream_date {
            Some(date) => date.to_string(),
            None => format!(
                "{:04}-01-01",
                year.filter(|y| (1000..=9999).contains(y))
                    .unwrap_or(self.defaults.year)
            ),
        };

        let id = first_number(raw, ID_KEYS)
            .filter(|id| *id >= 1.0)
            .map(|id| id as u64)
            .unwrap_or_else(|| {
                let id = fallback_id(&title, &release_date);
                debug!(title = %title, id, "record has no id, using content hash");
                id
            });

        let poster_url = first_str(raw, POSTER_KEYS)
            .and_then(|p| image_url(&self.images.base_url, &self.images.size, p));
        let backdrop_path = first_str(raw, BACKDROP_KEYS);
        let backdrop_url = match (&self.overlay, backdrop_path) {
            (Some(endpoint), Some(path)) => {
                let year = year.or_else(|| year_prefix(&release_date));
                self.overlay_url(endpoint, path, &title, year, rating, media_type)
            }
            (None, Some(path)) => image_url(&self.images.base_url, &self.images.size, path),
            (_, None) => None,
        };

        CanonicalRecord {
            id,
            genre_label: genre_label(declared, year, rating),
            title,
            media_type,
            rating,
            release_date,
            overview: first_str(raw, OVERVIEW_KEYS)
                .unwrap_or(self.defaults.overview.as_str())
                .to_string(),
            poster_url,
            backdrop_url,
            popularity: first_number(raw, POPULARITY_KEYS).unwrap_or(0.0).max(0.0),
            vote_count: first_number(raw, VOTE_COUNT_KEYS)
                .map(|n| n.max(0.0) as u64)
                .unwrap_or(0),
        }
    }

    /// URL of the compositing endpoint rendering `title`/`year`/`rating`
    /// over the backdrop.
    fn overlay_url(
        &self,
        endpoint: &Url,
        backdrop_path: &str,
        title: &str,
        year: Option<i32>,
        rating: f64,
        media_type: MediaType,
    ) -> Option<String> {
        let background =
            image_url(&self.images.base_url, &self.images.overlay_size, backdrop_path)?;
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair("bg", &background)
            .append_pair("title", title)
            .append_pair("year", &year.map(|y| y.to_string()).unwrap_or_default())
            .append_pair("rating", &format!("{rating:.1}"))
            .append_pair("type", media_type.as_str());
        Some(url.into())
    }
}

/// Whether a raw record is worth normalizing.
///
/// People (`media_type: person`) are dropped from every source. TMDB API
/// results are also dropped when they carry no rating, release date,
/// overview, poster or backdrop at all; feed records are kept and filled in
/// from defaults.
pub fn is_usable(raw: &Value, kind: SourceKind) -> bool {
    let is_person = MEDIA_TYPE_KEYS
        .iter()
        .filter_map(|k| raw.get(*k))
        .filter_map(Value::as_str)
        .any(|t| t.trim().eq_ignore_ascii_case("person"));
    if is_person {
        return false;
    }

    match kind {
        SourceKind::Feed => true,
        SourceKind::Tmdb => {
            first_number(raw, RATING_KEYS).is_some_and(|r| r > 0.0)
                || first_str(raw, RELEASE_DATE_KEYS).is_some()
                || first_str(raw, OVERVIEW_KEYS).is_some()
                || first_str(raw, POSTER_KEYS).is_some()
                || first_str(raw, BACKDROP_KEYS).is_some()
        }
    }
}

/// Genre label built from fixed tags, checked in this order:
/// media type, contemporary (year >= 2020), high-rated (>= 8.0) or
/// recommended (7.0..8.0). Falls back to `剧情` when no tag applies.
pub fn genre_label(declared: Option<MediaType>, year: Option<i32>, rating: f64) -> String {
    let mut tags: Vec<&str> = Vec::with_capacity(3);

    match declared {
        Some(MediaType::Movie) => tags.push(GENRE_MOVIE),
        Some(MediaType::Tv) => tags.push(GENRE_TV),
        Some(MediaType::Anime) => tags.push(GENRE_ANIME),
        None => {}
    }

    if year.is_some_and(|y| y >= CONTEMPORARY_FROM_YEAR) {
        tags.push(GENRE_CONTEMPORARY);
    }

    if rating >= HIGH_RATED_FROM {
        tags.push(GENRE_HIGH_RATED);
    } else if rating >= RECOMMENDED_FROM {
        tags.push(GENRE_RECOMMENDED);
    }

    if tags.is_empty() {
        GENRE_FALLBACK.to_string()
    } else {
        tags.join(GENRE_SEPARATOR)
    }
}

/// Join image host, size segment and path with exactly one slash between each.
/// Absolute URLs pass through untouched.
pub fn image_url(base: &str, size: &str, path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }

    Some(format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        size.trim_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// Deterministic id for records without one: same title and release date,
/// same id, on every run.
pub fn fallback_id(title: &str, release_date: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0x1f]);
    hasher.update(release_date.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % FALLBACK_ID_SPACE
}

fn declared_media_type(raw: &Value) -> Option<MediaType> {
    MEDIA_TYPE_KEYS
        .iter()
        .filter_map(|k| raw.get(*k))
        .filter_map(Value::as_str)
        .find_map(MediaType::parse)
}

fn first_str<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn first_number(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| raw.get(*k)).find_map(as_number)
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn year_prefix(date: &str) -> Option<i32> {
    let prefix = date.get(..4)?;
    if prefix.bytes().all(|b| b.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}
