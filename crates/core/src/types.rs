use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Media kind carried in the `type` field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
    Anime,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
            Self::Anime => "anime",
        }
    }

    /// Parse an upstream media type string. Unknown kinds (e.g. `person`) yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            "anime" => Some(Self::Anime),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized media item, serialized with the field names the widget host reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(rename = "genreTitle")]
    pub genre_label: String,
    pub rating: f64,
    pub release_date: String,
    pub overview: String,
    pub poster_url: Option<String>,
    #[serde(rename = "title_backdrop")]
    pub backdrop_url: Option<String>,
    pub popularity: f64,
    pub vote_count: u64,
}

/// A named, ordered list of records inside an [`OutputDocument`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub records: Vec<CanonicalRecord>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, records: Vec<CanonicalRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

pub const LAST_UPDATED_KEY: &str = "last_updated";

/// The document written to disk: `last_updated` followed by one key per bucket.
///
/// Serialized as a flat JSON object whose bucket keys keep their configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    pub last_updated: String,
    pub buckets: Vec<Bucket>,
}

impl OutputDocument {
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.name == name)
    }

    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(|b| b.records.len()).sum()
    }
}

impl Serialize for OutputDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len() + 1))?;
        map.serialize_entry(LAST_UPDATED_KEY, &self.last_updated)?;
        for bucket in &self.buckets {
            map.serialize_entry(&bucket.name, &bucket.records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OutputDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = OutputDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object with `last_updated` and record buckets")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut last_updated: Option<String> = None;
                let mut buckets = Vec::new();

                while let Some(key) = access.next_key::<String>()? {
                    if key == LAST_UPDATED_KEY {
                        if last_updated.is_some() {
                            return Err(de::Error::duplicate_field(LAST_UPDATED_KEY));
                        }
                        last_updated = Some(access.next_value()?);
                    } else {
                        let records = access.next_value()?;
                        buckets.push(Bucket { name: key, records });
                    }
                }

                let last_updated =
                    last_updated.ok_or_else(|| de::Error::missing_field(LAST_UPDATED_KEY))?;
                Ok(OutputDocument {
                    last_updated,
                    buckets,
                })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CanonicalRecord {
        CanonicalRecord {
            id: 980477,
            title: "哪吒之魔童闹海".into(),
            media_type: MediaType::Movie,
            genre_label: "电影•现代•高分".into(),
            rating: 8.1,
            release_date: "2025-01-29".into(),
            overview: "天劫之后".into(),
            poster_url: Some("https://image.tmdb.org/t/p/original/72pE.jpg".into()),
            backdrop_url: None,
            popularity: 1500.0,
            vote_count: 1250,
        }
    }

    #[test]
    fn record_uses_widget_field_names() {
        let value = serde_json::to_value(sample_record()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "genreTitle",
                "id",
                "overview",
                "popularity",
                "poster_url",
                "rating",
                "release_date",
                "title",
                "title_backdrop",
                "type",
                "vote_count",
            ]
        );
        assert_eq!(value["type"], "movie");
        assert!(value["title_backdrop"].is_null());
    }

    #[test]
    fn document_keeps_bucket_order() {
        let doc = OutputDocument {
            last_updated: "2025-01-01 12:00:00".into(),
            buckets: vec![
                Bucket::new("today_global", vec![sample_record()]),
                Bucket::new("popular_movies", vec![]),
            ],
        };

        let json = serde_json::to_string(&doc).unwrap();
        let last = json.find("last_updated").unwrap();
        let today = json.find("today_global").unwrap();
        let movies = json.find("popular_movies").unwrap();
        assert!(last < today && today < movies);

        let parsed: OutputDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn document_requires_last_updated() {
        let err = serde_json::from_str::<OutputDocument>(r#"{"today_global": []}"#).unwrap_err();
        assert!(err.to_string().contains("last_updated"));
    }

    #[test]
    fn media_type_parse_ignores_case_and_unknown_kinds() {
        assert_eq!(MediaType::parse("TV"), Some(MediaType::Tv));
        assert_eq!(MediaType::parse(" anime "), Some(MediaType::Anime));
        assert_eq!(MediaType::parse("person"), None);
    }
}
