//! Posts and their persisted record format.
//!
//! Records are versioned. Version 2 stores timestamps as integer Unix seconds. Records with no
//! `version` field are version 1, which stored ISO-8601 strings; they are migrated on read and
//! always written back as version 2.

use std::cmp::Reverse;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::doc::Document;
use crate::error::{RecordError, SlugError, ValidationError};
use crate::schema;

/// Current persisted record version.
pub const RECORD_VERSION: u32 = 2;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid slug regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    /// Unix seconds; `None` while the post is a draft.
    pub published_at: Option<i64>,
    /// Unix seconds.
    pub last_modified_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: SmolStr,
    pub slug: SmolStr,
    pub content: Document,
    pub metadata: PostMetadata,
}

/// Current time in Unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

impl Post {
    /// A fresh draft: empty title, slug equal to the id, unpublished.
    pub fn new_draft(id: impl Into<SmolStr>, now: i64) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            id,
            content: Document::with_empty_title(),
            metadata: PostMetadata {
                published_at: None,
                last_modified_at: now,
            },
        }
    }

    pub fn is_published(&self) -> bool {
        self.metadata.published_at.is_some()
    }

    pub fn title(&self) -> String {
        crate::title::extract_title(&self.content)
    }

    /// Listing order key: publication time for published posts, last edit for drafts.
    pub fn sort_time(&self) -> i64 {
        self.metadata
            .published_at
            .unwrap_or(self.metadata.last_modified_at)
    }

    /// Replace the body, repairing the title invariant, and bump the modification time.
    pub fn set_content(&mut self, content: Document, now: i64) {
        self.content = schema::enforce_invariant(content);
        self.metadata.last_modified_at = now;
    }

    pub fn publish(&mut self, now: i64) {
        self.metadata.published_at = Some(now);
        self.metadata.last_modified_at = now;
    }

    pub fn unpublish(&mut self, now: i64) {
        self.metadata.published_at = None;
        self.metadata.last_modified_at = now;
    }

    /// Checks applied before any write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.id)?;
        if self.slug.is_empty() {
            return Err(ValidationError::EmptySlug);
        }
        if !schema::validate(&self.content) {
            return Err(ValidationError::MissingTitle);
        }
        Ok(())
    }

    /// Encode as a pretty-printed version-2 record with object keys sorted.
    pub fn to_record_json(&self) -> Result<String, serde_json::Error> {
        let record = RecordOut {
            version: RECORD_VERSION,
            id: &self.id,
            slug: &self.slug,
            content: &self.content,
            metadata: &self.metadata,
        };
        // Going through `Value` sorts keys, since its map is ordered by key.
        let value = serde_json::to_value(record)?;
        serde_json::to_string_pretty(&value)
    }

    /// Decode a record of any supported version.
    pub fn from_record_json(bytes: &[u8]) -> Result<DecodedPost, RecordError> {
        let record: RecordIn = serde_json::from_slice(bytes)?;
        let (metadata, migrated_from) = match record.version {
            None | Some(1) => (legacy_metadata(record.metadata)?, Some(1)),
            Some(RECORD_VERSION) => (serde_json::from_value(record.metadata)?, None),
            Some(version) => return Err(ValidationError::UnsupportedVersion { version }.into()),
        };
        Ok(DecodedPost {
            post: Post {
                id: record.id,
                slug: record.slug,
                content: record.content,
                metadata,
            },
            migrated_from,
        })
    }
}

/// A post read back from storage, with the record version it was migrated from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPost {
    pub post: Post,
    pub migrated_from: Option<u32>,
}

#[derive(Serialize)]
struct RecordOut<'a> {
    version: u32,
    id: &'a str,
    slug: &'a str,
    content: &'a Document,
    metadata: &'a PostMetadata,
}

#[derive(Deserialize)]
struct RecordIn {
    #[serde(default)]
    version: Option<u32>,
    id: SmolStr,
    slug: SmolStr,
    content: Document,
    metadata: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMetadata {
    #[serde(default)]
    published_at: Option<String>,
    last_modified_at: String,
}

fn legacy_metadata(value: Value) -> Result<PostMetadata, RecordError> {
    let legacy: LegacyMetadata = serde_json::from_value(value)?;
    let published_at = legacy
        .published_at
        .as_deref()
        .map(parse_iso_seconds)
        .transpose()?;
    Ok(PostMetadata {
        published_at,
        last_modified_at: parse_iso_seconds(&legacy.last_modified_at)?,
    })
}

fn parse_iso_seconds(value: &str) -> Result<i64, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .map_err(|_| ValidationError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Ids double as file names, so they must be non-empty and path-safe.
pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if id.starts_with('.') || id.contains(['/', '\\', '\0']) {
        return Err(ValidationError::InvalidId { id: id.into() });
    }
    Ok(())
}

pub fn validate_slug_format(slug: &str) -> Result<(), SlugError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(SlugError::InvalidFormat { slug: slug.into() })
    }
}

/// Sort posts newest first by [`Post::sort_time`].
pub fn sort_by_date(posts: &mut [Post]) {
    posts.sort_by_key(|p| Reverse(p.sort_time()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Node;
    use serde_json::json;

    #[test]
    fn record_keys_are_sorted_and_versioned() {
        let post = Post::new_draft("hello", 1_700_000_000);
        let json = post.to_record_json().unwrap();
        let content = json.find("\"content\"").unwrap();
        let id = json.find("\"id\"").unwrap();
        let metadata = json.find("\"metadata\"").unwrap();
        let slug = json.find("\"slug\"").unwrap();
        let version = json.find("\"version\"").unwrap();
        assert!(content < id && id < metadata && metadata < slug && slug < version);
        assert!(json.contains("\"lastModifiedAt\": 1700000000"));

        let decoded = Post::from_record_json(json.as_bytes()).unwrap();
        assert_eq!(decoded.post, post);
        assert_eq!(decoded.migrated_from, None);
    }

    #[test]
    fn legacy_iso_timestamps_are_migrated() {
        let legacy = json!({
            "id": "old",
            "slug": "old-post",
            "content": {"type": "doc", "content": [{"type": "heading", "attrs": {"level": 1}}]},
            "metadata": {"publishedAt": "2024-01-02T03:04:05Z", "lastModifiedAt": "2024-01-02T03:04:05.000Z"}
        });
        let decoded = Post::from_record_json(legacy.to_string().as_bytes()).unwrap();
        assert_eq!(decoded.migrated_from, Some(1));
        assert_eq!(decoded.post.metadata.published_at, Some(1_704_164_645));
        assert_eq!(decoded.post.metadata.last_modified_at, 1_704_164_645);
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let record = json!({
            "version": 9,
            "id": "x", "slug": "x",
            "content": {"type": "doc", "content": []},
            "metadata": {"publishedAt": null, "lastModifiedAt": 1}
        });
        let err = Post::from_record_json(record.to_string().as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Invalid(ValidationError::UnsupportedVersion { version: 9 })
        ));
    }

    #[test]
    fn validation_catches_bad_posts() {
        let mut post = Post::new_draft("ok", 0);
        assert_eq!(post.validate(), Ok(()));
        post.content = Document::new(vec![Node::paragraph(vec![])]);
        assert_eq!(post.validate(), Err(ValidationError::MissingTitle));
        let post = Post::new_draft("../etc", 0);
        assert!(matches!(post.validate(), Err(ValidationError::InvalidId { .. })));
    }

    #[test]
    fn slug_format() {
        assert!(validate_slug_format("my-post_2").is_ok());
        assert!(validate_slug_format("").is_err());
        assert!(validate_slug_format("has space").is_err());
        assert!(validate_slug_format("ünïcode").is_err());
    }

    #[test]
    fn lifecycle_updates_timestamps_and_sorting() {
        let mut a = Post::new_draft("a", 10);
        let mut b = Post::new_draft("b", 20);
        let c = Post::new_draft("c", 15);
        a.publish(30);
        assert!(a.is_published());
        b.set_content(Document::default(), 25);
        assert!(schema::validate(&b.content));

        let mut posts = vec![c.clone(), b.clone(), a.clone()];
        sort_by_date(&mut posts);
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        a.unpublish(40);
        assert_eq!(a.metadata.published_at, None);
        assert_eq!(a.metadata.last_modified_at, 40);
    }
}
