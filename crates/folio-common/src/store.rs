//! Post storage.
//!
//! [`PostStore`] is the contract the rest of the system persists posts through. Every write is
//! validated first and rejected as a whole; nothing is partially written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use smol_str::SmolStr;

use crate::error::{RecordError, StoreError};
use crate::post::{self, Post};

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Post>, StoreError>;

    /// Every readable post. Unreadable records are skipped.
    async fn list_all(&self) -> Result<Vec<Post>, StoreError>;

    /// Validate and persist `post`, replacing any previous version.
    async fn put(&self, post: &Post) -> Result<(), StoreError>;

    /// Remove a post. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|p| p.slug == slug))
    }
}

#[async_trait]
impl<S: PostStore + ?Sized> PostStore for std::sync::Arc<S> {
    async fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        (**self).get(id).await
    }

    async fn list_all(&self) -> Result<Vec<Post>, StoreError> {
        (**self).list_all().await
    }

    async fn put(&self, post: &Post) -> Result<(), StoreError> {
        (**self).put(post).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        (**self).get_by_slug(slug).await
    }
}

/// In-memory store, mostly for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: DashMap<SmolStr, Post>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(id).map(|p| p.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.posts.iter().map(|p| p.value().clone()).collect())
    }

    async fn put(&self, post: &Post) -> Result<(), StoreError> {
        post.validate()?;
        self.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.posts.remove(id).is_some())
    }
}

/// One pretty-printed JSON file per post, `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFilePostStore {
    dir: PathBuf,
}

impl JsonFilePostStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        let decoded = Post::from_record_json(&bytes).map_err(|source| StoreError::Corrupt {
            id: id.into(),
            source,
        })?;
        if let Some(version) = decoded.migrated_from {
            tracing::warn!(
                id,
                from = version,
                to = post::RECORD_VERSION,
                "migrated legacy post record; it will be rewritten on next save"
            );
        }
        Ok(Some(decoded.post))
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        let mut ids = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| StoreError::Read {
                path: self.dir.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_suffix(".json") {
                if !id.starts_with('.') {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl PostStore for JsonFilePostStore {
    async fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        if post::validate_id(id).is_err() {
            return Ok(None);
        }
        self.read(id).await
    }

    async fn list_all(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts = Vec::new();
        for id in self.ids().await? {
            match self.read(&id).await {
                Ok(Some(post)) => posts.push(post),
                Ok(None) => {}
                Err(StoreError::Corrupt { id, source }) => {
                    tracing::warn!(%id, error = %source, "skipping unreadable post");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(posts)
    }

    async fn put(&self, post: &Post) -> Result<(), StoreError> {
        post.validate()?;
        let json = post.to_record_json().map_err(|e| StoreError::Corrupt {
            id: post.id.clone(),
            source: RecordError::Json(e),
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Write {
                path: self.dir.clone(),
                source,
            })?;

        // Write to a sibling temp file and rename over the target so readers never see a torn file.
        let path = self.path_for(&post.id);
        let tmp = self.dir.join(format!(".{}.json.tmp", post.id));
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|source| StoreError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(id = %post.id, path = %path.display(), "post written");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if post::validate_id(id).is_err() {
            return Ok(false);
        }
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{Document, Node};
    use crate::error::ValidationError;

    #[tokio::test]
    async fn memory_store_rejects_invalid_posts() {
        let store = MemoryPostStore::new();
        let mut post = Post::new_draft("a", 1);
        post.content = Document::new(vec![Node::paragraph(vec![Node::text("no title")])]);
        let err = store.put(&post).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(ValidationError::MissingTitle)
        ));
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_finds_by_slug() {
        let store = MemoryPostStore::new();
        let mut post = Post::new_draft("a", 1);
        post.slug = "first".into();
        store.put(&post).await.unwrap();
        assert_eq!(store.get_by_slug("first").await.unwrap(), Some(post));
        assert_eq!(store.get_by_slug("a").await.unwrap(), None);
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
    }
}
