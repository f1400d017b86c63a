//! Author-facing post operations on top of a [`PostStore`].

use crate::doc::Document;
use crate::error::{FolioError, SlugError, StoreError};
use crate::post::{self, Post, now_unix};
use crate::store::PostStore;

/// Load `id`, creating and persisting a fresh draft when it does not exist yet.
pub async fn open_or_create<S: PostStore + ?Sized>(store: &S, id: &str) -> Result<Post, StoreError> {
    if let Some(existing) = store.get(id).await? {
        return Ok(existing);
    }
    let draft = Post::new_draft(id, now_unix());
    store.put(&draft).await?;
    tracing::info!(id, "created draft post");
    Ok(draft)
}

async fn load<S: PostStore + ?Sized>(store: &S, id: &str) -> Result<Post, StoreError> {
    store
        .get(id)
        .await?
        .ok_or_else(|| StoreError::Missing { id: id.into() })
}

/// Replace a post's body. The title invariant is repaired before the write.
pub async fn save_content<S: PostStore + ?Sized>(
    store: &S,
    id: &str,
    content: Document,
) -> Result<Post, StoreError> {
    let mut post = load(store, id).await?;
    post.set_content(content, now_unix());
    store.put(&post).await?;
    Ok(post)
}

pub async fn publish<S: PostStore + ?Sized>(store: &S, id: &str) -> Result<Post, StoreError> {
    let mut post = load(store, id).await?;
    post.publish(now_unix());
    store.put(&post).await?;
    tracing::info!(id, "published post");
    Ok(post)
}

pub async fn unpublish<S: PostStore + ?Sized>(store: &S, id: &str) -> Result<Post, StoreError> {
    let mut post = load(store, id).await?;
    post.unpublish(now_unix());
    store.put(&post).await?;
    tracing::info!(id, "unpublished post");
    Ok(post)
}

/// Change the slug of `id`. The slug must be well-formed and not used by another post.
pub async fn change_slug<S: PostStore + ?Sized>(
    store: &S,
    id: &str,
    slug: &str,
) -> Result<Post, FolioError> {
    post::validate_slug_format(slug)?;
    if let Some(owner) = store.get_by_slug(slug).await? {
        if owner.id != id {
            return Err(SlugError::Taken {
                slug: slug.into(),
                owner: owner.id,
            }
            .into());
        }
    }
    let mut post = load(store, id).await?;
    post.slug = slug.into();
    post.metadata.last_modified_at = now_unix();
    store.put(&post).await?;
    Ok(post)
}

/// Published posts, newest first.
pub async fn published_posts<S: PostStore + ?Sized>(store: &S) -> Result<Vec<Post>, StoreError> {
    listing(store, false).await
}

/// Posts for an index page, newest first. Drafts are included only when asked for.
pub async fn listing<S: PostStore + ?Sized>(
    store: &S,
    include_drafts: bool,
) -> Result<Vec<Post>, StoreError> {
    let mut posts = store.list_all().await?;
    if !include_drafts {
        posts.retain(Post::is_published);
    }
    post::sort_by_date(&mut posts);
    Ok(posts)
}
