use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use folio_common::doc::{Document, Node};
use folio_common::error::StoreError;
use folio_common::lifecycle;
use folio_common::post::Post;
use folio_common::store::{MemoryPostStore, PostStore};
use folio_editor_core::{Autosaver, EditOp, PostEditor, SaveStatus};
use tokio::time::sleep;

const QUIET: Duration = Duration::from_secs(1);

/// Counts writes and can be told to reject them.
#[derive(Default)]
struct CountingStore {
    inner: MemoryPostStore,
    puts: AtomicUsize,
    fail_next: AtomicUsize,
}

#[async_trait]
impl PostStore for CountingStore {
    async fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        self.inner.get(id).await
    }

    async fn list_all(&self) -> Result<Vec<Post>, StoreError> {
        self.inner.list_all().await
    }

    async fn put(&self, post: &Post) -> Result<(), StoreError> {
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Write {
                path: "posts/draft.json".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(post).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

async fn setup() -> (Arc<CountingStore>, PostEditor, Autosaver) {
    let store = Arc::new(CountingStore::default());
    let post = lifecycle::open_or_create(&*store, "draft").await.unwrap();
    store.puts.store(0, Ordering::SeqCst);

    let mut editor = PostEditor::new(post.content);
    let saver = Autosaver::spawn(store.clone(), "draft", QUIET);
    editor.on_change(saver.listener());
    (store, editor, saver)
}

async fn saved_title(store: &CountingStore) -> String {
    store.get("draft").await.unwrap().unwrap().title()
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_are_saved_once() {
    let (store, mut editor, saver) = setup().await;

    for (i, ch) in "abc".chars().enumerate() {
        editor
            .apply_edit(EditOp::InsertText {
                pos: 1 + i,
                text: ch.to_string(),
            })
            .unwrap();
        sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(store.puts.load(Ordering::SeqCst), 0);

    sleep(QUIET + Duration::from_millis(100)).await;
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    assert_eq!(saved_title(&store).await, "abc");
    assert!(matches!(saver.status(), SaveStatus::Saved { .. }));

    // Nothing new, nothing written.
    sleep(QUIET * 3).await;
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_saves_keep_the_content_for_retry() {
    let (store, mut editor, saver) = setup().await;
    store.fail_next.store(1, Ordering::SeqCst);
    let mut status = saver.subscribe();

    editor
        .apply_edit(EditOp::InsertText {
            pos: 1,
            text: "Kept".into(),
        })
        .unwrap();
    status
        .wait_for(|s| matches!(s, SaveStatus::Failed { .. }))
        .await
        .unwrap();
    assert_eq!(saved_title(&store).await, "");
    assert_eq!(editor.document().text_content(), "Kept");

    saver.retry();
    status
        .wait_for(|s| matches!(s, SaveStatus::Saved { .. }))
        .await
        .unwrap();
    assert_eq!(saved_title(&store).await, "Kept");
}

#[tokio::test(start_paused = true)]
async fn content_resets_are_not_saved_back() {
    let (store, mut editor, saver) = setup().await;
    editor.set_content(Document::new(vec![Node::heading(1, vec![Node::text("From disk")])]));
    sleep(QUIET * 2).await;
    assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    assert_eq!(saver.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn close_flushes_pending_changes() {
    let (store, mut editor, saver) = setup().await;
    editor
        .apply_edit(EditOp::InsertText {
            pos: 1,
            text: "Last words".into(),
        })
        .unwrap();
    saver.close().await;
    assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    assert_eq!(saved_title(&store).await, "Last words");
}
