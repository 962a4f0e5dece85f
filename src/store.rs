// Post collection - pure reducer plus an injectable container
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{Post, PostId};

/// The four mutations the post collection supports.
#[derive(Debug, Clone, PartialEq)]
pub enum PostAction {
    /// Discard everything and take the server's list verbatim.
    ReplaceAll(Vec<Post>),
    /// Append to the end. Duplicate ids are not checked.
    Insert(Post),
    /// Swap the record with the same id; no match is a no-op.
    Replace(Post),
    /// Drop the record with this id; no match is a no-op.
    Remove(PostId),
}

impl PostAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReplaceAll(_) => "ReplaceAll",
            Self::Insert(_) => "Insert",
            Self::Replace(_) => "Replace",
            Self::Remove(_) => "Remove",
        }
    }
}

/// Pure and total: never fails, no I/O.
pub fn reduce(mut posts: Vec<Post>, action: PostAction) -> Vec<Post> {
    match action {
        PostAction::ReplaceAll(next) => next,
        PostAction::Insert(post) => {
            posts.push(post);
            posts
        }
        PostAction::Replace(post) => posts
            .into_iter()
            .map(|existing| {
                if existing.id == post.id {
                    post.clone()
                } else {
                    existing
                }
            })
            .collect(),
        PostAction::Remove(id) => {
            posts.retain(|p| p.id != id);
            posts
        }
    }
}

/// Shared handle to the canonical post list. Cloning is cheap and every
/// clone sees the same collection.
#[derive(Debug, Clone)]
pub struct PostStore {
    tx: Arc<watch::Sender<Vec<Post>>>,
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostStore {
    pub fn new() -> Self {
        Self::with_posts(Vec::new())
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        let (tx, _rx) = watch::channel(posts);
        Self { tx: Arc::new(tx) }
    }

    pub fn apply(&self, action: PostAction) {
        tracing::debug!("Applying {} to post store", action.name());
        self.tx.send_modify(|posts| {
            let current = std::mem::take(posts);
            *posts = reduce(current, action);
        });
    }

    pub fn snapshot(&self) -> Vec<Post> {
        self.tx.borrow().clone()
    }

    pub fn find(&self, id: &PostId) -> Option<Post> {
        self.tx.borrow().iter().find(|p| &p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receiver that is notified after every applied action.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Post>> {
        self.tx.subscribe()
    }
}
