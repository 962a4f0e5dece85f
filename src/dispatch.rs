use std::sync::Arc;

use crate::api::MemoriesApi;
use crate::error::ApiResult;
use crate::models::{PostDraft, PostId};
use crate::store::{PostAction, PostStore};

/// Turns a user intent into one API call followed by at most one store
/// mutation. Nothing is applied ahead of the response, so a failure leaves
/// the store exactly as it was.
///
/// Failures are logged here and also returned; callers that only want the
/// baseline log-and-continue behaviour can ignore the result.
pub struct Dispatcher<A: ?Sized> {
    api: Arc<A>,
    store: PostStore,
}

impl<A: ?Sized> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: self.store.clone(),
        }
    }
}

impl<A: MemoriesApi + ?Sized> Dispatcher<A> {
    pub fn new(api: Arc<A>, store: PostStore) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub async fn fetch_all(&self) -> ApiResult<()> {
        let result = self.api.fetch_posts().await;
        self.settle("fetching posts", result, PostAction::ReplaceAll)
    }

    pub async fn create(&self, draft: &PostDraft) -> ApiResult<()> {
        let result = self.api.create_post(draft).await;
        self.settle("creating post", result, PostAction::Insert)
    }

    pub async fn update(&self, id: &PostId, draft: &PostDraft) -> ApiResult<()> {
        let result = self.api.update_post(id, draft).await;
        self.settle("updating post", result, PostAction::Replace)
    }

    pub async fn delete(&self, id: &PostId) -> ApiResult<()> {
        let result = self.api.delete_post(id).await;
        self.settle("deleting post", result, |()| PostAction::Remove(id.clone()))
    }

    pub async fn like(&self, id: &PostId) -> ApiResult<()> {
        let result = self.api.like_post(id).await;
        self.settle("liking post", result, PostAction::Replace)
    }

    fn settle<T>(
        &self,
        what: &str,
        result: ApiResult<T>,
        action: impl FnOnce(T) -> PostAction,
    ) -> ApiResult<()> {
        match result {
            Ok(value) => {
                self.store.apply(action(value));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error {}: {}", what, e);
                Err(e)
            }
        }
    }
}
