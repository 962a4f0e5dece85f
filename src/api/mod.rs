// Remote capabilities of the Memories service
mod http;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::models::{
    AuthSession, Post, PostDraft, PostId, SignInRequest, SignUpRequest, UploadSignature, User,
};

pub use http::HttpApi;

/// One method per REST operation. Every call is a single attempt; failures
/// are returned to the caller untouched.
#[async_trait]
pub trait MemoriesApi: Send + Sync {
    /// GET /posts
    async fn fetch_posts(&self) -> ApiResult<Vec<Post>>;

    /// POST /posts
    async fn create_post(&self, draft: &PostDraft) -> ApiResult<Post>;

    /// PATCH /posts/{id}
    async fn update_post(&self, id: &PostId, draft: &PostDraft) -> ApiResult<Post>;

    /// DELETE /posts/{id}
    async fn delete_post(&self, id: &PostId) -> ApiResult<()>;

    /// PATCH /posts/{id}/likePost
    async fn like_post(&self, id: &PostId) -> ApiResult<Post>;

    /// POST /auth/signup
    async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<AuthSession>;

    /// POST /auth/login
    async fn sign_in(&self, request: &SignInRequest) -> ApiResult<AuthSession>;

    /// GET /auth/me
    async fn fetch_session_user(&self) -> ApiResult<User>;

    /// POST /auth/logout
    async fn logout(&self) -> ApiResult<()>;

    /// Upload signature endpoint (path and method depend on deployment)
    async fn request_upload_signature(&self) -> ApiResult<UploadSignature>;
}

#[async_trait]
impl<T: MemoriesApi + ?Sized> MemoriesApi for Arc<T> {
    async fn fetch_posts(&self) -> ApiResult<Vec<Post>> {
        (**self).fetch_posts().await
    }

    async fn create_post(&self, draft: &PostDraft) -> ApiResult<Post> {
        (**self).create_post(draft).await
    }

    async fn update_post(&self, id: &PostId, draft: &PostDraft) -> ApiResult<Post> {
        (**self).update_post(id, draft).await
    }

    async fn delete_post(&self, id: &PostId) -> ApiResult<()> {
        (**self).delete_post(id).await
    }

    async fn like_post(&self, id: &PostId) -> ApiResult<Post> {
        (**self).like_post(id).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<AuthSession> {
        (**self).sign_up(request).await
    }

    async fn sign_in(&self, request: &SignInRequest) -> ApiResult<AuthSession> {
        (**self).sign_in(request).await
    }

    async fn fetch_session_user(&self) -> ApiResult<User> {
        (**self).fetch_session_user().await
    }

    async fn logout(&self) -> ApiResult<()> {
        (**self).logout().await
    }

    async fn request_upload_signature(&self) -> ApiResult<UploadSignature> {
        (**self).request_upload_signature().await
    }
}
