use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::MemoriesApi;
use crate::config::{ApiConfig, CredentialMode, SignatureEndpoint, SignatureMethod};
use crate::credentials::Credentials;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuthSession, Post, PostDraft, PostId, SignInRequest, SignUpRequest, UploadSignature, User,
};

/// reqwest-backed client for the Memories REST API.
pub struct HttpApi {
    client: Client,
    base_url: Url,
    mode: CredentialMode,
    signature: SignatureEndpoint,
    credentials: Credentials,
    jar: Arc<Jar>,
}

impl HttpApi {
    pub async fn connect(config: &ApiConfig, credentials: Credentials) -> ApiResult<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Network(format!("invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Network(format!(
                "invalid base URL: {}",
                config.base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        if config.credentials == CredentialMode::Cookie {
            if let Some(cookie) = credentials.snapshot().await.cookie {
                for pair in cookie.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                    jar.add_cookie_str(pair, &base_url);
                }
                tracing::debug!("Restored session cookie for {}", base_url);
            }
        }

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            mode: config.credentials,
            signature: config.signature.clone(),
            credentials,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn path_segments(path: &str) -> Vec<&str> {
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!("{} {}", method, url.path());
        let builder = self.client.request(method, url);
        match self.mode {
            CredentialMode::Bearer => match self.credentials.token().await {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            },
            CredentialMode::Cookie => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, body))
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Keep whatever credential the sign-in response handed us.
    async fn remember(&self, session: &AuthSession) {
        let result = match self.mode {
            CredentialMode::Bearer => self.credentials.set_token(session.token.clone()).await,
            CredentialMode::Cookie => {
                let cookie = self
                    .jar
                    .cookies(&self.base_url)
                    .and_then(|value| value.to_str().ok().map(str::to_string));
                self.credentials.set_cookie(cookie).await
            }
        };
        if let Err(e) = result {
            tracing::warn!("Could not persist credentials: {}", e);
        }
    }

    fn expire_cookies(&self, cookie_header: &str) {
        for pair in cookie_header.split(';').map(str::trim) {
            if let Some((name, _)) = pair.split_once('=') {
                self.jar
                    .add_cookie_str(&format!("{}=; Max-Age=0", name), &self.base_url);
            }
        }
    }

    async fn authenticate<B: serde::Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<AuthSession> {
        let builder = self
            .request(Method::POST, self.endpoint(segments))
            .await
            .json(body);
        let response = self.send(builder).await?;
        let session: AuthSession = Self::decode(response).await?;
        self.remember(&session).await;
        tracing::info!("Signed in as {}", session.user.email);
        Ok(session)
    }
}

#[async_trait]
impl MemoriesApi for HttpApi {
    async fn fetch_posts(&self) -> ApiResult<Vec<Post>> {
        let builder = self.request(Method::GET, self.endpoint(&["posts"])).await;
        Self::decode(self.send(builder).await?).await
    }

    async fn create_post(&self, draft: &PostDraft) -> ApiResult<Post> {
        let builder = self
            .request(Method::POST, self.endpoint(&["posts"]))
            .await
            .json(&draft.payload());
        Self::decode(self.send(builder).await?).await
    }

    async fn update_post(&self, id: &PostId, draft: &PostDraft) -> ApiResult<Post> {
        let builder = self
            .request(Method::PATCH, self.endpoint(&["posts", id.as_str()]))
            .await
            .json(&draft.payload());
        Self::decode(self.send(builder).await?).await
    }

    async fn delete_post(&self, id: &PostId) -> ApiResult<()> {
        let builder = self
            .request(Method::DELETE, self.endpoint(&["posts", id.as_str()]))
            .await;
        self.send(builder).await?;
        Ok(())
    }

    async fn like_post(&self, id: &PostId) -> ApiResult<Post> {
        let builder = self
            .request(
                Method::PATCH,
                self.endpoint(&["posts", id.as_str(), "likePost"]),
            )
            .await;
        Self::decode(self.send(builder).await?).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> ApiResult<AuthSession> {
        self.authenticate(&["auth", "signup"], request).await
    }

    async fn sign_in(&self, request: &SignInRequest) -> ApiResult<AuthSession> {
        self.authenticate(&["auth", "login"], request).await
    }

    async fn fetch_session_user(&self) -> ApiResult<User> {
        let builder = self.request(Method::GET, self.endpoint(&["auth", "me"])).await;
        Self::decode(self.send(builder).await?).await
    }

    async fn logout(&self) -> ApiResult<()> {
        let builder = self
            .request(Method::POST, self.endpoint(&["auth", "logout"]))
            .await;
        let result = self.send(builder).await.map(|_| ());

        // Local state is forgotten whatever the server said.
        if let Some(cookie) = self.credentials.snapshot().await.cookie {
            self.expire_cookies(&cookie);
        }
        if let Err(e) = self.credentials.clear().await {
            tracing::warn!("Could not clear stored credentials: {}", e);
        }
        result
    }

    async fn request_upload_signature(&self) -> ApiResult<UploadSignature> {
        let method = match self.signature.method {
            SignatureMethod::Get => Method::GET,
            SignatureMethod::Post => Method::POST,
        };
        let segments = Self::path_segments(&self.signature.path);
        let builder = self.request(method, self.endpoint(&segments)).await;
        Self::decode(self.send(builder).await?).await
    }
}
