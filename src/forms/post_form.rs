use std::path::{Path, PathBuf};

use super::upload::ImageAcquirer;
use crate::api::MemoriesApi;
use crate::dispatch::Dispatcher;
use crate::error::{AppResult, UploadError, ValidationError};
use crate::models::{ImageRef, PostDraft, PostId, Tags};
use crate::store::PostStore;

/// Image selection state while a file is being turned into an [`ImageRef`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadDraft {
    pub pending_file: Option<PathBuf>,
    pub in_flight: bool,
    pub error: Option<String>,
    pub committed: Option<ImageRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Creating,
    Editing,
}

impl FormMode {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Creating => "Creating a Memory",
            Self::Editing => "Editing a Memory",
        }
    }
}

/// The create/edit form. With no current id a submit creates; with one it
/// updates that post.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    current_id: Option<PostId>,
    draft: PostDraft,
    upload: UploadDraft,
}

impl PostForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> Option<&PostId> {
        self.current_id.as_ref()
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn upload(&self) -> &UploadDraft {
        &self.upload
    }

    pub fn mode(&self) -> FormMode {
        if self.current_id.is_some() {
            FormMode::Editing
        } else {
            FormMode::Creating
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.draft.message = message.into();
    }

    /// Tags as typed: a comma-separated string, normalized on submit.
    pub fn set_tags(&mut self, raw: impl Into<String>) {
        self.draft.tags = Tags::Raw(raw.into());
    }

    /// Select a post for editing (or `None` to create). The draft is seeded
    /// from the store; an id the store does not know leaves a blank draft.
    pub fn select(&mut self, id: Option<PostId>, store: &PostStore) {
        self.upload = UploadDraft::default();
        self.draft = id
            .as_ref()
            .and_then(|id| store.find(id))
            .map(|post| PostDraft::from(&post))
            .unwrap_or_default();
        self.current_id = id;
    }

    /// Re-seed from the store for the current selection without touching
    /// the id, e.g. after a refetch brought a newer version of the post.
    pub fn reseed(&mut self, store: &PostStore) {
        if let Some(post) = self.current_id.as_ref().and_then(|id| store.find(id)) {
            self.draft = PostDraft::from(&post);
        }
    }

    pub fn clear(&mut self) {
        self.current_id = None;
        self.draft = PostDraft::default();
        self.upload = UploadDraft::default();
    }

    pub fn can_submit(&self) -> bool {
        !self.upload.in_flight
    }

    pub fn begin_upload(&mut self, path: &Path) -> Result<(), UploadError> {
        if self.upload.in_flight {
            return Err(UploadError::InFlight);
        }
        self.upload.pending_file = Some(path.to_path_buf());
        self.upload.in_flight = true;
        self.upload.error = None;
        Ok(())
    }

    pub fn finish_upload(&mut self, result: Result<ImageRef, UploadError>) -> Result<(), UploadError> {
        self.upload.in_flight = false;
        self.upload.pending_file = None;
        match result {
            Ok(image) => {
                self.upload.committed = Some(image.clone());
                self.draft.image = Some(image);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Image upload failed: {}", e);
                self.upload.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn acquire_image<I>(&mut self, acquirer: &I, path: &Path) -> Result<(), UploadError>
    where
        I: ImageAcquirer + ?Sized,
    {
        self.begin_upload(path)?;
        let result = acquirer.acquire(path).await;
        self.finish_upload(result)
    }

    /// Normalize tags, then update the current post or create a new one.
    /// The form is cleared afterwards whether or not the call succeeded.
    pub async fn submit<A>(&mut self, dispatcher: &Dispatcher<A>) -> AppResult<()>
    where
        A: MemoriesApi + ?Sized,
    {
        if !self.can_submit() {
            return Err(ValidationError::UploadPending.into());
        }

        let draft = PostDraft {
            tags: Tags::List(self.draft.tags.normalize()),
            ..self.draft.clone()
        };
        let result = match &self.current_id {
            Some(id) => dispatcher.update(id, &draft).await,
            None => dispatcher.create(&draft).await,
        };
        self.clear();
        result.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{post, Call, FakeApi, Reply};
    use crate::error::{ApiError, AppError};
    use crate::forms::upload::InlineImage;
    use std::sync::Arc;

    fn dispatcher(replies: Vec<Reply>, store: PostStore) -> (Dispatcher<FakeApi>, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::new(replies));
        (Dispatcher::new(api.clone(), store), api)
    }

    #[tokio::test]
    async fn create_normalizes_tags_and_resets() {
        let store = PostStore::new();
        let (d, api) = dispatcher(vec![Reply::Post(post("p9", "Trip"))], store.clone());
        let mut form = PostForm::new();
        form.set_title("Trip");
        form.set_message("Fun");
        form.set_tags("beach, sun");

        form.submit(&d).await.unwrap();

        let expected = PostDraft {
            title: "Trip".into(),
            message: "Fun".into(),
            tags: Tags::List(vec!["beach".into(), "sun".into()]),
            image: None,
        };
        assert_eq!(api.calls(), vec![Call::CreatePost(expected)]);
        assert_eq!(store.len(), 1);
        assert!(form.draft().is_blank());
        assert_eq!(form.mode(), FormMode::Creating);
    }

    #[tokio::test]
    async fn editing_submits_update_for_current_id() {
        let store = PostStore::with_posts(vec![post("p1", "Old")]);
        let (d, api) = dispatcher(vec![Reply::Post(post("p1", "New"))], store.clone());
        let mut form = PostForm::new();

        form.select(Some(PostId::new("p1")), &store);
        assert_eq!(form.mode(), FormMode::Editing);
        assert_eq!(form.draft().title, "Old");

        form.set_title("New");
        form.submit(&d).await.unwrap();

        assert!(matches!(&api.calls()[0], Call::UpdatePost(id, draft) if id.as_str() == "p1" && draft.title == "New"));
        assert_eq!(store.snapshot()[0].title, "New");
        assert!(form.current_id().is_none());
    }

    #[tokio::test]
    async fn failed_submit_still_resets() {
        let store = PostStore::new();
        let (d, _) = dispatcher(
            vec![Reply::Fail(ApiError::Network("down".into()))],
            store.clone(),
        );
        let mut form = PostForm::new();
        form.set_title("Lost");

        let err = form.submit(&d).await.unwrap_err();

        assert!(matches!(err, AppError::Api(ApiError::Network(_))));
        assert!(form.draft().is_blank());
        assert!(store.is_empty());
    }

    #[test]
    fn selecting_unknown_id_gives_blank_draft() {
        let store = PostStore::with_posts(vec![post("p1", "One")]);
        let mut form = PostForm::new();
        form.set_title("typed");

        form.select(Some(PostId::new("nope")), &store);

        assert!(form.draft().is_blank());
        assert_eq!(form.current_id(), Some(&PostId::new("nope")));
    }

    #[test]
    fn second_upload_rejected_while_in_flight() {
        let mut form = PostForm::new();
        form.begin_upload(Path::new("a.png")).unwrap();

        assert!(!form.can_submit());
        assert_eq!(
            form.begin_upload(Path::new("b.png")),
            Err(UploadError::InFlight)
        );
        assert_eq!(form.upload().pending_file.as_deref(), Some(Path::new("a.png")));
    }

    #[tokio::test]
    async fn submit_blocked_during_upload() {
        let (d, api) = dispatcher(vec![], PostStore::new());
        let mut form = PostForm::new();
        form.set_title("Wait");
        form.begin_upload(Path::new("a.png")).unwrap();

        let err = form.submit(&d).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UploadPending)
        ));
        assert!(api.calls().is_empty());
        assert_eq!(form.draft().title, "Wait");
    }

    #[test]
    fn failed_upload_records_message_and_keeps_draft_image() {
        let mut form = PostForm::new();
        form.begin_upload(Path::new("a.png")).unwrap();
        form.finish_upload(Ok(ImageRef::Inline("data:image/png;base64,AA==".into())))
            .unwrap();

        form.begin_upload(Path::new("b.png")).unwrap();
        let _ = form.finish_upload(Err(UploadError::Host {
            status: Some(400),
            message: "Invalid Signature".into(),
        }));

        assert!(form.can_submit());
        assert_eq!(form.upload().error.as_deref(), Some("Invalid Signature"));
        assert_eq!(
            form.draft().image,
            Some(ImageRef::Inline("data:image/png;base64,AA==".into()))
        );
    }

    #[tokio::test]
    async fn inline_image_lands_in_draft() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pic.gif");
        std::fs::write(&path, b"GIF").unwrap();
        let mut form = PostForm::new();

        form.acquire_image(&InlineImage, &path).await.unwrap();

        let image = form.draft().image.clone().unwrap();
        assert!(image.src().starts_with("data:image/gif;base64,"));
        assert!(!form.upload().in_flight);
        assert!(form.upload().error.is_none());
    }
}
