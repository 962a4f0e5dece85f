use std::sync::Arc;

use crate::api::MemoriesApi;
use crate::dispatch::Dispatcher;
use crate::error::AppResult;
use crate::forms::PostForm;
use crate::models::{AuthSession, Post, PostId, User};
use crate::session::{Screen, SessionResolver, SessionState};
use crate::store::{PostAction, PostStore};

/// Top-level shell wiring the resolver, the post store and the post form
/// together. Dropping it tears the resolver down.
pub struct App<A: ?Sized> {
    session: SessionResolver,
    dispatcher: Dispatcher<A>,
    form: PostForm,
}

impl<A: MemoriesApi + ?Sized> App<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            session: SessionResolver::new(),
            dispatcher: Dispatcher::new(api, PostStore::new()),
            form: PostForm::new(),
        }
    }

    /// Build the shell, resolve the session and, if signed in, load posts.
    pub async fn mount(api: Arc<A>) -> Self {
        let app = Self::new(api);
        app.bootstrap().await;
        app
    }

    pub async fn bootstrap(&self) -> Screen {
        let state = self.session.resolve(self.dispatcher.api().as_ref()).await;
        if state.is_authenticated() {
            let _ = self.dispatcher.fetch_all().await;
        }
        self.screen()
    }

    pub fn screen(&self) -> Screen {
        self.session.screen()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn session(&self) -> &SessionResolver {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher<A> {
        &self.dispatcher
    }

    pub fn store(&self) -> &PostStore {
        self.dispatcher.store()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.store().snapshot()
    }

    pub fn form(&self) -> &PostForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PostForm {
        &mut self.form
    }

    pub async fn login_completed(&self, session: AuthSession) -> Screen {
        self.session.complete_auth(session);
        let _ = self.dispatcher.fetch_all().await;
        self.screen()
    }

    pub async fn logout(&mut self) -> Screen {
        self.session.logout(self.dispatcher.api().as_ref()).await;
        self.store().apply(PostAction::ReplaceAll(Vec::new()));
        self.form.clear();
        self.screen()
    }

    /// Change the post being edited. A change while signed in refetches the
    /// collection and re-seeds the draft from the fresh copy.
    pub async fn set_current_id(&mut self, id: Option<PostId>) {
        if self.form.current_id() == id.as_ref() {
            return;
        }
        self.form.select(id, self.dispatcher.store());
        if self.session.state().is_authenticated() {
            let _ = self.dispatcher.fetch_all().await;
            self.form.reseed(self.dispatcher.store());
        }
    }

    /// Submit the form. An edit is followed by a refetch, a create is not.
    pub async fn submit_post(&mut self) -> AppResult<()> {
        let was_editing = self.form.current_id().is_some();
        let result = self.form.submit(&self.dispatcher).await;
        if was_editing && self.session.state().is_authenticated() {
            let _ = self.dispatcher.fetch_all().await;
        }
        result
    }

    /// Whether the signed-in user may edit or delete this post.
    pub fn owns(&self, post: &Post) -> bool {
        self.session
            .user()
            .is_some_and(|user| post.is_owned_by(&user))
    }
}

impl<A: ?Sized> Drop for App<A> {
    fn drop(&mut self) {
        self.session.teardown();
    }
}
