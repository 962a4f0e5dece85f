pub mod auth_form;
pub mod post_form;
pub mod upload;

pub use auth_form::{LoginForm, SignupForm};
pub use post_form::{FormMode, PostForm, UploadDraft};
pub use upload::{
    acquirer_for, ImageAcquirer, InlineImage, SignedUpload, GENERIC_UPLOAD_ERROR,
};
