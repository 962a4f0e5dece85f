use reqwest::StatusCode;

/// Failure of a single call against the Memories REST API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized ({status})")]
    Auth {
        status: u16,
        message: Option<String>,
    },

    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("request failed"))]
    Http {
        status: u16,
        message: Option<String>,
        body: String,
    },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-2xx response. 401 and 403 are auth failures, everything
    /// else is a plain HTTP error carrying the body.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let message = extract_message(&body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth {
                status: status.as_u16(),
                message,
            },
            _ => ApiError::Http {
                status: status.as_u16(),
                message,
                body,
            },
        }
    }

    /// The `message` the server put in its JSON error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Auth { message, .. } | ApiError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Form fields that client-side validation can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    Image,
}

/// Client-side rule failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("Password must be at least 8 characters.")]
    PasswordTooShort,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Wait for the image upload to finish.")]
    UploadPending,

    #[error("A submission is already in progress.")]
    SubmitInFlight,
}

impl ValidationError {
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::InvalidEmail => Some(Field::Email),
            ValidationError::PasswordTooShort => Some(Field::Password),
            ValidationError::PasswordMismatch => Some(Field::ConfirmPassword),
            ValidationError::UploadPending => Some(Field::Image),
            ValidationError::SubmitInFlight => None,
        }
    }
}

/// Image acquisition failure. The Display text is what the form shows.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error("An upload is already in progress.")]
    InFlight,

    #[error("Could not read the selected file.")]
    Read(String),

    #[error("Could not start the upload. Please try again.")]
    Signature(#[source] ApiError),

    #[error("{message}")]
    Host {
        status: Option<u16>,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Credentials file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credentials file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not signed in")]
    Anonymous,
}

pub type ApiResult<T> = Result<T, ApiError>;
pub type AppResult<T> = Result<T, AppError>;
