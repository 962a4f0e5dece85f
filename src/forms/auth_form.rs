// Login and signup forms with client-side validation
use crate::api::MemoriesApi;
use crate::error::{ApiError, AppError, AppResult, Field, ValidationError};
use crate::models::{AuthSession, SignInRequest, SignUpRequest};

pub const MIN_PASSWORD_LEN: usize = 8;

const SIGN_IN_FALLBACK: &str = "Unable to sign in.";
const SIGN_UP_FALLBACK: &str = "Unable to create account.";

pub fn email_looks_valid(email: &str) -> bool {
    let email = email.trim();
    email.chars().count() > 3 && email.contains('@') && email.contains('.')
}

pub fn password_looks_valid(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub fn passwords_match(password: &str, confirm: &str) -> bool {
    !confirm.is_empty() && password == confirm
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Touched {
    email: bool,
    password: bool,
    confirm_password: bool,
}

impl Touched {
    fn mark(&mut self, field: Field) {
        match field {
            Field::Email => self.email = true,
            Field::Password => self.password = true,
            Field::ConfirmPassword => self.confirm_password = true,
            Field::Image => {}
        }
    }

    fn is(&self, field: Field) -> bool {
        match field {
            Field::Email => self.email,
            Field::Password => self.password,
            Field::ConfirmPassword => self.confirm_password,
            Field::Image => false,
        }
    }

    fn all() -> Self {
        Self {
            email: true,
            password: true,
            confirm_password: true,
        }
    }
}

/// Submission bookkeeping shared by both auth forms.
#[derive(Debug, Clone, Default)]
struct FormStatus {
    submitting: bool,
    error: Option<String>,
    touched: Touched,
}

impl FormStatus {
    fn edited(&mut self) {
        self.error = None;
    }

    /// Gate a submit attempt: refuse while one is in flight, and report the
    /// first failing rule as the form error.
    fn begin(&mut self, validation: Result<(), ValidationError>) -> Result<(), ValidationError> {
        self.touched = Touched::all();
        if self.submitting {
            return Err(ValidationError::SubmitInFlight);
        }
        if let Err(e) = validation {
            self.error = Some(e.to_string());
            return Err(e);
        }
        self.submitting = true;
        Ok(())
    }

    fn finish(&mut self, result: Result<AuthSession, ApiError>, fallback: &str) -> AppResult<AuthSession> {
        self.submitting = false;
        match result {
            Ok(session) => {
                self.error = None;
                Ok(session)
            }
            Err(e) => {
                tracing::debug!("Auth request failed: {}", e);
                self.error = Some(e.server_message().unwrap_or(fallback).to_string());
                Err(AppError::Api(e))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    email: String,
    password: String,
    status: FormStatus,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.status.edited();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.status.edited();
    }

    pub fn blur(&mut self, field: Field) {
        self.status.touched.mark(field);
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.status.submitting
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !email_looks_valid(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if !password_looks_valid(&self.password) {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok() && !self.status.submitting
    }

    /// Inline hint for a touched field that currently fails its rule.
    pub fn hint(&self, field: Field) -> Option<&'static str> {
        if !self.status.touched.is(field) {
            return None;
        }
        match field {
            Field::Email if !email_looks_valid(&self.email) => Some("Please enter a valid email."),
            Field::Password if !password_looks_valid(&self.password) => {
                Some("Use at least 8 characters.")
            }
            _ => None,
        }
    }

    pub async fn submit<A: MemoriesApi + ?Sized>(&mut self, api: &A) -> AppResult<AuthSession> {
        let validation = self.validate();
        self.status.begin(validation)?;
        let request = SignInRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        let result = api.sign_in(&request).await;
        self.status.finish(result, SIGN_IN_FALLBACK)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
    status: FormStatus,
}

impl SignupForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.status.edited();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.status.edited();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.status.edited();
    }

    pub fn set_confirm_password(&mut self, confirm: impl Into<String>) {
        self.confirm_password = confirm.into();
        self.status.edited();
    }

    pub fn blur(&mut self, field: Field) {
        self.status.touched.mark(field);
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.status.submitting
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !email_looks_valid(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if !password_looks_valid(&self.password) {
            return Err(ValidationError::PasswordTooShort);
        }
        if !passwords_match(&self.password, &self.confirm_password) {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok() && !self.status.submitting
    }

    pub fn hint(&self, field: Field) -> Option<&'static str> {
        if !self.status.touched.is(field) {
            return None;
        }
        match field {
            Field::Email if !email_looks_valid(&self.email) => Some("Please enter a valid email."),
            Field::Password if !password_looks_valid(&self.password) => {
                Some("Use at least 8 characters.")
            }
            Field::ConfirmPassword if !passwords_match(&self.password, &self.confirm_password) => {
                Some("Passwords must match.")
            }
            _ => None,
        }
    }

    pub async fn submit<A: MemoriesApi + ?Sized>(&mut self, api: &A) -> AppResult<AuthSession> {
        let validation = self.validate();
        self.status.begin(validation)?;
        let request = SignUpRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        };
        let result = api.sign_up(&request).await;
        self.status.finish(result, SIGN_UP_FALLBACK)
    }
}
