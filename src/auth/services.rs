use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{FieldError, LoginForm, RegisterForm},
        password::PasswordHasher,
        repo::{StoreError, UserRepo},
        repo_types::{NewUser, User},
    },
    sessions::{Session, SessionManager},
};

pub const MSG_INVALID_CREDENTIALS: &str = "Email atau password salah";
pub const MSG_DUPLICATE_EMAIL: &str = "Email sudah terdaftar";
pub const MSG_SYSTEM_ERROR: &str = "Terjadi kesalahan sistem";
pub const MSG_REGISTER_FAILED: &str = "Gagal mendaftarkan akun";

const MIN_PASSWORD_LEN: usize = 6;
const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=255;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed ({} errors)", .0.len())]
    Validation(Vec<FieldError>),
    /// Unknown email and wrong password deliberately share this variant.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("store error: {0}")]
    Persistence(#[source] anyhow::Error),
    /// The user insert itself failed.
    #[error("insert user failed: {0}")]
    RegistrationFailed(#[source] anyhow::Error),
    #[error("password hashing failed: {0}")]
    Hashing(#[source] anyhow::Error),
}

impl AuthError {
    /// Messages safe to show on the form.
    pub fn messages(&self) -> Vec<String> {
        match self {
            AuthError::Validation(errs) => errs.iter().map(|e| e.msg.clone()).collect(),
            AuthError::InvalidCredentials => vec![MSG_INVALID_CREDENTIALS.into()],
            AuthError::DuplicateEmail => vec![MSG_DUPLICATE_EMAIL.into()],
            AuthError::RegistrationFailed(_) => vec![MSG_REGISTER_FAILED.into()],
            AuthError::Persistence(_) | AuthError::Hashing(_) => vec![MSG_SYSTEM_ERROR.into()],
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "Email tidak valid"));
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new("password", "Password minimal 6 karakter"));
    }
}

/// Registration and login over the credential store, hasher and sessions.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepo>,
    hasher: PasswordHasher,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepo>, hasher: PasswordHasher, sessions: SessionManager) -> Self {
        Self {
            users,
            hasher,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn warm_up(&self) -> anyhow::Result<()> {
        self.hasher.warm_up().await
    }

    /// Every precondition is checked before the store is touched; all
    /// violations are reported together.
    pub async fn register(&self, form: &RegisterForm) -> Result<User, AuthError> {
        let name = form.name.trim();
        let email = normalize_email(&form.email);

        let mut errors = Vec::new();
        if !NAME_LEN.contains(&name.chars().count()) {
            errors.push(FieldError::new("name", "Nama harus 2-255 karakter"));
        }
        check_email(&email, &mut errors);
        check_password(&form.password, &mut errors);
        if form.confirm_password != form.password {
            errors.push(FieldError::new(
                "confirm_password",
                "Konfirmasi password tidak cocok",
            ));
        }
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        match self.users.find_by_email(&email).await {
            Ok(Some(_)) => {
                warn!(email = %email, "email already registered");
                return Err(AuthError::DuplicateEmail);
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(AuthError::Persistence(e));
            }
        }

        let hash = self.hasher.hash(&form.password).await.map_err(|e| {
            error!(error = %e, "hash_password failed");
            AuthError::Hashing(e)
        })?;

        let new_user = NewUser {
            name,
            email: &email,
            password_hash: &hash,
        };
        let user = match self.users.create(new_user).await {
            Ok(u) => u,
            Err(StoreError::Conflict) => {
                warn!(email = %email, "email registered concurrently");
                return Err(AuthError::DuplicateEmail);
            }
            Err(StoreError::Other(e)) => {
                error!(error = %e, "create user failed");
                return Err(AuthError::RegistrationFailed(e));
            }
        };

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(&self, form: &LoginForm) -> Result<Session, AuthError> {
        let email = normalize_email(&form.email);

        let mut errors = Vec::new();
        check_email(&email, &mut errors);
        check_password(&form.password, &mut errors);
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let user = match self.users.find_by_email(&email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                self.hasher.verify_dummy(&form.password).await;
                warn!(email = %email, "login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(AuthError::Persistence(e));
            }
        };

        let ok = self
            .hasher
            .verify(&form.password, &user.password_hash)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user.id, "verify_password failed");
                AuthError::Hashing(e)
            })?;
        if !ok {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self
            .sessions
            .create(user.id, &user.name)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user.id, "create session failed");
                AuthError::Persistence(e)
            })?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(session)
    }

    /// Always succeeds from the caller's point of view.
    pub async fn logout(&self, session_id: &str) {
        if let Err(e) = self.sessions.destroy(session_id).await {
            error!(error = %e, "logout error");
        }
    }
}
