//! Sign-in and sign-out.
//!
//! A successful exchange stores the bearer token and routes to the
//! destination remembered when sign-in was required, or the registry.
//! Failures are never retried automatically.

use std::fmt;

use anyhow::Result;

use crate::api::{ApiClient, ApiError, TokenResponse};
use crate::routes::Route;
use crate::session::Session;

/// Why sign-in did not complete.
#[derive(Debug)]
pub enum SignInError {
    /// Nothing usable was supplied.
    MissingCredential,
    /// The backend refused the credential or could not be reached.
    Rejected(ApiError),
    /// The token was issued but could not be stored.
    Storage(anyhow::Error),
}

impl fmt::Display for SignInError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => f.write_str("No credential provided. Please try again."),
            Self::Rejected(err) => {
                write!(f, "Failed to sign in ({}). Please try again.", err.user_message())
            }
            Self::Storage(err) => write!(f, "Failed to save session: {err:#}"),
        }
    }
}

impl std::error::Error for SignInError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(err) => Some(err),
            Self::MissingCredential | Self::Storage(_) => None,
        }
    }
}

/// If a session already exists, where sign-in should go instead of
/// prompting. The pending destination is consumed.
///
/// # Errors
/// Returns an error if the session cannot be persisted.
pub fn already_signed_in(session: &Session) -> Result<Option<Route>> {
    if !session.is_signed_in() {
        return Ok(None);
    }
    Ok(Some(session.take_destination()?.unwrap_or(Route::Registry)))
}

/// Exchanges a third-party identity token (a Google ID token) for a session.
///
/// # Errors
/// See [`SignInError`].
pub async fn sign_in_with_identity_credential(
    client: &ApiClient,
    credential: &str,
) -> Result<Route, SignInError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(SignInError::MissingCredential);
    }
    let token = client
        .google_login(credential)
        .await
        .map_err(SignInError::Rejected)?;
    complete(client.session(), &token)
}

/// Signs in with email and password.
///
/// # Errors
/// See [`SignInError`].
pub async fn sign_in_with_password(
    client: &ApiClient,
    email: &str,
    password: &str,
) -> Result<Route, SignInError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(SignInError::MissingCredential);
    }
    let token = client
        .password_login(email, password)
        .await
        .map_err(SignInError::Rejected)?;
    complete(client.session(), &token)
}

fn complete(session: &Session, token: &TokenResponse) -> Result<Route, SignInError> {
    if token.access_token.is_empty() {
        return Err(SignInError::Rejected(ApiError::parse("empty access token")));
    }
    session
        .set_credential(&token.access_token)
        .map_err(SignInError::Storage)?;
    tracing::info!("signed in");

    let destination = session
        .take_destination()
        .map_err(SignInError::Storage)?
        .unwrap_or(Route::Registry);
    Ok(destination)
}

/// Signs out: drops the credential and any remembered destination.
/// Returns whether a credential was present.
///
/// # Errors
/// Returns an error if the session cannot be persisted.
pub fn sign_out(session: &Session) -> Result<bool> {
    let had = session.reset()?;
    if had {
        tracing::info!("signed out");
    }
    Ok(had)
}
