//! Sign-in, sign-up, and sign-out.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use tracing::info;

use crate::error::ApiError;
use crate::net::{ApiClient, ApiRequest};
use crate::session::{Session, SessionUser};
use crate::types::{Ack, Credentials, LoginResponse, Registration};

/// Exchange credentials for a session and persist it.
///
/// # Errors
///
/// Returns [`ApiError::Invalid`] for blank input, [`ApiError::Http`] when the
/// server rejects the credentials, or [`ApiError::Storage`] if the session
/// cannot be persisted.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<Session, ApiError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Invalid("Email and password are required.".to_owned()));
    }

    let request = ApiRequest::post("/api/auth/login")
        .anonymous()
        .with_json(&Credentials { email, password })?;
    let response: LoginResponse = client.call_json(request).await?;

    let session = Session {
        token: response.access_token,
        user: SessionUser { role: response.role, email: email.to_owned() },
    };
    client.session().set(&session.token, session.user.clone())?;
    client.refresh().reset_expired();
    info!(email, role = %session.user.role, "signed in");
    Ok(session)
}

/// Create an account, then sign in with the same credentials.
///
/// # Errors
///
/// Returns [`ApiError::Http`] when registration fails (e.g. the email is
/// already registered), plus anything [`login`] returns.
pub async fn register(client: &ApiClient, name: &str, email: &str, password: &str) -> Result<Session, ApiError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Invalid("Email and password are required.".to_owned()));
    }

    let request = ApiRequest::post("/api/auth/register")
        .anonymous()
        .with_json(&Registration { name: name.trim(), email, password })?;
    let ack: Option<Ack> = client.call_json(request).await?;
    info!(email, message = %ack.map(|a| a.message).unwrap_or_default(), "registered");

    login(client, email, password).await
}

/// Forget the local session. The server keeps no per-token state to revoke.
///
/// # Errors
///
/// Returns [`ApiError::Storage`] if the persisted session cannot be removed;
/// the in-memory session is cleared regardless.
pub fn logout(client: &ApiClient) -> Result<(), ApiError> {
    let email = client.session().user().map(|user| user.email);
    client.session().clear()?;
    info!(email = email.as_deref().unwrap_or(""), "signed out");
    Ok(())
}

#[must_use]
pub fn current_session(client: &ApiClient) -> Option<Session> {
    client.session().current()
}
