//! The signed-in account: profile, avatar, assignments, and deletion.

#[cfg(test)]
#[path = "me_test.rs"]
mod me_test;

use tracing::info;

use crate::error::ApiError;
use crate::net::{ApiClient, ApiRequest, Attachment, MultipartForm};
use crate::types::{AssignmentsSaved, AssignmentsUpdate, AvatarUploaded, Me, ProfileUpdate};

/// Avatar formats the server accepts.
pub const AVATAR_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn require_session(client: &ApiClient) -> Result<(), ApiError> {
    if client.session().is_authenticated() { Ok(()) } else { Err(ApiError::NotAuthenticated) }
}

/// # Errors
///
/// [`ApiError::NotAuthenticated`] without a session, otherwise whatever the
/// call returns.
pub async fn fetch_me(client: &ApiClient) -> Result<Me, ApiError> {
    require_session(client)?;
    client.call_json(ApiRequest::get("/api/me")).await
}

/// # Errors
///
/// [`ApiError::NotAuthenticated`] without a session, otherwise whatever the
/// call returns (403 for accounts without a missionary profile).
pub async fn update_profile(client: &ApiClient, update: &ProfileUpdate) -> Result<(), ApiError> {
    require_session(client)?;
    client.call(ApiRequest::put("/api/me/profile").with_json(update)?).await?;
    info!("profile updated");
    Ok(())
}

/// Upload a new avatar image and return its server URL.
///
/// # Errors
///
/// [`ApiError::Invalid`] if the file is not one of [`AVATAR_EXTENSIONS`];
/// otherwise whatever the call returns.
pub async fn upload_avatar(client: &ApiClient, image: Attachment) -> Result<String, ApiError> {
    require_session(client)?;
    let ext = image
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !AVATAR_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::Invalid(format!(
            "Unsupported avatar type. Use one of: {}.",
            AVATAR_EXTENSIONS.join(", ")
        )));
    }

    let form = MultipartForm::new().file("file", image);
    let uploaded: AvatarUploaded = client.call_json(ApiRequest::post("/api/me/avatar").with_form(form)).await?;
    info!(avatar_url = %uploaded.avatar_url, "avatar uploaded");
    Ok(uploaded.avatar_url)
}

/// Delete the account server-side, then drop the local session.
///
/// # Errors
///
/// Returns the call's error; the local session is only cleared on success.
pub async fn delete_account(client: &ApiClient) -> Result<(), ApiError> {
    require_session(client)?;
    client.call(ApiRequest::delete("/api/me")).await?;
    info!("account deleted");
    client.session().clear()
}

/// ISO2 codes the missionary is assigned to.
///
/// # Errors
///
/// [`ApiError::NotAuthenticated`] without a session, otherwise whatever the
/// call returns.
pub async fn fetch_assignments(client: &ApiClient) -> Result<Vec<String>, ApiError> {
    require_session(client)?;
    let codes: Option<Vec<String>> = client.call_json(ApiRequest::get("/api/me/assignments")).await?;
    Ok(codes.unwrap_or_default())
}

/// Replace the assignment list. Returns the server-normalized codes, or the
/// sent codes when the server does not echo them.
///
/// # Errors
///
/// [`ApiError::NotAuthenticated`] without a session, otherwise whatever the
/// call returns.
pub async fn save_assignments(client: &ApiClient, iso2: &[String]) -> Result<Vec<String>, ApiError> {
    require_session(client)?;
    let request = ApiRequest::put("/api/me/assignments").with_json(&AssignmentsUpdate { countries: iso2 })?;
    let saved: Option<AssignmentsSaved> = client.call_json(request).await?;
    let countries = saved.and_then(|s| s.countries).unwrap_or_else(|| iso2.to_vec());
    info!(count = countries.len(), "assignments saved");
    Ok(countries)
}
