//! Field reports: list, create (multipart with photos and a PDF), delete.

#[cfg(test)]
#[path = "reports_test.rs"]
mod reports_test;

use tracing::info;

use crate::catalog::normalize_iso2;
use crate::error::ApiError;
use crate::net::{ApiClient, ApiRequest, Attachment, MultipartForm};
use crate::types::{CreatedReport, Report};

/// Largest PDF attachment accepted, in bytes.
pub const MAX_PDF_BYTES: usize = 15 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";

/// A report being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDraft {
    /// ISO2 code of the country the report is about.
    pub country_iso2: String,
    pub title: String,
    pub content: String,
    pub images: Vec<Attachment>,
    pub document: Option<Attachment>,
}

impl ReportDraft {
    /// Check the draft the way the submit button does before anything is sent.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ApiError> {
        if normalize_iso2(&self.country_iso2).is_none() {
            return Err(ApiError::Invalid("Pick a country for this report.".to_owned()));
        }
        if self.title.trim().is_empty() {
            return Err(ApiError::Invalid("A report needs a title.".to_owned()));
        }
        if let Some(image) = self.images.iter().find(|image| !image.is_image()) {
            return Err(ApiError::Invalid(format!("{} is not an image.", image.file_name)));
        }
        if let Some(document) = &self.document {
            if document.mime != PDF_MIME {
                return Err(ApiError::Invalid("Please choose a PDF file.".to_owned()));
            }
            if document.bytes.len() > MAX_PDF_BYTES {
                return Err(ApiError::Invalid(format!(
                    "PDF is too large. Max {}MB.",
                    MAX_PDF_BYTES / (1024 * 1024)
                )));
            }
        }
        Ok(())
    }

    /// Multipart body: text fields, then repeated `images`, then an optional `file`.
    #[must_use]
    pub fn to_form(&self) -> MultipartForm {
        let country = normalize_iso2(&self.country_iso2).unwrap_or_else(|| self.country_iso2.trim().to_owned());
        let form = MultipartForm::new()
            .text("country_iso2", country)
            .text("title", self.title.trim())
            .text("content", self.content.as_str());
        let form = self
            .images
            .iter()
            .cloned()
            .fold(form, |form, image| form.file("images", image));
        match &self.document {
            Some(document) => form.file("file", document.clone()),
            None => form,
        }
    }
}

/// The signed-in missionary's reports, newest first as the server sends them.
///
/// # Errors
///
/// Whatever the call returns.
pub async fn list_reports(client: &ApiClient) -> Result<Vec<Report>, ApiError> {
    let reports: Option<Vec<Report>> = client.call_json(ApiRequest::get("/api/me/reports")).await?;
    Ok(reports.unwrap_or_default())
}

/// Validate and submit a report in one multipart request. Returns the new id.
///
/// # Errors
///
/// [`ApiError::Invalid`] from [`ReportDraft::validate`], otherwise whatever
/// the call returns (403 when not assigned to the country).
pub async fn create_report(client: &ApiClient, draft: &ReportDraft) -> Result<i64, ApiError> {
    draft.validate()?;
    let request = ApiRequest::post("/api/me/reports").with_form(draft.to_form());
    let created: CreatedReport = client.call_json(request).await?;
    info!(
        id = created.id,
        country = %draft.country_iso2,
        images = draft.images.len(),
        document = draft.document.is_some(),
        "report created"
    );
    Ok(created.id)
}

/// # Errors
///
/// Whatever the call returns (403 for someone else's report).
pub async fn delete_report(client: &ApiClient, id: i64) -> Result<(), ApiError> {
    client.call(ApiRequest::delete(format!("/api/me/reports/{id}"))).await?;
    info!(id, "report deleted");
    Ok(())
}
