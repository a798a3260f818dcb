//! Country lookups for the map: who serves there and what they have reported.
//!
//! DESIGN
//! ======
//! [`load_country_panel`] starts the missionary and report loads together
//! and applies each result as it lands, so a slow or failing report feed
//! never holds back the missionary list. Missionaries without an email get a
//! follow-up detail lookup (bounded fan-out, cached on the client), which runs
//! alongside whatever is still pending.

#[cfg(test)]
#[path = "countries_test.rs"]
mod countries_test;

use futures::future::BoxFuture;
use futures::stream::{self, FuturesUnordered};
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::normalize_iso2;
use crate::contact::{ContactIds, extract_email, extract_website};
use crate::error::ApiError;
use crate::net::{ApiClient, ApiRequest};
use crate::state::country_panel::{CountryPanel, MissionaryCard, Section};
use crate::types::{CountryReport, unwrap_list};

/// Contact-detail lookups allowed in flight at once.
pub const HYDRATION_CONCURRENCY: usize = 4;

// =============================================================================
// LISTS
// =============================================================================

/// Raw missionary records for a country. Accepts a bare array or `{ "missionaries": [...] }`.
///
/// # Errors
///
/// Whatever the call returns.
pub async fn country_missionaries(client: &ApiClient, iso2: &str) -> Result<Vec<Value>, ApiError> {
    let body: Value = client
        .call_json(ApiRequest::get(format!("/api/countries/{iso2}/missionaries")))
        .await?;
    Ok(unwrap_list(body, "missionaries"))
}

/// Reports filed for a country. Accepts a bare array or `{ "reports": [...] }`.
///
/// # Errors
///
/// Whatever the call returns, or [`ApiError::Decode`] for malformed entries.
pub async fn country_reports(client: &ApiClient, iso2: &str) -> Result<Vec<CountryReport>, ApiError> {
    let path = format!("/api/countries/{iso2}/reports");
    let body: Value = client.call_json(ApiRequest::get(path.as_str())).await?;
    serde_json::from_value(Value::Array(unwrap_list(body, "reports")))
        .map_err(|e| ApiError::Decode(format!("{path}: {e}")))
}

// =============================================================================
// CONTACT HYDRATION
// =============================================================================

/// Fill in email/website for records that lack an email, using the
/// missionary or user detail endpoints. Lookup failures leave a record as-is.
pub async fn hydrate_contacts(client: &ApiClient, list: Vec<Value>) -> Vec<Value> {
    let targets: Vec<usize> = list
        .iter()
        .enumerate()
        .filter(|(_, record)| extract_email(record).is_none())
        .map(|(i, _)| i)
        .collect();
    if targets.is_empty() {
        return list;
    }
    debug!(count = targets.len(), "hydrating contact details");

    let details: Vec<(usize, Option<Value>)> = stream::iter(targets)
        .map(|i| {
            let record = &list[i];
            async move { (i, fetch_contact_detail(client, record).await) }
        })
        .buffer_unordered(HYDRATION_CONCURRENCY)
        .collect()
        .await;

    let mut list = list;
    for (i, detail) in details {
        if let (Some(detail), Some(Value::Object(record))) = (detail, list.get_mut(i)) {
            let email = extract_email(&detail);
            let website = extract_website(&detail);
            if email.is_none() && website.is_none() {
                continue;
            }
            if let Some(email) = email {
                record.insert("email".to_owned(), Value::String(email));
            }
            if let Some(website) = website {
                record.insert("website".to_owned(), Value::String(website));
            }
            record.insert("_detail".to_owned(), detail);
        }
    }
    list
}

async fn fetch_contact_detail(client: &ApiClient, record: &Value) -> Option<Value> {
    let (path, key) = ContactIds::of(record).detail_lookup()?;
    if let Some(cached) = client.cached_contact(&key) {
        return cached;
    }

    let detail = match client.call_json::<Value>(ApiRequest::get(path.as_str())).await {
        Ok(Value::Null) => None,
        Ok(detail) => Some(detail),
        Err(e) => {
            debug!(path = %path, error = %e, "contact detail lookup failed");
            None
        }
    };
    client.cache_contact(key, detail.clone());
    detail
}

// =============================================================================
// PANEL
// =============================================================================

enum Landed {
    Missionaries(Result<Vec<Value>, ApiError>),
    Reports(Result<Vec<CountryReport>, ApiError>),
    Hydrated(Vec<Value>),
}

/// Load everything the map panel shows for `iso2`.
///
/// `on_update` sees the panel once up front (both sections pending) and again
/// after every change. The returned panel is fully settled. Section failures
/// are recorded in the panel rather than returned.
///
/// # Errors
///
/// [`ApiError::Invalid`] if `iso2` is not a two-letter country code.
pub async fn load_country_panel<F>(client: &ApiClient, iso2: &str, mut on_update: F) -> Result<CountryPanel, ApiError>
where
    F: FnMut(&CountryPanel),
{
    let iso2 = normalize_iso2(iso2).ok_or_else(|| ApiError::Invalid("Unknown country code.".to_owned()))?;
    let mut panel = CountryPanel::pending(&iso2);
    on_update(&panel);

    let mut in_flight: FuturesUnordered<BoxFuture<'_, Landed>> = FuturesUnordered::new();
    in_flight.push(country_missionaries(client, &iso2).map(Landed::Missionaries).boxed());
    in_flight.push(country_reports(client, &iso2).map(Landed::Reports).boxed());

    while let Some(landed) = in_flight.next().await {
        match landed {
            Landed::Missionaries(Ok(list)) => {
                panel.missionaries = Section::Ready(cards(client, &list));
                if list.iter().any(|record| extract_email(record).is_none()) {
                    panel.hydrating = true;
                    in_flight.push(hydrate_contacts(client, list).map(Landed::Hydrated).boxed());
                }
            }
            Landed::Missionaries(Err(e)) => {
                warn!(iso2 = %iso2, error = %e, "country missionaries failed to load");
                panel.missionaries = Section::Failed(e.user_message());
            }
            Landed::Reports(Ok(reports)) => panel.reports = Section::Ready(reports),
            Landed::Reports(Err(e)) => {
                warn!(iso2 = %iso2, error = %e, "country reports failed to load");
                panel.reports = Section::Failed(e.user_message());
            }
            Landed::Hydrated(list) => {
                panel.missionaries = Section::Ready(cards(client, &list));
                panel.hydrating = false;
            }
        }
        on_update(&panel);
    }

    Ok(panel)
}

fn cards(client: &ApiClient, list: &[Value]) -> Vec<MissionaryCard> {
    list.iter()
        .map(|record| MissionaryCard::from_value(record, client.base_url()))
        .collect()
}
