//! Dashboard orchestration: load, save, and report flows over [`DashboardState`].
//!
//! SYSTEM CONTEXT
//! ==============
//! The controller pairs one [`ApiClient`] with one [`DashboardState`]. Every
//! action updates the state the way the dashboard shows it (snapshots,
//! optimistic entries, the expired-session banner) and returns the call's
//! error unchanged for the caller to report.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use tracing::info;
use uuid::Uuid;

use super::{me, reports};
use crate::error::ApiError;
use crate::net::ApiClient;
use crate::services::reports::ReportDraft;
use crate::state::dashboard::{DashboardState, PendingReport};

pub struct DashboardController {
    client: ApiClient,
    state: DashboardState,
}

impl DashboardController {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client, state: DashboardState::default() }
    }

    #[must_use]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Mutable access for form edits (profile fields, country picks).
    pub fn state_mut(&mut self) -> &mut DashboardState {
        &mut self.state
    }

    /// Fetch profile, assignments, and reports together. Nothing is applied
    /// unless all three succeed.
    ///
    /// # Errors
    ///
    /// The first failing call's error.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        let loaded = tokio::try_join!(
            me::fetch_me(&self.client),
            me::fetch_assignments(&self.client),
            reports::list_reports(&self.client),
        );
        let (profile, codes, list) = self.track(loaded)?;
        info!(reports = list.len(), countries = codes.len(), "dashboard loaded");
        self.state.apply_load(&profile, &codes, list);
        Ok(())
    }

    /// Save the profile form if it changed. Returns whether a save was sent.
    ///
    /// # Errors
    ///
    /// Whatever the call returns; the snapshot is kept so the form stays dirty.
    pub async fn save_profile(&mut self) -> Result<bool, ApiError> {
        if !self.state.can_save_profile() {
            return Ok(false);
        }
        let update = self.state.profile.to_update();
        let result = me::update_profile(&self.client, &update).await;
        self.track(result)?;
        self.state.profile_saved();
        Ok(true)
    }

    /// Save the country picks if they changed. Returns whether a save was sent.
    ///
    /// # Errors
    ///
    /// Whatever the call returns.
    pub async fn save_countries(&mut self) -> Result<bool, ApiError> {
        if !self.state.can_save_countries() {
            return Ok(false);
        }
        let codes = self.state.countries.to_iso2();
        let result = me::save_assignments(&self.client, &codes).await;
        let saved = self.track(result)?;
        self.state.countries_saved(&saved);
        Ok(true)
    }

    /// Show the report immediately, submit it, then replace the list with the
    /// server's copy. On failure the optimistic entry is removed.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`] for a bad draft (nothing is shown), otherwise the
    /// failing call's error.
    pub async fn add_report(&mut self, draft: &ReportDraft) -> Result<i64, ApiError> {
        draft.validate()?;
        self.state.push_pending(PendingReport {
            temp_id: Uuid::new_v4(),
            country_iso2: draft.country_iso2.clone(),
            title: draft.title.trim().to_owned(),
            content: draft.content.clone(),
            image_count: draft.images.len(),
            has_document: draft.document.is_some(),
        });

        let submitted = async {
            let id = reports::create_report(&self.client, draft).await?;
            let fresh = reports::list_reports(&self.client).await?;
            Ok::<_, ApiError>((id, fresh))
        }
        .await;

        match self.track(submitted) {
            Ok((id, fresh)) => {
                self.state.replace_reports(fresh);
                Ok(id)
            }
            Err(e) => {
                self.state.drop_pending();
                Err(e)
            }
        }
    }

    /// # Errors
    ///
    /// Whatever the call returns; the list is unchanged on failure.
    pub async fn delete_report(&mut self, id: i64) -> Result<(), ApiError> {
        let result = reports::delete_report(&self.client, id).await;
        self.track(result)?;
        self.state.remove_report(id);
        Ok(())
    }

    /// Delete the account and sign out.
    ///
    /// # Errors
    ///
    /// Whatever the call returns.
    pub async fn delete_account(&mut self) -> Result<(), ApiError> {
        let result = me::delete_account(&self.client).await;
        self.track(result)?;
        self.state = DashboardState::default();
        Ok(())
    }

    /// Raise the expired-session banner when a result (or the refresh
    /// coordinator) says the session is gone.
    fn track<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        let expired = matches!(&result, Err(e) if e.is_session_expired());
        if expired || self.client.refresh().session_expired() {
            self.state.session_expired = true;
        }
        result
    }
}
