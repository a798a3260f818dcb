//! Dashboard state: the profile form, the country picker, and the report list.
//!
//! DESIGN
//! ======
//! Each editable section keeps a snapshot of what was last loaded or saved.
//! "Can save?" is a comparison against that snapshot, so saving a form and
//! then typing the old values back disables the button again.
//!
//! Reports are optimistic: a pending entry appears immediately under a
//! temporary id and the whole list is replaced by the server's copy once the
//! create call and re-fetch succeed.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use serde::Serialize;
use uuid::Uuid;

use crate::catalog;
use crate::types::{Me, ProfileUpdate, Report};

// =============================================================================
// PROFILE
// =============================================================================

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub bio: String,
    pub website: String,
}

impl ProfileForm {
    /// Seed the form from `/api/me`. Plain users get only their email.
    #[must_use]
    pub fn from_me(me: &Me) -> Self {
        let Some(profile) = &me.missionary else {
            return Self { email: me.email.clone(), ..Self::default() };
        };
        Self {
            name: profile.display_name.clone().unwrap_or_default(),
            email: me.email.clone(),
            avatar_url: profile.avatar_url.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
            website: profile.website.clone().unwrap_or_default(),
        }
    }

    /// Equal after trimming every field.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.fields().iter().zip(other.fields()).all(|(a, b)| a.trim() == b.trim())
    }

    #[must_use]
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            display_name: self.name.clone(),
            email: self.email.clone(),
            avatar_url: self.avatar_url.clone(),
            bio: self.bio.clone(),
            website: self.website.clone(),
        }
    }

    fn fields(&self) -> [&str; 5] {
        [&self.name, &self.email, &self.avatar_url, &self.bio, &self.website]
    }
}

// =============================================================================
// COUNTRIES
// =============================================================================

/// Country names the missionary serves, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountrySelection {
    names: Vec<String>,
}

impl CountrySelection {
    /// From server ISO2 codes; known codes become names, anything else is kept.
    #[must_use]
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Self {
        Self { names: codes.iter().map(|code| catalog::display_name(code.as_ref())).collect() }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Add `name` unless it is already selected. Returns whether it was added.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.names.iter().any(|n| n == name) {
            return false;
        }
        self.names.push(name.to_owned());
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    /// ISO2 codes for the selected names. An entry that is already a code
    /// (an assignment the catalog cannot name) is sent back unchanged; other
    /// unknown names are dropped.
    #[must_use]
    pub fn to_iso2(&self) -> Vec<String> {
        self.names
            .iter()
            .filter_map(|name| {
                catalog::iso2_for_name(name)
                    .map(str::to_owned)
                    .or_else(|| catalog::normalize_iso2(name))
            })
            .collect()
    }

    /// Same names regardless of order.
    #[must_use]
    pub fn same_set(&self, other: &Self) -> bool {
        let mut mine = self.names.clone();
        let mut theirs = other.names.clone();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// A report shown before the server has confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReport {
    pub temp_id: Uuid,
    pub country_iso2: String,
    pub title: String,
    pub content: String,
    pub image_count: usize,
    pub has_document: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Saved(Report),
    Pending(PendingReport),
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardState {
    pub profile: ProfileForm,
    pub countries: CountrySelection,
    saved_profile: Option<ProfileForm>,
    saved_countries: Option<CountrySelection>,
    reports: Vec<ReportEntry>,
    /// Show the "session expired, sign in again" banner.
    pub session_expired: bool,
}

impl DashboardState {
    /// Adopt a fresh load and take new snapshots.
    pub fn apply_load(&mut self, me: &Me, assignment_codes: &[String], reports: Vec<Report>) {
        self.profile = ProfileForm::from_me(me);
        self.countries = CountrySelection::from_codes(assignment_codes);
        self.saved_profile = Some(self.profile.clone());
        self.saved_countries = Some(self.countries.clone());
        self.replace_reports(reports);
    }

    /// True once loaded and the form differs from the last snapshot.
    #[must_use]
    pub fn can_save_profile(&self) -> bool {
        self.saved_profile.as_ref().is_some_and(|saved| !saved.same_as(&self.profile))
    }

    pub fn profile_saved(&mut self) {
        self.saved_profile = Some(self.profile.clone());
    }

    #[must_use]
    pub fn can_save_countries(&self) -> bool {
        self.saved_countries.as_ref().is_some_and(|saved| !saved.same_set(&self.countries))
    }

    /// Adopt the codes the server stored and snapshot them.
    pub fn countries_saved<S: AsRef<str>>(&mut self, codes: &[S]) {
        self.countries = CountrySelection::from_codes(codes);
        self.saved_countries = Some(self.countries.clone());
    }

    /// Insert an optimistic entry at the top and return its temporary id.
    pub fn push_pending(&mut self, pending: PendingReport) -> Uuid {
        let id = pending.temp_id;
        self.reports.insert(0, ReportEntry::Pending(pending));
        id
    }

    /// Replace every entry, pending ones included, with the server's list.
    pub fn replace_reports(&mut self, reports: Vec<Report>) {
        self.reports = reports.into_iter().map(ReportEntry::Saved).collect();
    }

    pub fn drop_pending(&mut self) {
        self.reports.retain(|entry| matches!(entry, ReportEntry::Saved(_)));
    }

    pub fn remove_report(&mut self, id: i64) {
        self.reports
            .retain(|entry| !matches!(entry, ReportEntry::Saved(report) if report.id == id));
    }

    #[must_use]
    pub fn reports(&self) -> &[ReportEntry] {
        &self.reports
    }

    /// Pending entries first, then saved reports newest first. Reports
    /// without a timestamp sort last.
    #[must_use]
    pub fn reports_newest_first(&self) -> Vec<&ReportEntry> {
        let mut entries: Vec<&ReportEntry> = self.reports.iter().collect();
        entries.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        entries
    }
}

/// Pending entries rank above any timestamp; ISO 8601 strings compare in time order.
fn sort_key(entry: &ReportEntry) -> (bool, Option<&str>) {
    match entry {
        ReportEntry::Pending(_) => (true, None),
        ReportEntry::Saved(report) => (false, report.created_at.as_deref()),
    }
}
