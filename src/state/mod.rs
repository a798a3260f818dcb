//! Front-end state kept between calls: the dashboard forms and the country panel.
//!
//! Nothing here performs I/O; the `services` modules drive these types.

pub mod country_panel;
pub mod dashboard;

pub use country_panel::{CountryPanel, MissionaryCard, Section};
pub use dashboard::{CountrySelection, DashboardState, PendingReport, ProfileForm, ReportEntry};
