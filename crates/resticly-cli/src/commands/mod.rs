//! Command handlers grouped by page.

pub(crate) mod backups;
pub(crate) mod dashboard;
pub(crate) mod preferences;
pub(crate) mod repositories;
pub(crate) mod settings;
pub(crate) mod snapshots;
pub(crate) mod tasks;
