//! PagerDuty `oncalls` API client.
//!
//! Fetches the current on-call assignment for a configured escalation
//! policy and schedule, and normalizes the first returned entry into an
//! [`Assignment`] with derived IRC/Slack contact handles.

pub mod assignment;
pub mod client;

pub use assignment::Assignment;
pub use client::{FetchError, PagerDutyClient};
