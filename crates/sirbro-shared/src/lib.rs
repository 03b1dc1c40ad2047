//! # sirbro-shared
//!
//! Core of the SirBro invite-link redirector:
//! - [`platform`] classifies the visitor's user agent
//! - [`redact`] makes tokens safe to log
//! - [`deeplink`] builds custom-scheme and Android intent URLs
//! - [`orchestrator`] holds the invite and magic-login state machines
//! - [`session`] drives a flow on tokio, racing the fallback timer against
//!   page visibility

pub mod auth;
pub mod constants;
pub mod deeplink;
pub mod error;
pub mod i18n;
pub mod magic;
pub mod orchestrator;
pub mod platform;
pub mod redact;
pub mod session;
pub mod types;
