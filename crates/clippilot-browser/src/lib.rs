//! Chrome session management for the editorial pipeline.
//!
//! One Chrome process serves every job: the [`SessionManager`] launches
//! it on first use, probes it for liveness before every reuse, and
//! replaces it when the probe fails. Each job gets its own page with an
//! isolated download directory.

mod config;
mod error;
mod manager;

pub use config::SessionConfig;
pub use error::BrowserError;
pub use manager::{JobPage, SessionManager};
