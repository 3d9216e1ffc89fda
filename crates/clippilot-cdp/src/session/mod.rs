//! Page session: per-target CDP operations.
//!
//! Split by concern: core dispatch, DOM queries, input synthesis, JS
//! evaluation, navigation.

mod core;
mod dom;
mod input;
mod js;
mod navigation;

pub use core::PageSession;
