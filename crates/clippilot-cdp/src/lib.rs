//! Chrome DevTools Protocol client for driving the remote editor UI.
//!
//! This is a pure Rust CDP client: it connects to a Chrome instance
//! started with `--remote-debugging-port` over WebSocket and speaks the
//! CDP JSON-RPC dialect. The surface is deliberately narrow: it covers
//! exactly the operations the editorial pipeline performs against the
//! remote editor page: navigation, DOM queries, synthetic mouse and
//! keyboard input (including stepped drags), JS evaluation, file-input
//! attachment, per-page download routing, and screenshots.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9222").await?;
//! let page = client.new_page(None).await?;
//! page.navigate("https://editor.example.com/session/abc", Duration::from_secs(60)).await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
