//! Session configuration.

use std::path::PathBuf;

/// Configuration for the shared Chrome session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chrome remote-debugging port.
    pub debug_port: u16,
    /// Whether to run Chrome headless.
    pub headless: bool,
    /// Viewport width.
    pub viewport_width: u32,
    /// Viewport height.
    pub viewport_height: u32,
    /// Profile directory; keeps the editor login across restarts.
    pub profile_dir: Option<PathBuf>,
    /// Root under which each job gets its own download directory.
    pub download_root: PathBuf,
    /// Extra Chrome launch flags appended verbatim.
    pub extra_args: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            headless: true,
            viewport_width: 1600,
            viewport_height: 900,
            profile_dir: None,
            download_root: state_dir().join("downloads"),
            extra_args: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// The profile directory, defaulting under the state dir.
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir
            .clone()
            .unwrap_or_else(|| state_dir().join("browser-profile"))
    }

    /// CDP endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}

/// Base state directory (`~/.clippilot`).
pub(crate) fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clippilot")
}
