//! Application configuration.
//!
//! Loaded from a TOML file; every section and field is optional and
//! falls back to its default, so a missing config file is a valid
//! setup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use clippilot_browser::SessionConfig;
use clippilot_pipeline::PipelineConfig;

/// Top-level application config.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// State directory override (`~/.clippilot` by default).
    pub state_dir: Option<PathBuf>,
    pub browser: BrowserSection,
    pub pipeline: PipelineConfig,
}

/// `[browser]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub debug_port: u16,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub profile_dir: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            debug_port: defaults.debug_port,
            headless: defaults.headless,
            viewport_width: defaults.viewport_width,
            viewport_height: defaults.viewport_height,
            profile_dir: None,
            extra_args: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolved state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".clippilot"))
                .unwrap_or_else(|| PathBuf::from(".clippilot"))
        })
    }

    /// Path of the durable editor registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.state_dir().join("registry.json")
    }

    /// Session manager configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debug_port: self.browser.debug_port,
            headless: self.browser.headless,
            viewport_width: self.browser.viewport_width,
            viewport_height: self.browser.viewport_height,
            profile_dir: self.browser.profile_dir.clone(),
            download_root: self.state_dir().join("downloads"),
            extra_args: self.browser.extra_args.clone(),
        }
    }

    /// Pipeline configuration with state-relative defaults applied.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut pipeline = self.pipeline.clone();
        // The serde default is a bare relative path; anchor it under
        // the state dir unless the config chose its own.
        if pipeline.debug_dir == PathBuf::from("debug") {
            pipeline.debug_dir = self.state_dir().join("debug");
        }
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_defaults() {
        let app = AppConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(app.browser.debug_port, 9222);
        assert_eq!(app.pipeline.px_per_sec, 30.0);
    }

    #[test]
    fn test_sections_parse() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            state_dir = "/var/lib/clippilot"

            [browser]
            debug_port = 9333
            headless = false

            [pipeline]
            target_duration_secs = 15.0
            "#,
        )
        .unwrap();

        let app = AppConfig::load(&path).unwrap();
        assert_eq!(app.browser.debug_port, 9333);
        assert!(!app.browser.headless);
        assert_eq!(app.pipeline.target_duration_secs, 15.0);
        assert_eq!(app.registry_path(), PathBuf::from("/var/lib/clippilot/registry.json"));
    }

    #[test]
    fn test_debug_dir_anchored_under_state_dir() {
        let app = AppConfig {
            state_dir: Some(PathBuf::from("/srv/clippilot")),
            ..AppConfig::default()
        };
        assert_eq!(app.pipeline_config().debug_dir, PathBuf::from("/srv/clippilot/debug"));
    }
}
