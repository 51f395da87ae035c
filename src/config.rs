//! Harness configuration
//!
//! Defaults reproduce the CI setup: the deployed game, headless Chrome without
//! sandbox or /dev/shm, isolate-and-continue, text output. A TOML file can
//! override any field; command-line flags override the file.

use crate::browser::{ConnectionMode, LaunchOptions};
use crate::error::{HarnessError, Result};
use crate::game::GameSelectors;
use crate::harness::FailurePolicy;
use crate::report::OutputFormat;
use crate::sync::{Backoff, SyncStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TARGET_URL: &str = "http://18.212.65.223:8081/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub target_url: String,
    pub browser: BrowserSettings,
    /// Upper bound for one CDP request or page load
    pub action_timeout_ms: u64,
    pub sync: SyncSettings,
    pub policy: FailurePolicy,
    pub output: OutputFormat,
    pub report_path: Option<PathBuf>,
    pub screenshot_dir: Option<PathBuf>,
    pub selectors: GameSelectors,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            browser: BrowserSettings::default(),
            action_timeout_ms: 30_000,
            sync: SyncSettings::default(),
            policy: FailurePolicy::Continue,
            output: OutputFormat::Text,
            report_path: None,
            screenshot_dir: None,
            selectors: GameSelectors::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub no_sandbox: bool,
    pub disable_dev_shm_usage: bool,
    pub chrome_path: Option<String>,
    /// Attach to a running Chrome instead of launching one
    pub debug_port: Option<u16>,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: true,
            disable_dev_shm_usage: true,
            chrome_path: None,
            debug_port: None,
            window_width: None,
            window_height: None,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Poll the expected post-condition with exponential backoff
    #[default]
    Poll,
    /// Sleep a fixed time after each action
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub mode: SyncMode,
    pub poll_initial_ms: u64,
    pub poll_max_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub poll_multiplier: f64,
    /// Per-card budget while waiting for the game-over modal
    pub card_flip_timeout_ms: u64,
    pub fixed_action_ms: u64,
    pub fixed_reload_ms: u64,
    pub fixed_card_flip_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            mode: SyncMode::Poll,
            poll_initial_ms: 50,
            poll_max_interval_ms: 500,
            poll_timeout_ms: 5_000,
            poll_multiplier: 2.0,
            card_flip_timeout_ms: 800,
            fixed_action_ms: 1_000,
            fixed_reload_ms: 500,
            fixed_card_flip_ms: 800,
        }
    }
}

impl HarnessConfig {
    /// Load a TOML config file; missing fields keep their defaults
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            HarnessError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        let url = self.target_url.trim();
        if url.is_empty() {
            return Err(HarnessError::Config("target_url cannot be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://"))
        {
            return Err(HarnessError::Config(format!(
                "target_url must be an http(s) or file URL, got '{}'",
                url
            )));
        }
        if self.action_timeout_ms == 0 {
            return Err(HarnessError::Config(
                "action_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.sync.mode == SyncMode::Poll {
            if self.sync.poll_timeout_ms == 0
                || self.sync.poll_initial_ms == 0
                || self.sync.poll_max_interval_ms == 0
            {
                return Err(HarnessError::Config(
                    "poll_timeout_ms, poll_initial_ms and poll_max_interval_ms must be greater than zero"
                        .to_string(),
                ));
            }
            if !self.sync.poll_multiplier.is_finite() || self.sync.poll_multiplier < 1.0 {
                return Err(HarnessError::Config(format!(
                    "poll_multiplier must be a finite number of at least 1.0, got {}",
                    self.sync.poll_multiplier
                )));
            }
        }
        Ok(())
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        let mode = match self.browser.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.browser.chrome_path.clone(),
                no_sandbox: self.browser.no_sandbox,
                headless: self.browser.headless,
            },
        };

        LaunchOptions {
            mode,
            disable_dev_shm_usage: self.browser.disable_dev_shm_usage,
            window_size: self.browser.window_width.zip(self.browser.window_height),
            extra_args: self.browser.extra_args.clone(),
            action_timeout: self.action_timeout(),
        }
    }

    pub fn sync_strategy(&self) -> SyncStrategy {
        let sync = &self.sync;
        match sync.mode {
            SyncMode::Fixed => SyncStrategy::Fixed {
                action: Duration::from_millis(sync.fixed_action_ms),
                reload: Duration::from_millis(sync.fixed_reload_ms),
                card_flip: Duration::from_millis(sync.fixed_card_flip_ms),
            },
            SyncMode::Poll => SyncStrategy::Poll {
                backoff: Backoff {
                    initial: Duration::from_millis(sync.poll_initial_ms),
                    max_interval: Duration::from_millis(sync.poll_max_interval_ms),
                    timeout: Duration::from_millis(sync.poll_timeout_ms),
                    multiplier: sync.poll_multiplier,
                },
                card_flip_timeout: Duration::from_millis(sync.card_flip_timeout_ms),
            },
        }
    }
}
