//! Sequential check runner
//!
//! Runs an ordered list of named checks against one page, records one outcome
//! per check and produces a `RunReport`. Checks share page state, so they are
//! never reordered or run concurrently.

use crate::error::{CheckFailure, Result};
use crate::page::{PageDriver, Session};
use crate::report;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// `Ok` carries the detail printed next to a passing check
pub type CheckResult = std::result::Result<String, CheckFailure>;

/// One named assertion against the current page state
#[async_trait]
pub trait Check<P: PageDriver>: Send + Sync {
    fn label(&self) -> &str;

    async fn run(&self, page: &P) -> CheckResult;
}

/// What to do after a check fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and run the next check
    #[default]
    Continue,
    /// Stop at the first failure; the rest are recorded as skipped
    FailFast,
}

/// Where per-check lines are printed while the run is in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transcript {
    #[default]
    Stdout,
    Stderr,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of one check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Position in the run (1-indexed)
    pub index: usize,

    pub label: String,

    pub status: CheckStatus,

    /// Pass detail or failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub duration_ms: u64,

    /// Failure screenshot, when one was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Complete report of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub policy: FailurePolicy,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub results: Vec<CheckOutcome>,
}

impl RunReport {
    pub fn new(target: impl Into<String>, policy: FailurePolicy, total: usize) -> Self {
        Self {
            target: target.into(),
            started_at: Utc::now(),
            policy,
            total,
            passed: 0,
            failed: 0,
            skipped: 0,
            total_duration_ms: 0,
            results: Vec::with_capacity(total),
        }
    }

    /// Add an outcome and update counters
    pub fn add_outcome(&mut self, outcome: CheckOutcome) {
        self.total_duration_ms += outcome.duration_ms;

        match outcome.status {
            CheckStatus::Passed => self.passed += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Skipped => self.skipped += 1,
        }

        self.results.push(outcome);
    }

    /// Checks that actually ran
    pub fn executed(&self) -> usize {
        self.passed + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.passed == self.total
    }

    /// Get success rate as percentage
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total as f64) * 100.0
    }

    pub fn summary_line(&self) -> String {
        if self.skipped > 0 {
            format!(
                "Summary: {} passed, {} failed, {} skipped",
                self.passed, self.failed, self.skipped
            )
        } else {
            format!("Summary: {} passed, {} failed", self.passed, self.failed)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Harness {
    policy: FailurePolicy,
    transcript: Transcript,
    screenshot_dir: Option<PathBuf>,
}

impl Harness {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    /// Save a screenshot into `dir` whenever a check fails
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn emit(&self, line: &str) {
        match self.transcript {
            Transcript::Stdout => println!("{}", line),
            Transcript::Stderr => eprintln!("{}", line),
            Transcript::Off => {}
        }
    }

    /// Run every check in order against an already loaded page
    pub async fn run<P, C>(&self, page: &P, target: &str, checks: &[C]) -> RunReport
    where
        P: PageDriver,
        C: Check<P>,
    {
        let mut report = RunReport::new(target, self.policy, checks.len());
        let mut stopped = false;

        for (i, check) in checks.iter().enumerate() {
            let index = i + 1;

            if stopped {
                let outcome = CheckOutcome {
                    index,
                    label: check.label().to_string(),
                    status: CheckStatus::Skipped,
                    message: None,
                    duration_ms: 0,
                    screenshot: None,
                };
                self.emit(&report::outcome_line(&outcome));
                report.add_outcome(outcome);
                continue;
            }

            log::debug!("Running check {}: {}", index, check.label());
            let start = Instant::now();
            let result = check.run(page).await;
            let duration_ms = duration_millis(start.elapsed());

            let outcome = match result {
                Ok(detail) => {
                    log::info!("Check {} passed: {}", index, check.label());
                    CheckOutcome {
                        index,
                        label: check.label().to_string(),
                        status: CheckStatus::Passed,
                        message: Some(detail),
                        duration_ms,
                        screenshot: None,
                    }
                }
                Err(failure) => {
                    log::warn!("Check {} failed: {}: {}", index, check.label(), failure);
                    let screenshot = self.capture_failure(page, index, check.label()).await;
                    if self.policy == FailurePolicy::FailFast {
                        stopped = true;
                    }
                    CheckOutcome {
                        index,
                        label: check.label().to_string(),
                        status: CheckStatus::Failed,
                        message: Some(failure.to_string()),
                        duration_ms,
                        screenshot,
                    }
                }
            };

            self.emit(&report::outcome_line(&outcome));
            report.add_outcome(outcome);
        }

        report
    }

    /// Load `url`, run the checks and release the session.
    ///
    /// The session is closed exactly once whether navigation failed, checks
    /// failed or everything passed. A navigation failure is returned as an
    /// error before any check runs.
    pub async fn run_session<S, C>(&self, session: S, url: &str, checks: &[C]) -> Result<RunReport>
    where
        S: Session,
        C: Check<S>,
    {
        let outcome = match session.navigate(url).await {
            Ok(()) => Ok(self.run(&session, url, checks).await),
            Err(e) => {
                log::error!("Cannot load {}: {}", url, e);
                Err(e)
            }
        };

        if let Err(e) = session.close().await {
            log::warn!("Failed to close browser session: {}", e);
        }

        outcome
    }

    async fn capture_failure<P: PageDriver>(
        &self,
        page: &P,
        index: usize,
        label: &str,
    ) -> Option<String> {
        let dir = self.screenshot_dir.as_ref()?;
        let path = dir.join(format!("{:02}-{}.png", index, slug(label)));

        let saved = async {
            let data = page.screenshot().await?;
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, data).await?;
            Ok::<_, crate::error::HarnessError>(())
        }
        .await;

        match saved {
            Ok(()) => Some(path.display().to_string()),
            Err(e) => {
                log::warn!("Could not save failure screenshot for check {}: {}", index, e);
                None
            }
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Lowercase, hyphen-separated file-name form of a label
fn slug(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, status: CheckStatus, duration_ms: u64) -> CheckOutcome {
        CheckOutcome {
            index,
            label: format!("check {}", index),
            status,
            message: None,
            duration_ms,
            screenshot: None,
        }
    }

    #[test]
    fn test_report_counters() {
        let mut report = RunReport::new("http://localhost", FailurePolicy::Continue, 3);

        report.add_outcome(outcome(1, CheckStatus::Passed, 100));
        report.add_outcome(outcome(2, CheckStatus::Failed, 50));
        report.add_outcome(outcome(3, CheckStatus::Passed, 25));

        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.executed(), 3);
        assert_eq!(report.total_duration_ms, 175);
        assert!(!report.is_success());
        assert_eq!(report.summary_line(), "Summary: 2 passed, 1 failed");

        let success_rate = report.success_rate();
        assert!((success_rate - 66.66666666666667).abs() < 0.0001);
    }

    #[test]
    fn test_summary_mentions_skipped() {
        let mut report = RunReport::new("http://localhost", FailurePolicy::FailFast, 2);
        report.add_outcome(outcome(1, CheckStatus::Failed, 10));
        report.add_outcome(outcome(2, CheckStatus::Skipped, 0));

        assert_eq!(report.executed(), 1);
        assert_eq!(report.summary_line(), "Summary: 0 passed, 1 failed, 1 skipped");
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::new("http://localhost", FailurePolicy::Continue, 0);
        assert_eq!(report.success_rate(), 0.0);
        assert!(report.is_success());
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Hard mode shows 10 cards"), "hard-mode-shows-10-cards");
        assert_eq!(slug("  Score: x/y "), "score-x-y");
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&FailurePolicy::FailFast).unwrap(),
            "\"fail-fast\""
        );
        let parsed: FailurePolicy = serde_json::from_str("\"continue\"").unwrap();
        assert_eq!(parsed, FailurePolicy::Continue);
    }
}
