pub mod browser;
pub mod config;
pub mod error;
pub mod game;
pub mod harness;
pub mod page;
pub mod report;
pub mod suite;
pub mod sync;

//  Re-export commonly used items
pub use browser::{ChromeDriver, ConnectionMode, LaunchOptions, Locator};
pub use config::{HarnessConfig, SyncMode, DEFAULT_TARGET_URL};
pub use error::{CheckFailure, HarnessError};
pub use game::{Difficulty, GameSelectors};
pub use harness::{
    Check, CheckOutcome, CheckResult, CheckStatus, FailurePolicy, Harness, RunReport, Transcript,
};
pub use page::{PageDriver, Session};
pub use report::OutputFormat;
pub use suite::{CheckId, GameCheck, GameSuite};
pub use sync::{Backoff, SyncStrategy};
