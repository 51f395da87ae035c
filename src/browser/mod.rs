pub mod chrome;
pub mod locator;

pub use chrome::{ChromeDriver, ConnectionMode, LaunchOptions};
pub use locator::Locator;
