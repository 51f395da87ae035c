//! Browser automation boundary
//!
//! `PageDriver` is everything the checks are allowed to do with a page.
//! `ChromeDriver` implements it over CDP; tests implement it in memory.

use crate::browser::Locator;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Handle to one element of the current document
    type Element: Send + Sync;

    /// Navigate to `url` and wait for the load event
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the current document
    async fn reload(&self) -> Result<()>;

    /// First element matching the locator, `ElementNotFound` otherwise
    async fn find_element(&self, locator: &Locator) -> Result<Self::Element>;

    /// All elements matching the locator (possibly none)
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Self::Element>>;

    /// First descendant of `parent` matching the locator
    async fn find_child(&self, parent: &Self::Element, locator: &Locator)
        -> Result<Self::Element>;

    /// Rendered text of the element
    async fn text(&self, element: &Self::Element) -> Result<String>;

    /// Markup inside the element
    async fn inner_html(&self, element: &Self::Element) -> Result<String>;

    /// Attribute value, `None` when the attribute is absent
    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    /// Whether the element currently occupies visible space on the page
    async fn is_displayed(&self, element: &Self::Element) -> Result<bool>;

    /// PNG capture of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Suspend the calling sequence for `duration`
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A page that owns its browser and must be released exactly once
#[async_trait]
pub trait Session: PageDriver + Sized {
    async fn close(self) -> Result<()>;
}
