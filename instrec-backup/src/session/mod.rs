//! Navigable browser session
//!
//! The portal is driven through a single browser session. Components receive it
//! as `&mut S` so only one caller can drive it at a time; the trait methods
//! themselves take `&self` so bounded polls can borrow the session inside
//! closures.

pub mod webdriver;

use std::time::Duration;
use thiserror::Error;

pub use webdriver::{WebDriverConfig, WebDriverSession};

/// Navigable session errors
#[derive(Debug, Error)]
pub enum DriverError {
    /// Transport-level failure talking to the driver
    #[error("Network error: {0}")]
    Network(String),

    /// Driver reported a protocol error
    #[error("WebDriver error {0}: {1}")]
    Protocol(String, String),

    /// No element matched the selector
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// An element handle no longer refers to the current page
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// Unexpected response payload
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Element locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Id(String),
    XPath(String),
    Css(String),
}

impl Selector {
    pub fn id(value: impl Into<String>) -> Self {
        Selector::Id(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    /// The raw locator value
    pub fn value(&self) -> &str {
        match self {
            Selector::Id(v) | Selector::XPath(v) | Selector::Css(v) => v,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "id={}", v),
            Selector::XPath(v) => write!(f, "xpath={}", v),
            Selector::Css(v) => write!(f, "css={}", v),
        }
    }
}

/// Opaque reference to an element on the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// A browser session positioned on some page
#[async_trait::async_trait]
pub trait NavigableSession: Send + Sync {
    /// Load `url` in the current tab
    async fn navigate_to(&self, url: &str) -> DriverResult<()>;

    /// All elements currently matching `selector` (possibly empty)
    async fn find_elements(&self, selector: &Selector) -> DriverResult<Vec<ElementHandle>>;

    /// Whether `selector` matches within `timeout`; lookup errors count as absent
    async fn element_exists(&self, selector: &Selector, timeout: Duration) -> bool;

    /// Attribute of the first element matching `selector`
    async fn get_attribute(&self, selector: &Selector, name: &str) -> DriverResult<Option<String>>;

    /// Visible text of the first element matching `selector` within `timeout`
    async fn get_text(&self, selector: &Selector, timeout: Duration) -> DriverResult<Option<String>>;

    /// Replace the value of an input
    async fn input_text(&self, selector: &Selector, value: &str) -> DriverResult<()>;

    /// Click the first element matching `selector`
    async fn click_element(&self, selector: &Selector) -> DriverResult<()>;

    /// Choose the option with visible text `label` in a select control
    async fn select_option(&self, selector: &Selector, label: &str) -> DriverResult<()>;

    async fn current_url(&self) -> DriverResult<String>;

    async fn element_attribute(&self, element: &ElementHandle, name: &str)
        -> DriverResult<Option<String>>;

    async fn element_text(&self, element: &ElementHandle) -> DriverResult<String>;
}
