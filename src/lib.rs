//! Git Slice landing page
//!
//! Renders the static Git Slice marketing page and verifies it with a
//! headless visibility/navigation check: headings, links and sections must
//! be visible, and in-page anchor links must bring their target sections
//! into view.
//!
//! # Layout
//!
//! - [`page`]: the page renderer (fixed feature list, askama template)
//! - [`server`]: a small blocking HTTP server for the rendered page
//! - [`engine`]: a JavaScript-free headless engine (fetch, parse, click)
//! - [`locator`] and [`style`]: element queries and the visibility model
//! - [`check`]: the scripted visibility/navigation check
//!
//! # Example
//!
//! ```no_run
//! use gitslice_landing::{check, server::LandingServer, BrowserConfig, Engine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = LandingServer::bind(Default::default())?.spawn();
//! let mut engine = gitslice_landing::new_engine(BrowserConfig::default())?;
//! let report = check::run_script(&mut engine, &handle.base_url(), &check::landing_script())?;
//! assert!(report.passed);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

pub mod error;
pub use error::{Error, Result};

pub mod check;
pub mod engine;
pub mod locator;
pub mod page;
pub mod server;
pub mod style;

pub use engine::HeadlessEngine;
pub use locator::{Locator, NameMatch, Role};

/// Configuration for the headless engine
///
/// The defaults are conservative: a 30 second load timeout and a user agent
/// that identifies the checker.
///
/// # Examples
///
/// ```
/// let cfg = gitslice_landing::BrowserConfig::default();
/// assert!(cfg.user_agent.contains("gitslice-landing"));
/// ```
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Timeout for page loads in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Fetch `<link rel="stylesheet">` targets when loading over HTTP
    pub load_stylesheets: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (X11; Linux x86_64) gitslice-landing/{}",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_ms: 30000,
            headers: HashMap::new(),
            load_stylesheets: true,
        }
    }
}

/// A textual snapshot of a loaded page
#[derive(Debug, Clone)]
pub struct TextSnapshot {
    /// Page title
    pub title: String,
    /// Extracted body text
    pub text: String,
    /// Current URL, including any fragment
    pub url: String,
}

/// Flattened view of one element matched by a locator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementInfo {
    pub tag: String,
    pub id: Option<String>,
    /// Whitespace-normalized text content
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
}

/// Outcome of clicking a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Same-document fragment navigation; `target` is the fragment (may be empty)
    Fragment { url: String, target: String },
    /// A new document was loaded
    Document { url: String },
    /// A link the engine does not follow (`mailto:` and other schemes)
    External { url: String },
}

/// Core trait for headless engine implementations
pub trait Engine {
    /// Create a new engine instance with the given configuration
    fn new(config: BrowserConfig) -> Result<Self>
    where
        Self: Sized;

    /// Load a URL and wait for the document to be parsed
    fn load_url(&mut self, url: &str) -> Result<()>;

    /// Install `html` as the current document, as if it had been served at `url`
    fn load_html(&mut self, url: &str, html: &str) -> Result<()>;

    /// Current URL including fragment, if a document is loaded
    fn current_url(&self) -> Option<String>;

    /// Identifier of the element most recently scrolled to by fragment navigation
    fn scroll_target(&self) -> Option<&str>;

    /// Raw markup of the current document
    fn html(&self) -> Result<&str>;

    /// Render the current page as a text snapshot
    fn render_text_snapshot(&self) -> Result<TextSnapshot>;

    /// Resolve a locator against the current document
    fn inspect(&self, locator: &Locator) -> Result<Vec<ElementInfo>>;

    /// Click the single element matched by `locator` and follow its link
    fn click(&mut self, locator: &Locator) -> Result<Navigation>;

    /// Register a callback to be invoked when a document finishes loading
    fn on_load<F>(&mut self, cb: F)
    where
        F: Fn(&TextSnapshot) + Send + Sync + 'static;

    // --- Higher-level convenience helpers (default implementations) ---

    /// Number of elements matching `locator`
    fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.inspect(locator)?.len())
    }

    /// Whether at least one element matching `locator` is visible
    fn any_visible(&self, locator: &Locator) -> Result<bool> {
        Ok(self.inspect(locator)?.iter().any(|e| e.visible))
    }

    /// Close the engine and clean up resources
    fn close(self) -> Result<()>;
}

/// Create a new engine instance with the default backend
pub fn new_engine(config: BrowserConfig) -> Result<impl Engine> {
    engine::HeadlessEngine::new(config)
}
