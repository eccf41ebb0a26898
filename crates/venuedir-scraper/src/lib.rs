pub mod activation;
pub mod aggregate;
pub mod cards;
pub mod collector;
pub mod consent;
pub mod error;
pub mod extraction;
pub mod page;
pub mod payload;
pub mod scroll;
pub mod types;

#[cfg(test)]
mod fake_page;

pub use activation::{activate_directory_tab, click_view_all};
pub use aggregate::aggregate;
pub use cards::parse_cards;
pub use collector::{ResponseCollector, Sentinel};
pub use consent::{AcceptAllConsent, ConsentHandler};
pub use error::{PageError, PayloadError, ScraperError};
pub use extraction::{DirectoryScraper, ScrapeOptions};
pub use page::chromium::{BrowserOptions, ChromiumPage, ChromiumSession};
pub use page::{DirectoryPage, Locator, PageProvider};
pub use payload::parse_payload;
pub use scroll::{scroll_until_complete, ScrollObserver, ScrollOptions};
pub use types::{DirectoryCard, DirectoryScrape, ScrollTelemetry};
