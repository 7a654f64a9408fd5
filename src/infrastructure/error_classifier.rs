//! Failure classification for page automation errors
//!
//! Maps raw automation failures onto the fixed [`ErrorClass`] taxonomy.
//! Classification is message based because CDP and the browser report most
//! transport problems only as text (`net::ERR_CONNECTION_REFUSED`, ...).

use tracing::debug;

use crate::domain::{ErrorClass, ScrapeError};
use crate::infrastructure::page_session::PageError;

const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline has elapsed"];

const NETWORK_MARKERS: &[&str] = &[
    "net::err",
    "econnrefused",
    "econnreset",
    "connection refused",
    "connection reset",
    "connection closed",
    "dns",
    "name not resolved",
    "websocket",
    "broken pipe",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub const fn new() -> Self {
        Self
    }

    /// Classifies free-form error text. Never yields `NotFound`; that class
    /// only comes from explicit page detection.
    pub fn classify_message(&self, message: &str) -> ErrorClass {
        let lower = message.to_lowercase();
        if TIMEOUT_MARKERS.iter().any(|marker| lower.contains(marker)) {
            ErrorClass::Timeout
        } else if NETWORK_MARKERS.iter().any(|marker| lower.contains(marker)) {
            ErrorClass::Network
        } else {
            ErrorClass::Unclassified
        }
    }

    pub fn classify_page_error(&self, error: &PageError) -> ErrorClass {
        match error {
            PageError::Timeout { .. } => ErrorClass::Timeout,
            other => self.classify_message(&other.to_string()),
        }
    }

    /// Converts an automation failure into the per-item error reported to the driver.
    pub fn to_scrape_error(&self, error: &PageError) -> ScrapeError {
        let class = self.classify_page_error(error);
        debug!(%class, "Classified page error: {}", error);
        match (class, error) {
            (ErrorClass::Timeout, PageError::Timeout { operation, after }) => {
                ScrapeError::timeout(operation, format!("no result after {}ms", after.as_millis()))
            }
            (ErrorClass::Timeout, other) => ScrapeError::timeout("page operation", other.to_string()),
            (ErrorClass::Network, other) => ScrapeError::Network {
                message: other.to_string(),
            },
            (_, other) => ScrapeError::Unclassified {
                message: other.to_string(),
            },
        }
    }
}

impl From<PageError> for ScrapeError {
    fn from(error: PageError) -> Self {
        ErrorClassifier::new().to_scrape_error(&error)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Navigation timeout of 30000 ms exceeded", ErrorClass::Timeout)]
    #[case("Request timed out.", ErrorClass::Timeout)]
    #[case("net::ERR_NAME_NOT_RESOLVED at https://www.pokemon-card.com", ErrorClass::Network)]
    #[case("connect ECONNREFUSED 127.0.0.1:9222", ErrorClass::Network)]
    #[case("Cannot read properties of undefined (reading 'textContent')", ErrorClass::Unclassified)]
    fn classifies_messages(#[case] message: &str, #[case] expected: ErrorClass) {
        assert_eq!(ErrorClassifier::new().classify_message(message), expected);
    }

    #[test]
    fn elapsed_bound_is_timeout_regardless_of_text() {
        let error = PageError::Timeout {
            operation: "navigation".into(),
            after: Duration::from_secs(30),
        };
        let scrape = ScrapeError::from(error);
        assert_eq!(scrape.class(), ErrorClass::Timeout);
        assert!(!scrape.is_terminal());
    }

    #[test]
    fn navigation_failure_with_net_error_is_network() {
        let error = PageError::Navigation {
            url: "https://www.pokemon-card.com/".into(),
            message: "net::ERR_CONNECTION_RESET".into(),
        };
        assert_eq!(ScrapeError::from(error).class(), ErrorClass::Network);
    }
}
