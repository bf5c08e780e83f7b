//! Extraction strategies, one per supported review site.
//!
//! Every strategy answers the same three questions about a review element:
//! what the review says, how many stars it carries, and where inline UI
//! should be attached. None of them fail; missing data yields defaults
//! (empty text, a rating of 5, the element itself as injection point).

mod amazon;
mod flipkart;
mod text;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentinel_core_types::PredictionRequest;
use sentinel_page_dom::{Document, Element};

pub use text::parse_leading_number;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported site `{0}`")]
pub struct UnknownSite(pub String);

/// Closed set of supported review sites.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteExtractor {
    Amazon,
    Flipkart,
}

impl SiteExtractor {
    pub const ALL: [SiteExtractor; 2] = [SiteExtractor::Amazon, SiteExtractor::Flipkart];

    /// Picks the strategy for a page host such as `www.amazon.in`.
    pub fn for_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        let labels: Vec<&str> = host.split('.').collect();
        if labels.contains(&"amazon") {
            Some(SiteExtractor::Amazon)
        } else if labels.contains(&"flipkart") {
            Some(SiteExtractor::Flipkart)
        } else {
            None
        }
    }

    pub fn for_document(document: &Document) -> Option<Self> {
        document.host().and_then(Self::for_host)
    }

    pub fn name(self) -> &'static str {
        match self {
            SiteExtractor::Amazon => "amazon",
            SiteExtractor::Flipkart => "flipkart",
        }
    }

    /// All review elements currently in the page.
    pub fn find_review_elements(self, document: &Document) -> Vec<Element> {
        match self {
            SiteExtractor::Amazon => amazon::find_review_elements(document),
            SiteExtractor::Flipkart => flipkart::find_review_cards(document),
        }
    }

    /// Trimmed plain-text body; empty when nothing usable was found.
    pub fn review_text(self, review: &Element) -> String {
        let text = match self {
            SiteExtractor::Amazon => amazon::review_text(review),
            SiteExtractor::Flipkart => flipkart::review_text(review),
        };
        text.trim().to_string()
    }

    /// Star rating in `[1, 5]`, 5 when none is discoverable.
    pub fn review_rating(self, review: &Element) -> f64 {
        match self {
            SiteExtractor::Amazon => amazon::review_rating(review),
            SiteExtractor::Flipkart => flipkart::review_rating(review),
        }
    }

    /// Node that hosts inline UI for the review.
    pub fn injection_point(self, review: &Element) -> Element {
        let point = match self {
            SiteExtractor::Amazon => amazon::injection_point(review),
            SiteExtractor::Flipkart => flipkart::injection_point(review),
        };
        point.unwrap_or_else(|| review.clone())
    }

    /// Containers whose subtree mutations signal new reviews. Missing
    /// containers are skipped; the body is always last.
    pub fn observe_roots(self, document: &Document) -> Vec<Element> {
        let selectors = match self {
            SiteExtractor::Amazon => amazon::OBSERVE_ROOTS,
            SiteExtractor::Flipkart => flipkart::OBSERVE_ROOTS,
        };
        let mut roots: Vec<Element> = selectors
            .iter()
            .filter_map(|selector| match document.query_selector(selector) {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(target: "sentinel.extractor", %err, "skipping observe root");
                    None
                }
            })
            .collect();
        roots.push(document.body());
        roots
    }

    /// The scoring request for a review, or `None` when it has no text.
    pub fn prediction_request(self, review: &Element) -> Option<PredictionRequest> {
        PredictionRequest::new(self.review_text(review), self.review_rating(review))
    }
}

impl fmt::Display for SiteExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SiteExtractor {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(SiteExtractor::Amazon),
            "flipkart" => Ok(SiteExtractor::Flipkart),
            other => Err(UnknownSite(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_selection() {
        assert_eq!(SiteExtractor::for_host("www.amazon.in"), Some(SiteExtractor::Amazon));
        assert_eq!(SiteExtractor::for_host("smile.amazon.com"), Some(SiteExtractor::Amazon));
        assert_eq!(SiteExtractor::for_host("www.flipkart.com"), Some(SiteExtractor::Flipkart));
        assert_eq!(SiteExtractor::for_host("notamazon.example"), None);
        assert_eq!("Flipkart".parse::<SiteExtractor>(), Ok(SiteExtractor::Flipkart));
        assert!("ebay".parse::<SiteExtractor>().is_err());
    }
}
