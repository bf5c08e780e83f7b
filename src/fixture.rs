//! YAML page fixtures.
//!
//! A fixture lists reviews as plain data; [`PageFixture::build`] lays them
//! out top to bottom in the markup dialect of the chosen site so the
//! extractors see what they would see on the live page.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentinel_extractor::{SiteExtractor, UnknownSite};
use sentinel_page_dom::{Document, Element, PageError, Rect, Viewport};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("reading fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing fixture: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Site(#[from] UnknownSite),
    #[error("cannot tell the site from `{0}`; pass --site")]
    UndetectedSite(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Vertical offset of the first review.
    pub top: f64,
    pub review_height: f64,
    pub gap: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            top: 120.0,
            review_height: 180.0,
            gap: 24.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            width: viewport.width,
            height: viewport.height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewFixture {
    pub text: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageFixture {
    pub url: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub viewport: ViewportSize,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub reviews: Vec<ReviewFixture>,
}

/// A built page and its review elements in document order.
pub struct FixturePage {
    pub document: Document,
    pub site: SiteExtractor,
    pub reviews: Vec<Element>,
}

impl PageFixture {
    pub fn from_yaml(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    /// `explicit` wins, then the fixture's `site`, then the URL host.
    pub fn resolve_site(
        &self,
        explicit: Option<SiteExtractor>,
        document: &Document,
    ) -> Result<SiteExtractor, FixtureError> {
        if let Some(site) = explicit {
            return Ok(site);
        }
        if let Some(name) = &self.site {
            return Ok(name.parse()?);
        }
        SiteExtractor::for_document(document)
            .ok_or_else(|| FixtureError::UndetectedSite(self.url.clone()))
    }

    pub fn build(&self, site: Option<SiteExtractor>) -> Result<FixturePage, FixtureError> {
        let document = Document::new(
            &self.url,
            Viewport::new(self.viewport.width, self.viewport.height),
        )?;
        let site = self.resolve_site(site, &document)?;
        let width = document.viewport().width;
        let list = match site {
            SiteExtractor::Amazon => document.create_element("div").with_id("cm_cr-review_list"),
            SiteExtractor::Flipkart => document.create_element("div").with_class("cPHDOP"),
        };
        document.body().append_child(&list);

        let mut reviews = Vec::with_capacity(self.reviews.len());
        for (index, review) in self.reviews.iter().enumerate() {
            let element = match site {
                SiteExtractor::Amazon => amazon_review(&document, review),
                SiteExtractor::Flipkart => flipkart_card(&document, review),
            };
            let y = self.layout.top + index as f64 * (self.layout.review_height + self.layout.gap);
            element.set_rect(Rect::new(0.0, y, width, self.layout.review_height));
            list.append_child(&element);
            reviews.push(element);
        }
        Ok(FixturePage {
            document,
            site,
            reviews,
        })
    }
}

fn amazon_review(doc: &Document, review: &ReviewFixture) -> Element {
    let root = doc.create_element("div").with_attr("data-hook", "review");
    if let Some(author) = &review.author {
        let name = doc
            .create_element("span")
            .with_class("a-profile-name")
            .with_text(author.as_str());
        root.append_child(&name);
    }
    if let Some(rating) = review.rating {
        let stars = doc
            .create_element("i")
            .with_attr("data-hook", "review-star-rating");
        stars.append_child(
            &doc.create_element("span")
                .with_class("a-icon-alt")
                .with_text(format!("{rating:.1} out of 5 stars")),
        );
        root.append_child(&stars);
    }
    let body = doc.create_element("span").with_attr("data-hook", "review-body");
    body.append_child(&doc.create_element("span").with_text(review.text.as_str()));
    root.append_child(&body);
    let comments = doc.create_element("div").with_class("review-comments");
    comments.append_child(&doc.create_element("a").with_text("Report"));
    root.append_child(&comments);
    root
}

fn flipkart_card(doc: &Document, review: &ReviewFixture) -> Element {
    let card = doc.create_element("div").with_class("RcXBOT");
    let header = doc.create_element("div").with_class("XQDdHH");
    if let Some(rating) = review.rating {
        header.set_text(format!("{rating}"));
    }
    card.append_child(&header);
    let block = doc.create_element("div").with_class("ZmyHeo");
    block.append_child(&doc.create_element("div").with_text(review.text.as_str()));
    card.append_child(&block);
    let footer = doc.create_element("div").with_class("_23BI2I");
    if let Some(author) = &review.author {
        footer.append_child(&doc.create_element("p").with_text(author.as_str()));
    }
    footer.append_child(&doc.create_element("p").with_text("Certified Buyer"));
    card.append_child(&footer);
    card
}
