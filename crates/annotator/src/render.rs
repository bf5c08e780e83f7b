//! Inline badges projected from element state.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use sentinel_core_types::PredictionResponse;
use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::{Document, Element, Selector};
use sentinel_scheduler::ResultSink;

use crate::modal::{ModalContent, ModalService};

pub const SLOT_CLASS: &str = "frd-inline-slot";
pub const BADGE_CLASS: &str = "frd-badge";
pub const BADGE_TEXT_CLASS: &str = "frd-badge-text";
pub const LOADING_CLASS: &str = "frd-badge--loading";
pub const ERROR_CLASS: &str = "frd-badge--error";

static SLOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".frd-inline-slot").expect("valid slot selector"));

/// Label and colour for a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub label: &'static str,
    pub color: &'static str,
    pub class: &'static str,
}

impl Verdict {
    pub const LIKELY_FAKE: Verdict = Verdict {
        label: "Likely Fake",
        color: "#dc3545",
        class: "frd-badge--red",
    };
    pub const SUSPICIOUS: Verdict = Verdict {
        label: "Suspicious",
        color: "#ffc107",
        class: "frd-badge--yellow",
    };
    pub const GENUINE: Verdict = Verdict {
        label: "Genuine",
        color: "#28a745",
        class: "frd-badge--green",
    };

    /// `> 0.8` likely fake, `> 0.5` suspicious, anything else genuine.
    pub fn from_score(score: f64) -> Verdict {
        if score > 0.8 {
            Verdict::LIKELY_FAKE
        } else if score > 0.5 {
            Verdict::SUSPICIOUS
        } else {
            Verdict::GENUINE
        }
    }
}

/// `score * 100` with a fixed number of decimals. Halves round away from
/// zero, so 0.125 shows as 13.
pub fn format_percent(score: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (score * 100.0 * scale).round() / scale;
    format!("{:.*}", decimals, rounded)
}

/// Renders loading, result and error badges into per-review slots.
pub struct ResultRenderer {
    document: Document,
    extractor: SiteExtractor,
    modal: Arc<dyn ModalService>,
}

impl ResultRenderer {
    pub fn new(document: Document, extractor: SiteExtractor, modal: Arc<dyn ModalService>) -> Self {
        Self {
            document,
            extractor,
            modal,
        }
    }

    /// The review's slot, created at the injection point on first use.
    pub fn slot_for(&self, review: &Element) -> Element {
        if let Some(existing) = review.select_first(&SLOT) {
            return existing;
        }
        let slot = self.document.create_element("span").with_class(SLOT_CLASS);
        self.extractor.injection_point(review).prepend_child(&slot);
        slot
    }

    pub fn render_loading(&self, slot: &Element) {
        let badge = self
            .document
            .create_element("span")
            .with_class(BADGE_CLASS)
            .with_class(LOADING_CLASS)
            .with_attr("title", "Analyzing review");
        badge.append_child(
            &self
                .document
                .create_element("span")
                .with_class("frd-mini-spinner")
                .with_attr("aria-hidden", "true"),
        );
        badge.append_child(&self.text("Analyzing"));
        slot.replace_children(&[badge]);
    }

    pub fn render_score(&self, slot: &Element, score: f64) {
        let verdict = Verdict::from_score(score);
        let pct = format_percent(score, 0);
        let badge = self
            .document
            .create_element("button")
            .with_class(BADGE_CLASS)
            .with_class(verdict.class)
            .with_attr("type", "button")
            .with_attr("title", format!("Fake score: {pct}% - {}", verdict.label))
            .with_attr(
                "aria-label",
                format!("Fake score {pct} percent, {}", verdict.label),
            );
        badge.append_child(&self.document.create_element("span").with_class("frd-dot"));
        badge.append_child(&self.text(&format!("{pct}% · {}", verdict.label)));
        badge.append_child(
            &self
                .document
                .create_element("span")
                .with_class("frd-badge-more")
                .with_attr("aria-hidden", "true")
                .with_text("Details"),
        );

        let modal = Arc::clone(&self.modal);
        badge.set_on_click(Arc::new(move || {
            modal.show(ModalContent::Detail(PredictionResponse::score(score)));
        }));
        slot.replace_children(&[badge]);
    }

    pub fn render_error(&self, slot: &Element, message: &str) {
        let badge = self
            .document
            .create_element("span")
            .with_class(BADGE_CLASS)
            .with_class(ERROR_CLASS)
            .with_attr("title", message);
        badge.append_child(&self.document.create_element("span").with_class("frd-dot"));
        badge.append_child(&self.text("Error"));
        slot.replace_children(&[badge]);
    }

    pub fn render(&self, slot: &Element, response: &PredictionResponse) {
        match response {
            PredictionResponse::Score { score } => self.render_score(slot, *score),
            PredictionResponse::Error { error } => {
                let message = if error.is_empty() { "Prediction error" } else { error };
                self.render_error(slot, message)
            }
        }
    }

    fn text(&self, text: &str) -> Element {
        self.document
            .create_element("span")
            .with_class(BADGE_TEXT_CLASS)
            .with_text(text)
    }
}

impl ResultSink for ResultRenderer {
    fn settled(&self, element: &Element, slot: Option<Element>, response: &PredictionResponse) {
        let Some(slot) = slot else {
            debug!(target: "sentinel.render", node = %element.id(), "no slot left, skipping render");
            return;
        };
        if !element.is_connected() {
            debug!(target: "sentinel.render", node = %element.id(), "review left the page");
            return;
        }
        self.render(&slot, response);
    }
}

/// Reads the badge currently shown in a slot: its text and class list.
pub fn badge_of(slot: &Element) -> Option<(String, String)> {
    let badge = slot.children().into_iter().find(|el| el.has_class(BADGE_CLASS))?;
    let text = badge
        .children()
        .into_iter()
        .find(|el| el.has_class(BADGE_TEXT_CLASS))
        .map(|el| el.text_content())
        .unwrap_or_default();
    Some((text, badge.class_name()))
}
