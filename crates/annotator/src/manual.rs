//! Per-review "Check Authenticity" button.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::runtime::Handle;
use tracing::{debug, info};

use extensions_bridge::ScoringClient;
use sentinel_core_types::{PredictionResponse, SentinelError};
use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::{Document, Element, Selector};

use crate::modal::{ModalContent, ModalService};

pub const BUTTON_CLASS: &str = "frd-button";
pub const BUTTON_LABEL: &str = "Check Authenticity";
pub const NO_TEXT_NOTICE: &str = "Could not find review text in this element.";

static BUTTON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".frd-button").expect("valid button selector"));

pub struct ManualCheck {
    document: Document,
    extractor: SiteExtractor,
    client: Arc<dyn ScoringClient>,
    modal: Arc<dyn ModalService>,
    runtime: Handle,
}

impl ManualCheck {
    /// Must be called from within a tokio runtime; clicks spawn onto it.
    pub fn new(
        document: Document,
        extractor: SiteExtractor,
        client: Arc<dyn ScoringClient>,
        modal: Arc<dyn ModalService>,
    ) -> Result<Arc<Self>, SentinelError> {
        let runtime = Handle::try_current()
            .map_err(|err| SentinelError::new(format!("manual check needs a runtime: {err}")))?;
        Ok(Arc::new(Self {
            document,
            extractor,
            client,
            modal,
            runtime,
        }))
    }

    /// Adds the button to a review once. Returns the button when one was added.
    pub fn inject(self: &Arc<Self>, review: &Element) -> Option<Element> {
        if review.select_first(&BUTTON).is_some() {
            return None;
        }
        let button = self
            .document
            .create_element("button")
            .with_class(BUTTON_CLASS)
            .with_attr("type", "button")
            .with_text(BUTTON_LABEL);

        let check = Arc::downgrade(self);
        let target = review.downgrade();
        button.set_on_click(Arc::new(move || {
            let (Some(check), Some(review)) = (check.upgrade(), target.upgrade()) else {
                return;
            };
            let runtime = check.runtime.clone();
            runtime.spawn(async move { check.check(&review).await });
        }));

        self.extractor.injection_point(review).prepend_child(&button);
        debug!(target: "sentinel.render", node = %review.id(), "check button injected");
        Some(button)
    }

    /// Scores one review on demand and shows the outcome in the modal.
    pub async fn check(&self, review: &Element) -> ModalContent {
        self.modal.show(ModalContent::loading());
        let content = match self.extractor.prediction_request(review) {
            None => ModalContent::Notice(NO_TEXT_NOTICE.to_string()),
            Some(request) => match self.client.predict(&request).await {
                Ok(response) => ModalContent::Detail(response),
                Err(err) => ModalContent::Notice(format!("Error: {err}")),
            },
        };
        if let ModalContent::Detail(PredictionResponse::Score { score }) = &content {
            info!(target: "sentinel.render", node = %review.id(), score, "manual check scored");
        }
        self.modal.show(content.clone());
        content
    }
}
