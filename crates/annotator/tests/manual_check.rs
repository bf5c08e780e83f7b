use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use extensions_bridge::{BridgeError, ScoringClient};
use sentinel_annotator::manual::{BUTTON_LABEL, NO_TEXT_NOTICE};
use sentinel_annotator::{ManualCheck, ModalContent, ModalService, PageModal};
use sentinel_core_types::{PredictionRequest, PredictionResponse};
use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::{Document, Element, Viewport};

struct FixedClient(Result<PredictionResponse, BridgeError>);

#[async_trait]
impl ScoringClient for FixedClient {
    async fn predict(&self, _request: &PredictionRequest) -> Result<PredictionResponse, BridgeError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.clone()
    }
}

fn flipkart_card(doc: &Document, body: &str) -> Element {
    let card = doc.create_element("div").with_class("RcXBOT");
    card.append_child(&doc.create_element("div").with_class("XQDdHH").with_text("4"));
    let block = doc.create_element("div").with_class("ZmyHeo");
    block.append_child(&doc.create_element("div").with_text(body));
    card.append_child(&block);
    let footer = doc.create_element("div").with_class("_23BI2I");
    card.append_child(&footer);
    doc.body().append_child(&card);
    card
}

fn setup(
    outcome: Result<PredictionResponse, BridgeError>,
) -> (Document, Arc<PageModal>, Arc<ManualCheck>) {
    let doc = Document::new("https://www.flipkart.com/p/item", Viewport::default()).unwrap();
    let modal = PageModal::new(doc.clone());
    let check = ManualCheck::new(
        doc.clone(),
        SiteExtractor::Flipkart,
        Arc::new(FixedClient(outcome)),
        modal.clone(),
    )
    .unwrap();
    (doc, modal, check)
}

#[tokio::test]
async fn button_is_injected_once_at_the_injection_point() {
    let (doc, _modal, check) = setup(Ok(PredictionResponse::score(0.2)));
    let card = flipkart_card(&doc, "Camera quality is excellent in daylight");

    let button = check.inject(&card).unwrap();
    assert!(check.inject(&card).is_none());
    assert_eq!(button.text_content(), BUTTON_LABEL);
    let footer = doc.query_selector("._23BI2I").unwrap().unwrap();
    assert!(footer.children()[0].ptr_eq(&button));
    assert_eq!(doc.query_selector_all(".frd-button").unwrap().len(), 1);
}

#[tokio::test]
async fn check_shows_the_detail_view() {
    let (doc, modal, check) = setup(Ok(PredictionResponse::score(0.65)));
    let card = flipkart_card(&doc, "Camera quality is excellent in daylight");

    let shown = check.check(&card).await;
    assert_eq!(shown, ModalContent::Detail(PredictionResponse::score(0.65)));
    assert!(modal.is_visible());
    assert!(modal
        .content()
        .text_content()
        .ends_with("This review is rated as Suspicious."));
}

#[tokio::test]
async fn missing_text_is_reported_in_the_modal() {
    let (doc, modal, check) = setup(Ok(PredictionResponse::score(0.1)));
    let card = doc.create_element("div").with_class("RcXBOT");
    doc.body().append_child(&card);

    let shown = check.check(&card).await;
    assert_eq!(shown, ModalContent::Notice(NO_TEXT_NOTICE.to_string()));
    assert_eq!(modal.content().text_content(), NO_TEXT_NOTICE);
}

#[tokio::test]
async fn transport_failure_is_shown_as_an_error_line() {
    let (doc, modal, check) = setup(Err(BridgeError::PortClosed));
    let card = flipkart_card(&doc, "Delivery was late but the product is fine");

    check.check(&card).await;
    assert_eq!(
        modal.content().text_content(),
        "Error: The message port closed before a response was received."
    );
}

#[tokio::test(start_paused = true)]
async fn clicking_the_button_runs_a_check() {
    let (doc, modal, check) = setup(Ok(PredictionResponse::error("Server error: 500")));
    let card = flipkart_card(&doc, "Stopped charging within a month of use");
    let button = check.inject(&card).unwrap();

    assert!(button.click());
    tokio::task::yield_now().await;
    assert!(modal.is_visible());
    assert_eq!(modal.content().text_content(), "Analyzing review...");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        modal.content().text_content(),
        "Analysis Failed Server error: 500 Is the local server running?"
    );
}
