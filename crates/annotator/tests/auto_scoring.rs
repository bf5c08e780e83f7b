use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use extensions_bridge::{BridgeError, ScoringClient};
use sentinel_annotator::{badge_of, AutoScorer, AutoScoringOptions, ModalService};
use sentinel_core_types::{ElementStatus, PredictionRequest, PredictionResponse};
use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::{Document, Element, Rect, Selector, Viewport};

/// Answers every review with `score` after 50ms. Texts starting with "fail"
/// reject like a dead bridge.
struct StubClient {
    score: f64,
    calls: Mutex<Vec<PredictionRequest>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl StubClient {
    fn scoring(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ScoringClient for StubClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, BridgeError> {
        self.calls.lock().push(request.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        if request.text.starts_with("fail") {
            return Err(BridgeError::ContextInvalidated);
        }
        Ok(PredictionResponse::score(self.score))
    }
}

struct Page {
    doc: Document,
    list: Element,
}

impl Page {
    fn new() -> Self {
        let doc = Document::new(
            "https://www.amazon.com/product-reviews/B0TEST",
            Viewport::new(1000.0, 800.0),
        )
        .unwrap();
        let list = doc.create_element("div").with_id("cm_cr-review_list");
        doc.body().append_child(&list);
        Self { doc, list }
    }

    /// An Amazon-style review laid out at `y`.
    fn review(&self, body: &str, stars: &str, y: f64) -> Element {
        let doc = &self.doc;
        let review = doc.create_element("div").with_attr("data-hook", "review");
        let rating = doc
            .create_element("i")
            .with_attr("data-hook", "review-star-rating");
        rating.append_child(&doc.create_element("span").with_text(stars));
        let text = doc
            .create_element("span")
            .with_attr("data-hook", "review-body");
        text.append_child(&doc.create_element("span").with_text(body));
        let comments = doc.create_element("div").with_class("review-comments");
        review.append_child(&rating);
        review.append_child(&text);
        review.append_child(&comments);
        review.set_rect(Rect::new(0.0, y, 1000.0, 150.0));
        self.list.append_child(&review);
        review
    }

    fn slots(&self, review: &Element) -> Vec<Element> {
        review.select_all(&Selector::parse(".frd-inline-slot").unwrap())
    }

    fn badge(&self, review: &Element) -> Option<(String, String)> {
        self.slots(review).first().and_then(badge_of)
    }

    fn enable(&self, client: Arc<StubClient>, max_concurrent: usize) -> Arc<AutoScorer> {
        let options = AutoScoringOptions {
            max_concurrent,
            ..AutoScoringOptions::default()
        };
        AutoScorer::enable(self.doc.clone(), SiteExtractor::Amazon, client, options).unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn scored_review_renders_green_badge() {
    let page = Page::new();
    let review = page.review("Great battery life, lasted two days", "5.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.12);
    let scorer = page.enable(client.clone(), 4);

    let (text, class) = page.badge(&review).unwrap();
    assert_eq!(text, "Analyzing");
    assert!(class.contains("frd-badge--loading"));

    scorer.wait_idle().await;
    let (text, class) = page.badge(&review).unwrap();
    assert_eq!(text, "12% · Genuine");
    assert!(class.contains("frd-badge--green"));

    let calls = client.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].text, "Great battery life, lasted two days");
    assert_eq!(calls[0].rating, 5.0);

    let state = scorer.registry().state(review.id()).unwrap();
    assert_eq!(state.status, ElementStatus::Done);
    assert_eq!(state.response, Some(PredictionResponse::score(0.12)));
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn bridge_failure_stays_local_to_its_review() {
    let page = Page::new();
    let broken = page.review("fail: the bridge is gone", "2.0 out of 5 stars", 0.0);
    let healthy = page.review("Fits well and looks sharp", "4.0 out of 5 stars", 200.0);
    let client = StubClient::scoring(0.9);
    let scorer = page.enable(client.clone(), 1);
    scorer.wait_idle().await;

    let (text, class) = page.badge(&broken).unwrap();
    assert_eq!(text, "Error");
    assert!(class.contains("frd-badge--error"));
    let badge = page.slots(&broken)[0].children()[0].clone();
    assert_eq!(
        badge.attr("title").as_deref(),
        Some("Extension context invalidated.")
    );
    assert_eq!(
        scorer.registry().state(broken.id()).unwrap().response,
        Some(PredictionResponse::error("Extension context invalidated."))
    );

    let (text, _) = page.badge(&healthy).unwrap();
    assert_eq!(text, "90% · Likely Fake");
    assert_eq!(client.call_count(), 2);
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn empty_text_is_never_queued_or_loading() {
    let page = Page::new();
    let empty = page.review("   ", "3.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.3);
    let scorer = page.enable(client.clone(), 4);
    tokio::time::sleep(Duration::from_millis(400)).await;
    scorer.wait_idle().await;

    assert!(page.slots(&empty).is_empty());
    assert_eq!(scorer.registry().status(empty.id()), Some(ElementStatus::Idle));
    assert!(scorer.registry().history_for(empty.id()).is_empty());
    assert_eq!(client.call_count(), 0);
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_discovery_admits_once() {
    let page = Page::new();
    let review = page.review("Solid build quality", "4.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.4);
    let scorer = page.enable(client.clone(), 4);
    assert_eq!(scorer.refresh(), 0);
    assert_eq!(scorer.refresh(), 0);
    scorer.wait_idle().await;
    assert_eq!(scorer.refresh(), 0);
    scorer.evaluate_visibility();
    scorer.wait_idle().await;

    assert_eq!(client.call_count(), 1);
    assert_eq!(scorer.registry().len(), 1);
    assert_eq!(page.slots(&review).len(), 1);
    assert_eq!(
        scorer.registry().history_for(review.id()),
        vec![ElementStatus::Queued, ElementStatus::Processing, ElementStatus::Done]
    );
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn burst_of_visible_reviews_respects_the_bound() {
    let page = Page::new();
    for i in 0..10 {
        page.review(&format!("Review number {i}"), "5.0 out of 5 stars", i as f64 * 10.0);
    }
    let client = StubClient::scoring(0.2);
    let scorer = page.enable(client.clone(), 3);
    assert_eq!(scorer.registry().count(ElementStatus::Processing), 3);
    assert_eq!(scorer.snapshot().queued, 7);

    scorer.wait_idle().await;
    assert_eq!(client.call_count(), 10);
    assert_eq!(client.peak.load(Ordering::SeqCst), 3);
    assert_eq!(scorer.snapshot().peak_in_flight, 3);
    let order: Vec<String> = client.calls.lock().iter().map(|c| c.text.clone()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("Review number {i}")).collect();
    assert_eq!(order, expected);
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn scrolling_admits_reviews_below_the_fold() {
    let page = Page::new();
    let top = page.review("Arrived quickly", "5.0 out of 5 stars", 0.0);
    let far = page.review("Stopped working after a week", "1.0 out of 5 stars", 3000.0);
    let client = StubClient::scoring(0.6);
    let scorer = page.enable(client.clone(), 4);
    scorer.wait_idle().await;

    assert_eq!(page.badge(&top).unwrap().0, "60% · Suspicious");
    assert!(page.slots(&far).is_empty());
    assert_eq!(scorer.registry().status(far.id()), Some(ElementStatus::Idle));
    assert!(scorer.gate().is_observing(far.id()));

    page.doc.scroll_to(0.0, 2400.0);
    tokio::time::sleep(Duration::from_millis(10)).await;
    scorer.wait_idle().await;
    assert_eq!(page.badge(&far).unwrap().0, "60% · Suspicious");
    assert_eq!(client.call_count(), 2);
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn appended_reviews_are_picked_up_after_the_debounce() {
    let page = Page::new();
    page.review("First page of reviews", "5.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.1);
    let scorer = page.enable(client.clone(), 4);
    scorer.wait_idle().await;

    let late = page.review("Loaded by infinite scroll", "3.0 out of 5 stars", 200.0);
    assert_eq!(scorer.registry().status(late.id()), None);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(scorer.rescan_count() >= 1);
    scorer.wait_idle().await;

    assert_eq!(page.badge(&late).unwrap().0, "10% · Genuine");
    assert_eq!(client.call_count(), 2);
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn replaced_review_is_scored_as_new() {
    let page = Page::new();
    let original = page.review("Same words", "5.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.1);
    let scorer = page.enable(client.clone(), 4);
    scorer.wait_idle().await;

    let original_id = original.id();
    original.remove();
    drop(original);
    let replacement = page.review("Same words", "5.0 out of 5 stars", 0.0);
    tokio::time::sleep(Duration::from_millis(300)).await;
    scorer.wait_idle().await;

    assert!(!scorer.registry().contains(original_id));
    assert_eq!(
        scorer.registry().status(replacement.id()),
        Some(ElementStatus::Done)
    );
    assert_eq!(client.call_count(), 2);
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reinserted_review_keeps_its_result() {
    let page = Page::new();
    let review = page.review("Comfortable for long walks", "4.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.2);
    let scorer = page.enable(client.clone(), 4);
    scorer.wait_idle().await;

    review.remove();
    tokio::time::sleep(Duration::from_millis(300)).await;
    page.list.append_child(&review);
    tokio::time::sleep(Duration::from_millis(300)).await;
    scorer.evaluate_visibility();
    scorer.wait_idle().await;

    assert!(scorer.rescan_count() >= 2);
    assert_eq!(client.call_count(), 1);
    assert_eq!(
        scorer.registry().history_for(review.id()),
        vec![ElementStatus::Queued, ElementStatus::Processing, ElementStatus::Done]
    );
    assert_eq!(page.slots(&review).len(), 1);
    assert_eq!(page.badge(&review).unwrap().0, "20% · Genuine");
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_admitted_reviews_settle() {
    let page = Page::new();
    let first = page.review("Great sound for the price", "5.0 out of 5 stars", 0.0);
    let second = page.review("Strap broke on day one", "1.0 out of 5 stars", 200.0);
    let client = StubClient::scoring(0.55);
    let scorer = page.enable(client.clone(), 1);
    assert_eq!(scorer.registry().status(second.id()), Some(ElementStatus::Queued));

    scorer.shutdown().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    scorer.wait_idle().await;

    for review in [&first, &second] {
        assert_eq!(scorer.registry().status(review.id()), Some(ElementStatus::Done));
        assert_eq!(page.badge(review).unwrap().0, "55% · Suspicious");
    }
    assert_eq!(client.call_count(), 2);
    assert_eq!(scorer.snapshot().queued, 0);
}

#[tokio::test(start_paused = true)]
async fn reset_rescores_done_reviews() {
    let page = Page::new();
    let review = page.review("Worth the price", "4.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.3);
    let scorer = page.enable(client.clone(), 4);
    scorer.wait_idle().await;
    assert_eq!(client.call_count(), 1);

    assert_eq!(scorer.reset(), 1);
    scorer.wait_idle().await;
    assert_eq!(client.call_count(), 2);
    assert_eq!(page.slots(&review).len(), 1);
    assert_eq!(page.badge(&review).unwrap().0, "30% · Genuine");
    scorer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn details_badge_raises_the_shared_modal() {
    let page = Page::new();
    let review = page.review("Battery died fast", "2.0 out of 5 stars", 0.0);
    let client = StubClient::scoring(0.85);
    let scorer = page.enable(client, 4);
    scorer.wait_idle().await;

    assert!(!scorer.modal().is_visible());
    let badge = page.slots(&review)[0].children()[0].clone();
    assert!(badge.click());
    assert!(scorer.modal().is_visible());
    let text = scorer.modal().content().text_content();
    assert!(text.contains("85.00%"));
    assert!(text.ends_with("This review is rated as Likely Fake."));
    assert_eq!(page.doc.query_selector_all("#frd-modal").unwrap().len(), 1);
    scorer.shutdown().await;
}
