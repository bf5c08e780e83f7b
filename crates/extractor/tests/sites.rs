use sentinel_extractor::SiteExtractor;
use sentinel_page_dom::{Document, Element, Viewport};

fn amazon_review(doc: &Document, body: &str, stars: Option<&str>) -> Element {
    let review = doc.create_element("div").with_attr("data-hook", "review");
    if let Some(stars) = stars {
        let icon = doc
            .create_element("i")
            .with_attr("data-hook", "review-star-rating");
        icon.append_child(&doc.create_element("span").with_text(stars));
        review.append_child(&icon);
    }
    let body_host = doc.create_element("span").with_attr("data-hook", "review-body");
    body_host.append_child(&doc.create_element("span").with_text(body));
    review.append_child(&body_host);
    review.append_child(&doc.create_element("div").with_class("review-comments"));
    review
}

#[test]
fn amazon_extracts_text_rating_and_injection_point() {
    let doc = Document::new("https://www.amazon.in/product-reviews/B01", Viewport::default()).unwrap();
    let list = doc.create_element("div").with_id("cm_cr-review_list");
    let rated = amazon_review(&doc, "  Great battery life, lasted two days  ", Some("4.0 out of 5 stars"));
    let unrated = amazon_review(&doc, "Meh", None);
    let garbled = amazon_review(&doc, "Fine", Some("five stars"));
    list.append_child(&rated);
    list.append_child(&unrated);
    list.append_child(&garbled);
    doc.body().append_child(&list);

    let site = SiteExtractor::for_document(&doc).expect("amazon host");
    assert_eq!(site, SiteExtractor::Amazon);
    assert_eq!(site.find_review_elements(&doc), vec![rated.clone(), unrated.clone(), garbled.clone()]);

    assert_eq!(site.review_text(&rated), "Great battery life, lasted two days");
    assert_eq!(site.review_rating(&rated), 4.0);
    assert_eq!(site.review_rating(&unrated), 5.0);
    assert_eq!(site.review_rating(&garbled), 5.0);
    assert!(site.injection_point(&rated).has_class("review-comments"));

    let request = site.prediction_request(&rated).expect("request");
    assert_eq!(request.text, "Great battery life, lasted two days");
    assert_eq!(request.rating, 4.0);

    let roots = site.observe_roots(&doc);
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0], list);
    assert_eq!(roots[1], doc.body());
}

#[test]
fn empty_text_yields_no_request() {
    let doc = Document::new("https://www.amazon.com/r", Viewport::default()).unwrap();
    let bare = doc.create_element("div").with_attr("data-hook", "review");
    doc.body().append_child(&bare);
    let site = SiteExtractor::Amazon;
    assert_eq!(site.review_text(&bare), "");
    assert!(site.prediction_request(&bare).is_none());
    assert_eq!(site.injection_point(&bare), bare);
}

fn flipkart_card(doc: &Document, header: &str, body: &str) -> Element {
    let card = doc.create_element("div").with_class("RcXBOT");
    card.append_child(&doc.create_element("div").with_class("XQDdHH").with_text(header));
    let block = doc.create_element("div").with_class("ZmyHeo");
    let inner = doc.create_element("div");
    inner.append_child(&doc.create_element("div").with_text(body));
    inner.append_child(&doc.create_element("span").with_class("wTYmpv").with_text("READ MORE"));
    block.append_child(&inner);
    card.append_child(&block);
    card.append_child(&doc.create_element("p").with_text("Certified Buyer, Pune"));
    card
}

#[test]
fn flipkart_cards_need_header_and_body() {
    let doc = Document::new("https://www.flipkart.com/phone/product-reviews/itm1", Viewport::default()).unwrap();
    let section = doc.create_element("div").with_id("all-reviews");
    let card = flipkart_card(&doc, "4★", "Battery easily lasts a full day with heavy use.");
    let teaser = doc.create_element("div").with_class("RcXBOT").with_text("Ratings summary");
    section.append_child(&card);
    section.append_child(&teaser);
    doc.body().append_child(&section);

    let site = SiteExtractor::Flipkart;
    assert_eq!(site.find_review_elements(&doc), vec![card.clone()]);
    assert_eq!(site.review_text(&card), "Battery easily lasts a full day with heavy use.");
    assert_eq!(site.review_rating(&card), 4.0);
    assert_eq!(site.observe_roots(&doc), vec![section, doc.body()]);
}

#[test]
fn flipkart_rating_fallbacks() {
    let doc = Document::new("https://www.flipkart.com/x", Viewport::default()).unwrap();

    let aria = flipkart_card(&doc, "", "Decent sound but the case scratches easily.");
    aria.append_child(&doc.create_element("div").with_attr("aria-label", "Rated 3.5 out of 5"));
    assert_eq!(SiteExtractor::Flipkart.review_rating(&aria), 3.5);

    let glyph = flipkart_card(&doc, "Great", "Camera is sharp in daylight, noisy at night.");
    glyph.append_child(&doc.create_element("span").with_text("2 ★"));
    assert_eq!(SiteExtractor::Flipkart.review_rating(&glyph), 2.0);

    let none = flipkart_card(&doc, "9", "Nothing to say here, works as advertised.");
    assert_eq!(SiteExtractor::Flipkart.review_rating(&none), 5.0);
}

#[test]
fn flipkart_injection_point_prefers_actions_bar() {
    let doc = Document::new("https://www.flipkart.com/x", Viewport::default()).unwrap();
    let card = flipkart_card(&doc, "5", "Exactly as described and delivered early.");
    assert_eq!(SiteExtractor::Flipkart.injection_point(&card), card);

    let votes = doc.create_element("div").with_class("qhmk-f");
    card.append_child(&votes);
    assert_eq!(SiteExtractor::Flipkart.injection_point(&card), votes);

    let actions = doc.create_element("div").with_class("_23BI2I");
    card.append_child(&actions);
    assert_eq!(SiteExtractor::Flipkart.injection_point(&card), actions);
}
