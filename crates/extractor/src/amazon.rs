use once_cell::sync::Lazy;
use regex::Regex;
use sentinel_core_types::DEFAULT_RATING;
use sentinel_page_dom::{Document, Element, Selector};

use crate::text::{first, text_of};

pub(crate) const OBSERVE_ROOTS: &[&str] = &["#reviews-medley-footer", "#cm_cr-review_list"];

static REVIEW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-hook=\"review\"]").expect("valid review selector"));
static BODY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-hook=\"review-body\"] span").expect("valid body selector")
});
static STARS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "[data-hook=\"review-star-rating\"] span, i[data-hook=\"review-star-rating\"] span",
    )
    .expect("valid rating selector")
});
static COMMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".review-comments").expect("valid comments selector"));
static OUT_OF_FIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\d.]+)\s+out of 5").expect("valid rating pattern"));

pub(crate) fn find_review_elements(document: &Document) -> Vec<Element> {
    document.select_all(&REVIEW)
}

pub(crate) fn review_text(review: &Element) -> String {
    first(review, &BODY).map(|span| text_of(&span)).unwrap_or_default()
}

pub(crate) fn review_rating(review: &Element) -> f64 {
    let Some(stars) = first(review, &STARS) else {
        return DEFAULT_RATING;
    };
    OUT_OF_FIVE
        .captures(&text_of(&stars))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|rating| (1.0..=5.0).contains(rating))
        .unwrap_or(DEFAULT_RATING)
}

pub(crate) fn injection_point(review: &Element) -> Option<Element> {
    first(review, &COMMENTS)
}
