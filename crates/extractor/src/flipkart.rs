use once_cell::sync::Lazy;
use regex::Regex;
use sentinel_core_types::DEFAULT_RATING;
use sentinel_page_dom::{Document, Element, Selector};

use crate::text::{first, longest_text, parse_leading_number, text_of};

pub(crate) const OBSERVE_ROOTS: &[&str] = &[".cPHDOP", "div[id*='reviews']"];

const MIN_BODY_CHARS: usize = 20;

fn selector(raw: &str) -> Selector {
    Selector::parse(raw).expect("valid flipkart selector")
}

static CARD: Lazy<Selector> = Lazy::new(|| selector(".RcXBOT"));
static RATING_HEADER: Lazy<Selector> = Lazy::new(|| selector(".XQDdHH"));
static BODY_BLOCK: Lazy<Selector> = Lazy::new(|| selector(".ZmyHeo"));
static READ_MORE: Lazy<Selector> = Lazy::new(|| selector(".wTYmpv"));
static TEXT_BLOCKS: Lazy<Selector> = Lazy::new(|| selector("div, p, span"));
static ARIA_RATING: Lazy<Selector> =
    Lazy::new(|| selector("[aria-label*='out of 5'], [aria-label*='stars']"));
static INJECTION_POINTS: Lazy<[Selector; 3]> =
    Lazy::new(|| [selector("._23BI2I"), selector(".qhmk-f"), selector(".EPCmJX")]);

static NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Certified Buyer|Helpful|Report|Permalink|READ MORE").expect("valid noise pattern")
});
static ARIA_OUT_OF_FIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([1-5](?:\.[0-9])?)\s*out of 5").expect("valid aria pattern"));
static STAR_GLYPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([1-5](?:\.[0-9])?)\s*★").expect("valid star pattern"));
static TEXT_OUT_OF_FIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([1-5](?:\.[0-9])?)\s*out of 5\b").expect("valid text pattern")
});

/// Review cards that carry both a rating header and a body block.
pub(crate) fn find_review_cards(document: &Document) -> Vec<Element> {
    document
        .select_all(&CARD)
        .into_iter()
        .filter(|card| first(card, &RATING_HEADER).is_some() && first(card, &BODY_BLOCK).is_some())
        .collect()
}

/// Longest substantial text inside the body block, ignoring "read more"
/// controls; falls back to the whole block.
fn body_from_block(review: &Element) -> String {
    let Some(host) = first(review, &BODY_BLOCK) else {
        return String::new();
    };
    let inside_read_more = |el: &Element| {
        let mut cursor = Some(el.clone());
        while let Some(current) = cursor {
            if current.ptr_eq(&host) {
                return false;
            }
            if current.matches(&READ_MORE) {
                return true;
            }
            cursor = current.parent();
        }
        false
    };
    let candidates = host
        .select_all(&TEXT_BLOCKS)
        .into_iter()
        .filter(|el| !inside_read_more(el))
        .map(|el| el.text_content_excluding(&READ_MORE).trim().to_string());
    longest_text(candidates, MIN_BODY_CHARS)
        .unwrap_or_else(|| host.text_content_excluding(&READ_MORE).trim().to_string())
}

pub(crate) fn review_text(review: &Element) -> String {
    let primary = body_from_block(review);
    if !primary.is_empty() {
        return primary;
    }
    let blocks = review
        .select_all(&TEXT_BLOCKS)
        .into_iter()
        .map(|el| text_of(&el))
        .filter(|text| !NOISE.is_match(text));
    longest_text(blocks, MIN_BODY_CHARS).unwrap_or_default()
}

fn capture_rating(pattern: &Regex, haystack: &str) -> Option<f64> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub(crate) fn review_rating(review: &Element) -> f64 {
    if let Some(header) = first(review, &RATING_HEADER) {
        if let Some(rating) = parse_leading_number(&text_of(&header)) {
            if (1.0..=5.0).contains(&rating) {
                return rating;
            }
        }
    }
    if let Some(labelled) = first(review, &ARIA_RATING) {
        let label = labelled.attr("aria-label").unwrap_or_default();
        if let Some(rating) = capture_rating(&ARIA_OUT_OF_FIVE, &label) {
            return rating;
        }
    }
    let text = text_of(review);
    capture_rating(&STAR_GLYPH, &text)
        .or_else(|| capture_rating(&TEXT_OUT_OF_FIVE, &text))
        .unwrap_or(DEFAULT_RATING)
}

pub(crate) fn injection_point(review: &Element) -> Option<Element> {
    INJECTION_POINTS
        .iter()
        .find_map(|selector| review.select_first(selector))
}
