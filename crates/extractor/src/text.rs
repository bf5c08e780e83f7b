use once_cell::sync::Lazy;
use regex::Regex;
use sentinel_page_dom::{Element, Selector};

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)").expect("valid number pattern"));

/// Parses the numeric prefix of `raw` the way `parseFloat` does
/// (`"4★"` is 4, `"abc"` is `None`).
pub fn parse_leading_number(raw: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub(crate) fn first(scope: &Element, selector: &Lazy<Selector>) -> Option<Element> {
    scope.select_first(selector)
}

pub(crate) fn text_of(element: &Element) -> String {
    element.text_content().trim().to_string()
}

/// Longest text among `candidates` that is at least `min_chars` long. Ties
/// keep document order.
pub(crate) fn longest_text<I>(candidates: I, min_chars: usize) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut best: Option<(usize, String)> = None;
    for text in candidates {
        let len = text.chars().count();
        if text.is_empty() || len < min_chars {
            continue;
        }
        if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
            best = Some((len, text));
        }
    }
    best.map(|(_, text)| text)
}
