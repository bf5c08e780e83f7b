//! CSS selectors over the page model.
//!
//! Parsing and matching are done by the `selectors` crate; this module only
//! supplies the string types it needs and exposes page elements through
//! [`selectors::Element`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use cssparser::{ParserInput, ToCss};
use precomputed_hash::PrecomputedHash;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{
    matches_selector_list, ElementSelectorFlags, MatchingContext, MatchingForInvalidation,
    MatchingMode, NeedsSelectorFlags, QuirksMode, SelectorCaches,
};
use selectors::parser::{self, ParseRelative, SelectorList, SelectorParseErrorKind};
use selectors::OpaqueElement;

use crate::element::Element;
use crate::errors::PageError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSelectors;

impl parser::SelectorImpl for PageSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssValue;
    type Identifier = CssName;
    type LocalName = CssName;
    type NamespaceUrl = CssName;
    type NamespacePrefix = CssName;
    type BorrowedNamespaceUrl = CssName;
    type BorrowedLocalName = CssName;
    type NonTSPseudoClass = PseudoClass;
    type PseudoElement = PseudoElement;
}

/// Identifier, tag, class or namespace name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CssName(String);

impl<'a> From<&'a str> for CssName {
    fn from(value: &'a str) -> Self {
        Self(value.to_string())
    }
}

impl ToCss for CssName {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        cssparser::serialize_identifier(&self.0, dest)
    }
}

impl PrecomputedHash for CssName {
    fn precomputed_hash(&self) -> u32 {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish() as u32
    }
}

/// Right-hand side of an attribute selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CssValue(String);

impl<'a> From<&'a str> for CssValue {
    fn from(value: &'a str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CssValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ToCss for CssValue {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        cssparser::serialize_string(&self.0, dest)
    }
}

/// The page model has no interaction state, so no pseudo-class parses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoClass {}

impl parser::NonTSPseudoClass for PseudoClass {
    type Impl = PageSelectors;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl ToCss for PseudoClass {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoElement {}

impl parser::PseudoElement for PseudoElement {
    type Impl = PageSelectors;
}

impl ToCss for PseudoElement {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

struct PageParser;

impl<'i> parser::Parser<'i> for PageParser {
    type Impl = PageSelectors;
    type Error = SelectorParseErrorKind<'i>;
}

/// A parsed selector list.
#[derive(Clone)]
pub struct Selector {
    source: String,
    list: SelectorList<PageSelectors>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, PageError> {
        let mut input = ParserInput::new(source);
        let mut css = cssparser::Parser::new(&mut input);
        let list = SelectorList::parse(&PageParser, &mut css, ParseRelative::No)
            .map_err(|err| PageError::selector(source, format!("{:?}", err.kind)))?;
        Ok(Self {
            source: source.to_string(),
            list,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, element: &Element) -> bool {
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        matches_selector_list(&self.list, &MatchTarget(element.clone()), &mut context)
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Selector {}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.source).finish()
    }
}

/// Matching view of an element; kept apart from [`Element`] so the trait's
/// method names do not shadow the element API.
#[derive(Clone, Debug)]
struct MatchTarget(Element);

impl MatchTarget {
    fn siblings(&self) -> Option<(Vec<Element>, usize)> {
        let siblings = self.0.parent()?.children();
        let index = siblings.iter().position(|el| el.ptr_eq(&self.0))?;
        Some((siblings, index))
    }
}

impl selectors::Element for MatchTarget {
    type Impl = PageSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.0.node())
    }

    fn parent_element(&self) -> Option<Self> {
        self.0.parent().map(MatchTarget)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let (siblings, index) = self.siblings()?;
        let prev = index.checked_sub(1)?;
        siblings.into_iter().nth(prev).map(MatchTarget)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let (siblings, index) = self.siblings()?;
        siblings.into_iter().nth(index + 1).map(MatchTarget)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.0.children().into_iter().next().map(MatchTarget)
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &CssName) -> bool {
        self.0.tag() == local_name.0
    }

    fn has_namespace(&self, namespace: &CssName) -> bool {
        namespace.0.is_empty()
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.0.tag() == other.0.tag()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&CssName>,
        local_name: &CssName,
        operation: &AttrSelectorOperation<&CssValue>,
    ) -> bool {
        if let NamespaceConstraint::Specific(url) = ns {
            if !url.0.is_empty() {
                return false;
            }
        }
        self.0
            .attr(&local_name.0)
            .is_some_and(|value| operation.eval_str(&value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &PseudoClass,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match *pc {}
    }

    fn match_pseudo_element(
        &self,
        pe: &PseudoElement,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match *pe {}
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        false
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssName, case_sensitivity: CaseSensitivity) -> bool {
        self.0
            .html_id()
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssName, case_sensitivity: CaseSensitivity) -> bool {
        self.0
            .class_name()
            .split_whitespace()
            .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
    }

    fn has_custom_state(&self, _name: &CssName) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssName) -> Option<CssName> {
        None
    }

    fn is_part(&self, _name: &CssName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.0.children().is_empty()
            && self.0.own_text().is_empty()
            && self.0.inner_html().is_none()
    }

    fn is_root(&self) -> bool {
        self.0.parent().is_none()
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::geometry::Viewport;

    #[test]
    fn rejects_malformed_selectors() {
        assert!(Selector::parse("div >").is_err());
        assert!(Selector::parse("a,,b").is_err());
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse(".a:hover").is_err());
        assert!(matches!(
            Selector::parse("::before"),
            Err(PageError::Selector { .. })
        ));
    }

    #[test]
    fn accepts_extractor_selectors() {
        for raw in [
            "[data-hook=\"review\"]",
            "[data-hook=\"review-body\"] span",
            "[data-hook=\"review-star-rating\"] span, i[data-hook=\"review-star-rating\"] span",
            "div[id*='reviews']",
            "[aria-label*='out of 5'], [aria-label*='stars']",
            ".RcXBOT",
            "div, p, span",
            "#cm_cr-review_list",
            "._23BI2I",
        ] {
            let selector = Selector::parse(raw).unwrap();
            assert_eq!(selector.as_str(), raw);
        }
    }

    #[test]
    fn matches_compounds_attributes_and_combinators() {
        let doc = Document::new("https://shop.example/p/1", Viewport::default()).unwrap();
        let list = doc.create_element("div").with_id("cm_cr-review_list");
        let review = doc.create_element("div").with_attr("data-hook", "review");
        let body = doc.create_element("span").with_attr("data-hook", "review-body");
        let inner = doc.create_element("span").with_class("Text").with_class("long");
        body.append_child(&inner);
        review.append_child(&body);
        list.append_child(&review);
        doc.body().append_child(&list);

        let check = |raw: &str, el: &Element| Selector::parse(raw).unwrap().matches(el);
        assert!(check("[data-hook=\"review-body\"] span", &inner));
        assert!(!check("[data-hook=\"review-body\"] span", &body));
        assert!(check("#cm_cr-review_list > div", &review));
        assert!(!check("#cm_cr-review_list > span", &inner));
        assert!(check("span.Text.long", &inner));
        assert!(!check(".text", &inner));
        assert!(check("div[id*='review']", &list));
        assert!(!check("div[id*='']", &list));
        assert!(check("[data-hook^=\"review-\"]", &body));
        assert!(check("[class~=long]", &inner));
        assert!(check("p, span", &inner));
        assert!(check(":not(.Text)", &body));
    }
}
