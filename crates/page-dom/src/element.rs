use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sentinel_core_types::NodeId;

use crate::document::DocumentShared;
use crate::errors::PageError;
use crate::events::PageEvent;
use crate::geometry::Rect;
use crate::selector::Selector;

pub type ClickHandler = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct Node {
    id: NodeId,
    tag: String,
    classes: RwLock<Vec<String>>,
    attributes: RwLock<BTreeMap<String, String>>,
    text: RwLock<String>,
    markup: RwLock<Option<String>>,
    children: RwLock<Vec<Element>>,
    parent: RwLock<Weak<Node>>,
    rect: RwLock<Rect>,
    on_click: RwLock<Option<ClickHandler>>,
    owner: Weak<DocumentShared>,
}

/// Owning handle to a node in the page tree. Clones share the node.
#[derive(Clone)]
pub struct Element {
    node: Arc<Node>,
}

/// Non-owning handle; does not keep a removed node alive.
#[derive(Clone)]
pub struct WeakElement {
    id: NodeId,
    node: Weak<Node>,
}

impl WeakElement {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Element> {
        self.node.upgrade().map(|node| Element { node })
    }

    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakElement")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Element {
    pub(crate) fn new_node(tag: &str, owner: Weak<DocumentShared>) -> Self {
        Self {
            node: Arc::new(Node {
                id: NodeId::new(),
                tag: tag.to_ascii_lowercase(),
                classes: RwLock::new(Vec::new()),
                attributes: RwLock::new(BTreeMap::new()),
                text: RwLock::new(String::new()),
                markup: RwLock::new(None),
                children: RwLock::new(Vec::new()),
                parent: RwLock::new(Weak::new()),
                rect: RwLock::new(Rect::default()),
                on_click: RwLock::new(None),
                owner,
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            id: self.node.id,
            node: Arc::downgrade(&self.node),
        }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    // ---- attributes -------------------------------------------------------

    pub fn attr(&self, name: &str) -> Option<String> {
        if name == "class" {
            let class_name = self.class_name();
            return (!class_name.is_empty()).then_some(class_name);
        }
        self.node.attributes.read().get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if name == "class" {
            self.set_class_name(&value);
            return;
        }
        self.node.attributes.write().insert(name.to_string(), value);
    }

    pub fn html_id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.node.classes.read().iter().any(|c| c == class)
    }

    pub fn add_class(&self, class: &str) {
        let mut classes = self.node.classes.write();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn class_name(&self) -> String {
        self.node.classes.read().join(" ")
    }

    /// Replaces the whole class list, like assigning `className`.
    pub fn set_class_name(&self, class_name: &str) {
        *self.node.classes.write() = class_name.split_whitespace().map(str::to_string).collect();
    }

    pub fn with_class(self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_id(self, id: &str) -> Self {
        self.set_attr("id", id);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    // ---- text & markup ------------------------------------------------------

    pub fn own_text(&self) -> String {
        self.node.text.read().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.node.text.write() = text.into();
        self.emit_mutation();
    }

    /// Text of this node and its descendants in document order, trimmed
    /// pieces joined by single spaces. Injected markup is not text.
    pub fn text_content(&self) -> String {
        let mut pieces = Vec::new();
        self.collect_text(None, &mut pieces);
        pieces.join(" ")
    }

    /// Like [`Element::text_content`] but skips descendants matching
    /// `excluded` (and everything below them).
    pub fn text_content_excluding(&self, excluded: &Selector) -> String {
        let mut pieces = Vec::new();
        self.collect_text(Some(excluded), &mut pieces);
        pieces.join(" ")
    }

    fn collect_text(&self, excluded: Option<&Selector>, pieces: &mut Vec<String>) {
        let own = self.node.text.read();
        let trimmed = own.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed.to_string());
        }
        drop(own);
        for child in self.children() {
            if excluded.is_some_and(|selector| selector.matches(&child)) {
                continue;
            }
            child.collect_text(excluded, pieces);
        }
    }

    pub fn inner_html(&self) -> Option<String> {
        self.node.markup.read().clone()
    }

    /// Replaces the children of this node with opaque markup.
    pub fn set_inner_html(&self, markup: impl Into<String>) {
        let removed = std::mem::take(&mut *self.node.children.write());
        for child in removed {
            *child.node.parent.write() = Weak::new();
        }
        *self.node.markup.write() = Some(markup.into());
        self.emit_mutation();
    }

    /// Swaps the whole child list (and any markup) for `children`, publishing
    /// a single mutation.
    pub fn replace_children(&self, children: &[Element]) {
        let removed = std::mem::take(&mut *self.node.children.write());
        for child in removed {
            *child.node.parent.write() = Weak::new();
        }
        *self.node.markup.write() = None;
        for child in children {
            if child.ptr_eq(self) || child.contains(self) {
                continue;
            }
            child.detach();
            *child.node.parent.write() = Arc::downgrade(&self.node);
            self.node.children.write().push(child.clone());
        }
        self.emit_mutation();
    }

    // ---- tree ---------------------------------------------------------------

    pub fn parent(&self) -> Option<Element> {
        self.node.parent.read().upgrade().map(|node| Element { node })
    }

    pub fn children(&self) -> Vec<Element> {
        self.node.children.read().clone()
    }

    pub fn append_child(&self, child: &Element) {
        self.insert_child(child, false);
    }

    pub fn prepend_child(&self, child: &Element) {
        self.insert_child(child, true);
    }

    fn insert_child(&self, child: &Element, front: bool) {
        if child.ptr_eq(self) || child.contains(self) {
            tracing::warn!(target: "sentinel.dom", parent = %self.id(), child = %child.id(), "refusing to create a cycle");
            return;
        }
        child.detach();
        *child.node.parent.write() = Arc::downgrade(&self.node);
        {
            let mut children = self.node.children.write();
            if front {
                children.insert(0, child.clone());
            } else {
                children.push(child.clone());
            }
        }
        self.emit_mutation();
    }

    /// Detaches this node from its parent; a no-op for orphans.
    pub fn remove(&self) {
        if let Some(parent) = self.detach() {
            parent.emit_mutation();
        }
    }

    fn detach(&self) -> Option<Element> {
        let parent = self.parent()?;
        parent
            .node
            .children
            .write()
            .retain(|existing| !existing.ptr_eq(self));
        *self.node.parent.write() = Weak::new();
        Some(parent)
    }

    /// True when `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(current) = cursor {
            if current.ptr_eq(self) {
                return true;
            }
            cursor = current.parent();
        }
        false
    }

    /// True while the node is reachable from its document's body.
    pub fn is_connected(&self) -> bool {
        let Some(owner) = self.node.owner.upgrade() else {
            return false;
        };
        owner.body().contains(self)
    }

    /// Descendants in document order, excluding this node.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(next.children().into_iter().rev());
            out.push(next);
        }
        out
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(self)
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|el| selector.matches(el))
            .collect()
    }

    pub fn select_first(&self, selector: &Selector) -> Option<Element> {
        self.descendants().into_iter().find(|el| selector.matches(el))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, PageError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select_all(&selector))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>, PageError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select_first(&selector))
    }

    // ---- layout & interaction ---------------------------------------------

    pub fn rect(&self) -> Rect {
        *self.node.rect.read()
    }

    pub fn set_rect(&self, rect: Rect) {
        *self.node.rect.write() = rect;
        if self.is_connected() {
            if let Some(owner) = self.node.owner.upgrade() {
                owner.publish(PageEvent::LayoutChanged { target: self.id() });
            }
        }
    }

    pub fn set_on_click(&self, handler: ClickHandler) {
        *self.node.on_click.write() = Some(handler);
    }

    /// Invokes the click handler; returns false when none is attached.
    pub fn click(&self) -> bool {
        let handler = self.node.on_click.read().clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    fn emit_mutation(&self) {
        if !self.is_connected() {
            return;
        }
        if let Some(owner) = self.node.owner.upgrade() {
            owner.publish(PageEvent::Mutation { target: self.id() });
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.node.id)
            .field("tag", &self.node.tag)
            .field("class", &self.class_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::geometry::Viewport;
    use crate::selector::Selector;

    #[test]
    fn text_content_joins_descendants_in_order() {
        let doc = Document::new("https://shop.example/p/1", Viewport::default()).unwrap();
        let card = doc.create_element("div").with_text("Title");
        let body = doc.create_element("p").with_text("  lasted two days ");
        let more = doc.create_element("span").with_class("more").with_text("READ MORE");
        body.append_child(&more);
        card.append_child(&body);

        assert_eq!(card.text_content(), "Title lasted two days READ MORE");
        let excluded = Selector::parse(".more").unwrap();
        assert_eq!(card.text_content_excluding(&excluded), "Title lasted two days");
    }

    #[test]
    fn reparenting_moves_the_node() {
        let doc = Document::new("https://shop.example/", Viewport::default()).unwrap();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        a.append_child(&child);
        b.prepend_child(&child);
        assert!(a.children().is_empty());
        assert_eq!(b.children(), vec![child.clone()]);
        assert!(child.parent().unwrap().ptr_eq(&b));

        // a node cannot become its own ancestor
        child.append_child(&b);
        assert!(b.parent().is_none());
    }

    #[test]
    fn weak_handle_does_not_keep_node_alive() {
        let doc = Document::new("https://shop.example/", Viewport::default()).unwrap();
        let el = doc.create_element("div");
        doc.body().append_child(&el);
        let weak = el.downgrade();
        drop(el);
        assert!(weak.is_alive());
        let el = weak.upgrade().unwrap();
        el.remove();
        drop(el);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn set_inner_html_replaces_children() {
        let doc = Document::new("https://shop.example/", Viewport::default()).unwrap();
        let slot = doc.create_element("span");
        let old = doc.create_element("b");
        slot.append_child(&old);
        slot.set_inner_html("<em>hi</em>");
        assert!(slot.children().is_empty());
        assert!(old.parent().is_none());
        assert_eq!(slot.inner_html().as_deref(), Some("<em>hi</em>"));
    }

    #[test]
    fn replace_children_swaps_the_child_list() {
        let doc = Document::new("https://shop.example/", Viewport::default()).unwrap();
        let slot = doc.create_element("span");
        slot.set_inner_html("<i>old</i>");
        slot.append_child(&doc.create_element("b").with_text("stale"));
        let label = doc.create_element("span").with_text("Analyzing");
        slot.replace_children(&[label.clone()]);

        assert_eq!(slot.children(), vec![label.clone()]);
        assert_eq!(slot.inner_html(), None);
        assert_eq!(slot.text_content(), "Analyzing");
        assert!(label.parent().unwrap().ptr_eq(&slot));
    }
}
