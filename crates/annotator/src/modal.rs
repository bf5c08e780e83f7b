//! The shared details modal.
//!
//! One modal exists per page. It is built on first use (or adopted when the
//! page already carries one) and afterwards only toggled between the
//! visible and hidden classes.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use sentinel_core_types::PredictionResponse;
use sentinel_page_dom::{Document, Element};

use crate::render::{format_percent, Verdict};

pub const MODAL_ID: &str = "frd-modal";
pub const MODAL_CONTENT_ID: &str = "frd-modal-content";
pub const MODAL_CLOSE_ID: &str = "frd-close-button";
pub const VISIBLE_CLASS: &str = "frd-modal-visible";
pub const HIDDEN_CLASS: &str = "frd-modal-hidden";

pub const LOADING_MESSAGE: &str = "Analyzing review...";

/// What the modal should display.
#[derive(Clone, Debug, PartialEq)]
pub enum ModalContent {
    Loading { message: String },
    /// Score breakdown, or the failure view for an error response.
    Detail(PredictionResponse),
    /// A single error line.
    Notice(String),
}

impl ModalContent {
    pub fn loading() -> Self {
        ModalContent::Loading {
            message: LOADING_MESSAGE.to_string(),
        }
    }
}

pub trait ModalService: Send + Sync {
    fn show(&self, content: ModalContent);
    fn hide(&self);
    fn is_visible(&self) -> bool;
}

struct ModalNodes {
    modal: Element,
    content: Element,
}

pub struct PageModal {
    document: Document,
    nodes: OnceCell<ModalNodes>,
}

impl PageModal {
    pub fn new(document: Document) -> Arc<Self> {
        Arc::new(Self {
            document,
            nodes: OnceCell::new(),
        })
    }

    /// True once the modal has been created or adopted.
    pub fn is_initialized(&self) -> bool {
        self.nodes.get().is_some()
    }

    fn nodes(&self) -> &ModalNodes {
        self.nodes.get_or_init(|| match self.document.get_element_by_id(MODAL_ID) {
            Some(modal) => self.adopt(modal),
            None => self.build(),
        })
    }

    fn adopt(&self, modal: Element) -> ModalNodes {
        debug!(target: "sentinel.render", "reusing existing modal");
        let content = match self.document.get_element_by_id(MODAL_CONTENT_ID) {
            Some(content) => content,
            None => {
                let content = self.document.create_element("div").with_id(MODAL_CONTENT_ID);
                modal.prepend_child(&content);
                content
            }
        };
        ModalNodes { modal, content }
    }

    fn build(&self) -> ModalNodes {
        debug!(target: "sentinel.render", "creating modal");
        let modal = self
            .document
            .create_element("div")
            .with_id(MODAL_ID)
            .with_class(HIDDEN_CLASS);
        let content = self.document.create_element("div").with_id(MODAL_CONTENT_ID);
        modal.append_child(&content);

        let close = self
            .document
            .create_element("span")
            .with_id(MODAL_CLOSE_ID)
            .with_text("×");
        let target = modal.downgrade();
        close.set_on_click(Arc::new(move || {
            if let Some(modal) = target.upgrade() {
                modal.set_class_name(HIDDEN_CLASS);
            }
        }));
        modal.append_child(&close);

        self.document.body().append_child(&modal);
        ModalNodes { modal, content }
    }

    /// The content area, creating the modal if needed.
    pub fn content(&self) -> Element {
        self.nodes().content.clone()
    }

    pub fn element(&self) -> Element {
        self.nodes().modal.clone()
    }

    fn render(&self, content: &ModalContent) -> Vec<Element> {
        let doc = &self.document;
        let para = |class: Option<&str>, text: &str| {
            let p = doc.create_element("p").with_text(text);
            if let Some(class) = class {
                p.add_class(class);
            }
            p
        };
        match content {
            ModalContent::Loading { message } => vec![
                doc.create_element("div").with_class("frd-loader"),
                para(None, message),
            ],
            ModalContent::Notice(message) => vec![para(Some("frd-error"), message)],
            ModalContent::Detail(PredictionResponse::Error { error }) => vec![
                para(Some("frd-error"), "Analysis Failed"),
                para(None, error),
                para(None, "Is the local server running?"),
            ],
            ModalContent::Detail(PredictionResponse::Score { score }) => {
                let verdict = Verdict::from_score(*score);
                let circle = doc
                    .create_element("div")
                    .with_class("frd-score-circle")
                    .with_attr(
                        "style",
                        format!("border-color: {0}; color: {0};", verdict.color),
                    )
                    .with_text(format!("{}%", format_percent(*score, 2)));
                circle.append_child(&doc.create_element("span").with_text("Fake likelihood"));
                vec![
                    doc.create_element("h2").with_text("Review Analysis"),
                    circle,
                    para(
                        Some("frd-verdict"),
                        &format!("This review is rated as {}.", verdict.label),
                    ),
                ]
            }
        }
    }
}

impl ModalService for PageModal {
    fn show(&self, content: ModalContent) {
        let nodes = self.nodes();
        nodes.content.replace_children(&self.render(&content));
        nodes.modal.set_class_name(VISIBLE_CLASS);
    }

    fn hide(&self) {
        if let Some(nodes) = self.nodes.get() {
            nodes.modal.set_class_name(HIDDEN_CLASS);
        }
    }

    fn is_visible(&self) -> bool {
        self.nodes
            .get()
            .is_some_and(|nodes| nodes.modal.has_class(VISIBLE_CLASS))
    }
}
