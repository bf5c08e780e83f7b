use std::sync::Arc;

use sentinel_core_types::PredictionResponse;
use sentinel_page_dom::Element;

/// Receives every settled element, in completion order.
pub trait ResultSink: Send + Sync {
    fn settled(&self, element: &Element, slot: Option<Element>, response: &PredictionResponse);
}

impl<S> ResultSink for Arc<S>
where
    S: ResultSink + ?Sized,
{
    fn settled(&self, element: &Element, slot: Option<Element>, response: &PredictionResponse) {
        (**self).settled(element, slot, response)
    }
}
