// Trainer feedback loop for seedprobe
// Parses responses and surfaces elements the scan has not seen yet

use crate::elements::{Element, ElementKind, Page};
use crate::models::Response;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Outcome of training on one response
#[derive(Debug, Clone)]
pub struct Training {
    pub page: Arc<Page>,
    /// Elements of `page` unknown before this call, in enumeration order
    pub new_elements: Vec<Element>,
}

#[derive(Debug, Default)]
pub struct Trainer {
    known: Mutex<HashSet<String>>,
    page: RwLock<Option<Arc<Page>>>,
}

impl Trainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every element of `page` as known and make it the current page
    pub fn set_page(&self, page: Arc<Page>) {
        self.known.lock().extend(page.element_ids());
        *self.page.write() = Some(page);
    }

    /// Most recently seeded or trained page
    pub fn page(&self) -> Option<Arc<Page>> {
        self.page.read().clone()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.lock().contains(id)
    }

    pub fn known_count(&self) -> usize {
        self.known.lock().len()
    }

    /// Parse `response` into a Page and diff its `kinds` elements against
    /// known ones.
    ///
    /// Only elements of `kinds` are recorded as known; other kinds stay
    /// unknown so a later training pass that schedules them still sees them.
    /// Diff and record happen under one lock, so concurrent training on
    /// responses exposing the same element reports it exactly once.
    pub fn train(&self, response: &Response, kinds: &[ElementKind]) -> Training {
        let page = Arc::new(Page::from_response(response));

        let new_elements: Vec<Element> = {
            let mut known = self.known.lock();
            page.elements(kinds)
                .into_iter()
                .filter(|e| known.insert(e.id()))
                .collect()
        };

        if !new_elements.is_empty() {
            debug!(
                "Trained on {}: {} new element(s)",
                response.url,
                new_elements.len()
            );
        }

        *self.page.write() = Some(Arc::clone(&page));
        Training { page, new_elements }
    }

    pub fn reset(&self) {
        self.known.lock().clear();
        *self.page.write() = None;
    }
}
