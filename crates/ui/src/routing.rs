use std::cell::RefCell;

pub const ROOT_LOCATION: &str = "/";

/// Navigation collaborator. The core only reads the location and hands over target routes.
pub trait Navigator {
    fn current_location(&self) -> String;
    fn navigate_to(&self, path: &str);
}

/// In-memory router with a history stack.
#[derive(Debug)]
pub struct HistoryRouter {
    history: RefCell<Vec<String>>,
}

impl HistoryRouter {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: RefCell::new(vec![initial.into()]),
        }
    }

    /// Pops back to the previous location. Returns false at the first entry.
    pub fn back(&self) -> bool {
        let mut history = self.history.borrow_mut();
        if history.len() <= 1 {
            return false;
        }
        history.pop();
        true
    }

    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }
}

impl Default for HistoryRouter {
    fn default() -> Self {
        Self::new(ROOT_LOCATION)
    }
}

impl Navigator for HistoryRouter {
    fn current_location(&self) -> String {
        self.history
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| ROOT_LOCATION.to_string())
    }

    fn navigate_to(&self, path: &str) {
        let mut history = self.history.borrow_mut();
        if history.last().is_some_and(|current| current == path) {
            return;
        }
        tracing::debug!(path, "navigating");
        history.push(path.to_string());
    }
}
