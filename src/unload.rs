//! Page-unload interception.
//!
//! Several independent parts of a page may want to warn before the user leaves.
//! Instead of a single "previous handler" slot, registrations are kept on a
//! stack: each `install` returns a token, `restore` removes exactly that
//! registration, and the most recent live registration supplies the prompt.

use std::cell::{Cell, RefCell};

/// Handle identifying one unload interception registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnloadToken(u64);

/// Something that can intercept the page-unload event.
pub trait UnloadHooks {
    /// Start asking for confirmation before unload, using `prompt` as message.
    fn install(&self, prompt: &str) -> UnloadToken;

    /// Remove the registration behind `token`. Unknown tokens are ignored.
    fn restore(&self, token: UnloadToken);
}

/// Stack of active unload registrations.
#[derive(Debug, Default)]
pub struct UnloadStack {
    entries: RefCell<Vec<(UnloadToken, String)>>,
    next_id: Cell<u64>,
}

impl UnloadStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompt of the most recently installed registration still active.
    pub fn active_prompt(&self) -> Option<String> {
        self.entries
            .borrow()
            .last()
            .map(|(_, prompt)| prompt.clone())
    }

    /// Whether an unload would currently be intercepted.
    pub fn is_intercepting(&self) -> bool {
        !self.entries.borrow().is_empty()
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl UnloadHooks for UnloadStack {
    fn install(&self, prompt: &str) -> UnloadToken {
        let token = UnloadToken(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.entries.borrow_mut().push((token, prompt.to_string()));
        log::debug!("Unload interception installed ({:?})", token);
        token
    }

    fn restore(&self, token: UnloadToken) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|(t, _)| *t == token) {
            Some(pos) => {
                entries.remove(pos);
                log::debug!("Unload interception released ({:?})", token);
            }
            None => log::warn!("Release of unknown unload token {:?}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stack() {
        let stack = UnloadStack::new();
        assert!(!stack.is_intercepting());
        assert_eq!(stack.active_prompt(), None);
    }

    #[test]
    fn test_latest_prompt_wins() {
        let stack = UnloadStack::new();
        let first = stack.install("saving settings");
        let second = stack.install("training");

        assert_eq!(stack.active_prompt().as_deref(), Some("training"));

        stack.restore(second);
        assert_eq!(stack.active_prompt().as_deref(), Some("saving settings"));

        stack.restore(first);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_out_of_order_release() {
        let stack = UnloadStack::new();
        let first = stack.install("first");
        let second = stack.install("second");

        stack.restore(first);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active_prompt().as_deref(), Some("second"));

        stack.restore(second);
        assert!(!stack.is_intercepting());
    }

    #[test]
    fn test_double_release_is_ignored() {
        let stack = UnloadStack::new();
        let keep = stack.install("keep");
        let token = stack.install("drop");

        stack.restore(token);
        stack.restore(token);

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active_prompt().as_deref(), Some("keep"));
        stack.restore(keep);
    }

    #[test]
    fn test_tokens_are_unique() {
        let stack = UnloadStack::new();
        let a = stack.install("a");
        stack.restore(a);
        let b = stack.install("b");
        assert_ne!(a, b);
    }
}
