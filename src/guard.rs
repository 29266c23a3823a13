//! Navigation guard for long-running training requests.
//!
//! At most one training request may be outstanding per page session. While it
//! is, the submit control is disabled, a blocking overlay covers the page and
//! leaving the page asks for confirmation.
//!
//! The guard is constructed once at startup and shared with every handler that
//! submits training work.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::UNLOAD_PROMPT;
use crate::unload::{UnloadHooks, UnloadStack, UnloadToken};

/// A control (usually the submit button) that can be disabled and flagged as busy.
pub trait UiControl {
    /// Enable or disable user interaction.
    fn set_disabled(&self, disabled: bool);
    /// Toggle the visual "in progress" state.
    fn set_loading(&self, loading: bool);
}

/// Page-wide overlay shown while blocking.
pub trait BlockOverlay {
    /// Cover the page.
    fn show(&self);
    /// Uncover the page.
    fn hide(&self);
}

/// Overlay that renders nothing, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl BlockOverlay for NoOverlay {
    fn show(&self) {}
    fn hide(&self) {}
}

/// Current state of the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Idle,
    /// A request is outstanding; `unload` is the interception to release.
    Blocking { unload: UnloadToken },
}

/// Guards against concurrent training submissions and accidental navigation.
pub struct NavigationGuard {
    state: RefCell<BlockState>,
    overlay: Box<dyn BlockOverlay>,
    unload: Rc<dyn UnloadHooks>,
    prompt: String,
}

impl NavigationGuard {
    /// Create a guard using the given overlay and unload hooks.
    pub fn new(overlay: Box<dyn BlockOverlay>, unload: Rc<dyn UnloadHooks>) -> Self {
        Self {
            state: RefCell::new(BlockState::Idle),
            overlay,
            unload,
            prompt: UNLOAD_PROMPT.to_string(),
        }
    }

    /// Guard without any visual overlay, backed by its own unload stack.
    pub fn headless() -> Self {
        Self::new(Box::new(NoOverlay), Rc::new(UnloadStack::new()))
    }

    /// Override the unload confirmation prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Whether a guarded operation is in progress.
    pub fn is_busy(&self) -> bool {
        matches!(*self.state.borrow(), BlockState::Blocking { .. })
    }

    /// Enter the blocking state.
    ///
    /// Returns `false` without touching anything if already blocking.
    pub fn start_block(&self, control: Option<&dyn UiControl>) -> bool {
        if self.is_busy() {
            log::warn!("Block requested while another operation is in progress");
            return false;
        }

        let token = self.unload.install(&self.prompt);
        *self.state.borrow_mut() = BlockState::Blocking { unload: token };

        if let Some(control) = control {
            control.set_disabled(true);
            control.set_loading(true);
        }
        self.overlay.show();

        log::info!("Navigation blocked");
        true
    }

    /// Leave the blocking state. No-op when idle.
    pub fn end_block(&self, control: Option<&dyn UiControl>) {
        let previous = self.state.replace(BlockState::Idle);
        let BlockState::Blocking { unload } = previous else {
            return;
        };

        if let Some(control) = control {
            control.set_disabled(false);
            control.set_loading(false);
        }
        self.overlay.hide();
        self.unload.restore(unload);

        log::info!("Navigation unblocked");
    }

    /// Start blocking and return a hold that ends the block when dropped.
    ///
    /// `None` means another operation already holds the guard.
    pub fn hold<'a>(&'a self, control: Option<&'a dyn UiControl>) -> Option<BlockHold<'a>> {
        if !self.start_block(control) {
            return None;
        }
        Some(BlockHold {
            guard: self,
            control,
        })
    }
}

/// Active block that is released on drop, covering every exit path.
pub struct BlockHold<'a> {
    guard: &'a NavigationGuard,
    control: Option<&'a dyn UiControl>,
}

impl Drop for BlockHold<'_> {
    fn drop(&mut self) {
        self.guard.end_block(self.control);
    }
}
