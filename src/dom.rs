//! DOM implementations of the guard's UI hooks (WASM only).

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{BeforeUnloadEvent, Document, Element, Window};

use crate::constants::{
    BLOCK_OVERLAY_ACTIVE_CLASS, BLOCK_OVERLAY_ID, BLOCK_OVERLAY_MESSAGE, CONTROL_LOADING_CLASS,
};
use crate::guard::{BlockOverlay, UiControl};
use crate::unload::{UnloadHooks, UnloadStack, UnloadToken};

const OVERLAY_CSS: &str = "
.training-block-overlay {
  position: fixed; top: 0; left: 0; width: 100%; height: 100%;
  background-color: rgba(0, 0, 0, 0.7); z-index: 10000;
  display: flex; justify-content: center; align-items: center;
  opacity: 0; visibility: hidden; transition: opacity 0.3s, visibility 0.3s;
}
.training-block-overlay.active { opacity: 1; visibility: visible; }
.training-block-message {
  background-color: white; padding: 30px; border-radius: 10px;
  max-width: 500px; text-align: center; box-shadow: 0 5px 15px rgba(0, 0, 0, 0.3);
}
.training-spinner {
  display: inline-block; width: 50px; height: 50px;
  border: 5px solid #f3f3f3; border-top: 5px solid #3498db; border-radius: 50%;
  margin-bottom: 20px; animation: spin 1s linear infinite;
}
@keyframes spin { 0% { transform: rotate(0deg); } 100% { transform: rotate(360deg); } }
";

fn toggle_class(element: &Element, class: &str, on: bool) {
    let list = element.class_list();
    let result = if on {
        list.add_1(class)
    } else {
        list.remove_1(class)
    };
    if let Err(e) = result {
        log::warn!("Failed to toggle class '{}': {:?}", class, e);
    }
}

/// A form control element, typically the submit button.
pub struct DomControl {
    element: Element,
}

impl DomControl {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}

impl UiControl for DomControl {
    fn set_disabled(&self, disabled: bool) {
        let result = if disabled {
            self.element.set_attribute("disabled", "")
        } else {
            self.element.remove_attribute("disabled")
        };
        if let Err(e) = result {
            log::warn!("Failed to toggle disabled state: {:?}", e);
        }
    }

    fn set_loading(&self, loading: bool) {
        toggle_class(&self.element, CONTROL_LOADING_CLASS, loading);
    }
}

/// The page-wide blocking overlay element.
pub struct DomOverlay {
    element: Element,
}

impl DomOverlay {
    /// Reuse an existing overlay element or build one and append it to the body.
    pub fn attach(document: &Document) -> Result<Self, JsValue> {
        if let Some(element) = document.get_element_by_id(BLOCK_OVERLAY_ID) {
            return Ok(Self { element });
        }

        let create = |tag: &str, class: &str| -> Result<Element, JsValue> {
            let element = document.create_element(tag)?;
            if !class.is_empty() {
                element.class_list().add_1(class)?;
            }
            Ok(element)
        };

        let overlay = create("div", "training-block-overlay")?;
        overlay.set_id(BLOCK_OVERLAY_ID);

        let style = create("style", "")?;
        style.set_text_content(Some(OVERLAY_CSS));

        let message_box = create("div", "training-block-message")?;
        let spinner = create("div", "training-spinner")?;
        let text = create("p", "")?;
        text.set_text_content(Some(BLOCK_OVERLAY_MESSAGE));

        message_box.append_child(&spinner)?;
        message_box.append_child(&text)?;
        overlay.append_child(&style)?;
        overlay.append_child(&message_box)?;

        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&overlay)?;

        log::debug!("Created blocking overlay #{}", BLOCK_OVERLAY_ID);
        Ok(Self { element: overlay })
    }
}

impl BlockOverlay for DomOverlay {
    fn show(&self) {
        toggle_class(&self.element, BLOCK_OVERLAY_ACTIVE_CLASS, true);
    }

    fn hide(&self) {
        toggle_class(&self.element, BLOCK_OVERLAY_ACTIVE_CLASS, false);
    }
}

/// `window.onbeforeunload` driven by an [`UnloadStack`].
///
/// Our handler is installed when the first registration arrives and the
/// page's previous handler is put back once the stack is empty again.
pub struct DomUnloadHooks {
    window: Window,
    stack: Rc<UnloadStack>,
    previous: RefCell<Option<js_sys::Function>>,
    handler: Closure<dyn FnMut(BeforeUnloadEvent) -> JsValue>,
}

impl DomUnloadHooks {
    pub fn new(window: Window) -> Self {
        let stack = Rc::new(UnloadStack::new());
        let stack_inner = stack.clone();

        let handler = Closure::wrap(Box::new(move |event: BeforeUnloadEvent| {
            match stack_inner.active_prompt() {
                Some(prompt) => {
                    event.prevent_default();
                    event.set_return_value(&prompt);
                    JsValue::from_str(&prompt)
                }
                None => JsValue::UNDEFINED,
            }
        }) as Box<dyn FnMut(BeforeUnloadEvent) -> JsValue>);

        Self {
            window,
            stack,
            previous: RefCell::new(None),
            handler,
        }
    }
}

impl UnloadHooks for DomUnloadHooks {
    fn install(&self, prompt: &str) -> UnloadToken {
        if self.stack.is_empty() {
            *self.previous.borrow_mut() = self.window.onbeforeunload();
            self.window
                .set_onbeforeunload(Some(self.handler.as_ref().unchecked_ref()));
        }
        self.stack.install(prompt)
    }

    fn restore(&self, token: UnloadToken) {
        let was_intercepting = self.stack.is_intercepting();
        self.stack.restore(token);
        if was_intercepting && self.stack.is_empty() {
            let previous = self.previous.borrow_mut().take();
            self.window.set_onbeforeunload(previous.as_ref());
        }
    }
}
