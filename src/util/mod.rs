use std::cell::RefCell;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, EventTarget};

/// Human readable size, e.g. `1536 -> "1.5 KB"`.
pub(crate) fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.2}");
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    format!("{trimmed} {}", UNITS[unit])
}

pub(crate) fn document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

/// `root` itself (when it matches) followed by every matching descendant.
pub(crate) fn find_all(root: &Element, selector: &str) -> Vec<Element> {
    let mut out = Vec::new();
    if root.matches(selector).unwrap_or(false) {
        out.push(root.clone());
    }
    if let Ok(list) = root.query_selector_all(selector) {
        for i in 0..list.length() {
            if let Some(el) = list.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                out.push(el);
            }
        }
    }
    out
}

/// Closest ancestor-or-self of the event target matching `selector`.
///
/// Text nodes are resolved to their parent element first.
pub(crate) fn closest_from_target(target: Option<EventTarget>, selector: &str) -> Option<Element> {
    let target = target?;
    let el = match target.dyn_into::<Element>() {
        Ok(el) => el,
        Err(other) => other.dyn_into::<web_sys::Node>().ok()?.parent_element()?,
    };
    el.closest(selector).ok().flatten()
}

/// Returns `true` the first time it is called for `(el, behavior)`.
pub(crate) fn mark_once(el: &Element, behavior: &str) -> bool {
    let attr = format!("data-cmms-bound-{behavior}");
    if el.has_attribute(&attr) {
        return false;
    }
    let _ = el.set_attribute(&attr, "");
    true
}

/// Attach a listener for the lifetime of the page.
///
/// Only for targets that are never replaced (document, window, the layout
/// slot itself). Fragment markup goes through a [`ListenerScope`].
pub(crate) fn listen(
    target: &EventTarget,
    event: &str,
    capture: bool,
    handler: impl FnMut(Event) + 'static,
) {
    let cb = Closure::<dyn FnMut(Event)>::wrap(Box::new(handler));
    let _ = target.add_event_listener_with_callback_and_bool(
        event,
        cb.as_ref().unchecked_ref(),
        capture,
    );
    cb.forget();
}

struct Bound {
    target: EventTarget,
    event: String,
    capture: bool,
    handler: Closure<dyn FnMut(Event)>,
}

/// Listeners whose targets can be thrown away together.
///
/// A `page` scope forgets its closures like [`listen`]. A `detachable` scope
/// keeps them until [`ListenerScope::clear`], which removes them from their
/// targets and frees them with everything they captured.
pub(crate) struct ListenerScope {
    bound: Option<RefCell<Vec<Bound>>>,
}

impl ListenerScope {
    pub fn page() -> Self {
        Self { bound: None }
    }

    pub fn detachable() -> Self {
        Self {
            bound: Some(RefCell::new(Vec::new())),
        }
    }

    pub fn listen(
        &self,
        target: &EventTarget,
        event: &str,
        capture: bool,
        handler: impl FnMut(Event) + 'static,
    ) {
        let Some(bound) = &self.bound else {
            listen(target, event, capture, handler);
            return;
        };
        let cb = Closure::<dyn FnMut(Event)>::wrap(Box::new(handler));
        let _ = target.add_event_listener_with_callback_and_bool(
            event,
            cb.as_ref().unchecked_ref(),
            capture,
        );
        bound.borrow_mut().push(Bound {
            target: target.clone(),
            event: event.to_string(),
            capture,
            handler: cb,
        });
    }

    /// Detach and drop every listener. A handler that triggers this keeps
    /// running; wasm-bindgen frees it once it returns.
    pub fn clear(&self) {
        let Some(bound) = &self.bound else {
            return;
        };
        for b in bound.take() {
            let _ = b.target.remove_event_listener_with_callback_and_bool(
                &b.event,
                b.handler.as_ref().unchecked_ref(),
                b.capture,
            );
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bound.as_ref().map_or(0, |b| b.borrow().len())
    }
}

pub(crate) fn set_timeout(ms: i32, f: impl FnOnce() + 'static) {
    let Some(win) = web_sys::window() else {
        return;
    };
    let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
        Closure::once_into_js(f).as_ref().unchecked_ref(),
        ms,
    );
}

pub(crate) fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

pub(crate) fn page_origin() -> Option<String> {
    web_sys::window().and_then(|w| w.location().origin().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn test_format_file_size_caps_at_gb() {
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024 * 1024), "2048 GB");
    }
}
