//! Declarative `data-*` attributes wired to event handlers.
//!
//! `bind` may run any number of times over overlapping subtrees (the whole
//! document at start-up, then every injected fragment). Each element carries
//! a `data-cmms-bound-<behavior>` marker once handled.

use crate::upload::render::{selected_item, sync_placeholder, REMOVE_CLASS};
use crate::util::{closest_from_target, confirm, document, find_all, mark_once, ListenerScope};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlElement, HtmlFormElement, HtmlInputElement};

pub(crate) const DEFAULT_CONFIRM: &str = "확인하시겠습니까?";
const INTERACTIVE: &str = "a,button,input,select,textarea,label";

pub(crate) type NavigateFn = Rc<dyn Fn(String)>;

#[derive(Clone, Default)]
pub(crate) struct DomBehaviors {
    /// Set when the fragment navigator runs; row clicks then stay in the slot.
    navigate: Option<NavigateFn>,
}

impl DomBehaviors {
    pub fn new(navigate: Option<NavigateFn>) -> Self {
        Self { navigate }
    }

    /// Listeners go to `scope`; pass the slot's scope for fragment markup.
    pub fn bind(&self, root: &Element, scope: &ListenerScope) {
        self.bind_row_links(root, scope);
        bind_confirms(root, scope);
        bind_validation(root, scope);
        bind_attachment_pickers(root, scope);
        bind_sidebar_toggles(root, scope);
    }

    fn bind_row_links(&self, root: &Element, scope: &ListenerScope) {
        for row in find_all(root, "[data-row-link]") {
            if !mark_once(&row, "row-link") {
                continue;
            }
            let navigate = self.navigate.clone();
            let row_el = row.clone();
            scope.listen(&row, "click", false, move |ev: Event| {
                let inner = closest_from_target(ev.target(), INTERACTIVE)
                    .filter(|el| row_el.contains(Some(el.as_ref())));
                if inner.is_some() {
                    return;
                }
                let Some(href) = row_el.get_attribute("data-row-link").filter(|h| !h.is_empty())
                else {
                    return;
                };
                match &navigate {
                    Some(nav) => {
                        ev.prevent_default();
                        nav(href);
                    }
                    None => {
                        if let Some(win) = web_sys::window() {
                            let _ = win.location().set_href(&href);
                        }
                    }
                }
            });
        }
    }
}

/// `[data-delete-url]` elements are confirmed by the navigator's delete handler.
fn bind_confirms(root: &Element, scope: &ListenerScope) {
    for el in find_all(root, "[data-confirm]:not([data-delete-url])") {
        if !mark_once(&el, "confirm") {
            continue;
        }
        let el_ref = el.clone();
        scope.listen(&el, "click", false, move |ev: Event| {
            let msg = el_ref
                .get_attribute("data-confirm")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONFIRM.to_string());
            if !confirm(&msg) {
                ev.prevent_default();
                ev.stop_propagation();
                ev.stop_immediate_propagation();
            }
        });
    }
}

fn bind_validation(root: &Element, scope: &ListenerScope) {
    for el in find_all(root, "form[data-validate]") {
        let Ok(form) = el.dyn_into::<HtmlFormElement>() else {
            continue;
        };
        if !mark_once(&form, "validate") {
            continue;
        }
        let form_ref = form.clone();
        scope.listen(&form, "submit", false, move |ev: Event| {
            if form_ref.check_validity() {
                return;
            }
            ev.prevent_default();
            ev.stop_immediate_propagation();
            let first = form_ref
                .query_selector(":invalid")
                .ok()
                .flatten()
                .and_then(|el| el.dyn_into::<HtmlElement>().ok());
            if let Some(field) = first {
                let _ = field.focus();
            }
        });
    }
}

/// Upload widgets own their containers; only plain pickers are handled here.
fn bind_attachment_pickers(root: &Element, scope: &ListenerScope) {
    for container in find_all(root, "[data-attachments]:not([data-upload]):not([data-ref-entity])") {
        let input = container
            .query_selector("input[type=file]")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
        let list = container.query_selector(".attachments-list").ok().flatten();
        let (Some(input), Some(list)) = (input, list) else {
            continue;
        };
        if !mark_once(&container, "attachments") {
            continue;
        }

        if let Some(add) = container.query_selector("[data-attachments-add]").ok().flatten() {
            let input = input.clone();
            scope.listen(&add, "click", false, move |ev: Event| {
                ev.prevent_default();
                input.click();
            });
        }

        {
            let input_ref = input.clone();
            let list = list.clone();
            scope.listen(&input, "change", false, move |_ev: Event| {
                let Some(doc) = document() else {
                    return;
                };
                let Some(files) = input_ref.files() else {
                    return;
                };
                for i in 0..files.length() {
                    let Some(file) = files.get(i) else {
                        continue;
                    };
                    if let Some(li) = selected_item(&doc, &file.name(), file.size() as u64) {
                        let _ = list.append_child(&li);
                    }
                }
                sync_placeholder(&doc, &list);
            });
        }

        // Delegated so items added later need no listener of their own.
        let list_ref = list.clone();
        scope.listen(&list, "click", false, move |ev: Event| {
            let Some(button) = closest_from_target(ev.target(), &format!(".{REMOVE_CLASS}")) else {
                return;
            };
            if let Some(li) = button.closest("li").ok().flatten() {
                li.remove();
            }
            if let Some(doc) = document() {
                sync_placeholder(&doc, &list_ref);
            }
        });
    }
}

fn bind_sidebar_toggles(root: &Element, scope: &ListenerScope) {
    for title in find_all(root, ".sidebar .menu-title") {
        if !mark_once(&title, "menu-toggle") {
            continue;
        }
        let title_ref = title.clone();
        scope.listen(&title, "click", false, move |_ev: Event| {
            let Some(group) = title_ref.closest(".menu-group").ok().flatten() else {
                return;
            };
            let open = !group.class_list().contains("open");
            let _ = group.class_list().toggle_with_force("open", open);
            let _ = title_ref.set_attribute("aria-expanded", if open { "true" } else { "false" });
        });
    }
}
