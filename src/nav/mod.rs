//! Fragment navigation inside the layout slot.
//!
//! The layout page stays loaded; links swap the `#layout-slot` contents with
//! server-rendered partials and keep history entries in the
//! `/layout/defaultLayout.html?content=...` shape the server understands.

pub(crate) mod panel;
pub(crate) mod state;
pub(crate) mod url;

use self::state::{FailureKind, NavMachine};
use self::url::{content_from_href, content_param, is_bypassed, layout_url, menu_matches, UrlError};
use crate::api::ApiError;
use crate::behaviors::{DomBehaviors, DEFAULT_CONFIRM};
use crate::models::NavHistoryState;
use crate::state::Runtime;
use crate::upload;
use crate::util::{
    closest_from_target, confirm, document, find_all, listen, mark_once, set_timeout, ListenerScope,
};
use leptos::ev;
use leptos::logging::{error, log, warn};
use leptos::task::spawn_local;
use leptos_dom::helpers::{window_event_listener, WindowListenerHandle};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, HtmlFormElement, MouseEvent, PopStateEvent};

pub(crate) const SLOT_ID: &str = "layout-slot";
const SAVE_FAILED: &str = "저장에 실패했습니다. 잠시 후 다시 시도하세요.";
const DELETE_FAILED: &str = "삭제에 실패했습니다. 잠시 후 다시 시도하세요.";
const FORM_NOTICE_ATTR: &str = "data-form-notice";

/// Url-encode the string entries of a form. File inputs are left out.
fn form_body(form: &HtmlFormElement) -> String {
    let mut body = ::url::form_urlencoded::Serializer::new(String::new());
    let Ok(data) = web_sys::FormData::new_with_form(form) else {
        return String::new();
    };
    let Ok(Some(entries)) = js_sys::try_iter(&data) else {
        return String::new();
    };
    for entry in entries.flatten() {
        let pair = js_sys::Array::from(&entry);
        let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) else {
            continue;
        };
        body.append_pair(&name, &value);
    }
    body.finish()
}

fn history_state(content: &str) -> JsValue {
    let state = NavHistoryState {
        content: content.to_string(),
    };
    serde_json::to_string(&state)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or(JsValue::NULL)
}

fn content_from_state(state: &JsValue) -> Option<String> {
    if state.is_null() || state.is_undefined() {
        return None;
    }
    let json = js_sys::JSON::stringify(state).ok()?.as_string()?;
    serde_json::from_str::<NavHistoryState>(&json)
        .ok()
        .map(|s| s.content)
        .filter(|c| !c.trim().is_empty())
}

fn location_content() -> Option<String> {
    let href = web_sys::window()?.location().href().ok()?;
    content_param(&href)
}

pub(crate) struct FragmentNavigator {
    slot: Element,
    runtime: Runtime,
    behaviors: DomBehaviors,
    /// Listeners on the current slot markup, dropped whenever it is replaced.
    slot_listeners: ListenerScope,
    machine: RefCell<NavMachine>,
    _popstate: RefCell<Option<WindowListenerHandle>>,
}

impl FragmentNavigator {
    /// Take over navigation for `#layout-slot`. `None` when the page has no slot.
    pub fn init(runtime: Runtime) -> Option<Rc<Self>> {
        let Some(slot) = document().and_then(|d| d.get_element_by_id(SLOT_ID)) else {
            warn!("[cmms-nav] #{SLOT_ID} not found; fragment navigation disabled");
            return None;
        };

        let nav = Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let behaviors = DomBehaviors::new(Some(Rc::new(move |href: String| {
                if let Some(nav) = weak.upgrade() {
                    nav.navigate(&href);
                }
            })));
            Self {
                slot,
                runtime,
                behaviors,
                slot_listeners: ListenerScope::detachable(),
                machine: RefCell::new(NavMachine::default()),
                _popstate: RefCell::new(None),
            }
        });

        nav.install_listeners();
        nav.initial_load();
        Some(nav)
    }

    pub fn behaviors(&self) -> &DomBehaviors {
        &self.behaviors
    }

    fn current(&self) -> String {
        self.machine.borrow().current().to_string()
    }

    fn default_content(&self) -> String {
        self.runtime.config.default_content.clone()
    }

    fn install_listeners(self: &Rc<Self>) {
        let Some(doc) = document() else {
            return;
        };

        let nav = self.clone();
        listen(&doc, "click", true, move |ev: Event| nav.on_document_click(ev));

        let nav = self.clone();
        listen(&self.slot, "click", true, move |ev: Event| nav.on_slot_click(ev));

        let nav = self.clone();
        let handle = window_event_listener(ev::popstate, move |ev: PopStateEvent| {
            let content = content_from_state(&ev.state())
                .or_else(location_content)
                .unwrap_or_else(|| nav.default_content());
            nav.load_content(&content);
        });
        *self._popstate.borrow_mut() = Some(handle);
    }

    fn initial_load(self: &Rc<Self>) {
        let from_template = web_sys::window()
            .and_then(|w| js_sys::Reflect::get(&w, &JsValue::from_str("initialContent")).ok())
            .and_then(|v| v.as_string())
            .filter(|s| !s.trim().is_empty());
        let content = from_template
            .or_else(location_content)
            .unwrap_or_else(|| self.default_content());
        self.write_history(&content, false);
        self.load_content(&content);
    }

    fn write_history(&self, content: &str, push: bool) {
        let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
            return;
        };
        let state = history_state(content);
        let url = layout_url(content);
        let res = if push {
            history.push_state_with_url(&state, "", Some(&url))
        } else {
            history.replace_state_with_url(&state, "", Some(&url))
        };
        if res.is_err() {
            warn!("[cmms-nav] could not update history for {content}");
        }
    }

    /// Anchor clicks anywhere on the page. Row clicks are handled by `DomBehaviors`.
    fn on_document_click(self: &Rc<Self>, ev: Event) {
        if ev.default_prevented() {
            return;
        }
        if let Some(mouse) = ev.dyn_ref::<MouseEvent>() {
            if mouse.button() != 0
                || mouse.meta_key()
                || mouse.ctrl_key()
                || mouse.shift_key()
                || mouse.alt_key()
            {
                return;
            }
        }
        let Some(anchor) = closest_from_target(ev.target(), "a[href]") else {
            return;
        };
        if anchor.closest("[data-delete-url]").ok().flatten().is_some() {
            return;
        }

        let href = anchor.get_attribute("href").unwrap_or_default();
        let target = anchor.get_attribute("target").unwrap_or_default();
        if is_bypassed(&href, anchor.has_attribute("data-hard-nav"), &target) {
            return;
        }

        // This listener runs before any element handler, so confirm here.
        if let Some(msg) = anchor.get_attribute("data-confirm") {
            ev.stop_propagation();
            let msg = if msg.trim().is_empty() { DEFAULT_CONFIRM.to_string() } else { msg };
            if !confirm(&msg) {
                ev.prevent_default();
                return;
            }
        }

        ev.prevent_default();
        self.navigate(&href);
    }

    fn on_slot_click(self: &Rc<Self>, ev: Event) {
        if closest_from_target(ev.target(), &format!("[{}]", panel::RETRY_ATTR)).is_some() {
            ev.prevent_default();
            let current = self.current();
            self.load_content(&current);
            return;
        }

        let Some(button) = closest_from_target(ev.target(), "[data-delete-url]") else {
            return;
        };
        ev.prevent_default();
        let Some(url) = button.get_attribute("data-delete-url").filter(|u| !u.is_empty()) else {
            return;
        };
        if let Some(msg) = button.get_attribute("data-confirm").filter(|m| !m.is_empty()) {
            if !confirm(&msg) {
                return;
            }
        }
        let redirect = button
            .get_attribute("data-redirect")
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.current());

        let nav = self.clone();
        spawn_local(async move {
            match nav.runtime.http.post_empty(&url).await {
                Ok(()) => nav.navigate(&redirect),
                Err(e) if e.is_forbidden() => {}
                Err(e) => {
                    error!("[cmms-nav] delete {url} failed: {e}");
                    nav.runtime.notifier.error(DELETE_FAILED);
                }
            }
        });
    }

    /// Resolve `href`, push a history entry and load it.
    pub fn navigate(self: &Rc<Self>, href: &str) {
        let content = content_from_href(href, &self.current(), &self.default_content());
        log!("[cmms-nav] navigate {href} -> {content}");
        self.write_history(&content, true);
        self.load_content(&content);
    }

    /// Load `url` into the slot without touching history.
    pub fn load_content(self: &Rc<Self>, url: &str) {
        let begun = self.machine.borrow_mut().begin(url);
        let seq = match begun {
            Ok(seq) => seq,
            Err(UrlError::Empty) => {
                warn!("[cmms-nav] empty content url; loading default");
                let fallback = self.default_content();
                if !fallback.trim().is_empty() {
                    self.navigate(&fallback);
                }
                return;
            }
            Err(e @ UrlError::Traversal(_)) => {
                warn!("[cmms-nav] {e}");
                self.show_failure(FailureKind::InvalidUrl);
                return;
            }
        };

        let nav = self.clone();
        let url = url.to_string();
        spawn_local(async move {
            let result = nav.runtime.http.fetch_fragment(&url).await;
            let outcome = result.as_ref().map(|_| ()).map_err(FailureKind::from);
            if !nav.machine.borrow_mut().finish(seq, outcome) {
                log!("[cmms-nav] dropping stale response for {url}");
                return;
            }
            match result {
                Ok(html) => nav.inject(&html),
                Err(e) => nav.on_load_error(seq, &url, &e),
            }
        });
    }

    fn on_load_error(self: &Rc<Self>, seq: u64, url: &str, e: &ApiError) {
        let kind = FailureKind::from(e);
        if kind != FailureKind::Forbidden {
            error!("[cmms-nav] content load failed for {url}: {e}");
        }
        self.show_failure(kind);

        if kind == FailureKind::NotFound {
            let nav = self.clone();
            set_timeout(self.runtime.config.not_found_redirect_ms, move || {
                // The user may have moved on meanwhile.
                if nav.machine.borrow().is_latest(seq) {
                    let fallback = nav.default_content();
                    nav.navigate(&fallback);
                }
            });
        }
    }

    /// The only way slot markup changes. Old listeners go with the old nodes.
    fn replace_slot(&self, html: &str) {
        self.slot_listeners.clear();
        self.slot.set_inner_html(html);
    }

    fn show_failure(&self, kind: FailureKind) {
        self.replace_slot(&panel::render(kind, &self.runtime.config.fallback_list_url));
    }

    fn inject(self: &Rc<Self>, html: &str) {
        let parsed = web_sys::DomParser::new()
            .ok()
            .and_then(|p| p.parse_from_string(html, web_sys::SupportedType::TextHtml).ok());

        let mut title = None;
        match &parsed {
            Some(doc) => {
                let root = doc
                    .query_selector("[data-slot-root]")
                    .ok()
                    .flatten()
                    .or_else(|| doc.query_selector("main").ok().flatten())
                    .or_else(|| doc.body().map(Into::into));
                match root {
                    Some(root) => self.replace_slot(&root.inner_html()),
                    None => self.replace_slot(html),
                }
                title = Some(doc.title()).filter(|t| !t.trim().is_empty());
            }
            None => self.replace_slot(html),
        }

        self.after_inject(title);
    }

    fn after_inject(self: &Rc<Self>, title: Option<String>) {
        self.runtime.csrf.sync_hidden_fields(&self.slot);
        self.behaviors.bind(&self.slot, &self.slot_listeners);
        self.bind_redirect_forms();
        upload::discover(&self.slot, &self.runtime, &self.slot_listeners);
        self.set_active(&self.current());

        if let (Some(title), Some(doc)) = (title, document()) {
            doc.set_title(&format!("{}{}", title.trim(), self.runtime.config.title_suffix));
        }
    }

    fn set_active(&self, current: &str) {
        let Some(doc) = document() else {
            return;
        };
        let Some(root) = doc.document_element() else {
            return;
        };
        for item in find_all(&root, ".sidebar .menu-item") {
            let _ = item.class_list().remove_1("active");
            let href = item.get_attribute("href").unwrap_or_default();
            if !menu_matches(&href, current) {
                continue;
            }
            let _ = item.class_list().add_1("active");
            let Some(group) = item.closest(".menu-group").ok().flatten() else {
                continue;
            };
            let _ = group.class_list().add_1("open");
            if let Some(title) = group.query_selector(".menu-title").ok().flatten() {
                let _ = title.set_attribute("aria-expanded", "true");
            }
        }
    }

    fn bind_redirect_forms(self: &Rc<Self>) {
        for el in find_all(&self.slot, "form[data-redirect]") {
            let Ok(form) = el.dyn_into::<HtmlFormElement>() else {
                continue;
            };
            if !mark_once(&form, "spa-submit") {
                continue;
            }
            let nav = self.clone();
            let form_ref = form.clone();
            self.slot_listeners.listen(&form, "submit", false, move |ev: Event| {
                ev.prevent_default();
                if form_ref.has_attribute("data-validate") && !form_ref.check_validity() {
                    return;
                }
                nav.submit_form(&form_ref);
            });
        }
    }

    fn submit_form(self: &Rc<Self>, form: &HtmlFormElement) {
        let current = self.current();
        let method = form
            .get_attribute("method")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "post".to_string());
        let action = form
            .get_attribute("action")
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| current.clone());
        let redirect = form
            .get_attribute("data-redirect")
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(current);
        let body = form_body(form);

        let nav = self.clone();
        let form = form.clone();
        spawn_local(async move {
            match nav.runtime.http.submit_form(&method, &action, body).await {
                Ok(()) => nav.navigate(&redirect),
                Err(e) if e.is_forbidden() => {}
                Err(e) => {
                    error!("[cmms-nav] submit to {action} failed: {e}");
                    show_form_notice(&form);
                }
            }
        });
    }
}

fn show_form_notice(form: &HtmlFormElement) {
    let Some(doc) = document() else {
        return;
    };
    for old in find_all(form, &format!("[{FORM_NOTICE_ATTR}]")) {
        old.remove();
    }
    let Ok(notice) = doc.create_element("div") else {
        return;
    };
    notice.set_class_name("notice danger");
    let _ = notice.set_attribute(FORM_NOTICE_ATTR, "");
    notice.set_text_content(Some(SAVE_FAILED));
    let _ = form.prepend_with_node_1(&notice);
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::config::EnvConfig;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn mount_slot() -> Element {
        let doc = document().expect("document");
        if let Some(old) = doc.get_element_by_id(SLOT_ID) {
            old.remove();
        }
        let slot = doc.create_element("div").expect("div");
        slot.set_id(SLOT_ID);
        doc.body().expect("body").append_child(&slot).expect("append");
        slot
    }

    #[wasm_bindgen_test]
    fn test_traversal_url_renders_panel_without_request() {
        let slot = mount_slot();
        let nav = FragmentNavigator::init(Runtime::new(EnvConfig::default())).expect("navigator");
        let pending = nav.machine.borrow().seq();

        nav.load_content("../../../etc");

        let machine = nav.machine.borrow();
        assert!(!machine.is_latest(pending), "initial load must not overwrite the panel");
        assert!(matches!(
            machine.view(),
            state::NavView::Failed { kind: FailureKind::InvalidUrl, .. }
        ));
        drop(machine);
        assert!(slot.inner_html().contains("잘못된 URL입니다"));
        assert!(slot.query_selector(".notice.danger").ok().flatten().is_some());
        slot.remove();
    }

    #[wasm_bindgen_test]
    fn test_replacing_slot_drops_previous_listeners() {
        let slot = mount_slot();
        let nav = FragmentNavigator::init(Runtime::new(EnvConfig::default())).expect("navigator");
        let page = r#"<html><head><title>설비 목록</title></head><body><main>
            <table><tr data-row-link="/plant/detail.html?id=1"><td>A</td></tr></table>
            <form method="post" action="/domain/plant/save" data-redirect="/plant/list.html"></form>
        </main></body></html>"#;

        nav.inject(page);
        let bound = nav.slot_listeners.len();
        assert!(bound >= 2, "row link and redirect form are bound");

        nav.inject(page);
        assert_eq!(nav.slot_listeners.len(), bound);

        nav.show_failure(FailureKind::Network);
        assert_eq!(nav.slot_listeners.len(), 0);
        slot.remove();
    }

    #[wasm_bindgen_test]
    fn test_history_state_round_trips_content() {
        let state = history_state("/plant/detail.html?id=9");
        assert_eq!(
            content_from_state(&state).as_deref(),
            Some("/plant/detail.html?id=9")
        );
        assert_eq!(content_from_state(&JsValue::NULL), None);
    }

    #[wasm_bindgen_test]
    fn test_form_body_encodes_text_fields_only() {
        let doc = document().expect("document");
        let form = doc.create_element("form").expect("form");
        form.set_inner_html(r#"<input name="name" value="펌프 A"><input name="qty" value="2"><input type="file" name="f">"#);
        let form: HtmlFormElement = form.dyn_into().expect("form element");
        assert_eq!(form_body(&form), "name=%ED%8E%8C%ED%94%84+A&qty=2");
    }
}
