//! Anti-forgery token handling.
//!
//! The server (Spring Security `CookieCsrfTokenRepository`) owns the token and
//! publishes it in the `XSRF-TOKEN` cookie. The client never caches it: every
//! request and every form sync reads it again.

use crate::config::EnvConfig;
use crate::notify::Notifier;
use crate::util::{document, find_all, page_origin};
use leptos::prelude::*;
use reqwest::header::{HeaderName, HeaderValue};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlDocument, HtmlInputElement};

pub(crate) const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
pub(crate) const CSRF_HEADER_NAME: &str = "x-csrf-token";
pub(crate) const CSRF_FIELD_NAME: &str = "_csrf";
pub(crate) const CSRF_META_NAME: &str = "_csrf";
pub(crate) const OPT_OUT_ATTR: &str = "data-no-csrf";

const SAFE_METHODS: [&str; 4] = ["GET", "HEAD", "OPTIONS", "TRACE"];

pub(crate) fn is_safe_method(method: &str) -> bool {
    SAFE_METHODS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method.trim()))
}

/// Value of cookie `name` in a `document.cookie` string, URL-decoded.
pub(crate) fn read_cookie(cookies: &str, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    cookies
        .split(';')
        .map(str::trim_start)
        .find_map(|entry| entry.strip_prefix(&prefix))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .filter(|v| !v.is_empty())
}

pub(crate) fn is_same_origin(target: &str, page_origin: &str) -> bool {
    match url::Url::parse(target) {
        Ok(u) => u.origin().ascii_serialization() == page_origin.trim_end_matches('/'),
        // Relative URLs always target the page's own origin.
        Err(_) => true,
    }
}

/// Same origin and not a safe method.
pub(crate) fn should_attach(method: &str, target: &str, page_origin: &str) -> bool {
    is_same_origin(target, page_origin) && !is_safe_method(method)
}

/// Header decision applied to an outgoing request.
pub(crate) fn apply_token(req: &mut reqwest::Request, token: Option<&str>, page_origin: &str) {
    let Some(token) = token else {
        return;
    };
    if !should_attach(req.method().as_str(), req.url().as_str(), page_origin) {
        return;
    }
    let Ok(value) = HeaderValue::from_str(token) else {
        leptos::logging::warn!("[cmms-csrf] token is not a valid header value");
        return;
    };
    req.headers_mut()
        .insert(HeaderName::from_static(CSRF_HEADER_NAME), value);
}

/// Whether a form should carry the hidden `_csrf` field.
pub(crate) fn form_wants_token(method_attr: Option<&str>, opted_out: bool, sync_get_forms: bool) -> bool {
    if opted_out {
        return false;
    }
    let method = method_attr.unwrap_or("get").trim();
    method.eq_ignore_ascii_case("post") || sync_get_forms
}

pub(crate) struct CsrfGuard {
    meta_fallback: bool,
    sync_get_forms: bool,
    login_url: String,
    notifier: Notifier,
    /// Session-expired notice is on screen; cleared by any of its actions.
    notice_open: RwSignal<bool>,
}

impl CsrfGuard {
    pub fn new(config: &EnvConfig, notifier: Notifier) -> Self {
        Self {
            meta_fallback: config.csrf_meta_fallback,
            sync_get_forms: config.csrf_sync_get_forms,
            login_url: config.login_url.clone(),
            notifier,
            notice_open: RwSignal::new(false),
        }
    }

    pub fn token(&self) -> Option<String> {
        let doc = document()?;
        let from_cookie = doc
            .clone()
            .dyn_into::<HtmlDocument>()
            .ok()
            .and_then(|d| d.cookie().ok())
            .and_then(|c| read_cookie(&c, CSRF_COOKIE_NAME));
        if from_cookie.is_some() || !self.meta_fallback {
            return from_cookie;
        }

        doc.query_selector(&format!("meta[name=\"{CSRF_META_NAME}\"]"))
            .ok()
            .flatten()
            .and_then(|m| m.get_attribute("content"))
            .filter(|v| !v.is_empty())
    }

    pub fn prepare(&self, req: &mut reqwest::Request) {
        let origin = page_origin().unwrap_or_default();
        apply_token(req, self.token().as_deref(), &origin);
    }

    /// Create or refresh the hidden `_csrf` input of every eligible form under `root`.
    pub fn sync_hidden_fields(&self, root: &Element) {
        let Some(token) = self.token() else {
            return;
        };
        let Some(doc) = document() else {
            return;
        };

        for form in find_all(root, "form") {
            let method = form.get_attribute("method");
            if !form_wants_token(
                method.as_deref(),
                form.has_attribute(OPT_OUT_ATTR),
                self.sync_get_forms,
            ) {
                continue;
            }

            let existing = form
                .query_selector(&format!("input[name=\"{CSRF_FIELD_NAME}\"]"))
                .ok()
                .flatten();
            let input = match existing {
                Some(el) => el,
                None => {
                    let Ok(el) = doc.create_element("input") else {
                        continue;
                    };
                    let _ = el.set_attribute("type", "hidden");
                    let _ = el.set_attribute("name", CSRF_FIELD_NAME);
                    let _ = form.append_child(&el);
                    el
                }
            };

            if let Ok(input) = input.dyn_into::<HtmlInputElement>() {
                input.set_value(&token);
            }
        }
    }

    pub fn sync_document(&self) {
        if let Some(root) = document().and_then(|d| d.document_element()) {
            self.sync_hidden_fields(&root);
        }
    }

    /// Called for every same-origin 403. Shows the notice once until the user reacts.
    pub fn on_forbidden(&self) {
        if self.notice_open.get_untracked() {
            return;
        }
        leptos::logging::warn!("[cmms-csrf] request forbidden; asking the user to refresh the session");
        self.notifier
            .session_expired(self.notice_open, self.login_url.clone());
    }

    #[cfg(test)]
    pub fn notice_open(&self) -> bool {
        self.notice_open.get_untracked()
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn guard() -> CsrfGuard {
        CsrfGuard::new(&EnvConfig::default(), Notifier::new(60_000))
    }

    fn set_cookie(value: &str) {
        let doc = document()
            .and_then(|d| d.dyn_into::<HtmlDocument>().ok())
            .expect("html document");
        doc.set_cookie(&format!("{CSRF_COOKIE_NAME}={value}; path=/"))
            .expect("cookie should be writable");
    }

    fn fixture(html: &str) -> Element {
        let doc = document().expect("document");
        let root = doc.create_element("div").expect("div");
        root.set_inner_html(html);
        doc.body().expect("body").append_child(&root).expect("append");
        root
    }

    #[wasm_bindgen_test]
    fn test_sync_hidden_fields_creates_and_refreshes_post_inputs() {
        set_cookie("first%20token");
        let root = fixture(
            r#"<form id="p" method="post"></form>
               <form id="g" method="get"></form>
               <form id="o" method="post" data-no-csrf></form>"#,
        );
        let g = guard();
        g.sync_hidden_fields(&root);

        let value = |sel: &str| {
            root.query_selector(sel)
                .ok()
                .flatten()
                .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
                .map(|i| i.value())
        };
        assert_eq!(value("#p input[name=_csrf]").as_deref(), Some("first token"));
        assert!(value("#g input[name=_csrf]").is_none());
        assert!(value("#o input[name=_csrf]").is_none());

        set_cookie("second");
        g.sync_hidden_fields(&root);
        assert_eq!(value("#p input[name=_csrf]").as_deref(), Some("second"));
        assert_eq!(
            root.query_selector_all("#p input[name=_csrf]").map(|l| l.length()).ok(),
            Some(1)
        );
        root.remove();
    }

    #[wasm_bindgen_test]
    fn test_forbidden_notice_shown_once_until_acknowledged() {
        let g = guard();
        g.on_forbidden();
        assert!(g.notice_open());
        g.on_forbidden();
        let count = document()
            .and_then(|d| d.query_selector_all(&format!("#{}", crate::notify::NOTICE_HOST_ID)).ok())
            .map(|l| l.length());
        assert_eq!(count, Some(1));
    }
}
