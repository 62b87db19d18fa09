use serde::{Deserialize, Serialize};

/// Runtime settings injected by the layout template.
///
/// The layout may define `window.CMMS_ENV = { ... }` before loading the wasm
/// bundle. Any field it leaves out keeps its default.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct EnvConfig {
    /// Fragment shown when nothing else is requested.
    pub default_content: String,
    /// Escape hatch offered by error panels.
    pub fallback_list_url: String,
    pub login_url: String,
    pub title_suffix: String,
    pub toast_duration_ms: i32,
    pub not_found_redirect_ms: i32,

    /// Read `<meta name="_csrf">` when the cookie is missing.
    pub csrf_meta_fallback: bool,
    /// Also give GET forms a hidden `_csrf` input.
    pub csrf_sync_get_forms: bool,

    pub max_files: usize,
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
}

pub(crate) const ENV_GLOBAL: &str = "CMMS_ENV";

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            default_content: "/plant/list.html".to_string(),
            fallback_list_url: "/domain/company/list".to_string(),
            login_url: "/auth/login.html".to_string(),
            title_suffix: " · CMMS".to_string(),
            toast_duration_ms: 3000,
            not_found_redirect_ms: 3000,
            csrf_meta_fallback: true,
            csrf_sync_get_forms: false,
            max_files: 10,
            max_file_size: 10 * 1024 * 1024,
            allowed_types: vec![
                "image/*".to_string(),
                "application/pdf".to_string(),
                "text/*".to_string(),
            ],
        }
    }
}

impl EnvConfig {
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Self>(json) {
            Ok(cfg) => cfg,
            Err(e) => {
                leptos::logging::warn!("[cmms] ignoring malformed {ENV_GLOBAL}: {e}");
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Some(env) = window.get(ENV_GLOBAL) else {
            return Self::default();
        };
        if env.is_undefined() || !env.is_object() {
            return Self::default();
        }

        js_sys::JSON::stringify(&env)
            .ok()
            .and_then(|s| s.as_string())
            .map(|json| Self::from_json(&json))
            .unwrap_or_default()
    }
}
