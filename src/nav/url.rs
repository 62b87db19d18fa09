//! Pure URL helpers for fragment navigation.

use url::Url;

const LAYOUT_PREFIX: &str = "/layout/";
const LAYOUT_PAGE: &str = "/layout/defaultLayout.html";

// Only used to give the `url` crate something absolute to resolve against.
const SYNTHETIC_ORIGIN: &str = "http://cmms.invalid";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum UrlError {
    #[error("empty content url")]
    Empty,
    #[error("path traversal in content url: {0}")]
    Traversal(String),
}

/// `@{/x}` template leftovers become `/x`.
fn strip_template(href: &str) -> &str {
    href.strip_prefix("@{")
        .and_then(|s| s.strip_suffix('}'))
        .filter(|s| !s.is_empty())
        .unwrap_or(href)
}

/// Path (before any query or fragment) ends in `.html`.
fn is_html_partial(href: &str) -> bool {
    href.split(['?', '#'])
        .next()
        .is_some_and(|path| path.ends_with(".html"))
}

/// Directory part of `base`, always ending in `/`.
fn base_dir(base: &str) -> &str {
    match base.rfind('/') {
        Some(i) => &base[..=i],
        None => "/",
    }
}

/// Turn a link target into a content URL.
///
/// Absolute and root-relative URLs pass through. Non-HTML paths are
/// root-relative controller routes; HTML partials resolve against the
/// directory of `base`.
pub(crate) fn resolve_url(href: &str, base: &str) -> String {
    let href = strip_template(href.trim());
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("http://") || href.starts_with("https://") || href.starts_with('/') {
        return href.to_string();
    }
    if !is_html_partial(href) {
        return format!("/{}", href.trim_start_matches('/'));
    }

    let dir = base_dir(base);
    let joined = Url::parse(SYNTHETIC_ORIGIN)
        .and_then(|origin| origin.join(dir))
        .and_then(|b| b.join(href));
    match joined {
        Ok(u) => match u.query() {
            Some(q) => format!("{}?{q}", u.path()),
            None => u.path().to_string(),
        },
        Err(_) => href.to_string(),
    }
}

/// The `content` query parameter of a layout URL.
pub(crate) fn content_param(href: &str) -> Option<String> {
    let u = Url::parse(SYNTHETIC_ORIGIN).ok()?.join(href).ok()?;
    u.query_pairs()
        .find(|(k, _)| k == "content")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Content URL a navigation to `href` should load.
pub(crate) fn content_from_href(href: &str, current: &str, default_content: &str) -> String {
    if href.starts_with(LAYOUT_PREFIX) {
        return content_param(href).unwrap_or_else(|| default_content.to_string());
    }
    resolve_url(href, current)
}

/// Address bar URL for a content URL.
pub(crate) fn layout_url(content: &str) -> String {
    format!("{LAYOUT_PAGE}?content={}", urlencoding::encode(content))
}

pub(crate) fn validate_content_url(url: &str) -> Result<(), UrlError> {
    if url.trim().is_empty() {
        return Err(UrlError::Empty);
    }
    // A single `..` is how layout-relative defaults are written.
    if url.matches("..").count() > 1 {
        return Err(UrlError::Traversal(url.to_string()));
    }
    Ok(())
}

/// Path of a possibly relative URL, without query or fragment.
pub(crate) fn path_of(url: &str) -> String {
    match Url::parse(SYNTHETIC_ORIGIN).and_then(|o| o.join(url)) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Links the browser should follow natively.
pub(crate) fn is_bypassed(href: &str, hard_nav: bool, target: &str) -> bool {
    const NATIVE_PREFIXES: [&str; 5] = ["http", "mailto:", "#", "/api/auth/logout", "/auth/"];
    href.trim().is_empty()
        || NATIVE_PREFIXES.iter().any(|p| href.starts_with(p))
        || hard_nav
        || target == "_blank"
}

/// Whether a sidebar link (`/layout/...?content=X`) points at `current`.
pub(crate) fn menu_matches(menu_href: &str, current: &str) -> bool {
    if !menu_href.starts_with(LAYOUT_PREFIX) {
        return false;
    }
    content_param(menu_href).is_some_and(|c| path_of(&c) == path_of(current))
}
