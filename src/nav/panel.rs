//! Error panels rendered into the slot.

use super::state::FailureKind;

pub(crate) const RETRY_ATTR: &str = "data-nav-retry";

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Markup for a failed load.
///
/// Forbidden gets a plain access-denied panel; the session notice carries the
/// recovery actions.
pub(crate) fn render(kind: FailureKind, fallback_list_url: &str) -> String {
    let list = escape(fallback_list_url);
    match kind {
        FailureKind::InvalidUrl => format!(
            r#"<div class="notice danger"><h3>잘못된 URL입니다</h3><p>보안상의 이유로 해당 URL에 접근할 수 없습니다.</p><a class="btn primary" href="{list}">목록으로 이동</a></div>"#
        ),
        FailureKind::NotFound => format!(
            r#"<div class="notice danger"><h3>페이지를 찾을 수 없습니다</h3><p>요청하신 페이지가 존재하지 않습니다. 잠시 후 기본 페이지로 이동합니다.</p><a class="btn primary" href="{list}">홈으로 이동</a></div>"#
        ),
        FailureKind::Network => format!(
            r#"<div class="notice danger"><h3>콘텐츠를 불러오지 못했습니다</h3><p>네트워크 오류 또는 서버 문제가 발생했습니다.</p><button type="button" class="btn primary" {RETRY_ATTR}>다시 시도</button><a class="btn" href="{list}">목록으로 이동</a></div>"#
        ),
        FailureKind::Forbidden => format!(
            r#"<div class="notice danger"><h3>접근 권한이 없습니다</h3><p>이 페이지에 접근할 권한이 없습니다.</p><a class="btn primary" href="{list}">목록으로 이동</a></div>"#
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_panel() {
        let html = render(FailureKind::InvalidUrl, "/domain/company/list");
        assert!(html.starts_with(r#"<div class="notice danger">"#));
        assert!(html.contains("잘못된 URL입니다"));
        assert!(html.contains(r#"href="/domain/company/list""#));
    }

    #[test]
    fn test_network_panel_has_retry() {
        let html = render(FailureKind::Network, "/domain/company/list");
        assert!(html.contains(RETRY_ATTR));
        assert!(html.contains("목록으로 이동"));
    }

    #[test]
    fn test_forbidden_panel_has_no_retry() {
        let html = render(FailureKind::Forbidden, "/x");
        assert!(html.contains("접근 권한이 없습니다"));
        assert!(!html.contains(RETRY_ATTR));
    }

    #[test]
    fn test_fallback_url_is_escaped() {
        let html = render(FailureKind::NotFound, "/x?a=1&b=\"2\"");
        assert!(html.contains(r#"href="/x?a=1&amp;b=&quot;2&quot;""#));
    }
}
