use super::url::{validate_content_url, UrlError};
use crate::api::{ApiError, ApiErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailureKind {
    InvalidUrl,
    NotFound,
    Forbidden,
    Network,
}

impl From<&ApiError> for FailureKind {
    fn from(e: &ApiError) -> Self {
        match e.kind {
            ApiErrorKind::Forbidden => FailureKind::Forbidden,
            ApiErrorKind::NotFound => FailureKind::NotFound,
            ApiErrorKind::Network | ApiErrorKind::Http | ApiErrorKind::Parse => {
                FailureKind::Network
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum NavView {
    #[default]
    Idle,
    Loading { url: String, seq: u64 },
    Loaded { url: String },
    Failed { url: String, kind: FailureKind },
}

/// Navigation bookkeeping without any DOM access.
///
/// Each accepted load takes a new sequence number; a response is applied only
/// while its number is still the latest one.
#[derive(Clone, Debug, Default)]
pub(crate) struct NavMachine {
    seq: u64,
    current: String,
    view: NavView,
}

impl NavMachine {
    #[cfg(test)]
    pub fn view(&self) -> &NavView {
        &self.view
    }

    #[cfg(test)]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Content URL last asked for, used as the base for relative links.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Start loading `url`.
    ///
    /// Every call takes a new sequence number, so loads still in flight turn
    /// stale even when `url` itself is rejected.
    pub fn begin(&mut self, url: &str) -> Result<u64, UrlError> {
        self.current = url.to_string();
        self.seq += 1;
        if let Err(e) = validate_content_url(url) {
            self.view = NavView::Failed {
                url: url.to_string(),
                kind: FailureKind::InvalidUrl,
            };
            return Err(e);
        }
        self.view = NavView::Loading {
            url: url.to_string(),
            seq: self.seq,
        };
        Ok(self.seq)
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.seq
    }

    /// Record the outcome of load `seq`. Returns `false` for stale results.
    pub fn finish(&mut self, seq: u64, outcome: Result<(), FailureKind>) -> bool {
        if !self.is_latest(seq) {
            return false;
        }
        let url = match &self.view {
            NavView::Loading { url, .. } => url.clone(),
            _ => self.current.clone(),
        };
        self.view = match outcome {
            Ok(()) => NavView::Loaded { url },
            Err(kind) => NavView::Failed { url, kind },
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_fails_immediately() {
        let mut m = NavMachine::default();
        assert!(m.begin("../../../etc").is_err());
        assert_eq!(m.seq(), 1);
        assert_eq!(
            m.view(),
            &NavView::Failed {
                url: "../../../etc".to_string(),
                kind: FailureKind::InvalidUrl
            }
        );
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut m = NavMachine::default();
        let first = m.begin("/plant/list.html").expect("valid");
        let second = m.begin("/memo/list.html").expect("valid");
        assert!(second > first);

        assert!(!m.finish(first, Ok(())));
        assert_eq!(
            m.view(),
            &NavView::Loading {
                url: "/memo/list.html".to_string(),
                seq: second
            }
        );

        assert!(m.finish(second, Err(FailureKind::NotFound)));
        assert_eq!(
            m.view(),
            &NavView::Failed {
                url: "/memo/list.html".to_string(),
                kind: FailureKind::NotFound
            }
        );
    }

    #[test]
    fn test_invalid_url_invalidates_pending_load() {
        let mut m = NavMachine::default();
        let pending = m.begin("/plant/list.html").expect("valid");
        assert!(m.begin("../../../etc").is_err());

        assert!(!m.is_latest(pending));
        assert!(!m.finish(pending, Ok(())));
        assert_eq!(m.current(), "../../../etc");
        assert!(matches!(
            m.view(),
            NavView::Failed { kind: FailureKind::InvalidUrl, .. }
        ));
    }

    #[test]
    fn test_loaded_tracks_current() {
        let mut m = NavMachine::default();
        let s = m.begin("/plant/detail.html?id=3").expect("valid");
        assert!(m.finish(s, Ok(())));
        assert_eq!(m.current(), "/plant/detail.html?id=3");
        assert!(matches!(m.view(), NavView::Loaded { .. }));
    }
}
