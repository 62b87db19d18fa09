//! Toasts and the session-expired notice.
//!
//! Both are small Leptos views mounted into their own host element under
//! `<body>`, so they never touch server-rendered markup.

use crate::components::ui::{
    Alert, AlertDescription, AlertTone, Button, ButtonSize, ButtonVariant, Card, CardDescription,
    CardFooter, CardHeader, CardTitle,
};
use crate::util::{document, set_timeout};
use icons::X;
use leptos::mount::mount_to;
use leptos::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;

pub(crate) const TOAST_HOST_CLASS: &str = "cmms-notification";
pub(crate) const NOTICE_HOST_ID: &str = "cmms-session-notice";

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastLevel {
    fn tone(self) -> AlertTone {
        match self {
            ToastLevel::Info => AlertTone::Info,
            ToastLevel::Success => AlertTone::Success,
            ToastLevel::Warning => AlertTone::Warning,
            ToastLevel::Error => AlertTone::Destructive,
        }
    }
}

/// A mounted view plus the element hosting it.
struct Mounted {
    host: web_sys::HtmlElement,
    dispose: Box<dyn FnOnce()>,
}

impl Mounted {
    fn unmount(self) {
        (self.dispose)();
        self.host.remove();
    }
}

fn create_host(class: &str, id: Option<&str>) -> Option<web_sys::HtmlElement> {
    let doc = document()?;
    let body = doc.body()?;
    let host = doc
        .create_element("div")
        .ok()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()?;
    host.set_class_name(class);
    if let Some(id) = id {
        host.set_id(id);
    }
    body.append_child(&host).ok()?;
    Some(host)
}

#[derive(Clone)]
pub(crate) struct Notifier {
    duration_ms: i32,
    toast_seq: RwSignal<u64>,
    toast: Rc<RefCell<Option<Mounted>>>,
    notice: Rc<RefCell<Option<Mounted>>>,
}

impl Notifier {
    pub fn new(duration_ms: i32) -> Self {
        Self {
            duration_ms,
            toast_seq: RwSignal::new(0),
            toast: Rc::new(RefCell::new(None)),
            notice: Rc::new(RefCell::new(None)),
        }
    }

    /// Show a toast, replacing whichever one is currently on screen.
    pub fn show(&self, message: impl Into<String>, level: ToastLevel) {
        let message = message.into();

        if let Some(prev) = self.toast.borrow_mut().take() {
            prev.unmount();
        }

        let Some(host) = create_host(&format!("{TOAST_HOST_CLASS} {level}"), None) else {
            return;
        };
        let _ = host.set_attribute(
            "style",
            "position:fixed;top:20px;right:20px;z-index:9999;max-width:400px;",
        );

        let seq = self.toast_seq.get_untracked().wrapping_add(1);
        self.toast_seq.set(seq);
        let visible = RwSignal::new(true);
        let message = StoredValue::new(message);

        let handle = mount_to(host.clone(), move || {
            view! {
                <Show when=move || visible.get() fallback=|| ().into_view()>
                    <Alert tone=level.tone()>
                        <div class="flex items-start justify-between gap-3">
                            <AlertDescription>{move || message.get_value()}</AlertDescription>
                            <Button
                                variant=ButtonVariant::Ghost
                                size=ButtonSize::Icon
                                attr:aria-label="닫기"
                                on:click=move |_| visible.set(false)
                            >
                                <X />
                            </Button>
                        </div>
                    </Alert>
                </Show>
            }
        });

        *self.toast.borrow_mut() = Some(Mounted {
            host,
            dispose: Box::new(move || drop(handle)),
        });

        let toast = self.toast.clone();
        let toast_seq = self.toast_seq;
        set_timeout(self.duration_ms, move || {
            // A newer toast owns the host by now.
            if toast_seq.get_untracked() != seq {
                return;
            }
            if let Some(current) = toast.borrow_mut().take() {
                current.unmount();
            }
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(message, ToastLevel::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(message, ToastLevel::Success);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.show(message, ToastLevel::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(message, ToastLevel::Error);
    }

    /// Blocking "session expired" card with recovery actions.
    ///
    /// `open` is owned by the caller; every action resets it to `false`, and
    /// the card is only visible while it is `true`.
    pub fn session_expired(&self, open: RwSignal<bool>, login_url: String) {
        open.set(true);
        if self.notice.borrow().is_some() {
            return;
        }

        let Some(host) = create_host("cmms-session-notice", Some(NOTICE_HOST_ID)) else {
            return;
        };

        let login_url = StoredValue::new(login_url);
        let handle = mount_to(host.clone(), move || {
            view! {
                <Show when=move || open.get() fallback=|| ().into_view()>
                    <div class="fixed inset-0 z-[10000] flex items-center justify-center bg-black/40">
                        <Card class="w-full max-w-sm">
                            <CardHeader>
                                <CardTitle>"세션이 만료되었습니다."</CardTitle>
                                <CardDescription>
                                    "보안 토큰이 만료되었거나 권한이 없습니다. 페이지를 새로고침하거나 다시 로그인해주세요."
                                </CardDescription>
                            </CardHeader>
                            <CardFooter>
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Sm
                                    on:click=move |_| open.set(false)
                                >
                                    "닫기"
                                </Button>
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Sm
                                    on:click=move |_| {
                                        open.set(false);
                                        let _ = window().location().set_href(&login_url.get_value());
                                    }
                                >
                                    "다시 로그인"
                                </Button>
                                <Button
                                    size=ButtonSize::Sm
                                    on:click=move |_| {
                                        open.set(false);
                                        let _ = window().location().reload();
                                    }
                                >
                                    "새로고침"
                                </Button>
                            </CardFooter>
                        </Card>
                    </div>
                </Show>
            }
        });

        *self.notice.borrow_mut() = Some(Mounted {
            host,
            dispose: Box::new(move || drop(handle)),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_level_classes() {
        assert_eq!(ToastLevel::Success.as_ref(), "success");
        assert_eq!(ToastLevel::Error.to_string(), "error");
        assert_eq!(ToastLevel::Error.tone(), AlertTone::Destructive);
        assert_eq!(ToastLevel::Info.tone(), AlertTone::Info);
    }
}
