use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::tw_merge;

mod components {
    use super::*;
    clx! {AlertDescription, p, "text-sm [&_p]:leading-relaxed"}
}

pub use components::*;

/// Colour scheme of an [`Alert`]; mirrors the toast levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertTone {
    #[default]
    Info,
    Success,
    Warning,
    Destructive,
}

impl AlertTone {
    pub fn class(self) -> &'static str {
        match self {
            AlertTone::Info => "border-blue-500/40 bg-blue-500 text-white",
            AlertTone::Success => "border-emerald-500/40 bg-emerald-500 text-white",
            AlertTone::Warning => "border-amber-500/40 bg-amber-500 text-white",
            AlertTone::Destructive => "border-red-500/40 bg-red-500 text-white",
        }
    }
}

#[component]
pub fn Alert(
    children: Children,
    #[prop(optional)] tone: AlertTone,
    #[prop(optional, into)] class: String,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "relative w-full rounded-lg border px-4 py-3 text-sm font-medium shadow-lg",
        tone.class(),
        class
    );

    view! {
        <div class=merged_class role="alert">
            {children()}
        </div>
    }
}
