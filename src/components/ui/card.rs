use leptos::prelude::*;
use leptos_ui::clx;

// Dialog surface for the session-expired notice.
mod components {
    use super::*;
    clx! {Card, div, "flex flex-col gap-3 rounded-lg border border-slate-200 bg-white py-5 text-slate-900 shadow-2xl"}
    clx! {CardHeader, div, "flex flex-col gap-1 px-5"}
    clx! {CardTitle, h2, "text-base font-semibold"}
    clx! {CardDescription, p, "text-sm text-slate-600"}
    clx! {CardFooter, footer, "flex flex-wrap items-center justify-end gap-2 px-5 pt-1"}
}

pub use components::*;
