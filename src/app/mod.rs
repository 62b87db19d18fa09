use crate::behaviors::DomBehaviors;
use crate::config::EnvConfig;
use crate::nav::FragmentNavigator;
use crate::state::Runtime;
use crate::upload;
use crate::util::{document, listen, ListenerScope};
use leptos::logging::log;
use web_sys::Event;

/// Wire everything up once the layout markup is parsed.
pub fn start() {
    let Some(doc) = document() else {
        return;
    };
    if doc.ready_state() == "loading" {
        let fired = std::cell::Cell::new(false);
        listen(&doc, "DOMContentLoaded", false, move |_ev: Event| {
            if !fired.replace(true) {
                boot();
            }
        });
    } else {
        boot();
    }
}

fn boot() {
    let Some(root) = document().and_then(|d| d.document_element()) else {
        return;
    };
    let runtime = Runtime::new(EnvConfig::load());
    runtime.csrf.sync_hidden_fields(&root);

    // Layout chrome stays for the whole visit; the slot tracks its own listeners.
    let page = ListenerScope::page();
    match FragmentNavigator::init(runtime.clone()) {
        Some(nav) => nav.behaviors().bind(&root, &page),
        None => DomBehaviors::default().bind(&root, &page),
    }
    upload::discover(&root, &runtime, &page);
    log!("[cmms] runtime started");
}
