mod api;
mod app;
mod behaviors;
mod components;
mod config;
mod csrf;
mod models;
mod nav;
mod notify;
mod state;
mod upload;
mod util;

#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Test binaries bring their own entry point; the browser bundle starts here.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    app::start();
}
