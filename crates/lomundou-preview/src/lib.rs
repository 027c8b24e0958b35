//! Lomundou Preview - picture book markers without a camera
//!
//! Renders the configured models with Bevy and lets the tracker be simulated
//! from the keyboard or a side panel, so pages can be checked on any browser.

mod app;
mod gestures;
mod markers;
mod scene;
mod ui;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    app::run();
}
