//! Lomundou Web - MindAR picture book in the browser
//!
//! Binds the core experience to MindAR image tracking and three.js rendering.

mod bindings;
mod config;
mod input;
mod platform;

use std::cell::RefCell;
use std::rc::Rc;

use lomundou_core::{Experience, SessionError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use platform::{GltfDecoder, MindArSession};

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = run().await {
            tracing::error!("AR experience failed to start: {}", e);
            if let Some(window) = web_sys::window() {
                let _ = window.alert_with_message(&format!("Could not start the AR experience: {}", e));
            }
        }
    });
}

async fn run() -> Result<(), SessionError> {
    let config = config::load().await?;

    let session = MindArSession::new(&config)?;
    let decoder = GltfDecoder::new(&config.experience.decoder_path);
    let experience = Experience::launch(session, &decoder, &config).await?;

    let renderer = experience.session().renderer().clone();
    let experience = Rc::new(RefCell::new(experience));

    let frame = Closure::wrap(Box::new(move |now_ms: f64| {
        if let Ok(mut experience) = experience.try_borrow_mut() {
            experience.frame(now_ms);
        }
    }) as Box<dyn FnMut(f64)>);
    renderer.set_animation_loop(Some(frame.as_ref().unchecked_ref()));
    // The loop runs for the lifetime of the page
    frame.forget();

    tracing::info!("Animation loop running");
    Ok(())
}
