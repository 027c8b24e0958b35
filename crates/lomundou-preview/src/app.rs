//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use lomundou_core::{ExperienceConfig, GestureRegistry};

use crate::gestures::{Gestures, GesturesPlugin, Toggles};
use crate::markers::MarkersPlugin;
use crate::scene::ScenePlugin;
use crate::ui::UiPlugin;

/// Experience configuration shared by every plugin
#[derive(Debug, Clone, Resource)]
pub struct PreviewConfig(pub ExperienceConfig);

/// Run the Bevy application
pub fn run() {
    let config = load_config();

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.96, 0.94, 0.88))) // Paper white
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Lomundou AR Preview".to_string(),
                    canvas: Some("#preview-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Asset paths in the config are relative to the page
                file_path: "".to_string(),
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking plugins must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(Gestures(GestureRegistry::new(config.gestures.clone())))
        .init_resource::<Toggles>()
        .insert_resource(PreviewConfig(config))
        .add_plugins(ScenePlugin)
        .add_plugins(MarkersPlugin)
        .add_plugins(GesturesPlugin)
        .add_plugins(UiPlugin)
        .run();
}

/// Built-in experience, with the audio variant taken from `?variant=` when present
fn load_config() -> ExperienceConfig {
    let config = ExperienceConfig::default();
    let config = match variant_param() {
        Some(variant) => {
            tracing::info!("Audio variant {} selected from URL", variant);
            config.with_audio_variant(variant)
        }
        None => config,
    };

    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            tracing::error!("Invalid experience config ({}), using built-in experience", e);
            ExperienceConfig::default()
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn variant_param() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    params.get("variant").filter(|v| !v.trim().is_empty())
}

#[cfg(not(target_arch = "wasm32"))]
fn variant_param() -> Option<String> {
    None
}
