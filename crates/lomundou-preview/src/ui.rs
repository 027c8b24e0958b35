//! Tracker simulation panel and keyboard shortcuts

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use lomundou_core::{Detection, MarkerIndex, TrackingEvent};

use crate::markers::{MarkerTable, ModelState, TrackingMessage};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, keyboard_tracking)
            // bevy_egui 0.38 draws in its own pass for proper input handling
            .add_systems(EguiPrimaryContextPass, marker_panel);
    }
}

/// Digit keys `1`..`9` pick markers 0..8, `0` picks marker 9
pub fn key_marker(key: KeyCode) -> Option<MarkerIndex> {
    let slot = match key {
        KeyCode::Digit1 => 0,
        KeyCode::Digit2 => 1,
        KeyCode::Digit3 => 2,
        KeyCode::Digit4 => 3,
        KeyCode::Digit5 => 4,
        KeyCode::Digit6 => 5,
        KeyCode::Digit7 => 6,
        KeyCode::Digit8 => 7,
        KeyCode::Digit9 => 8,
        KeyCode::Digit0 => 9,
        _ => return None,
    };
    Some(MarkerIndex(slot))
}

/// The event that flips a marker's current detection
pub fn toggled_detection(index: MarkerIndex, current: Detection) -> TrackingEvent {
    match current {
        Detection::Detected => TrackingEvent::Lost(index),
        Detection::NotDetected => TrackingEvent::Found(index),
    }
}

fn keyboard_tracking(
    keys: Res<ButtonInput<KeyCode>>,
    table: Res<MarkerTable>,
    mut out: MessageWriter<TrackingMessage>,
) {
    for key in keys.get_just_pressed() {
        let Some(index) = key_marker(*key) else {
            continue;
        };
        let Some(marker) = table.get(index) else {
            continue;
        };
        out.write(TrackingMessage(toggled_detection(index, marker.detection)));
    }
}

fn marker_panel(
    mut contexts: EguiContexts,
    table: Res<MarkerTable>,
    mut out: MessageWriter<TrackingMessage>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::SidePanel::left("markers").resizable(false).show(ctx, |ui| {
        ui.heading("Pages");
        ui.label("Keys 1-0 toggle a page");
        ui.separator();

        for marker in &table.markers {
            let index = marker.spec.index;
            ui.horizontal(|ui| {
                ui.label(format!("Page {}", index.page()));

                match marker.state {
                    ModelState::Loading => {
                        ui.label(egui::RichText::new("loading").color(egui::Color32::GRAY));
                    }
                    ModelState::Failed => {
                        ui.label(egui::RichText::new("missing").color(egui::Color32::RED));
                    }
                    ModelState::Ready => {
                        let detected = marker.detection == Detection::Detected;
                        let (text, color) = if detected {
                            ("found", egui::Color32::GREEN)
                        } else {
                            ("lost", egui::Color32::GRAY)
                        };
                        ui.label(egui::RichText::new(text).color(color));

                        if ui.add_enabled(!detected, egui::Button::new("Found")).clicked() {
                            out.write(TrackingMessage(TrackingEvent::Found(index)));
                        }
                        if ui.add_enabled(detected, egui::Button::new("Lost")).clicked() {
                            out.write(TrackingMessage(TrackingEvent::Lost(index)));
                        }
                        if marker.animations_paused {
                            ui.label("paused");
                        }
                    }
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_keys_map_to_pages() {
        assert_eq!(key_marker(KeyCode::Digit1), Some(MarkerIndex(0)));
        assert_eq!(key_marker(KeyCode::Digit9), Some(MarkerIndex(8)));
        assert_eq!(key_marker(KeyCode::Digit0), Some(MarkerIndex(9)));
        assert_eq!(key_marker(KeyCode::KeyA), None);
    }

    #[test]
    fn test_toggled_detection() {
        let index = MarkerIndex(4);
        assert_eq!(toggled_detection(index, Detection::NotDetected), TrackingEvent::Found(index));
        assert_eq!(toggled_detection(index, Detection::Detected), TrackingEvent::Lost(index));
    }
}
