//! Drag-to-rotate, pinch-to-zoom and tap-to-toggle on the preview models
//!
//! Bevy mouse and touch input is turned into the same pointer events the
//! browser listeners produce, then run through the core gesture registry.

use std::collections::BTreeSet;

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use bevy_picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};
use lomundou_core::{
    AnimationMixer, GestureEffect, GestureRegistry, InteractionToggle, MarkerIndex, Point, PointerEvent, PressFilter,
};

use crate::markers::{
    finish_loading, from_bevy, to_bevy, MarkerAnimation, MarkerModel, MarkerTable, ModelPose, PlayerMixer,
};
use crate::scene::MainCamera;

pub struct GesturesPlugin;

impl Plugin for GesturesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerTracker>()
            .add_message::<PointerMessage>()
            .add_systems(Update, (
                collect_pointer_input,
                (apply_gestures, toggle_on_tap),
            ).chain().after(finish_loading));
    }
}

/// Gesture state for every model that loaded
#[derive(Resource)]
pub struct Gestures(pub GestureRegistry);

/// Models that respond to taps
#[derive(Resource, Default)]
pub struct Toggles(pub InteractionToggle);

#[derive(Message, Debug, Clone)]
pub struct PointerMessage(pub PointerEvent);

/// Raw pointer input for one frame
#[derive(Debug, Clone, Default)]
pub struct PointerSnapshot {
    pub cursor: Option<Vec2>,
    pub mouse_pressed: bool,
    pub mouse_released: bool,
    pub touches: Vec<Vec2>,
    pub touch_started: bool,
    pub touch_moved: bool,
    pub touch_ended: bool,
}

/// Turns per-frame input snapshots into pointer events
#[derive(Debug, Resource, Default)]
pub struct PointerTracker {
    last_cursor: Option<Vec2>,
    presses: PressFilter,
}

impl PointerTracker {
    pub fn events(&mut self, input: &PointerSnapshot) -> Vec<PointerEvent> {
        let mut events = Vec::new();

        if input.touch_started {
            events.push(PointerEvent::TouchStart(points(&input.touches)));
        } else if input.touch_moved && !input.touches.is_empty() {
            events.push(PointerEvent::TouchMove(points(&input.touches)));
        }
        if input.touch_ended {
            events.push(PointerEvent::TouchEnd);
        }

        if let Some(cursor) = input.cursor {
            if input.mouse_pressed {
                events.push(PointerEvent::MouseDown(point(cursor)));
            } else if self.last_cursor != Some(cursor) {
                events.push(PointerEvent::MouseMove(point(cursor)));
            }
        }
        if input.mouse_released {
            events.push(PointerEvent::MouseUp);
        }

        self.last_cursor = input.cursor;
        events.retain(|event| self.presses.accept(event));
        events
    }
}

fn point(v: Vec2) -> Point {
    Point::new(v.x, v.y)
}

fn points(touches: &[Vec2]) -> Vec<Point> {
    touches.iter().copied().map(point).collect()
}

fn collect_pointer_input(
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    windows: Query<&Window>,
    mut contexts: EguiContexts,
    mut tracker: ResMut<PointerTracker>,
    mut out: MessageWriter<PointerMessage>,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let cursor = windows.single().ok().and_then(|w| w.cursor_position());
    let mut input = PointerSnapshot {
        cursor,
        mouse_pressed: mouse.just_pressed(MouseButton::Left),
        mouse_released: mouse.just_released(MouseButton::Left),
        touches: touches.iter().map(|t| t.position()).collect(),
        touch_started: touches.any_just_pressed(),
        touch_moved: touches.iter().any(|t| t.delta() != Vec2::ZERO),
        touch_ended: touches.any_just_released() || touches.any_just_canceled(),
    };

    // Presses on the panel belong to the panel; releases still end gestures
    if egui_wants_pointer {
        input.mouse_pressed = false;
        input.touch_started = false;
    }

    for event in tracker.events(&input) {
        out.write(PointerMessage(event));
    }
}

fn apply_gestures(
    mut messages: MessageReader<PointerMessage>,
    mut gestures: ResMut<Gestures>,
    mut models: Query<(&MarkerModel, &mut ModelPose, &mut Transform)>,
) {
    for message in messages.read() {
        let effects = gestures.0.dispatch(&message.0);
        let config = gestures.0.config();
        for (marker, effect) in effects {
            let Some((_, mut pose, mut transform)) = models.iter_mut().find(|(m, _, _)| m.index == marker) else {
                continue;
            };
            match effect {
                GestureEffect::Rotate { pitch, yaw } => {
                    pose.rotation.x += pitch;
                    pose.rotation.y += yaw;
                    let r = pose.rotation;
                    transform.rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
                }
                GestureEffect::Zoom(factor) => {
                    transform.scale = to_bevy(config.zoom_scale(from_bevy(pose.base_scale), factor));
                }
            }
        }
    }
}

/// Flip the animations of every registered model under the press
fn toggle_on_tap(
    mut messages: MessageReader<PointerMessage>,
    toggles: Res<Toggles>,
    mut table: ResMut<MarkerTable>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut ray_cast: MeshRayCast,
    parents: Query<&ChildOf>,
    models: Query<&MarkerModel>,
    mut players: Query<(&MarkerAnimation, &mut AnimationPlayer)>,
) {
    for message in messages.read() {
        let Some(press) = message.0.press_point() else {
            continue;
        };
        if toggles.0.is_empty() {
            continue;
        }
        let Ok((camera, camera_transform)) = cameras.single() else {
            continue;
        };
        let Ok(ray) = camera.viewport_to_world(camera_transform, Vec2::new(press.x, press.y)) else {
            continue;
        };

        // Hidden anchors are skipped by the visibility filter
        let settings = MeshRayCastSettings::default().never_early_exit();
        let hit: BTreeSet<MarkerIndex> = ray_cast
            .cast_ray(ray, &settings)
            .iter()
            .filter_map(|(entity, _)| {
                std::iter::once(*entity)
                    .chain(parents.iter_ancestors(*entity))
                    .find_map(|e| models.get(e).ok().map(|m| m.index))
            })
            .filter(|index| toggles.0.contains(*index))
            .collect();

        for index in hit {
            tracing::debug!("Tap hit marker {}, toggling animations", index);
            let nodes = table.nodes(index);
            for (animation, mut player) in &mut players {
                if animation.index == index {
                    PlayerMixer::new(&mut player, nodes).toggle_all();
                }
            }
            table.toggle_paused(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_press_move_release() {
        let mut tracker = PointerTracker::default();

        let press = PointerSnapshot {
            cursor: Some(Vec2::new(100.0, 100.0)),
            mouse_pressed: true,
            ..default()
        };
        assert_eq!(tracker.events(&press), vec![PointerEvent::MouseDown(Point::new(100.0, 100.0))]);

        let still = PointerSnapshot {
            cursor: Some(Vec2::new(100.0, 100.0)),
            ..default()
        };
        assert!(tracker.events(&still).is_empty());

        let moved = PointerSnapshot {
            cursor: Some(Vec2::new(150.0, 100.0)),
            ..default()
        };
        assert_eq!(tracker.events(&moved), vec![PointerEvent::MouseMove(Point::new(150.0, 100.0))]);

        let release = PointerSnapshot {
            cursor: Some(Vec2::new(150.0, 100.0)),
            mouse_released: true,
            ..default()
        };
        assert_eq!(tracker.events(&release), vec![PointerEvent::MouseUp]);
    }

    #[test]
    fn test_touch_sequence() {
        let mut tracker = PointerTracker::default();
        let fingers = vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)];

        let start = PointerSnapshot {
            touches: fingers.clone(),
            touch_started: true,
            ..default()
        };
        assert_eq!(
            tracker.events(&start),
            vec![PointerEvent::TouchStart(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])]
        );

        let moved = PointerSnapshot {
            touches: vec![Vec2::new(0.0, 0.0), Vec2::new(140.0, 0.0)],
            touch_moved: true,
            ..default()
        };
        assert_eq!(
            tracker.events(&moved),
            vec![PointerEvent::TouchMove(vec![Point::new(0.0, 0.0), Point::new(140.0, 0.0)])]
        );

        let end = PointerSnapshot {
            touch_ended: true,
            ..default()
        };
        assert_eq!(tracker.events(&end), vec![PointerEvent::TouchEnd]);
    }

    #[test]
    fn test_emulated_mouse_press_after_touch_is_dropped() {
        let mut tracker = PointerTracker::default();
        let at = Vec2::new(400.0, 300.0);

        let tap = PointerSnapshot {
            touches: vec![at],
            touch_started: true,
            ..default()
        };
        assert_eq!(tracker.events(&tap), vec![PointerEvent::TouchStart(vec![Point::new(400.0, 300.0)])]);

        let emulated = PointerSnapshot {
            cursor: Some(at),
            mouse_pressed: true,
            touch_ended: true,
            ..default()
        };
        assert_eq!(tracker.events(&emulated), vec![PointerEvent::TouchEnd]);
    }

    #[test]
    fn test_snapshot_feeds_core_gestures() {
        let mut tracker = PointerTracker::default();
        let mut registry = GestureRegistry::new(Default::default());
        registry.register(MarkerIndex(0));

        let mut effects = Vec::new();
        for input in [
            PointerSnapshot {
                cursor: Some(Vec2::new(100.0, 100.0)),
                mouse_pressed: true,
                ..default()
            },
            PointerSnapshot {
                cursor: Some(Vec2::new(150.0, 100.0)),
                ..default()
            },
        ] {
            for event in tracker.events(&input) {
                effects.extend(registry.dispatch(&event));
            }
        }

        assert_eq!(effects.len(), 1);
        match effects[0] {
            (MarkerIndex(0), GestureEffect::Rotate { pitch, yaw }) => {
                assert_eq!(pitch, 0.0);
                assert!((yaw - 0.5).abs() < 1e-6);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }
}
