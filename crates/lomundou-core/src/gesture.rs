//! Drag-to-rotate and pinch-to-zoom gestures
//!
//! Input is page-wide: every pointer event goes to every registered model,
//! and each model keeps its own [`GestureState`]. The [`GestureRegistry`]
//! replaces one listener set per model with a single dispatcher, so models
//! can also be unregistered again.

use std::collections::BTreeMap;

use crate::config::GestureConfig;
use crate::geometry::{MarkerIndex, Point};

/// Raw pointer input, positions in client pixels
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    MouseDown(Point),
    MouseMove(Point),
    MouseUp,
    /// Touch start with every touch point currently on the surface
    TouchStart(Vec<Point>),
    TouchMove(Vec<Point>),
    TouchEnd,
}

impl PointerEvent {
    /// Position of a new press, used for tap-to-toggle
    pub fn press_point(&self) -> Option<Point> {
        match self {
            PointerEvent::MouseDown(p) => Some(*p),
            PointerEvent::TouchStart(touches) => touches.first().copied(),
            _ => None,
        }
    }
}

/// Client-pixel distance within which a mouse press counts as emulated
pub const EMULATED_PRESS_RADIUS: f32 = 16.0;

/// Drops the mouse press a browser emulates after a touch tap.
///
/// Touch screens fire `mousedown` at the touch position once the touch
/// ends. Only the first mouse press after a touch is checked, so a real
/// mouse keeps working on hybrid devices.
#[derive(Debug, Clone, Default)]
pub struct PressFilter {
    last_touch: Option<Point>,
}

impl PressFilter {
    /// `false` when the event is the emulated copy of a touch press
    pub fn accept(&mut self, event: &PointerEvent) -> bool {
        match event {
            PointerEvent::TouchStart(touches) => {
                if let Some(first) = touches.first() {
                    self.last_touch = Some(*first);
                }
                true
            }
            PointerEvent::MouseDown(p) => match self.last_touch.take() {
                Some(touch) => touch.distance(*p) > EMULATED_PRESS_RADIUS,
                None => true,
            },
            _ => true,
        }
    }
}

/// Adjustment a gesture asks to apply to its model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    /// Add to the model's rotation (radians): `pitch` around X, `yaw` around Y
    Rotate { pitch: f32, yaw: f32 },
    /// Set the uniform zoom factor, see [`GestureConfig::zoom_scale`]
    Zoom(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Pinching,
}

/// Per-model gesture state
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    dragging: bool,
    previous: Point,
    pinch_baseline: Option<f32>,
    scale_factor: f32,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            dragging: false,
            previous: Point::default(),
            pinch_baseline: None,
            scale_factor: 1.0,
        }
    }
}

impl GestureState {
    pub fn phase(&self) -> GesturePhase {
        if self.dragging {
            GesturePhase::Dragging
        } else if self.pinch_baseline.is_some() {
            GesturePhase::Pinching
        } else {
            GesturePhase::Idle
        }
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn pinch_baseline(&self) -> Option<f32> {
        self.pinch_baseline
    }

    /// Feed one pointer event through the state machine
    pub fn handle(&mut self, event: &PointerEvent, config: &GestureConfig) -> Option<GestureEffect> {
        match event {
            PointerEvent::MouseDown(p) => {
                self.dragging = true;
                self.previous = *p;
                None
            }
            PointerEvent::TouchStart(touches) => {
                match touches.as_slice() {
                    [single] => {
                        self.dragging = true;
                        self.previous = *single;
                    }
                    [a, b] => {
                        self.dragging = false;
                        self.pinch_baseline = Some(a.distance(*b));
                    }
                    _ => {}
                }
                None
            }
            PointerEvent::MouseMove(p) if self.dragging => Some(self.drag_to(*p, config)),
            PointerEvent::TouchMove(touches) => match touches.as_slice() {
                [single] if self.dragging => Some(self.drag_to(*single, config)),
                [a, b] => self.pinch_to(a.distance(*b), config),
                _ => None,
            },
            PointerEvent::MouseUp | PointerEvent::TouchEnd => {
                self.dragging = false;
                self.pinch_baseline = None;
                None
            }
            PointerEvent::MouseMove(_) => None,
        }
    }

    fn drag_to(&mut self, current: Point, config: &GestureConfig) -> GestureEffect {
        let dx = current.x - self.previous.x;
        let dy = current.y - self.previous.y;
        self.previous = current;
        GestureEffect::Rotate {
            pitch: dy * config.rotate_sensitivity,
            yaw: dx * config.rotate_sensitivity,
        }
    }

    fn pinch_to(&mut self, distance: f32, config: &GestureConfig) -> Option<GestureEffect> {
        // A zero baseline (both fingers on one spot) never starts a pinch
        let baseline = self.pinch_baseline.filter(|b| *b != 0.0)?;
        let next = (self.scale_factor + (distance - baseline) * config.pinch_sensitivity)
            .clamp(config.min_scale, config.max_scale);
        if next.is_nan() {
            return None;
        }
        self.scale_factor = next;
        self.pinch_baseline = Some(distance);
        Some(GestureEffect::Zoom(next))
    }
}

/// All models currently reacting to gestures, keyed by marker
#[derive(Debug, Clone, Default)]
pub struct GestureRegistry {
    config: GestureConfig,
    states: BTreeMap<MarkerIndex, GestureState>,
}

impl GestureRegistry {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            states: BTreeMap::new(),
        }
    }

    /// Start tracking gestures for a marker's model. Registering twice keeps
    /// the existing state.
    pub fn register(&mut self, marker: MarkerIndex) {
        self.states.entry(marker).or_default();
    }

    pub fn unregister(&mut self, marker: MarkerIndex) -> bool {
        self.states.remove(&marker).is_some()
    }

    pub fn contains(&self, marker: MarkerIndex) -> bool {
        self.states.contains_key(&marker)
    }

    pub fn state(&self, marker: MarkerIndex) -> Option<&GestureState> {
        self.states.get(&marker)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Deliver an event to every registered model
    pub fn dispatch(&mut self, event: &PointerEvent) -> Vec<(MarkerIndex, GestureEffect)> {
        let config = &self.config;
        self.states
            .iter_mut()
            .filter_map(|(marker, state)| state.handle(event, config).map(|effect| (*marker, effect)))
            .collect()
    }
}
