//! Tap-to-toggle animation

use std::collections::BTreeSet;

use crate::geometry::{MarkerIndex, Point};

/// Size of the rendering surface in client pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Normalized device coordinates, both axes in [-1, 1], +Y up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ndc {
    pub x: f32,
    pub y: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Convert a client position to NDC. `None` for a collapsed viewport.
    pub fn to_ndc(&self, point: Point) -> Option<Ndc> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Ndc {
            x: (point.x / self.width) * 2.0 - 1.0,
            y: -(point.y / self.height) * 2.0 + 1.0,
        })
    }
}

/// Markers whose animations can be paused and resumed by tapping the model
#[derive(Debug, Clone, Default)]
pub struct InteractionToggle {
    markers: BTreeSet<MarkerIndex>,
}

impl InteractionToggle {
    pub fn register(&mut self, marker: MarkerIndex) {
        self.markers.insert(marker);
    }

    pub fn unregister(&mut self, marker: MarkerIndex) -> bool {
        self.markers.remove(&marker)
    }

    pub fn contains(&self, marker: MarkerIndex) -> bool {
        self.markers.contains(&marker)
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> impl Iterator<Item = MarkerIndex> + '_ {
        self.markers.iter().copied()
    }
}
