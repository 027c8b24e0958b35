//! Lomundou Core - Marker, gesture, animation and session orchestration
//!
//! This crate holds everything in the AR picture book that is not delegated
//! to an external service:
//! - Experience configuration (marker table, asset paths, gesture tuning)
//! - The asset loader contract, where a failed model becomes an absent marker
//! - Gesture state machines for drag-to-rotate and pinch-to-zoom
//! - Marker binding with found/lost transitions for visibility, animation and audio
//! - Tap-to-toggle animation via hit testing
//! - The session driver and its per-frame loop
//!
//! Image tracking, rendering, model decoding and audio decoding are reached
//! through the [`TrackingSession`] and [`ModelDecoder`] traits.

pub mod animation;
pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod interaction;
pub mod marker;
pub mod model;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use animation::AnimationMixer;
pub use clock::FrameClock;
pub use config::{ExperienceConfig, GestureConfig, LightingConfig, MarkerSpec};
pub use error::{AudioError, ConfigError, LoadError, SessionError};
pub use geometry::{Euler, MarkerIndex, Point, Vec3};
pub use gesture::{GestureEffect, GesturePhase, GestureRegistry, GestureState, PointerEvent, PressFilter};
pub use interaction::{InteractionToggle, Ndc, Viewport};
pub use marker::{AudioCue, AudioTrack, BoundMarker, Detection, MarkerTransition, TrackingEvent};
pub use model::{load_model, DecodedModel, LoadedModel, ModelDecoder, SceneNode};
pub use session::{
    bind_marker, EventQueue, Experience, ExperienceEvent, MarkerSlot, MarkerStatus, SessionMarker,
    TrackingSession,
};
