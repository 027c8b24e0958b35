//! Error types
//!
//! Failures fall into three groups. A model that fails to decode is a
//! [`LoadError`], which the asset loader logs and turns into an absent marker.
//! Audio that the browser refuses to play is an [`AudioError`], logged and
//! otherwise ignored. Everything else that goes wrong while the session is
//! being set up is a [`SessionError`] and ends the experience.

use thiserror::Error;

use crate::geometry::MarkerIndex;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Marker count must be between 1 and {max}, got {count}")]
    MarkerCount { count: u32, max: u32 },
    #[error("Marker override {index} is outside the marker table (count {count})")]
    MarkerOutOfRange { index: MarkerIndex, count: u32 },
    #[error("Marker {0} is overridden more than once")]
    DuplicateMarker(MarkerIndex),
    #[error("Scale bounds are inverted: min {min} > max {max}")]
    ScaleBounds { min: f32, max: f32 },
    #[error("Gesture sensitivity `{0}` must be a positive number")]
    Sensitivity(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Playback of {path} was blocked: {reason}")]
    Blocked { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid experience config: {0}")]
    Config(#[from] ConfigError),
    #[error("Tracking session could not be created: {0}")]
    Init(String),
    #[error("Failed to attach marker {marker}: {reason}")]
    Anchor { marker: MarkerIndex, reason: String },
    #[error("Failed to create audio for {path}: {reason}")]
    Audio { path: String, reason: String },
    #[error("Failed to install input listeners: {0}")]
    Input(String),
    #[error("Tracking session failed to start: {0}")]
    Start(String),
}
