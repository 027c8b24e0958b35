//! Marker binding and the found/lost lifecycle
//!
//! A bound marker owns its model node, an animation mixer with one action per
//! clip, and an audio track. The tracker drives two transitions,
//! NotDetected ⇄ Detected; [`MarkerTransition`] describes what each one does
//! so that every front end applies the same effects.

use tracing::{info, warn};

use crate::animation::AnimationMixer;
use crate::error::AudioError;
use crate::geometry::{MarkerIndex, Vec3};
use crate::model::SceneNode;

/// One audio clip per marker, addressed by path
pub trait AudioTrack {
    /// Move the playback position back to the start
    fn rewind(&mut self);
    /// Start playback. A refusal (e.g. autoplay policy) is reported, not raised.
    fn play(&mut self) -> Result<(), AudioError>;
    /// Stop playback, keeping the position
    fn pause(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detection {
    #[default]
    NotDetected,
    Detected,
}

/// Event reported by the tracking service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Found(MarkerIndex),
    Lost(MarkerIndex),
}

impl TrackingEvent {
    pub fn marker(&self) -> MarkerIndex {
        match self {
            TrackingEvent::Found(m) | TrackingEvent::Lost(m) => *m,
        }
    }

    pub fn transition(&self) -> MarkerTransition {
        match self {
            TrackingEvent::Found(_) => MarkerTransition::found(),
            TrackingEvent::Lost(_) => MarkerTransition::lost(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    /// Rewind to zero and play
    Restart,
    /// Pause where it is
    Pause,
}

/// Effects of a detection change on a marker's model, animations and audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerTransition {
    pub detection: Detection,
    pub visible: bool,
    pub animations_paused: bool,
    pub audio: AudioCue,
}

impl MarkerTransition {
    pub fn found() -> Self {
        Self {
            detection: Detection::Detected,
            visible: true,
            animations_paused: false,
            audio: AudioCue::Restart,
        }
    }

    pub fn lost() -> Self {
        Self {
            detection: Detection::NotDetected,
            visible: false,
            animations_paused: true,
            audio: AudioCue::Pause,
        }
    }
}

/// A loaded model attached to its marker, mixer and audio
pub struct BoundMarker<N, M, A> {
    index: MarkerIndex,
    model_path: String,
    audio_path: String,
    node: N,
    mixer: M,
    audio: A,
    base_scale: Vec3,
    detection: Detection,
}

impl<N: SceneNode, M: AnimationMixer, A: AudioTrack> BoundMarker<N, M, A> {
    /// Wrap a freshly attached model. Every action starts playing right away,
    /// even while the marker is not yet detected.
    pub fn new(
        index: MarkerIndex,
        model_path: impl Into<String>,
        audio_path: impl Into<String>,
        node: N,
        mut mixer: M,
        audio: A,
        base_scale: Vec3,
    ) -> Self {
        mixer.play_all();
        Self {
            index,
            model_path: model_path.into(),
            audio_path: audio_path.into(),
            node,
            mixer,
            audio,
            base_scale,
            detection: Detection::NotDetected,
        }
    }

    pub fn index(&self) -> MarkerIndex {
        self.index
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn audio_path(&self) -> &str {
        &self.audio_path
    }

    pub fn detection(&self) -> Detection {
        self.detection
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut N {
        &mut self.node
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut M {
        &mut self.mixer
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn base_scale(&self) -> Vec3 {
        self.base_scale
    }

    pub fn on_found(&mut self) {
        info!(marker = %self.index, "Target found");
        self.apply(MarkerTransition::found());
    }

    pub fn on_lost(&mut self) {
        info!(marker = %self.index, "Target lost");
        self.apply(MarkerTransition::lost());
    }

    pub fn apply(&mut self, transition: MarkerTransition) {
        self.detection = transition.detection;
        self.node.set_visible(transition.visible);

        if transition.animations_paused {
            self.mixer.pause_all();
        } else {
            self.mixer.resume_all();
        }

        match transition.audio {
            AudioCue::Restart => {
                self.audio.rewind();
                if let Err(e) = self.audio.play() {
                    warn!(marker = %self.index, error = %e, "Audio playback blocked");
                }
            }
            AudioCue::Pause => self.audio.pause(),
        }
    }
}
