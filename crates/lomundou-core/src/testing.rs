//! In-memory platform used by the unit tests

use std::cell::RefCell;
use std::collections::HashSet;

use crate::animation::AnimationMixer;
use crate::config::LightingConfig;
use crate::error::{AudioError, LoadError, SessionError};
use crate::geometry::{Euler, MarkerIndex, Vec3};
use crate::interaction::{Ndc, Viewport};
use crate::marker::AudioTrack;
use crate::model::{DecodedModel, ModelDecoder, SceneNode};
use crate::session::{EventQueue, TrackingSession};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeNode {
    pub rotation: Euler,
    pub scale: Vec3,
    pub position: Vec3,
    pub visible: bool,
    pub shadows: bool,
}

impl Default for FakeNode {
    fn default() -> Self {
        Self {
            rotation: Euler::default(),
            scale: Vec3::ONE,
            position: Vec3::default(),
            visible: true,
            shadows: false,
        }
    }
}

impl SceneNode for FakeNode {
    fn rotation(&self) -> Euler {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Euler) {
        self.rotation = rotation;
    }

    fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn enable_shadows(&mut self) {
        self.shadows = true;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeAction {
    pub started: bool,
    pub paused: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeMixer {
    pub actions: Vec<FakeAction>,
    pub elapsed: f32,
}

impl FakeMixer {
    pub fn new(actions: usize) -> Self {
        Self {
            actions: vec![FakeAction::default(); actions],
            elapsed: 0.0,
        }
    }
}

impl AnimationMixer for FakeMixer {
    fn update(&mut self, delta: f32) {
        self.elapsed += delta;
    }

    fn action_count(&self) -> usize {
        self.actions.len()
    }

    fn play(&mut self, action: usize) {
        self.actions[action].started = true;
    }

    fn is_running(&self, action: usize) -> bool {
        let action = &self.actions[action];
        action.started && !action.paused
    }

    fn is_paused(&self, action: usize) -> bool {
        self.actions[action].paused
    }

    fn set_paused(&mut self, action: usize, paused: bool) {
        self.actions[action].paused = paused;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeAudio {
    pub position: f32,
    pub playing: bool,
    pub plays: u32,
    pub blocked: bool,
}

impl FakeAudio {
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }
}

impl AudioTrack for FakeAudio {
    fn rewind(&mut self) {
        self.position = 0.0;
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if self.blocked {
            return Err(AudioError::Blocked {
                path: "fake.mp3".to_string(),
                reason: "user interaction needed".to_string(),
            });
        }
        self.playing = true;
        self.plays += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeClip;

/// Decoder that succeeds for every path except the failing ones
#[derive(Debug, Default)]
pub struct FakeDecoder {
    clips: usize,
    failing: HashSet<String>,
    requested: RefCell<Vec<String>>,
}

impl FakeDecoder {
    pub fn with_clips(clips: usize) -> Self {
        Self {
            clips,
            ..Self::default()
        }
    }

    pub fn failing(mut self, paths: &[&str]) -> Self {
        self.failing.extend(paths.iter().map(|p| p.to_string()));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl ModelDecoder for FakeDecoder {
    type Node = FakeNode;
    type Clip = FakeClip;

    async fn decode(&self, path: &str) -> Result<DecodedModel<FakeNode, FakeClip>, LoadError> {
        self.requested.borrow_mut().push(path.to_string());
        if self.failing.contains(path) {
            return Err(LoadError::Decode {
                path: path.to_string(),
                reason: "corrupt mesh".to_string(),
            });
        }
        Ok(DecodedModel {
            node: FakeNode::default(),
            clips: vec![FakeClip; self.clips],
        })
    }
}

/// Session with an 800x600 viewport whose models occupy the middle half of the screen
#[derive(Debug, Default)]
pub struct FakeSession {
    pub lit: bool,
    pub anchors: Vec<MarkerIndex>,
    pub audio_paths: Vec<String>,
    pub listeners: usize,
    pub started: bool,
    pub fail_start: bool,
    pub fail_anchor: Option<MarkerIndex>,
    pub renders: usize,
}

impl TrackingSession for FakeSession {
    type Node = FakeNode;
    type Clip = FakeClip;
    type Mixer = FakeMixer;
    type Audio = FakeAudio;

    fn configure_lighting(&mut self, _lighting: &LightingConfig) {
        self.lit = true;
    }

    fn add_anchor(&mut self, marker: MarkerIndex, _node: &FakeNode, _events: EventQueue) -> Result<(), SessionError> {
        if self.fail_anchor == Some(marker) {
            return Err(SessionError::Anchor {
                marker,
                reason: "target index out of range".to_string(),
            });
        }
        self.anchors.push(marker);
        Ok(())
    }

    fn create_mixer(&mut self, _node: &FakeNode, clips: &[FakeClip]) -> FakeMixer {
        FakeMixer::new(clips.len())
    }

    fn open_audio(&mut self, path: &str) -> Result<FakeAudio, SessionError> {
        self.audio_paths.push(path.to_string());
        Ok(FakeAudio::default())
    }

    fn listen_input(&mut self, _events: EventQueue) -> Result<(), SessionError> {
        self.listeners += 1;
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn hit_test(&self, ndc: Ndc, node: &FakeNode) -> bool {
        node.visible && ndc.x.abs() <= 0.5 && ndc.y.abs() <= 0.5
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        if self.fail_start {
            return Err(SessionError::Start("camera permission denied".to_string()));
        }
        self.started = true;
        Ok(())
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}
