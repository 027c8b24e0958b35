//! Session driver and per-frame loop
//!
//! [`Experience::launch`] runs the startup sequence in strict order:
//! lighting, load every model one after another, bind every marker, register
//! gesture and tap handling for the models that loaded, then start tracking.
//! After that the front end calls [`Experience::frame`] from its animation
//! loop. Tracker and input callbacks never touch the experience directly;
//! they push into the shared [`EventQueue`], which each frame drains in order
//! before advancing the mixers and rendering.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::animation::AnimationMixer;
use crate::clock::FrameClock;
use crate::config::{ExperienceConfig, LightingConfig, MarkerSpec};
use crate::error::SessionError;
use crate::geometry::MarkerIndex;
use crate::gesture::{GestureEffect, GestureRegistry, PointerEvent, PressFilter};
use crate::interaction::{InteractionToggle, Ndc, Viewport};
use crate::marker::{AudioTrack, BoundMarker, Detection, TrackingEvent};
use crate::model::{load_model, LoadedModel, ModelDecoder, SceneNode};

/// External image-tracking session with its renderer, scene and camera
#[allow(async_fn_in_trait)]
pub trait TrackingSession {
    type Node: SceneNode;
    type Clip;
    type Mixer: AnimationMixer;
    type Audio: AudioTrack;

    fn configure_lighting(&mut self, lighting: &LightingConfig);

    /// Put `node` under the marker's anchor and forward the anchor's
    /// found/lost callbacks into `events`
    fn add_anchor(
        &mut self,
        marker: MarkerIndex,
        node: &Self::Node,
        events: EventQueue,
    ) -> Result<(), SessionError>;

    /// Create a mixer for `node` with one action per clip, in clip order
    fn create_mixer(&mut self, node: &Self::Node, clips: &[Self::Clip]) -> Self::Mixer;

    fn open_audio(&mut self, path: &str) -> Result<Self::Audio, SessionError>;

    /// Install the single page-wide set of pointer listeners
    fn listen_input(&mut self, events: EventQueue) -> Result<(), SessionError>;

    fn viewport(&self) -> Viewport;

    /// Cast a ray from the camera through `ndc` against every mesh under `node`
    fn hit_test(&self, ndc: Ndc, node: &Self::Node) -> bool;

    /// Open the camera and begin tracking
    async fn start(&mut self) -> Result<(), SessionError>;

    fn render(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperienceEvent {
    Tracking(TrackingEvent),
    Pointer(PointerEvent),
}

/// Shared queue between platform callbacks and the frame loop
#[derive(Debug, Clone, Default)]
pub struct EventQueue(pub Arc<Mutex<Vec<ExperienceEvent>>>);

impl EventQueue {
    pub fn push(&self, event: ExperienceEvent) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(event);
        }
    }

    pub fn found(&self, marker: MarkerIndex) {
        self.push(ExperienceEvent::Tracking(TrackingEvent::Found(marker)));
    }

    pub fn lost(&self, marker: MarkerIndex) {
        self.push(ExperienceEvent::Tracking(TrackingEvent::Lost(marker)));
    }

    pub fn pointer(&self, event: PointerEvent) {
        self.push(ExperienceEvent::Pointer(event));
    }

    /// Take every pending event, oldest first
    pub fn drain(&self) -> Vec<ExperienceEvent> {
        match self.0.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type SessionMarker<T> = BoundMarker<
    <T as TrackingSession>::Node,
    <T as TrackingSession>::Mixer,
    <T as TrackingSession>::Audio,
>;

/// One row of the live marker table. `binding` is `None` when the model failed to load.
pub struct MarkerSlot<T: TrackingSession> {
    pub spec: MarkerSpec,
    pub binding: Option<SessionMarker<T>>,
}

/// Per-marker summary for logs and debug panels
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStatus {
    pub index: MarkerIndex,
    pub loaded: bool,
    pub detection: Detection,
    pub paused: Vec<bool>,
}

/// A running AR experience
pub struct Experience<T: TrackingSession> {
    session: T,
    slots: Vec<MarkerSlot<T>>,
    gestures: GestureRegistry,
    toggles: InteractionToggle,
    presses: PressFilter,
    events: EventQueue,
    clock: FrameClock,
}

/// Bind one marker. An absent model yields no binding and touches nothing.
pub fn bind_marker<T: TrackingSession>(
    session: &mut T,
    model: Option<LoadedModel<T::Node, T::Clip>>,
    spec: &MarkerSpec,
    events: &EventQueue,
) -> Result<Option<SessionMarker<T>>, SessionError> {
    let Some(model) = model else {
        debug!(marker = %spec.index, "Skipping marker with no model");
        return Ok(None);
    };

    session.add_anchor(spec.index, &model.node, events.clone())?;
    let mixer = session.create_mixer(&model.node, &model.clips);
    let audio = session.open_audio(&spec.audio_path)?;

    Ok(Some(BoundMarker::new(
        spec.index,
        model.path,
        spec.audio_path.clone(),
        model.node,
        mixer,
        audio,
        model.base_scale,
    )))
}

impl<T: TrackingSession> Experience<T> {
    /// Run the startup sequence. Models that fail to load leave their marker
    /// inert; any other failure aborts the launch.
    pub async fn launch<D>(mut session: T, decoder: &D, config: &ExperienceConfig) -> Result<Self, SessionError>
    where
        D: ModelDecoder<Node = T::Node, Clip = T::Clip>,
    {
        config.validate()?;
        session.configure_lighting(&config.lighting);

        let specs = config.markers();

        let mut models = Vec::with_capacity(specs.len());
        for spec in &specs {
            models.push(load_model(decoder, &spec.model_path, spec.scale, spec.position).await);
        }
        let loaded = models.iter().filter(|m| m.is_some()).count();
        info!(loaded, total = specs.len(), "Models processed");

        let events = EventQueue::default();
        let mut slots = Vec::with_capacity(specs.len());
        for (spec, model) in specs.into_iter().zip(models) {
            let binding = bind_marker(&mut session, model, &spec, &events)?;
            slots.push(MarkerSlot { spec, binding });
        }

        let mut gestures = GestureRegistry::new(config.gestures.clone());
        let mut toggles = InteractionToggle::default();
        for slot in slots.iter().filter(|s| s.binding.is_some()) {
            gestures.register(slot.spec.index);
            toggles.register(slot.spec.index);
        }
        if !gestures.is_empty() {
            session.listen_input(events.clone())?;
        }

        info!("Starting tracking session");
        session.start().await?;

        Ok(Self {
            session,
            slots,
            gestures,
            toggles,
            presses: PressFilter::default(),
            events,
            clock: FrameClock::new(),
        })
    }

    /// One animation-loop callback: dispatch pending events, advance every
    /// mixer by the time since the previous frame, render once
    pub fn frame(&mut self, now_ms: f64) {
        let delta = self.clock.tick(now_ms);

        for event in self.events.drain() {
            self.handle(event);
        }

        for slot in &mut self.slots {
            if let Some(binding) = slot.binding.as_mut() {
                binding.mixer_mut().update(delta);
            }
        }

        self.session.render();
    }

    pub fn handle(&mut self, event: ExperienceEvent) {
        match event {
            ExperienceEvent::Tracking(tracking) => self.handle_tracking(tracking),
            ExperienceEvent::Pointer(pointer) => self.handle_pointer(&pointer),
        }
    }

    fn handle_tracking(&mut self, event: TrackingEvent) {
        match self.binding_mut(event.marker()) {
            Some(binding) => match event {
                TrackingEvent::Found(_) => binding.on_found(),
                TrackingEvent::Lost(_) => binding.on_lost(),
            },
            None => debug!(marker = %event.marker(), "Tracking event for unbound marker"),
        }
    }

    fn handle_pointer(&mut self, event: &PointerEvent) {
        if !self.presses.accept(event) {
            debug!("Ignoring mouse press emulated from touch");
            return;
        }

        let zoom = self.gestures.config().clone();
        for (marker, effect) in self.gestures.dispatch(event) {
            let Some(binding) = self.binding_mut(marker) else {
                continue;
            };
            match effect {
                GestureEffect::Rotate { pitch, yaw } => {
                    let node = binding.node_mut();
                    let mut rotation = node.rotation();
                    rotation.x += pitch;
                    rotation.y += yaw;
                    node.set_rotation(rotation);
                }
                GestureEffect::Zoom(factor) => {
                    let scale = zoom.zoom_scale(binding.base_scale(), factor);
                    binding.node_mut().set_scale(scale);
                }
            }
        }

        if let Some(point) = event.press_point() {
            if self.toggles.is_empty() {
                return;
            }
            let Some(ndc) = self.session.viewport().to_ndc(point) else {
                warn!("Ignoring tap on a collapsed viewport");
                return;
            };
            let markers: Vec<MarkerIndex> = self.toggles.markers().collect();
            for marker in markers {
                let slot = marker.slot();
                let Some(binding) = self.slots.get_mut(slot).and_then(|s| s.binding.as_mut()) else {
                    continue;
                };
                if self.session.hit_test(ndc, binding.node()) {
                    debug!(marker = %marker, "Tap hit model, toggling animations");
                    binding.mixer_mut().toggle_all();
                }
            }
        }
    }

    /// Stop gesture and tap handling for a marker. Tracking events still apply.
    pub fn detach_marker(&mut self, marker: MarkerIndex) -> bool {
        let gestures = self.gestures.unregister(marker);
        let toggles = self.toggles.unregister(marker);
        gestures || toggles
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn session(&self) -> &T {
        &self.session
    }

    pub fn gestures(&self) -> &GestureRegistry {
        &self.gestures
    }

    pub fn toggles(&self) -> &InteractionToggle {
        &self.toggles
    }

    pub fn slots(&self) -> &[MarkerSlot<T>] {
        &self.slots
    }

    pub fn marker(&self, marker: MarkerIndex) -> Option<&SessionMarker<T>> {
        self.slots.get(marker.slot()).and_then(|s| s.binding.as_ref())
    }

    fn binding_mut(&mut self, marker: MarkerIndex) -> Option<&mut SessionMarker<T>> {
        self.slots.get_mut(marker.slot()).and_then(|s| s.binding.as_mut())
    }

    pub fn status(&self) -> Vec<MarkerStatus> {
        self.slots
            .iter()
            .map(|slot| match &slot.binding {
                Some(binding) => MarkerStatus {
                    index: slot.spec.index,
                    loaded: true,
                    detection: binding.detection(),
                    paused: binding.mixer().paused_states(),
                },
                None => MarkerStatus {
                    index: slot.spec.index,
                    loaded: false,
                    detection: Detection::NotDetected,
                    paused: Vec::new(),
                },
            })
            .collect()
    }
}
