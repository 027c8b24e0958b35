//! Marker models, simulated tracking and page audio
//!
//! Each configured marker gets a glTF load at startup. A model that finishes
//! loading is spawned hidden under its own anchor entity and registered for
//! gestures and tap toggling; a model that fails stays absent and its marker
//! ignores tracking messages. Found/lost messages apply the same transition as
//! the AR front end: anchor visibility, every animation paused or resumed, and
//! the page audio restarted or paused.

use bevy::animation::graph::AnimationNodeIndex;
use bevy::asset::LoadState;
use bevy::audio::AudioSinkPlayback;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use lomundou_core::{
    AnimationMixer, AudioCue, Detection, Euler, MarkerIndex, MarkerSpec, MarkerTransition, TrackingEvent,
};

use crate::app::PreviewConfig;
use crate::gestures::{Gestures, Toggles};

pub struct MarkersPlugin;

impl Plugin for MarkersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MarkerTable>()
            .add_message::<TrackingMessage>()
            .add_systems(Startup, start_loading)
            .add_systems(Update, finish_loading)
            .add_systems(Update, apply_tracking.after(finish_loading))
            .add_systems(Update, attach_animation_players.after(apply_tracking));
    }
}

/// Simulated tracker callback
#[derive(Message, Debug, Clone, Copy)]
pub struct TrackingMessage(pub TrackingEvent);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Loading,
    Ready,
    Failed,
}

/// One row of the marker table
#[derive(Debug)]
pub struct PreviewMarker {
    pub spec: MarkerSpec,
    pub state: ModelState,
    pub detection: Detection,
    pub animations_paused: bool,
    gltf: Handle<Gltf>,
    audio: Handle<AudioSource>,
    anchor: Option<Entity>,
    graph: Option<Handle<AnimationGraph>>,
    nodes: Vec<AnimationNodeIndex>,
}

#[derive(Debug, Resource, Default)]
pub struct MarkerTable {
    pub markers: Vec<PreviewMarker>,
}

impl MarkerTable {
    pub fn get(&self, index: MarkerIndex) -> Option<&PreviewMarker> {
        self.markers.get(index.slot())
    }

    fn get_mut(&mut self, index: MarkerIndex) -> Option<&mut PreviewMarker> {
        self.markers.get_mut(index.slot())
    }

    /// Record a tap toggle of a ready marker's animations, returning the new flag
    pub fn toggle_paused(&mut self, index: MarkerIndex) -> Option<bool> {
        let marker = self.get_mut(index).filter(|m| m.state == ModelState::Ready)?;
        marker.animations_paused = !marker.animations_paused;
        Some(marker.animations_paused)
    }

    /// Animation nodes of a marker whose model is ready
    pub fn nodes(&self, index: MarkerIndex) -> &[AnimationNodeIndex] {
        self.get(index).map(|m| m.nodes.as_slice()).unwrap_or(&[])
    }
}

/// Entity placed where the tracker would anchor the page
#[derive(Component)]
pub struct MarkerAnchor {
    pub index: MarkerIndex,
}

/// Scene root of a marker's model
#[derive(Component)]
pub struct MarkerModel {
    pub index: MarkerIndex,
}

/// Gesture-driven rotation and the scale the model was loaded with
#[derive(Component)]
pub struct ModelPose {
    pub rotation: Euler,
    pub base_scale: Vec3,
}

/// Animation player somewhere inside a marker's scene
#[derive(Component)]
pub struct MarkerAnimation {
    pub index: MarkerIndex,
}

#[derive(Component)]
pub struct MarkerAudio {
    pub index: MarkerIndex,
}

/// Drives a Bevy animation player through the core mixer operations, one
/// action per graph node
pub struct PlayerMixer<'a> {
    player: &'a mut AnimationPlayer,
    nodes: &'a [AnimationNodeIndex],
}

impl<'a> PlayerMixer<'a> {
    pub fn new(player: &'a mut AnimationPlayer, nodes: &'a [AnimationNodeIndex]) -> Self {
        Self { player, nodes }
    }
}

impl AnimationMixer for PlayerMixer<'_> {
    // Bevy advances players from its own clock
    fn update(&mut self, _delta: f32) {}

    fn action_count(&self) -> usize {
        self.nodes.len()
    }

    fn play(&mut self, action: usize) {
        if let Some(&node) = self.nodes.get(action) {
            self.player.play(node).repeat();
        }
    }

    fn is_running(&self, action: usize) -> bool {
        self.nodes
            .get(action)
            .and_then(|node| self.player.animation(*node))
            .map(|active| !active.is_paused() && !active.is_finished())
            .unwrap_or(false)
    }

    fn is_paused(&self, action: usize) -> bool {
        self.nodes
            .get(action)
            .and_then(|node| self.player.animation(*node))
            .map(|active| active.is_paused())
            .unwrap_or(false)
    }

    fn set_paused(&mut self, action: usize, paused: bool) {
        let Some(&node) = self.nodes.get(action) else {
            return;
        };
        if let Some(active) = self.player.animation_mut(node) {
            if paused {
                active.pause();
            } else {
                active.resume();
            }
        }
    }
}

pub fn to_bevy(v: lomundou_core::Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn from_bevy(v: Vec3) -> lomundou_core::Vec3 {
    lomundou_core::Vec3::new(v.x, v.y, v.z)
}

/// Asset server paths are relative to the asset root, without `./`
fn asset_path(path: &str) -> String {
    path.trim_start_matches("./").trim_start_matches('/').to_string()
}

fn start_loading(config: Res<PreviewConfig>, asset_server: Res<AssetServer>, mut table: ResMut<MarkerTable>) {
    table.markers = config
        .0
        .markers()
        .into_iter()
        .map(|spec| {
            tracing::info!("Loading {} for marker {}", spec.model_path, spec.index);
            PreviewMarker {
                gltf: asset_server.load(asset_path(&spec.model_path)),
                audio: asset_server.load(asset_path(&spec.audio_path)),
                spec,
                state: ModelState::Loading,
                detection: Detection::NotDetected,
                animations_paused: false,
                anchor: None,
                graph: None,
                nodes: Vec::new(),
            }
        })
        .collect();
}

/// Spawn models whose glTF finished loading, mark failures absent
pub(crate) fn finish_loading(
    mut commands: Commands,
    mut table: ResMut<MarkerTable>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    mut gestures: ResMut<Gestures>,
    mut toggles: ResMut<Toggles>,
) {
    for marker in table.markers.iter_mut().filter(|m| m.state == ModelState::Loading) {
        let index = marker.spec.index;

        match asset_server.get_load_state(marker.gltf.id()) {
            Some(LoadState::Loaded) => {
                let Some(gltf) = gltf_assets.get(&marker.gltf) else {
                    continue;
                };
                let Some(scene) = gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) else {
                    tracing::error!("Model {} has no scene", marker.spec.model_path);
                    marker.state = ModelState::Failed;
                    continue;
                };

                let (graph, nodes) = AnimationGraph::from_clips(gltf.animations.clone());
                marker.graph = Some(graphs.add(graph));
                marker.nodes = nodes;

                let base_scale = to_bevy(marker.spec.scale);
                let anchor = commands
                    .spawn((Transform::default(), Visibility::Hidden, MarkerAnchor { index }))
                    .id();
                commands.spawn((
                    SceneRoot(scene),
                    Transform::from_translation(to_bevy(marker.spec.position)).with_scale(base_scale),
                    ModelPose {
                        rotation: Euler::default(),
                        base_scale,
                    },
                    MarkerModel { index },
                    ChildOf(anchor),
                ));

                marker.anchor = Some(anchor);
                marker.state = ModelState::Ready;
                gestures.0.register(index);
                toggles.0.register(index);
                tracing::info!(
                    "Model loaded for marker {}: {} ({} animations)",
                    index,
                    marker.spec.model_path,
                    marker.nodes.len()
                );
            }
            Some(LoadState::Failed(e)) => {
                tracing::error!("Failed to load model {}: {}", marker.spec.model_path, e);
                marker.state = ModelState::Failed;
            }
            _ => {
                // Still loading
            }
        }
    }
}

/// Hook up animation players as scenes spawn and start every clip looping
fn attach_animation_players(
    mut commands: Commands,
    table: Res<MarkerTable>,
    models: Query<&MarkerModel>,
    parents: Query<&ChildOf>,
    mut players: Query<(Entity, &mut AnimationPlayer), Added<AnimationPlayer>>,
) {
    for (entity, mut player) in &mut players {
        let Some(index) = parents
            .iter_ancestors(entity)
            .find_map(|ancestor| models.get(ancestor).ok().map(|m| m.index))
        else {
            continue;
        };
        let Some(marker) = table.get(index) else {
            continue;
        };
        let Some(graph) = marker.graph.clone() else {
            continue;
        };

        commands
            .entity(entity)
            .insert((AnimationGraphHandle(graph), MarkerAnimation { index }));

        let mut mixer = PlayerMixer::new(&mut player, &marker.nodes);
        mixer.play_all();
        // A lost marker keeps its animations paused even if the player shows up late
        if marker.animations_paused {
            mixer.pause_all();
        }
    }
}

fn apply_tracking(
    mut commands: Commands,
    mut messages: MessageReader<TrackingMessage>,
    mut table: ResMut<MarkerTable>,
    mut anchors: Query<&mut Visibility, With<MarkerAnchor>>,
    mut players: Query<(&MarkerAnimation, &mut AnimationPlayer)>,
    audio: Query<(Entity, &MarkerAudio, Option<&AudioSink>)>,
) {
    for message in messages.read() {
        let event = message.0;
        let index = event.marker();
        let Some(marker) = table.get_mut(index) else {
            tracing::warn!("Tracking event for unknown marker {}", index);
            continue;
        };
        if marker.state != ModelState::Ready {
            tracing::debug!("Tracking event for marker {} with no model", index);
            continue;
        }

        let transition = event.transition();
        tracing::info!("Marker {} {:?}", index, transition.detection);
        marker.detection = transition.detection;
        marker.animations_paused = transition.animations_paused;

        if let Some(mut visibility) = marker.anchor.and_then(|a| anchors.get_mut(a).ok()) {
            *visibility = if transition.visible {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
        }

        for (animation, mut player) in &mut players {
            if animation.index != index {
                continue;
            }
            let mut mixer = PlayerMixer::new(&mut player, &marker.nodes);
            if transition.animations_paused {
                mixer.pause_all();
            } else {
                mixer.resume_all();
            }
        }

        apply_audio(&mut commands, &audio, marker, transition);
    }
}

fn apply_audio(
    commands: &mut Commands,
    audio: &Query<(Entity, &MarkerAudio, Option<&AudioSink>)>,
    marker: &PreviewMarker,
    transition: MarkerTransition,
) {
    let index = marker.spec.index;
    let playing = audio.iter().filter(|(_, a, _)| a.index == index);

    match transition.audio {
        AudioCue::Restart => {
            // A fresh player starts from the beginning
            for (entity, _, _) in playing {
                commands.entity(entity).despawn();
            }
            commands.spawn((
                AudioPlayer::new(marker.audio.clone()),
                PlaybackSettings::DESPAWN,
                MarkerAudio { index },
            ));
        }
        AudioCue::Pause => {
            for (_, _, sink) in playing {
                if let Some(sink) = sink {
                    sink.pause();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<AnimationNodeIndex> {
        vec![AnimationNodeIndex::new(1), AnimationNodeIndex::new(2)]
    }

    #[test]
    fn test_player_mixer_plays_and_toggles() {
        let mut player = AnimationPlayer::default();
        let nodes = nodes();
        let mut mixer = PlayerMixer::new(&mut player, &nodes);

        assert_eq!(mixer.action_count(), 2);
        assert!(!mixer.is_running(0));

        mixer.play_all();
        assert!(mixer.is_running(0) && mixer.is_running(1));

        mixer.toggle_all();
        assert_eq!(mixer.paused_states(), vec![true, true]);

        mixer.set_paused(1, false);
        mixer.toggle_all();
        assert_eq!(mixer.paused_states(), vec![false, true]);
    }

    #[test]
    fn test_player_mixer_resume_starts_idle_actions() {
        let mut player = AnimationPlayer::default();
        let nodes = nodes();
        let mut mixer = PlayerMixer::new(&mut player, &nodes);

        mixer.resume_all();
        assert!(mixer.is_running(0) && mixer.is_running(1));

        mixer.pause_all();
        assert!(!mixer.is_running(0));
        mixer.resume_all();
        assert!(mixer.is_running(0));
    }

    #[test]
    fn test_player_mixer_without_clips() {
        let mut player = AnimationPlayer::default();
        let mut mixer = PlayerMixer::new(&mut player, &[]);
        mixer.play_all();
        mixer.toggle_all();
        assert!(mixer.paused_states().is_empty());
        assert!(!mixer.is_paused(0));
    }

    fn table(state: ModelState) -> MarkerTable {
        let markers = lomundou_core::ExperienceConfig::default()
            .markers()
            .into_iter()
            .map(|spec| PreviewMarker {
                spec,
                state,
                detection: Detection::Detected,
                animations_paused: false,
                gltf: Handle::default(),
                audio: Handle::default(),
                anchor: None,
                graph: None,
                nodes: nodes(),
            })
            .collect();
        MarkerTable { markers }
    }

    #[test]
    fn test_tap_toggle_updates_paused_flag() {
        let mut table = table(ModelState::Ready);
        assert_eq!(table.toggle_paused(MarkerIndex(3)), Some(true));
        assert!(table.get(MarkerIndex(3)).unwrap().animations_paused);
        assert!(!table.get(MarkerIndex(4)).unwrap().animations_paused);

        assert_eq!(table.toggle_paused(MarkerIndex(3)), Some(false));
        assert!(!table.get(MarkerIndex(3)).unwrap().animations_paused);
    }

    #[test]
    fn test_tap_toggle_ignores_absent_models() {
        let mut table = table(ModelState::Failed);
        assert_eq!(table.toggle_paused(MarkerIndex(0)), None);
        assert!(!table.get(MarkerIndex(0)).unwrap().animations_paused);
        assert_eq!(table.toggle_paused(MarkerIndex(40)), None);
    }

    #[test]
    fn test_asset_path() {
        assert_eq!(asset_path("./assets/models/scene1.glb"), "assets/models/scene1.glb");
        assert_eq!(asset_path("/assets/audio/dusun/page2.mp3"), "assets/audio/dusun/page2.mp3");
        assert_eq!(asset_path("assets/targets/Lomundou.mind"), "assets/targets/Lomundou.mind");
    }
}
