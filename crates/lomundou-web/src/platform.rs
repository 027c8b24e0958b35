//! Core service traits implemented on MindAR and three.js

use js_sys::{Array, Object, Reflect};
use lomundou_core::{
    AnimationMixer, AudioError, AudioTrack, DecodedModel, Euler, EventQueue, ExperienceConfig,
    LightingConfig, LoadError, MarkerIndex, ModelDecoder, Ndc, SceneNode, SessionError,
    TrackingSession, Vec3, Viewport,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlAudioElement;

use crate::bindings::{
    self, js_error_message, AnimationAction, AnimationClip, Anchor, Camera, DirectionalLight, DracoLoader,
    GltfLoader, HemisphereLight, MindArThree, Object3D, Raycaster, Scene, Vector2, WebGlRenderer,
};
use crate::input;

/// Root `Object3D` of a loaded glTF scene
#[derive(Clone)]
pub struct ThreeNode(pub Object3D);

impl SceneNode for ThreeNode {
    fn rotation(&self) -> Euler {
        let r = self.0.rotation();
        Euler {
            x: r.x(),
            y: r.y(),
            z: r.z(),
        }
    }

    fn set_rotation(&mut self, rotation: Euler) {
        self.0.rotation().set(rotation.x, rotation.y, rotation.z);
    }

    fn set_scale(&mut self, scale: Vec3) {
        self.0.scale().set(scale.x, scale.y, scale.z);
    }

    fn set_position(&mut self, position: Vec3) {
        self.0.position().set(position.x, position.y, position.z);
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.set_visible(visible);
    }

    fn enable_shadows(&mut self) {
        let visit = Closure::wrap(Box::new(move |child: Object3D| {
            if child.is_mesh().unwrap_or(false) {
                child.set_cast_shadow(true);
                child.set_receive_shadow(true);
            }
        }) as Box<dyn FnMut(Object3D)>);
        // traverse is synchronous, so the closure can be dropped afterwards
        self.0.traverse(visit.as_ref().unchecked_ref());
    }
}

/// `THREE.AnimationMixer` plus the action created for each clip
pub struct ThreeMixer {
    mixer: bindings::AnimationMixer,
    actions: Vec<AnimationAction>,
}

impl AnimationMixer for ThreeMixer {
    fn update(&mut self, delta: f32) {
        self.mixer.update(delta);
    }

    fn action_count(&self) -> usize {
        self.actions.len()
    }

    fn play(&mut self, action: usize) {
        if let Some(a) = self.actions.get(action) {
            a.play();
        }
    }

    fn is_running(&self, action: usize) -> bool {
        self.actions.get(action).map(|a| a.is_running()).unwrap_or(false)
    }

    fn is_paused(&self, action: usize) -> bool {
        self.actions.get(action).map(|a| a.paused()).unwrap_or(false)
    }

    fn set_paused(&mut self, action: usize, paused: bool) {
        if let Some(a) = self.actions.get(action) {
            a.set_paused(paused);
        }
    }
}

/// One `<audio>` element per marker
pub struct HtmlAudio {
    path: String,
    element: HtmlAudioElement,
}

impl AudioTrack for HtmlAudio {
    fn rewind(&mut self) {
        self.element.set_current_time(0.0);
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let promise = self.element.play().map_err(|e| AudioError::Blocked {
            path: self.path.clone(),
            reason: js_error_message(&e),
        })?;

        // Autoplay refusals arrive later as a rejected promise
        let path = self.path.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                tracing::warn!(
                    "Audio play blocked for {} (user interaction needed): {}",
                    path,
                    js_error_message(&e)
                );
            }
        });
        Ok(())
    }

    fn pause(&mut self) {
        if let Err(e) = self.element.pause() {
            tracing::warn!("Failed to pause {}: {}", self.path, js_error_message(&e));
        }
    }
}

/// GLTFLoader wired to a DRACO geometry decoder
pub struct GltfDecoder {
    loader: GltfLoader,
}

impl GltfDecoder {
    pub fn new(decoder_path: &str) -> Self {
        let loader = GltfLoader::new();
        let draco = DracoLoader::new();
        draco.set_decoder_path(decoder_path);
        loader.set_draco_loader(&draco);
        Self { loader }
    }
}

impl ModelDecoder for GltfDecoder {
    type Node = ThreeNode;
    type Clip = AnimationClip;

    async fn decode(&self, path: &str) -> Result<DecodedModel<ThreeNode, AnimationClip>, LoadError> {
        let gltf = JsFuture::from(self.loader.load_async(path))
            .await
            .map_err(|e| LoadError::Decode {
                path: path.to_string(),
                reason: js_error_message(&e),
            })?
            .unchecked_into::<bindings::Gltf>();

        let clips = gltf
            .animations()
            .iter()
            .map(|clip| clip.unchecked_into::<AnimationClip>())
            .collect();

        Ok(DecodedModel {
            node: ThreeNode(gltf.scene()),
            clips,
        })
    }
}

/// MindAR image-tracking session with its three.js renderer
pub struct MindArSession {
    mindar: MindArThree,
    renderer: WebGlRenderer,
    scene: Scene,
    camera: Camera,
    raycaster: Raycaster,
    anchors: Vec<Anchor>,
    callbacks: Vec<Closure<dyn FnMut()>>,
    listeners: Option<input::PageListeners>,
}

impl MindArSession {
    /// Create the tracker over `document.body` for the configured target descriptor
    pub fn new(config: &ExperienceConfig) -> Result<Self, SessionError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SessionError::Init("No document".to_string()))?;
        let body = document
            .body()
            .ok_or_else(|| SessionError::Init("Document has no body".to_string()))?;

        let options = Object::new();
        let set = |key: &str, value: &JsValue| {
            Reflect::set(&options, &JsValue::from_str(key), value)
                .map(|_| ())
                .map_err(|e| SessionError::Init(js_error_message(&e)))
        };
        set("container", &body)?;
        set("imageTargetSrc", &JsValue::from_str(&config.experience.target))?;

        let mindar = MindArThree::new(&options).map_err(|e| SessionError::Init(js_error_message(&e)))?;
        tracing::info!("MindAR initialized with target {}", config.experience.target);

        Ok(Self {
            renderer: mindar.renderer(),
            scene: mindar.scene(),
            camera: mindar.camera(),
            mindar,
            raycaster: Raycaster::new(),
            anchors: Vec::new(),
            callbacks: Vec::new(),
            listeners: None,
        })
    }

    pub fn renderer(&self) -> &WebGlRenderer {
        &self.renderer
    }
}

impl TrackingSession for MindArSession {
    type Node = ThreeNode;
    type Clip = AnimationClip;
    type Mixer = ThreeMixer;
    type Audio = HtmlAudio;

    fn configure_lighting(&mut self, lighting: &LightingConfig) {
        let hemi = &lighting.hemisphere;
        let light = HemisphereLight::new(hemi.sky, hemi.ground, hemi.intensity);
        self.scene.add(&light);

        let dir = &lighting.directional;
        let dir_light = DirectionalLight::new(dir.color, dir.intensity);
        dir_light.position().set(dir.position.x, dir.position.y, dir.position.z);
        self.scene.add(&dir_light);
    }

    fn add_anchor(&mut self, marker: MarkerIndex, node: &ThreeNode, events: EventQueue) -> Result<(), SessionError> {
        let anchor = self.mindar.add_anchor(marker.0).map_err(|e| SessionError::Anchor {
            marker,
            reason: js_error_message(&e),
        })?;
        anchor.group().add(&node.0);

        let found_events = events.clone();
        let on_found = Closure::wrap(Box::new(move || {
            found_events.found(marker);
        }) as Box<dyn FnMut()>);
        let on_lost = Closure::wrap(Box::new(move || {
            events.lost(marker);
        }) as Box<dyn FnMut()>);

        anchor.set_on_target_found(on_found.as_ref().unchecked_ref());
        anchor.set_on_target_lost(on_lost.as_ref().unchecked_ref());

        self.callbacks.push(on_found);
        self.callbacks.push(on_lost);
        self.anchors.push(anchor);
        Ok(())
    }

    fn create_mixer(&mut self, node: &ThreeNode, clips: &[AnimationClip]) -> ThreeMixer {
        let mixer = bindings::AnimationMixer::new(&node.0);
        let actions = clips.iter().map(|clip| mixer.clip_action(clip)).collect();
        ThreeMixer { mixer, actions }
    }

    fn open_audio(&mut self, path: &str) -> Result<HtmlAudio, SessionError> {
        let element = HtmlAudioElement::new_with_src(path).map_err(|e| SessionError::Audio {
            path: path.to_string(),
            reason: js_error_message(&e),
        })?;
        Ok(HtmlAudio {
            path: path.to_string(),
            element,
        })
    }

    fn listen_input(&mut self, events: EventQueue) -> Result<(), SessionError> {
        self.listeners = Some(input::PageListeners::install(events)?);
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        let size = web_sys::window().map(|w| {
            let width = w.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
            let height = w.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
            (width as f32, height as f32)
        });
        let (width, height) = size.unwrap_or((0.0, 0.0));
        Viewport::new(width, height)
    }

    fn hit_test(&self, ndc: Ndc, node: &ThreeNode) -> bool {
        let pointer = Vector2::new(ndc.x, ndc.y);
        self.raycaster.set_from_camera(&pointer, &self.camera);
        let hits: Array = self.raycaster.intersect_objects(&node.0.children(), true);
        hits.length() > 0
    }

    async fn start(&mut self) -> Result<(), SessionError> {
        let promise = self
            .mindar
            .start()
            .map_err(|e| SessionError::Start(js_error_message(&e)))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| SessionError::Start(js_error_message(&e)))?;
        Ok(())
    }

    fn render(&mut self) {
        self.renderer.render(&self.scene, &self.camera);
    }
}
