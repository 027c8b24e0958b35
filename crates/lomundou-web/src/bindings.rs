//! JavaScript bindings for MindAR, three.js and the glTF/DRACO loaders
//!
//! The host page exposes `THREE` (MindAR's bundled copy), `GLTFLoader` and
//! `DRACOLoader` on `window` before the wasm module starts.

use js_sys::{Array, Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    // --- MindAR ---

    #[wasm_bindgen(js_namespace = ["MINDAR", "IMAGE"], js_name = MindARThree)]
    pub type MindArThree;

    #[wasm_bindgen(constructor, js_namespace = ["MINDAR", "IMAGE"], js_class = "MindARThree", catch)]
    pub fn new(options: &JsValue) -> Result<MindArThree, JsValue>;

    #[wasm_bindgen(method, getter)]
    pub fn renderer(this: &MindArThree) -> WebGlRenderer;

    #[wasm_bindgen(method, getter)]
    pub fn scene(this: &MindArThree) -> Scene;

    #[wasm_bindgen(method, getter)]
    pub fn camera(this: &MindArThree) -> Camera;

    #[wasm_bindgen(method, catch, js_name = addAnchor)]
    pub fn add_anchor(this: &MindArThree, target_index: u32) -> Result<Anchor, JsValue>;

    #[wasm_bindgen(method, catch)]
    pub fn start(this: &MindArThree) -> Result<Promise, JsValue>;

    pub type Anchor;

    #[wasm_bindgen(method, getter)]
    pub fn group(this: &Anchor) -> Object3D;

    #[wasm_bindgen(method, setter = onTargetFound)]
    pub fn set_on_target_found(this: &Anchor, callback: &Function);

    #[wasm_bindgen(method, setter = onTargetLost)]
    pub fn set_on_target_lost(this: &Anchor, callback: &Function);

    // --- three.js scene graph ---

    #[wasm_bindgen(js_namespace = THREE)]
    #[derive(Clone)]
    pub type Object3D;

    #[wasm_bindgen(method)]
    pub fn add(this: &Object3D, child: &Object3D);

    #[wasm_bindgen(method, getter)]
    pub fn rotation(this: &Object3D) -> ThreeEuler;

    #[wasm_bindgen(method, getter)]
    pub fn scale(this: &Object3D) -> Vector3;

    #[wasm_bindgen(method, getter)]
    pub fn position(this: &Object3D) -> Vector3;

    #[wasm_bindgen(method, setter)]
    pub fn set_visible(this: &Object3D, visible: bool);

    #[wasm_bindgen(method, getter)]
    pub fn children(this: &Object3D) -> Array;

    #[wasm_bindgen(method)]
    pub fn traverse(this: &Object3D, callback: &Function);

    #[wasm_bindgen(method, getter = isMesh)]
    pub fn is_mesh(this: &Object3D) -> Option<bool>;

    #[wasm_bindgen(method, setter = castShadow)]
    pub fn set_cast_shadow(this: &Object3D, cast: bool);

    #[wasm_bindgen(method, setter = receiveShadow)]
    pub fn set_receive_shadow(this: &Object3D, receive: bool);

    #[wasm_bindgen(extends = Object3D, js_namespace = THREE)]
    pub type Scene;

    #[wasm_bindgen(extends = Object3D, js_namespace = THREE)]
    pub type Camera;

    #[wasm_bindgen(js_namespace = THREE, js_name = Euler)]
    pub type ThreeEuler;

    #[wasm_bindgen(method, getter)]
    pub fn x(this: &ThreeEuler) -> f32;

    #[wasm_bindgen(method, getter)]
    pub fn y(this: &ThreeEuler) -> f32;

    #[wasm_bindgen(method, getter)]
    pub fn z(this: &ThreeEuler) -> f32;

    #[wasm_bindgen(method)]
    pub fn set(this: &ThreeEuler, x: f32, y: f32, z: f32);

    #[wasm_bindgen(js_namespace = THREE)]
    pub type Vector3;

    #[wasm_bindgen(method)]
    pub fn set(this: &Vector3, x: f32, y: f32, z: f32);

    #[wasm_bindgen(js_namespace = THREE)]
    pub type Vector2;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new(x: f32, y: f32) -> Vector2;

    // --- rendering ---

    #[wasm_bindgen(js_namespace = THREE, js_name = WebGLRenderer)]
    #[derive(Clone)]
    pub type WebGlRenderer;

    #[wasm_bindgen(method)]
    pub fn render(this: &WebGlRenderer, scene: &Scene, camera: &Camera);

    #[wasm_bindgen(method, js_name = setAnimationLoop)]
    pub fn set_animation_loop(this: &WebGlRenderer, callback: Option<&Function>);

    #[wasm_bindgen(extends = Object3D, js_namespace = THREE)]
    pub type HemisphereLight;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new(sky: u32, ground: u32, intensity: f32) -> HemisphereLight;

    #[wasm_bindgen(extends = Object3D, js_namespace = THREE)]
    pub type DirectionalLight;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new(color: u32, intensity: f32) -> DirectionalLight;

    #[wasm_bindgen(js_namespace = THREE)]
    pub type Raycaster;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new() -> Raycaster;

    #[wasm_bindgen(method, js_name = setFromCamera)]
    pub fn set_from_camera(this: &Raycaster, coords: &Vector2, camera: &Camera);

    #[wasm_bindgen(method, js_name = intersectObjects)]
    pub fn intersect_objects(this: &Raycaster, objects: &Array, recursive: bool) -> Array;

    // --- animation ---

    #[wasm_bindgen(js_namespace = THREE)]
    pub type AnimationClip;

    #[wasm_bindgen(js_namespace = THREE)]
    pub type AnimationMixer;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new(root: &Object3D) -> AnimationMixer;

    #[wasm_bindgen(method, js_name = clipAction)]
    pub fn clip_action(this: &AnimationMixer, clip: &AnimationClip) -> AnimationAction;

    #[wasm_bindgen(method)]
    pub fn update(this: &AnimationMixer, delta: f32);

    #[wasm_bindgen(js_namespace = THREE)]
    pub type AnimationAction;

    #[wasm_bindgen(method)]
    pub fn play(this: &AnimationAction);

    #[wasm_bindgen(method, js_name = isRunning)]
    pub fn is_running(this: &AnimationAction) -> bool;

    #[wasm_bindgen(method, getter)]
    pub fn paused(this: &AnimationAction) -> bool;

    #[wasm_bindgen(method, setter)]
    pub fn set_paused(this: &AnimationAction, paused: bool);

    // --- model loading ---

    #[wasm_bindgen(js_name = GLTFLoader)]
    pub type GltfLoader;

    #[wasm_bindgen(constructor, js_class = "GLTFLoader")]
    pub fn new() -> GltfLoader;

    #[wasm_bindgen(method, js_name = setDRACOLoader)]
    pub fn set_draco_loader(this: &GltfLoader, draco: &DracoLoader);

    #[wasm_bindgen(method, js_name = loadAsync)]
    pub fn load_async(this: &GltfLoader, path: &str) -> Promise;

    #[wasm_bindgen(js_name = DRACOLoader)]
    pub type DracoLoader;

    #[wasm_bindgen(constructor, js_class = "DRACOLoader")]
    pub fn new() -> DracoLoader;

    #[wasm_bindgen(method, js_name = setDecoderPath)]
    pub fn set_decoder_path(this: &DracoLoader, path: &str);

    /// Result of `GLTFLoader.loadAsync`
    pub type Gltf;

    #[wasm_bindgen(method, getter)]
    pub fn scene(this: &Gltf) -> Object3D;

    #[wasm_bindgen(method, getter)]
    pub fn animations(this: &Gltf) -> Array;
}

/// Best-effort human readable message for a thrown JS value
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
