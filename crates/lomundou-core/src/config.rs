//! Experience configuration and the marker table
//!
//! The built-in experience is ten markers, each paired with
//! `scene{n}.glb` and `page{n}.mp3`. Deployments can ship an
//! `experience.toml` that changes paths, the audio language variant,
//! gesture tuning or lighting. Every field has a default, so an empty file
//! is the built-in experience.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::ConfigError;
use crate::geometry::{MarkerIndex, Vec3};

/// Upper bound on the marker table size
pub const MAX_MARKERS: u32 = 64;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceConfig {
    #[serde(default)]
    pub experience: ExperienceSection,
    #[serde(default)]
    pub model: ModelDefaults,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default, rename = "marker")]
    pub marker_overrides: Vec<MarkerOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceSection {
    /// Image target descriptor consumed by the tracker
    #[serde(default = "default_target")]
    pub target: String,
    /// Audio language variant (subdirectory of `audio_dir`)
    #[serde(default = "default_audio_variant")]
    pub audio_variant: String,
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
    /// Number of image targets in the descriptor
    #[serde(default = "default_marker_count")]
    pub marker_count: u32,
    /// Geometry decompression decoder endpoint
    #[serde(default = "default_decoder_path")]
    pub decoder_path: String,
}

impl Default for ExperienceSection {
    fn default() -> Self {
        Self {
            target: default_target(),
            audio_variant: default_audio_variant(),
            model_dir: default_model_dir(),
            audio_dir: default_audio_dir(),
            marker_count: default_marker_count(),
            decoder_path: default_decoder_path(),
        }
    }
}

fn default_target() -> String {
    "./assets/targets/Lomundou.mind".to_string()
}

fn default_audio_variant() -> String {
    "dusun".to_string()
}

fn default_model_dir() -> String {
    "./assets/models".to_string()
}

fn default_audio_dir() -> String {
    "./assets/audio".to_string()
}

fn default_marker_count() -> u32 {
    10
}

fn default_decoder_path() -> String {
    "https://www.gstatic.com/draco/versioned/decoders/1.5.6/".to_string()
}

/// Placement applied to every model unless a marker overrides it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefaults {
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_position")]
    pub position: Vec3,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            position: default_position(),
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::splat(0.1)
}

fn default_position() -> Vec3 {
    Vec3::new(0.0, -0.4, 0.0)
}

/// Drag and pinch tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Radians of rotation per pixel of drag
    #[serde(default = "default_rotate_sensitivity")]
    pub rotate_sensitivity: f32,
    /// Scale factor change per pixel of pinch distance
    #[serde(default = "default_pinch_sensitivity")]
    pub pinch_sensitivity: f32,
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    /// Multiply the configured model scale by the zoom factor instead of
    /// using the factor as the model's scale
    #[serde(default)]
    pub relative_zoom: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            rotate_sensitivity: default_rotate_sensitivity(),
            pinch_sensitivity: default_pinch_sensitivity(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            relative_zoom: false,
        }
    }
}

impl GestureConfig {
    /// Model scale for a pinch zoom factor
    pub fn zoom_scale(&self, base_scale: Vec3, factor: f32) -> Vec3 {
        if self.relative_zoom {
            base_scale.scaled(factor)
        } else {
            Vec3::splat(factor)
        }
    }
}

fn default_rotate_sensitivity() -> f32 {
    0.01
}

fn default_pinch_sensitivity() -> f32 {
    0.005
}

fn default_min_scale() -> f32 {
    0.5
}

fn default_max_scale() -> f32 {
    2.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    #[serde(default)]
    pub hemisphere: HemisphereLight,
    #[serde(default)]
    pub directional: DirectionalLight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HemisphereLight {
    /// Sky color as 0xRRGGBB
    #[serde(default = "default_white")]
    pub sky: u32,
    /// Ground color as 0xRRGGBB
    #[serde(default = "default_ground")]
    pub ground: u32,
    #[serde(default = "default_hemisphere_intensity")]
    pub intensity: f32,
}

impl Default for HemisphereLight {
    fn default() -> Self {
        Self {
            sky: default_white(),
            ground: default_ground(),
            intensity: default_hemisphere_intensity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    #[serde(default = "default_white")]
    pub color: u32,
    #[serde(default = "default_directional_intensity")]
    pub intensity: f32,
    #[serde(default = "default_directional_position")]
    pub position: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: default_white(),
            intensity: default_directional_intensity(),
            position: default_directional_position(),
        }
    }
}

fn default_white() -> u32 {
    0xffffff
}

fn default_ground() -> u32 {
    0xbbbbff
}

fn default_hemisphere_intensity() -> f32 {
    1.0
}

fn default_directional_intensity() -> f32 {
    0.5
}

fn default_directional_position() -> Vec3 {
    Vec3::new(0.0, 5.0, 5.0)
}

/// Per-marker replacement of the generated paths or placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerOverride {
    pub index: MarkerIndex,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub scale: Option<Vec3>,
    #[serde(default)]
    pub position: Option<Vec3>,
}

/// One resolved row of the marker table
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub index: MarkerIndex,
    pub model_path: String,
    pub audio_path: String,
    pub scale: Vec3,
    pub position: Vec3,
}

impl ExperienceConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ExperienceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, falling back to the built-in experience
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            info!("Loaded experience config from {:?}", path);
            Ok(config)
        } else {
            info!("Config file {:?} not found, using built-in experience", path);
            Ok(Self::default())
        }
    }

    /// Switch the audio language variant
    pub fn with_audio_variant(mut self, variant: impl Into<String>) -> Self {
        self.experience.audio_variant = variant.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.experience.marker_count;
        if count == 0 || count > MAX_MARKERS {
            return Err(ConfigError::MarkerCount {
                count,
                max: MAX_MARKERS,
            });
        }

        let mut seen = HashSet::new();
        for marker in &self.marker_overrides {
            if marker.index.0 >= count {
                return Err(ConfigError::MarkerOutOfRange {
                    index: marker.index,
                    count,
                });
            }
            if !seen.insert(marker.index) {
                return Err(ConfigError::DuplicateMarker(marker.index));
            }
        }

        let gestures = &self.gestures;
        if !(gestures.rotate_sensitivity > 0.0) {
            return Err(ConfigError::Sensitivity("rotate_sensitivity"));
        }
        if !(gestures.pinch_sensitivity > 0.0) {
            return Err(ConfigError::Sensitivity("pinch_sensitivity"));
        }
        if !(gestures.min_scale <= gestures.max_scale) {
            return Err(ConfigError::ScaleBounds {
                min: gestures.min_scale,
                max: gestures.max_scale,
            });
        }

        Ok(())
    }

    /// Expand the config into the ordered marker table, one row per index
    pub fn markers(&self) -> Vec<MarkerSpec> {
        let experience = &self.experience;
        let model_dir = experience.model_dir.trim_end_matches('/');
        let audio_dir = experience.audio_dir.trim_end_matches('/');

        (0..experience.marker_count)
            .map(MarkerIndex)
            .map(|index| {
                let over = self.marker_overrides.iter().find(|m| m.index == index);
                let page = index.page();
                MarkerSpec {
                    index,
                    model_path: over
                        .and_then(|m| m.model.clone())
                        .unwrap_or_else(|| format!("{}/scene{}.glb", model_dir, page)),
                    audio_path: over.and_then(|m| m.audio.clone()).unwrap_or_else(|| {
                        format!("{}/{}/page{}.mp3", audio_dir, experience.audio_variant, page)
                    }),
                    scale: over.and_then(|m| m.scale).unwrap_or(self.model.scale),
                    position: over.and_then(|m| m.position).unwrap_or(self.model.position),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_marker_table() {
        let markers = ExperienceConfig::default().markers();
        assert_eq!(markers.len(), 10);

        assert_eq!(markers[0].index, MarkerIndex(0));
        assert_eq!(markers[0].model_path, "./assets/models/scene1.glb");
        assert_eq!(markers[0].audio_path, "./assets/audio/dusun/page1.mp3");
        assert_eq!(markers[9].model_path, "./assets/models/scene10.glb");
        assert_eq!(markers[9].audio_path, "./assets/audio/dusun/page10.mp3");

        for marker in &markers {
            assert_eq!(marker.scale, Vec3::splat(0.1));
            assert_eq!(marker.position, Vec3::new(0.0, -0.4, 0.0));
        }
    }

    #[test]
    fn test_empty_document_is_builtin_experience() {
        let config = ExperienceConfig::from_toml_str("").unwrap();
        assert_eq!(config.experience.target, "./assets/targets/Lomundou.mind");
        assert_eq!(config.gestures, GestureConfig::default());
        assert_eq!(config.lighting.hemisphere.ground, 0xbbbbff);
        assert_eq!(config.markers(), ExperienceConfig::default().markers());
    }

    #[test]
    fn test_audio_variant() {
        let config = ExperienceConfig::default().with_audio_variant("bm");
        let markers = config.markers();
        assert_eq!(markers[2].audio_path, "./assets/audio/bm/page3.mp3");
    }

    #[test]
    fn test_marker_overrides() {
        let toml = r#"
[experience]
model_dir = "models/"
marker_count = 3

[model]
scale = [0.2, 0.2, 0.2]

[[marker]]
index = 1
model = "models/special.glb"
position = [0.0, 0.0, 0.5]
"#;
        let config = ExperienceConfig::from_toml_str(toml).unwrap();
        let markers = config.markers();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].model_path, "models/scene1.glb");
        assert_eq!(markers[1].model_path, "models/special.glb");
        assert_eq!(markers[1].audio_path, "./assets/audio/dusun/page2.mp3");
        assert_eq!(markers[1].position, Vec3::new(0.0, 0.0, 0.5));
        assert_eq!(markers[1].scale, Vec3::splat(0.2));
        assert_eq!(markers[2].position, Vec3::new(0.0, -0.4, 0.0));
    }

    #[test]
    fn test_lighting_hex_colors() {
        let toml = r#"
[lighting.hemisphere]
sky = 0xff0000

[lighting.directional]
intensity = 0.8
"#;
        let config = ExperienceConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.lighting.hemisphere.sky, 0xff0000);
        assert_eq!(config.lighting.hemisphere.intensity, 1.0);
        assert_eq!(config.lighting.directional.intensity, 0.8);
        assert_eq!(config.lighting.directional.position, Vec3::new(0.0, 5.0, 5.0));
    }

    #[test]
    fn test_rejects_duplicate_override() {
        let toml = r#"
[[marker]]
index = 4
[[marker]]
index = 4
"#;
        let err = ExperienceConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateMarker(MarkerIndex(4))));
    }

    #[test]
    fn test_rejects_out_of_range_override() {
        let toml = r#"
[[marker]]
index = 10
"#;
        let err = ExperienceConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MarkerOutOfRange { count: 10, .. }));
    }

    #[test]
    fn test_rejects_bad_gestures() {
        let err = ExperienceConfig::from_toml_str("[gestures]\nmin_scale = 3.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ScaleBounds { .. }));

        let err = ExperienceConfig::from_toml_str("[gestures]\npinch_sensitivity = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Sensitivity("pinch_sensitivity")));

        let err = ExperienceConfig::from_toml_str("[experience]\nmarker_count = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::MarkerCount { count: 0, .. }));
    }

    #[test]
    fn test_zoom_scale() {
        let base = Vec3::splat(0.1);
        let gestures = GestureConfig::default();
        assert!(!gestures.relative_zoom);
        assert_eq!(gestures.zoom_scale(base, 1.2), Vec3::splat(1.2));

        let config = ExperienceConfig::from_toml_str("[gestures]\nrelative_zoom = true\n").unwrap();
        let scale = config.gestures.zoom_scale(base, 1.2);
        assert!((scale.x - 0.12).abs() < 1e-6);
    }
}
