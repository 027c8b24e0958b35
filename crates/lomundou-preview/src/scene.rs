//! Camera and lighting

use bevy::color::Mix;
use bevy::prelude::*;
use lomundou_core::LightingConfig;

use crate::app::PreviewConfig;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene);
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// three.js light intensities are unitless; these map them onto Bevy's
const AMBIENT_BRIGHTNESS_PER_UNIT: f32 = 400.0;
const ILLUMINANCE_PER_UNIT: f32 = 10_000.0;

fn setup_scene(mut commands: Commands, config: Res<PreviewConfig>) {
    // Looking straight at the page, as the tracker's camera would
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        Transform::from_xyz(0.0, 0.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));

    spawn_lights(&mut commands, &config.0.lighting);
}

fn spawn_lights(commands: &mut Commands, lighting: &LightingConfig) {
    // Bevy has no hemisphere light; blend sky and ground into the ambient term
    let hemi = &lighting.hemisphere;
    let sky = hex_color(hemi.sky).to_linear();
    let ground = hex_color(hemi.ground).to_linear();
    commands.insert_resource(AmbientLight {
        color: Color::LinearRgba(sky.mix(&ground, 0.5)),
        brightness: hemi.intensity * AMBIENT_BRIGHTNESS_PER_UNIT,
        ..default()
    });

    let dir = &lighting.directional;
    commands.spawn((
        DirectionalLight {
            color: hex_color(dir.color),
            illuminance: dir.intensity * ILLUMINANCE_PER_UNIT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(dir.position.x, dir.position.y, dir.position.z).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// `0xRRGGBB` to an sRGB color
pub fn hex_color(rgb: u32) -> Color {
    Color::srgb_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color(0xffffff), Color::srgb_u8(255, 255, 255));
        assert_eq!(hex_color(0xbbbbff), Color::srgb_u8(0xbb, 0xbb, 0xff));
        assert_eq!(hex_color(0x102030), Color::srgb_u8(0x10, 0x20, 0x30));
    }
}
