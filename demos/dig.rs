use bevy::prelude::*;
use bevy_dig_terrain::{Terrain, TerrainPlugin, plugin::DigTerrain};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

const RESOLUTION: usize = 32;
const CELL_SIZE: f32 = 0.5;
const CURSOR_SPEED: f32 = 4.0;

#[derive(Component)]
struct DigCursor;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            #[cfg(not(target_arch = "wasm32"))]
            bevy::pbr::wireframe::WireframePlugin::default(),
            TerrainPlugin::default(),
            PanOrbitCameraPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, (move_cursor, dig).chain())
        .run();
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    info!("Dig Example: arrows / PageUp / PageDown move the cursor, Space digs");

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(0.0, 12.0, 18.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::OVERCAST_DAY,
            ..default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-50.0_f32.to_radians())),
    ));

    // Centre the terrain on the origin with its flat top just below y = 0.
    let extent = RESOLUTION as f32 * CELL_SIZE;
    commands.spawn((
        Terrain::new(RESOLUTION).with_cell_size(CELL_SIZE),
        Transform::from_xyz(-extent / 2.0, -extent, -extent / 2.0),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.45, 0.35, 0.25),
            perceptual_roughness: 0.9,
            ..default()
        })),
    ));

    commands.spawn((
        DigCursor,
        Mesh3d(meshes.add(Sphere::new(0.2))),
        MeshMaterial3d(materials.add(Color::srgb(1.0, 0.2, 0.1))),
        Transform::from_xyz(0.0, -CELL_SIZE / 2.0, 0.0),
    ));
}

fn move_cursor(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut cursor: Single<&mut Transform, With<DigCursor>>,
) {
    let mut direction = Vec3::ZERO;
    for (key, step) in [
        (KeyCode::ArrowLeft, Vec3::NEG_X),
        (KeyCode::ArrowRight, Vec3::X),
        (KeyCode::ArrowUp, Vec3::NEG_Z),
        (KeyCode::ArrowDown, Vec3::Z),
        (KeyCode::PageUp, Vec3::Y),
        (KeyCode::PageDown, Vec3::NEG_Y),
    ] {
        if keyboard.pressed(key) {
            direction += step;
        }
    }

    cursor.translation += direction * CURSOR_SPEED * time.delta_secs();
}

fn dig(
    keyboard: Res<ButtonInput<KeyCode>>,
    cursor: Single<&Transform, With<DigCursor>>,
    terrain: Single<Entity, With<Terrain>>,
    mut digs: MessageWriter<DigTerrain>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        digs.write(DigTerrain::new(*terrain, cursor.translation));
    }
}
