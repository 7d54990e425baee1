use bevy::prelude::*;
use bevy_dig_terrain::{Terrain, TerrainPlugin, field::ScalarField, plugin::DigTerrain};
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use noiz::prelude::*;

const RESOLUTION: usize = 48;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            TerrainPlugin { dig_strength: 1.0 },
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, dig_shaft)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    info!("Noise Example: press Space to sink a shaft through the middle");

    commands.spawn(InfiniteGridBundle {
        settings: InfiniteGridSettings {
            fadeout_distance: 400.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(70., 70., 70.).looking_at(Vec3::splat(24.0), Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    let mut noise = Noise::<
        LayeredNoise<
            Normed<f32>,
            Persistence,
            Octave<MixCellGradients<OrthoGrid, Smoothstep, QuickGradients>>,
        >,
    >::default();
    noise.set_frequency(0.06);

    // Ground density falls off with height; noise carves caves and overhangs into it.
    let height = RESOLUTION as f32 * 0.6;
    let fill = move |[x, y, z]: [usize; 3]| {
        let n: f32 = noise.sample_for(Vec3::new(x as f32, y as f32, z as f32));
        0.5 + n - (y as f32 - height) / 8.0
    };

    let Ok(field) = ScalarField::from_fn(RESOLUTION, &fill) else {
        error!("could not build density field");
        return;
    };

    commands.spawn((
        Terrain::new(RESOLUTION).with_field(field).with_surface_level(0.5),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.3, 0.55, 0.25),
            ..Default::default()
        })),
    ));
}

fn dig_shaft(
    keyboard: Res<ButtonInput<KeyCode>>,
    terrain: Single<(Entity, &Terrain)>,
    mut digs: MessageWriter<DigTerrain>,
) {
    if !keyboard.just_pressed(KeyCode::Space) {
        return;
    }

    let (entity, terrain) = *terrain;
    let centre = terrain.resolution() as f32 * terrain.cell_size() / 2.0;
    for step in 0..terrain.resolution() {
        let y = step as f32 * terrain.cell_size();
        digs.write(DigTerrain::new(entity, Vec3::new(centre, y, centre)));
    }
}
