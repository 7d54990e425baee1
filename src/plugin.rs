use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
};
use tracing::{error, warn};

use crate::{mesh::TerrainMesh, terrain::Terrain, types::Point};

/// System sets for the dig-and-remesh pipeline.
///
/// Use these to order your own systems relative to regeneration:
///
/// ```rust,ignore
/// // Run after geometry is ready but before it's uploaded, e.g. to rebuild a collider:
/// app.add_systems(Update, build_collider.after(TerrainSet::Generate)
///                                       .before(TerrainSet::Upload));
/// ```
///
/// ```text
/// TerrainSet::Dig  →  TerrainSet::Generate  →  [your systems]  →  TerrainSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TerrainSet {
    /// Applies [`DigTerrain`] messages to the density field.
    Dig,
    /// Remeshes every [`DirtyTerrain`] and inserts [`GeneratedTerrainMesh`].
    Generate,
    /// Moves [`GeneratedTerrainMesh`] into a Bevy [`Mesh3d`].
    Upload,
}

/// Marker for terrains whose field changed since their mesh was last built.
///
/// Removed once the new mesh has been uploaded.
#[derive(Component)]
pub struct DirtyTerrain;

/// Mesh produced by the latest regeneration, waiting for [`TerrainSet::Upload`].
///
/// Systems between [`TerrainSet::Generate`] and [`TerrainSet::Upload`] can read it.
#[derive(Component, Debug)]
pub struct GeneratedTerrainMesh(pub TerrainMesh);

/// Request to dig a terrain around a world-space point, typically a ray hit.
///
/// The point is brought into the terrain's local space with the inverse of its
/// [`GlobalTransform`], then the 8 lattice points around it are dug and the terrain
/// is remeshed once.
#[derive(Message, Debug, Clone)]
pub struct DigTerrain {
    pub terrain: Entity,
    pub hit_point: Vec3,
    /// Overrides [`DiggingConfig::dig_strength`].
    pub strength: Option<f32>,
}

impl DigTerrain {
    pub fn new(terrain: Entity, hit_point: Vec3) -> Self {
        Self {
            terrain,
            hit_point,
            strength: None,
        }
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength);
        self
    }
}

/// Runtime configuration for digging.
///
/// Inserted as a resource by [`TerrainPlugin`]. Modify it at any time:
///
/// ```rust,ignore
/// fn power_up(mut config: ResMut<DiggingConfig>) {
///     config.dig_strength = 2.0;
/// }
/// ```
#[derive(Resource, Debug)]
pub struct DiggingConfig {
    /// Amount removed from each lattice sample per dig. Default: `0.8`.
    pub dig_strength: f32,
}

impl Default for DiggingConfig {
    fn default() -> Self {
        Self { dig_strength: 0.8 }
    }
}

/// Bevy plugin that turns [`Terrain`] components into meshes and keeps them in sync with digs.
///
/// Regeneration is synchronous: a dirty terrain is fully remeshed in the same frame.
///
/// ```text
/// Terrain added / DigTerrain read
///   → DirtyTerrain inserted         (mark_new_terrain / apply_digs)
///   → GeneratedTerrainMesh inserted (TerrainSet::Generate)
///   → [your collider systems here]
///   → Mesh3d inserted               (TerrainSet::Upload)
///   → DirtyTerrain + GeneratedTerrainMesh removed
/// ```
pub struct TerrainPlugin {
    /// Initial value for [`DiggingConfig::dig_strength`].
    pub dig_strength: f32,
}

impl Default for TerrainPlugin {
    fn default() -> Self {
        Self {
            dig_strength: DiggingConfig::default().dig_strength,
        }
    }
}

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DiggingConfig {
            dig_strength: self.dig_strength,
        })
        .add_message::<DigTerrain>()
        .configure_sets(
            Update,
            (TerrainSet::Dig, TerrainSet::Generate, TerrainSet::Upload).chain(),
        )
        .add_systems(
            Update,
            (
                apply_digs.in_set(TerrainSet::Dig),
                regenerate_meshes.in_set(TerrainSet::Generate),
                upload_meshes.in_set(TerrainSet::Upload),
            ),
        );

        #[cfg(feature = "auto_regenerate")]
        app.add_systems(Update, mark_new_terrain.before(TerrainSet::Generate));
    }
}

/// Inserts [`DirtyTerrain`] on every newly added [`Terrain`] so it gets its first mesh.
#[cfg(feature = "auto_regenerate")]
fn mark_new_terrain(
    mut commands: Commands,
    query: Query<Entity, (Added<Terrain>, Without<DirtyTerrain>)>,
) {
    for entity in query.iter() {
        commands.entity(entity).insert(DirtyTerrain);
    }
}

/// Applies queued [`DigTerrain`] messages and marks the touched terrains dirty.
fn apply_digs(
    mut commands: Commands,
    config: Res<DiggingConfig>,
    mut digs: MessageReader<DigTerrain>,
    mut terrains: Query<(&mut Terrain, &GlobalTransform)>,
) {
    for dig in digs.read() {
        let Ok((mut terrain, transform)) = terrains.get_mut(dig.terrain) else {
            warn!(entity = ?dig.terrain, "dig targets an entity without a terrain");
            continue;
        };

        let local = transform.affine().inverse().transform_point3(dig.hit_point);
        let strength = dig.strength.unwrap_or(config.dig_strength);

        if terrain.dig_around(Point::new(local.x, local.y, local.z), strength) > 0 {
            commands.entity(dig.terrain).insert(DirtyTerrain);
        }
    }
}

/// Runs one full regeneration pass per [`DirtyTerrain`].
///
/// A failed pass leaves the previously uploaded mesh in place.
fn regenerate_meshes(
    mut commands: Commands,
    query: Query<(Entity, &Terrain), With<DirtyTerrain>>,
) {
    for (entity, terrain) in query.iter() {
        match terrain.regenerate_mesh() {
            Ok(mesh) => {
                commands.entity(entity).insert(GeneratedTerrainMesh(mesh));
            }
            Err(err) => {
                error!(?entity, "terrain regeneration aborted: {err}");
                commands.entity(entity).remove::<DirtyTerrain>();
            }
        }
    }
}

/// Uploads a [`GeneratedTerrainMesh`] into a Bevy [`Mesh3d`], then removes the markers.
///
/// The vertex and index buffers are **moved** out of the component, not copied.
/// The mesh stays readable in the main world so collision code can use it.
fn upload_meshes(
    mut commands: Commands,
    mut query: Query<(Entity, &mut GeneratedTerrainMesh)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, mut generated) in query.iter_mut() {
        let (positions, normals, indices) = std::mem::take(&mut generated.0).into_buffers();

        let mut bevy_mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
        );
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        bevy_mesh.insert_indices(Indices::U32(indices));

        commands
            .entity(entity)
            .insert(Mesh3d(meshes.add(bevy_mesh)))
            .remove::<(GeneratedTerrainMesh, DirtyTerrain)>();
    }
}
