//! Scene state: ring layout generation, procedural torus mesh, and per-frame
//! GPU instance data for the shared rotating group.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

use crate::params::{RingSpec, TorusSpec};

/// Vertex data for scene meshes (position + normal)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// CPU-side mesh (uploaded once at startup)
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Which of the two scene meshes an entity renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    Prototype,
    Torus,
}

/// Per-instance GPU data: model matrix + material colors
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub emissive: [f32; 4],
}

/// One renderable object, owned by the scene group for its entire lifetime
#[derive(Debug, Clone)]
pub struct SceneEntity {
    pub mesh: MeshKind,

    /// Position within the group (before the group rotation)
    pub position: Vec3,

    /// Tilt around X (the torus lies flat in the horizontal plane)
    pub rotation_x: f32,

    /// Current vertical scale (updated every frame for ring instances)
    pub scale_y: f32,

    pub base_color: [f32; 3],
    pub emissive: [f32; 3],
}

/// Visualization entry: a ring instance plus its resting vertical scale
#[derive(Debug, Clone)]
pub struct VisEntry {
    pub entity: usize,
    pub start_scale_y: f32,
}

/// Generate the torus mesh in the XY plane (tilted flat via `rotation_x`).
pub fn torus_mesh(spec: &TorusSpec) -> MeshData {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for j in 0..=spec.radial_segments {
        for i in 0..=spec.tubular_segments {
            let u = i as f32 / spec.tubular_segments as f32 * TAU;
            let v = j as f32 / spec.radial_segments as f32 * TAU;

            let ring_center = Vec3::new(spec.radius * u.cos(), spec.radius * u.sin(), 0.0);
            let position = Vec3::new(
                (spec.radius + spec.tube_radius * v.cos()) * u.cos(),
                (spec.radius + spec.tube_radius * v.cos()) * u.sin(),
                spec.tube_radius * v.sin(),
            );
            let normal = (position - ring_center).normalize_or_zero();

            vertices.push(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
            });
        }
    }

    let stride = (spec.tubular_segments + 1) as u32;
    for j in 0..spec.radial_segments as u32 {
        for i in 0..spec.tubular_segments as u32 {
            let a = j * stride + i;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;

            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    MeshData { vertices, indices }
}

/// Scene system: the entity arena, its visualization entries and the shared
/// group rotation.
pub struct SceneSystem {
    pub entities: Vec<SceneEntity>,
    pub entries: Vec<VisEntry>,

    /// Yaw of the whole group (radians, decremented every frame)
    pub yaw: f32,
}

impl SceneSystem {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            entries: Vec::new(),
            yaw: 0.0,
        }
    }

    /// Ring layout generator: place `spec.count` prototype clones evenly on
    /// the circle of radius `spec.radius` in the horizontal plane and
    /// register one visualization entry per clone.
    ///
    /// Each clone keeps the prototype's base color; only the emissive tint
    /// is overridden, like cloning a material and recoloring it.
    pub fn spawn_ring(&mut self, spec: &RingSpec, prototype_base_color: [f32; 3]) {
        for i in 0..spec.count {
            let angle = (i as f32 / spec.count as f32) * TAU;
            let position = Vec3::new(spec.radius * angle.cos(), 0.0, spec.radius * angle.sin());

            let entity = SceneEntity {
                mesh: MeshKind::Prototype,
                position,
                rotation_x: 0.0,
                scale_y: spec.scale_y,
                base_color: prototype_base_color,
                emissive: spec.tint,
            };

            self.entities.push(entity);
            self.entries.push(VisEntry {
                entity: self.entities.len() - 1,
                start_scale_y: spec.scale_y,
            });
        }
    }

    /// Add the static decorative torus (not a visualization entry).
    pub fn spawn_torus(&mut self, spec: &TorusSpec) {
        self.entities.push(SceneEntity {
            mesh: MeshKind::Torus,
            position: Vec3::ZERO,
            rotation_x: PI / 2.0,
            scale_y: 1.0,
            base_color: spec.base_color,
            emissive: spec.emissive,
        });
    }

    /// Resting vertical scales, aligned with `entries`
    pub fn base_scales(&self) -> Vec<f32> {
        self.entries.iter().map(|e| e.start_scale_y).collect()
    }

    /// Apply per-entry vertical scales computed by the frame visualizer
    pub fn apply_scales(&mut self, scales: &[f32]) {
        for (entry, scale) in self.entries.iter().zip(scales) {
            self.entities[entry.entity].scale_y = *scale;
        }
    }

    /// Model matrix for one entity under the current group rotation
    pub fn model_matrix(&self, entity: &SceneEntity) -> Mat4 {
        Mat4::from_rotation_y(self.yaw)
            * Mat4::from_translation(entity.position)
            * Mat4::from_rotation_x(entity.rotation_x)
            * Mat4::from_scale(Vec3::new(1.0, entity.scale_y, 1.0))
    }

    /// Per-frame instance data, prototype instances first, then the torus.
    /// The ordering is fixed so the render system can draw each mesh with a
    /// contiguous instance range.
    pub fn instance_data(&self) -> Vec<InstanceRaw> {
        let raw = |entity: &SceneEntity| InstanceRaw {
            model: self.model_matrix(entity).to_cols_array_2d(),
            base_color: [
                entity.base_color[0],
                entity.base_color[1],
                entity.base_color[2],
                1.0,
            ],
            emissive: [
                entity.emissive[0],
                entity.emissive[1],
                entity.emissive[2],
                1.0,
            ],
        };

        let mut instances: Vec<InstanceRaw> = self
            .entities
            .iter()
            .filter(|e| e.mesh == MeshKind::Prototype)
            .map(raw)
            .collect();
        instances.extend(
            self.entities
                .iter()
                .filter(|e| e.mesh == MeshKind::Torus)
                .map(raw),
        );
        instances
    }

    /// Number of prototype instances (the leading range of `instance_data`)
    pub fn prototype_instance_count(&self) -> u32 {
        self.entities
            .iter()
            .filter(|e| e.mesh == MeshKind::Prototype)
            .count() as u32
    }

    /// Number of torus instances (the trailing range of `instance_data`)
    pub fn torus_instance_count(&self) -> u32 {
        self.entities
            .iter()
            .filter(|e| e.mesh == MeshKind::Torus)
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::default_rings;

    fn ring(radius: f32, scale_y: f32, count: usize) -> RingSpec {
        RingSpec {
            radius,
            scale_y,
            count,
            tint: [1.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_ring_produces_exact_count_on_circle() {
        let mut scene = SceneSystem::new();
        scene.spawn_ring(&ring(1.6, 2.5, 24), [1.0; 3]);

        assert_eq!(scene.entities.len(), 24);
        assert_eq!(scene.entries.len(), 24);

        for (i, entity) in scene.entities.iter().enumerate() {
            let angle = (i as f32 / 24.0) * TAU;
            assert!((entity.position.x - 1.6 * angle.cos()).abs() < 1e-6);
            assert_eq!(entity.position.y, 0.0);
            assert!((entity.position.z - 1.6 * angle.sin()).abs() < 1e-6);

            // On the circle of radius 1.6 in the horizontal plane
            let r = (entity.position.x * entity.position.x
                + entity.position.z * entity.position.z)
                .sqrt();
            assert!((r - 1.6).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ring_count_zero_is_valid() {
        let mut scene = SceneSystem::new();
        scene.spawn_ring(&ring(1.0, 1.0, 0), [1.0; 3]);
        assert!(scene.entities.is_empty());
        assert!(scene.entries.is_empty());
    }

    #[test]
    fn test_ring_radius_zero_is_valid() {
        let mut scene = SceneSystem::new();
        scene.spawn_ring(&ring(0.0, 1.0, 8), [1.0; 3]);
        assert_eq!(scene.entities.len(), 8);
        for entity in &scene.entities {
            assert_eq!(entity.position, Vec3::ZERO);
        }
    }

    #[test]
    fn test_ring_four_points_cardinal_positions() {
        let mut scene = SceneSystem::new();
        scene.spawn_ring(&ring(2.0, 1.0, 4), [1.0; 3]);

        let expected = [
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -2.0),
        ];
        for (entity, expected) in scene.entities.iter().zip(expected) {
            assert!((entity.position - expected).length() < 1e-5);
        }
    }

    #[test]
    fn test_full_scene_counts_are_fixed() {
        let mut scene = SceneSystem::new();
        for spec in default_rings() {
            scene.spawn_ring(&spec, [1.0; 3]);
        }
        scene.spawn_torus(&TorusSpec::default());

        assert_eq!(scene.entities.len(), 73);
        assert_eq!(scene.entries.len(), 72);
        assert_eq!(scene.prototype_instance_count(), 72);
        assert_eq!(scene.torus_instance_count(), 1);

        // Torus is last in the instance ordering
        let instances = scene.instance_data();
        assert_eq!(instances.len(), 73);
    }

    #[test]
    fn test_apply_scales_updates_entities() {
        let mut scene = SceneSystem::new();
        scene.spawn_ring(&ring(1.0, 2.0, 2), [1.0; 3]);
        scene.apply_scales(&[3.5, 4.5]);

        assert_eq!(scene.entities[0].scale_y, 3.5);
        assert_eq!(scene.entities[1].scale_y, 4.5);
        // Resting scales are untouched
        assert_eq!(scene.entries[0].start_scale_y, 2.0);
    }

    #[test]
    fn test_model_matrix_applies_group_rotation_and_scale() {
        let mut scene = SceneSystem::new();
        scene.spawn_ring(&ring(2.0, 1.0, 1), [1.0; 3]);
        scene.entities[0].scale_y = 3.0;

        // Without rotation: unit-Y vertex lands at position + scaled Y
        let m = scene.model_matrix(&scene.entities[0]);
        let p = m.transform_point3(Vec3::Y);
        assert!((p - Vec3::new(2.0, 3.0, 0.0)).length() < 1e-5);

        // Quarter-turn yaw carries (2, 0, 0) to (0, 0, -2)
        scene.yaw = PI / 2.0;
        let m = scene.model_matrix(&scene.entities[0]);
        let p = m.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_torus_mesh_counts() {
        let spec = TorusSpec::default();
        let mesh = torus_mesh(&spec);

        assert_eq!(
            mesh.vertices.len(),
            (spec.radial_segments + 1) * (spec.tubular_segments + 1)
        );
        assert_eq!(
            mesh.indices.len(),
            spec.radial_segments * spec.tubular_segments * 6
        );

        // All vertices lie within tube_radius of the main ring circle
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            let ring_dist = ((p.x * p.x + p.y * p.y).sqrt() - spec.radius).abs();
            let dist = (ring_dist * ring_dist + p.z * p.z).sqrt();
            assert!(dist <= spec.tube_radius + 1e-5);
        }
    }
}
