//! Prototype model loading.
//!
//! The scene is built from clones of a single glTF binary asset. The asset
//! contract: the default scene's first root node has a second child carrying
//! the mesh whose material the ring generator retints.

use std::path::Path;

use crate::scene::{MeshData, Vertex};

/// The loaded prototype: mesh geometry plus its material factors.
pub struct Prototype {
    pub mesh: MeshData,

    /// Diffuse base color factor of the sub-mesh material (linear RGB)
    pub base_color: [f32; 3],

    /// Emissive factor of the sub-mesh material (overridden per ring)
    pub emissive: [f32; 3],
}

/// Load the prototype from a glTF binary at `path`.
///
/// Any failure here is a fatal startup error: without the prototype there is
/// no scene to build.
pub fn load_prototype(path: &Path) -> Result<Prototype, String> {
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| format!("Failed to load model {}: {}", path.display(), e))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| format!("Model {} has no scene", path.display()))?;

    let root = scene
        .nodes()
        .next()
        .ok_or_else(|| format!("Model {} has an empty scene", path.display()))?;

    // Fixed sub-mesh position within the asset (external contract)
    let sub = root.children().nth(1).ok_or_else(|| {
        format!(
            "Model {} does not match the expected shape (root node needs two children)",
            path.display()
        )
    })?;

    let mesh = sub
        .mesh()
        .ok_or_else(|| format!("Model {}: addressed sub-node carries no mesh", path.display()))?;

    let primitive = mesh
        .primitives()
        .next()
        .ok_or_else(|| format!("Model {}: sub-mesh has no primitives", path.display()))?;

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| format!("Model {}: sub-mesh has no positions", path.display()))?
        .collect();

    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .ok_or_else(|| format!("Model {}: sub-mesh has no normals", path.display()))?
        .collect();

    if normals.len() != positions.len() {
        return Err(format!(
            "Model {}: position/normal count mismatch ({} vs {})",
            path.display(),
            positions.len(),
            normals.len()
        ));
    }

    let vertices: Vec<Vertex> = positions
        .into_iter()
        .zip(normals)
        .map(|(position, normal)| Vertex { position, normal })
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    let material = primitive.material();
    let base_color4 = material.pbr_metallic_roughness().base_color_factor();

    Ok(Prototype {
        mesh: MeshData { vertices, indices },
        base_color: [base_color4[0], base_color4[1], base_color4[2]],
        emissive: material.emissive_factor(),
    })
}
