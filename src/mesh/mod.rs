//! Reconstructed geometry: the render mesh produced by the rebuild engine and its optional
//! collision companion.

pub mod lightmap_uv;
pub mod simplify;
pub mod smoothing;

use crate::*;

/// Triangle indices of one mesh section. 16-bit unless any section of the owning mesh would
/// exceed `u16::MAX` indices, in which case the whole mesh switches to 32-bit.
#[derive(Debug, Clone, PartialEq)]
pub enum Indices {
	U16(Vec<u16>),
	U32(Vec<u32>),
}

impl Indices {
	pub fn pack(indices: Vec<u32>, wide: bool) -> Self {
		if wide {
			Self::U32(indices)
		} else {
			Self::U16(indices.into_iter().map(|i| i as u16).collect())
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::U16(v) => v.len(),
			Self::U32(v) => v.len(),
		}
	}
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn iter_u32(&self) -> Box<dyn Iterator<Item = u32> + '_> {
		match self {
			Self::U16(v) => Box::new(v.iter().map(|&i| i as u32)),
			Self::U32(v) => Box::new(v.iter().copied()),
		}
	}
}

/// The triangles of one material within a [`ReconstructedMesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSection {
	pub material: u16,
	pub indices: Indices,
}

/// A renderable mesh: one shared vertex buffer with per-material index sections.
/// Section indices always reference this mesh's own vertex buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructedMesh {
	pub positions: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	/// Second UV channel for baked lighting, present when lightmap generation ran.
	pub uv2: Option<Vec<Vec2>>,
	pub sections: Vec<MeshSection>,
}

impl ReconstructedMesh {
	pub fn vertex_count(&self) -> usize {
		self.positions.len()
	}

	pub fn triangle_count(&self) -> usize {
		self.sections.iter().map(|section| section.indices.len() / 3).sum()
	}

	/// A mesh with no triangles at all is degenerate and gets discarded by callers.
	pub fn is_degenerate(&self) -> bool {
		self.triangle_count() == 0 || self.bounds().extents().max_element() < 1e-6
	}

	pub fn bounds(&self) -> Aabb {
		let mut positions = self.positions.iter();
		let Some(&first) = positions.next() else { return Aabb::ZERO };
		let mut bounds = Aabb::from_min_max(first, first);
		for &position in positions {
			bounds.expand(position);
		}
		bounds
	}

	/// All triangles across sections, in section order.
	pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
		self.sections.iter().flat_map(|section| {
			let indices: Vec<u32> = section.indices.iter_u32().collect();
			indices.chunks_exact(3).map(|tri| [tri[0], tri[1], tri[2]]).collect::<Vec<_>>()
		})
	}
}

/// The collision companion of a render mesh, either a direct copy or a simplified one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionMesh {
	pub positions: Vec<Vec3>,
	pub triangles: Vec<[u32; 3]>,
	/// Convex volumes (triggers, liquids) test containment instead of surface contact.
	pub convex: bool,
}

impl CollisionMesh {
	/// A direct copy of the render mesh's geometry.
	pub fn from_render(mesh: &ReconstructedMesh) -> Self {
		Self {
			positions: mesh.positions.clone(),
			triangles: mesh.triangles().collect(),
			convex: false,
		}
	}
}
