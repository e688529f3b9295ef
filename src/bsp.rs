//! The spatial input model: the already-parsed, immutable representation of a compiled level.
//!
//! Produced by the upstream binary reader, validated once here, and consumed read-only by the
//! [`rebuild`](crate::rebuild) and [`spawn`](crate::spawn) engines.

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspPlane {
	pub normal: Vec3,
	pub dist: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BspVertex {
	pub position: Vec3,
	pub normal: Vec3,
	pub uv: Vec2,
}

/// The geometry kind of a face, which decides how its index run is triangulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumIs)]
pub enum FaceKind {
	/// A flat convex polygon, triangulated as a fan around its first vertex.
	#[default]
	Polygon,
	/// A tessellated curved patch. Arrives pre-triangulated, the index run is consecutive triples.
	Patch,
	/// An indexed triangle mesh, the index run is consecutive triples.
	Mesh,
	/// A point sprite. Carries no reconstructable geometry.
	Billboard,
}

/// A contiguous run of entries in [`BspData::indices`], referencing the shared vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspFace {
	pub kind: FaceKind,
	pub first_index: u32,
	pub index_count: u32,
	pub material: u16,
}

/// An interior binary-tree node. A negative child `c` denotes the leaf at index `-(c + 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspNode {
	pub bounds: Aabb,
	pub plane: u32,
	pub children: [i32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspLeaf {
	pub bounds: Aabb,
	pub first_face: u32,
	pub face_count: u32,
}

/// A discrete brush model: a contiguous face range with precomputed bounds.
/// Model 0 is the world, whose faces are instead reached through the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspModel {
	pub bounds: Aabb,
	pub first_face: u32,
	pub face_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BspMaterial {
	pub name: String,
	/// Materials tagged skip produce no geometry at all, rather than a blank sub-range.
	pub skip: bool,
}
impl BspMaterial {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), skip: false }
	}
	pub fn skip(name: impl Into<String>) -> Self {
		Self { name: name.into(), skip: true }
	}
}

/// The full parsed level. Immutable after [`BspData::validate`] passes.
#[derive(Debug, Clone, Default)]
pub struct BspData {
	pub planes: Vec<BspPlane>,
	pub vertices: Vec<BspVertex>,
	/// The shared mesh-index buffer faces reference runs of.
	pub indices: Vec<u32>,
	pub nodes: Vec<BspNode>,
	pub leaves: Vec<BspLeaf>,
	pub faces: Vec<BspFace>,
	pub models: Vec<BspModel>,
	pub materials: Vec<BspMaterial>,
	pub entities: MapEntities,
}

impl BspData {
	/// Checks every structural index for range validity. Called once at the start of an import;
	/// failure is fatal ([`ImportError::InvalidStructure`]).
	pub fn validate(&self) -> Result<(), ImportError> {
		let err = |msg: String| Err(ImportError::InvalidStructure(msg));

		for (i, node) in self.nodes.iter().enumerate() {
			for child in node.children {
				if child >= 0 {
					if child as usize >= self.nodes.len() {
						return err(format!("node {i} child {child} out of range ({} nodes)", self.nodes.len()));
					}
				} else if leaf_index(child) >= self.leaves.len() {
					return err(format!("node {i} child leaf {} out of range ({} leaves)", leaf_index(child), self.leaves.len()));
				}
			}
		}

		// Sums widen to u64 so a range near u32::MAX can't wrap past the check.
		for (i, leaf) in self.leaves.iter().enumerate() {
			if leaf.first_face as u64 + leaf.face_count as u64 > self.faces.len() as u64 {
				return err(format!("leaf {i} face range out of range ({} faces)", self.faces.len()));
			}
		}
		for (i, model) in self.models.iter().enumerate() {
			if model.first_face as u64 + model.face_count as u64 > self.faces.len() as u64 {
				return err(format!("model {i} face range out of range ({} faces)", self.faces.len()));
			}
		}

		for (i, face) in self.faces.iter().enumerate() {
			if face.first_index as u64 + face.index_count as u64 > self.indices.len() as u64 {
				return err(format!("face {i} index range out of range ({} indices)", self.indices.len()));
			}
			if face.material as usize >= self.materials.len() {
				return err(format!("face {i} material {} out of range ({} materials)", face.material, self.materials.len()));
			}
		}

		if let Some(&index) = self.indices.iter().find(|&&index| index as usize >= self.vertices.len()) {
			return err(format!("mesh index {index} out of range ({} vertices)", self.vertices.len()));
		}

		Ok(())
	}

	/// The base-vertex triangles of a face, following its [`FaceKind`].
	/// Billboards yield nothing.
	pub fn face_triangles(&self, face_idx: u32) -> Vec<[u32; 3]> {
		let face = &self.faces[face_idx as usize];
		let run = &self.indices[face.first_index as usize..(face.first_index + face.index_count) as usize];

		match face.kind {
			FaceKind::Polygon => {
				if run.len() < 3 {
					return Vec::new();
				}
				(1..run.len() - 1).map(|i| [run[0], run[i], run[i + 1]]).collect()
			}
			FaceKind::Patch | FaceKind::Mesh => run.chunks_exact(3).map(|tri| [tri[0], tri[1], tri[2]]).collect(),
			FaceKind::Billboard => Vec::new(),
		}
	}

	/// Aggregate surface area of a face in source units.
	pub fn face_area(&self, face_idx: u32) -> f32 {
		self.face_triangles(face_idx)
			.into_iter()
			.map(|[a, b, c]| {
				let a = self.vertices[a as usize].position;
				let b = self.vertices[b as usize].position;
				let c = self.vertices[c as usize].position;
				(b - a).cross(c - a).length() / 2.
			})
			.sum()
	}
}

/// Decodes a negative tree-child reference into a leaf index.
#[inline]
pub fn leaf_index(child: i32) -> usize {
	debug_assert!(child < 0);
	(-(child + 1)) as usize
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn leaf_encoding() {
		assert_eq!(leaf_index(-1), 0);
		assert_eq!(leaf_index(-5), 4);
	}

	#[test]
	fn polygon_fan_triangulation() {
		let mut data = BspData::default();
		data.vertices = (0..4)
			.map(|i| BspVertex {
				position: vec3(i as f32, 0., 0.),
				..Default::default()
			})
			.collect();
		data.indices = vec![0, 1, 2, 3];
		data.materials = vec![BspMaterial::new("base")];
		data.faces = vec![BspFace {
			kind: FaceKind::Polygon,
			first_index: 0,
			index_count: 4,
			material: 0,
		}];

		assert_eq!(data.face_triangles(0), vec![[0, 1, 2], [0, 2, 3]]);
	}

	#[test]
	fn face_area_of_unit_quad() {
		let mut data = BspData::default();
		data.vertices = [vec3(0., 0., 0.), vec3(1., 0., 0.), vec3(1., 1., 0.), vec3(0., 1., 0.)]
			.into_iter()
			.map(|position| BspVertex { position, ..Default::default() })
			.collect();
		data.indices = vec![0, 1, 2, 3];
		data.materials = vec![BspMaterial::new("base")];
		data.faces = vec![BspFace {
			kind: FaceKind::Polygon,
			first_index: 0,
			index_count: 4,
			material: 0,
		}];

		assert!(data.face_area(0).almost_eq(1., 1e-6));
	}

	#[test]
	fn validate_catches_bad_indices() {
		let mut data = BspData::default();
		data.vertices = vec![BspVertex::default()];
		data.indices = vec![3];
		assert!(matches!(data.validate(), Err(ImportError::InvalidStructure(_))));
	}

	#[test]
	fn validate_catches_wrapping_ranges() {
		// first_index + index_count wraps u32 to 1, which would slip under the length check.
		let mut data = BspData::default();
		data.vertices = vec![BspVertex::default()];
		data.indices = vec![0, 0];
		data.materials = vec![BspMaterial::new("base")];
		data.faces = vec![BspFace {
			kind: FaceKind::Polygon,
			first_index: u32::MAX,
			index_count: 2,
			material: 0,
		}];
		assert!(matches!(data.validate(), Err(ImportError::InvalidStructure(_))));

		let mut data = BspData::default();
		data.vertices = vec![BspVertex::default()];
		data.indices = vec![0, 0, 0];
		data.materials = vec![BspMaterial::new("base")];
		data.faces = vec![
			BspFace { kind: FaceKind::Polygon, first_index: 0, index_count: 3, material: 0 },
			BspFace { kind: FaceKind::Polygon, first_index: 0, index_count: 3, material: 0 },
		];
		data.leaves = vec![BspLeaf { bounds: Aabb::ZERO, first_face: u32::MAX, face_count: 2 }];
		assert!(matches!(data.validate(), Err(ImportError::InvalidStructure(_))));
	}
}
