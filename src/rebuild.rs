//! The mesh reconstruction engine: walks the spatial tree, decides where to cut meshes by
//! surface-area budget, and turns face runs into welded, sectioned render meshes with
//! optional smoothing, collision, and lightmap UVs.

use std::collections::BTreeMap;

use crate::*;

/// Where face collection starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeLocation {
	Node(usize),
	Leaf(usize),
	Model(usize),
}

pub struct MeshRebuilder<'a> {
	data: &'a BspData,
	config: &'a ImportConfig,
	mesh_counter: usize,
}

impl<'a> MeshRebuilder<'a> {
	pub fn new(data: &'a BspData, config: &'a ImportConfig) -> Self {
		Self { data, config, mesh_counter: 0 }
	}

	/// All face indices reachable from `location`. A node's set is exactly the union of its
	/// two children's sets.
	pub fn collect_faces(&self, location: TreeLocation) -> Vec<u32> {
		let mut faces = Vec::new();
		match location {
			TreeLocation::Node(node) => self.collect_node_faces(node, &mut faces),
			TreeLocation::Leaf(leaf) => self.collect_leaf_faces(leaf, &mut faces),
			TreeLocation::Model(model) => {
				let model = &self.data.models[model];
				faces.extend(model.first_face..model.first_face + model.face_count);
			}
		}
		faces
	}

	fn collect_node_faces(&self, node: usize, out: &mut Vec<u32>) {
		for child in self.data.nodes[node].children {
			if child >= 0 {
				self.collect_node_faces(child as usize, out);
			} else {
				self.collect_leaf_faces(leaf_index(child), out);
			}
		}
	}

	fn collect_leaf_faces(&self, leaf: usize, out: &mut Vec<u32>) {
		let leaf = &self.data.leaves[leaf];
		out.extend(leaf.first_face..leaf.first_face + leaf.face_count);
	}

	fn area_of(&self, faces: &[u32]) -> f32 {
		faces.iter().map(|&face| self.data.face_area(face)).sum()
	}

	/// Builds the world geometry under `parent`, recursing wherever a subtree's aggregate
	/// face area exceeds the budget. Returns the number of meshes emitted.
	pub fn build_world(&mut self, scene: &mut SceneGraph, parent: NodeId) -> usize {
		let mut emitted = 0;
		if self.data.nodes.is_empty() {
			// Flat data: every leaf in one mesh.
			let faces: Vec<u32> = (0..self.data.leaves.len())
				.flat_map(|leaf| self.collect_faces(TreeLocation::Leaf(leaf)))
				.collect();
			self.emit_world_mesh(scene, parent, &faces, &mut emitted);
			return emitted;
		}
		self.build_world_node(scene, parent, 0, &mut emitted);
		emitted
	}

	fn build_world_node(&mut self, scene: &mut SceneGraph, parent: NodeId, node: usize, emitted: &mut usize) {
		let faces = self.collect_faces(TreeLocation::Node(node));
		if !self.config.subdivide_to_leaves && self.area_of(&faces) <= self.config.max_mesh_area {
			self.emit_world_mesh(scene, parent, &faces, emitted);
			return;
		}

		for child in self.data.nodes[node].children {
			if child >= 0 {
				self.build_world_node(scene, parent, child as usize, emitted);
			} else {
				let faces = self.collect_faces(TreeLocation::Leaf(leaf_index(child)));
				self.emit_world_mesh(scene, parent, &faces, emitted);
			}
		}
	}

	fn emit_world_mesh(&mut self, scene: &mut SceneGraph, parent: NodeId, faces: &[u32], emitted: &mut usize) {
		let Some(mut mesh) = self.build_mesh(faces, Vec3::ZERO) else { return };
		if mesh.is_degenerate() {
			return;
		}
		let collider = self.post_process(&mut mesh, true);

		let name = format!("world_mesh_{}", self.mesh_counter);
		self.mesh_counter += 1;
		let node = scene.spawn_child(parent, name);
		scene.node_mut(node).mesh = Some(mesh);
		scene.node_mut(node).collider = collider;
		*emitted += 1;
	}

	/// Builds a brush entity's discrete model, re-centered on its bounds midpoint. The
	/// returned offset is the scene-space center the owning node should be placed at.
	/// A degenerate result is a discard, logged by the caller.
	pub fn build_model(&mut self, model_index: usize) -> Option<(ReconstructedMesh, CollisionMesh, Vec3)> {
		let model = self.data.models.get(model_index)?;
		let center = model.bounds.center();

		let faces = self.collect_faces(TreeLocation::Model(model_index));
		let mut mesh = self.build_mesh(&faces, center)?;
		if mesh.is_degenerate() {
			return None;
		}
		let collider = self.post_process(&mut mesh, false)?;
		Some((mesh, collider, self.config.to_scene_space(center)))
	}

	/// The face-run to mesh core: vertex welding keyed by base vertex index, origin
	/// subtraction, per-material sections, skip-material drop, index-width selection.
	/// Zero faces is "nothing to build".
	pub fn build_mesh(&self, face_indices: &[u32], origin: Vec3) -> Option<ReconstructedMesh> {
		if face_indices.is_empty() {
			return None;
		}

		let mut mesh = ReconstructedMesh::default();
		// Base vertex index to local vertex, so each base vertex lands in the buffer once.
		let mut local_of: HashMap<u32, u32> = HashMap::new();
		let mut sections: BTreeMap<u16, Vec<u32>> = BTreeMap::new();

		for &face_index in face_indices {
			let face = &self.data.faces[face_index as usize];
			let material = &self.data.materials[face.material as usize];
			if material.skip || self.config.skip_materials.contains(&material.name) {
				continue;
			}

			let section = sections.entry(face.material).or_default();
			for triangle in self.data.face_triangles(face_index) {
				for base in triangle {
					let local = *local_of.entry(base).or_insert_with(|| {
						let vertex = &self.data.vertices[base as usize];
						mesh.positions.push(self.config.to_scene_space(vertex.position - origin));
						mesh.normals.push(vertex.normal.z_up_to_y_up());
						mesh.uvs.push(vertex.uv);
						(mesh.positions.len() - 1) as u32
					});
					section.push(local);
				}
			}
		}

		// Welded vertex indices can exceed u16 even when every section's index list is short.
		let wide = mesh.positions.len() > u16::MAX as usize + 1
			|| sections.values().any(|indices| indices.len() > u16::MAX as usize);
		mesh.sections = sections
			.into_iter()
			.filter(|(_, indices)| !indices.is_empty())
			.map(|(material, indices)| MeshSection {
				material,
				indices: Indices::pack(indices, wide),
			})
			.collect();

		Some(mesh)
	}

	/// Smoothing, collision, and lightmap UVs, per config. Returns the collision mesh for a
	/// non-degenerate input.
	fn post_process(&self, mesh: &mut ReconstructedMesh, static_mesh: bool) -> Option<CollisionMesh> {
		mesh::smoothing::smooth_by_angle(mesh, self.config.weld_position_epsilon, self.config.normal_smooth_threshold);

		if mesh.is_degenerate() {
			return None;
		}

		let mut collider = CollisionMesh::from_render(mesh);
		if self.config.simplify_collision {
			collider = mesh::simplify::simplify_collision(&collider, self.config.collision_simplify_distance);
		}

		if static_mesh && self.config.generate_lightmap_uvs {
			mesh::lightmap_uv::generate_lightmap_uvs(mesh, self.config.lightmap_pack_margin, self.config.lightmap_bounds_inflation);
		}

		Some(collider)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	/// A root node over two leaves holding one unit quad each, side by side.
	pub(crate) fn two_leaf_world() -> BspData {
		let mut data = BspData::default();

		let quad = |offset: Vec3| -> Vec<BspVertex> {
			[vec3(0., 0., 0.), vec3(32., 0., 0.), vec3(32., 32., 0.), vec3(0., 32., 0.)]
				.into_iter()
				.map(|corner| BspVertex {
					position: corner + offset,
					normal: Vec3::Z,
					uv: Vec2::ZERO,
				})
				.collect()
		};
		data.vertices = quad(Vec3::ZERO).into_iter().chain(quad(vec3(64., 0., 0.))).collect();
		data.indices = vec![0, 1, 2, 3, 4, 5, 6, 7];
		data.materials = vec![BspMaterial::new("base")];
		data.faces = vec![
			BspFace { kind: FaceKind::Polygon, first_index: 0, index_count: 4, material: 0 },
			BspFace { kind: FaceKind::Polygon, first_index: 4, index_count: 4, material: 0 },
		];
		data.leaves = vec![
			BspLeaf { bounds: Aabb::ZERO, first_face: 0, face_count: 1 },
			BspLeaf { bounds: Aabb::ZERO, first_face: 1, face_count: 1 },
		];
		data.nodes = vec![BspNode {
			bounds: Aabb::ZERO,
			plane: 0,
			children: [-1, -2],
		}];
		data.entities = MapEntities::from_key_values([[("classname".to_string(), "worldspawn".to_string())].into_iter().collect::<HashMap<_, _>>()]);
		data.validate().unwrap();
		data
	}

	#[test]
	fn node_faces_partition_into_children() {
		let data = two_leaf_world();
		let config = ImportConfig::default();
		let rebuilder = MeshRebuilder::new(&data, &config);

		let root: HashSet<u32> = rebuilder.collect_faces(TreeLocation::Node(0)).into_iter().collect();
		let left: HashSet<u32> = rebuilder.collect_faces(TreeLocation::Leaf(0)).into_iter().collect();
		let right: HashSet<u32> = rebuilder.collect_faces(TreeLocation::Leaf(1)).into_iter().collect();

		assert_eq!(root, left.union(&right).copied().collect());
		assert!(left.is_disjoint(&right));
		assert_eq!(root.len(), left.len() + right.len());
	}

	#[test]
	fn welding_is_idempotent() {
		let data = two_leaf_world();
		let config = ImportConfig::default();
		let rebuilder = MeshRebuilder::new(&data, &config);
		let faces = rebuilder.collect_faces(TreeLocation::Node(0));

		let first = rebuilder.build_mesh(&faces, Vec3::ZERO).unwrap();
		let second = rebuilder.build_mesh(&faces, Vec3::ZERO).unwrap();

		assert_eq!(first.vertex_count(), second.vertex_count());
		assert_eq!(first.triangle_count(), second.triangle_count());
		// Each quad's 4 base vertices weld to exactly 4 local vertices.
		assert_eq!(first.vertex_count(), 8);
	}

	#[test]
	fn area_budget_controls_subdivision() {
		let data = two_leaf_world();

		// Both quads fit the default budget: one mesh.
		let config = ImportConfig::default();
		let mut scene = SceneGraph::new();
		let root = scene.spawn("world");
		assert_eq!(MeshRebuilder::new(&data, &config).build_world(&mut scene, root), 1);
		assert_eq!(scene.node(scene.node(root).children[0]).name, "world_mesh_0");

		// A budget below one quad's area (32x32) forces recursion into both leaves.
		let config = ImportConfig::default().max_mesh_area(512.);
		let mut scene = SceneGraph::new();
		let root = scene.spawn("world");
		assert_eq!(MeshRebuilder::new(&data, &config).build_world(&mut scene, root), 2);

		// So does the explicit flag, budget notwithstanding.
		let config = ImportConfig::default().subdivide_to_leaves(true);
		let mut scene = SceneGraph::new();
		let root = scene.spawn("world");
		assert_eq!(MeshRebuilder::new(&data, &config).build_world(&mut scene, root), 2);
	}

	#[test]
	fn skip_materials_emit_no_sections() {
		let mut data = two_leaf_world();
		data.materials.push(BspMaterial::skip("clip"));
		data.faces[1].material = 1;

		let config = ImportConfig::default();
		let rebuilder = MeshRebuilder::new(&data, &config);
		let faces = rebuilder.collect_faces(TreeLocation::Node(0));
		let mesh = rebuilder.build_mesh(&faces, Vec3::ZERO).unwrap();

		assert_eq!(mesh.sections.len(), 1);
		assert_eq!(mesh.sections[0].material, 0);
		// Skipped faces contribute no vertices either.
		assert_eq!(mesh.vertex_count(), 4);
	}

	#[test]
	fn named_skip_materials_from_config() {
		let mut data = two_leaf_world();
		data.materials[0].name = "__TB_empty".to_string();

		let config = ImportConfig::default();
		let rebuilder = MeshRebuilder::new(&data, &config);
		let faces = rebuilder.collect_faces(TreeLocation::Node(0));
		let mesh = rebuilder.build_mesh(&faces, Vec3::ZERO).unwrap();
		assert!(mesh.is_degenerate());
	}

	#[test]
	fn large_vertex_buffers_switch_to_wide_indices() {
		// 17k quads split over two materials: each section stays under u16::MAX indices,
		// but the shared vertex buffer holds 68k vertices.
		let quad_count = 17_000_u32;
		let mut data = BspData::default();
		data.vertices = (0..quad_count * 4)
			.map(|i| BspVertex {
				position: vec3((i % 4) as f32, ((i % 4) / 2) as f32, 0.),
				normal: Vec3::Z,
				uv: Vec2::ZERO,
			})
			.collect();
		data.indices = (0..quad_count * 4).collect();
		data.materials = vec![BspMaterial::new("a"), BspMaterial::new("b")];
		data.faces = (0..quad_count)
			.map(|i| BspFace {
				kind: FaceKind::Polygon,
				first_index: i * 4,
				index_count: 4,
				material: (i % 2) as u16,
			})
			.collect();

		let config = ImportConfig::default();
		let rebuilder = MeshRebuilder::new(&data, &config);
		let faces: Vec<u32> = (0..quad_count).collect();
		let mesh = rebuilder.build_mesh(&faces, Vec3::ZERO).unwrap();

		assert_eq!(mesh.vertex_count(), quad_count as usize * 4);
		for section in &mesh.sections {
			assert!(section.indices.len() < u16::MAX as usize);
			assert!(matches!(section.indices, Indices::U32(_)));
		}
		// The highest index survives intact rather than wrapping through u16.
		let max_index = mesh.sections.iter().flat_map(|section| section.indices.iter_u32()).max().unwrap();
		assert_eq!(max_index, quad_count * 4 - 1);
	}

	#[test]
	fn model_build_recenters() {
		let mut data = two_leaf_world();
		data.models = vec![BspModel {
			bounds: Aabb::from_min_max(vec3(64., 0., 0.), vec3(96., 32., 0.)),
			first_face: 1,
			face_count: 1,
		}];

		let config = ImportConfig::default();
		let mut rebuilder = MeshRebuilder::new(&data, &config);
		let (mesh, collider, center) = rebuilder.build_model(0).unwrap();

		// Centered geometry straddles the origin.
		let bounds = mesh.bounds();
		assert_almost_eq!(bounds.center(), Vec3::ZERO, 1e-5);
		assert!(!collider.triangles.is_empty());
		assert_almost_eq!(center, config.to_scene_space(vec3(80., 16., 0.)), 1e-5);
	}
}
