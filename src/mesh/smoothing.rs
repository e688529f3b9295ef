//! Normal smoothing: coincident vertices with near-parallel normals get their positions
//! merged and normals averaged, smoothing curved surfaces that welding left split along
//! face boundaries. Vertex count and triangle indices are never changed.

use disjoint_sets::UnionFind;

use crate::*;

/// Pairwise pass over the mesh's vertices, O(n²) but bounded by the per-mesh surface-area
/// budget. `angle_threshold <= 0` disables smoothing entirely.
pub fn smooth_by_angle(mesh: &mut ReconstructedMesh, position_epsilon: f32, angle_threshold: f32) {
	if angle_threshold <= 0. {
		return;
	}

	let vertex_count = mesh.vertex_count();
	let epsilon_squared = position_epsilon * position_epsilon;
	let mut groups = UnionFind::<usize>::new(vertex_count);

	for (a, b) in (0..vertex_count).tuple_combinations() {
		if mesh.positions[a].distance_squared(mesh.positions[b]) > epsilon_squared {
			continue;
		}
		if mesh.normals[a].angle_between(mesh.normals[b]) > angle_threshold {
			continue;
		}
		groups.union(a, b);
	}

	// Accumulate per-group sums, then write the shared average back to every member.
	let mut sums: HashMap<usize, (Vec3, Vec3, u32)> = HashMap::new();
	for vertex in 0..vertex_count {
		let (position_sum, normal_sum, count) = sums.entry(groups.find(vertex)).or_default();
		*position_sum += mesh.positions[vertex];
		*normal_sum += mesh.normals[vertex];
		*count += 1;
	}

	for vertex in 0..vertex_count {
		let (position_sum, normal_sum, count) = sums[&groups.find(vertex)];
		if count < 2 {
			continue;
		}
		mesh.positions[vertex] = position_sum / count as f32;
		mesh.normals[vertex] = normal_sum.normalize_or_zero();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::f32::consts::FRAC_PI_4;

	/// Two quads meeting at an edge, folded 45°, with duplicated vertices along the seam.
	fn folded_mesh() -> ReconstructedMesh {
		let up = Vec3::Z;
		let slanted = vec3(0., 1., 1.).normalize();
		ReconstructedMesh {
			positions: vec![
				vec3(0., 0., 0.),
				vec3(1., 0., 0.),
				vec3(1., 1., 0.),
				vec3(0., 1., 0.),
				// Seam duplicates of vertices 2 and 3.
				vec3(1., 1., 0.),
				vec3(0., 1., 0.),
				vec3(1., 2., 1.),
				vec3(0., 2., 1.),
			],
			normals: vec![up, up, up, up, slanted, slanted, slanted, slanted],
			uvs: vec![Vec2::ZERO; 8],
			uv2: None,
			sections: vec![MeshSection {
				material: 0,
				indices: Indices::U16(vec![0, 1, 2, 0, 2, 3, 5, 4, 6, 5, 6, 7]),
			}],
		}
	}

	#[test]
	fn merges_seam_normals_within_threshold() {
		let mut mesh = folded_mesh();
		let before_indices: Vec<u32> = mesh.sections[0].indices.iter_u32().collect();

		// 45° fold: the seam normals differ by exactly FRAC_PI_4, so a slightly larger
		// threshold merges them.
		smooth_by_angle(&mut mesh, 1e-3, FRAC_PI_4 + 0.01);

		assert_eq!(mesh.vertex_count(), 8);
		assert_eq!(mesh.sections[0].indices.iter_u32().collect::<Vec<_>>(), before_indices);
		assert_eq!(mesh.normals[2], mesh.normals[4]);
		assert_eq!(mesh.positions[3], mesh.positions[5]);
		// Non-seam vertices are untouched.
		assert_eq!(mesh.normals[0], Vec3::Z);
	}

	#[test]
	fn respects_angle_threshold() {
		let mut mesh = folded_mesh();
		smooth_by_angle(&mut mesh, 1e-3, FRAC_PI_4 - 0.01);
		// Too sharp to smooth: the seam stays split.
		assert_eq!(mesh.normals[2], Vec3::Z);
		assert_ne!(mesh.normals[2], mesh.normals[4]);
	}

	#[test]
	fn disabled_when_threshold_nonpositive() {
		let mut mesh = folded_mesh();
		let before = mesh.clone();
		smooth_by_angle(&mut mesh, 1e-3, 0.);
		assert_eq!(mesh, before);
	}
}
