//! Collision simplification: vertices within a merge distance collapse into one, and any
//! triangle left with two or more identical indices is dropped.

use crate::*;

pub fn simplify_collision(mesh: &CollisionMesh, merge_distance: f32) -> CollisionMesh {
	let merge_squared = merge_distance * merge_distance;

	// Greedy first-representative merge, then a remap from old to surviving indices.
	let mut kept_positions: Vec<Vec3> = Vec::with_capacity(mesh.positions.len());
	let mut remap: Vec<u32> = Vec::with_capacity(mesh.positions.len());

	for &position in &mesh.positions {
		let representative = kept_positions
			.iter()
			.position(|&kept| kept.distance_squared(position) <= merge_squared);
		match representative {
			Some(index) => remap.push(index as u32),
			None => {
				remap.push(kept_positions.len() as u32);
				kept_positions.push(position);
			}
		}
	}

	let triangles: Vec<[u32; 3]> = mesh
		.triangles
		.iter()
		.map(|&[a, b, c]| [remap[a as usize], remap[b as usize], remap[c as usize]])
		.filter(|&[a, b, c]| a != b && b != c && a != c)
		.collect();

	// Drop vertices no surviving triangle references.
	let mut used = vec![false; kept_positions.len()];
	for &[a, b, c] in &triangles {
		used[a as usize] = true;
		used[b as usize] = true;
		used[c as usize] = true;
	}
	let mut compact: Vec<u32> = vec![0; kept_positions.len()];
	let mut positions = Vec::new();
	for (index, &keep) in used.iter().enumerate() {
		if keep {
			compact[index] = positions.len() as u32;
			positions.push(kept_positions[index]);
		}
	}
	let triangles = triangles
		.into_iter()
		.map(|[a, b, c]| [compact[a as usize], compact[b as usize], compact[c as usize]])
		.collect();

	CollisionMesh { positions, triangles, convex: mesh.convex }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merges_close_vertices_and_drops_degenerates() {
		// A sliver triangle whose two near ends collapse, next to a real one.
		let mesh = CollisionMesh {
			positions: vec![
				vec3(0., 0., 0.),
				vec3(0.01, 0., 0.), // Collapses into vertex 0.
				vec3(5., 0., 0.),
				vec3(5., 5., 0.),
			],
			triangles: vec![[0, 1, 2], [0, 2, 3]],
			convex: false,
		};

		let simplified = simplify_collision(&mesh, 0.05);

		// The sliver is gone, the real triangle survives remapped.
		assert_eq!(simplified.triangles.len(), 1);
		assert_eq!(simplified.positions.len(), 3);
		assert_eq!(simplified.triangles[0], [0, 1, 2]);
	}

	#[test]
	fn far_vertices_survive() {
		let mesh = CollisionMesh {
			positions: vec![vec3(0., 0., 0.), vec3(5., 0., 0.), vec3(5., 5., 0.)],
			triangles: vec![[0, 1, 2]],
			convex: true,
		};

		let simplified = simplify_collision(&mesh, 0.05);
		assert_eq!(simplified, mesh);
	}
}
