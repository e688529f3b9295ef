//! Second UV channel for baked lighting: each triangle is planar-projected along its
//! dominant normal axis into a chart, and charts are shelf-packed into the unit square
//! with a configurable margin. Welded vertices are split per chart, so no two charts
//! ever share a vertex's coordinates.

use float_ord::FloatOrd;

use crate::*;

/// Texel resolution the packing margin is expressed in.
const ATLAS_TEXELS: f32 = 1024.;

struct Chart {
	/// The section the triangle came from.
	section: usize,
	/// Indices of the triangle's three vertices in the original mesh buffer.
	vertices: [u32; 3],
	/// Projected 2D coordinates, offset to a (0, 0) chart origin.
	projected: [Vec2; 3],
	size: Vec2,
}

pub fn generate_lightmap_uvs(mesh: &mut ReconstructedMesh, pack_margin: f32, bounds_inflation: f32) {
	let mut charts: Vec<Chart> = Vec::new();

	for (section_index, section) in mesh.sections.iter().enumerate() {
		let indices: Vec<u32> = section.indices.iter_u32().collect();
		for tri in indices.chunks_exact(3) {
			let [a, b, c] = [tri[0], tri[1], tri[2]];
			let pa = mesh.positions[a as usize];
			let pb = mesh.positions[b as usize];
			let pc = mesh.positions[c as usize];

			let normal = (pb - pa).cross(pc - pa);
			let projected_3d = [pa, pb, pc].map(|p| project_dominant(p, normal));

			let mut min = projected_3d[0].min(projected_3d[1]).min(projected_3d[2]);
			min -= Vec2::splat(bounds_inflation);
			let max = projected_3d[0].max(projected_3d[1]).max(projected_3d[2]) + Vec2::splat(bounds_inflation);
			let size = (max - min).max(Vec2::splat(1e-5));

			charts.push(Chart {
				section: section_index,
				vertices: [a, b, c],
				projected: projected_3d.map(|p| p - min),
				size,
			});
		}
	}

	if charts.is_empty() {
		return;
	}

	// Shelf packing: tallest charts first, rows filled left to right.
	let margin = pack_margin / ATLAS_TEXELS * charts.iter().map(|c| FloatOrd(c.size.max_element())).max().map(|m| m.0).unwrap_or(1.);
	let total_area: f32 = charts.iter().map(|c| (c.size.x + margin) * (c.size.y + margin)).sum();
	let shelf_width = total_area.sqrt() * 1.2;

	let mut order: Vec<usize> = (0..charts.len()).collect();
	order.sort_by_key(|&i| std::cmp::Reverse(FloatOrd(charts[i].size.y)));

	let mut offsets = vec![Vec2::ZERO; charts.len()];
	let mut cursor = Vec2::ZERO;
	let mut shelf_height = 0_f32;
	let mut extent = Vec2::ZERO;

	for &index in &order {
		let size = charts[index].size;
		if cursor.x > 0. && cursor.x + size.x > shelf_width {
			cursor.x = 0.;
			cursor.y += shelf_height + margin;
			shelf_height = 0.;
		}
		offsets[index] = cursor;
		shelf_height = shelf_height.max(size.y);
		extent = extent.max(cursor + size);
		cursor.x += size.x + margin;
	}

	// Rebuild the vertex buffers with one vertex per chart corner. Welding stays intact
	// for positions/normals, but the buffer is no longer shared across charts.
	let scale = 1. / extent.max_element().max(1e-5);
	let corner_count = charts.len() * 3;
	let mut positions = Vec::with_capacity(corner_count);
	let mut normals = Vec::with_capacity(corner_count);
	let mut uvs = Vec::with_capacity(corner_count);
	let mut uv2 = Vec::with_capacity(corner_count);
	let mut section_indices: Vec<Vec<u32>> = vec![Vec::new(); mesh.sections.len()];

	for (chart, offset) in charts.iter().zip(&offsets) {
		for (&vertex, &projected) in chart.vertices.iter().zip(&chart.projected) {
			section_indices[chart.section].push(positions.len() as u32);
			positions.push(mesh.positions[vertex as usize]);
			normals.push(mesh.normals[vertex as usize]);
			uvs.push(mesh.uvs[vertex as usize]);
			uv2.push((*offset + projected) * scale);
		}
	}

	let wide = positions.len() > u16::MAX as usize + 1
		|| section_indices.iter().any(|indices| indices.len() > u16::MAX as usize);
	mesh.positions = positions;
	mesh.normals = normals;
	mesh.uvs = uvs;
	mesh.uv2 = Some(uv2);
	for (section, indices) in mesh.sections.iter_mut().zip(section_indices) {
		section.indices = Indices::pack(indices, wide);
	}
}

/// Drops the dominant axis of `normal`, projecting onto the remaining plane.
fn project_dominant(point: Vec3, normal: Vec3) -> Vec2 {
	let abs = normal.abs();
	if abs.z >= abs.x && abs.z >= abs.y {
		vec2(point.x, point.y)
	} else if abs.x >= abs.y {
		vec2(point.y, point.z)
	} else {
		vec2(point.x, point.z)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn quad_mesh() -> ReconstructedMesh {
		ReconstructedMesh {
			positions: vec![vec3(0., 0., 0.), vec3(2., 0., 0.), vec3(2., 2., 0.), vec3(0., 2., 0.)],
			normals: vec![Vec3::Z; 4],
			uvs: vec![Vec2::ZERO; 4],
			uv2: None,
			sections: vec![MeshSection {
				material: 0,
				indices: Indices::U16(vec![0, 1, 2, 0, 2, 3]),
			}],
		}
	}

	#[test]
	fn uvs_land_in_unit_square() {
		let mut mesh = quad_mesh();
		generate_lightmap_uvs(&mut mesh, 2., 0.);

		let uv2 = mesh.uv2.as_ref().unwrap();
		assert_eq!(uv2.len(), mesh.vertex_count());
		for uv in uv2 {
			assert!(uv.x >= 0. && uv.x <= 1., "{uv:?}");
			assert!(uv.y >= 0. && uv.y <= 1., "{uv:?}");
		}
	}

	#[test]
	fn empty_mesh_gets_no_channel() {
		let mut mesh = ReconstructedMesh::default();
		generate_lightmap_uvs(&mut mesh, 2., 0.);
		assert!(mesh.uv2.is_none());
	}

	#[test]
	fn welded_triangles_get_disjoint_charts() {
		let mut mesh = quad_mesh();
		generate_lightmap_uvs(&mut mesh, 2., 0.);

		// The two triangles share an edge in the welded input; each gets its own corners.
		assert_eq!(mesh.vertex_count(), 6);
		assert_eq!(mesh.triangle_count(), 2);
		assert_eq!(mesh.positions.iter().filter(|&&p| p == vec3(0., 0., 0.)).count(), 2);
		assert_eq!(mesh.positions.iter().filter(|&&p| p == vec3(2., 0., 0.)).count(), 1);

		// Neither chart's rectangle intrudes into the other.
		let uv2 = mesh.uv2.as_ref().unwrap();
		let boxes: Vec<(Vec2, Vec2)> = mesh
			.triangles()
			.map(|tri| {
				let coords = tri.map(|v| uv2[v as usize]);
				(coords[0].min(coords[1]).min(coords[2]), coords[0].max(coords[1]).max(coords[2]))
			})
			.collect();
		let (a_min, a_max) = boxes[0];
		let (b_min, b_max) = boxes[1];
		let separated = a_max.x <= b_min.x || b_max.x <= a_min.x || a_max.y <= b_min.y || b_max.y <= a_min.y;
		assert!(separated, "chart rectangles overlap: {boxes:?}");
	}

	#[test]
	fn dominant_axis_projection() {
		assert_eq!(project_dominant(vec3(1., 2., 3.), Vec3::Z), vec2(1., 2.));
		assert_eq!(project_dominant(vec3(1., 2., 3.), Vec3::X), vec2(2., 3.));
		assert_eq!(project_dominant(vec3(1., 2., 3.), Vec3::Y), vec2(1., 3.));
	}
}
