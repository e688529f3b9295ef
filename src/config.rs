//! The main configuration structure of an import/export session.

use crate::*;

/// The naming convention applied to a field descriptor's own name before it is looked up on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingConvention {
	/// Rust field names pass through unchanged.
	#[default]
	SnakeCase,
	/// Separators are stripped and everything lowercased, for editors that flatten keys.
	LowerCase,
}
impl NamingConvention {
	pub fn apply(&self, name: &str) -> String {
		match self {
			Self::SnakeCase => to_snake_case(name),
			Self::LowerCase => to_snake_case(name).replace('_', ""),
		}
	}
}

/// The main configuration structure of `bsp_scene`. One of these is in effect per import or
/// schema-export session.
#[derive(Debug, Clone, SmartDefault)]
pub struct ImportConfig {
	/// How many source units take up 1 unit in the scene. (Default: ~40, 1 unit = 1 inch)
	#[default(39.37008)]
	pub scale: f32,

	/// Maximum aggregate face surface area (in source units²) a single world mesh may hold before
	/// the reconstruction engine subdivides into the tree's children instead. (Default: 1024²)
	#[default(1024. * 1024.)]
	pub max_mesh_area: f32,

	/// If set, world reconstruction always recurses down to individual leaves, ignoring
	/// [`max_mesh_area`](Self::max_mesh_area). (Default: false)
	pub subdivide_to_leaves: bool,

	/// Any coincident vertices whose normals differ by less than this angle in radians get their
	/// positions merged and normals interpolated, creating smoother curved surfaces.
	/// `<= 0` disables smoothing. (Default: FRAC_PI_4)
	#[default(FRAC_PI_4)]
	pub normal_smooth_threshold: f32,

	/// Two vertices count as coincident for smoothing when within this distance in scene units. (Default: 1e-3)
	#[default(1e-3)]
	pub weld_position_epsilon: f32,

	/// Whether collision meshes are reduced before being attached. (Default: true)
	#[default(true)]
	pub simplify_collision: bool,

	/// Vertex merge distance in scene units for collision simplification. Deliberately larger than
	/// [`weld_position_epsilon`](Self::weld_position_epsilon). (Default: 0.05)
	#[default(0.05)]
	pub collision_simplify_distance: f32,

	/// Whether static world meshes get a second UV channel for baked lighting. (Default: false)
	pub generate_lightmap_uvs: bool,

	/// Packing margin between lightmap charts, in texels of a 1024 texel atlas. (Default: 2.0)
	#[default(2.)]
	pub lightmap_pack_margin: f32,

	/// Artificial bounds inflation applied when packing lightmap charts, working around tight
	/// chart bleed. (Default: 0.0)
	pub lightmap_bounds_inflation: f32,

	/// Set of material names to skip meshes of on load. (Default: `["clip", "skip", "__TB_empty"]`)
	#[default(["clip".to_string(), "skip".to_string(), "__TB_empty".to_string()].into())]
	pub skip_materials: HashSet<String>,

	/// The key that gives an entity a cross-referenceable name for parenting/targeting. (Default: "targetname")
	#[default("targetname".to_string())]
	pub identity_key: String,

	/// The substring convention marking object-reference keys. (Default: "target")
	#[default("target".to_string())]
	pub target_key_substring: String,

	/// Prefix marking editor-only metadata keys (group/layer/id). Such keys are never exposed as
	/// bindable fields. (Default: "_tb_")
	#[default("_tb_".to_string())]
	pub metadata_prefix: String,

	/// Whether boolean fields decode from the shared bit-packed `spawnflags` integer by default,
	/// rather than from a standalone `0`/`1` key. Per-field metadata overrides this. (Default: false)
	pub default_flags_binding: bool,

	/// The naming convention applied to field names before entity lookup. (Default: [`NamingConvention::SnakeCase`])
	pub field_naming: NamingConvention,

	/// Whether to ignore entity spawning warnings for classnames with no registered class. (Default: false)
	pub suppress_unknown_classes: bool,

	/// Whether the schema writer records fields with no resolvable converter as comments. (Default: false)
	pub verbose_schema_comments: bool,
}

impl ImportConfig {
	pub fn scale(mut self, scale: f32) -> Self {
		self.scale = scale;
		self
	}
	pub fn max_mesh_area(mut self, area: f32) -> Self {
		self.max_mesh_area = area;
		self
	}
	pub fn subdivide_to_leaves(mut self, value: bool) -> Self {
		self.subdivide_to_leaves = value;
		self
	}
	pub fn normal_smooth_threshold(mut self, threshold: f32) -> Self {
		self.normal_smooth_threshold = threshold;
		self
	}
	pub fn simplify_collision(mut self, value: bool) -> Self {
		self.simplify_collision = value;
		self
	}
	pub fn generate_lightmap_uvs(mut self, value: bool) -> Self {
		self.generate_lightmap_uvs = value;
		self
	}
	pub fn identity_key(mut self, key: impl Into<String>) -> Self {
		self.identity_key = key.into();
		self
	}
	pub fn default_flags_binding(mut self, value: bool) -> Self {
		self.default_flags_binding = value;
		self
	}
	pub fn suppress_unknown_classes(mut self, value: bool) -> Self {
		self.suppress_unknown_classes = value;
		self
	}
	pub fn verbose_schema_comments(mut self, value: bool) -> Self {
		self.verbose_schema_comments = value;
		self
	}

	/// Converts a point from the source's z-up space into y-up scene space, applying [`scale`](Self::scale).
	#[inline]
	pub fn to_scene_space(&self, point: Vec3) -> Vec3 {
		point.z_up_to_y_up() / self.scale
	}
	/// The inverse of [`to_scene_space`](Self::to_scene_space).
	#[inline]
	pub fn from_scene_space(&self, point: Vec3) -> Vec3 {
		let scaled = point * self.scale;
		vec3(scaled.x, -scaled.z, scaled.y)
	}

	/// Whether a key is editor-only metadata ([`metadata_prefix`](Self::metadata_prefix)).
	pub fn is_metadata_key(&self, key: &str) -> bool {
		key.starts_with(&self.metadata_prefix)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn coordinate_conversions() {
		let config = ImportConfig::default();

		let input = vec3(20.6, 1.72, 9.0);
		assert_almost_eq!(config.from_scene_space(config.to_scene_space(input)), input, 1e-4);
	}

	#[test]
	fn naming_conventions() {
		assert_eq!(NamingConvention::SnakeCase.apply("start_open"), "start_open");
		assert_eq!(NamingConvention::LowerCase.apply("start_open"), "startopen");
	}

	#[test]
	fn metadata_keys() {
		let config = ImportConfig::default();
		assert!(config.is_metadata_key("_tb_group"));
		assert!(!config.is_metadata_key("targetname"));
	}
}
