//! The entity binding and instantiation engine: classifies every parsed entity, creates
//! scene nodes through the rebuild engine, resolves group/parent hierarchy, and binds
//! key/values onto typed objects.

pub mod binding;

use crate::*;

/// Fatal import failures. Everything else is a per-entity or per-field warning in the
/// summary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
	#[error("invalid spatial structure: {0}")]
	InvalidStructure(String),
	#[error("the entity list has no worldspawn entity")]
	MissingWorldspawn,
	#[error("the world geometry has no faces")]
	EmptyWorld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCategory {
	InvalidStructure,
	MissingWorldspawn,
	EmptyWorld,
}

impl ImportError {
	pub fn category(&self) -> FailureCategory {
		match self {
			Self::InvalidStructure(_) => FailureCategory::InvalidStructure,
			Self::MissingWorldspawn => FailureCategory::MissingWorldspawn,
			Self::EmptyWorld => FailureCategory::EmptyWorld,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportOutcome {
	Success,
	SuccessWithWarnings,
	Failed(FailureCategory),
}

/// The record handed back to the host alongside the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
	pub outcome: ImportOutcome,
	pub warnings: Vec<String>,
	/// Diagnostic lines from the upstream geometry compiler, passed through verbatim.
	pub compiler_output: Vec<String>,
}

impl ImportSummary {
	/// The summary of a fatally failed import.
	pub fn failed(error: &ImportError, compiler_output: Vec<String>) -> Self {
		Self {
			outcome: ImportOutcome::Failed(error.category()),
			warnings: vec![error.to_string()],
			compiler_output,
		}
	}
}

/// Name↔asset lookup for external-reference entities, supplied by the host.
pub trait AssetSource {
	/// Whether `classname` names a known external asset.
	fn contains(&self, classname: &str) -> bool;
	/// Scene-space centering offset baked into the asset, added to the entity's origin.
	fn centering_offset(&self, _classname: &str) -> Vec3 {
		Vec3::ZERO
	}
}

#[derive(Debug)]
pub struct ImportOutput {
	pub scene: SceneGraph,
	pub root: NodeId,
	pub world: NodeId,
	/// Entity serial to the node it produced.
	pub entity_nodes: HashMap<usize, NodeId>,
	pub summary: ImportSummary,
}

/// One import session. Build with [`Importer::new`], configure, then [`run`](Importer::run).
pub struct Importer<'a> {
	data: &'a BspData,
	config: &'a ImportConfig,
	classes: &'a ClassRegistry,
	converters: ConverterRegistry,
	assets: Option<&'a dyn AssetSource>,
	hooks: ImportHooks,
	compiler_output: Vec<String>,
}

struct Created {
	node: NodeId,
	serial: usize,
	class: Option<&'static ErasedClass>,
}

impl<'a> Importer<'a> {
	pub fn new(data: &'a BspData, config: &'a ImportConfig, classes: &'a ClassRegistry) -> Self {
		Self {
			data,
			config,
			classes,
			converters: ConverterRegistry::new(),
			assets: None,
			hooks: ImportHooks::new(),
			compiler_output: Vec::new(),
		}
	}

	pub fn assets(mut self, assets: &'a dyn AssetSource) -> Self {
		self.assets = Some(assets);
		self
	}
	pub fn hooks(mut self, hooks: ImportHooks) -> Self {
		self.hooks = hooks;
		self
	}
	pub fn compiler_output(mut self, lines: Vec<String>) -> Self {
		self.compiler_output = lines;
		self
	}
	pub fn converters(mut self, converters: ConverterRegistry) -> Self {
		self.converters = converters;
		self
	}

	pub fn run(mut self) -> Result<ImportOutput, ImportError> {
		let data = self.data;
		data.validate()?;
		let world_entity = data.entities.worldspawn().ok_or(ImportError::MissingWorldspawn)?;

		let mut scene = SceneGraph::new();
		let mut warnings: Vec<String> = Vec::new();
		let root = scene.spawn("map");

		for hook in self.hooks.iter_mut() {
			if let Err(err) = hook.on_begin(&mut scene, root) {
				push_warning(&mut warnings, format!("on_begin hook failed: {err}"));
			}
		}

		// Pass 0: world geometry plus the worldspawn binding. No faces at all is fatal.
		let mut rebuilder = MeshRebuilder::new(data, self.config);
		let world = scene.spawn_child(root, "worldspawn");
		scene.node_mut(world).entity_serial = Some(world_entity.serial);
		if rebuilder.build_world(&mut scene, world) == 0 {
			return Err(ImportError::EmptyWorld);
		}
		if let Some(class) = self.classes.get("worldspawn") {
			let mut view = BindView::new(&mut scene, world, world_entity, self.config, &self.converters, &mut warnings);
			if let Err(err) = class.apply_bind_recursive(&mut view) {
				push_warning(&mut warnings, format!("worldspawn binding failed: {err}"));
			}
		}
		for hook in self.hooks.iter_mut() {
			if let Err(err) = hook.on_worldspawn(&mut scene, world, world_entity) {
				push_warning(&mut warnings, format!("on_worldspawn hook failed: {err}"));
			}
		}

		// Pass 1: node creation, classification, grouping, and the identity map.
		let mut created: Vec<Created> = Vec::new();
		let mut identity_map: HashMap<String, Vec<NodeId>> = HashMap::new();
		let mut group_nodes: HashMap<String, NodeId> = HashMap::new();

		for entity in data.entities.iter() {
			if entity.serial == world_entity.serial {
				continue;
			}
			let classname = match entity.classname() {
				Ok(classname) => classname,
				Err(_) => {
					push_warning(&mut warnings, format!("entity {} has no classname, skipped", entity.serial));
					continue;
				}
			};

			// Editor bookkeeping with no data of its own.
			if classname == "func_group" {
				continue;
			}
			if entity.contains(&format!("{}layer_omit_from_export", self.config.metadata_prefix)) {
				continue;
			}

			let parent = self.group_parent(&mut scene, root, entity, &mut group_nodes);
			let Some(item) = self.create_entity_node(&mut scene, parent, entity, classname, &mut rebuilder, &mut warnings) else {
				continue;
			};

			scene.node_mut(item.node).entity_serial = Some(entity.serial);
			if let Some(identity) = entity.get_str(&self.config.identity_key) {
				identity_map.entry(identity.to_string()).or_default().push(item.node);
			}
			created.push(item);
		}

		// Pass 2: field binding, then parent resolution through the identity map.
		for item in &created {
			let entity = &data.entities[item.serial];
			if let Some(class) = item.class {
				let mut view = BindView::new(&mut scene, item.node, entity, self.config, &self.converters, &mut warnings);
				if let Err(err) = class.apply_bind_recursive(&mut view) {
					push_warning(&mut warnings, format!("entity {} binding failed: {err}", entity.serial));
				}
			}

			if let Some(parent_identity) = entity.get_str("parent") {
				// Multiple entities may share one identity value; the first in serial order wins.
				match identity_map.get(parent_identity).and_then(|nodes| nodes.first()) {
					Some(&target) => scene.reparent_keep_world(item.node, target),
					None => push_warning(
						&mut warnings,
						format!("entity {} parent `{parent_identity}` does not resolve", entity.serial),
					),
				}
			}
		}

		// Pass 3: post-import callbacks, in entity order.
		for item in &created {
			let Some(post_import) = item.class.and_then(|class| class.post_import_fn) else {
				continue;
			};
			let entity = &data.entities[item.serial];
			let mut view = BindView::new(&mut scene, item.node, entity, self.config, &self.converters, &mut warnings);
			if let Err(err) = post_import(&mut view) {
				push_warning(&mut warnings, format!("entity {} post-import failed: {err}", entity.serial));
			}
		}

		for hook in self.hooks.iter_mut() {
			if let Err(err) = hook.on_end(&mut scene, root) {
				push_warning(&mut warnings, format!("on_end hook failed: {err}"));
			}
		}

		let summary = ImportSummary {
			outcome: if warnings.is_empty() { ImportOutcome::Success } else { ImportOutcome::SuccessWithWarnings },
			warnings,
			compiler_output: self.compiler_output,
		};
		Ok(ImportOutput {
			entity_nodes: created.iter().map(|item| (item.serial, item.node)).collect(),
			scene,
			root,
			world,
			summary,
		})
	}

	/// The node new entities of a group/layer parent under, lazily created and named from
	/// the group's label when one is declared.
	fn group_parent(
		&self,
		scene: &mut SceneGraph,
		root: NodeId,
		entity: &MapEntity,
		group_nodes: &mut HashMap<String, NodeId>,
	) -> NodeId {
		for kind in ["group", "layer"] {
			let Some(id) = entity.get_str(&format!("{}{kind}", self.config.metadata_prefix)) else {
				continue;
			};
			let key = format!("{kind}:{id}");
			if let Some(&node) = group_nodes.get(&key) {
				return node;
			}
			let name = entity
				.get_str(&format!("{}name", self.config.metadata_prefix))
				.map(str::to_string)
				.unwrap_or_else(|| format!("{kind}_{id}"));
			let node = scene.spawn_child(root, name);
			group_nodes.insert(key, node);
			return node;
		}
		root
	}

	fn create_entity_node(
		&mut self,
		scene: &mut SceneGraph,
		parent: NodeId,
		entity: &MapEntity,
		classname: &str,
		rebuilder: &mut MeshRebuilder,
		warnings: &mut Vec<String>,
	) -> Option<Created> {
		// External assets take precedence over registered classes of the same name.
		if self.assets.is_some_and(|assets| assets.contains(classname)) {
			let node = scene.spawn_child(parent, classname);
			let mut transform = entity::read_transform(entity, self.config);
			transform.translation += self.assets.unwrap().centering_offset(classname);
			scene.node_mut(node).transform = transform;

			for hook in self.hooks.iter_mut() {
				if let Err(err) = hook.on_point_spawned(scene, node, entity) {
					push_warning(warnings, format!("on_point_spawned hook failed: {err}"));
				}
			}
			return Some(Created { node, serial: entity.serial, class: self.classes.get(classname) });
		}

		let Some(class) = self.classes.get(classname) else {
			if !self.config.suppress_unknown_classes {
				push_warning(warnings, format!("entity {} has unknown classname `{classname}`, skipped", entity.serial));
			}
			return None;
		};

		match class.info.kind {
			ClassKind::Base => {
				push_warning(warnings, format!("entity {} places abstract class `{classname}`, skipped", entity.serial));
				None
			}
			ClassKind::Point => {
				let node = scene.spawn_child(parent, classname);
				scene.node_mut(node).transform = entity::read_transform(entity, self.config);
				for hook in self.hooks.iter_mut() {
					if let Err(err) = hook.on_point_spawned(scene, node, entity) {
						push_warning(warnings, format!("on_point_spawned hook failed: {err}"));
					}
				}
				Some(Created { node, serial: entity.serial, class: Some(class) })
			}
			ClassKind::Solid => self.create_solid_node(scene, parent, entity, classname, class, rebuilder, warnings),
		}
	}

	fn create_solid_node(
		&mut self,
		scene: &mut SceneGraph,
		parent: NodeId,
		entity: &MapEntity,
		classname: &str,
		class: &'static ErasedClass,
		rebuilder: &mut MeshRebuilder,
		warnings: &mut Vec<String>,
	) -> Option<Created> {
		// Solid entities carry a `*N` reference to their discrete brush model.
		let model_index = match entity.get_str("model") {
			Some(value) if value.starts_with('*') => match value[1..].parse::<usize>() {
				Ok(index) => index,
				Err(_) => {
					push_warning(warnings, format!("entity {} has malformed model reference `{value}`, skipped", entity.serial));
					return None;
				}
			},
			other => {
				push_warning(
					warnings,
					format!("solid entity {} ({classname}) has no model reference ({other:?}), skipped", entity.serial),
				);
				return None;
			}
		};

		let Some((mesh, mut collider, center)) = rebuilder.build_model(model_index) else {
			error!("entity {} ({classname}) model *{model_index} produced no geometry, entity discarded", entity.serial);
			push_warning(warnings, format!("entity {} model *{model_index} produced no geometry, skipped", entity.serial));
			return None;
		};

		let node = scene.spawn_child(parent, classname);
		// An explicit origin key overrides bounds-midpoint centering.
		let translation = match entity.contains("origin") {
			true => entity::read_translation(entity, self.config).unwrap_or(center),
			false => center,
		};
		scene.node_mut(node).transform = Transform {
			translation,
			rotation: entity::read_rotation(entity).unwrap_or(Quat::IDENTITY),
			scale: Vec3::ONE,
		};

		match class.info.solid_kind {
			SolidKind::Solid => scene.node_mut(node).mesh = Some(mesh),
			SolidKind::Illusionary => {
				scene.node_mut(node).visible = false;
			}
			SolidKind::Trigger => {
				collider.convex = true;
				scene.node_mut(node).visible = false;
			}
			SolidKind::Liquid => {
				collider.convex = true;
				scene.node_mut(node).mesh = Some(mesh);
			}
		}
		scene.node_mut(node).collider = Some(collider);

		for hook in self.hooks.iter_mut() {
			if let Err(err) = hook.on_solid_spawned(scene, node, entity) {
				push_warning(warnings, format!("on_solid_spawned hook failed: {err}"));
			}
		}
		Some(Created { node, serial: entity.serial, class: Some(class) })
	}
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
	warn!("{message}");
	warnings.push(message);
}
