//! [`BindView`]: the window a class's bind function sees, resolving field keys against the
//! entity and decoding values through the converter registry.

use crate::*;

/// Field access for one entity/node pair during binding. Decode failures warn and leave
/// the field at its default, never aborting the entity.
pub struct BindView<'w> {
	scene: &'w mut SceneGraph,
	node: NodeId,
	entity: &'w MapEntity,
	config: &'w ImportConfig,
	converters: &'w ConverterRegistry,
	warnings: &'w mut Vec<String>,
}

impl<'w> BindView<'w> {
	pub(crate) fn new(
		scene: &'w mut SceneGraph,
		node: NodeId,
		entity: &'w MapEntity,
		config: &'w ImportConfig,
		converters: &'w ConverterRegistry,
		warnings: &'w mut Vec<String>,
	) -> Self {
		Self { scene, node, entity, config, converters, warnings }
	}

	pub fn entity(&self) -> &MapEntity {
		self.entity
	}
	pub fn config(&self) -> &ImportConfig {
		self.config
	}
	pub fn node(&self) -> NodeId {
		self.node
	}
	pub fn scene(&mut self) -> &mut SceneGraph {
		self.scene
	}

	pub fn set_transform(&mut self, transform: Transform) {
		self.scene.node_mut(self.node).transform = transform;
	}

	/// Attaches a typed object to the node.
	pub fn insert<T: Any + Send + Sync>(&mut self, component: T) {
		self.scene.insert_component(self.node, component);
	}

	pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
		self.scene.get_component(self.node)
	}

	/// Decodes the field named `name` in `info`'s descriptor table. `None` means the field
	/// keeps its default: no matching key, or a decode failure (which warns).
	pub fn field<T: FromFieldValue>(&mut self, info: &ClassInfo, name: &str) -> Option<T> {
		let Some(descriptor) = info.field(name) else {
			warn!("class `{}` binds undeclared field `{name}`", info.name);
			return None;
		};

		if descriptor.binding == FieldBinding::Excluded {
			return None;
		}
		if let Some(bit) = info.flag_bit_with(name, self.config.default_flags_binding) {
			let flags = self.spawnflags();
			return T::from_field_value(FieldValue::Bool(flags & (1 << bit) != 0));
		}

		let key = self.resolve_key(descriptor)?;
		let converter = match self.converters.converter(descriptor.ty) {
			Some(converter) => converter,
			None => {
				self.warn(format!("entity {}: field `{key}` has no converter, default kept", self.entity.serial));
				return None;
			}
		};

		match converter.decode_one(self.entity, &key) {
			Ok(value) => {
				let decoded = T::from_field_value(value);
				if decoded.is_none() {
					self.warn(format!(
						"entity {}: field `{key}` decoded to an unexpected value type, default kept",
						self.entity.serial
					));
				}
				decoded
			}
			Err(err) => {
				self.warn(format!("entity {}: field `{key}` failed to decode ({err}), default kept", self.entity.serial));
				None
			}
		}
	}

	/// Key resolution precedence: the explicit override key, then the field's own name under
	/// the active naming convention, then prior keys. The first key the entity actually has
	/// wins; arrays match by prefix.
	fn resolve_key(&self, descriptor: &FieldDescriptor) -> Option<String> {
		let own_name = self.config.field_naming.apply(descriptor.name);
		let candidates = descriptor
			.override_key
			.into_iter()
			.chain([own_name.as_str()])
			.chain(descriptor.prior_keys.iter().copied());

		let is_array = matches!(descriptor.ty, TypeTag::Array(_));
		for candidate in candidates {
			let present = if is_array {
				!self.entity.keys_with_prefix(candidate).is_empty()
			} else {
				self.entity.contains(candidate)
			};
			if present {
				return Some(candidate.to_string());
			}
		}
		None
	}

	/// The shared bit-packed flags integer. A malformed value warns once and reads as zero.
	fn spawnflags(&mut self) -> u32 {
		match self.entity.get::<u32>("spawnflags") {
			Ok(flags) => flags,
			Err(EntityError::RequiredPropertyNotFound { .. }) => 0,
			Err(err) => {
				self.warn(format!("entity {}: {err}", self.entity.serial));
				0
			}
		}
	}

	fn warn(&mut self, message: String) {
		warn!("{message}");
		self.warnings.push(message);
	}
}
