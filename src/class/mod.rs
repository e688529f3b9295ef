//! Typed entity classes, described by static field descriptor tables consumed identically by
//! the binding engine and the schema writer.

pub mod builtin;

use crate::*;

/// A class's declaration kind, deciding which `@…Class` keyword it is written under and how
/// the instantiation engine treats its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumIs)]
pub enum ClassKind {
	/// Abstract, only usable as a base of other classes. Not placeable.
	#[default]
	Base,
	/// A dimensionless entity placed at a point, like a light or a spawn marker.
	Point,
	/// An entity made out of level geometry, carrying a discrete brush model.
	Solid,
}
impl fmt::Display for ClassKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Base => write!(f, "Base"),
			Self::Point => write!(f, "Point"),
			Self::Solid => write!(f, "Solid"),
		}
	}
}

/// How a solid class's geometry behaves after reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolidKind {
	/// Rendered and solid.
	#[default]
	Solid,
	/// Rendered geometry is stripped, collision kept.
	Illusionary,
	/// Invisible convex trigger volume.
	Trigger,
	/// Convex trigger volume that keeps its renderer.
	Liquid,
}

/// How a field's value reaches the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldBinding {
	/// A standalone key holding the textual value.
	#[default]
	Value,
	/// One bit of the shared bit-packed `spawnflags` integer. Bits are positional: the Nth
	/// flag field of the class (in declaration order) occupies bit N.
	Flag,
	/// Declared on the type but never bound nor written to the schema.
	Excluded,
}

/// One bindable field of a class. The same table drives decoding and schema writing.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
	pub name: &'static str,
	/// Short editor-facing display name.
	pub title: Option<&'static str>,
	pub description: Option<&'static str>,
	pub ty: TypeTag,
	/// Produces the default in written form (already quoted when the type calls for it).
	pub default_value: Option<fn() -> String>,
	/// Explicit entity key, tried before the field's own name.
	pub override_key: Option<&'static str>,
	/// Former names of this field, tried after the field's own name.
	pub prior_keys: &'static [&'static str],
	pub binding: FieldBinding,
	/// Editor-facing `(min, max)` hint for numeric fields. The FGD grammar has no range
	/// syntax, so it rides along as a description annotation.
	pub range: Option<(f32, f32)>,
}

impl FieldDescriptor {
	pub const fn new(name: &'static str, ty: TypeTag) -> Self {
		Self {
			name,
			title: None,
			description: None,
			ty,
			default_value: None,
			override_key: None,
			prior_keys: &[],
			binding: FieldBinding::Value,
			range: None,
		}
	}
	pub const fn title(mut self, title: &'static str) -> Self {
		self.title = Some(title);
		self
	}
	pub const fn description(mut self, description: &'static str) -> Self {
		self.description = Some(description);
		self
	}
	pub const fn default_value(mut self, default: fn() -> String) -> Self {
		self.default_value = Some(default);
		self
	}
	pub const fn override_key(mut self, key: &'static str) -> Self {
		self.override_key = Some(key);
		self
	}
	pub const fn prior_keys(mut self, keys: &'static [&'static str]) -> Self {
		self.prior_keys = keys;
		self
	}
	pub const fn range(mut self, min: f32, max: f32) -> Self {
		self.range = Some((min, max));
		self
	}
	pub const fn flag(mut self) -> Self {
		self.binding = FieldBinding::Flag;
		self
	}
	pub const fn excluded(mut self) -> Self {
		self.binding = FieldBinding::Excluded;
		self
	}
}

/// The static description of an entity class.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
	pub kind: ClassKind,
	/// The classname entities carry, also the schema class name.
	pub name: &'static str,
	pub description: Option<&'static str>,
	pub base: &'static [&'static ErasedClass],
	/// Geometry behavior for [`ClassKind::Solid`] classes; ignored otherwise.
	pub solid_kind: SolidKind,
	/// `model({...})` display hint.
	pub model: Option<&'static str>,
	pub color: Option<&'static str>,
	pub iconsprite: Option<&'static str>,
	pub size: Option<&'static str>,
	pub fields: &'static [FieldDescriptor],
}

impl ClassInfo {
	/// The flag fields of this class paired with their positional bits, in declaration order.
	pub fn flag_fields(&self) -> impl Iterator<Item = (u32, &FieldDescriptor)> {
		self.flag_fields_with(false)
	}

	/// Like [`flag_fields`](Self::flag_fields), but when `default_flags` is set every plain
	/// boolean field also packs into `spawnflags`. Bit assignment stays positional over the
	/// combined set.
	pub fn flag_fields_with(&self, default_flags: bool) -> impl Iterator<Item = (u32, &FieldDescriptor)> {
		self.fields
			.iter()
			.filter(move |field| match field.binding {
				FieldBinding::Flag => true,
				FieldBinding::Value => default_flags && matches!(field.ty, TypeTag::Bool),
				FieldBinding::Excluded => false,
			})
			.enumerate()
			.map(|(bit, field)| (bit as u32, field))
	}

	/// The `spawnflags` bit of a flag field, if `name` is one.
	pub fn flag_bit(&self, name: &str) -> Option<u32> {
		self.flag_fields().find(|(_, field)| field.name == name).map(|(bit, _)| bit)
	}

	pub fn flag_bit_with(&self, name: &str, default_flags: bool) -> Option<u32> {
		self.flag_fields_with(default_flags).find(|(_, field)| field.name == name).map(|(bit, _)| bit)
	}

	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|field| field.name == name)
	}

	/// Whether this class has `classname` anywhere in its base-class graph.
	pub fn derives_from(&self, classname: &str) -> bool {
		self.base
			.iter()
			.any(|base| base.info.name == classname || base.info.derives_from(classname))
	}

	/// Structural checks done at registration. Flag fields pack into one 32-bit integer,
	/// counting every boolean in case the global flags default is on.
	pub fn validate(&self) -> anyhow::Result<()> {
		let flag_count = self.flag_fields_with(true).count();
		if flag_count > 32 {
			anyhow::bail!("class `{}` declares {flag_count} flag fields, the packed limit is 32", self.name);
		}
		Ok(())
	}
}

/// A class with a Rust type attached. Statically constructed via [`ErasedClass::of`].
pub struct ErasedClass {
	pub type_id: fn() -> TypeId,
	pub info: ClassInfo,
	pub bind_fn: fn(&mut BindView) -> anyhow::Result<()>,
	pub post_import_fn: Option<fn(&mut BindView) -> anyhow::Result<()>>,
}

impl ErasedClass {
	pub const fn of<T: EntityClass>() -> Self {
		Self {
			type_id: TypeId::of::<T>,
			info: T::CLASS_INFO,
			bind_fn: T::bind,
			post_import_fn: if T::WANTS_POST_IMPORT { Some(T::post_import) } else { None },
		}
	}

	/// Applies this class's bind function after all of its bases, each class at most once even
	/// through a diamond-shaped base graph.
	pub fn apply_bind_recursive(&self, view: &mut BindView) -> anyhow::Result<()> {
		fn apply(class: &ErasedClass, view: &mut BindView, applied: &mut HashSet<TypeId>) -> anyhow::Result<()> {
			if !applied.insert((class.type_id)()) {
				return Ok(());
			}
			for base in class.info.base {
				apply(base, view, applied)?;
			}
			(class.bind_fn)(view)
		}
		apply(self, view, &mut HashSet::new())
	}
}

impl fmt::Debug for ErasedClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ErasedClass").field("info", &self.info).finish_non_exhaustive()
	}
}

/// The typed side of a class: static description plus the bind function that reads decoded
/// fields off a [`BindView`] and attaches the constructed object to the node.
pub trait EntityClass: Sized + Send + Sync + 'static {
	const CLASS_INFO: ClassInfo;
	const ERASED_CLASS: &'static ErasedClass = &ErasedClass::of::<Self>();

	fn bind(view: &mut BindView) -> anyhow::Result<()>;

	/// Set to receive [`post_import`](Self::post_import) after the whole scene exists.
	const WANTS_POST_IMPORT: bool = false;
	fn post_import(_view: &mut BindView) -> anyhow::Result<()> {
		Ok(())
	}
}

/// All classes known to one import/export session, keyed by classname.
#[derive(Debug, Default)]
pub struct ClassRegistry {
	classes: HashMap<&'static str, &'static ErasedClass>,
}

impl ClassRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry preloaded with the [`builtin`] classes.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		for class in builtin::BUILTIN_CLASSES {
			registry.register_erased(class);
		}
		registry
	}

	pub fn register<T: EntityClass>(&mut self) -> &mut Self {
		self.register_erased(T::ERASED_CLASS)
	}

	pub fn register_erased(&mut self, class: &'static ErasedClass) -> &mut Self {
		if let Err(err) = class.info.validate() {
			error!("invalid class definition: {err}");
			return self;
		}
		if let Some(existing) = self.classes.insert(class.info.name, class) {
			if (existing.type_id)() != (class.type_id)() {
				error!(
					"the classname `{}` is registered by two different types; the latest registration wins",
					class.info.name
				);
			}
		}
		self
	}

	pub fn get(&self, classname: &str) -> Option<&'static ErasedClass> {
		self.classes.get(classname).copied()
	}

	pub fn contains(&self, classname: &str) -> bool {
		self.classes.contains_key(classname)
	}

	/// All registered classes sorted by name, for deterministic schema output.
	pub fn classes_sorted(&self) -> Vec<&'static ErasedClass> {
		let mut classes: Vec<_> = self.classes.values().copied().collect();
		classes.sort_by_key(|class| class.info.name);
		classes
	}

	/// Serializes every registered class to FGD schema text.
	pub fn to_fgd(&self, registry: &ConverterRegistry, config: &ImportConfig) -> String {
		fgd::writing::write_classes(&self.classes_sorted(), registry, config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Slab;
	impl EntityClass for Slab {
		const CLASS_INFO: ClassInfo = ClassInfo {
			kind: ClassKind::Solid,
			name: "func_slab",
			description: None,
			base: &[],
			solid_kind: SolidKind::Solid,
			model: None,
			color: None,
			iconsprite: None,
			size: None,
			fields: &[
				FieldDescriptor::new("speed", TypeTag::Float),
				FieldDescriptor::new("start_open", TypeTag::Bool).flag(),
				FieldDescriptor::new("locked", TypeTag::Bool).flag(),
				FieldDescriptor::new("internal", TypeTag::Int).excluded(),
			],
		};
		fn bind(_view: &mut BindView) -> anyhow::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn positional_flag_bits() {
		let info = Slab::CLASS_INFO;
		assert_eq!(info.flag_bit("start_open"), Some(0));
		assert_eq!(info.flag_bit("locked"), Some(1));
		// Value and excluded fields get no bit.
		assert_eq!(info.flag_bit("speed"), None);
		assert_eq!(info.flag_bit("internal"), None);
	}

	#[test]
	fn registry_lookup() {
		let mut registry = ClassRegistry::new();
		registry.register::<Slab>();

		assert!(registry.contains("func_slab"));
		assert_eq!(registry.get("func_slab").map(|c| c.info.name), Some("func_slab"));
		assert!(registry.get("func_other").is_none());
	}

	#[test]
	fn builtin_base_graph() {
		let registry = ClassRegistry::with_builtins();
		let light = registry.get("light").unwrap();
		assert!(light.info.derives_from("__transform"));
		assert!(!light.info.derives_from("worldspawn"));
	}
}
