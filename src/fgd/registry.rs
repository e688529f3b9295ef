//! The field converter registry: one capability object per semantic value type, resolved
//! through a closed tag set with array/enum/object-reference fallback, cached per session.

use std::cell::RefCell;
use std::rc::Rc;

use crate::*;

/// The family of an object-reference field, with `Any` as the shared ancestor every
/// specific kind falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
	Any,
	Target,
	Model,
	Sound,
}
impl RefKind {
	pub fn parent(self) -> Option<RefKind> {
		match self {
			Self::Any => None,
			_ => Some(Self::Any),
		}
	}

	/// The editor-facing FGD type name.
	pub fn fgd_type_name(self) -> &'static str {
		match self {
			Self::Any | Self::Target => "target_destination",
			Self::Model => "studio",
			Self::Sound => "sound",
		}
	}
}

/// A standalone named enumeration, referenced by enum-typed fields and regenerated from
/// inline choices tables by the schema parser.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EnumTable {
	pub name: &'static str,
	/// `(ordinal, display name)` in declaration order.
	pub variants: &'static [(i32, &'static str)],
}
impl EnumTable {
	pub fn by_ordinal(&self, ordinal: i32) -> Option<&'static str> {
		self.variants.iter().find(|(o, _)| *o == ordinal).map(|(_, name)| *name)
	}
	pub fn by_name(&self, name: &str) -> Option<i32> {
		self.variants.iter().find(|(_, n)| n.eq_ignore_ascii_case(name)).map(|(o, _)| *o)
	}
}

/// The closed set of semantic value types a bindable field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
	Bool,
	Int,
	Float,
	String,
	Color,
	Vector,
	Enum(&'static EnumTable),
	ObjectRef(RefKind),
	Array(&'static TypeTag),
}
impl TypeTag {
	/// The editor-facing FGD type name. Arrays describe their element type, since the
	/// repeated encoding is a key-name convention rather than a distinct value syntax.
	pub fn fgd_type_name(&self) -> &'static str {
		match self {
			Self::Bool | Self::Enum(_) => "choices",
			Self::Int => "integer",
			Self::Float => "float",
			Self::String => "string",
			Self::Color => "color1",
			Self::Vector => "vector",
			Self::ObjectRef(kind) => kind.fgd_type_name(),
			Self::Array(element) => element.fgd_type_name(),
		}
	}
}

/// A decoded field value, tagged to match [`TypeTag`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Bool(bool),
	Int(i64),
	Float(f32),
	String(String),
	Color(Srgba),
	Vector(Vec3),
	/// The resolved ordinal of an enum variant.
	Enum(i32),
	ObjectRef(String),
	Array(Vec<FieldValue>),
}

/// A stateless capability bound to exactly one semantic type: decode one value, decode a
/// repeated encoding, and describe itself as a schema field.
pub trait Converter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue>;

	/// Decodes every key beginning with `key_prefix`, sorted lexicographically, one value per
	/// key. An empty prefix match yields an empty array ("no data"), not an error.
	fn decode_many(&self, entity: &MapEntity, key_prefix: &str) -> anyhow::Result<Vec<FieldValue>> {
		entity
			.keys_with_prefix(key_prefix)
			.into_iter()
			.map(|key| self.decode_one(entity, key))
			.collect()
	}

	/// Builds the read-only schema representation of a field of this type.
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty;
}

fn missing(entity: &MapEntity, key: &str) -> anyhow::Error {
	anyhow::anyhow!("entity {} has no key `{key}`", entity.serial)
}

fn base_property(field: &FieldDescriptor, key: &str, ty: &str) -> FgdProperty {
	let description = match (field.description, field.range) {
		(Some(text), Some((min, max))) => Some(format!("{text} ({min} to {max})")),
		(None, Some((min, max))) => Some(format!("{min} to {max}")),
		(text, None) => text.map(str::to_string),
	};
	FgdProperty {
		name: key.to_string(),
		ty: ty.to_string(),
		title: field.title.map(str::to_string),
		default_value: field.default_value.map(|f| f()),
		description,
		choices: Vec::new(),
	}
}

struct BoolConverter;
impl Converter for BoolConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		// Accepts both boolean strings and the 0/1 integer convention.
		match value.trim() {
			"true" => Ok(FieldValue::Bool(true)),
			"false" => Ok(FieldValue::Bool(false)),
			other => Ok(FieldValue::Bool(i64::fgd_parse(other)? > 0)),
		}
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		let mut property = base_property(field, key, "choices");
		property.choices = vec![
			FgdChoice { key: FgdValueKey::Integer(0), title: "false".to_string() },
			FgdChoice { key: FgdValueKey::Integer(1), title: "true".to_string() },
		];
		property
	}
}

struct IntConverter;
impl Converter for IntConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		Ok(FieldValue::Int(i64::fgd_parse(value)?))
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		base_property(field, key, "integer")
	}
}

struct FloatConverter;
impl Converter for FloatConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		Ok(FieldValue::Float(f32::fgd_parse(value)?))
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		base_property(field, key, "float")
	}
}

struct StringConverter;
impl Converter for StringConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		Ok(FieldValue::String(value.to_string()))
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		base_property(field, key, "string")
	}
}

struct ColorConverter;
impl Converter for ColorConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		Ok(FieldValue::Color(Srgba::fgd_parse(value)?))
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		base_property(field, key, "color1")
	}
}

struct VectorConverter;
impl Converter for VectorConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		Ok(FieldValue::Vector(Vec3::fgd_parse(value)?))
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		base_property(field, key, "vector")
	}
}

/// The generic enum converter: decodes by variant name or by ordinal.
struct EnumConverter {
	table: &'static EnumTable,
}
impl Converter for EnumConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		if let Ok(ordinal) = i32::fgd_parse(value) {
			if self.table.by_ordinal(ordinal).is_none() {
				anyhow::bail!("`{ordinal}` is not a variant of {}", self.table.name);
			}
			return Ok(FieldValue::Enum(ordinal));
		}
		match self.table.by_name(value.trim()) {
			Some(ordinal) => Ok(FieldValue::Enum(ordinal)),
			None => anyhow::bail!("`{value}` is not a variant of {}", self.table.name),
		}
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		let mut property = base_property(field, key, "choices");
		property.choices = self
			.table
			.variants
			.iter()
			.map(|(ordinal, name)| FgdChoice {
				key: FgdValueKey::Integer(*ordinal),
				title: name.to_string(),
			})
			.collect();
		property
	}
}

/// Handles any object-reference-like field a more specific converter wasn't registered for.
struct ObjectRefConverter {
	kind: RefKind,
}
impl Converter for ObjectRefConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		let value = entity.get_str(key).ok_or_else(|| missing(entity, key))?;
		Ok(FieldValue::ObjectRef(value.to_string()))
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		base_property(field, key, self.kind.fgd_type_name())
	}
}

/// Wraps an element converter singly; the repeated encoding is one key per element sharing
/// the field name as prefix.
struct ArrayConverter {
	element: Rc<dyn Converter>,
}
impl Converter for ArrayConverter {
	fn decode_one(&self, entity: &MapEntity, key: &str) -> anyhow::Result<FieldValue> {
		Ok(FieldValue::Array(self.decode_many(entity, key)?))
	}
	fn decode_many(&self, entity: &MapEntity, key_prefix: &str) -> anyhow::Result<Vec<FieldValue>> {
		entity
			.keys_with_prefix(key_prefix)
			.into_iter()
			.map(|key| self.element.decode_one(entity, key))
			.collect()
	}
	fn schema_property(&self, field: &FieldDescriptor, key: &str) -> FgdProperty {
		self.element.schema_property(field, key)
	}
}

/// Resolves converters by [`TypeTag`]. Built once per import/export session; lookups after
/// the first for a given tag are O(1) through the interior cache.
#[derive(Default)]
pub struct ConverterRegistry {
	object_refs: HashMap<RefKind, Rc<dyn Converter>>,
	cache: RefCell<HashMap<TypeTag, Rc<dyn Converter>>>,
}

impl ConverterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a host converter for a specific object-reference kind. Kinds without one fall
	/// back along the ancestry chain to the generic converter.
	pub fn register_object_ref(&mut self, kind: RefKind, converter: Rc<dyn Converter>) {
		self.object_refs.insert(kind, converter);
		self.cache.borrow_mut().clear();
	}

	/// `GetConverter`: exact tag, then array-element wrapping, enum fallback, and
	/// object-reference ancestor search.
	pub fn converter(&self, tag: TypeTag) -> Option<Rc<dyn Converter>> {
		if let Some(cached) = self.cache.borrow().get(&tag) {
			return Some(cached.clone());
		}

		let built: Option<Rc<dyn Converter>> = match tag {
			TypeTag::Bool => Some(Rc::new(BoolConverter)),
			TypeTag::Int => Some(Rc::new(IntConverter)),
			TypeTag::Float => Some(Rc::new(FloatConverter)),
			TypeTag::String => Some(Rc::new(StringConverter)),
			TypeTag::Color => Some(Rc::new(ColorConverter)),
			TypeTag::Vector => Some(Rc::new(VectorConverter)),
			TypeTag::Enum(table) => Some(Rc::new(EnumConverter { table })),
			TypeTag::ObjectRef(kind) => {
				let mut search = Some(kind);
				loop {
					match search {
						Some(current) => {
							if let Some(registered) = self.object_refs.get(&current) {
								break Some(registered.clone());
							}
							search = current.parent();
						}
						None => break Some(Rc::new(ObjectRefConverter { kind })),
					}
				}
			}
			TypeTag::Array(element) => self
				.converter(*element)
				.map(|inner| Rc::new(ArrayConverter { element: inner }) as Rc<dyn Converter>),
		};

		if let Some(converter) = &built {
			self.cache.borrow_mut().insert(tag, converter.clone());
		}
		built
	}
}

/// Conversion from a decoded [`FieldValue`] into the concrete field type a class binds.
pub trait FromFieldValue: Sized {
	fn from_field_value(value: FieldValue) -> Option<Self>;
}

impl FromFieldValue for bool {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Bool(v) => Some(v),
			_ => None,
		}
	}
}
impl FromFieldValue for i64 {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Int(v) => Some(v),
			_ => None,
		}
	}
}
impl FromFieldValue for i32 {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Int(v) => i32::try_from(v).ok(),
			FieldValue::Enum(v) => Some(v),
			_ => None,
		}
	}
}
impl FromFieldValue for u32 {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Int(v) => u32::try_from(v).ok(),
			_ => None,
		}
	}
}
impl FromFieldValue for f32 {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Float(v) => Some(v),
			FieldValue::Int(v) => Some(v as f32),
			_ => None,
		}
	}
}
impl FromFieldValue for String {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::String(v) | FieldValue::ObjectRef(v) => Some(v),
			_ => None,
		}
	}
}
impl FromFieldValue for Srgba {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Color(v) => Some(v),
			_ => None,
		}
	}
}
impl FromFieldValue for Vec3 {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Vector(v) => Some(v),
			_ => None,
		}
	}
}
impl<T: FromFieldValue> FromFieldValue for Vec<T> {
	fn from_field_value(value: FieldValue) -> Option<Self> {
		match value {
			FieldValue::Array(values) => values.into_iter().map(T::from_field_value).collect(),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entity::test_entity;

	#[test]
	fn exact_resolution_and_cache() {
		let registry = ConverterRegistry::new();
		assert!(registry.converter(TypeTag::Float).is_some());
		assert!(registry.cache.borrow().contains_key(&TypeTag::Float));

		// Second lookup hits the cache and returns the same instance.
		let a = registry.converter(TypeTag::Float).unwrap();
		let b = registry.converter(TypeTag::Float).unwrap();
		assert!(Rc::ptr_eq(&a, &b));
	}

	#[test]
	fn array_resolves_element() {
		let registry = ConverterRegistry::new();
		let converter = registry.converter(TypeTag::Array(&TypeTag::Int)).unwrap();

		let entity = test_entity(0, &[("item2", "20"), ("item", "1"), ("item10", "300")]);
		let values = converter.decode_many(&entity, "item").unwrap();
		// Lexicographic key order: item, item10, item2.
		assert_eq!(values, vec![FieldValue::Int(1), FieldValue::Int(300), FieldValue::Int(20)]);

		let empty = converter.decode_many(&entity, "nothing").unwrap();
		assert!(empty.is_empty());
	}

	#[test]
	fn object_ref_ancestor_fallback() {
		let registry = ConverterRegistry::new();
		// No specific converter registered: falls back to the generic one for every kind.
		let converter = registry.converter(TypeTag::ObjectRef(RefKind::Model)).unwrap();
		let entity = test_entity(0, &[("model", "props/barrel")]);
		assert_eq!(
			converter.decode_one(&entity, "model").unwrap(),
			FieldValue::ObjectRef("props/barrel".to_string())
		);
	}

	#[test]
	fn enum_decodes_by_name_or_ordinal() {
		static STYLE: EnumTable = EnumTable {
			name: "LightStyle",
			variants: &[(0, "Normal"), (1, "Flicker"), (10, "Pulse")],
		};
		let registry = ConverterRegistry::new();
		let converter = registry.converter(TypeTag::Enum(&STYLE)).unwrap();

		let entity = test_entity(0, &[("style", "Pulse"), ("style2", "1"), ("style3", "Strobe")]);
		assert_eq!(converter.decode_one(&entity, "style").unwrap(), FieldValue::Enum(10));
		assert_eq!(converter.decode_one(&entity, "style2").unwrap(), FieldValue::Enum(1));
		assert!(converter.decode_one(&entity, "style3").is_err());
	}

	#[test]
	fn numeric_range_hints_annotate_the_schema() {
		let registry = ConverterRegistry::new();
		let converter = registry.converter(TypeTag::Float).unwrap();

		const SPEED: FieldDescriptor = FieldDescriptor::new("speed", TypeTag::Float).description("Units per second").range(0., 500.);
		assert_eq!(
			converter.schema_property(&SPEED, "speed").description.as_deref(),
			Some("Units per second (0 to 500)")
		);

		const WAIT: FieldDescriptor = FieldDescriptor::new("wait", TypeTag::Float).range(1., 10.);
		assert_eq!(converter.schema_property(&WAIT, "wait").description.as_deref(), Some("1 to 10"));
	}

	#[test]
	fn bool_decodes_both_conventions() {
		let registry = ConverterRegistry::new();
		let converter = registry.converter(TypeTag::Bool).unwrap();
		let entity = test_entity(0, &[("a", "1"), ("b", "0"), ("c", "true"), ("d", "maybe")]);

		assert_eq!(converter.decode_one(&entity, "a").unwrap(), FieldValue::Bool(true));
		assert_eq!(converter.decode_one(&entity, "b").unwrap(), FieldValue::Bool(false));
		assert_eq!(converter.decode_one(&entity, "c").unwrap(), FieldValue::Bool(true));
		assert!(converter.decode_one(&entity, "d").is_err());
	}
}
