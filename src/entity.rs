//! Parsed map entities: free-form key/value records identified by their assignment order.

use crate::*;

/// One parsed entity occurrence. Identity is the serial number, not content.
///
/// Keys are case-preserving but looked up case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapEntity {
	/// Assignment order in the source file, unique within a parse.
	pub serial: usize,
	pub properties: HashMap<String, String>,
}

impl MapEntity {
	pub fn new(serial: usize, properties: HashMap<String, String>) -> Self {
		Self { serial, properties }
	}

	/// Gets the classname of the entity. On any valid entity, this returns `Ok`.
	pub fn classname(&self) -> Result<&str, EntityError> {
		self.get_str("classname").ok_or_else(|| EntityError::RequiredPropertyNotFound {
			serial: self.serial,
			property: "classname".into(),
		})
	}

	/// Case-insensitive raw lookup, preferring an exact-case match.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		if let Some(value) = self.properties.get(key) {
			return Some(value);
		}
		self.properties
			.iter()
			.find(|(k, _)| k.eq_ignore_ascii_case(key))
			.map(|(_, v)| v.as_str())
	}

	pub fn contains(&self, key: &str) -> bool {
		self.get_str(key).is_some()
	}

	/// Typed lookup through [`FgdType`] parsing.
	pub fn get<T: FgdType>(&self, key: &str) -> Result<T, EntityError> {
		let Some(value) = self.get_str(key) else {
			return Err(EntityError::RequiredPropertyNotFound {
				serial: self.serial,
				property: key.into(),
			});
		};
		T::fgd_parse(value).map_err(|err| EntityError::PropertyParseError {
			serial: self.serial,
			property: key.into(),
			required_type: type_name::<T>(),
			error: err.to_string(),
		})
	}

	/// All keys starting with `prefix` (case-insensitively), sorted lexicographically.
	/// Used by array-field decoding.
	pub fn keys_with_prefix(&self, prefix: &str) -> Vec<&str> {
		let mut keys: Vec<&str> = self
			.properties
			.keys()
			// Keys are free-form text; only slice on a char boundary.
			.filter(|k| k.len() >= prefix.len() && k.is_char_boundary(prefix.len()) && k[..prefix.len()].eq_ignore_ascii_case(prefix))
			.map(String::as_str)
			.collect();
		keys.sort_unstable();
		keys
	}
}

/// The flat entity list of one parse, in serial order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapEntities(pub Vec<MapEntity>);

impl MapEntities {
	/// Builds the list from raw key/value maps, assigning serial numbers by position.
	pub fn from_key_values(entities: impl IntoIterator<Item = HashMap<String, String>>) -> Self {
		Self(
			entities
				.into_iter()
				.enumerate()
				.map(|(serial, properties)| MapEntity::new(serial, properties))
				.collect(),
		)
	}

	/// The world entity. By convention the first entity with classname `worldspawn`.
	pub fn worldspawn(&self) -> Option<&MapEntity> {
		self.0.iter().find(|entity| entity.classname() == Ok("worldspawn"))
	}

	pub fn iter(&self) -> std::slice::Iter<'_, MapEntity> {
		self.0.iter()
	}
}
impl std::ops::Deref for MapEntities {
	type Target = [MapEntity];
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntityError {
	#[error("Entity {serial} requires property `{property}` to be created")]
	RequiredPropertyNotFound { serial: usize, property: String },
	#[error("Entity {serial} requires property `{property}` to be a valid `{required_type}`. Error: {error}")]
	PropertyParseError {
		serial: usize,
		property: String,
		required_type: &'static str,
		error: String,
	},
}

pub trait EntityErrorResultExt<T> {
	/// Turns a missing-property error into the supplied default, keeping parse errors.
	fn with_default(self, default: T) -> Result<T, EntityError>;
}
impl<T> EntityErrorResultExt<T> for Result<T, EntityError> {
	fn with_default(self, default: T) -> Result<T, EntityError> {
		match self {
			Err(EntityError::RequiredPropertyNotFound { .. }) => Ok(default),
			res => res,
		}
	}
}

/// Extracts a transform from an entity using the `origin`, `angles`/`mangle`/`angle`, and `scale` properties.
pub fn read_transform(entity: &MapEntity, config: &ImportConfig) -> Transform {
	Transform {
		translation: read_translation(entity, config).unwrap_or(Vec3::ZERO),
		rotation: read_rotation(entity).unwrap_or(Quat::IDENTITY),
		scale: match entity.get::<f32>("scale") {
			Ok(scale) => Vec3::splat(scale),
			Err(EntityError::PropertyParseError { .. }) => entity.get::<Vec3>("scale").map(|v| v.z_up_to_y_up().abs()).unwrap_or(Vec3::ONE),
			Err(_) => Vec3::ONE,
		},
	}
}

/// Reads the `origin` property, converting it into scene space.
pub fn read_translation(entity: &MapEntity, config: &ImportConfig) -> Result<Vec3, EntityError> {
	Ok(config.to_scene_space(entity.get::<Vec3>("origin").with_default(Vec3::ZERO)?))
}

/// Tries to read `mangle`, `angles`, and `angle` in that order to produce a quaternion.
pub fn read_rotation(entity: &MapEntity) -> Result<Quat, EntityError> {
	Ok(match entity.get::<Vec3>("mangle") {
		// "mangle" is only yaw-pitch-roll on light entities, otherwise it's a synonym for "angles"
		Ok(x) => {
			if entity.classname().map(|s| s.starts_with("light")) == Ok(true) {
				mangle_to_quat(x)
			} else {
				angles_to_quat(x)
			}
		}
		Err(EntityError::RequiredPropertyNotFound { .. }) => match entity.get::<Vec3>("angles") {
			Ok(x) => angles_to_quat(x),
			Err(EntityError::RequiredPropertyNotFound { .. }) => angle_to_quat(entity.get::<f32>("angle").with_default(0.)?),
			Err(err) => return Err(err),
		},
		Err(err) => return Err(err),
	})
}

#[cfg(test)]
pub(crate) fn test_entity(serial: usize, pairs: &[(&str, &str)]) -> MapEntity {
	MapEntity::new(serial, pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn case_insensitive_lookup() {
		let entity = test_entity(0, &[("TargetName", "door1")]);

		assert_eq!(entity.get_str("targetname"), Some("door1"));
		assert_eq!(entity.get_str("TARGETNAME"), Some("door1"));
		assert_eq!(entity.get_str("target"), None);
		// Spelling is preserved in the stored map.
		assert!(entity.properties.contains_key("TargetName"));
	}

	#[test]
	fn typed_access() {
		let entity = test_entity(3, &[("speed", "150"), ("origin", "0 0 64")]);

		assert_eq!(entity.get::<f32>("speed"), Ok(150.));
		assert_eq!(entity.get::<Vec3>("origin"), Ok(vec3(0., 0., 64.)));
		assert!(matches!(entity.get::<f32>("wait"), Err(EntityError::RequiredPropertyNotFound { serial: 3, .. })));
		assert_eq!(entity.get::<f32>("wait").with_default(4.), Ok(4.));
		assert!(matches!(entity.get::<f32>("origin"), Err(EntityError::PropertyParseError { .. })));
	}

	#[test]
	fn prefix_keys_sorted() {
		let entity = test_entity(0, &[("target2", "b"), ("target", "a"), ("target10", "c"), ("other", "x")]);

		assert_eq!(entity.keys_with_prefix("target"), vec!["target", "target10", "target2"]);
		assert!(entity.keys_with_prefix("item").is_empty());
	}

	#[test]
	fn prefix_keys_with_multibyte_names() {
		// "aaaaaä" has no char boundary at the prefix length; it must be skipped, not panic.
		let entity = test_entity(0, &[("target", "a"), ("targetä", "b"), ("aaaaaä", "c")]);

		assert_eq!(entity.keys_with_prefix("target"), vec!["target", "targetä"]);
	}

	#[test]
	fn worldspawn_lookup() {
		let entities = MapEntities::from_key_values([
			[("classname".to_string(), "worldspawn".to_string())].into_iter().collect::<HashMap<_, _>>(),
			[("classname".to_string(), "light".to_string())].into_iter().collect(),
		]);

		assert_eq!(entities.worldspawn().map(|e| e.serial), Some(0));
		assert_eq!(entities[1].classname(), Ok("light"));
	}
}
