//! The schema model: FGD (entity definition) value types, classes, and fields, with both a
//! write path ([`writing`]) and a read path ([`parser`]).

pub mod parser;
pub mod registry;
pub mod writing;

use crate::*;

/// Contains editor-convention parsing and stringification functions for entity property values.
pub trait FgdType: Sized {
	/// If quotes should be put around this value when writing out an FGD file.
	const FGD_IS_QUOTED: bool = true;

	/// Parses a string into `Self` FGD-style. Used for parsing entity properties.
	fn fgd_parse(input: &str) -> anyhow::Result<Self>;
	/// Converts this value into a string used for writing FGDs.
	fn fgd_to_string(&self) -> String;
	/// Calls `fgd_to_string`, but if `FGD_IS_QUOTED` is true, surrounds the output with quotes.
	fn fgd_to_string_quoted(&self) -> String {
		if Self::FGD_IS_QUOTED {
			format!("\"{}\"", self.fgd_to_string())
		} else {
			self.fgd_to_string()
		}
	}
}

impl FgdType for String {
	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		Ok(input.to_string())
	}
	fn fgd_to_string(&self) -> String {
		self.clone()
	}
}

macro_rules! simple_fgd_type_impl {
	($ty:ty, $quoted:expr) => {
		impl FgdType for $ty {
			const FGD_IS_QUOTED: bool = $quoted;

			fn fgd_parse(input: &str) -> anyhow::Result<Self> {
				Ok(input.trim().parse()?)
			}
			fn fgd_to_string(&self) -> String {
				self.to_string()
			}
		}
	};
}

simple_fgd_type_impl!(u8, false);
simple_fgd_type_impl!(u16, false);
simple_fgd_type_impl!(u32, false);
simple_fgd_type_impl!(u64, false);
simple_fgd_type_impl!(usize, false);
simple_fgd_type_impl!(i8, false);
simple_fgd_type_impl!(i16, false);
simple_fgd_type_impl!(i32, false);
simple_fgd_type_impl!(i64, false);
simple_fgd_type_impl!(isize, false);

simple_fgd_type_impl!(bool, true);

simple_fgd_type_impl!(f32, true);
simple_fgd_type_impl!(f64, true);

/// [`FgdType`] wrapper for a `bool` that expects integers rather than boolean strings.
/// Non-zero is `true`, zero is `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntBool(pub bool);
impl FgdType for IntBool {
	const FGD_IS_QUOTED: bool = false;

	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		i64::fgd_parse(input).map(|v| Self(v > 0))
	}
	fn fgd_to_string(&self) -> String {
		if self.0 { "1".to_string() } else { "0".to_string() }
	}
}

impl FgdType for Aabb {
	const FGD_IS_QUOTED: bool = false;

	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		let halves: Vec<&str> = input.split(',').collect();
		if halves.len() == 2 {
			return Ok(Aabb::from_min_max(Vec3::fgd_parse(halves[0])?, Vec3::fgd_parse(halves[1])?));
		}
		let values = <[f32; 6]>::fgd_parse(input)?;
		Ok(Aabb::from_min_max(Vec3::from_slice(&values[0..3]), Vec3::from_slice(&values[3..6])))
	}
	fn fgd_to_string(&self) -> String {
		let min = self.min;
		let max = self.max;
		format!("{} {} {}, {} {} {}", min.x, min.y, min.z, max.x, max.y, max.z)
	}
}

impl FgdType for Vec4 {
	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		<[f32; 4]>::fgd_parse(input).map(Vec4::from)
	}
	fn fgd_to_string(&self) -> String {
		format!("{} {} {} {}", self.x, self.y, self.z, self.w)
	}
}
impl FgdType for Vec3 {
	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		<[f32; 3]>::fgd_parse(input).map(Vec3::from)
	}
	fn fgd_to_string(&self) -> String {
		format!("{} {} {}", self.x, self.y, self.z)
	}
}
impl FgdType for Vec2 {
	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		<[f32; 2]>::fgd_parse(input).map(Vec2::from)
	}
	fn fgd_to_string(&self) -> String {
		format!("{} {}", self.x, self.y)
	}
}

impl FgdType for Srgba {
	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		<[f32; 3]>::fgd_parse(input)
			.map(Srgba::from_f32_array_no_alpha)
			.or(<[f32; 4]>::fgd_parse(input).map(Srgba::from_f32_array))
	}
	fn fgd_to_string(&self) -> String {
		format!("{} {} {} {}", self.red, self.green, self.blue, self.alpha)
	}
}

impl<T: FgdType + Default + Copy, const N: usize> FgdType for [T; N] {
	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		let mut out = [T::default(); N];
		let mut count = 0;

		for (i, input) in input.split_ascii_whitespace().enumerate() {
			if i >= out.len() {
				return Err(anyhow::anyhow!("Too many elements! Expected: {N}"));
			}
			out[i] = T::fgd_parse(input)?;
			count += 1;
		}
		if count < N {
			return Err(anyhow::anyhow!("Too few elements! Expected: {N}, got: {count}"));
		}

		Ok(out)
	}
	fn fgd_to_string(&self) -> String {
		self.iter().map(T::fgd_to_string).join(" ")
	}
}

impl<T: FgdType> FgdType for Option<T> {
	const FGD_IS_QUOTED: bool = T::FGD_IS_QUOTED;

	fn fgd_parse(input: &str) -> anyhow::Result<Self> {
		if input.trim().is_empty() {
			return Ok(None);
		}
		T::fgd_parse(input).map(Some)
	}
	fn fgd_to_string(&self) -> String {
		match self {
			Some(v) => v.fgd_to_string(),
			None => String::new(),
		}
	}
}

/// One key of an inline choices table, either integral or textual.
#[derive(Debug, Clone, PartialEq)]
pub enum FgdValueKey {
	Integer(i32),
	String(String),
}
impl fmt::Display for FgdValueKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::String(s) => write!(f, "\"{s}\""),
			Self::Integer(v) => write!(f, "{v}"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FgdChoice {
	pub key: FgdValueKey,
	pub title: String,
}

/// One field declaration of a schema class. `ty` is the editor-facing type name
/// (`integer`, `float`, `string`, `color1`, `vector`, `choices`, `target_source`, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FgdProperty {
	pub name: String,
	pub ty: String,
	pub title: Option<String>,
	/// Stored in written form: already quoted when the type calls for quoting.
	pub default_value: Option<String>,
	pub description: Option<String>,
	pub choices: Vec<FgdChoice>,
}

/// One bit of the bit-packed `spawnflags` integer.
#[derive(Debug, Clone, PartialEq)]
pub struct FgdFlag {
	pub bit: u32,
	pub name: String,
	pub default_on: bool,
}

/// One schema class declaration, the unit of the FGD round trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FgdClass {
	pub kind: ClassKind,
	pub name: String,
	pub description: Option<String>,
	pub base: Vec<String>,
	pub model: Option<String>,
	pub color: Option<String>,
	pub iconsprite: Option<String>,
	pub size: Option<String>,
	pub properties: Vec<FgdProperty>,
	/// Ordered by bit index.
	pub flags: Vec<FgdFlag>,
	/// Verbose-mode comments (e.g. fields with no converter). Not round-tripped.
	pub comments: Vec<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scalar_parsing() {
		assert_eq!(i32::fgd_parse("-5").ok(), Some(-5));
		assert_eq!(f32::fgd_parse(" 2.5 ").ok(), Some(2.5));
		assert!(f32::fgd_parse("1 2 1").is_err());
		assert_eq!(IntBool::fgd_parse("1").ok(), Some(IntBool(true)));
		assert_eq!(IntBool::fgd_parse("0").ok(), Some(IntBool(false)));
	}

	#[test]
	fn vector_parsing() {
		assert_eq!(Vec3::fgd_parse("0 0 64").ok(), Some(vec3(0., 0., 64.)));
		assert!(Vec3::fgd_parse("0 0").is_err());
		assert_eq!(vec3(1., 2., 3.).fgd_to_string(), "1 2 3");
	}

	#[test]
	fn color_parsing() {
		assert_eq!(Srgba::fgd_parse("1 0.5 0").ok(), Some(Srgba::rgb(1., 0.5, 0.)));
		assert_eq!(Srgba::fgd_parse("1 0.5 0 0.25").ok(), Some(Srgba { red: 1., green: 0.5, blue: 0., alpha: 0.25 }));
	}

	#[test]
	fn quoting() {
		assert_eq!(5_i32.fgd_to_string_quoted(), "5");
		assert_eq!("wood".to_string().fgd_to_string_quoted(), "\"wood\"");
		assert_eq!(2.5_f32.fgd_to_string_quoted(), "\"2.5\"");
	}
}
