use crate::*;

pub trait ZUpToYUp {
	/// Converts from a z-up, y-forward coordinate space to a y-up, negative-z-forward coordinate space.
	fn z_up_to_y_up(self) -> Self;
}
impl ZUpToYUp for Vec3 {
	#[inline]
	fn z_up_to_y_up(self) -> Self {
		vec3(self.x, self.z, -self.y)
	}
}

/// An axis-aligned bounding box. The spatial input stores one per node, leaf, and model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
	pub min: Vec3,
	pub max: Vec3,
}
impl Aabb {
	pub const ZERO: Self = Self { min: Vec3::ZERO, max: Vec3::ZERO };

	pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
		Self { min, max }
	}

	/// Grows the box to contain `point`.
	pub fn expand(&mut self, point: Vec3) {
		self.min = self.min.min(point);
		self.max = self.max.max(point);
	}

	pub fn center(&self) -> Vec3 {
		(self.min + self.max) / 2.
	}

	pub fn extents(&self) -> Vec3 {
		self.max - self.min
	}
}

/// An sRGB color value, the payload of color-typed entity fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Srgba {
	pub red: f32,
	pub green: f32,
	pub blue: f32,
	pub alpha: f32,
}
impl Srgba {
	pub const WHITE: Self = Self::rgb(1., 1., 1.);

	pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
		Self { red, green, blue, alpha: 1. }
	}

	pub fn from_f32_array(v: [f32; 4]) -> Self {
		Self { red: v[0], green: v[1], blue: v[2], alpha: v[3] }
	}
	pub fn from_f32_array_no_alpha(v: [f32; 3]) -> Self {
		Self { red: v[0], green: v[1], blue: v[2], alpha: 1. }
	}
}

pub(crate) trait AlmostEqual<T> {
	type Margin;
	fn almost_eq(self, other: T, margin: Self::Margin) -> bool;
}

impl AlmostEqual<f32> for f32 {
	type Margin = f32;
	fn almost_eq(self, other: f32, margin: Self::Margin) -> bool {
		(other - self).abs() < margin
	}
}
impl AlmostEqual<Vec3> for Vec3 {
	type Margin = f32;
	fn almost_eq(self, other: Vec3, margin: Self::Margin) -> bool {
		self.x.almost_eq(other.x, margin) && self.y.almost_eq(other.y, margin) && self.z.almost_eq(other.z, margin)
	}
}
impl AlmostEqual<Quat> for Quat {
	type Margin = f32;
	fn almost_eq(self, other: Quat, margin: Self::Margin) -> bool {
		self.x.almost_eq(other.x, margin) && self.y.almost_eq(other.y, margin) && self.z.almost_eq(other.z, margin) && self.w.almost_eq(other.w, margin)
	}
}

#[allow(unused)]
macro_rules! assert_almost_eq {
	($left:expr, $right:expr, $margin:expr) => {
		match ($left, $right, $margin) {
			(left, right, margin) => {
				if !left.almost_eq(right, margin) {
					panic!("assertion `left.almost_eq(right)` failed\n  left: {left}\n right: {right}");
				}
			}
		}
	};
}
#[allow(unused)]
pub(crate) use assert_almost_eq;

/// `angles` is pitch, yaw, roll. Converts from degrees to radians. `0 0 0` [points east](https://www.gamers.org/dEngine/quake/QDP/qmapspec.html#2.1.1).
#[inline]
pub fn angles_to_quat(angles: Vec3) -> Quat {
	let yaw = Quat::from_rotation_y((angles.y - 90.).to_radians()); // We must be east-pointing
	let pitch = Quat::from_rotation_x(-angles.x.to_radians());
	let roll = Quat::from_rotation_z(-angles.z.to_radians());
	yaw * pitch * roll
}

/// `mangle` is yaw, pitch, roll. Converts from degrees to radians. `0 0 0` points east.
///
/// NOTE: TrenchBroom docs dictate that this function should only be called when the entity classname begins with "light", otherwise "mangle" is a synonym for "angles".
#[inline]
pub fn mangle_to_quat(mangle: Vec3) -> Quat {
	let yaw = Quat::from_rotation_y((mangle.x - 90.).to_radians()); // We must be east-pointing
	let pitch = Quat::from_rotation_x(mangle.y.to_radians());
	let roll = Quat::from_rotation_z(-mangle.z.to_radians());
	yaw * pitch * roll
}

/// `angle` is the rotation around the Y axis. Converts from degrees to radians. `0` points east.
/// # Special Values
/// - -1: Up
/// - -2: Down
#[inline]
pub fn angle_to_quat(angle: f32) -> Quat {
	match angle {
		-1. => Quat::from_rotation_x(FRAC_PI_2),
		-2. => Quat::from_rotation_x(-FRAC_PI_2),
		angle => Quat::from_rotation_y((angle - 90.).to_radians()),
	}
}

/// Converts `CamelCase`/`mixedCase` identifiers into `snake_case`. Already-snake-case input passes through unchanged.
pub fn to_snake_case(name: &str) -> String {
	let mut out = String::with_capacity(name.len() + 4);
	let mut prev_lower = false;

	for ch in name.chars() {
		if ch.is_ascii_uppercase() {
			if prev_lower {
				out.push('_');
			}
			out.push(ch.to_ascii_lowercase());
			prev_lower = false;
		} else {
			prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
			out.push(ch);
		}
	}

	out
}

/// Converts `snake_case` identifiers into `PascalCase`, used when naming generated enum stubs.
pub fn to_pascal_case(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut upper_next = true;

	for ch in name.chars() {
		if ch == '_' {
			upper_next = true;
		} else if upper_next {
			out.push(ch.to_ascii_uppercase());
			upper_next = false;
		} else {
			out.push(ch);
		}
	}

	out
}
