//! Classes every game shares: the world entity, common base classes, and a small set of
//! stock point/solid classes. Base classes carry a `__` prefix to keep them out of the way
//! of game classnames.

use crate::*;

/// Every class preloaded by [`ClassRegistry::with_builtins`].
pub static BUILTIN_CLASSES: &[&ErasedClass] = &[
	TransformBase::ERASED_CLASS,
	TargetableBase::ERASED_CLASS,
	Worldspawn::ERASED_CLASS,
	Light::ERASED_CLASS,
	InfoPlayerStart::ERASED_CLASS,
	MiscModel::ERASED_CLASS,
	FuncDoor::ERASED_CLASS,
	FuncIllusionary::ERASED_CLASS,
	FuncWater::ERASED_CLASS,
	TriggerMultiple::ERASED_CLASS,
];

/// Base class binding the entity's transform keys (`origin`, `angles`, `scale`) onto the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformBase;
impl EntityClass for TransformBase {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Base,
		name: "__transform",
		description: None,
		base: &[],
		solid_kind: SolidKind::Solid,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[
			FieldDescriptor::new("origin", TypeTag::Vector).title("Origin"),
			FieldDescriptor::new("angles", TypeTag::Vector).title("Angles (pitch yaw roll)"),
			FieldDescriptor::new("scale", TypeTag::Float).title("Scale"),
		],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let transform = entity::read_transform(view.entity(), view.config());
		view.set_transform(transform);
		Ok(())
	}
}

/// The attachable identity of an entity, used for parenting and targeting.
#[derive(Debug, Clone, Default)]
pub struct Targetable {
	pub targetname: Option<String>,
}

/// Base class exposing the identity key.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetableBase;
impl EntityClass for TargetableBase {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Base,
		name: "__targetname",
		description: None,
		base: &[],
		solid_kind: SolidKind::Solid,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[FieldDescriptor::new("targetname", TypeTag::ObjectRef(RefKind::Target)).title("Name")],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let targetable = Targetable {
			targetname: view.field(&Self::CLASS_INFO, "targetname"),
		};
		view.insert(targetable);
		Ok(())
	}
}

/// The world entity. Its key/values bind onto the world node rather than a node of its own.
#[derive(Debug, Clone, SmartDefault)]
pub struct Worldspawn {
	pub message: String,
	/// (Default: 800, source units/s²)
	#[default(800.)]
	pub gravity: f32,
}
impl EntityClass for Worldspawn {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Solid,
		name: "worldspawn",
		description: Some("World entity"),
		base: &[],
		solid_kind: SolidKind::Solid,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[
			FieldDescriptor::new("message", TypeTag::String).title("Level name"),
			FieldDescriptor::new("gravity", TypeTag::Float)
				.title("Gravity")
				.default_value(|| 800_f32.fgd_to_string_quoted()),
		],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let mut world = Self::default();
		if let Some(message) = view.field(&Self::CLASS_INFO, "message") {
			world.message = message;
		}
		if let Some(gravity) = view.field(&Self::CLASS_INFO, "gravity") {
			world.gravity = gravity;
		}
		view.insert(world);
		Ok(())
	}
}

pub static LIGHT_STYLE: EnumTable = EnumTable {
	name: "LightStyle",
	variants: &[
		(0, "Normal"),
		(1, "Flicker"),
		(2, "SlowStrongPulse"),
		(3, "Candle"),
		(10, "FluorescentFlicker"),
	],
};

#[derive(Debug, Clone, SmartDefault)]
pub struct Light {
	#[default(Srgba::WHITE)]
	pub color: Srgba,
	/// (Default: 300)
	#[default(300.)]
	pub brightness: f32,
	/// Ordinal into [`LIGHT_STYLE`].
	pub style: i32,
}
impl EntityClass for Light {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Point,
		name: "light",
		description: Some("Point light source"),
		base: &[TransformBase::ERASED_CLASS, TargetableBase::ERASED_CLASS],
		solid_kind: SolidKind::Solid,
		model: None,
		color: Some("255 255 40"),
		iconsprite: None,
		size: Some("-8 -8 -8, 8 8 8"),
		fields: &[
			FieldDescriptor::new("color", TypeTag::Color)
				.title("Color")
				.override_key("_color")
				.default_value(|| Srgba::WHITE.fgd_to_string_quoted()),
			FieldDescriptor::new("brightness", TypeTag::Float)
				.title("Brightness")
				.override_key("light")
				.default_value(|| 300_f32.fgd_to_string_quoted()),
			FieldDescriptor::new("style", TypeTag::Enum(&LIGHT_STYLE)).title("Appearance"),
		],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let mut light = Self::default();
		if let Some(color) = view.field(&Self::CLASS_INFO, "color") {
			light.color = color;
		}
		if let Some(brightness) = view.field(&Self::CLASS_INFO, "brightness") {
			light.brightness = brightness;
		}
		if let Some(style) = view.field(&Self::CLASS_INFO, "style") {
			light.style = style;
		}
		view.insert(light);
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InfoPlayerStart;
impl EntityClass for InfoPlayerStart {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Point,
		name: "info_player_start",
		description: Some("Player spawn point"),
		base: &[TransformBase::ERASED_CLASS],
		solid_kind: SolidKind::Solid,
		model: None,
		color: Some("0 255 0"),
		iconsprite: None,
		size: Some("-16 -16 -24, 16 16 32"),
		fields: &[],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		view.insert(Self);
		Ok(())
	}
}

/// A point entity placing an external model asset, resolved through the host's
/// [`AssetSource`](crate::spawn::AssetSource).
#[derive(Debug, Clone, Default)]
pub struct MiscModel {
	pub model: String,
}
impl EntityClass for MiscModel {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Point,
		name: "misc_model",
		description: Some("Decorative model"),
		base: &[TransformBase::ERASED_CLASS, TargetableBase::ERASED_CLASS],
		solid_kind: SolidKind::Solid,
		model: Some("{ \"path\": model }"),
		color: None,
		iconsprite: None,
		size: None,
		fields: &[FieldDescriptor::new("model", TypeTag::ObjectRef(RefKind::Model)).title("Model path")],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let model = Self {
			model: view.field(&Self::CLASS_INFO, "model").unwrap_or_default(),
		};
		view.insert(model);
		Ok(())
	}
}

#[derive(Debug, Clone, SmartDefault)]
pub struct FuncDoor {
	/// (Default: 100, source units/s)
	#[default(100.)]
	pub speed: f32,
	/// Seconds before the door closes again. (Default: 3)
	#[default(3.)]
	pub wait: f32,
	pub start_open: bool,
	pub passable: bool,
	pub toggle: bool,
}
impl EntityClass for FuncDoor {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Solid,
		name: "func_door",
		description: Some("Sliding door"),
		base: &[TargetableBase::ERASED_CLASS],
		solid_kind: SolidKind::Solid,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[
			FieldDescriptor::new("speed", TypeTag::Float)
				.title("Speed")
				.default_value(|| 100_f32.fgd_to_string_quoted()),
			FieldDescriptor::new("wait", TypeTag::Float)
				.title("Wait before close")
				.default_value(|| 3_f32.fgd_to_string_quoted()),
			FieldDescriptor::new("start_open", TypeTag::Bool).title("Starts open").flag(),
			FieldDescriptor::new("passable", TypeTag::Bool).title("Passable").flag(),
			FieldDescriptor::new("toggle", TypeTag::Bool).title("Toggle").flag(),
		],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let mut door = Self::default();
		if let Some(speed) = view.field(&Self::CLASS_INFO, "speed") {
			door.speed = speed;
		}
		if let Some(wait) = view.field(&Self::CLASS_INFO, "wait") {
			door.wait = wait;
		}
		door.start_open = view.field(&Self::CLASS_INFO, "start_open").unwrap_or(false);
		door.passable = view.field(&Self::CLASS_INFO, "passable").unwrap_or(false);
		door.toggle = view.field(&Self::CLASS_INFO, "toggle").unwrap_or(false);
		view.insert(door);
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuncIllusionary;
impl EntityClass for FuncIllusionary {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Solid,
		name: "func_illusionary",
		description: Some("Invisible solid geometry"),
		base: &[],
		solid_kind: SolidKind::Illusionary,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		view.insert(Self);
		Ok(())
	}
}

#[derive(Debug, Clone, SmartDefault)]
pub struct FuncWater {
	/// (Default: 0, source units)
	pub wave_height: f32,
}
impl EntityClass for FuncWater {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Solid,
		name: "func_water",
		description: Some("Swimmable liquid volume"),
		base: &[],
		solid_kind: SolidKind::Liquid,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[FieldDescriptor::new("wave_height", TypeTag::Float).title("Wave height")],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let mut water = Self::default();
		if let Some(wave_height) = view.field(&Self::CLASS_INFO, "wave_height") {
			water.wave_height = wave_height;
		}
		view.insert(water);
		Ok(())
	}
}

#[derive(Debug, Clone, SmartDefault)]
pub struct TriggerMultiple {
	/// Identity values this trigger fires at, from the `target`, `target2`, ... keys.
	pub targets: Vec<String>,
	/// Seconds between firings. (Default: 0.2)
	#[default(0.2)]
	pub delay: f32,
}
impl EntityClass for TriggerMultiple {
	const CLASS_INFO: ClassInfo = ClassInfo {
		kind: ClassKind::Solid,
		name: "trigger_multiple",
		description: Some("Repeatable touch trigger"),
		base: &[TargetableBase::ERASED_CLASS],
		solid_kind: SolidKind::Trigger,
		model: None,
		color: None,
		iconsprite: None,
		size: None,
		fields: &[
			FieldDescriptor::new("target", TypeTag::Array(&TypeTag::ObjectRef(RefKind::Target))).title("Targets"),
			FieldDescriptor::new("delay", TypeTag::Float)
				.title("Delay between firings")
				.default_value(|| 0.2_f32.fgd_to_string_quoted()),
		],
	};
	fn bind(view: &mut BindView) -> anyhow::Result<()> {
		let mut trigger = Self::default();
		trigger.targets = view.field(&Self::CLASS_INFO, "target").unwrap_or_default();
		if let Some(delay) = view.field(&Self::CLASS_INFO, "delay") {
			trigger.delay = delay;
		}
		view.insert(trigger);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn door_flag_bits_follow_declaration_order() {
		let info = FuncDoor::CLASS_INFO;
		assert_eq!(info.flag_bit("start_open"), Some(0));
		assert_eq!(info.flag_bit("passable"), Some(1));
		assert_eq!(info.flag_bit("toggle"), Some(2));
	}

	#[test]
	fn builtins_register_cleanly() {
		let registry = ClassRegistry::with_builtins();
		for class in BUILTIN_CLASSES {
			assert!(registry.contains(class.info.name), "{} missing", class.info.name);
		}
		assert!(registry.get("worldspawn").unwrap().info.kind.is_solid());
		assert!(registry.get("light").unwrap().info.kind.is_point());
	}
}
