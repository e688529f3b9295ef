//! Serializes schema classes to FGD text, either from the owned [`FgdClass`] model or
//! straight from registered class tables.

use std::fmt::Write;

use crate::*;

/// Converts one registered class into the owned schema model, resolving each value field's
/// converter. Fields with no resolvable converter become comments in verbose mode and are
/// skipped otherwise; they never abort the class.
pub fn class_to_fgd(info: &ClassInfo, registry: &ConverterRegistry, config: &ImportConfig) -> FgdClass {
	let mut class = FgdClass {
		kind: info.kind,
		name: info.name.to_string(),
		description: info.description.map(str::to_string),
		base: info.base.iter().map(|base| base.info.name.to_string()).collect(),
		model: info.model.map(str::to_string),
		color: info.color.map(str::to_string),
		iconsprite: info.iconsprite.map(str::to_string),
		size: info.size.map(str::to_string),
		..Default::default()
	};

	// The flag set depends on the global flags default, so schema output stays symmetric
	// with decoding.
	let flag_names: HashSet<&str> = info
		.flag_fields_with(config.default_flags_binding)
		.map(|(_, field)| field.name)
		.collect();

	for field in info.fields {
		if field.binding == FieldBinding::Excluded || flag_names.contains(field.name) {
			continue;
		}
		let key = field.override_key.map(str::to_string).unwrap_or_else(|| config.field_naming.apply(field.name));
		match registry.converter(field.ty) {
			Some(converter) => class.properties.push(converter.schema_property(field, &key)),
			None => {
				if config.verbose_schema_comments {
					class.comments.push(format!("no converter for `{key}`"));
				}
			}
		}
	}

	for (bit, field) in info.flag_fields_with(config.default_flags_binding) {
		class.flags.push(FgdFlag {
			bit,
			name: field.title.unwrap_or(field.name).to_string(),
			default_on: field.default_value.map(|default| default() == "1").unwrap_or(false),
		});
	}

	class
}

/// Serializes registered classes, eliding base classes nothing in the set derives from.
pub fn write_classes(classes: &[&ErasedClass], registry: &ConverterRegistry, config: &ImportConfig) -> String {
	let mut derived_bases = HashSet::new();
	fn record_bases(class: &ErasedClass, out: &mut HashSet<&'static str>) {
		for base in class.info.base {
			if out.insert(base.info.name) {
				record_bases(base, out);
			}
		}
	}
	for class in classes {
		record_bases(class, &mut derived_bases);
	}

	let fgd_classes: Vec<FgdClass> = classes
		.iter()
		.filter(|class| !class.info.kind.is_base() || derived_bases.contains(class.info.name))
		.map(|class| class_to_fgd(&class.info, registry, config))
		.collect();
	write_fgd(&fgd_classes)
}

/// Serializes owned schema classes in declaration order.
pub fn write_fgd(classes: &[FgdClass]) -> String {
	let mut out = String::new();
	for class in classes {
		write_class(&mut out, class);
		out.push('\n');
	}
	out
}

fn write_class(out: &mut String, class: &FgdClass) {
	// The class header line.
	write!(out, "@{}Class ", class.kind).ok();
	if !class.base.is_empty() {
		write!(out, "base({}) ", class.base.join(", ")).ok();
	}
	if let Some(model) = &class.model {
		write!(out, "model({model}) ").ok();
	}
	if let Some(color) = &class.color {
		write!(out, "color({color}) ").ok();
	}
	if let Some(iconsprite) = &class.iconsprite {
		write!(out, "iconsprite(\"{iconsprite}\") ").ok();
	}
	if let Some(size) = &class.size {
		write!(out, "size({size}) ").ok();
	}
	write!(out, "= {}", class.name).ok();
	if let Some(description) = &class.description {
		write!(out, " : \"{description}\"").ok();
	}
	out.push('\n');

	out.push_str("[\n");
	for comment in &class.comments {
		writeln!(out, "\t// {comment}").ok();
	}
	for property in &class.properties {
		write_property(out, property);
	}
	if !class.flags.is_empty() {
		out.push_str("\tspawnflags(Flags) =\n\t[\n");
		for flag in &class.flags {
			writeln!(out, "\t\t{} : \"{}\" : {}", 1u32 << flag.bit, flag.name, if flag.default_on { 1 } else { 0 }).ok();
		}
		out.push_str("\t]\n");
	}
	out.push_str("]\n");
}

/// One field line: `name(type) : "title" : default : "description"`, trailing empty
/// segments dropped, inline choices table appended when present.
fn write_property(out: &mut String, property: &FgdProperty) {
	write!(out, "\t{}({})", property.name, property.ty).ok();

	let segments = [
		property.title.as_ref().map(|title| format!("\"{title}\"")),
		property.default_value.clone(),
		property.description.as_ref().map(|description| format!("\"{description}\"")),
	];
	let last_present = segments.iter().rposition(Option::is_some);
	if let Some(last) = last_present {
		for segment in &segments[..=last] {
			match segment {
				Some(text) => write!(out, " : {text}").ok(),
				None => write!(out, " :").ok(),
			};
		}
	}

	if !property.choices.is_empty() {
		out.push_str(" =\n\t[\n");
		for choice in &property.choices {
			writeln!(out, "\t\t{} : \"{}\"", choice.key, choice.title).ok();
		}
		out.push_str("\t]");
	}
	out.push('\n');
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn class_serialization() {
		let class = FgdClass {
			kind: ClassKind::Point,
			name: "light".to_string(),
			description: Some("Point light source".to_string()),
			base: vec!["__transform".to_string()],
			color: Some("255 255 40".to_string()),
			properties: vec![FgdProperty {
				name: "light".to_string(),
				ty: "float".to_string(),
				title: Some("Brightness".to_string()),
				default_value: Some("\"300\"".to_string()),
				..Default::default()
			}],
			flags: vec![FgdFlag { bit: 1, name: "Initially dark".to_string(), default_on: true }],
			..Default::default()
		};

		let text = write_fgd(&[class]);
		assert!(text.starts_with("@PointClass base(__transform) color(255 255 40) = light : \"Point light source\"\n"));
		assert!(text.contains("\tlight(float) : \"Brightness\" : \"300\"\n"));
		// Flag value is 1 shifted by the bit index.
		assert!(text.contains("\t\t2 : \"Initially dark\" : 1\n"));
	}

	#[test]
	fn flags_from_descriptors() {
		let config = ImportConfig::default();
		let registry = ConverterRegistry::new();
		let class = class_to_fgd(&class::builtin::FuncDoor::CLASS_INFO, &registry, &config);

		assert_eq!(class.flags.len(), 3);
		assert_eq!(class.flags[0].bit, 0);
		assert_eq!(class.flags[2].name, "Toggle");
		// Flag fields never appear in the plain property list.
		assert!(class.properties.iter().all(|p| p.name != "start_open"));
	}

	#[test]
	fn unused_bases_are_elided() {
		let config = ImportConfig::default();
		let registry = ConverterRegistry::new();

		let classes = [
			class::builtin::TransformBase::ERASED_CLASS,
			class::builtin::TargetableBase::ERASED_CLASS,
			class::builtin::FuncIllusionary::ERASED_CLASS,
		];
		let text = write_classes(&classes, &registry, &config);

		// func_illusionary has no bases, so neither base class is derived from.
		assert!(!text.contains("__transform"));
		assert!(!text.contains("__targetname"));
		assert!(text.contains("= func_illusionary"));
	}

	#[test]
	fn override_keys_name_schema_fields() {
		let config = ImportConfig::default();
		let registry = ConverterRegistry::new();
		let class = class_to_fgd(&class::builtin::Light::CLASS_INFO, &registry, &config);

		assert_eq!(class.properties.len(), 3);
		// The brightness field is written under its override key.
		assert!(class.properties.iter().any(|p| p.name == "light"));
		assert!(class.properties.iter().all(|p| p.name != "brightness"));
	}
}
