//! Parses FGD text back into the owned schema model, recovering inline choices tables as
//! standalone named enumerations and regenerating Rust source stubs grouped by class
//! category.

use crate::*;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {message}")]
pub struct FgdParseError {
	pub line: usize,
	pub message: String,
}

/// A named enumeration recovered from an inline choices table.
#[derive(Debug, Clone, PartialEq)]
pub struct FgdEnum {
	pub name: String,
	pub variants: Vec<FgdChoice>,
}

/// The result of one parse: classes in declaration order plus the recovered enumerations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFgd {
	pub classes: Vec<FgdClass>,
	pub enums: Vec<FgdEnum>,
}

pub fn parse_fgd(input: &str) -> Result<ParsedFgd, FgdParseError> {
	let mut scanner = Scanner::new(input);
	let mut parsed = ParsedFgd::default();

	while let Some(token) = scanner.next_token()? {
		match token.kind {
			TokenKind::Symbol('@') => {
				let class = parse_class(&mut scanner, &mut parsed.enums)?;
				parsed.classes.push(class);
			}
			_ => return Err(scanner.error_at(token.line, "expected a class declaration starting with `@`")),
		}
	}

	Ok(parsed)
}

fn parse_class(scanner: &mut Scanner, enums: &mut Vec<FgdEnum>) -> Result<FgdClass, FgdParseError> {
	let keyword = scanner.expect_ident()?;
	let kind = match keyword.as_str() {
		"BaseClass" => ClassKind::Base,
		"PointClass" => ClassKind::Point,
		"SolidClass" => ClassKind::Solid,
		other => return Err(scanner.error(format!("unknown class keyword `@{other}`"))),
	};

	let mut class = FgdClass { kind, ..Default::default() };

	// Display hints up to the `=` separating them from the class name.
	loop {
		let token = scanner.require_token("a class hint or `=`")?;
		match token.kind {
			TokenKind::Symbol('=') => break,
			TokenKind::Ident(hint) => {
				let raw = scanner.capture_parens()?;
				match hint.as_str() {
					"base" => class.base = raw.split(',').map(|name| name.trim().to_string()).collect(),
					"model" => class.model = Some(raw),
					"color" => class.color = Some(raw),
					"iconsprite" => class.iconsprite = Some(raw.trim().trim_matches('"').to_string()),
					"size" => class.size = Some(raw),
					other => return Err(scanner.error(format!("unknown class hint `{other}`"))),
				}
			}
			_ => return Err(scanner.error_at(token.line, "expected a class hint or `=`")),
		}
	}

	class.name = scanner.expect_ident()?;
	if scanner.peek_symbol(':')? {
		scanner.next_token()?;
		class.description = Some(scanner.expect_quoted()?);
	}

	scanner.expect_symbol('[')?;
	loop {
		let token = scanner.require_token("a field declaration or `]`")?;
		match token.kind {
			TokenKind::Symbol(']') => break,
			TokenKind::Ident(name) => {
				let ty = scanner.capture_parens()?.trim().to_string();
				if name == "spawnflags" && ty == "Flags" {
					parse_flags(scanner, &mut class)?;
				} else {
					let property = parse_property(scanner, &class.name, name, ty, enums)?;
					class.properties.push(property);
				}
			}
			_ => return Err(scanner.error_at(token.line, "expected a field declaration or `]`")),
		}
	}

	Ok(class)
}

/// `spawnflags(Flags) = [ value : "name" : default ... ]`. Written values are `1 << bit`;
/// the bit index is recovered from the value's trailing zeros.
fn parse_flags(scanner: &mut Scanner, class: &mut FgdClass) -> Result<(), FgdParseError> {
	scanner.expect_symbol('=')?;
	scanner.expect_symbol('[')?;
	loop {
		let token = scanner.require_token("a flag entry or `]`")?;
		match token.kind {
			TokenKind::Symbol(']') => break,
			TokenKind::Ident(value) => {
				let value: u32 = value
					.parse()
					.map_err(|_| scanner.error(format!("flag value `{value}` is not an unsigned integer")))?;
				if value == 0 || !value.is_power_of_two() {
					return Err(scanner.error(format!("flag value `{value}` is not a power of two")));
				}
				scanner.expect_symbol(':')?;
				let name = scanner.expect_quoted()?;
				let mut default_on = false;
				if scanner.peek_symbol(':')? {
					scanner.next_token()?;
					default_on = scanner.expect_ident()? != "0";
				}
				class.flags.push(FgdFlag { bit: value.trailing_zeros(), name, default_on });
			}
			_ => return Err(scanner.error_at(token.line, "expected a flag entry or `]`")),
		}
	}
	Ok(())
}

fn parse_property(
	scanner: &mut Scanner,
	class_name: &str,
	name: String,
	ty: String,
	enums: &mut Vec<FgdEnum>,
) -> Result<FgdProperty, FgdParseError> {
	let mut property = FgdProperty { name, ty, ..Default::default() };

	// Up to three `:`-separated segments: quoted title, default in written form, quoted
	// description. An empty segment stands for an absent one.
	for segment in 0..3 {
		if !scanner.peek_symbol(':')? {
			break;
		}
		scanner.next_token()?;

		let value = match scanner.peek()? {
			Some(TokenKind::Symbol(':' | '=' | ']')) | None => None,
			Some(TokenKind::Quoted(_)) => {
				let Some(TokenKind::Quoted(text)) = scanner.next_token()?.map(|t| t.kind) else {
					unreachable!()
				};
				Some((text, true))
			}
			Some(TokenKind::Ident(_)) => {
				let Some(TokenKind::Ident(text)) = scanner.next_token()?.map(|t| t.kind) else {
					unreachable!()
				};
				Some((text, false))
			}
			Some(TokenKind::Symbol(other)) => {
				return Err(scanner.error(format!("unexpected `{other}` in field declaration")));
			}
		};

		match (segment, value) {
			(_, None) => {}
			(0, Some((text, true))) => property.title = Some(text),
			(0, Some((text, false))) => {
				return Err(scanner.error(format!("field title `{text}` must be quoted")));
			}
			// Defaults keep their written form, quotes included.
			(1, Some((text, true))) => property.default_value = Some(format!("\"{text}\"")),
			(1, Some((text, false))) => property.default_value = Some(text),
			(2, Some((text, true))) => property.description = Some(text),
			(2, Some((text, false))) => {
				return Err(scanner.error(format!("field description `{text}` must be quoted")));
			}
			_ => unreachable!(),
		}
	}

	if scanner.peek_symbol('=')? {
		scanner.next_token()?;
		scanner.expect_symbol('[')?;
		loop {
			let token = scanner.require_token("a choice entry or `]`")?;
			match token.kind {
				TokenKind::Symbol(']') => break,
				TokenKind::Ident(key) => {
					let key = match key.parse::<i32>() {
						Ok(value) => FgdValueKey::Integer(value),
						Err(_) => FgdValueKey::String(key),
					};
					scanner.expect_symbol(':')?;
					let title = scanner.expect_quoted()?;
					property.choices.push(FgdChoice { key, title });
				}
				TokenKind::Quoted(key) => {
					scanner.expect_symbol(':')?;
					let title = scanner.expect_quoted()?;
					property.choices.push(FgdChoice { key: FgdValueKey::String(key), title });
				}
				_ => return Err(scanner.error_at(token.line, "expected a choice entry or `]`")),
			}
		}

		// A non-boolean choices table becomes a standalone named enumeration.
		if !is_bool_choices(&property.choices) {
			enums.push(FgdEnum {
				name: format!("{}{}", to_pascal_case(class_name), to_pascal_case(&property.name)),
				variants: property.choices.clone(),
			});
		}
	}

	Ok(property)
}

/// The `0 : "false" / 1 : "true"` table boolean fields are written as.
fn is_bool_choices(choices: &[FgdChoice]) -> bool {
	choices.len() == 2
		&& choices[0].key == FgdValueKey::Integer(0)
		&& choices[1].key == FgdValueKey::Integer(1)
		&& choices[0].title.eq_ignore_ascii_case("false")
		&& choices[1].title.eq_ignore_ascii_case("true")
}

// ----------------------------------------------------------------------------
// Stub generation
// ----------------------------------------------------------------------------

/// Regenerates Rust source stubs from parsed classes, grouped by the class category: the
/// text before the first `_` in the class name. Returns `(category, source)` pairs sorted
/// by category.
pub fn generate_stubs(parsed: &ParsedFgd) -> Vec<(String, String)> {
	use std::fmt::Write;

	fn source_of(categories: &mut Vec<(String, String)>, category: String) -> usize {
		match categories.iter().position(|(name, _)| *name == category) {
			Some(index) => index,
			None => {
				categories.push((category, String::new()));
				categories.len() - 1
			}
		}
	}

	let enum_of = |property: &FgdProperty, class: &FgdClass| -> String {
		format!("{}{}", to_pascal_case(&class.name), to_pascal_case(&property.name))
	};

	let mut categories: Vec<(String, String)> = Vec::new();
	for class in &parsed.classes {
		let index = source_of(&mut categories, category_of(&class.name));
		let source = &mut categories[index].1;

		// Inline enumerations first, so the struct below can reference them.
		for property in &class.properties {
			if property.ty == "choices" && !is_bool_choices(&property.choices) {
				let name = enum_of(property, class);
				writeln!(source, "#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]").ok();
				writeln!(source, "pub enum {name} {{").ok();
				for (i, choice) in property.choices.iter().enumerate() {
					if i == 0 {
						writeln!(source, "\t#[default]").ok();
					}
					match &choice.key {
						FgdValueKey::Integer(value) => writeln!(source, "\t{} = {value},", rust_ident(&choice.title, true)).ok(),
						FgdValueKey::String(_) => writeln!(source, "\t{},", rust_ident(&choice.title, true)).ok(),
					};
				}
				writeln!(source, "}}\n").ok();
			}
		}

		if let Some(description) = &class.description {
			writeln!(source, "/// {description}").ok();
		}
		if !class.base.is_empty() {
			writeln!(source, "/// Bases: {}", class.base.join(", ")).ok();
		}
		writeln!(source, "#[derive(Debug, Clone, Default)]").ok();
		writeln!(source, "pub struct {} {{", rust_ident(&class.name, true)).ok();
		for property in &class.properties {
			if let Some(title) = &property.title {
				writeln!(source, "\t/// {title}").ok();
			}
			let ty = match property.ty.as_str() {
				"integer" => "i32".to_string(),
				"float" => "f32".to_string(),
				"color1" => "Srgba".to_string(),
				"vector" => "Vec3".to_string(),
				"choices" if is_bool_choices(&property.choices) => "bool".to_string(),
				"choices" => enum_of(property, class),
				// Strings and every object-reference type.
				_ => "String".to_string(),
			};
			writeln!(source, "\tpub {}: {ty},", rust_ident(&property.name, false)).ok();
		}
		for flag in &class.flags {
			writeln!(source, "\t/// `spawnflags` bit {}", flag.bit).ok();
			writeln!(source, "\tpub {}: bool,", rust_ident(&flag.name, false)).ok();
		}
		writeln!(source, "}}\n").ok();
	}

	categories.sort_by(|(a, _), (b, _)| a.cmp(b));
	categories
}

fn category_of(class_name: &str) -> String {
	let trimmed = class_name.trim_start_matches('_');
	match trimmed.split_once('_') {
		Some((category, _)) if !category.is_empty() => category.to_string(),
		_ => trimmed.to_string(),
	}
}

/// Sanitizes free text (flag names can be anything) into a Rust identifier.
fn rust_ident(text: &str, pascal: bool) -> String {
	let sanitized: String = text
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
		.collect();
	let joined = sanitized.split_whitespace().join("_");
	let ident = if pascal { to_pascal_case(&joined) } else { to_snake_case(&joined) };
	if ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
		format!("_{ident}")
	} else if ident.is_empty() {
		"unnamed".to_string()
	} else {
		ident
	}
}

// ----------------------------------------------------------------------------
// Tokenizer
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
	Symbol(char),
	Ident(String),
	Quoted(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
	kind: TokenKind,
	line: usize,
}

/// A cursor over the source text, producing tokens on demand so hint arguments can be
/// captured raw.
struct Scanner<'a> {
	src: &'a str,
	pos: usize,
	line: usize,
}

impl<'a> Scanner<'a> {
	fn new(src: &'a str) -> Self {
		Self { src, pos: 0, line: 1 }
	}

	fn error(&self, message: impl Into<String>) -> FgdParseError {
		FgdParseError { line: self.line, message: message.into() }
	}
	fn error_at(&self, line: usize, message: impl Into<String>) -> FgdParseError {
		FgdParseError { line, message: message.into() }
	}

	fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}

	fn bump(&mut self, c: char) {
		if c == '\n' {
			self.line += 1;
		}
		self.pos += c.len_utf8();
	}

	fn skip_whitespace_and_comments(&mut self) {
		loop {
			let rest = self.rest();
			let Some(c) = rest.chars().next() else { return };
			if c.is_whitespace() {
				self.bump(c);
			} else if rest.starts_with("//") {
				for c in rest.chars() {
					if c == '\n' {
						break;
					}
					self.bump(c);
				}
			} else {
				return;
			}
		}
	}

	fn next_token(&mut self) -> Result<Option<Token>, FgdParseError> {
		self.skip_whitespace_and_comments();
		let line = self.line;
		let Some(c) = self.rest().chars().next() else {
			return Ok(None);
		};

		if matches!(c, '@' | '(' | ')' | '[' | ']' | '=' | ':' | ',') {
			self.bump(c);
			return Ok(Some(Token { kind: TokenKind::Symbol(c), line }));
		}

		if c == '"' {
			self.bump(c);
			let mut text = String::new();
			loop {
				let Some(c) = self.rest().chars().next() else {
					return Err(self.error_at(line, "unterminated string"));
				};
				self.bump(c);
				if c == '"' {
					break;
				}
				text.push(c);
			}
			return Ok(Some(Token { kind: TokenKind::Quoted(text), line }));
		}

		let mut text = String::new();
		while let Some(c) = self.rest().chars().next() {
			if c.is_whitespace() || matches!(c, '@' | '(' | ')' | '[' | ']' | '=' | ':' | ',' | '"') {
				break;
			}
			self.bump(c);
			text.push(c);
		}
		Ok(Some(Token { kind: TokenKind::Ident(text), line }))
	}

	fn peek(&mut self) -> Result<Option<TokenKind>, FgdParseError> {
		let saved = (self.pos, self.line);
		let token = self.next_token()?;
		(self.pos, self.line) = saved;
		Ok(token.map(|t| t.kind))
	}

	fn peek_symbol(&mut self, symbol: char) -> Result<bool, FgdParseError> {
		Ok(self.peek()? == Some(TokenKind::Symbol(symbol)))
	}

	fn require_token(&mut self, expected: &str) -> Result<Token, FgdParseError> {
		self.next_token()?.ok_or_else(|| self.error(format!("expected {expected}, found end of input")))
	}

	fn expect_symbol(&mut self, symbol: char) -> Result<(), FgdParseError> {
		let token = self.require_token(&format!("`{symbol}`"))?;
		match token.kind {
			TokenKind::Symbol(c) if c == symbol => Ok(()),
			other => Err(self.error_at(token.line, format!("expected `{symbol}`, found {other:?}"))),
		}
	}

	fn expect_ident(&mut self) -> Result<String, FgdParseError> {
		let token = self.require_token("an identifier")?;
		match token.kind {
			TokenKind::Ident(text) => Ok(text),
			other => Err(self.error_at(token.line, format!("expected an identifier, found {other:?}"))),
		}
	}

	fn expect_quoted(&mut self) -> Result<String, FgdParseError> {
		let token = self.require_token("a quoted string")?;
		match token.kind {
			TokenKind::Quoted(text) => Ok(text),
			other => Err(self.error_at(token.line, format!("expected a quoted string, found {other:?}"))),
		}
	}

	/// Captures the raw text between balanced parentheses, verbatim. Parentheses inside
	/// quoted strings don't count toward the balance.
	fn capture_parens(&mut self) -> Result<String, FgdParseError> {
		self.skip_whitespace_and_comments();
		let start_line = self.line;
		match self.rest().chars().next() {
			Some('(') => self.bump('('),
			_ => return Err(self.error("expected `(`")),
		}

		let mut depth = 1_usize;
		let mut in_quote = false;
		let mut captured = String::new();
		loop {
			let Some(c) = self.rest().chars().next() else {
				return Err(self.error_at(start_line, "unbalanced `(`"));
			};
			self.bump(c);
			match c {
				'"' => in_quote = !in_quote,
				'(' if !in_quote => depth += 1,
				')' if !in_quote => {
					depth -= 1;
					if depth == 0 {
						return Ok(captured);
					}
				}
				_ => {}
			}
			captured.push(c);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fgd::writing::write_fgd;

	fn sample_classes() -> Vec<FgdClass> {
		vec![
			FgdClass {
				kind: ClassKind::Base,
				name: "__transform".to_string(),
				properties: vec![FgdProperty {
					name: "origin".to_string(),
					ty: "vector".to_string(),
					title: Some("Origin".to_string()),
					..Default::default()
				}],
				..Default::default()
			},
			FgdClass {
				kind: ClassKind::Point,
				name: "light".to_string(),
				description: Some("Point light source".to_string()),
				base: vec!["__transform".to_string()],
				color: Some("255 255 40".to_string()),
				size: Some("-8 -8 -8, 8 8 8".to_string()),
				properties: vec![
					FgdProperty {
						name: "light".to_string(),
						ty: "float".to_string(),
						title: Some("Brightness".to_string()),
						default_value: Some("\"300\"".to_string()),
						description: Some("Falloff radius".to_string()),
						..Default::default()
					},
					FgdProperty {
						name: "style".to_string(),
						ty: "choices".to_string(),
						// No title, default present: writer emits an empty first segment.
						default_value: Some("0".to_string()),
						choices: vec![
							FgdChoice { key: FgdValueKey::Integer(0), title: "Normal".to_string() },
							FgdChoice { key: FgdValueKey::Integer(10), title: "Fluorescent flicker".to_string() },
						],
						..Default::default()
					},
				],
				..Default::default()
			},
			FgdClass {
				kind: ClassKind::Solid,
				name: "func_door".to_string(),
				base: vec!["__transform".to_string()],
				properties: vec![FgdProperty {
					name: "speed".to_string(),
					ty: "float".to_string(),
					default_value: Some("\"100\"".to_string()),
					..Default::default()
				}],
				flags: vec![
					FgdFlag { bit: 0, name: "Starts open".to_string(), default_on: false },
					FgdFlag { bit: 2, name: "Toggle".to_string(), default_on: true },
				],
				..Default::default()
			},
		]
	}

	#[test]
	fn round_trip() {
		let classes = sample_classes();
		let text = write_fgd(&classes);
		let parsed = parse_fgd(&text).unwrap();

		assert_eq!(parsed.classes, classes);
	}

	#[test]
	fn inline_choices_become_named_enums() {
		let text = write_fgd(&sample_classes());
		let parsed = parse_fgd(&text).unwrap();

		assert_eq!(parsed.enums.len(), 1);
		assert_eq!(parsed.enums[0].name, "LightStyle");
		assert_eq!(parsed.enums[0].variants.len(), 2);
	}

	#[test]
	fn errors_carry_line_numbers() {
		let err = parse_fgd("@PointClass = light : \"a\"\n[\n\tspeed[float)\n]\n").unwrap_err();
		assert_eq!(err.line, 3);

		let err = parse_fgd("@WeirdClass = x []").unwrap_err();
		assert_eq!(err.line, 1);
	}

	#[test]
	fn flag_values_decode_to_bits() {
		let text = "@SolidClass = func_door\n[\n\tspawnflags(Flags) =\n\t[\n\t\t1 : \"A\" : 0\n\t\t4 : \"B\" : 1\n\t]\n]\n";
		let parsed = parse_fgd(text).unwrap();
		let flags = &parsed.classes[0].flags;

		assert_eq!((flags[0].bit, flags[0].default_on), (0, false));
		assert_eq!((flags[1].bit, flags[1].default_on), (2, true));

		assert!(parse_fgd("@SolidClass = x\n[\n\tspawnflags(Flags) = [ 3 : \"A\" ]\n]\n").is_err());
	}

	#[test]
	fn stub_generation_groups_by_category() {
		let text = write_fgd(&sample_classes());
		let parsed = parse_fgd(&text).unwrap();
		let stubs = generate_stubs(&parsed);

		let categories: Vec<&str> = stubs.iter().map(|(category, _)| category.as_str()).collect();
		assert_eq!(categories, vec!["func", "light", "transform"]);

		let (_, light_source) = stubs.iter().find(|(category, _)| category == "light").unwrap();
		assert!(light_source.contains("pub enum LightStyle {"));
		assert!(light_source.contains("\tFluorescentFlicker = 10,"));
		assert!(light_source.contains("pub struct Light {"));
		assert!(light_source.contains("\tpub style: LightStyle,"));

		let (_, func_source) = stubs.iter().find(|(category, _)| category == "func").unwrap();
		assert!(func_source.contains("\tpub starts_open: bool,"));
	}
}
