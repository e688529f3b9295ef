pub(crate) use std::any::{Any, TypeId, type_name};
pub(crate) use std::collections::{HashMap, HashSet};
pub(crate) use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
pub(crate) use std::fmt;

pub(crate) use glam::{Quat, Vec2, Vec3, Vec4, vec2, vec3};
pub(crate) use itertools::Itertools;
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use smart_default::SmartDefault;
pub(crate) use thiserror::Error;
pub(crate) use tracing::{error, warn};

pub use crate::{
	bsp::*,
	class::*,
	config::*,
	entity::*,
	fgd::parser::*,
	fgd::registry::*,
	fgd::writing::*,
	fgd::*,
	hooks::*,
	mesh::*,
	rebuild::*,
	scene::*,
	spawn::binding::*,
	spawn::*,
	util::*,
};
