#![doc = include_str!("../readme.md")]

pub mod bsp;
pub mod class;
pub mod config;
pub mod entity;
pub mod fgd;
pub mod hooks;
pub mod mesh;
pub mod prelude;
pub mod rebuild;
pub mod scene;
pub mod spawn;
pub mod util;

pub(crate) use prelude::*;

// Re-exports
pub use anyhow;
pub use glam;
