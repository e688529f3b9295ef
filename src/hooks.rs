//! Host-injected import hooks, invoked in registration order at defined pipeline points.
//! A hook failure is a per-entity warning, never an abort.

use crate::*;

#[allow(unused_variables)]
pub trait ImportHook {
	/// Runs once before any geometry is built.
	fn on_begin(&mut self, scene: &mut SceneGraph, root: NodeId) -> anyhow::Result<()> {
		Ok(())
	}
	/// Runs after world geometry exists and worldspawn's key/values are bound.
	fn on_worldspawn(&mut self, scene: &mut SceneGraph, world: NodeId, entity: &MapEntity) -> anyhow::Result<()> {
		Ok(())
	}
	fn on_point_spawned(&mut self, scene: &mut SceneGraph, node: NodeId, entity: &MapEntity) -> anyhow::Result<()> {
		Ok(())
	}
	fn on_solid_spawned(&mut self, scene: &mut SceneGraph, node: NodeId, entity: &MapEntity) -> anyhow::Result<()> {
		Ok(())
	}
	/// Runs once after all passes, before the summary is assembled.
	fn on_end(&mut self, scene: &mut SceneGraph, root: NodeId) -> anyhow::Result<()> {
		Ok(())
	}
}

/// An ordered hook list, built by chaining [`push`](Self::push).
#[derive(Default)]
pub struct ImportHooks {
	hooks: Vec<Box<dyn ImportHook>>,
}

impl ImportHooks {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(mut self, hook: impl ImportHook + 'static) -> Self {
		self.hooks.push(Box::new(hook));
		self
	}

	pub fn len(&self) -> usize {
		self.hooks.len()
	}
	pub fn is_empty(&self) -> bool {
		self.hooks.is_empty()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ImportHook>> {
		self.hooks.iter_mut()
	}
}

impl fmt::Debug for ImportHooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ImportHooks").field("len", &self.hooks.len()).finish()
	}
}
