//! The output scene graph: a flat node arena with parent/child links, per-node geometry,
//! and typed objects attached by the binding engine.

use glam::Mat4;

use crate::*;

/// A translation/rotation/scale transform, composed parent-to-child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
	pub translation: Vec3,
	pub rotation: Quat,
	pub scale: Vec3,
}

impl Transform {
	pub const IDENTITY: Self = Self {
		translation: Vec3::ZERO,
		rotation: Quat::IDENTITY,
		scale: Vec3::ONE,
	};

	pub fn from_translation(translation: Vec3) -> Self {
		Self { translation, ..Self::IDENTITY }
	}

	pub fn to_matrix(&self) -> Mat4 {
		Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
	}

	pub fn from_matrix(matrix: Mat4) -> Self {
		let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
		Self { translation, rotation, scale }
	}

	/// `self` applied as the parent of `other`.
	pub fn mul_transform(&self, other: Transform) -> Transform {
		Self::from_matrix(self.to_matrix() * other.to_matrix())
	}
}

impl Default for Transform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One scene node.
pub struct Node {
	pub name: String,
	/// Local transform, relative to the parent.
	pub transform: Transform,
	pub parent: Option<NodeId>,
	pub children: Vec<NodeId>,
	pub mesh: Option<ReconstructedMesh>,
	pub collider: Option<CollisionMesh>,
	pub visible: bool,
	/// The entity this node was instantiated from, if any.
	pub entity_serial: Option<usize>,
	components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Node {
	fn new(name: String) -> Self {
		Self {
			name,
			transform: Transform::IDENTITY,
			parent: None,
			children: Vec::new(),
			mesh: None,
			collider: None,
			visible: true,
			entity_serial: None,
			components: HashMap::new(),
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("name", &self.name)
			.field("transform", &self.transform)
			.field("parent", &self.parent)
			.field("children", &self.children)
			.field("components", &self.components.len())
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Default)]
pub struct SceneGraph {
	nodes: Vec<Node>,
}

impl SceneGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
		self.nodes.push(Node::new(name.into()));
		NodeId(self.nodes.len() - 1)
	}

	pub fn spawn_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
		let child = self.spawn(name);
		self.set_parent(child, Some(parent));
		child
	}

	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}
	pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
		&mut self.nodes[id.0]
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
		self.nodes.iter().enumerate().map(|(index, node)| (NodeId(index), node))
	}

	/// Moves `child` under `parent`, keeping its local transform as-is.
	pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) {
		if let Some(old_parent) = self.nodes[child.0].parent {
			self.nodes[old_parent.0].children.retain(|&c| c != child);
		}
		self.nodes[child.0].parent = parent;
		if let Some(parent) = parent {
			self.nodes[parent.0].children.push(child);
		}
	}

	/// Moves `child` under `parent`, recomputing its local transform so its world transform
	/// is unchanged.
	pub fn reparent_keep_world(&mut self, child: NodeId, parent: NodeId) {
		let child_world = self.world_transform(child).to_matrix();
		let parent_world = self.world_transform(parent).to_matrix();
		self.set_parent(child, Some(parent));
		self.nodes[child.0].transform = Transform::from_matrix(parent_world.inverse() * child_world);
	}

	pub fn world_transform(&self, id: NodeId) -> Transform {
		let mut transform = self.nodes[id.0].transform;
		let mut current = self.nodes[id.0].parent;
		while let Some(parent) = current {
			transform = self.nodes[parent.0].transform.mul_transform(transform);
			current = self.nodes[parent.0].parent;
		}
		transform
	}

	pub fn insert_component<T: Any + Send + Sync>(&mut self, id: NodeId, component: T) {
		self.nodes[id.0].components.insert(TypeId::of::<T>(), Box::new(component));
	}

	pub fn get_component<T: Any + Send + Sync>(&self, id: NodeId) -> Option<&T> {
		self.nodes[id.0].components.get(&TypeId::of::<T>()).and_then(|c| c.downcast_ref())
	}

	pub fn get_component_mut<T: Any + Send + Sync>(&mut self, id: NodeId) -> Option<&mut T> {
		self.nodes[id.0].components.get_mut(&TypeId::of::<T>()).and_then(|c| c.downcast_mut())
	}

	pub fn has_component<T: Any + Send + Sync>(&self, id: NodeId) -> bool {
		self.nodes[id.0].components.contains_key(&TypeId::of::<T>())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parenting() {
		let mut scene = SceneGraph::new();
		let root = scene.spawn("root");
		let a = scene.spawn_child(root, "a");
		let b = scene.spawn_child(root, "b");

		assert_eq!(scene.node(root).children, vec![a, b]);
		assert_eq!(scene.node(a).parent, Some(root));

		scene.set_parent(a, Some(b));
		assert_eq!(scene.node(root).children, vec![b]);
		assert_eq!(scene.node(b).children, vec![a]);
	}

	#[test]
	fn reparent_preserves_world_transform() {
		let mut scene = SceneGraph::new();
		let root = scene.spawn("root");
		let group = scene.spawn_child(root, "group");
		scene.node_mut(group).transform = Transform {
			translation: vec3(4., 0., 0.),
			rotation: Quat::from_rotation_y(FRAC_PI_2),
			scale: Vec3::ONE,
		};
		let item = scene.spawn_child(root, "item");
		scene.node_mut(item).transform = Transform::from_translation(vec3(1., 2., 3.));

		let world_before = scene.world_transform(item);
		scene.reparent_keep_world(item, group);

		let world_after = scene.world_transform(item);
		assert_almost_eq!(world_after.translation, world_before.translation, 1e-5);
		assert_almost_eq!(world_after.rotation, world_before.rotation, 1e-5);
		// The local transform did change.
		assert!(!scene.node(item).transform.translation.almost_eq(vec3(1., 2., 3.), 1e-5));
	}

	#[test]
	fn typed_components() {
		#[derive(Debug, PartialEq)]
		struct Health(u32);

		let mut scene = SceneGraph::new();
		let node = scene.spawn("entity");
		scene.insert_component(node, Health(3));

		assert_eq!(scene.get_component::<Health>(node), Some(&Health(3)));
		assert!(!scene.has_component::<String>(node));
		scene.get_component_mut::<Health>(node).unwrap().0 = 5;
		assert_eq!(scene.get_component::<Health>(node).unwrap().0, 5);
	}
}
