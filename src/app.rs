use std::cell::RefCell;
use std::fmt;

use crate::config::Config;
use crate::dom::{HostNode, Node};
use crate::effect;
use crate::error::{Error, Phase, Result};
use crate::hooks::{Hooks, Plugin, PluginContext};
use crate::reactive::Object;
use crate::scope::{Bindings, Scope};
use crate::template::Compiler;

/// Where an [`App`] mounts: a selector resolved against the app's
/// document, or a node.
#[derive(Debug, Clone)]
pub enum MountTarget {
	Selector(String),
	Node(Node),
}

impl From<&str> for MountTarget {
	fn from(selector: &str) -> Self {
		MountTarget::Selector(selector.to_owned())
	}
}

impl From<String> for MountTarget {
	fn from(selector: String) -> Self {
		MountTarget::Selector(selector)
	}
}

impl From<Node> for MountTarget {
	fn from(node: Node) -> Self {
		MountTarget::Node(node)
	}
}

impl From<&Node> for MountTarget {
	fn from(node: &Node) -> Self {
		MountTarget::Node(node.clone())
	}
}

struct Mounted {
	scope: Scope,
	root: Node,
}

/// Owns the configuration, hooks and compiler for one mounted tree.
pub struct App {
	config: Config,
	hooks: Hooks,
	document: Option<Node>,
	compiler: Compiler,
	mounted: RefCell<Option<Mounted>>,
}

impl Default for App {
	fn default() -> Self {
		App::new()
	}
}

impl App {
	pub fn new() -> Self {
		App::with_config(Config::default())
	}

	pub fn with_config(config: Config) -> Self {
		let hooks = Hooks::new();
		let compiler = Compiler::new(config.clone(), hooks.clone());
		App {
			config,
			hooks,
			document: Node::default_document(),
			compiler,
			mounted: RefCell::new(None),
		}
	}

	/// Resolve selector targets against `document` instead of the host's
	/// default: the page in a browser, an empty fragment natively.
	pub fn with_document(mut self, document: Node) -> Self {
		self.document = Some(document);
		self
	}

	pub fn document(&self) -> Option<&Node> {
		self.document.as_ref()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn hooks(&self) -> &Hooks {
		&self.hooks
	}

	pub fn compiler(&self) -> &Compiler {
		&self.compiler
	}

	pub fn use_plugin(&self, plugin: &dyn Plugin) -> &Self {
		plugin.install(&mut PluginContext::new(&self.hooks, &self.config));
		tracing::debug!(plugin = plugin.name(), hooks = self.hooks.len(), "installed plugin");
		self
	}

	/// Compile the target's subtree against the object returned by
	/// `setup`. An already mounted tree is unmounted first.
	pub fn mount(&self, target: impl Into<MountTarget>, setup: impl FnOnce() -> Object) -> Result<Scope> {
		let root = match self.resolve(target.into()) {
			Ok(root) => root,
			Err(error) => {
				self.hooks.report(&error, Phase::Compile, "mount");
				return Err(error);
			}
		};

		if self.is_mounted() {
			self.unmount();
		}

		let vars = effect::untracked(setup);
		let scope = Scope::new(Bindings::new(vars));
		effect::untracked(|| self.compiler.compile(&root, &scope));

		tracing::debug!(effects = scope.effect_count(), children = scope.child_count(), "mounted");
		*self.mounted.borrow_mut() = Some(Mounted {
			scope: scope.clone(),
			root,
		});
		Ok(scope)
	}

	/// Tear down the mounted tree's effects and listeners. Does nothing
	/// when nothing is mounted.
	pub fn unmount(&self) {
		let mounted = self.mounted.borrow_mut().take();
		if let Some(mounted) = mounted {
			mounted.scope.cleanup();
			tracing::debug!(root = ?mounted.root, "unmounted");
		}
	}

	pub fn is_mounted(&self) -> bool {
		self.mounted.borrow().is_some()
	}

	pub fn scope(&self) -> Option<Scope> {
		self.mounted.borrow().as_ref().map(|m| m.scope.clone())
	}

	pub fn root(&self) -> Option<Node> {
		self.mounted.borrow().as_ref().map(|m| m.root.clone())
	}

	fn resolve(&self, target: MountTarget) -> Result<Node> {
		match target {
			MountTarget::Node(node) => Ok(node),
			MountTarget::Selector(selector) => self
				.document
				.as_ref()
				.and_then(|document| document.query_selector(&selector))
				.ok_or(Error::MountTarget(selector)),
		}
	}
}

impl fmt::Debug for App {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("mounted", &self.is_mounted())
			.field("hooks", &self.hooks.len())
			.finish()
	}
}
