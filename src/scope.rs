use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::dom::{HostNode, ListenerId, Node};
use crate::effect::Effect;
use crate::error::{Error, Result};
use crate::reactive::{Object, ReactiveObject};
use crate::value::Value;

/// Chain of variable tables visible to expressions. Inner tables shadow
/// outer ones.
#[derive(Clone)]
pub struct Bindings {
	body: Rc<BindingsBody>,
}

struct BindingsBody {
	vars: Object,
	parent: Option<Bindings>,
}

impl Bindings {
	pub fn new(vars: Object) -> Self {
		Bindings {
			body: Rc::new(BindingsBody { vars, parent: None }),
		}
	}

	pub fn child(&self, vars: Object) -> Self {
		Bindings {
			body: Rc::new(BindingsBody {
				vars,
				parent: Some(self.clone()),
			}),
		}
	}

	pub fn vars(&self) -> ReactiveObject {
		self.body.vars.reactive()
	}

	pub fn parent(&self) -> Option<&Bindings> {
		self.body.parent.as_ref()
	}

	/// Table that defines `name`, innermost first. Tracked, so a later
	/// definition re-runs the reader.
	pub fn owner(&self, name: &str) -> Option<ReactiveObject> {
		let mut current = Some(self);
		while let Some(bindings) = current {
			let vars = bindings.vars();
			if vars.has(name) {
				return Some(vars);
			}
			current = bindings.parent();
		}
		None
	}

	pub fn lookup(&self, name: &str) -> Option<Value> {
		self.owner(name).map(|vars| vars.get(name))
	}

	pub fn contains(&self, name: &str) -> bool {
		let mut current = Some(self);
		while let Some(bindings) = current {
			if bindings.body.vars.contains_key(name) {
				return true;
			}
			current = bindings.parent();
		}
		false
	}

	/// Sorted, deduplicated names across the chain.
	pub fn names(&self) -> Vec<Rc<str>> {
		let mut names = Vec::new();
		let mut current = Some(self);
		while let Some(bindings) = current {
			names.extend(bindings.body.vars.keys());
			current = bindings.parent();
		}
		names.sort();
		names.dedup();
		names
	}

	/// Write through to the defining table; ref-bound names update the
	/// ref instead of rebinding.
	pub fn assign(&self, name: &str, value: Value) -> Result<()> {
		let Some(owner) = self.owner(name) else {
			return Err(Error::Reference(name.to_owned()));
		};

		match owner.raw().get(name) {
			Some(Value::Ref(r)) => {
				r.set(value);
				Ok(())
			}
			Some(Value::Computed(_)) => Err(Error::type_error(format!(
				"cannot assign to computed binding {}",
				name
			))),
			_ => {
				owner.set(name, value);
				Ok(())
			}
		}
	}
}

impl fmt::Debug for Bindings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

/// Lifetime container: everything registered here is torn down together.
#[derive(Clone)]
pub struct Scope {
	body: Rc<ScopeBody>,
}

struct ScopeBody {
	bindings: Bindings,
	effects: RefCell<Vec<Effect>>,
	listeners: RefCell<Vec<(Node, ListenerId)>>,
	cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
	children: RefCell<Vec<Scope>>,
	cleaned: Cell<bool>,
}

impl Scope {
	pub fn new(bindings: Bindings) -> Self {
		Scope {
			body: Rc::new(ScopeBody {
				bindings,
				effects: RefCell::new(Vec::new()),
				listeners: RefCell::new(Vec::new()),
				cleanups: RefCell::new(Vec::new()),
				children: RefCell::new(Vec::new()),
				cleaned: Cell::new(false),
			}),
		}
	}

	pub fn bindings(&self) -> &Bindings {
		&self.body.bindings
	}

	/// New scope torn down with this one.
	pub fn child(&self, bindings: Bindings) -> Scope {
		let child = Scope::new(bindings);
		self.body.children.borrow_mut().push(child.clone());
		child
	}

	/// Clean `child` up and forget it.
	pub fn remove_child(&self, child: &Scope) {
		self.body
			.children
			.borrow_mut()
			.retain(|c| !Rc::ptr_eq(&c.body, &child.body));
		child.cleanup();
	}

	pub fn add_effect(&self, effect: Effect) {
		self.body.effects.borrow_mut().push(effect);
	}

	pub fn add_listener(&self, node: &Node, id: ListenerId) {
		self.body.listeners.borrow_mut().push((node.clone(), id));
	}

	pub fn add_cleanup(&self, func: impl FnOnce() + 'static) {
		self.body.cleanups.borrow_mut().push(Box::new(func));
	}

	pub fn effect_count(&self) -> usize {
		self.body.effects.borrow().len()
	}

	pub fn child_count(&self) -> usize {
		self.body.children.borrow().len()
	}

	pub fn is_cleaned(&self) -> bool {
		self.body.cleaned.get()
	}

	/// Children first, then effects, listeners and cleanup callbacks.
	/// Safe to call more than once.
	pub fn cleanup(&self) {
		let children = std::mem::take(&mut *self.body.children.borrow_mut());
		for child in children {
			child.cleanup();
		}

		let effects = std::mem::take(&mut *self.body.effects.borrow_mut());
		for effect in effects {
			effect.stop();
		}

		let listeners = std::mem::take(&mut *self.body.listeners.borrow_mut());
		for (node, id) in listeners {
			node.remove_event_listener(id);
		}

		let cleanups = std::mem::take(&mut *self.body.cleanups.borrow_mut());
		for cleanup in cleanups {
			cleanup();
		}

		self.body.cleaned.set(true);
	}

	pub fn ptr_eq(&self, other: &Scope) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("bindings", &self.body.bindings)
			.field("effects", &self.body.effects.borrow().len())
			.field("listeners", &self.body.listeners.borrow().len())
			.field("children", &self.body.children.borrow().len())
			.finish()
	}
}
