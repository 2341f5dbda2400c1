use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dep::Dep;
use crate::value::{same_value, Value};

/// Reactive single-value container.
///
/// Objects and arrays are stored raw and handed out through their reactive
/// view, so `Ref::new(vec![...])` yields a tracked list.
#[derive(Clone)]
pub struct Ref {
	body: Rc<RefBody>,
}

struct RefBody {
	value: RefCell<Value>,
	dep: Dep,
}

impl Default for Ref {
	fn default() -> Self {
		Ref::new(Value::Undefined)
	}
}

impl Ref {
	pub fn new(value: impl Into<Value>) -> Self {
		Ref {
			body: Rc::new(RefBody {
				value: RefCell::new(value.into().into_raw()),
				dep: Dep::new(),
			}),
		}
	}

	pub fn get(&self) -> Value {
		self.body.dep.depend();
		self.get_untracked()
	}

	pub fn get_untracked(&self) -> Value {
		self.body.value.borrow().clone().wrap()
	}

	/// Store `value`, notifying only when it differs under `Object.is`.
	pub fn set(&self, value: impl Into<Value>) {
		let value = value.into().into_raw();
		{
			let mut current = self.body.value.borrow_mut();
			if same_value(&current, &value) {
				return;
			}
			*current = value;
		}
		self.body.dep.notify();
	}

	pub fn replace(&self, value: impl Into<Value>) -> Value {
		let old = self.get_untracked();
		self.set(value);
		old
	}

	pub fn update(&self, func: impl FnOnce(Value) -> Value) {
		let next = func(self.get_untracked());
		self.set(next);
	}

	pub fn toggle(&self) {
		self.update(|v| Value::Bool(!v.truthy()));
	}

	pub fn dep(&self) -> &Dep {
		&self.body.dep
	}

	pub fn ptr_eq(&self, other: &Ref) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl fmt::Display for Ref {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.get_untracked().fmt(f)
	}
}

impl fmt::Debug for Ref {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Ref").field(&self.get_untracked()).finish()
	}
}
