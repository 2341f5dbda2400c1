use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dep::Dep;
use crate::effect::{Effect, EffectOptions};
use crate::value::Value;

/// Lazily recomputed, cached derivation.
///
/// A dependency change only marks the value dirty and notifies readers;
/// the getter runs on the next read.
#[derive(Clone)]
pub struct Computed {
	body: Rc<ComputedBody>,
}

pub struct ComputedBody {
	value: RefCell<Value>,
	dirty: Cell<bool>,
	dep: Dep,
	effect: Effect,
}

impl Computed {
	pub fn new(getter: impl Fn() -> Value + 'static) -> Self {
		Computed {
			body: Rc::new_cyclic(|this: &Weak<ComputedBody>| {
				let target = this.clone();
				let invalidate = this.clone();
				let effect = Effect::with_options(
					move || {
						let value = getter().into_raw();
						if let Some(body) = target.upgrade() {
							*body.value.borrow_mut() = value;
						}
						Ok(())
					},
					EffectOptions {
						lazy: true,
						scheduler: Some(Rc::new(move |_: &Effect| {
							if let Some(body) = invalidate.upgrade() {
								body.invalidate();
							}
						})),
						name: Some("computed"),
						..Default::default()
					},
				);

				ComputedBody {
					value: RefCell::new(Value::Undefined),
					dirty: Cell::new(true),
					dep: Dep::new(),
					effect,
				}
			}),
		}
	}

	pub fn get(&self) -> Value {
		self.body.refresh();
		self.body.dep.depend();
		self.body.value.borrow().clone().wrap()
	}

	pub fn get_untracked(&self) -> Value {
		self.body.refresh();
		self.body.value.borrow().clone().wrap()
	}

	pub fn is_dirty(&self) -> bool {
		self.body.dirty.get()
	}

	/// Detach from dependencies; the cached value stays readable.
	pub fn stop(&self) {
		self.body.effect.stop();
	}

	pub fn ptr_eq(&self, other: &Computed) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl ComputedBody {
	fn refresh(&self) {
		if !self.dirty.get() {
			return;
		}

		self.dirty.set(false);
		if let Err(error) = self.effect.run() {
			self.effect.report(&error);
		}
	}

	fn invalidate(&self) {
		if !self.dirty.replace(true) {
			self.dep.notify();
		}
	}
}

impl fmt::Debug for Computed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Computed")
			.field("dirty", &self.body.dirty.get())
			.field("value", &*self.body.value.borrow())
			.finish()
	}
}
