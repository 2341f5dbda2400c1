use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::batch;
use crate::dep::Dep;
use crate::error::{Error, Result};

/// Monotonic creation sequence; flushes run effects in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(u64);

impl EffectId {
	pub fn get(self) -> u64 {
		self.0
	}
}

pub type Scheduler = Rc<dyn Fn(&Effect)>;
pub type ErrorHandler = Rc<dyn Fn(&Error)>;

#[derive(Default, Clone)]
pub struct EffectOptions {
	/// Do not run on creation.
	pub lazy: bool,
	/// Replaces batched queuing when a dependency changes.
	pub scheduler: Option<Scheduler>,
	/// Receives errors returned by the effect function.
	pub on_error: Option<ErrorHandler>,
	pub name: Option<&'static str>,
}

thread_local! {
	static NEXT_ID: Cell<u64> = const { Cell::new(1) };
	static STACK: RefCell<Vec<Effect>> = const { RefCell::new(Vec::new()) };
}

/// A re-runnable tracked computation.
///
/// Dropping the last handle stops the effect.
#[derive(Clone)]
#[must_use = "dropping the last handle stops the effect"]
pub struct Effect {
	pub(crate) body: Rc<EffectBody>,
}

pub(crate) struct EffectBody {
	pub(crate) id: EffectId,
	name: &'static str,
	func: Box<dyn Fn() -> Result<()>>,
	scheduler: Option<Scheduler>,
	on_error: Option<ErrorHandler>,
	deps: RefCell<SmallVec<[Dep; 4]>>,
	active: Cell<bool>,
}

impl EffectBody {
	pub(crate) fn is_active(&self) -> bool {
		self.active.get()
	}

	pub(crate) fn track(&self, dep: Dep) {
		self.deps.borrow_mut().push(dep);
	}

	fn cleanup(&self) {
		let deps = std::mem::take(&mut *self.deps.borrow_mut());
		for dep in deps {
			dep.unsubscribe(self.id);
		}
	}
}

impl Drop for EffectBody {
	fn drop(&mut self) {
		for dep in self.deps.get_mut().drain(..) {
			dep.unsubscribe(self.id);
		}
	}
}

struct ActiveGuard;

impl ActiveGuard {
	fn push(effect: Effect) -> Self {
		STACK.with(|s| s.borrow_mut().push(effect));
		ActiveGuard
	}
}

impl Drop for ActiveGuard {
	fn drop(&mut self) {
		let _ = STACK.try_with(|s| s.borrow_mut().pop());
	}
}

/// The effect currently executing, if any.
pub fn active() -> Option<Effect> {
	STACK.with(|s| s.borrow().last().cloned())
}

pub fn current() -> Option<EffectId> {
	STACK.with(|s| s.borrow().last().map(|e| e.id()))
}

/// Run `func` with tracking suspended.
pub fn untracked<R>(func: impl FnOnce() -> R) -> R {
	let saved = STACK.with(|s| std::mem::take(&mut *s.borrow_mut()));
	let result = func();
	STACK.with(|s| *s.borrow_mut() = saved);
	result
}

pub(crate) fn trigger(body: Rc<EffectBody>) {
	let effect = Effect { body };
	match &effect.body.scheduler {
		Some(scheduler) => scheduler(&effect),
		None => batch::queue(effect),
	}
}

impl Effect {
	pub fn new(func: impl Fn() + 'static) -> Self {
		Self::with_options(
			move || {
				func();
				Ok(())
			},
			EffectOptions::default(),
		)
	}

	pub fn try_new(func: impl Fn() -> Result<()> + 'static) -> Self {
		Self::with_options(func, EffectOptions::default())
	}

	pub fn with_options(func: impl Fn() -> Result<()> + 'static, options: EffectOptions) -> Self {
		let id = NEXT_ID.with(|n| {
			let id = n.get();
			n.set(id + 1);
			EffectId(id)
		});

		let effect = Effect {
			body: Rc::new(EffectBody {
				id,
				name: options.name.unwrap_or("<unnamed>"),
				func: Box::new(func),
				scheduler: options.scheduler,
				on_error: options.on_error,
				deps: RefCell::new(SmallVec::new()),
				active: Cell::new(true),
			}),
		};

		if !options.lazy {
			if let Err(error) = effect.run() {
				effect.report(&error);
			}
		}

		effect
	}

	pub fn id(&self) -> EffectId {
		self.body.id
	}

	pub fn name(&self) -> &'static str {
		self.body.name
	}

	pub fn is_active(&self) -> bool {
		self.body.is_active()
	}

	pub fn dependency_count(&self) -> usize {
		self.body.deps.borrow().len()
	}

	/// Re-subscribe from scratch and execute the function.
	///
	/// A stopped effect still executes, but without tracking.
	pub fn run(&self) -> Result<()> {
		if !self.is_active() {
			return (self.body.func)();
		}

		self.body.cleanup();
		let _guard = ActiveGuard::push(self.clone());
		tracing::trace!(id = self.body.id.0, name = self.body.name, "run effect");
		(self.body.func)()
	}

	pub fn stop(&self) {
		if self.body.active.replace(false) {
			self.body.cleanup();
		}
	}

	pub(crate) fn report(&self, error: &Error) {
		match &self.body.on_error {
			Some(handler) => handler(error),
			None => tracing::error!(id = self.body.id.0, name = self.body.name, %error, "effect failed"),
		}
	}

	pub fn ptr_eq(&self, other: &Effect) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl fmt::Debug for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Effect")
			.field("id", &self.body.id.0)
			.field("name", &self.body.name)
			.field("active", &self.is_active())
			.finish()
	}
}
