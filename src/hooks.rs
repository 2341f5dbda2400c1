use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::computed::Computed;
use crate::config::Config;
use crate::dom::Node;
use crate::effect::{Effect, EffectId};
use crate::error::{Error, Phase, Result};
use crate::r#ref::Ref;
use crate::scope::Scope;
use crate::template::Compiler;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type BeforeCompileFn = dyn Fn(&Node, &Scope, &Compiler) -> Result<bool>;
type AfterCompileFn = dyn Fn(&Node, &Scope) -> Result<()>;
type BeforeEffectFn = dyn Fn(EffectId) -> Result<()>;
type OnErrorFn = dyn Fn(&Error, Phase, &str) -> Result<()>;

/// Extension point observed by the compiler and runtime.
#[derive(Clone)]
pub enum Hook {
	/// Runs before a node is compiled; returning `false` skips the node
	/// and its subtree.
	BeforeCompile(Rc<BeforeCompileFn>),
	/// Runs once a `compile` call has walked its whole subtree.
	AfterCompile(Rc<AfterCompileFn>),
	/// Runs before every tracked run of a template effect.
	BeforeEffect(Rc<BeforeEffectFn>),
	/// Receives every error caught instead of propagated.
	OnError(Rc<OnErrorFn>),
}

impl Hook {
	pub fn before_compile(func: impl Fn(&Node, &Scope, &Compiler) -> Result<bool> + 'static) -> Self {
		Hook::BeforeCompile(Rc::new(func))
	}

	pub fn after_compile(func: impl Fn(&Node, &Scope) -> Result<()> + 'static) -> Self {
		Hook::AfterCompile(Rc::new(func))
	}

	pub fn before_effect(func: impl Fn(EffectId) -> Result<()> + 'static) -> Self {
		Hook::BeforeEffect(Rc::new(func))
	}

	pub fn on_error(func: impl Fn(&Error, Phase, &str) -> Result<()> + 'static) -> Self {
		Hook::OnError(Rc::new(func))
	}

	pub fn name(&self) -> &'static str {
		match self {
			Hook::BeforeCompile(_) => "beforeCompile",
			Hook::AfterCompile(_) => "afterCompile",
			Hook::BeforeEffect(_) => "beforeEffect",
			Hook::OnError(_) => "onError",
		}
	}
}

impl fmt::Debug for Hook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Registry of hooks for one app. Cheap to clone; clones share handlers.
#[derive(Clone, Default)]
pub struct Hooks {
	body: Rc<HooksBody>,
}

#[derive(Default)]
struct HooksBody {
	next_id: Cell<u64>,
	hooks: RefCell<Vec<(HookId, Hook)>>,
}

impl Hooks {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_hook(&self, hook: Hook) -> HookId {
		let id = HookId(self.body.next_id.get());
		self.body.next_id.set(id.0 + 1);
		tracing::trace!(hook = hook.name(), id = id.0, "add hook");
		self.body.hooks.borrow_mut().push((id, hook));
		id
	}

	pub fn remove_hook(&self, id: HookId) -> bool {
		let mut hooks = self.body.hooks.borrow_mut();
		let before = hooks.len();
		hooks.retain(|(h, _)| *h != id);
		hooks.len() != before
	}

	pub fn len(&self) -> usize {
		self.body.hooks.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.body.hooks.borrow().is_empty()
	}

	// Handlers are snapshotted so a hook may add or remove hooks.
	fn snapshot(&self) -> Vec<Hook> {
		self.body
			.hooks
			.borrow()
			.iter()
			.map(|(_, hook)| hook.clone())
			.collect()
	}

	/// `false` if any handler vetoed compiling `node`.
	pub fn before_compile(&self, node: &Node, scope: &Scope, compiler: &Compiler) -> bool {
		for hook in self.snapshot() {
			if let Hook::BeforeCompile(func) = hook {
				match func(node, scope, compiler) {
					Ok(true) => {}
					Ok(false) => return false,
					Err(error) => self.report(&error, Phase::Hook, "beforeCompile"),
				}
			}
		}
		true
	}

	pub fn after_compile(&self, node: &Node, scope: &Scope) {
		for hook in self.snapshot() {
			if let Hook::AfterCompile(func) = hook {
				if let Err(error) = func(node, scope) {
					self.report(&error, Phase::Hook, "afterCompile");
				}
			}
		}
	}

	pub fn before_effect(&self, id: EffectId) {
		for hook in self.snapshot() {
			if let Hook::BeforeEffect(func) = hook {
				if let Err(error) = func(id) {
					self.report(&error, Phase::Hook, "beforeEffect");
				}
			}
		}
	}

	/// Route a caught error to the `OnError` handlers, or log it when
	/// there are none. Failures inside `OnError` are only logged.
	pub fn report(&self, error: &Error, phase: Phase, context: &str) {
		let handlers: Vec<_> = self
			.snapshot()
			.into_iter()
			.filter_map(|hook| match hook {
				Hook::OnError(func) => Some(func),
				_ => None,
			})
			.collect();

		if handlers.is_empty() {
			tracing::error!(%error, %phase, context, "unhandled error");
			return;
		}

		for handler in handlers {
			if let Err(failure) = handler(error, phase, context) {
				tracing::error!(%failure, original = %error, %phase, "error hook failed");
			}
		}
	}
}

impl fmt::Debug for Hooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.body.hooks.borrow().iter().map(|(_, hook)| hook))
			.finish()
	}
}

/// Installable extension.
pub trait Plugin {
	fn name(&self) -> &str {
		"plugin"
	}

	fn install(&self, cx: &mut PluginContext<'_>);
}

/// What a plugin may touch while installing.
pub struct PluginContext<'a> {
	hooks: &'a Hooks,
	config: &'a Config,
}

impl<'a> PluginContext<'a> {
	pub(crate) fn new(hooks: &'a Hooks, config: &'a Config) -> Self {
		PluginContext { hooks, config }
	}

	pub fn add_hook(&mut self, hook: Hook) -> HookId {
		self.hooks.add_hook(hook)
	}

	pub fn remove_hook(&mut self, id: HookId) -> bool {
		self.hooks.remove_hook(id)
	}

	pub fn config(&self) -> &Config {
		self.config
	}

	pub fn reactive(&self, value: impl Into<Value>) -> Value {
		crate::reactive::reactive(value)
	}

	pub fn create_ref(&self, value: impl Into<Value>) -> Ref {
		Ref::new(value)
	}

	#[must_use]
	pub fn computed(&self, getter: impl Fn() -> Value + 'static) -> Computed {
		Computed::new(getter)
	}

	#[must_use = "dropping the handle stops the effect"]
	pub fn effect(&self, func: impl Fn() + 'static) -> Effect {
		Effect::new(func)
	}
}
