//! Reactive state and a DOM template engine.
//!
//! State lives in [`Ref`]s, [`Computed`]s and reactive objects and arrays.
//! [`Effect`]s re-run when something they read changes; re-runs are
//! deduplicated and flushed on the next microtask, or synchronously at the
//! end of a [`batch`]. The template compiler turns `{{ }}` interpolations
//! and `z-` directives into effects owned by a [`Scope`].

pub mod macros;

mod app;
mod array;
mod batch;
mod computed;
mod config;
mod dep;
mod effect;
mod error;
mod hooks;
mod json;
mod microtask;
mod r#ref;
mod reactive;
mod scope;
mod template;
mod value;

pub mod dom;
pub mod expr;

pub use app::{App, MountTarget};
pub use batch::{batch, flush, in_batch, pending_count, MAX_FLUSH_CYCLES};
pub use computed::Computed;
pub use config::Config;
pub use dep::Dep;
pub use effect::{active, current, untracked, Effect, EffectId, EffectOptions};
pub use error::{Error, Phase, Result};
pub use expr::Evaluator;
pub use hooks::{Hook, HookId, Hooks, Plugin, PluginContext};
#[cfg(not(target_arch = "wasm32"))]
pub use microtask::tick;
pub use r#ref::Ref;
pub use reactive::{reactive, to_raw, Array, Object, Reactive, ReactiveArray, ReactiveObject};
pub use scope::{Bindings, Scope};
pub use template::{parse_for, parse_interpolation, Compiler, ForExpr, Segment};
pub use value::{Function, Value};

/// Run `func` now and again whenever something it read changes.
///
/// The effect stops when the returned handle is dropped.
#[must_use = "dropping the handle stops the effect"]
pub fn effect(func: impl Fn() + 'static) -> Effect {
	Effect::new(func)
}

#[must_use]
pub fn computed(getter: impl Fn() -> Value + 'static) -> Computed {
	Computed::new(getter)
}
