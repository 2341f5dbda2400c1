//! Template expression language.
//!
//! Source text is parsed with `oxc_parser`, lowered into an [`ast::Expr`]
//! tree and then resolved against the names visible in the current
//! [`Bindings`]. The resulting [`Program`] is cached by `(source, names)` so
//! re-running an effect does not parse again.

pub mod ast;
mod builtins;
mod cache;
mod interp;
mod parser;
mod resolve;

use std::rc::Rc;

pub use self::builtins::PropKey;
pub use self::cache::ExpressionCache;
pub use self::interp::Program;
pub use self::parser::parse;

use crate::error::Result;
use crate::scope::Bindings;
use crate::value::Value;

pub const DEFAULT_CACHE_CAPACITY: usize = 500;

#[derive(Debug)]
pub struct Evaluator {
	cache: ExpressionCache,
}

impl Default for Evaluator {
	fn default() -> Self {
		Evaluator::new(DEFAULT_CACHE_CAPACITY)
	}
}

impl Evaluator {
	pub fn new(cache_capacity: usize) -> Self {
		Evaluator {
			cache: ExpressionCache::new(cache_capacity),
		}
	}

	pub fn compile(&self, source: &str, bindings: &Bindings) -> Result<Rc<Program>> {
		self.cache.get_or_compile(source.trim(), &bindings.names())
	}

	pub fn evaluate(&self, source: &str, bindings: &Bindings) -> Result<Value> {
		self.compile(source, bindings)?.run(bindings)
	}

	/// Write `value` to the place `target` names, e.g. `form.email`.
	pub fn assign(&self, target: &str, bindings: &Bindings, value: Value) -> Result<()> {
		self.compile(target, bindings)?.assign(bindings, value)
	}

	pub fn cache(&self) -> &ExpressionCache {
		&self.cache
	}
}
