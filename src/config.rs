use std::rc::Rc;

use crate::expr::DEFAULT_CACHE_CAPACITY;

/// Template and runtime settings for one [`App`](crate::App).
#[derive(Debug, Clone)]
pub struct Config {
	/// Directive attribute prefix, `z-` by default (`z-if`, `z-for`, ...).
	pub prefix: Rc<str>,
	/// Interpolation delimiters.
	pub delimiters: (Rc<str>, Rc<str>),
	pub expression_cache_capacity: usize,
	/// Warn when a list render sees the same key twice.
	pub warn_duplicate_keys: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			prefix: Rc::from("z-"),
			delimiters: (Rc::from("{{"), Rc::from("}}")),
			expression_cache_capacity: DEFAULT_CACHE_CAPACITY,
			warn_duplicate_keys: cfg!(debug_assertions),
		}
	}
}

impl Config {
	pub fn with_prefix(mut self, prefix: &str) -> Self {
		self.prefix = Rc::from(prefix);
		self
	}

	pub fn with_delimiters(mut self, open: &str, close: &str) -> Self {
		self.delimiters = (Rc::from(open), Rc::from(close));
		self
	}

	pub fn with_expression_cache_capacity(mut self, capacity: usize) -> Self {
		self.expression_cache_capacity = capacity;
		self
	}

	pub fn with_duplicate_key_warnings(mut self, warn: bool) -> Self {
		self.warn_duplicate_keys = warn;
		self
	}

	/// `if` -> `z-if`.
	pub(crate) fn directive(&self, name: &str) -> String {
		format!("{}{}", self.prefix, name)
	}
}
