use std::cell::RefCell;
use std::rc::Rc;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use super::interp::Program;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	source: Rc<str>,
	names: Rc<[Rc<str>]>,
}

/// Compiled programs keyed by source text and the names in scope.
/// Bounded: once full, the oldest entry is evicted first.
#[derive(Debug)]
pub struct ExpressionCache {
	capacity: usize,
	entries: RefCell<IndexMap<CacheKey, Rc<Program>, FxBuildHasher>>,
}

impl ExpressionCache {
	pub fn new(capacity: usize) -> Self {
		ExpressionCache {
			capacity: capacity.max(1),
			entries: RefCell::new(IndexMap::default()),
		}
	}

	/// `names` must be sorted and deduplicated.
	pub fn get_or_compile(&self, source: &str, names: &[Rc<str>]) -> Result<Rc<Program>> {
		let key = CacheKey {
			source: Rc::from(source),
			names: names.into(),
		};
		if let Some(program) = self.entries.borrow().get(&key) {
			return Ok(program.clone());
		}

		let program = Rc::new(Program::compile(source, names)?);
		let mut entries = self.entries.borrow_mut();
		while entries.len() >= self.capacity {
			entries.shift_remove_index(0);
		}
		entries.insert(key, program.clone());
		tracing::trace!(source, cached = entries.len(), "compiled expression");
		Ok(program)
	}

	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn clear(&self) {
		self.entries.borrow_mut().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reuses_and_evicts_oldest() {
		let cache = ExpressionCache::new(2);
		let names: Vec<Rc<str>> = vec!["a".into()];

		let first = cache.get_or_compile("a + 1", &names).unwrap();
		let again = cache.get_or_compile("a + 1", &names).unwrap();
		assert!(Rc::ptr_eq(&first, &again));

		// same source, different names in scope
		cache.get_or_compile("a + 1", &[]).unwrap();
		assert_eq!(cache.len(), 2);

		cache.get_or_compile("a + 2", &names).unwrap();
		assert_eq!(cache.len(), 2);
		let recompiled = cache.get_or_compile("a + 1", &names).unwrap();
		assert!(!Rc::ptr_eq(&first, &recompiled));
	}

	#[test]
	fn does_not_cache_syntax_errors() {
		let cache = ExpressionCache::new(4);
		assert!(cache.get_or_compile("a +", &[]).is_err());
		assert!(cache.is_empty());
	}
}
