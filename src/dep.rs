use std::cell::RefCell;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::effect::{self, EffectBody, EffectId};

/// Subscriber set of one reactive slot.
///
/// Subscribers are ordered by effect id and held weakly: an effect that
/// has been dropped simply disappears from the next notification.
#[derive(Clone, Default)]
pub struct Dep {
	body: Rc<DepBody>,
}

#[derive(Default)]
pub(crate) struct DepBody {
	subscribers: RefCell<BTreeMap<EffectId, Weak<EffectBody>>>,
}

impl Dep {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribe the currently running effect, if there is one.
	pub fn depend(&self) {
		let Some(active) = effect::active() else {
			return;
		};

		if !active.is_active() {
			return;
		}

		let inserted = {
			let mut subscribers = self.body.subscribers.borrow_mut();
			if subscribers.contains_key(&active.id()) {
				false
			} else {
				subscribers.insert(active.id(), Rc::downgrade(&active.body));
				true
			}
		};

		if inserted {
			active.body.track(self.clone());
		}
	}

	pub fn notify(&self) {
		let snapshot: Vec<_> = self
			.body
			.subscribers
			.borrow()
			.values()
			.filter_map(Weak::upgrade)
			.collect();

		let running = effect::active().map(|e| e.id());
		for body in snapshot {
			if Some(body.id) == running || !body.is_active() {
				continue;
			}
			effect::trigger(body);
		}
	}

	pub fn subscriber_count(&self) -> usize {
		self.body.subscribers.borrow().len()
	}

	pub(crate) fn unsubscribe(&self, id: EffectId) {
		self.body.subscribers.borrow_mut().remove(&id);
	}
}

/// Lazily populated table of deps keyed by whatever a reactive container
/// tracks (property names, indices, shape markers).
pub(crate) struct DepMap<K> {
	deps: RefCell<FxHashMap<K, Dep>>,
}

impl<K> Default for DepMap<K> {
	fn default() -> Self {
		DepMap {
			deps: RefCell::new(FxHashMap::default()),
		}
	}
}

impl<K> DepMap<K>
where
	K: Hash + Eq + Clone,
{
	pub fn track(&self, key: &K) {
		if effect::active().is_none() {
			return;
		}

		let dep = self
			.deps
			.borrow_mut()
			.entry(key.clone())
			.or_default()
			.clone();
		dep.depend();
	}

	pub fn trigger(&self, key: &K) {
		let dep = self.deps.borrow().get(key).cloned();
		if let Some(dep) = dep {
			dep.notify();
		}
	}

	pub fn trigger_where(&self, pred: impl Fn(&K) -> bool) {
		let deps: Vec<Dep> = self
			.deps
			.borrow()
			.iter()
			.filter(|(k, _)| pred(k))
			.map(|(_, d)| d.clone())
			.collect();

		for dep in deps {
			dep.notify();
		}
	}
}
