use std::cell::{Cell, RefCell};

use fxhash::FxHashSet;

use crate::effect::{Effect, EffectId};
use crate::error::Error;
use crate::microtask;

/// Upper bound on follow-up cycles within a single flush.
pub const MAX_FLUSH_CYCLES: usize = 100;

thread_local! {
	static STARTED: Cell<bool> = const { Cell::new(false) };
	static PENDING: Cell<bool> = const { Cell::new(false) };
	static FLUSHING: Cell<bool> = const { Cell::new(false) };
	static QUEUE: RefCell<Vec<Effect>> = const { RefCell::new(Vec::new()) };
	static QUEUED: RefCell<FxHashSet<EffectId>> = RefCell::new(FxHashSet::default());
}

pub fn in_batch() -> bool {
	STARTED.with(|s| s.get())
}

/// Run `func` with flush scheduling suspended, then flush synchronously
/// once the outermost batch ends.
pub fn batch(func: impl FnOnce()) {
	let is_root = batch_start();
	func();
	if is_root {
		batch_stop();
		if !is_flushing() {
			flush();
		}
	}
}

fn batch_start() -> bool {
	STARTED.with(|s| {
		if !s.get() {
			s.set(true);
			true
		} else {
			false
		}
	})
}

fn batch_stop() {
	STARTED.with(|s| s.set(false));
}

fn is_flushing() -> bool {
	FLUSHING.with(|s| s.get())
}

pub(crate) fn queue(effect: Effect) {
	let inserted = QUEUED.with(|q| q.borrow_mut().insert(effect.id()));
	if !inserted {
		return;
	}

	QUEUE.with(|q| q.borrow_mut().push(effect));

	if in_batch() || is_flushing() {
		return;
	}

	let schedule = PENDING.with(|p| !p.replace(true));
	if schedule {
		microtask::queue(|| {
			PENDING.with(|p| p.set(false));
			flush();
		});
	}
}

pub fn pending_count() -> usize {
	QUEUE.with(|q| q.borrow().len())
}

struct FlushGuard;

impl Drop for FlushGuard {
	fn drop(&mut self) {
		let _ = FLUSHING.try_with(|s| s.set(false));
	}
}

/// Run every queued effect in creation order. Effects queued while
/// flushing are picked up by a follow-up cycle.
pub fn flush() {
	if FLUSHING.with(|s| s.replace(true)) {
		return;
	}
	let _guard = FlushGuard;

	let mut cycles = 0;
	loop {
		let mut changed = QUEUE.with(|q| std::mem::take(&mut *q.borrow_mut()));
		if changed.is_empty() {
			break;
		}

		cycles += 1;
		if cycles > MAX_FLUSH_CYCLES {
			QUEUED.with(|q| q.borrow_mut().clear());
			let error = Error::FlushLimit(MAX_FLUSH_CYCLES);
			for effect in &changed {
				effect.report(&error);
			}
			break;
		}

		changed.sort_by_key(Effect::id);
		tracing::trace!(cycle = cycles, effects = changed.len(), "flush");

		for effect in changed {
			QUEUED.with(|q| q.borrow_mut().remove(&effect.id()));
			if !effect.is_active() {
				continue;
			}
			if let Err(error) = effect.run() {
				effect.report(&error);
			}
		}
	}
}
