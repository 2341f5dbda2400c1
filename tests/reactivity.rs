use std::cell::{Cell, RefCell};
use std::rc::Rc;

use zest::dom::{HostNode, Node};
use zest::{
	batch, computed, effect, object, reactive, tick, untracked, Bindings, Effect, EffectOptions, Error, Ref,
	Scope, Value,
};

use crate::mock::{SharedMock, Spy};

#[test]
fn equal_writes_do_not_notify() {
	let count = Ref::new(1);
	let state = reactive(object! { ratio: f64::NAN }).as_object().unwrap();

	let mock = SharedMock::new();
	mock.get().expect_trigger().times(1).return_const(());

	let _watch = effect!((count, state, mock) => {
		mock.get().trigger(count.get().to_number() + state.get("ratio").to_number());
	});

	count.set(1);
	state.set("ratio", f64::NAN);
	tick();

	mock.get().checkpoint();
}

#[test]
fn writes_before_a_tick_collapse_into_one_run() {
	let count = Ref::new(0);
	let runs = Rc::new(Cell::new(0));

	let _watch = effect!((count, runs) => {
		count.get();
		runs.set(runs.get() + 1);
	});
	assert_eq!(runs.get(), 1);

	count.set(1);
	count.set(2);
	count.set(3);
	assert_eq!(runs.get(), 1);
	assert_eq!(zest::pending_count(), 1);

	tick();
	assert_eq!(runs.get(), 2);
	assert_eq!(zest::pending_count(), 0);
}

#[test]
fn flush_runs_effects_in_creation_order() {
	let source = Ref::new(0);
	let order = Rc::new(RefCell::new(Vec::new()));

	let first = effect!((source, order) => {
		source.get();
		order.borrow_mut().push("first");
	});
	let second = effect!((source, order) => {
		source.get();
		order.borrow_mut().push("second");
	});
	order.borrow_mut().clear();

	source.set(1);
	tick();
	assert_eq!(*order.borrow(), ["first", "second"]);
	assert!(first.id() < second.id());
}

#[test]
fn nested_objects_are_tracked_deeply() {
	let state = reactive(object! {
		user: object! { name: "ada", tags: vec!["x"] },
	})
	.as_object()
	.unwrap();

	let seen = Rc::new(RefCell::new(String::new()));
	let _watch = effect!((state, seen) => {
		let user = state.get("user").as_object().unwrap();
		*seen.borrow_mut() = format!("{} {}", user.get("name"), user.get("tags").as_array().unwrap().len());
	});
	assert_eq!(*seen.borrow(), "ada 1");

	state.get("user").as_object().unwrap().set("name", "grace");
	tick();
	assert_eq!(*seen.borrow(), "grace 1");

	state.get("user").as_object().unwrap().get("tags").as_array().unwrap().push("y");
	tick();
	assert_eq!(*seen.borrow(), "grace 2");
}

#[test]
fn cyclic_objects_resolve_to_the_same_view() {
	let node = object! { name: "loop" };
	node.insert("me", node.clone());

	let view = reactive(node.clone()).as_object().unwrap();
	let inner = view.get("me").as_object().unwrap();
	assert!(inner.ptr_eq(&view));
	assert_eq!(inner.get("me").as_object().unwrap().get("name"), Value::from("loop"));
}

#[test]
fn object_shape_changes_notify_iteration() {
	let state = reactive(object! { a: 1 }).as_object().unwrap();
	let keys = Rc::new(RefCell::new(Vec::new()));
	let _watch = effect!((state, keys) => {
		*keys.borrow_mut() = state.keys().iter().map(|k| k.to_string()).collect::<Vec<_>>();
	});

	state.set("b", 2);
	tick();
	assert_eq!(*keys.borrow(), ["a", "b"]);

	// updating an existing key leaves the shape alone
	state.set("a", 10);
	assert_eq!(zest::pending_count(), 0);

	assert!(state.delete("a"));
	assert!(!state.delete("a"));
	tick();
	assert_eq!(*keys.borrow(), ["b"]);
}

#[test]
fn array_shape_and_index_deps_are_separate() {
	let list = reactive(vec![1, 2, 3]).as_array().unwrap();
	let (len_runs, head_runs) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));

	let _len = effect!((list, len_runs) => {
		list.len();
		len_runs.set(len_runs.get() + 1);
	});
	let _head = effect!((list, head_runs) => {
		list.get(0);
		head_runs.set(head_runs.get() + 1);
	});

	list.push(4);
	tick();
	assert_eq!((len_runs.get(), head_runs.get()), (2, 1));

	list.set(0, 9);
	tick();
	assert_eq!((len_runs.get(), head_runs.get()), (2, 2));

	list.reverse();
	tick();
	assert_eq!((len_runs.get(), head_runs.get()), (3, 3));
	assert_eq!(list.raw().get(0), Some(Value::from(4)));
}

#[test]
fn array_readers_track_every_element() {
	let list = reactive(vec![3, 1, 2]).as_array().unwrap();
	let joined = Rc::new(RefCell::new(String::new()));
	let _watch = effect!((list, joined) => {
		*joined.borrow_mut() = list.join("-");
	});
	assert_eq!(*joined.borrow(), "3-1-2");

	list.sort();
	tick();
	assert_eq!(*joined.borrow(), "1-2-3");

	list.splice(1, 1, [Value::from(7), Value::from(8)]);
	tick();
	assert_eq!(*joined.borrow(), "1-7-8-3");

	assert_eq!(list.pop(), Value::from(3));
	assert_eq!(list.shift(), Value::from(1));
	tick();
	assert_eq!(*joined.borrow(), "7-8");
}

#[test]
fn ref_delegates_containers_to_reactive_views() {
	let list = Ref::new(vec![1, 2]);
	let total = computed!((list) => {
		let items = list.get().as_array().unwrap();
		items.to_vec().iter().map(Value::to_number).sum::<f64>()
	});
	assert_eq!(total.get(), Value::from(3));

	list.get().as_array().unwrap().push(3);
	assert!(total.is_dirty());
	assert_eq!(total.get(), Value::from(6));
}

#[test]
fn computed_is_lazy_and_cached() {
	let a = Ref::new(1);
	let calls = Rc::new(Cell::new(0));
	let b = computed!((a, calls) => {
		calls.set(calls.get() + 1);
		a.get().to_number() * 2.0
	});
	assert_eq!(calls.get(), 0);

	let seen = Rc::new(Cell::new(0.0));
	let _watch = effect!((b, seen) => {
		seen.set(b.get().to_number());
		b.get();
		b.get();
	});
	assert_eq!(calls.get(), 1);
	assert_eq!(seen.get(), 2.0);

	for value in [2, 3] {
		a.set(value);
		tick();
		b.get();
		b.get();
	}
	assert_eq!(calls.get(), 3);
	assert_eq!(seen.get(), 6.0);

	a.set(3);
	tick();
	assert_eq!(calls.get(), 3);
}

#[test]
fn stopped_effects_stay_stopped() {
	let count = Ref::new(0);
	let runs = Rc::new(Cell::new(0));
	let watch = effect!((count, runs) => {
		count.get();
		runs.set(runs.get() + 1);
	});

	count.set(1);
	watch.stop();
	watch.stop();
	tick();

	assert_eq!(runs.get(), 1);
	assert!(!watch.is_active());
	assert_eq!(watch.dependency_count(), 0);
	assert_eq!(count.dep().subscriber_count(), 0);
}

#[test]
fn dropped_effects_unsubscribe() {
	let count = Ref::new(0);
	{
		let _watch = effect!((count) => {
			count.get();
		});
		assert_eq!(count.dep().subscriber_count(), 1);
	}
	assert_eq!(count.dep().subscriber_count(), 0);
}

#[test]
fn untracked_reads_do_not_subscribe() {
	let (a, b) = (Ref::new(1), Ref::new(1));
	let runs = Rc::new(Cell::new(0));
	let _watch = effect!((a, b, runs) => {
		a.get();
		untracked(|| b.get());
		runs.set(runs.get() + 1);
	});

	b.set(2);
	tick();
	assert_eq!(runs.get(), 1);

	a.set(2);
	tick();
	assert_eq!(runs.get(), 2);
}

#[test]
fn nested_batches_flush_once_at_the_outermost_end() {
	let count = Ref::new(0);
	let runs = Rc::new(Cell::new(0));
	let _watch = effect!((count, runs) => {
		count.get();
		runs.set(runs.get() + 1);
	});

	batch(|| {
		count.set(1);
		batch(|| count.set(2));
		assert!(zest::in_batch());
		assert_eq!(runs.get(), 1);
	});
	assert_eq!(runs.get(), 2);
	assert_eq!(count.get_untracked(), Value::from(2));
}

#[test]
fn runaway_effects_hit_the_flush_limit() {
	let (a, b) = (Ref::new(0), Ref::new(0));
	let failures = Rc::new(RefCell::new(Vec::new()));
	let options = || EffectOptions {
		on_error: Some(Rc::new({
			let failures = failures.clone();
			move |error: &Error| failures.borrow_mut().push(error.to_string())
		})),
		..EffectOptions::default()
	};

	let _ping = Effect::with_options(
		{
			let (a, b) = (a.clone(), b.clone());
			move || {
				b.set(a.get().to_number() + 1.0);
				Ok(())
			}
		},
		options(),
	);
	let _pong = Effect::with_options(
		{
			let (a, b) = (a.clone(), b.clone());
			move || {
				a.set(b.get().to_number() + 1.0);
				Ok(())
			}
		},
		options(),
	);

	tick();
	assert_eq!(failures.borrow().len(), 1);
	assert!(failures.borrow()[0].contains(&zest::MAX_FLUSH_CYCLES.to_string()));
}

#[test]
fn scope_cleanup_releases_everything_once() {
	let count = Ref::new(0);
	let scope = Scope::new(Bindings::new(object! {}));
	let child = scope.child(Bindings::new(object! {}));

	let runs = Rc::new(Cell::new(0));
	child.add_effect(effect!((count, runs) => {
		count.get();
		runs.set(runs.get() + 1);
	}));

	let button = Node::element("button");
	let clicks = Rc::new(Cell::new(0));
	let id = button.add_event_listener("click", {
		let clicks = clicks.clone();
		move |_| clicks.set(clicks.get() + 1)
	});
	child.add_listener(&button, id);

	let cleaned = Rc::new(Cell::new(0));
	child.add_cleanup({
		let cleaned = cleaned.clone();
		move || cleaned.set(cleaned.get() + 1)
	});

	scope.cleanup();
	scope.cleanup();

	count.set(1);
	tick();
	button.click();

	assert_eq!(runs.get(), 1);
	assert_eq!(clicks.get(), 0);
	assert_eq!(cleaned.get(), 1);
	assert!(child.is_cleaned());
	assert_eq!(scope.child_count(), 0);
}
