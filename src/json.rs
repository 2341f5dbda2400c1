//! JSON rendering of [`Value`] through `serde`.
//!
//! Containers may reference themselves, so every container entered while
//! rendering is kept on a thread-local stack; meeting one again (or nesting
//! past [`MAX_DEPTH`]) aborts the serialization instead of recursing.

use std::cell::RefCell;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::dom::{HostEvent, HostNode};
use crate::reactive::{Reactive, ReactiveArray, ReactiveObject};
use crate::value::Value;

pub const MAX_DEPTH: usize = 128;

thread_local! {
	static VISITING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container as being rendered until dropped.
pub(crate) struct Visit(());

impl Visit {
	/// `None` when `addr` is already being rendered or the stack is full.
	pub(crate) fn enter(addr: usize) -> Option<Visit> {
		VISITING.with(|stack| {
			let mut stack = stack.borrow_mut();
			if stack.len() >= MAX_DEPTH || stack.contains(&addr) {
				return None;
			}
			stack.push(addr);
			Some(Visit(()))
		})
	}
}

impl Drop for Visit {
	fn drop(&mut self) {
		VISITING.with(|stack| {
			stack.borrow_mut().pop();
		});
	}
}

fn enter<E: serde::ser::Error>(addr: usize) -> Result<Visit, E> {
	Visit::enter(addr).ok_or_else(|| E::custom("converting circular structure to JSON"))
}

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for Value {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Value::Undefined | Value::Null | Value::Function(_) => serializer.serialize_unit(),
			Value::Bool(b) => serializer.serialize_bool(*b),
			Value::Number(n) if !n.is_finite() => serializer.serialize_unit(),
			Value::Number(n) if n.trunc() == *n && n.abs() <= MAX_SAFE_INTEGER => {
				serializer.serialize_i64(*n as i64)
			}
			Value::Number(n) => serializer.serialize_f64(*n),
			Value::String(s) => serializer.serialize_str(s),
			Value::Ref(r) => r.get().serialize(serializer),
			Value::Computed(c) => c.get().serialize(serializer),
			Value::Object(o) => serialize_object(&o.reactive(), serializer),
			Value::Array(a) => serialize_array(&a.reactive(), serializer),
			Value::Reactive(Reactive::Object(o)) => serialize_object(o, serializer),
			Value::Reactive(Reactive::Array(a)) => serialize_array(a, serializer),
			Value::Node(n) => serializer.serialize_str(&n.outer_html()),
			Value::Event(e) => serializer.serialize_str(&e.kind()),
		}
	}
}

fn serialize_object<S: Serializer>(object: &ReactiveObject, serializer: S) -> Result<S::Ok, S::Error> {
	let _visit = enter::<S::Error>(object.raw().addr())?;
	let entries: Vec<_> = object
		.entries()
		.into_iter()
		.filter(|(_, value)| !matches!(value, Value::Undefined | Value::Function(_)))
		.collect();

	let mut map = serializer.serialize_map(Some(entries.len()))?;
	for (key, value) in &entries {
		map.serialize_entry(&**key, value)?;
	}
	map.end()
}

fn serialize_array<S: Serializer>(array: &ReactiveArray, serializer: S) -> Result<S::Ok, S::Error> {
	let _visit = enter::<S::Error>(array.raw().addr())?;
	serializer.collect_seq(array.to_vec())
}

#[cfg(test)]
mod tests {
	use crate::error::Error;
	use crate::reactive::Object;
	use crate::value::Value;

	#[test]
	fn renders_like_json_stringify() {
		let object = Object::new()
			.with("n", 1)
			.with("half", 0.5)
			.with("tags", vec!["a\"b"])
			.with("skip", ())
			.with("none", Value::Null);
		assert_eq!(
			Value::from(object).to_json().unwrap(),
			"{\n  \"n\": 1,\n  \"half\": 0.5,\n  \"tags\": [\n    \"a\\\"b\"\n  ],\n  \"none\": null\n}"
		);
		assert_eq!(Value::from(vec![f64::NAN]).to_json().unwrap(), "[\n  null\n]");
		assert_eq!(Value::from(Object::new()).to_json().unwrap(), "{}");
	}

	#[test]
	fn cycles_fail_instead_of_recursing() {
		let object = Object::new().with("name", "loop");
		object.insert("me", object.clone());
		let value = Value::from(object);

		assert!(matches!(value.to_json(), Err(Error::Type(_))));
		assert!(matches!(value.to_display_string(), Err(Error::Type(_))));
		// the guard is released after a failure
		assert_eq!(Value::from(vec![1]).to_json().unwrap(), "[\n  1\n]");
	}

	#[test]
	fn shared_children_are_not_cycles() {
		let child = Object::new().with("v", 1);
		let parent = Object::new().with("a", child.clone()).with("b", child);
		assert!(Value::from(parent).to_json().is_ok());
	}

	#[test]
	fn deep_nesting_stops_at_the_limit() {
		let mut value = Value::from(1);
		for _ in 0..1_000 {
			value = Value::from(vec![value]);
		}
		assert!(value.to_json().is_err());
	}
}
