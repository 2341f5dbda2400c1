use std::cmp::Ordering;

use crate::reactive::{Array, ArrayKey, ReactiveArray};
use crate::value::{same_value, same_value_zero, strict_equals, Value};

/// Resolve a JS-style relative index (negative counts from the end).
pub fn relative_index(index: f64, len: usize) -> usize {
	if index.is_nan() {
		return 0;
	}
	let len_f = len as f64;
	let index = index.trunc();
	if index < 0.0 {
		(len_f + index).max(0.0) as usize
	} else {
		index.min(len_f) as usize
	}
}

impl ReactiveArray {
	pub fn raw(&self) -> Array {
		self.raw.clone()
	}

	pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
		self.raw.ptr_eq(&other.raw)
	}

	fn track(&self, key: ArrayKey) {
		self.raw.body().deps.track(&key);
	}

	/// Depend on the whole array: shape, length and every position.
	fn track_all(&self) {
		self.track(ArrayKey::Iterate);
		self.track(ArrayKey::Length);
		for i in 0..self.raw.len() {
			self.track(ArrayKey::Index(i));
		}
	}

	fn trigger(&self, key: ArrayKey) {
		self.raw.body().deps.trigger(&key);
	}

	fn trigger_shape(&self) {
		self.trigger(ArrayKey::Length);
		self.trigger(ArrayKey::Iterate);
	}

	fn trigger_from(&self, start: usize) {
		self.raw
			.body()
			.deps
			.trigger_where(|k| matches!(k, ArrayKey::Index(i) if *i >= start));
	}

	fn snapshot(&self) -> Vec<Value> {
		self.raw.body().items.borrow().clone()
	}

	pub fn len(&self) -> usize {
		self.track(ArrayKey::Length);
		self.raw.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Value {
		self.track(ArrayKey::Index(index));
		self.raw.get(index).map_or(Value::Undefined, Value::wrap)
	}

	pub fn set(&self, index: usize, value: impl Into<Value>) {
		let value = value.into().into_raw();
		let grew = {
			let mut items = self.raw.body().items.borrow_mut();
			if index < items.len() {
				if same_value(&items[index], &value) {
					return;
				}
				items[index] = value;
				false
			} else {
				items.resize(index, Value::Undefined);
				items.push(value);
				true
			}
		};

		self.trigger(ArrayKey::Index(index));
		if grew {
			self.trigger_shape();
		}
	}

	/// Assigning `length`: truncates or pads with `undefined`.
	pub fn set_len(&self, len: usize) {
		let old = {
			let mut items = self.raw.body().items.borrow_mut();
			let old = items.len();
			if old == len {
				return;
			}
			items.resize(len, Value::Undefined);
			old
		};

		self.trigger_from(old.min(len));
		self.trigger_shape();
	}

	pub fn push(&self, value: impl Into<Value>) -> usize {
		self.extend([value.into()])
	}

	pub fn extend(&self, values: impl IntoIterator<Item = Value>) -> usize {
		let (start, len) = {
			let mut items = self.raw.body().items.borrow_mut();
			let start = items.len();
			items.extend(values.into_iter().map(Value::into_raw));
			(start, items.len())
		};

		if len != start {
			self.trigger_from(start);
			self.trigger_shape();
		}
		len
	}

	pub fn pop(&self) -> Value {
		let popped = self.raw.body().items.borrow_mut().pop();
		match popped {
			Some(value) => {
				self.trigger(ArrayKey::Index(self.raw.len()));
				self.trigger_shape();
				value.wrap()
			}
			None => Value::Undefined,
		}
	}

	pub fn shift(&self) -> Value {
		let shifted = {
			let mut items = self.raw.body().items.borrow_mut();
			if items.is_empty() {
				None
			} else {
				Some(items.remove(0))
			}
		};

		match shifted {
			Some(value) => {
				self.trigger_from(0);
				self.trigger_shape();
				value.wrap()
			}
			None => Value::Undefined,
		}
	}

	pub fn unshift(&self, values: impl IntoIterator<Item = Value>) -> usize {
		let (added, len) = {
			let mut items = self.raw.body().items.borrow_mut();
			let values: Vec<_> = values.into_iter().map(Value::into_raw).collect();
			let added = values.len();
			items.splice(0..0, values);
			(added, items.len())
		};

		if added > 0 {
			self.trigger_from(0);
			self.trigger_shape();
		}
		len
	}

	/// Remove `delete_count` items at `start`, insert `values` in their
	/// place and return the removed items.
	pub fn splice(
		&self,
		start: usize,
		delete_count: usize,
		values: impl IntoIterator<Item = Value>,
	) -> ReactiveArray {
		let removed: Vec<Value> = {
			let mut items = self.raw.body().items.borrow_mut();
			let start = start.min(items.len());
			let end = start.saturating_add(delete_count).min(items.len());
			let values: Vec<_> = values.into_iter().map(Value::into_raw).collect();
			items.splice(start..end, values).collect()
		};

		self.trigger_from(start);
		self.trigger_shape();
		Array::from_iter(removed).reactive()
	}

	/// Default JS sort: compares string renderings, `undefined` last.
	pub fn sort(&self) {
		self.sort_by(|a, b| match (a, b) {
			(Value::Undefined, Value::Undefined) => Ordering::Equal,
			(Value::Undefined, _) => Ordering::Greater,
			(_, Value::Undefined) => Ordering::Less,
			_ => a.to_string().cmp(&b.to_string()),
		});
	}

	pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
		let mut items = self.snapshot();
		items.sort_by(|a, b| compare(&a.clone().wrap(), &b.clone().wrap()));
		*self.raw.body().items.borrow_mut() = items;

		self.trigger_from(0);
		self.trigger_shape();
	}

	pub fn reverse(&self) {
		self.raw.body().items.borrow_mut().reverse();
		self.trigger_from(0);
		self.trigger_shape();
	}

	pub fn fill(&self, value: impl Into<Value>, start: usize, end: usize) {
		let value = value.into().into_raw();
		let start = {
			let mut items = self.raw.body().items.borrow_mut();
			let end = end.min(items.len());
			let start = start.min(end);
			for item in &mut items[start..end] {
				*item = value.clone();
			}
			start
		};

		self.trigger_from(start);
		self.trigger_shape();
	}

	pub fn copy_within(&self, target: usize, start: usize, end: usize) {
		let target = {
			let mut items = self.raw.body().items.borrow_mut();
			let len = items.len();
			let end = end.min(len);
			let start = start.min(end);
			if target >= len {
				return;
			}
			let count = (end - start).min(len - target);
			let copied: Vec<_> = items[start..start + count].to_vec();
			for (offset, value) in copied.into_iter().enumerate() {
				items[target + offset] = value;
			}
			target
		};

		self.trigger_from(target);
		self.trigger_shape();
	}

	pub fn to_vec(&self) -> Vec<Value> {
		self.track_all();
		self.snapshot().into_iter().map(Value::wrap).collect()
	}

	pub fn for_each(&self, mut func: impl FnMut(Value, usize)) {
		for (i, item) in self.to_vec().into_iter().enumerate() {
			func(item, i);
		}
	}

	pub fn map(&self, mut func: impl FnMut(Value, usize) -> Value) -> ReactiveArray {
		self.to_vec()
			.into_iter()
			.enumerate()
			.map(|(i, item)| func(item, i))
			.collect::<Array>()
			.reactive()
	}

	pub fn filter(&self, mut pred: impl FnMut(&Value, usize) -> bool) -> ReactiveArray {
		self.to_vec()
			.into_iter()
			.enumerate()
			.filter(|(i, item)| pred(item, *i))
			.map(|(_, item)| item)
			.collect::<Array>()
			.reactive()
	}

	pub fn find(&self, mut pred: impl FnMut(&Value, usize) -> bool) -> Value {
		self.to_vec()
			.into_iter()
			.enumerate()
			.find(|(i, item)| pred(item, *i))
			.map_or(Value::Undefined, |(_, item)| item)
	}

	pub fn find_index(&self, mut pred: impl FnMut(&Value, usize) -> bool) -> Option<usize> {
		self.to_vec()
			.iter()
			.enumerate()
			.position(|(i, item)| pred(item, i))
	}

	pub fn some(&self, pred: impl FnMut(&Value, usize) -> bool) -> bool {
		self.find_index(pred).is_some()
	}

	pub fn every(&self, mut pred: impl FnMut(&Value, usize) -> bool) -> bool {
		self.find_index(|item, i| !pred(item, i)).is_none()
	}

	/// Compares against the raw form, so a reactive view of an element
	/// matches the element itself.
	pub fn includes(&self, needle: &Value) -> bool {
		self.track_all();
		let needle = needle.clone().into_raw();
		self.snapshot().iter().any(|item| same_value_zero(item, &needle))
	}

	pub fn index_of(&self, needle: &Value) -> Option<usize> {
		self.track_all();
		let needle = needle.clone().into_raw();
		self.snapshot().iter().position(|item| strict_equals(item, &needle))
	}

	pub fn join(&self, separator: &str) -> String {
		self.to_vec()
			.iter()
			.map(|item| {
				if item.is_nullish() {
					String::new()
				} else {
					item.to_string()
				}
			})
			.collect::<Vec<_>>()
			.join(separator)
	}

	pub fn slice(&self, start: usize, end: usize) -> ReactiveArray {
		let items = self.to_vec();
		let end = end.min(items.len());
		let start = start.min(end);
		items[start..end].iter().cloned().collect::<Array>().reactive()
	}

	pub fn concat(&self, other: &[Value]) -> ReactiveArray {
		let mut items = self.to_vec();
		for value in other {
			match value.as_array() {
				Some(array) => items.extend(array.to_vec()),
				None => items.push(value.clone()),
			}
		}
		items.into_iter().collect::<Array>().reactive()
	}
}
