use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::dep::DepMap;
use crate::value::{same_value, Value};

pub type Props = IndexMap<Rc<str>, Value, FxBuildHasher>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ObjectKey {
	Prop(Rc<str>),
	Iterate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ArrayKey {
	Index(usize),
	Length,
	Iterate,
}

/// Raw insertion-ordered map. Its dep table lives in the same allocation,
/// so every reactive view of one object observes the same deps.
#[derive(Clone, Default)]
pub struct Object {
	body: Rc<ObjectBody>,
}

#[derive(Default)]
struct ObjectBody {
	props: RefCell<Props>,
	deps: DepMap<ObjectKey>,
}

/// Raw list, paired with its dep table like [`Object`].
#[derive(Clone, Default)]
pub struct Array {
	body: Rc<ArrayBody>,
}

#[derive(Default)]
pub(crate) struct ArrayBody {
	pub(crate) items: RefCell<Vec<Value>>,
	pub(crate) deps: DepMap<ArrayKey>,
}

/// Tracked view over a raw container.
#[derive(Clone)]
pub enum Reactive {
	Object(ReactiveObject),
	Array(ReactiveArray),
}

/// Observable map: reads track, writes notify.
#[derive(Clone)]
pub struct ReactiveObject {
	raw: Object,
}

/// Observable list with the JS array method surface.
#[derive(Clone)]
pub struct ReactiveArray {
	pub(crate) raw: Array,
}

/// Wrap objects and arrays in their reactive view; everything else passes
/// through. Wrapping twice yields the same view.
pub fn reactive(value: impl Into<Value>) -> Value {
	value.into().wrap()
}

pub fn to_raw(value: impl Into<Value>) -> Value {
	value.into().into_raw()
}

impl Object {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	/// Untracked insert that still notifies observers.
	pub fn insert(&self, key: &str, value: impl Into<Value>) {
		self.reactive().set(key, value);
	}

	/// Untracked raw read.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.body.props.borrow().get(key).cloned()
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.body.props.borrow().contains_key(key)
	}

	pub fn keys(&self) -> Vec<Rc<str>> {
		self.body.props.borrow().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.body.props.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn reactive(&self) -> ReactiveObject {
		ReactiveObject { raw: self.clone() }
	}

	pub fn ptr_eq(&self, other: &Object) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	pub(crate) fn addr(&self) -> usize {
		Rc::as_ptr(&self.body) as *const () as usize
	}
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Object {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let object = Object::new();
		{
			let mut props = object.body.props.borrow_mut();
			for (k, v) in iter {
				props.insert(Rc::from(k.as_ref()), v.into().into_raw());
			}
		}
		object
	}
}

impl Array {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.body.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Untracked raw read.
	pub fn get(&self, index: usize) -> Option<Value> {
		self.body.items.borrow().get(index).cloned()
	}

	pub fn reactive(&self) -> ReactiveArray {
		ReactiveArray { raw: self.clone() }
	}

	pub fn ptr_eq(&self, other: &Array) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	pub(crate) fn addr(&self) -> usize {
		Rc::as_ptr(&self.body) as *const () as usize
	}

	pub(crate) fn body(&self) -> &ArrayBody {
		&self.body
	}
}

impl FromIterator<Value> for Array {
	fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
		let array = Array::new();
		array
			.body
			.items
			.borrow_mut()
			.extend(iter.into_iter().map(Value::into_raw));
		array
	}
}

impl ReactiveObject {
	pub fn raw(&self) -> Object {
		self.raw.clone()
	}

	pub fn get(&self, key: &str) -> Value {
		let body = &self.raw.body;
		body.deps.track(&ObjectKey::Prop(Rc::from(key)));
		let value = body.props.borrow().get(key).cloned();
		value.map_or(Value::Undefined, Value::wrap)
	}

	pub fn set(&self, key: &str, value: impl Into<Value>) {
		let body = &self.raw.body;
		let value = value.into().into_raw();
		let key: Rc<str> = Rc::from(key);

		let (changed, added) = {
			let mut props = body.props.borrow_mut();
			match props.get_mut(&key) {
				Some(old) if same_value(old, &value) => (false, false),
				Some(old) => {
					*old = value;
					(true, false)
				}
				None => {
					props.insert(key.clone(), value);
					(true, true)
				}
			}
		};

		if changed {
			body.deps.trigger(&ObjectKey::Prop(key));
		}
		if added {
			body.deps.trigger(&ObjectKey::Iterate);
		}
	}

	pub fn delete(&self, key: &str) -> bool {
		let body = &self.raw.body;
		let removed = body.props.borrow_mut().shift_remove(key).is_some();
		if removed {
			body.deps.trigger(&ObjectKey::Prop(Rc::from(key)));
			body.deps.trigger(&ObjectKey::Iterate);
		}
		removed
	}

	pub fn has(&self, key: &str) -> bool {
		let body = &self.raw.body;
		body.deps.track(&ObjectKey::Prop(Rc::from(key)));
		body.props.borrow().contains_key(key)
	}

	pub fn keys(&self) -> Vec<Rc<str>> {
		self.raw.body.deps.track(&ObjectKey::Iterate);
		self.raw.keys()
	}

	pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
		self.keys()
			.into_iter()
			.map(|k| {
				let v = self.get(&k);
				(k, v)
			})
			.collect()
	}

	pub fn len(&self) -> usize {
		self.raw.body.deps.track(&ObjectKey::Iterate);
		self.raw.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
		self.raw.ptr_eq(&other.raw)
	}
}

impl Reactive {
	pub fn ptr_eq(&self, other: &Reactive) -> bool {
		match (self, other) {
			(Reactive::Object(a), Reactive::Object(b)) => a.ptr_eq(b),
			(Reactive::Array(a), Reactive::Array(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Debug for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map()
			.entries(self.body.props.borrow().iter())
			.finish()
	}
}

impl fmt::Debug for Array {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.body.items.borrow().iter()).finish()
	}
}
