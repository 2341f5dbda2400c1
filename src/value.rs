use std::fmt;
use std::rc::Rc;

use crate::computed::Computed;
use crate::dom::{Event, HostEvent, HostNode, Node};
use crate::error::{Error, Result};
use crate::json::Visit;
use crate::r#ref::Ref;
use crate::reactive::{Array, Object, Reactive, ReactiveArray, ReactiveObject};

/// Dynamically typed value flowing between state and templates.
///
/// `Object` and `Array` are raw containers; `Reactive` is a tracked view
/// over one of them. `Ref` and `Computed` are the ref-shaped variants that
/// templates unwrap at use sites.
#[derive(Clone, Default)]
pub enum Value {
	#[default]
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(Rc<str>),
	Object(Object),
	Array(Array),
	Reactive(Reactive),
	Ref(Ref),
	Computed(Computed),
	Function(Function),
	Node(Node),
	Event(Event),
}

impl Value {
	pub fn str(s: &str) -> Self {
		Value::String(Rc::from(s))
	}

	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Undefined | Value::Null)
	}

	pub fn is_ref(&self) -> bool {
		matches!(self, Value::Ref(_) | Value::Computed(_))
	}

	/// Read through a ref-shaped value, tracking it.
	pub fn unref(self) -> Value {
		match self {
			Value::Ref(r) => r.get(),
			Value::Computed(c) => c.get(),
			other => other,
		}
	}

	/// Strip any reactive view so the value can be stored.
	pub fn into_raw(self) -> Value {
		match self {
			Value::Reactive(Reactive::Object(o)) => Value::Object(o.raw()),
			Value::Reactive(Reactive::Array(a)) => Value::Array(a.raw()),
			other => other,
		}
	}

	/// Wrap raw containers in their reactive view.
	pub fn wrap(self) -> Value {
		match self {
			Value::Object(o) => Value::Reactive(Reactive::Object(o.reactive())),
			Value::Array(a) => Value::Reactive(Reactive::Array(a.reactive())),
			other => other,
		}
	}

	pub fn as_object(&self) -> Option<ReactiveObject> {
		match self {
			Value::Object(o) => Some(o.reactive()),
			Value::Reactive(Reactive::Object(o)) => Some(o.clone()),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<ReactiveArray> {
		match self {
			Value::Array(a) => Some(a.reactive()),
			Value::Reactive(Reactive::Array(a)) => Some(a.clone()),
			_ => None,
		}
	}

	pub fn as_function(&self) -> Option<&Function> {
		match self {
			Value::Function(f) => Some(f),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn truthy(&self) -> bool {
		match self {
			Value::Undefined | Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::String(s) => !s.is_empty(),
			Value::Ref(_) | Value::Computed(_) => self.clone().unref().truthy(),
			_ => true,
		}
	}

	pub fn to_number(&self) -> f64 {
		match self {
			Value::Undefined => f64::NAN,
			Value::Null => 0.0,
			Value::Bool(b) => f64::from(u8::from(*b)),
			Value::Number(n) => *n,
			Value::String(s) => parse_number(s),
			Value::Ref(_) | Value::Computed(_) => self.clone().unref().to_number(),
			_ => f64::NAN,
		}
	}

	pub fn type_of(&self) -> &'static str {
		match self {
			Value::Undefined => "undefined",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::Function(_) => "function",
			Value::Ref(_) | Value::Computed(_) => self.clone().unref().type_of(),
			_ => "object",
		}
	}

	/// Text rendered by interpolation: nullish values render empty and
	/// containers render as indented JSON. Fails on circular containers.
	pub fn to_display_string(&self) -> Result<String> {
		Ok(match self {
			Value::Undefined | Value::Null => String::new(),
			Value::Ref(_) | Value::Computed(_) => return self.clone().unref().to_display_string(),
			Value::Object(_) | Value::Array(_) | Value::Reactive(_) => self.to_json()?,
			other => other.to_string(),
		})
	}

	/// `String(value)` with nullish values rendering empty, as DOM text and
	/// form values are assigned.
	pub fn to_text(&self) -> String {
		match self {
			Value::Undefined | Value::Null => String::new(),
			Value::Ref(_) | Value::Computed(_) => self.clone().unref().to_text(),
			other => other.to_string(),
		}
	}

	/// `JSON.stringify(value, null, 2)`.
	pub fn to_json(&self) -> Result<String> {
		serde_json::to_string_pretty(self).map_err(|error| Error::type_error(error.to_string()))
	}

	/// Allocation address of a reference-typed value, through refs and views.
	pub(crate) fn identity(&self) -> Option<usize> {
		match self {
			Value::Object(o) => Some(o.addr()),
			Value::Array(a) => Some(a.addr()),
			Value::Reactive(Reactive::Object(o)) => Some(o.raw().addr()),
			Value::Reactive(Reactive::Array(a)) => Some(a.raw().addr()),
			Value::Function(f) => Some(Rc::as_ptr(&f.body) as *const () as usize),
			Value::Ref(_) | Value::Computed(_) => self.clone().unref().identity(),
			_ => None,
		}
	}
}

fn parse_number(s: &str) -> f64 {
	let trimmed = s.trim();
	if trimmed.is_empty() {
		return 0.0;
	}
	match trimmed {
		"Infinity" | "+Infinity" => f64::INFINITY,
		"-Infinity" => f64::NEG_INFINITY,
		_ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
	}
}

/// `Number.prototype.toString()`: shortest round-trip digits, plain
/// notation between `1e-6` and `1e21`, exponent notation outside it.
pub fn format_number(n: f64) -> String {
	if n.is_nan() {
		return "NaN".into();
	}
	if n.is_infinite() {
		return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
	}
	if n == 0.0 {
		return "0".into();
	}

	let abs = n.abs();
	if !(1e-6..1e21).contains(&abs) {
		let s = format!("{:e}", n);
		return match s.split_once('e') {
			Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
			_ => s,
		};
	}
	if n != n.trunc() {
		return format!("{}", n);
	}

	// integral: shortest digits padded with zeros up to the exponent
	let scientific = format!("{:e}", abs);
	let (mantissa, exp) = scientific.split_once('e').unwrap_or((&scientific, "0"));
	let mut out = String::with_capacity(24);
	if n < 0.0 {
		out.push('-');
	}
	out.extend(mantissa.chars().filter(|c| *c != '.'));
	let width = exp.parse::<usize>().unwrap_or(0) + usize::from(n < 0.0) + 1;
	while out.len() < width {
		out.push('0');
	}
	out
}

/// `Object.is` semantics over raw identities.
pub fn same_value(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => {
			if x.is_nan() && y.is_nan() {
				true
			} else {
				x == y && x.is_sign_negative() == y.is_sign_negative()
			}
		}
		_ => identical(a, b),
	}
}

/// `===` semantics.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => x == y,
		_ => identical(a, b),
	}
}

/// Equality used by `includes`: like `===` but NaN matches NaN.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
		_ => identical(a, b),
	}
}

fn identical(a: &Value, b: &Value) -> bool {
	match (&raw_view(a), &raw_view(b)) {
		(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
		(Value::Bool(x), Value::Bool(y)) => x == y,
		(Value::Number(x), Value::Number(y)) => x == y,
		(Value::String(x), Value::String(y)) => x == y,
		(Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
		(Value::Array(x), Value::Array(y)) => x.ptr_eq(y),
		(Value::Ref(x), Value::Ref(y)) => x.ptr_eq(y),
		(Value::Computed(x), Value::Computed(y)) => x.ptr_eq(y),
		(Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
		(Value::Node(x), Value::Node(y)) => x == y,
		(Value::Event(x), Value::Event(y)) => x.ptr_eq(y),
		_ => false,
	}
}

fn raw_view(value: &Value) -> Value {
	value.clone().into_raw()
}

/// `==` semantics for the primitive cases templates meet in practice.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
	let a = a.clone().unref().into_raw();
	let b = b.clone().unref().into_raw();
	match (&a, &b) {
		(x, y) if x.is_nullish() && y.is_nullish() => true,
		(x, _) | (_, x) if x.is_nullish() => false,
		(Value::Number(_), Value::String(_))
		| (Value::String(_), Value::Number(_))
		| (Value::Bool(_), _)
		| (_, Value::Bool(_)) => a.to_number() == b.to_number(),
		_ => strict_equals(&a, &b),
	}
}

/// `String(value)`.
impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("undefined"),
			Value::Null => f.write_str("null"),
			Value::Bool(b) => write!(f, "{}", b),
			Value::Number(n) => f.write_str(&format_number(*n)),
			Value::String(s) => f.write_str(s),
			Value::Object(_) | Value::Reactive(Reactive::Object(_)) => f.write_str("[object Object]"),
			Value::Array(a) => display_array(&a.reactive(), f),
			Value::Reactive(Reactive::Array(a)) => display_array(a, f),
			Value::Ref(r) => write!(f, "{}", r.get()),
			Value::Computed(c) => write!(f, "{}", c.get()),
			Value::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name()),
			Value::Node(n) => write!(f, "[object {}]", n.tag_name().as_deref().unwrap_or("Node")),
			Value::Event(_) => f.write_str("[object Event]"),
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("Undefined"),
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => write!(f, "Bool({})", b),
			Value::Number(n) => write!(f, "Number({})", n),
			Value::String(s) => write!(f, "String({:?})", s),
			Value::Ref(r) => write!(f, "Ref({:?})", r.get_untracked()),
			Value::Computed(_) => f.write_str("Computed"),
			Value::Function(func) => write!(f, "Function({})", func.name()),
			Value::Node(n) => write!(f, "Node({:?})", n),
			Value::Event(e) => write!(f, "Event({})", e.kind()),
			other => match other.to_json() {
				Ok(json) => f.write_str(&json),
				Err(_) => f.write_str("[Circular]"),
			},
		}
	}
}

/// A cycle renders empty, like `Array.prototype.join`.
fn display_array(array: &ReactiveArray, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	match Visit::enter(array.raw().addr()) {
		Some(_visit) => f.write_str(&array.join(",")),
		None => Ok(()),
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		same_value(self, other)
	}
}

/// Native callable exposed to templates.
#[derive(Clone)]
pub struct Function {
	body: Rc<FunctionBody>,
}

struct FunctionBody {
	name: Rc<str>,
	func: Box<dyn Fn(&[Value]) -> Result<Value>>,
}

impl Function {
	pub fn new(func: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
		Self::named("anonymous", func)
	}

	pub fn named(name: &str, func: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
		Function {
			body: Rc::new(FunctionBody {
				name: Rc::from(name),
				func: Box::new(func),
			}),
		}
	}

	/// A handler that ignores its arguments.
	pub fn action(func: impl Fn() + 'static) -> Self {
		Self::new(move |_| {
			func();
			Ok(Value::Undefined)
		})
	}

	pub fn name(&self) -> &str {
		&self.body.name
	}

	pub fn call(&self, args: &[Value]) -> Result<Value> {
		(self.body.func)(args)
	}

	pub fn ptr_eq(&self, other: &Function) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

macro_rules! impl_from_number {
	($($t:ty),*) => {
		$(impl From<$t> for Value {
			fn from(n: $t) -> Self {
				Value::Number(n as f64)
			}
		})*
	};
}

impl_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(Rc::from(s))
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(Rc::from(s))
	}
}

impl From<Rc<str>> for Value {
	fn from(s: Rc<str>) -> Self {
		Value::String(s)
	}
}

impl From<()> for Value {
	fn from(_: ()) -> Self {
		Value::Undefined
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map_or(Value::Null, Into::into)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::Array(Array::from_iter(items.into_iter().map(Into::into)))
	}
}

macro_rules! impl_from_variant {
	($($t:ty => $variant:ident),*) => {
		$(impl From<$t> for Value {
			fn from(v: $t) -> Self {
				Value::$variant(v)
			}
		})*
	};
}

impl_from_variant!(
	Object => Object,
	Array => Array,
	Reactive => Reactive,
	Ref => Ref,
	Computed => Computed,
	Function => Function,
	Node => Node,
	Event => Event
);

impl From<ReactiveObject> for Value {
	fn from(o: ReactiveObject) -> Self {
		Value::Reactive(Reactive::Object(o))
	}
}

impl From<ReactiveArray> for Value {
	fn from(a: ReactiveArray) -> Self {
		Value::Reactive(Reactive::Array(a))
	}
}
