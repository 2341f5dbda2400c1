//! Property access and the native methods expressions can call on
//! values: array, string, number, event and node helpers plus the
//! `String`/`Number`/`Boolean` conversions.

use std::cmp::Ordering;
use std::rc::Rc;

use super::ast::Global;
use crate::array::relative_index;
use crate::dom::{HostEvent, HostNode, Node};
use crate::error::{Error, Result};
use crate::reactive::ReactiveArray;
use crate::value::{format_number, Function, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
	Name(Rc<str>),
	Index(usize),
}

impl PropKey {
	pub fn from_value(value: &Value) -> PropKey {
		match value {
			Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && n.is_finite() => PropKey::Index(*n as usize),
			Value::String(s) => match s.parse::<usize>() {
				Ok(i) if i.to_string() == **s => PropKey::Index(i),
				_ => PropKey::Name(s.clone()),
			},
			other => PropKey::Name(Rc::from(other.to_string())),
		}
	}

	pub fn name(&self) -> Rc<str> {
		match self {
			PropKey::Name(name) => name.clone(),
			PropKey::Index(i) => Rc::from(i.to_string()),
		}
	}

	fn is(&self, name: &str) -> bool {
		matches!(self, PropKey::Name(n) if &**n == name)
	}
}

pub fn global(global: Global) -> Value {
	match global {
		Global::NaN => Value::Number(f64::NAN),
		Global::Infinity => Value::Number(f64::INFINITY),
		Global::String => Value::Function(Function::named("String", |args| {
			Ok(match args.first() {
				Some(v) => Value::from(v.clone().unref().to_string()),
				None => Value::str(""),
			})
		})),
		Global::Number => Value::Function(Function::named("Number", |args| {
			Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
		})),
		Global::Boolean => Value::Function(Function::named("Boolean", |args| {
			Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
		})),
	}
}

pub fn get_property(target: &Value, key: &PropKey) -> Result<Value> {
	match target {
		Value::Ref(r) if key.is("value") => Ok(r.get()),
		Value::Computed(c) if key.is("value") => Ok(c.get()),
		Value::Ref(_) | Value::Computed(_) => get_property(&target.clone().unref(), key),
		Value::Undefined | Value::Null => Err(Error::type_error(format!(
			"cannot read properties of {} (reading '{}')",
			target,
			key.name()
		))),
		Value::String(s) => Ok(match key {
			PropKey::Index(i) => s.chars().nth(*i).map_or(Value::Undefined, |c| Value::from(c.to_string())),
			_ if key.is("length") => Value::from(s.encode_utf16().count()),
			_ => Value::Undefined,
		}),
		Value::Function(f) if key.is("name") => Ok(Value::str(f.name())),
		Value::Node(node) => Ok(match &*key.name() {
			"value" => Value::from(node.value()),
			"checked" => Value::Bool(node.checked()),
			"textContent" => Value::from(node.text_content()),
			"innerHTML" => Value::from(node.inner_html()),
			"tagName" => node
				.tag_name()
				.map_or(Value::Undefined, |t| Value::from(t.to_ascii_uppercase())),
			"id" | "type" | "name" => node.attribute(&key.name()).map_or(Value::str(""), Value::from),
			_ => Value::Undefined,
		}),
		Value::Event(event) => Ok(match &*key.name() {
			"type" => Value::from(event.kind()),
			"target" => event.target().map_or(Value::Null, Value::Node),
			"defaultPrevented" => Value::Bool(event.default_prevented()),
			_ => Value::Undefined,
		}),
		_ => {
			if let Some(array) = target.as_array() {
				return Ok(match key {
					PropKey::Index(i) => array.get(*i),
					_ if key.is("length") => Value::from(array.len()),
					_ => Value::Undefined,
				});
			}
			if let Some(object) = target.as_object() {
				return Ok(object.get(&key.name()));
			}
			Ok(Value::Undefined)
		}
	}
}

pub fn set_property(target: &Value, key: &PropKey, value: Value) -> Result<()> {
	match target {
		Value::Ref(r) if key.is("value") => {
			r.set(value);
			Ok(())
		}
		Value::Computed(_) if key.is("value") => Err(Error::type_error("computed value is read-only")),
		Value::Ref(_) | Value::Computed(_) => set_property(&target.clone().unref(), key, value),
		Value::Undefined | Value::Null => Err(Error::type_error(format!(
			"cannot set properties of {} (setting '{}')",
			target,
			key.name()
		))),
		Value::Node(node) => {
			match &*key.name() {
				"value" => node.set_value(&value.unref().to_string()),
				"checked" => node.set_checked(value.truthy()),
				"textContent" => node.set_text_content(&value.to_text()),
				"innerHTML" => node.set_inner_html(&value.to_text()),
				name => node.set_attribute(name, &value.unref().to_string()),
			}
			Ok(())
		}
		_ => {
			if let Some(array) = target.as_array() {
				match key {
					PropKey::Index(i) => array.set(*i, value),
					_ if key.is("length") => {
						let len = value.to_number();
						if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
							return Err(Error::type_error("invalid array length"));
						}
						array.set_len(len as usize);
					}
					_ => return Err(Error::type_error(format!("cannot set '{}' on an array", key.name()))),
				}
				return Ok(());
			}
			if let Some(object) = target.as_object() {
				object.set(&key.name(), value);
			}
			// primitives silently ignore writes
			Ok(())
		}
	}
}

pub fn call_method(target: &Value, name: &str, args: &[Value]) -> Result<Value> {
	let args: Vec<Value> = args.iter().cloned().map(Value::unref).collect();

	match target {
		Value::Ref(_) | Value::Computed(_) => call_method(&target.clone().unref(), name, &args),
		Value::Undefined | Value::Null => Err(Error::type_error(format!(
			"cannot read properties of {} (reading '{}')",
			target, name
		))),
		Value::String(s) => string_method(s, name, &args),
		Value::Number(n) => number_method(*n, name, &args),
		Value::Event(event) => match name {
			"preventDefault" => {
				event.prevent_default();
				Ok(Value::Undefined)
			}
			_ => Err(not_a_function("event", name)),
		},
		Value::Node(node) => node_method(node, name, &args),
		Value::Function(f) if name == "call" => f.call(args.get(1..).unwrap_or_default()),
		_ => {
			if let Some(array) = target.as_array() {
				return array_method(&array, name, &args);
			}
			if let Some(object) = target.as_object() {
				return match object.get(name) {
					Value::Function(f) => f.call(&args),
					_ if name == "hasOwnProperty" => Ok(Value::Bool(object.has(&arg_string(&args, 0)))),
					_ => Err(not_a_function("object", name)),
				};
			}
			match name {
				"toString" => Ok(Value::from(target.to_string())),
				_ => Err(not_a_function(target.type_of(), name)),
			}
		}
	}
}

fn not_a_function(receiver: &str, name: &str) -> Error {
	Error::type_error(format!("{}.{} is not a function", receiver, name))
}

fn arg(args: &[Value], index: usize) -> Value {
	args.get(index).cloned().unwrap_or_default()
}

fn arg_string(args: &[Value], index: usize) -> String {
	args.get(index).map(Value::to_string).unwrap_or_default()
}

/// Relative index argument with a default for `undefined`.
fn arg_index(args: &[Value], index: usize, len: usize, default: usize) -> usize {
	match args.get(index) {
		None | Some(Value::Undefined) => default,
		Some(v) => relative_index(v.to_number(), len),
	}
}

fn callback(args: &[Value], method: &str) -> Result<Function> {
	args.first()
		.and_then(Value::as_function)
		.cloned()
		.ok_or_else(|| Error::type_error(format!("{} expects a function", method)))
}

fn array_method(array: &ReactiveArray, name: &str, args: &[Value]) -> Result<Value> {
	Ok(match name {
		"push" => Value::from(array.extend(args.iter().cloned())),
		"pop" => array.pop(),
		"shift" => array.shift(),
		"unshift" => Value::from(array.unshift(args.iter().cloned())),
		"splice" => {
			let len = array.raw().len();
			let start = arg_index(args, 0, len, 0);
			let count = match args.get(1) {
				None => len - start,
				Some(v) => v.to_number().max(0.0).min((len - start) as f64) as usize,
			};
			let items = args.iter().skip(2).cloned();
			Value::from(array.splice(start, count, items))
		}
		"sort" => {
			match args.first().and_then(Value::as_function) {
				None => array.sort(),
				Some(compare) => {
					let mut error = None;
					array.sort_by(|a, b| {
						if error.is_some() {
							return Ordering::Equal;
						}
						match compare.call(&[a.clone(), b.clone()]) {
							Ok(result) => result.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal),
							Err(e) => {
								error = Some(e);
								Ordering::Equal
							}
						}
					});
					if let Some(error) = error {
						return Err(error);
					}
				}
			}
			Value::from(array.clone())
		}
		"reverse" => {
			array.reverse();
			Value::from(array.clone())
		}
		"fill" => {
			let len = array.raw().len();
			array.fill(arg(args, 0), arg_index(args, 1, len, 0), arg_index(args, 2, len, len));
			Value::from(array.clone())
		}
		"copyWithin" => {
			let len = array.raw().len();
			array.copy_within(
				arg_index(args, 0, len, 0),
				arg_index(args, 1, len, 0),
				arg_index(args, 2, len, len),
			);
			Value::from(array.clone())
		}
		"map" => {
			let func = callback(args, name)?;
			let mut out = Vec::new();
			for (i, item) in array.to_vec().into_iter().enumerate() {
				out.push(func.call(&[item, Value::from(i)])?);
			}
			Value::Array(out.into_iter().map(Value::into_raw).collect())
		}
		"filter" => {
			let func = callback(args, name)?;
			let mut out = Vec::new();
			for (i, item) in array.to_vec().into_iter().enumerate() {
				if func.call(&[item.clone(), Value::from(i)])?.truthy() {
					out.push(item.into_raw());
				}
			}
			Value::Array(out.into_iter().collect())
		}
		"find" | "findIndex" | "some" | "every" => {
			let func = callback(args, name)?;
			let mut found = None;
			for (i, item) in array.to_vec().into_iter().enumerate() {
				let hit = func.call(&[item.clone(), Value::from(i)])?.truthy();
				if hit != (name == "every") {
					found = Some((i, item));
					break;
				}
			}
			match name {
				"find" => found.map_or(Value::Undefined, |(_, item)| item),
				"findIndex" => found.map_or(Value::from(-1), |(i, _)| Value::from(i)),
				"some" => Value::Bool(found.is_some()),
				_ => Value::Bool(found.is_none()),
			}
		}
		"forEach" => {
			let func = callback(args, name)?;
			for (i, item) in array.to_vec().into_iter().enumerate() {
				func.call(&[item, Value::from(i)])?;
			}
			Value::Undefined
		}
		"reduce" => {
			let func = callback(args, name)?;
			let mut items = array.to_vec().into_iter().enumerate();
			let mut acc = match args.get(1) {
				Some(initial) => initial.clone(),
				None => match items.next() {
					Some((_, first)) => first,
					None => return Err(Error::type_error("reduce of empty array with no initial value")),
				},
			};
			for (i, item) in items {
				acc = func.call(&[acc, item, Value::from(i)])?;
			}
			acc
		}
		"includes" => Value::Bool(array.includes(&arg(args, 0))),
		"indexOf" => array.index_of(&arg(args, 0)).map_or(Value::from(-1), Value::from),
		"join" => {
			let separator = match args.first() {
				None | Some(Value::Undefined) => ",".to_owned(),
				Some(v) => v.to_string(),
			};
			Value::from(array.join(&separator))
		}
		"slice" => {
			let len = array.len();
			Value::from(array.slice(arg_index(args, 0, len, 0), arg_index(args, 1, len, len)))
		}
		"concat" => Value::from(array.concat(args)),
		"at" => {
			let len = array.len();
			let index = arg(args, 0).to_number().trunc();
			let index = if index < 0.0 { len as f64 + index } else { index };
			if index < 0.0 || index >= len as f64 {
				Value::Undefined
			} else {
				array.get(index as usize)
			}
		}
		"toString" => Value::from(array.join(",")),
		_ => return Err(not_a_function("array", name)),
	})
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Result<Value> {
	let chars: Vec<char> = s.chars().collect();
	let len = chars.len();
	let substring = |start: usize, end: usize| -> Value {
		let end = end.min(len);
		Value::from(chars[start.min(end)..end].iter().collect::<String>())
	};

	Ok(match name {
		"toUpperCase" => Value::from(s.to_uppercase()),
		"toLowerCase" => Value::from(s.to_lowercase()),
		"trim" => Value::str(s.trim()),
		"trimStart" => Value::str(s.trim_start()),
		"trimEnd" => Value::str(s.trim_end()),
		"includes" => Value::Bool(s.contains(arg_string(args, 0).as_str())),
		"startsWith" => Value::Bool(s.starts_with(arg_string(args, 0).as_str())),
		"endsWith" => Value::Bool(s.ends_with(arg_string(args, 0).as_str())),
		"indexOf" => {
			let needle = arg_string(args, 0);
			s.find(&needle)
				.map_or(Value::from(-1), |byte| Value::from(s[..byte].chars().count()))
		}
		"slice" => substring(arg_index(args, 0, len, 0), arg_index(args, 1, len, len)),
		"substring" => {
			let clamp = |i: usize, default: usize| match args.get(i) {
				None | Some(Value::Undefined) => default,
				Some(v) => {
					let n = v.to_number();
					if n.is_nan() { 0 } else { n.clamp(0.0, len as f64) as usize }
				}
			};
			let (a, b) = (clamp(0, 0), clamp(1, len));
			substring(a.min(b), a.max(b))
		}
		"charAt" => substring(arg_index(args, 0, len, 0), arg_index(args, 0, len, 0) + 1),
		"split" => match args.first() {
			None | Some(Value::Undefined) => Value::from(vec![Value::str(s)]),
			Some(separator) => {
				let separator = separator.to_string();
				let parts: Vec<Value> = if separator.is_empty() {
					chars.iter().map(|c| Value::from(c.to_string())).collect()
				} else {
					s.split(separator.as_str()).map(Value::str).collect()
				};
				Value::from(parts)
			}
		},
		"replace" => Value::from(s.replacen(arg_string(args, 0).as_str(), &arg_string(args, 1), 1)),
		"replaceAll" => Value::from(s.replace(arg_string(args, 0).as_str(), &arg_string(args, 1))),
		"repeat" => {
			let count = arg(args, 0).to_number();
			if count < 0.0 || !count.is_finite() {
				return Err(Error::type_error("invalid count value"));
			}
			Value::from(s.repeat(count as usize))
		}
		"padStart" | "padEnd" => {
			let target = arg(args, 0).to_number().max(0.0) as usize;
			let fill = match args.get(1) {
				None | Some(Value::Undefined) => " ".to_owned(),
				Some(v) => v.to_string(),
			};
			if target <= len || fill.is_empty() {
				Value::str(s)
			} else {
				let padding: String = fill.chars().cycle().take(target - len).collect();
				if name == "padStart" {
					Value::from(padding + s)
				} else {
					Value::from(s.to_owned() + &padding)
				}
			}
		}
		"concat" => Value::from(args.iter().fold(s.to_owned(), |mut out, v| {
			out.push_str(&v.to_string());
			out
		})),
		"toString" => Value::str(s),
		_ => return Err(not_a_function("string", name)),
	})
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Result<Value> {
	Ok(match name {
		"toFixed" => {
			let digits = arg(args, 0).to_number();
			let digits = if digits.is_nan() { 0.0 } else { digits };
			if !(0.0..=100.0).contains(&digits) {
				return Err(Error::type_error("toFixed() digits argument must be between 0 and 100"));
			}
			if !n.is_finite() {
				Value::from(format_number(n))
			} else {
				Value::from(format!("{:.*}", digits as usize, n))
			}
		}
		"toString" => Value::from(format_number(n)),
		_ => return Err(not_a_function("number", name)),
	})
}

fn node_method(node: &Node, name: &str, args: &[Value]) -> Result<Value> {
	Ok(match name {
		"getAttribute" => node.attribute(&arg_string(args, 0)).map_or(Value::Null, Value::from),
		"setAttribute" => {
			node.set_attribute(&arg_string(args, 0), &arg_string(args, 1));
			Value::Undefined
		}
		"removeAttribute" => {
			node.remove_attribute(&arg_string(args, 0));
			Value::Undefined
		}
		"hasAttribute" => Value::Bool(node.has_attribute(&arg_string(args, 0))),
		"click" => {
			node.click();
			Value::Undefined
		}
		_ => return Err(not_a_function("node", name)),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactive::{Array, Object};

	fn items(values: &[f64]) -> Value {
		Value::Array(values.iter().map(|n| Value::Number(*n)).collect::<Array>())
	}

	#[test]
	fn reads_lengths_and_indices() {
		let list = items(&[1.0, 2.0]);
		assert_eq!(get_property(&list, &PropKey::Name("length".into())).unwrap(), Value::from(2));
		assert_eq!(get_property(&list, &PropKey::Index(1)).unwrap(), Value::from(2));
		assert_eq!(get_property(&Value::str("héllo"), &PropKey::Name("length".into())).unwrap(), Value::from(5));
		assert!(matches!(
			get_property(&Value::Undefined, &PropKey::Name("x".into())),
			Err(Error::Type(_))
		));
	}

	#[test]
	fn index_keys_from_strings() {
		assert_eq!(PropKey::from_value(&Value::str("3")), PropKey::Index(3));
		assert_eq!(PropKey::from_value(&Value::str("03")), PropKey::Name("03".into()));
		assert_eq!(PropKey::from_value(&Value::Number(1.5)), PropKey::Name("1.5".into()));
	}

	#[test]
	fn array_methods_call_back_and_propagate_errors() {
		let list = items(&[3.0, 1.0, 2.0]);
		let double = Value::Function(Function::new(|args| Ok(Value::Number(args[0].to_number() * 2.0))));
		let mapped = call_method(&list, "map", &[double]).unwrap();
		assert_eq!(mapped.to_string(), "6,2,4");

		let failing = Value::Function(Function::new(|_| Err(Error::type_error("boom"))));
		assert_eq!(call_method(&list, "filter", &[failing]), Err(Error::type_error("boom")));

		call_method(&list, "sort", &[]).unwrap();
		assert_eq!(list.to_string(), "1,2,3");
		assert_eq!(call_method(&list, "indexOf", &[Value::from(2)]).unwrap(), Value::from(1));
		assert_eq!(call_method(&list, "join", &[Value::str("-")]).unwrap(), Value::str("1-2-3"));
	}

	#[test]
	fn string_and_number_methods() {
		let s = Value::str("  Hello ");
		assert_eq!(call_method(&s, "trim", &[]).unwrap(), Value::str("Hello"));
		assert_eq!(
			call_method(&Value::str("a,b"), "split", &[Value::str(",")]).unwrap().to_string(),
			"a,b"
		);
		assert_eq!(
			call_method(&Value::str("7"), "padStart", &[Value::from(3), Value::str("0")]).unwrap(),
			Value::str("007")
		);
		assert_eq!(call_method(&Value::Number(1.005), "toFixed", &[Value::from(1)]).unwrap(), Value::str("1.0"));
		assert!(matches!(call_method(&Value::Number(1.0), "nope", &[]), Err(Error::Type(_))));
	}

	#[test]
	fn object_function_properties_are_methods() {
		let object = Object::new().with(
			"greet",
			Function::new(|args| Ok(Value::from(format!("hi {}", args[0])))),
		);
		let result = call_method(&Value::Object(object), "greet", &[Value::str("bo")]).unwrap();
		assert_eq!(result, Value::str("hi bo"));
	}
}
