use std::cell::RefCell;
use std::rc::Rc;

use enclose::enclose;

use super::Compiler;
use crate::dom::{HostNode, Node};
use crate::json::Visit;
use crate::scope::Scope;
use crate::value::Value;

/// `:name="expr"` / `z-bind:name="expr"`.
pub(super) fn compile_attribute(compiler: &Compiler, element: &Node, scope: &Scope, name: &str, source: &str) {
	let bindings = scope.bindings().clone();
	let source = source.to_owned();
	let name = name.to_ascii_lowercase();

	match name.as_str() {
		"class" => {
			let fixed = element.attribute("class").unwrap_or_default();
			compiler.effect(
				scope,
				"bind:class",
				enclose!((compiler, element) move || {
					let value = compiler.eval(&source, &bindings).unref();
					let mut classes: Vec<String> = Vec::new();
					for class in fixed.split_whitespace().map(str::to_owned).chain(class_names(&value)) {
						if !classes.contains(&class) {
							classes.push(class);
						}
					}
					if classes.is_empty() {
						element.remove_attribute("class");
					} else {
						element.set_attribute("class", &classes.join(" "));
					}
					Ok(())
				}),
			);
		}
		"style" => {
			let applied: Rc<RefCell<Vec<String>>> = Rc::default();
			compiler.effect(
				scope,
				"bind:style",
				enclose!((compiler, element) move || {
					let value = compiler.eval(&source, &bindings).unref();
					let declarations = style_declarations(&value);
					let mut applied = applied.borrow_mut();
					for stale in applied.iter() {
						if !declarations.iter().any(|(property, _)| property == stale) {
							element.remove_style_property(stale);
						}
					}
					for (property, value) in &declarations {
						element.set_style_property(property, value);
					}
					*applied = declarations.into_iter().map(|(property, _)| property).collect();
					Ok(())
				}),
			);
		}
		_ => {
			compiler.effect(
				scope,
				"bind",
				enclose!((compiler, element) move || {
					let value = compiler.eval(&source, &bindings).unref();
					match (name.as_str(), &value) {
						("value", _) if is_form_control(&element) => element.set_value(&value.to_text()),
						("checked", _) if is_form_control(&element) => element.set_checked(value.truthy()),
						(_, Value::Bool(false) | Value::Undefined | Value::Null) => {
							element.remove_attribute(&name);
						}
						(_, Value::Bool(true)) => element.set_attribute(&name, ""),
						_ => element.set_attribute(&name, &value.to_string()),
					}
					Ok(())
				}),
			);
		}
	}
}

/// `z-text`, `z-html` and `z-show`.
pub(super) fn compile_content(compiler: &Compiler, element: &Node, scope: &Scope, directive: &str, source: &str) {
	let bindings = scope.bindings().clone();
	let source = source.to_owned();

	match directive {
		"text" => {
			compiler.effect(
				scope,
				"text",
				enclose!((compiler, element) move || {
					let value = compiler.eval(&source, &bindings);
					element.set_text_content(&compiler.display(&value, &source));
					Ok(())
				}),
			);
		}
		"html" => {
			compiler.effect(
				scope,
				"html",
				enclose!((compiler, element) move || {
					element.set_inner_html(&compiler.eval(&source, &bindings).to_text());
					Ok(())
				}),
			);
		}
		_ => {
			let display = element.style_property("display").filter(|d| d != "none");
			compiler.effect(
				scope,
				"show",
				enclose!((compiler, element) move || {
					if compiler.eval(&source, &bindings).truthy() {
						match &display {
							Some(display) => element.set_style_property("display", display),
							None => element.remove_style_property("display"),
						}
					} else {
						element.set_style_property("display", "none");
					}
					Ok(())
				}),
			);
		}
	}
}

fn is_form_control(element: &Node) -> bool {
	matches!(element.tag_name().as_deref(), Some("input" | "select" | "textarea" | "option"))
}

/// Class names from a string, an array of class values or an object of
/// `name: condition` pairs.
fn class_names(value: &Value) -> Vec<String> {
	if let Some(list) = value.as_array() {
		let Some(_visit) = Visit::enter(list.raw().addr()) else {
			return Vec::new();
		};
		return list.to_vec().iter().flat_map(|item| class_names(&item.clone().unref())).collect();
	}
	if let Some(object) = value.as_object() {
		return object
			.entries()
			.into_iter()
			.filter(|(_, condition)| condition.truthy())
			.map(|(name, _)| name.to_string())
			.collect();
	}
	match value {
		Value::String(s) => s.split_whitespace().map(str::to_owned).collect(),
		_ => Vec::new(),
	}
}

/// `(property, value)` pairs from an object or a `a: b; c: d` string.
/// Object keys may be camelCase.
fn style_declarations(value: &Value) -> Vec<(String, String)> {
	if let Some(object) = value.as_object() {
		return object
			.entries()
			.into_iter()
			.filter(|(_, v)| !v.is_nullish() && !matches!(v, Value::Bool(false)))
			.map(|(property, v)| (kebab_case(&property), v.to_text()))
			.collect();
	}
	match value {
		Value::String(s) => s
			.split(';')
			.filter_map(|declaration| declaration.split_once(':'))
			.map(|(property, v)| (property.trim().to_owned(), v.trim().to_owned()))
			.filter(|(property, _)| !property.is_empty())
			.collect(),
		_ => Vec::new(),
	}
}

fn kebab_case(name: &str) -> String {
	let mut out = String::with_capacity(name.len() + 2);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			out.push('-');
			out.push(c.to_ascii_lowercase());
		} else {
			out.push(c);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reactive::Object;

	#[test]
	fn collects_class_names_from_each_form() {
		let object = Value::Object(Object::new().with("active", true).with("hidden", false).with("big", 1));
		assert_eq!(class_names(&object), ["active", "big"]);
		assert_eq!(class_names(&Value::str("a  b")), ["a", "b"]);
		let list = Value::from(vec![Value::str("x"), object]);
		assert_eq!(class_names(&list), ["x", "active", "big"]);
	}

	#[test]
	fn class_lists_containing_themselves_stop_at_the_repeat() {
		let list = crate::reactive::Array::from_iter([Value::str("a")]);
		list.reactive().push(Value::Array(list.clone()));
		assert_eq!(class_names(&Value::Array(list)), ["a"]);
	}

	#[test]
	fn converts_style_forms() {
		let object = Value::Object(Object::new().with("fontSize", "12px").with("color", ()));
		assert_eq!(style_declarations(&object), [("font-size".to_owned(), "12px".to_owned())]);
		assert_eq!(
			style_declarations(&Value::str("color: red; margin:0;")),
			[("color".to_owned(), "red".to_owned()), ("margin".to_owned(), "0".to_owned())]
		);
	}
}
