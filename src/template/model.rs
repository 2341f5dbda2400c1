use std::rc::Rc;

use enclose::enclose;

use super::Compiler;
use crate::dom::{Event, HostNode, Node};
use crate::effect;
use crate::error::{Error, Phase, Result};
use crate::scope::{Bindings, Scope};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
	Checkbox,
	Radio,
	Select,
	Text,
}

impl Control {
	fn of(element: &Node) -> Control {
		match element.tag_name().as_deref() {
			Some("select") => Control::Select,
			Some("input") => match element.input_type().as_str() {
				"checkbox" => Control::Checkbox,
				"radio" => Control::Radio,
				_ => Control::Text,
			},
			_ => Control::Text,
		}
	}

	fn event(self) -> &'static str {
		match self {
			Control::Text => "input",
			_ => "change",
		}
	}
}

#[derive(Debug, Clone, Copy, Default)]
struct Modifiers {
	number: bool,
	trim: bool,
	lazy: bool,
}

/// Two-way binding between a form control and an assignable expression.
pub(super) fn compile(compiler: &Compiler, element: &Node, scope: &Scope, source: &str, modifiers: &[&str]) {
	let control = Control::of(element);
	let modifiers = Modifiers {
		number: modifiers.contains(&"number"),
		trim: modifiers.contains(&"trim"),
		lazy: modifiers.contains(&"lazy"),
	};
	let bindings = scope.bindings().clone();
	let source: Rc<str> = Rc::from(source);

	compiler.effect(
		scope,
		"model",
		enclose!((compiler, element, bindings, source) move || {
			let value = compiler.eval(&source, &bindings).unref();
			match control {
				Control::Checkbox => match value.as_array() {
					Some(list) => element.set_checked(list.includes(&Value::from(element.value()))),
					None => element.set_checked(value.truthy()),
				},
				Control::Radio => element.set_checked(!value.is_nullish() && value.to_string() == element.value()),
				Control::Select | Control::Text => {
					let text = value.to_text();
					if element.value() != text {
						element.set_value(&text);
					}
				}
			}
			Ok(())
		}),
	);

	let event = if modifiers.lazy { "change" } else { control.event() };
	let id = element.add_event_listener(
		event,
		enclose!((compiler, element) move |_: &Event| {
			let result = effect::untracked(|| write_back(&compiler, &element, &bindings, &source, control, modifiers));
			if let Err(error) = result {
				let error = Error::Handler {
					attribute: compiler.config().directive("model"),
					value: source.to_string(),
					source: Box::new(error),
				};
				compiler.hooks().report(&error, Phase::Event, "model");
			}
		}),
	);
	scope.add_listener(element, id);
}

fn write_back(
	compiler: &Compiler,
	element: &Node,
	bindings: &Bindings,
	source: &str,
	control: Control,
	modifiers: Modifiers,
) -> Result<()> {
	let value = match control {
		Control::Checkbox => {
			let current = compiler.evaluator().evaluate(source, bindings)?.unref();
			if let Some(list) = current.as_array() {
				let own = Value::from(element.value());
				match (element.checked(), list.index_of(&own)) {
					(true, None) => {
						list.push(own);
					}
					(false, Some(index)) => {
						list.splice(index, 1, std::iter::empty());
					}
					_ => {}
				}
				return Ok(());
			}
			Value::Bool(element.checked())
		}
		Control::Radio if !element.checked() => return Ok(()),
		_ => {
			let mut text = element.value();
			if modifiers.trim {
				text = text.trim().to_owned();
			}
			let number = text.trim().parse::<f64>().ok().filter(|n| modifiers.number && n.is_finite());
			number.map_or_else(|| Value::from(text), Value::Number)
		}
	};
	compiler.evaluator().assign(source, bindings, value)
}
