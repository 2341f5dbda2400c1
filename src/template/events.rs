use std::cell::Cell;
use std::rc::Rc;

use enclose::enclose;

use super::{split_modifiers, Compiler};
use crate::dom::{Event, HostEvent, HostNode, Node};
use crate::effect;
use crate::error::{Error, Phase, Result};
use crate::reactive::Object;
use crate::scope::{Bindings, Scope};
use crate::value::Value;

/// `@click.prevent="save"` / `z-on:input="query = $event.target.value"`.
pub(super) fn compile(compiler: &Compiler, element: &Node, scope: &Scope, attribute: &str, spec: &str, source: &str) {
	let (event, modifiers) = split_modifiers(spec);
	if event.is_empty() {
		tracing::warn!(attribute, "event binding without an event name");
		return;
	}
	let prevent = modifiers.contains(&"prevent");
	let once = modifiers.contains(&"once");
	let fired = Rc::new(Cell::new(false));

	let bindings = scope.bindings().clone();
	let attribute: Rc<str> = Rc::from(attribute);
	let source: Rc<str> = Rc::from(source);

	let id = element.add_event_listener(
		event,
		enclose!((compiler) move |event: &Event| {
			if once && fired.replace(true) {
				return;
			}
			if prevent {
				event.prevent_default();
			}
			let result = effect::untracked(|| dispatch(&compiler, &bindings, &source, event));
			if let Err(error) = result {
				let error = Error::Handler {
					attribute: attribute.to_string(),
					value: source.to_string(),
					source: Box::new(error),
				};
				compiler.hooks().report(&error, Phase::Event, &attribute);
			}
		}),
	);
	scope.add_listener(element, id);
}

/// A path that resolves to a function is called with the event; anything
/// else runs as an inline statement with the event bound to `$event`.
fn dispatch(compiler: &Compiler, bindings: &Bindings, source: &str, event: &Event) -> Result<()> {
	let bindings = bindings.child(Object::new().with("$event", Value::Event(event.clone())));
	let program = compiler.evaluator().compile(source, &bindings)?;
	let result = program.run(&bindings)?;
	if program.is_path() {
		if let Value::Function(handler) = result.unref() {
			handler.call(&[Value::Event(event.clone())])?;
		}
	}
	Ok(())
}
