//! Template compiler: walks a DOM subtree and wires directives and
//! interpolations to effects registered on a [`Scope`].

mod bind;
mod conditional;
mod events;
mod interpolation;
mod list;
mod model;

use std::rc::Rc;

use crate::config::Config;
use crate::dom::{HostNode, Node, NodeKind};
use crate::effect::{self, Effect, EffectOptions};
use crate::error::{Error, Phase, Result};
use crate::expr::Evaluator;
use crate::hooks::Hooks;
use crate::scope::{Bindings, Scope};
use crate::value::Value;

pub use self::interpolation::{parse_interpolation, Segment};
pub use self::list::{parse_for, ForExpr};

#[derive(Clone)]
pub struct Compiler {
	inner: Rc<CompilerInner>,
}

struct CompilerInner {
	config: Config,
	hooks: Hooks,
	evaluator: Evaluator,
}

impl Compiler {
	pub fn new(config: Config, hooks: Hooks) -> Self {
		let evaluator = Evaluator::new(config.expression_cache_capacity);
		Compiler {
			inner: Rc::new(CompilerInner {
				config,
				hooks,
				evaluator,
			}),
		}
	}

	pub fn config(&self) -> &Config {
		&self.inner.config
	}

	pub fn hooks(&self) -> &Hooks {
		&self.inner.hooks
	}

	pub fn evaluator(&self) -> &Evaluator {
		&self.inner.evaluator
	}

	/// Compile `root` and everything below it against `scope`.
	pub fn compile(&self, root: &Node, scope: &Scope) {
		self.compile_node(root, scope);
		self.hooks().after_compile(root, scope);
	}

	pub(crate) fn compile_children(&self, parent: &Node, scope: &Scope) {
		let mut child = parent.first_child();
		while let Some(node) = child {
			child = self.compile_node(&node, scope);
		}
	}

	/// Compile one node and return the sibling to continue with.
	/// Conditional chains and lists move nodes around, so the next
	/// sibling is decided here.
	fn compile_node(&self, node: &Node, scope: &Scope) -> Option<Node> {
		let next = node.next_sibling();
		if !self.hooks().before_compile(node, scope, self) {
			return next;
		}

		match node.kind() {
			NodeKind::Text => {
				interpolation::compile(self, node, scope);
				next
			}
			NodeKind::Fragment => {
				self.compile_children(node, scope);
				next
			}
			NodeKind::Comment => next,
			NodeKind::Element => {
				let config = self.config();
				if node.has_attribute(&config.directive("if")) && node.parent().is_some() {
					return conditional::compile(self, node, scope);
				}
				self.strip_orphan_else(node);
				if node.has_attribute(&config.directive("for")) && node.parent().is_some() {
					list::compile(self, node, scope);
					return next;
				}
				self.compile_directives(node, scope);
				self.compile_children(node, scope);
				next
			}
		}
	}

	fn strip_orphan_else(&self, node: &Node) {
		for name in ["else-if", "else"] {
			let attr = self.config().directive(name);
			if node.remove_attribute(&attr).is_some() {
				tracing::warn!(directive = %attr, node = ?node, "ignoring directive without a preceding if");
			}
		}
	}

	fn compile_directives(&self, element: &Node, scope: &Scope) {
		let config = self.config();
		let prefix = &*config.prefix;

		for (name, value) in element.attributes() {
			if let Some(event) = name
				.strip_prefix('@')
				.or_else(|| name.strip_prefix(&config.directive("on:")))
			{
				element.remove_attribute(&name);
				events::compile(self, element, scope, &name, event, &value);
			} else if let Some(bound) = name
				.strip_prefix(':')
				.or_else(|| name.strip_prefix(&config.directive("bind:")))
			{
				element.remove_attribute(&name);
				bind::compile_attribute(self, element, scope, bound, &value);
			} else if let Some(directive) = name.strip_prefix(prefix) {
				let (directive, modifiers) = split_modifiers(directive);
				match directive {
					"model" => {
						element.remove_attribute(&name);
						model::compile(self, element, scope, &value, &modifiers);
					}
					"text" | "html" | "show" => {
						element.remove_attribute(&name);
						bind::compile_content(self, element, scope, directive, &value);
					}
					"key" => {
						element.remove_attribute(&name);
					}
					_ => {}
				}
			}
		}
	}

	/// Evaluate `source`, reporting failures and yielding `undefined`.
	pub fn eval(&self, source: &str, bindings: &Bindings) -> Value {
		match self.evaluator().evaluate(source, bindings) {
			Ok(value) => value,
			Err(error) => {
				self.hooks().report(&error, Phase::Expression, source);
				Value::Undefined
			}
		}
	}

	/// Interpolation text for `value`; values that cannot be rendered are
	/// reported against `source` and render empty.
	pub(crate) fn display(&self, value: &Value, source: &str) -> String {
		value.to_display_string().unwrap_or_else(|error| {
			self.hooks().report(&error, Phase::Expression, source);
			String::new()
		})
	}

	/// Template effect registered on `scope`: runs the `BeforeEffect`
	/// hook first and reports failures with [`Phase::Effect`].
	pub(crate) fn effect(
		&self,
		scope: &Scope,
		name: &'static str,
		func: impl Fn() -> Result<()> + 'static,
	) {
		let hooks = self.hooks().clone();
		let on_error = self.hooks().clone();
		let effect = Effect::with_options(
			move || {
				if let Some(id) = effect::current() {
					hooks.before_effect(id);
				}
				func()
			},
			EffectOptions {
				name: Some(name),
				on_error: Some(Rc::new(move |error: &Error| {
					on_error.report(error, Phase::Effect, name)
				})),
				..EffectOptions::default()
			},
		);
		scope.add_effect(effect);
	}

	/// Clone `template`, compile the copy in a new child scope and return
	/// the scope with the top-level nodes it produced. `None` when the
	/// host cannot copy the template.
	pub(crate) fn instantiate(&self, template: &Node, scope: &Scope, bindings: Bindings) -> Option<(Scope, Node)> {
		let (Some(fragment), Some(copy)) = (template.create_fragment(), template.clone_node(true)) else {
			tracing::warn!(template = ?template, "host failed to copy template");
			return None;
		};
		fragment.append_child(&copy);
		let child = scope.child(bindings);
		effect::untracked(|| self.compile(&fragment, &child));
		Some((child, fragment))
	}
}

/// `model.number.trim` -> (`model`, [`number`, `trim`]).
pub(crate) fn split_modifiers(name: &str) -> (&str, Vec<&str>) {
	let mut parts = name.split('.');
	let base = parts.next().unwrap_or_default();
	(base, parts.filter(|m| !m.is_empty()).collect())
}

impl std::fmt::Debug for Compiler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Compiler")
			.field("prefix", &self.config().prefix)
			.field("cached", &self.evaluator().cache().len())
			.finish()
	}
}
