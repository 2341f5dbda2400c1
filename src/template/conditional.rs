use std::cell::RefCell;
use std::rc::Rc;

use enclose::enclose;

use super::Compiler;
use crate::dom::{HostNode, Node};
use crate::scope::Scope;

struct Branch {
	/// `None` for the trailing `else`.
	condition: Option<String>,
	template: Node,
}

struct Rendered {
	index: usize,
	scope: Scope,
	nodes: Vec<Node>,
}

impl Rendered {
	fn destroy(self, parent: &Scope) {
		parent.remove_child(&self.scope);
		for node in self.nodes {
			node.remove();
		}
	}
}

/// Collect the `if` / `else-if` / `else` run starting at `first`, replace
/// it with an anchor comment and render the first truthy branch after
/// the anchor. Returns the sibling following the chain.
pub(super) fn compile(compiler: &Compiler, first: &Node, scope: &Scope) -> Option<Node> {
	let config = compiler.config();
	let (if_attr, else_if_attr, else_attr) = (
		config.directive("if"),
		config.directive("else-if"),
		config.directive("else"),
	);
	let parent = first.parent()?;
	let Some(anchor) = first.create_comment(&if_attr) else {
		tracing::warn!(node = ?first, "host failed to create conditional anchor");
		return first.next_sibling();
	};

	let mut branches = vec![Branch {
		condition: first.remove_attribute(&if_attr),
		template: first.clone(),
	}];
	let mut consumed = vec![first.clone()];
	let mut whitespace = Vec::new();
	let mut cursor = first.next_sibling();

	while let Some(node) = cursor {
		cursor = node.next_sibling();
		if node.is_text() && node.text_content().trim().is_empty() {
			whitespace.push(node);
			continue;
		}
		if let Some(condition) = node.remove_attribute(&else_if_attr) {
			branches.push(Branch {
				condition: Some(condition),
				template: node.clone(),
			});
		} else if node.remove_attribute(&else_attr).is_some() {
			branches.push(Branch {
				condition: None,
				template: node.clone(),
			});
			consumed.append(&mut whitespace);
			consumed.push(node);
			break;
		} else {
			break;
		}
		consumed.append(&mut whitespace);
		consumed.push(node);
	}

	let next = consumed.last().and_then(Node::next_sibling);
	parent.insert_before(&anchor, Some(first));
	for node in &consumed {
		node.remove();
	}
	tracing::debug!(branches = branches.len(), "compiled conditional chain");

	let rendered: Rc<RefCell<Option<Rendered>>> = Rc::default();
	let bindings = scope.bindings().clone();

	compiler.effect(
		scope,
		"conditional",
		enclose!((compiler, scope, anchor, rendered) move || {
			let selected = branches.iter().position(|branch| match &branch.condition {
				Some(condition) => compiler.eval(condition, &bindings).truthy(),
				None => true,
			});

			let current = rendered.borrow().as_ref().map(|r| r.index);
			if current == selected {
				return Ok(());
			}

			let previous = rendered.borrow_mut().take();
			if let Some(previous) = previous {
				previous.destroy(&scope);
			}

			let instance = selected.and_then(|index| {
				let (child, fragment) = compiler.instantiate(&branches[index].template, &scope, bindings.clone())?;
				Some((index, child, fragment))
			});
			if let Some((index, child, fragment)) = instance {
				let nodes = fragment.children();
				if let Some(parent) = anchor.parent() {
					parent.insert_before(&fragment, anchor.next_sibling().as_ref());
				}
				*rendered.borrow_mut() = Some(Rendered {
					index,
					scope: child,
					nodes,
				});
			}

			tracing::debug!(from = ?current, to = ?selected, "switched branch");
			Ok(())
		}),
	);

	scope.add_cleanup(move || {
		if let Some(rendered) = rendered.borrow_mut().take() {
			for node in rendered.nodes {
				node.remove();
			}
		}
	});

	next
}
