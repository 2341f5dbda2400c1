use std::cell::RefCell;
use std::rc::Rc;

use enclose::enclose;
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use smallvec::SmallVec;

use super::Compiler;
use crate::dom::{HostNode, Node};
use crate::effect;
use crate::error::{Error, Phase, Result};
use crate::r#ref::Ref;
use crate::reactive::{Object, ReactiveObject};
use crate::scope::Scope;
use crate::value::Value;

/// Parsed `item in items` / `(item, index) of items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForExpr {
	/// Item alias, then the optional index alias.
	pub aliases: SmallVec<[Rc<str>; 2]>,
	pub source: String,
}

impl ForExpr {
	pub fn item(&self) -> &str {
		&self.aliases[0]
	}

	pub fn index(&self) -> Option<&str> {
		self.aliases.get(1).map(|a| &**a)
	}
}

pub fn parse_for(src: &str) -> Result<ForExpr> {
	let invalid = || Error::syntax(format!("invalid loop expression {:?}", src), 0);

	let (lhs, source) = [" in ", " of "]
		.iter()
		.filter_map(|sep| src.find(sep).map(|i| (i, sep.len())))
		.min()
		.map(|(i, len)| (src[..i].trim(), src[i + len..].trim()))
		.ok_or_else(invalid)?;

	let lhs = lhs
		.strip_prefix('(')
		.and_then(|l| l.strip_suffix(')'))
		.unwrap_or(lhs);
	let aliases: SmallVec<[Rc<str>; 2]> = lhs.split(',').map(|a| Rc::from(a.trim())).collect();

	let valid_ident = |a: &Rc<str>| {
		let mut chars = a.chars();
		chars
			.next()
			.is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic())
			&& chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
	};
	if aliases.is_empty() || aliases.len() > 2 || !aliases.iter().all(valid_ident) || source.is_empty() {
		return Err(invalid());
	}

	Ok(ForExpr {
		aliases,
		source: source.to_owned(),
	})
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ListKey {
	Position(usize),
	Number(u64),
	String(Rc<str>),
	Identity(Identity),
	Other(String),
}

/// Keys objects, arrays and functions by allocation. The value is held so
/// the address cannot be reused while the key is alive.
#[derive(Debug, Clone)]
struct Identity {
	addr: usize,
	value: Value,
}

impl PartialEq for Identity {
	fn eq(&self, other: &Self) -> bool {
		self.addr == other.addr
	}
}

impl Eq for Identity {}

impl std::hash::Hash for Identity {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.addr.hash(state);
	}
}

impl ListKey {
	fn from_value(value: Value) -> ListKey {
		let value = value.unref().into_raw();
		if let Some(addr) = value.identity() {
			return ListKey::Identity(Identity { addr, value });
		}
		match value {
			// -0 and 0 are the same key
			Value::Number(n) => ListKey::Number(if n == 0.0 { 0 } else { n.to_bits() }),
			Value::String(s) => ListKey::String(s),
			other => ListKey::Other(format!("{}:{}", other.type_of(), other)),
		}
	}
}

struct Entry {
	node: Node,
	scope: Scope,
	vars: ReactiveObject,
}

impl Entry {
	fn destroy(self, parent: &Scope) {
		parent.remove_child(&self.scope);
		self.node.remove();
	}
}

/// Objects and arrays are bound as-is; primitives live in a per-item
/// `Ref` so `item.value` can be written without touching the list.
fn bind_item(vars: &ReactiveObject, name: &str, item: Value) {
	if matches!(item, Value::Object(_) | Value::Array(_) | Value::Reactive(_) | Value::Ref(_) | Value::Computed(_)) {
		vars.set(name, item);
		return;
	}
	match vars.raw().get(name) {
		Some(Value::Ref(slot)) => slot.set(item),
		_ => vars.set(name, Ref::new(item)),
	}
}

fn bind_index(vars: &ReactiveObject, name: &str, index: usize) {
	match vars.raw().get(name) {
		Some(Value::Ref(slot)) => slot.set(index),
		_ => vars.set(name, Ref::new(index)),
	}
}

pub(super) fn compile(compiler: &Compiler, template: &Node, scope: &Scope) {
	let config = compiler.config();
	let for_attr = config.directive("for");
	let Some(parent) = template.parent() else {
		return;
	};
	let Some(raw) = template.remove_attribute(&for_attr) else {
		return;
	};

	let key_expr = [":key".to_owned(), config.directive("bind:key"), config.directive("key")]
		.iter()
		.find_map(|attr| template.remove_attribute(attr));

	let Some(anchor) = template.create_comment(&for_attr) else {
		tracing::warn!(node = ?template, "host failed to create list anchor");
		return;
	};
	parent.insert_before(&anchor, Some(template));
	template.remove();

	let for_expr = match parse_for(&raw) {
		Ok(for_expr) => for_expr,
		Err(error) => {
			compiler.hooks().report(&error, Phase::Compile, &raw);
			return;
		}
	};

	let entries: Rc<RefCell<IndexMap<ListKey, Entry, FxBuildHasher>>> = Rc::default();
	let bindings = scope.bindings().clone();
	let template = template.clone();
	let warn_duplicates = config.warn_duplicate_keys;

	compiler.effect(
		scope,
		"list",
		enclose!((compiler, scope, anchor, entries) move || {
			let list = compiler.eval(&for_expr.source, &bindings).unref();
			let items = list.as_array().map(|a| a.to_vec()).unwrap_or_default();
			let Some(parent) = anchor.parent() else {
				return Ok(());
			};

			let mut previous = std::mem::take(&mut *entries.borrow_mut());
			let mut current: IndexMap<ListKey, Entry, FxBuildHasher> = IndexMap::default();
			let (mut created, mut reused) = (0usize, 0usize);

			for (index, item) in items.into_iter().enumerate() {
				let key = match &key_expr {
					None => ListKey::Position(index),
					Some(source) => {
						let transient = bindings.child(
							Object::new()
								.with(for_expr.item(), item.clone())
								.with(for_expr.index().unwrap_or("$index"), index),
						);
						ListKey::from_value(compiler.eval(source, &transient))
					}
				};

				if let Some(duplicate) = current.shift_remove(&key) {
					if warn_duplicates {
						tracing::warn!(key = ?key, source = %for_expr.source, "duplicate key in list");
					}
					duplicate.destroy(&scope);
				}

				let entry = match previous.shift_remove(&key) {
					Some(entry) => {
						effect::untracked(|| {
							bind_item(&entry.vars, for_expr.item(), item);
							if let Some(name) = for_expr.index() {
								bind_index(&entry.vars, name, index);
							}
						});
						reused += 1;
						entry
					}
					None => {
						let Some(node) = template.clone_node(true) else {
							tracing::warn!(template = ?template, "host failed to copy list item");
							continue;
						};
						let vars = Object::new().reactive();
						bind_item(&vars, for_expr.item(), item);
						if let Some(name) = for_expr.index() {
							bind_index(&vars, name, index);
						}
						let item_scope = scope.child(bindings.child(vars.raw()));
						effect::untracked(|| compiler.compile(&node, &item_scope));
						created += 1;
						Entry {
							node,
							scope: item_scope,
							vars,
						}
					}
				};
				current.insert(key, entry);
			}

			let removed = previous.len();
			for (_, entry) in previous {
				entry.destroy(&scope);
			}

			// Move only nodes whose predecessor is wrong.
			let mut predecessor = anchor.clone();
			for entry in current.values() {
				if entry.node.previous_sibling().as_ref() != Some(&predecessor) {
					parent.insert_before(&entry.node, predecessor.next_sibling().as_ref());
				}
				predecessor = entry.node.clone();
			}

			tracing::debug!(created, reused, removed, "reconciled list");
			*entries.borrow_mut() = current;
			Ok(())
		}),
	);

	scope.add_cleanup(move || {
		for (_, entry) in entries.borrow_mut().drain(..) {
			entry.node.remove();
		}
		anchor.remove();
	});
}
