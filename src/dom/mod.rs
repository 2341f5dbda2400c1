//! Host document the template compiler renders into.
//!
//! The compiler only talks to [`HostNode`] and [`HostEvent`]. Browser
//! builds bind them to the page through `web-sys`; native builds use the
//! in-memory tree in [`memory`], which also backs the test suite.

use std::cell::Cell;
use std::fmt;

#[cfg(not(target_arch = "wasm32"))]
pub mod memory;
#[cfg(not(target_arch = "wasm32"))]
pub use memory::{escape_attribute, escape_text, parse_fragment, Event, Node};

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::{Event, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

thread_local! {
	static NEXT_LISTENER: Cell<u64> = const { Cell::new(1) };
}

impl ListenerId {
	pub(crate) fn next() -> ListenerId {
		NEXT_LISTENER.with(|n| {
			let id = n.get();
			n.set(id + 1);
			ListenerId(id)
		})
	}
}

/// A node of the host document.
///
/// Handles are cheap clones of a shared node and compare by identity.
/// Tag names are lowercase.
pub trait HostNode: Clone + Eq + fmt::Debug + Sized + 'static {
	type Event: HostEvent<Node = Self>;

	fn kind(&self) -> NodeKind;
	fn tag_name(&self) -> Option<String>;
	fn ptr_eq(&self, other: &Self) -> bool;

	fn is_element(&self) -> bool {
		self.kind() == NodeKind::Element
	}

	fn is_text(&self) -> bool {
		self.kind() == NodeKind::Text
	}

	/// Comment owned by the same document as `self`.
	fn create_comment(&self, data: &str) -> Option<Self>;
	/// Empty fragment owned by the same document as `self`.
	fn create_fragment(&self) -> Option<Self>;
	/// Where an app resolves mount selectors when none is given.
	fn default_document() -> Option<Self>;

	// Tree

	fn parent(&self) -> Option<Self>;
	fn children(&self) -> Vec<Self>;
	fn first_child(&self) -> Option<Self>;
	fn next_sibling(&self) -> Option<Self>;
	fn previous_sibling(&self) -> Option<Self>;

	fn child_count(&self) -> usize {
		self.children().len()
	}

	/// Detach from the current parent, if any.
	fn remove(&self);
	/// Insert `child` before `reference`, or at the end.
	fn insert_before(&self, child: &Self, reference: Option<&Self>);
	/// Copy of this node, and of its subtree when `deep`. Listeners are
	/// not copied.
	fn clone_node(&self, deep: bool) -> Option<Self>;

	fn append_child(&self, child: &Self) {
		self.insert_before(child, None);
	}

	fn remove_child(&self, child: &Self) -> bool {
		let is_child = child.parent().is_some_and(|p| p.ptr_eq(self));
		if is_child {
			child.remove();
		}
		is_child
	}

	fn query_selector(&self, selector: &str) -> Option<Self>;
	fn query_selector_all(&self, selector: &str) -> Vec<Self>;

	// Content

	fn text_content(&self) -> String;
	fn set_text_content(&self, text: &str);
	fn inner_html(&self) -> String;
	fn set_inner_html(&self, markup: &str);
	fn outer_html(&self) -> String;

	// Attributes

	fn attribute(&self, name: &str) -> Option<String>;
	fn set_attribute(&self, name: &str, value: &str);
	fn remove_attribute(&self, name: &str) -> Option<String>;
	/// Attributes in document order.
	fn attributes(&self) -> Vec<(String, String)>;

	fn has_attribute(&self, name: &str) -> bool {
		self.attribute(name).is_some()
	}

	// Inline style

	fn style_property(&self, name: &str) -> Option<String>;
	/// An empty value removes the property.
	fn set_style_property(&self, name: &str, value: &str);
	fn remove_style_property(&self, name: &str);

	// Form properties

	fn value(&self) -> String;
	fn set_value(&self, value: &str);
	/// `checked` for inputs, `selected` for options.
	fn checked(&self) -> bool;
	fn set_checked(&self, checked: bool);

	fn input_type(&self) -> String {
		self.attribute("type")
			.map(|t| t.to_ascii_lowercase())
			.unwrap_or_else(|| "text".into())
	}

	// Events

	fn add_event_listener(&self, event: &str, handler: impl Fn(&Self::Event) + 'static) -> ListenerId;
	fn remove_event_listener(&self, id: ListenerId) -> bool;
	fn click(&self);
}

/// An event delivered to a [`HostNode`] listener.
pub trait HostEvent: Clone + fmt::Debug + 'static {
	type Node;

	fn kind(&self) -> String;
	fn target(&self) -> Option<Self::Node>;
	fn prevent_default(&self);
	fn default_prevented(&self) -> bool;
	fn ptr_eq(&self, other: &Self) -> bool;
}
