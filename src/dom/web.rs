//! Browser host: [`HostNode`] over the page's DOM through `web-sys`.
//!
//! Listener closures stay alive in a thread-local table until their
//! [`ListenerId`] is removed.

use std::cell::RefCell;
use std::fmt;

use fxhash::FxHashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{
	CssStyleDeclaration, Document, DocumentFragment, Element, HtmlElement, HtmlInputElement,
	HtmlOptionElement, HtmlSelectElement, HtmlTextAreaElement, NodeList,
};

use super::{HostEvent, HostNode, ListenerId, NodeKind};

struct Listener {
	target: web_sys::Node,
	event: String,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

thread_local! {
	static LISTENERS: RefCell<FxHashMap<ListenerId, Listener>> = RefCell::new(FxHashMap::default());
}

#[derive(Clone)]
pub struct Node {
	node: web_sys::Node,
}

impl Node {
	pub fn raw(&self) -> &web_sys::Node {
		&self.node
	}

	fn element(&self) -> Option<&Element> {
		self.node.dyn_ref::<Element>()
	}

	fn document(&self) -> Option<Document> {
		self.node
			.owner_document()
			.or_else(|| self.node.dyn_ref::<Document>().cloned())
	}

	fn style(&self) -> Option<CssStyleDeclaration> {
		self.node.dyn_ref::<HtmlElement>().map(HtmlElement::style)
	}
}

impl From<web_sys::Node> for Node {
	fn from(node: web_sys::Node) -> Self {
		Node { node }
	}
}

impl From<Element> for Node {
	fn from(element: Element) -> Self {
		Node { node: element.into() }
	}
}

fn collect(list: NodeList) -> Vec<Node> {
	(0..list.length()).filter_map(|i| list.item(i)).map(Node::from).collect()
}

impl HostNode for Node {
	type Event = Event;

	fn kind(&self) -> NodeKind {
		match self.node.node_type() {
			web_sys::Node::ELEMENT_NODE => NodeKind::Element,
			web_sys::Node::TEXT_NODE => NodeKind::Text,
			web_sys::Node::DOCUMENT_NODE | web_sys::Node::DOCUMENT_FRAGMENT_NODE => NodeKind::Fragment,
			_ => NodeKind::Comment,
		}
	}

	fn tag_name(&self) -> Option<String> {
		self.element().map(Element::local_name)
	}

	fn ptr_eq(&self, other: &Node) -> bool {
		self.node.is_same_node(Some(&other.node))
	}

	fn create_comment(&self, data: &str) -> Option<Node> {
		let comment = self.document()?.create_comment(data);
		Some(Node::from(web_sys::Node::from(comment)))
	}

	fn create_fragment(&self) -> Option<Node> {
		let fragment = self.document()?.create_document_fragment();
		Some(Node::from(web_sys::Node::from(fragment)))
	}

	fn default_document() -> Option<Node> {
		let document = web_sys::window()?.document()?;
		Some(Node::from(web_sys::Node::from(document)))
	}

	// Tree

	fn parent(&self) -> Option<Node> {
		self.node.parent_node().map(Node::from)
	}

	fn children(&self) -> Vec<Node> {
		collect(self.node.child_nodes())
	}

	fn child_count(&self) -> usize {
		self.node.child_nodes().length() as usize
	}

	fn first_child(&self) -> Option<Node> {
		self.node.first_child().map(Node::from)
	}

	fn next_sibling(&self) -> Option<Node> {
		self.node.next_sibling().map(Node::from)
	}

	fn previous_sibling(&self) -> Option<Node> {
		self.node.previous_sibling().map(Node::from)
	}

	fn remove(&self) {
		if let Some(parent) = self.node.parent_node() {
			if let Err(error) = parent.remove_child(&self.node) {
				tracing::warn!(?error, node = ?self, "failed to detach node");
			}
		}
	}

	fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		if reference.is_some_and(|r| r.ptr_eq(child)) {
			return;
		}
		if let Err(error) = self.node.insert_before(&child.node, reference.map(|r| &r.node)) {
			tracing::warn!(?error, parent = ?self, child = ?child, "failed to insert node");
		}
	}

	fn clone_node(&self, deep: bool) -> Option<Node> {
		self.node.clone_node_with_deep(deep).ok().map(Node::from)
	}

	fn query_selector(&self, selector: &str) -> Option<Node> {
		let found = if let Some(element) = self.element() {
			element.query_selector(selector)
		} else if let Some(fragment) = self.node.dyn_ref::<DocumentFragment>() {
			fragment.query_selector(selector)
		} else if let Some(document) = self.node.dyn_ref::<Document>() {
			document.query_selector(selector)
		} else {
			return None;
		};
		found.ok().flatten().map(Node::from)
	}

	fn query_selector_all(&self, selector: &str) -> Vec<Node> {
		let found = if let Some(element) = self.element() {
			element.query_selector_all(selector)
		} else if let Some(fragment) = self.node.dyn_ref::<DocumentFragment>() {
			fragment.query_selector_all(selector)
		} else if let Some(document) = self.node.dyn_ref::<Document>() {
			document.query_selector_all(selector)
		} else {
			return Vec::new();
		};
		found.map(collect).unwrap_or_default()
	}

	// Content

	fn text_content(&self) -> String {
		self.node.text_content().unwrap_or_default()
	}

	fn set_text_content(&self, text: &str) {
		self.node.set_text_content(Some(text));
	}

	fn inner_html(&self) -> String {
		match self.element() {
			Some(element) => element.inner_html(),
			None => self.children().iter().map(Node::outer_html).collect(),
		}
	}

	fn set_inner_html(&self, markup: &str) {
		match self.element() {
			Some(element) => element.set_inner_html(markup),
			None => tracing::warn!(node = ?self, "innerHTML needs an element"),
		}
	}

	fn outer_html(&self) -> String {
		match self.kind() {
			NodeKind::Element => self.element().map(Element::outer_html).unwrap_or_default(),
			NodeKind::Fragment => self.inner_html(),
			NodeKind::Text => self.text_content(),
			NodeKind::Comment => format!("<!--{}-->", self.text_content()),
		}
	}

	// Attributes

	fn attribute(&self, name: &str) -> Option<String> {
		self.element()?.get_attribute(name)
	}

	fn set_attribute(&self, name: &str, value: &str) {
		let Some(element) = self.element() else {
			return;
		};
		if let Err(error) = element.set_attribute(name, value) {
			tracing::warn!(?error, name, "failed to set attribute");
		}
	}

	fn remove_attribute(&self, name: &str) -> Option<String> {
		let element = self.element()?;
		let value = element.get_attribute(name)?;
		element.remove_attribute(name).ok()?;
		Some(value)
	}

	fn attributes(&self) -> Vec<(String, String)> {
		let Some(element) = self.element() else {
			return Vec::new();
		};
		let attrs = element.attributes();
		(0..attrs.length())
			.filter_map(|i| attrs.item(i))
			.map(|attr| (attr.name(), attr.value()))
			.collect()
	}

	fn style_property(&self, name: &str) -> Option<String> {
		let value = self.style()?.get_property_value(name).ok()?;
		(!value.is_empty()).then_some(value)
	}

	fn set_style_property(&self, name: &str, value: &str) {
		if value.is_empty() {
			self.remove_style_property(name);
			return;
		}
		if let Some(style) = self.style() {
			if let Err(error) = style.set_property(name, value) {
				tracing::warn!(?error, name, "failed to set style property");
			}
		}
	}

	fn remove_style_property(&self, name: &str) {
		if let Some(style) = self.style() {
			let _ = style.remove_property(name);
		}
	}

	// Form properties

	fn value(&self) -> String {
		if let Some(input) = self.node.dyn_ref::<HtmlInputElement>() {
			input.value()
		} else if let Some(select) = self.node.dyn_ref::<HtmlSelectElement>() {
			select.value()
		} else if let Some(area) = self.node.dyn_ref::<HtmlTextAreaElement>() {
			area.value()
		} else if let Some(option) = self.node.dyn_ref::<HtmlOptionElement>() {
			option.value()
		} else if self.element().is_some() {
			self.attribute("value").unwrap_or_default()
		} else {
			self.text_content()
		}
	}

	fn set_value(&self, value: &str) {
		if let Some(input) = self.node.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(select) = self.node.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		} else if let Some(area) = self.node.dyn_ref::<HtmlTextAreaElement>() {
			area.set_value(value);
		} else if let Some(option) = self.node.dyn_ref::<HtmlOptionElement>() {
			option.set_value(value);
		} else {
			self.set_attribute("value", value);
		}
	}

	fn checked(&self) -> bool {
		if let Some(input) = self.node.dyn_ref::<HtmlInputElement>() {
			input.checked()
		} else if let Some(option) = self.node.dyn_ref::<HtmlOptionElement>() {
			option.selected()
		} else {
			false
		}
	}

	fn set_checked(&self, checked: bool) {
		if let Some(input) = self.node.dyn_ref::<HtmlInputElement>() {
			input.set_checked(checked);
		} else if let Some(option) = self.node.dyn_ref::<HtmlOptionElement>() {
			option.set_selected(checked);
		}
	}

	// Events

	fn add_event_listener(&self, event: &str, handler: impl Fn(&Event) + 'static) -> ListenerId {
		let id = ListenerId::next();
		let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
			handler(&Event { event });
		});
		if let Err(error) = self
			.node
			.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
		{
			tracing::warn!(?error, event, "failed to add listener");
			return id;
		}
		LISTENERS.with(|listeners| {
			listeners.borrow_mut().insert(
				id,
				Listener {
					target: self.node.clone(),
					event: event.to_owned(),
					closure,
				},
			);
		});
		id
	}

	fn remove_event_listener(&self, id: ListenerId) -> bool {
		let Some(listener) = LISTENERS.with(|listeners| listeners.borrow_mut().remove(&id)) else {
			return false;
		};
		listener
			.target
			.remove_event_listener_with_callback(&listener.event, listener.closure.as_ref().unchecked_ref())
			.is_ok()
	}

	fn click(&self) {
		if let Some(element) = self.node.dyn_ref::<HtmlElement>() {
			element.click();
		}
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Node {}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind() {
			NodeKind::Element => write!(f, "<{}>", self.tag_name().unwrap_or_default()),
			NodeKind::Text => write!(f, "#text {:?}", self.text_content()),
			NodeKind::Comment => write!(f, "<!--{}-->", self.text_content()),
			NodeKind::Fragment => f.write_str("#fragment"),
		}
	}
}

#[derive(Clone)]
pub struct Event {
	event: web_sys::Event,
}

impl Event {
	pub fn raw(&self) -> &web_sys::Event {
		&self.event
	}
}

impl HostEvent for Event {
	type Node = Node;

	fn kind(&self) -> String {
		self.event.type_()
	}

	fn target(&self) -> Option<Node> {
		let target = self.event.target()?;
		target.dyn_into::<web_sys::Node>().ok().map(Node::from)
	}

	fn prevent_default(&self) {
		self.event.prevent_default();
	}

	fn default_prevented(&self) -> bool {
		self.event.default_prevented()
	}

	fn ptr_eq(&self, other: &Event) -> bool {
		self.event == other.event
	}
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event").field("kind", &self.kind()).finish()
	}
}
