//! In-memory host document for native builds and tests.
//!
//! Only the surface the template compiler consumes is modelled: tree
//! mutation, attributes, inline style, the `value`/`checked` form
//! properties and per-node event listeners. Events do not bubble.

mod html;
mod selector;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

pub use html::{escape_attribute, escape_text, parse_fragment};
pub use selector::Selector;

use super::{HostEvent, HostNode, ListenerId, NodeKind};

type Handler = Rc<dyn Fn(&Event)>;

#[derive(Clone)]
pub struct Node {
	body: Rc<NodeBody>,
}

struct NodeBody {
	data: NodeData,
	parent: RefCell<Weak<NodeBody>>,
	children: RefCell<Vec<Node>>,
}

enum NodeData {
	Element(ElementData),
	Text(RefCell<String>),
	Comment(RefCell<String>),
	Fragment,
}

struct ElementData {
	tag: String,
	attrs: RefCell<Vec<(String, String)>>,
	value: RefCell<Option<String>>,
	checked: Cell<Option<bool>>,
	listeners: RefCell<Vec<(ListenerId, Rc<str>, Handler)>>,
}

pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

impl Node {
	fn from_data(data: NodeData) -> Self {
		Node {
			body: Rc::new(NodeBody {
				data,
				parent: RefCell::new(Weak::new()),
				children: RefCell::new(Vec::new()),
			}),
		}
	}

	pub fn element(tag: &str) -> Self {
		Self::from_data(NodeData::Element(ElementData {
			tag: tag.to_ascii_lowercase(),
			attrs: RefCell::new(Vec::new()),
			value: RefCell::new(None),
			checked: Cell::new(None),
			listeners: RefCell::new(Vec::new()),
		}))
	}

	pub fn text(data: &str) -> Self {
		Self::from_data(NodeData::Text(RefCell::new(data.to_owned())))
	}

	pub fn comment(data: &str) -> Self {
		Self::from_data(NodeData::Comment(RefCell::new(data.to_owned())))
	}

	pub fn fragment() -> Self {
		Self::from_data(NodeData::Fragment)
	}

	/// Parse `html` into a fragment.
	pub fn parse(html: &str) -> Self {
		parse_fragment(html)
	}

	fn element_data(&self) -> Option<&ElementData> {
		match &self.body.data {
			NodeData::Element(e) => Some(e),
			_ => None,
		}
	}

	/// Lowercase tag name, borrowed.
	pub fn tag(&self) -> Option<&str> {
		self.element_data().map(|e| e.tag.as_str())
	}

	pub fn last_child(&self) -> Option<Node> {
		self.body.children.borrow().last().cloned()
	}

	fn position(&self) -> Option<(Node, usize)> {
		let parent = self.parent()?;
		let index = parent
			.body
			.children
			.borrow()
			.iter()
			.position(|c| c.ptr_eq(self))?;
		Some((parent, index))
	}

	pub fn clear_children(&self) {
		for child in self.children() {
			child.remove();
		}
	}

	/// Depth-first pre-order walk of the subtree, excluding `self`.
	pub fn descendants(&self) -> Vec<Node> {
		let mut out = Vec::new();
		fn walk(node: &Node, out: &mut Vec<Node>) {
			for child in node.children() {
				out.push(child.clone());
				walk(&child, out);
			}
		}
		walk(self, &mut out);
		out
	}

	/// Attributes are copied; listeners and form properties are not.
	fn copy(&self, deep: bool) -> Node {
		let copy = match &self.body.data {
			NodeData::Element(e) => {
				let copy = Node::element(&e.tag);
				if let Some(data) = copy.element_data() {
					*data.attrs.borrow_mut() = e.attrs.borrow().clone();
				}
				copy
			}
			NodeData::Text(t) => Node::text(&t.borrow()),
			NodeData::Comment(c) => Node::comment(&c.borrow()),
			NodeData::Fragment => Node::fragment(),
		};

		if deep {
			for child in self.children() {
				copy.append_child(&child.copy(true));
			}
		}
		copy
	}

	pub fn class_list(&self) -> Vec<String> {
		self.attribute("class")
			.map(|c| c.split_whitespace().map(str::to_owned).collect())
			.unwrap_or_default()
	}

	// Inline style, stored in the `style` attribute.

	fn style_entries(&self) -> Vec<(String, String)> {
		self.attribute("style")
			.map(|style| {
				style
					.split(';')
					.filter_map(|decl| {
						let (name, value) = decl.split_once(':')?;
						let name = name.trim();
						(!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	fn write_style(&self, entries: &[(String, String)]) {
		if entries.is_empty() {
			self.remove_attribute("style");
		} else {
			let style = entries
				.iter()
				.map(|(n, v)| format!("{}: {};", n, v))
				.collect::<Vec<_>>()
				.join(" ");
			self.set_attribute("style", &style);
		}
	}

	fn selected_option(&self) -> Option<Node> {
		let options = self.query_selector_all("option");
		options
			.iter()
			.find(|o| o.checked())
			.or_else(|| options.first())
			.cloned()
	}

	pub fn listener_count(&self, event: &str) -> usize {
		self.element_data()
			.map(|d| {
				d.listeners
					.borrow()
					.iter()
					.filter(|(_, e, _)| &**e == event)
					.count()
			})
			.unwrap_or(0)
	}

	pub fn dispatch_event(&self, event: &Event) {
		event.set_target(self);
		let handlers: Vec<Handler> = match self.element_data() {
			Some(data) => data
				.listeners
				.borrow()
				.iter()
				.filter(|(_, e, _)| **e == *event.body.kind)
				.map(|(_, _, h)| h.clone())
				.collect(),
			None => return,
		};

		for handler in handlers {
			handler(event);
		}
	}

	/// Simulated typing into a text control.
	pub fn type_text(&self, value: &str) {
		self.set_value(value);
		self.dispatch_event(&Event::new("input"));
	}

	/// Simulated choice in a `<select>`.
	pub fn select(&self, value: &str) {
		self.set_value(value);
		self.dispatch_event(&Event::new("change"));
	}
}

impl HostNode for Node {
	type Event = Event;

	fn kind(&self) -> NodeKind {
		match &self.body.data {
			NodeData::Element(_) => NodeKind::Element,
			NodeData::Text(_) => NodeKind::Text,
			NodeData::Comment(_) => NodeKind::Comment,
			NodeData::Fragment => NodeKind::Fragment,
		}
	}

	fn tag_name(&self) -> Option<String> {
		self.tag().map(str::to_owned)
	}

	fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	fn create_comment(&self, data: &str) -> Option<Node> {
		Some(Node::comment(data))
	}

	fn create_fragment(&self) -> Option<Node> {
		Some(Node::fragment())
	}

	fn default_document() -> Option<Node> {
		Some(Node::fragment())
	}

	// Tree

	fn parent(&self) -> Option<Node> {
		self.body.parent.borrow().upgrade().map(|body| Node { body })
	}

	fn children(&self) -> Vec<Node> {
		self.body.children.borrow().clone()
	}

	fn child_count(&self) -> usize {
		self.body.children.borrow().len()
	}

	fn first_child(&self) -> Option<Node> {
		self.body.children.borrow().first().cloned()
	}

	fn next_sibling(&self) -> Option<Node> {
		let (parent, index) = self.position()?;
		let children = parent.body.children.borrow();
		children.get(index + 1).cloned()
	}

	fn previous_sibling(&self) -> Option<Node> {
		let (parent, index) = self.position()?;
		let children = parent.body.children.borrow();
		index.checked_sub(1).and_then(|i| children.get(i).cloned())
	}

	fn remove(&self) {
		if let Some((parent, index)) = self.position() {
			parent.body.children.borrow_mut().remove(index);
		}
		*self.body.parent.borrow_mut() = Weak::new();
	}

	/// Fragments are emptied into the target.
	fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		if let Some(reference) = reference {
			if reference.ptr_eq(child) {
				return;
			}
		}

		let nodes = if matches!(child.body.data, NodeData::Fragment) {
			let nodes = child.children();
			for node in &nodes {
				node.remove();
			}
			nodes
		} else {
			child.remove();
			vec![child.clone()]
		};

		let mut children = self.body.children.borrow_mut();
		let mut index = reference
			.and_then(|r| children.iter().position(|c| c.ptr_eq(r)))
			.unwrap_or(children.len());

		for node in nodes {
			*node.body.parent.borrow_mut() = Rc::downgrade(&self.body);
			children.insert(index, node);
			index += 1;
		}
	}

	fn clone_node(&self, deep: bool) -> Option<Node> {
		Some(self.copy(deep))
	}

	fn query_selector(&self, selector: &str) -> Option<Node> {
		let selector = Selector::parse(selector)?;
		self.descendants().into_iter().find(|n| selector.matches(n))
	}

	fn query_selector_all(&self, selector: &str) -> Vec<Node> {
		match Selector::parse(selector) {
			Some(selector) => self
				.descendants()
				.into_iter()
				.filter(|n| selector.matches(n))
				.collect(),
			None => Vec::new(),
		}
	}

	// Content

	fn text_content(&self) -> String {
		match &self.body.data {
			NodeData::Text(t) | NodeData::Comment(t) => t.borrow().clone(),
			_ => self
				.children()
				.iter()
				.filter(|c| !matches!(c.body.data, NodeData::Comment(_)))
				.map(Node::text_content)
				.collect(),
		}
	}

	fn set_text_content(&self, text: &str) {
		match &self.body.data {
			NodeData::Text(t) | NodeData::Comment(t) => *t.borrow_mut() = text.to_owned(),
			_ => {
				self.clear_children();
				if !text.is_empty() {
					self.append_child(&Node::text(text));
				}
			}
		}
	}

	fn inner_html(&self) -> String {
		self.children().iter().map(Node::outer_html).collect()
	}

	fn set_inner_html(&self, markup: &str) {
		self.clear_children();
		self.append_child(&parse_fragment(markup));
	}

	fn outer_html(&self) -> String {
		let mut out = String::new();
		html::serialize(self, &mut out);
		out
	}

	// Attributes

	fn attribute(&self, name: &str) -> Option<String> {
		let data = self.element_data()?;
		let attrs = data.attrs.borrow();
		attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
	}

	fn set_attribute(&self, name: &str, value: &str) {
		let Some(data) = self.element_data() else {
			return;
		};
		let mut attrs = data.attrs.borrow_mut();
		match attrs.iter_mut().find(|(n, _)| n == name) {
			Some((_, v)) => *v = value.to_owned(),
			None => attrs.push((name.to_owned(), value.to_owned())),
		}
	}

	fn remove_attribute(&self, name: &str) -> Option<String> {
		let data = self.element_data()?;
		let mut attrs = data.attrs.borrow_mut();
		let index = attrs.iter().position(|(n, _)| n == name)?;
		Some(attrs.remove(index).1)
	}

	fn attributes(&self) -> Vec<(String, String)> {
		self.element_data()
			.map(|d| d.attrs.borrow().clone())
			.unwrap_or_default()
	}

	fn style_property(&self, name: &str) -> Option<String> {
		self.style_entries()
			.into_iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v)
	}

	fn set_style_property(&self, name: &str, value: &str) {
		if value.is_empty() {
			self.remove_style_property(name);
			return;
		}
		let mut entries = self.style_entries();
		match entries.iter_mut().find(|(n, _)| n == name) {
			Some((_, v)) => *v = value.to_owned(),
			None => entries.push((name.to_owned(), value.to_owned())),
		}
		self.write_style(&entries);
	}

	fn remove_style_property(&self, name: &str) {
		let mut entries = self.style_entries();
		let before = entries.len();
		entries.retain(|(n, _)| n != name);
		if entries.len() != before {
			self.write_style(&entries);
		}
	}

	// Form properties

	fn value(&self) -> String {
		let Some(data) = self.element_data() else {
			return self.text_content();
		};
		if let Some(value) = data.value.borrow().clone() {
			return value;
		}
		match data.tag.as_str() {
			"textarea" => self.text_content(),
			"select" => self
				.selected_option()
				.map(|o| o.value())
				.unwrap_or_default(),
			"option" => self
				.attribute("value")
				.unwrap_or_else(|| self.text_content()),
			_ => self.attribute("value").unwrap_or_default(),
		}
	}

	fn set_value(&self, value: &str) {
		if let Some(data) = self.element_data() {
			*data.value.borrow_mut() = Some(value.to_owned());
			if data.tag == "select" {
				for option in self.query_selector_all("option") {
					option.set_checked(option.value() == value);
				}
			}
		}
	}

	fn checked(&self) -> bool {
		let Some(data) = self.element_data() else {
			return false;
		};
		data.checked.get().unwrap_or_else(|| {
			let attr = if data.tag == "option" { "selected" } else { "checked" };
			self.has_attribute(attr)
		})
	}

	fn set_checked(&self, checked: bool) {
		if let Some(data) = self.element_data() {
			data.checked.set(Some(checked));
		}
	}

	// Events

	fn add_event_listener(&self, event: &str, handler: impl Fn(&Event) + 'static) -> ListenerId {
		let id = ListenerId::next();
		if let Some(data) = self.element_data() {
			data.listeners
				.borrow_mut()
				.push((id, Rc::from(event), Rc::new(handler)));
		}
		id
	}

	fn remove_event_listener(&self, id: ListenerId) -> bool {
		let Some(data) = self.element_data() else {
			return false;
		};
		let mut listeners = data.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|(l, _, _)| *l != id);
		listeners.len() != before
	}

	/// Simulated user click: toggles checkboxes and selects radios before
	/// dispatching `click`, `input` and `change` for them.
	fn click(&self) {
		let toggles = self.tag() == Some("input")
			&& matches!(self.input_type().as_str(), "checkbox" | "radio");

		if toggles {
			if self.input_type() == "checkbox" {
				self.set_checked(!self.checked());
			} else {
				self.set_checked(true);
			}
		}

		self.dispatch_event(&Event::new("click"));
		if toggles {
			self.dispatch_event(&Event::new("input"));
			self.dispatch_event(&Event::new("change"));
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
		match &self.body.data {
			NodeData::Element(e) => write!(f, "<{}>", e.tag),
			NodeData::Text(t) => write!(f, "#text {:?}", t.borrow()),
			NodeData::Comment(c) => write!(f, "<!--{}-->", c.borrow()),
			NodeData::Fragment => f.write_str("#fragment"),
		}
	}
}

#[derive(Clone)]
pub struct Event {
	body: Rc<EventBody>,
}

struct EventBody {
	kind: Rc<str>,
	target: RefCell<Option<Node>>,
	default_prevented: Cell<bool>,
}

impl Event {
	pub fn new(kind: &str) -> Self {
		Event {
			body: Rc::new(EventBody {
				kind: Rc::from(kind),
				target: RefCell::new(None),
				default_prevented: Cell::new(false),
			}),
		}
	}

	fn set_target(&self, node: &Node) {
		*self.body.target.borrow_mut() = Some(node.clone());
	}
}

impl HostEvent for Event {
	type Node = Node;

	fn kind(&self) -> String {
		self.body.kind.to_string()
	}

	fn target(&self) -> Option<Node> {
		self.body.target.borrow().clone()
	}

	fn prevent_default(&self) {
		self.body.default_prevented.set(true);
	}

	fn default_prevented(&self) -> bool {
		self.body.default_prevented.get()
	}

	fn ptr_eq(&self, other: &Event) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event").field("kind", &self.body.kind).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn host_roundtrip<N: HostNode>(root: &N) -> Vec<String> {
		let anchor = root.create_comment("anchor").unwrap();
		root.insert_before(&anchor, root.first_child().as_ref());
		let fragment = root.create_fragment().unwrap();
		for child in root.children().iter().filter(|c| c.is_element()) {
			fragment.append_child(&child.clone_node(true).unwrap());
		}
		root.append_child(&fragment);
		root.children().iter().map(|c| format!("{:?}", c.kind())).collect()
	}

	#[test]
	fn host_operations_follow_the_tree() {
		let root = Node::parse("<p>a</p>text");
		assert_eq!(host_roundtrip(&root), ["Comment", "Element", "Text", "Element"]);
		assert_eq!(root.inner_html(), "<!--anchor--><p>a</p>text<p>a</p>");

		let p = root.query_selector("p").unwrap();
		assert!(root.remove_child(&p));
		assert!(!root.remove_child(&p));
		assert_eq!(Node::element("input").input_type(), "text");
	}

	#[test]
	fn clones_drop_listeners_and_form_state() {
		let input = Node::element("input");
		input.set_attribute("type", "checkbox");
		input.add_event_listener("change", |_| {});
		input.set_checked(true);

		let copy = input.clone_node(true).unwrap();
		assert_eq!(copy.attribute("type").as_deref(), Some("checkbox"));
		assert_eq!(copy.listener_count("change"), 0);
		assert!(!copy.checked());
		assert!(!copy.ptr_eq(&input));
	}

	#[test]
	fn removing_a_listener_stops_delivery() {
		let button = Node::element("button");
		let hits = Rc::new(Cell::new(0));
		let id = button.add_event_listener("click", {
			let hits = hits.clone();
			move |event: &Event| {
				assert_eq!(event.kind(), "click");
				hits.set(hits.get() + 1);
			}
		});
		button.click();
		assert!(button.remove_event_listener(id));
		assert!(!button.remove_event_listener(id));
		button.click();
		assert_eq!(hits.get(), 1);
	}
}
