//! Minimal HTML fragment parser and serializer.
//!
//! Handles elements, attributes (quoted, unquoted and valueless), text,
//! comments, void elements and raw-text elements. Unknown end tags are
//! ignored and unclosed elements are closed at the end of input.

use super::{Node, NodeData, VOID_ELEMENTS};
use crate::dom::HostNode;

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

struct Parser<'a> {
	src: &'a str,
	pos: usize,
	stack: Vec<Node>,
}

pub fn parse_fragment(src: &str) -> Node {
	let root = Node::fragment();
	let mut parser = Parser {
		src,
		pos: 0,
		stack: vec![root.clone()],
	};
	parser.run();
	root
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}

	fn current(&self) -> &Node {
		// The fragment root is never popped.
		&self.stack[self.stack.len() - 1]
	}

	fn run(&mut self) {
		while self.pos < self.src.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				self.comment();
			} else if rest.starts_with("</") {
				self.end_tag();
			} else if rest.starts_with("<!") || rest.starts_with("<?") {
				self.skip_declaration();
			} else if rest.starts_with('<')
				&& rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
			{
				self.start_tag();
			} else {
				self.text();
			}
		}
	}

	fn text(&mut self) {
		let rest = self.rest();
		let first = rest.chars().next().map_or(1, char::len_utf8);
		let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
		let text = decode_entities(&rest[..end]);
		self.pos += end;
		self.current().append_child(&Node::text(&text));
	}

	fn comment(&mut self) {
		let rest = &self.rest()[4..];
		let (data, consumed) = match rest.find("-->") {
			Some(end) => (&rest[..end], end + 3),
			None => (rest, rest.len()),
		};
		self.current().append_child(&Node::comment(data));
		self.pos += 4 + consumed;
	}

	fn skip_declaration(&mut self) {
		let rest = self.rest();
		self.pos += rest.find('>').map_or(rest.len(), |i| i + 1);
	}

	fn end_tag(&mut self) {
		let rest = &self.rest()[2..];
		let end = rest.find('>').unwrap_or(rest.len());
		let name = rest[..end].trim().to_ascii_lowercase();
		self.pos += 2 + (end + 1).min(rest.len());

		let open = self
			.stack
			.iter()
			.rposition(|n| n.tag() == Some(name.as_str()));
		if let Some(index) = open {
			if index > 0 {
				self.stack.truncate(index);
			}
		}
	}

	fn start_tag(&mut self) {
		self.pos += 1;
		let name = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
		let element = Node::element(&name);
		let tag = name.to_ascii_lowercase();

		let mut self_closing = false;
		loop {
			self.skip_whitespace();
			let rest = self.rest();
			if rest.is_empty() {
				break;
			}
			if rest.starts_with("/>") {
				self.pos += 2;
				self_closing = true;
				break;
			}
			if rest.starts_with('>') {
				self.pos += 1;
				break;
			}
			if rest.starts_with('/') {
				self.pos += 1;
				continue;
			}

			let attr = self.take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/');
			self.skip_whitespace();
			let value = if self.rest().starts_with('=') {
				self.pos += 1;
				self.skip_whitespace();
				self.attribute_value()
			} else {
				String::new()
			};
			if !attr.is_empty() && !element.has_attribute(&attr.to_ascii_lowercase()) {
				element.set_attribute(&attr.to_ascii_lowercase(), &value);
			}
		}

		self.current().append_child(&element);

		if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
			return;
		}

		if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
			let close = format!("</{}", tag);
			let rest = self.rest();
			let end = find_ascii_case_insensitive(rest, &close).unwrap_or(rest.len());
			let text = &rest[..end];
			if !text.is_empty() {
				let text = if tag == "textarea" || tag == "title" {
					decode_entities(text)
				} else {
					text.to_owned()
				};
				element.append_child(&Node::text(&text));
			}
			self.pos += end;
			let rest = self.rest();
			self.pos += rest.find('>').map_or(rest.len(), |i| i + 1);
			return;
		}

		self.stack.push(element);
	}

	fn attribute_value(&mut self) -> String {
		let rest = self.rest();
		let quote = rest.chars().next();
		match quote {
			Some(q @ ('"' | '\'')) => {
				let body = &rest[1..];
				let end = body.find(q).unwrap_or(body.len());
				let value = decode_entities(&body[..end]);
				self.pos += 1 + (end + 1).min(body.len());
				value
			}
			_ => {
				let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
				decode_entities(&raw)
			}
		}
	}

	fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
		let rest = self.rest();
		let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
		self.pos += end;
		rest[..end].to_owned()
	}

	fn skip_whitespace(&mut self) {
		let rest = self.rest();
		self.pos += rest.len() - rest.trim_start().len();
	}
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
	let hay = haystack.as_bytes();
	let needle = needle.as_bytes();
	if needle.len() > hay.len() {
		return None;
	}
	(0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_owned();
	}

	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);
		rest = &rest[start..];
		let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
			let entity = &rest[1..end];
			let c = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" | "#39" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity
					.strip_prefix("#x")
					.or_else(|| entity.strip_prefix("#X"))
					.and_then(|hex| u32::from_str_radix(hex, 16).ok())
					.or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
					.and_then(char::from_u32),
			};
			c.map(|c| (c, end))
		});

		match decoded {
			Some((c, end)) => {
				out.push(c);
				rest = &rest[end + 1..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

pub fn escape_text(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

pub fn escape_attribute(value: &str) -> String {
	value.replace('&', "&amp;").replace('"', "&quot;")
}

pub(super) fn serialize(node: &Node, out: &mut String) {
	match &node.body.data {
		NodeData::Text(t) => {
			let raw = node
				.parent()
				.and_then(|p| p.tag().map(|t| t == "script" || t == "style"))
				.unwrap_or(false);
			if raw {
				out.push_str(&t.borrow());
			} else {
				out.push_str(&escape_text(&t.borrow()));
			}
		}
		NodeData::Comment(c) => {
			out.push_str("<!--");
			out.push_str(&c.borrow());
			out.push_str("-->");
		}
		NodeData::Fragment => {
			for child in node.children() {
				serialize(&child, out);
			}
		}
		NodeData::Element(e) => {
			out.push('<');
			out.push_str(&e.tag);
			for (name, value) in e.attrs.borrow().iter() {
				out.push(' ');
				out.push_str(name);
				if !value.is_empty() {
					out.push_str("=\"");
					out.push_str(&escape_attribute(value));
					out.push('"');
				}
			}
			out.push('>');
			if VOID_ELEMENTS.contains(&e.tag.as_str()) {
				return;
			}
			for child in node.children() {
				serialize(&child, out);
			}
			out.push_str("</");
			out.push_str(&e.tag);
			out.push('>');
		}
	}
}
