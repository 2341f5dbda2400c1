use smallvec::SmallVec;

use super::Node;
use crate::dom::HostNode;

/// Descendant-combinator chain of compound selectors such as
/// `#app ul.items li[data-id]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
	parts: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: SmallVec<[String; 2]>,
	attrs: SmallVec<[(String, Option<String>); 1]>,
}

impl Selector {
	pub fn parse(src: &str) -> Option<Selector> {
		let parts = src
			.split_whitespace()
			.map(Compound::parse)
			.collect::<Option<Vec<_>>>()?;
		if parts.is_empty() {
			tracing::warn!(selector = src, "empty selector");
			return None;
		}
		Some(Selector { parts })
	}

	pub fn matches(&self, node: &Node) -> bool {
		let Some((last, ancestors)) = self.parts.split_last() else {
			return false;
		};
		if !last.matches(node) {
			return false;
		}

		let mut remaining = ancestors.iter().rev().peekable();
		let mut current = node.parent();
		while let Some(part) = remaining.peek() {
			let Some(ancestor) = current else {
				return false;
			};
			if part.matches(&ancestor) {
				remaining.next();
			}
			current = ancestor.parent();
		}
		true
	}
}

impl Compound {
	fn parse(src: &str) -> Option<Compound> {
		let mut compound = Compound::default();
		let mut rest = src;

		let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
		if tag_end > 0 {
			let tag = &rest[..tag_end];
			if tag != "*" {
				if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
					return None;
				}
				compound.tag = Some(tag.to_ascii_lowercase());
			}
			rest = &rest[tag_end..];
		}

		while let Some(marker) = rest.chars().next() {
			rest = &rest[1..];
			match marker {
				'#' | '.' => {
					let end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
					let name = &rest[..end];
					if name.is_empty() {
						return None;
					}
					if marker == '#' {
						compound.id = Some(name.to_owned());
					} else {
						compound.classes.push(name.to_owned());
					}
					rest = &rest[end..];
				}
				'[' => {
					let end = rest.find(']')?;
					let body = &rest[..end];
					let attr = match body.split_once('=') {
						Some((name, value)) => (
							name.trim().to_ascii_lowercase(),
							Some(value.trim().trim_matches(['"', '\'']).to_owned()),
						),
						None => (body.trim().to_ascii_lowercase(), None),
					};
					compound.attrs.push(attr);
					rest = &rest[end + 1..];
				}
				_ => return None,
			}
		}

		Some(compound)
	}

	fn matches(&self, node: &Node) -> bool {
		let Some(tag) = node.tag() else {
			return false;
		};
		if self.tag.as_deref().is_some_and(|t| t != tag) {
			return false;
		}
		if let Some(id) = &self.id {
			if node.attribute("id").as_deref() != Some(id.as_str()) {
				return false;
			}
		}
		if !self.classes.is_empty() {
			let classes = node.class_list();
			if !self.classes.iter().all(|c| classes.contains(c)) {
				return false;
			}
		}
		self.attrs.iter().all(|(name, value)| match value {
			Some(value) => node.attribute(name).as_deref() == Some(value.as_str()),
			None => node.has_attribute(name),
		})
	}
}
