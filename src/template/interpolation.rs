use enclose::enclose;
use smallvec::SmallVec;

use super::Compiler;
use crate::dom::{HostNode, Node};
use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	Text(String),
	Expr(String),
}

/// Split `text` into literal and expression segments. `None` when the
/// text has no complete interpolation.
pub fn parse_interpolation(text: &str, open: &str, close: &str) -> Option<SmallVec<[Segment; 4]>> {
	let mut segments = SmallVec::new();
	let mut rest = text;
	let mut found = false;

	while let Some(start) = rest.find(open) {
		let after = &rest[start + open.len()..];
		let Some(end) = after.find(close) else {
			break;
		};
		if start > 0 {
			segments.push(Segment::Text(rest[..start].to_owned()));
		}
		segments.push(Segment::Expr(after[..end].trim().to_owned()));
		found = true;
		rest = &after[end + close.len()..];
	}

	if !found {
		return None;
	}
	if !rest.is_empty() {
		segments.push(Segment::Text(rest.to_owned()));
	}
	Some(segments)
}

pub(super) fn compile(compiler: &Compiler, node: &Node, scope: &Scope) {
	let (open, close) = &compiler.config().delimiters;
	let Some(segments) = parse_interpolation(&node.text_content(), open, close) else {
		return;
	};

	let bindings = scope.bindings().clone();
	compiler.effect(
		scope,
		"interpolation",
		enclose!((compiler, node) move || {
			let mut text = String::new();
			for segment in &segments {
				match segment {
					Segment::Text(literal) => text.push_str(literal),
					Segment::Expr(source) if source.is_empty() => {}
					Segment::Expr(source) => {
						text.push_str(&compiler.display(&compiler.eval(source, &bindings), source))
					}
				}
			}
			if node.text_content() != text {
				node.set_text_content(&text);
			}
			Ok(())
		}),
	);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_literals_and_expressions() {
		let segments = parse_interpolation("Hi {{ name }}, {{n + 1}}!", "{{", "}}").unwrap();
		assert_eq!(
			segments.as_slice(),
			&[
				Segment::Text("Hi ".into()),
				Segment::Expr("name".into()),
				Segment::Text(", ".into()),
				Segment::Expr("n + 1".into()),
				Segment::Text("!".into()),
			]
		);
	}

	#[test]
	fn ignores_text_without_complete_markers() {
		assert!(parse_interpolation("plain", "{{", "}}").is_none());
		assert!(parse_interpolation("open {{ only", "{{", "}}").is_none());
		let custom = parse_interpolation("[[ a ]] {{ b }}", "[[", "]]").unwrap();
		assert_eq!(custom[0], Segment::Expr("a".into()));
		assert_eq!(custom[1], Segment::Text(" {{ b }}".into()));
	}
}
