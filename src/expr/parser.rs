//! Front end of the expression language.
//!
//! `oxc_parser` reads the source; the arena AST it produces is lowered into
//! the owned [`Expr`] tree, keeping only the subset templates evaluate.
//! A single expression is tried first so object literals parse as values,
//! then the source is read as a `;`-separated list of expression statements.

use std::rc::Rc;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
	AssignmentTarget, BindingPattern, CallExpression, ChainElement, ComputedMemberExpression,
	Expression, ObjectPropertyKind, PropertyKey, PropertyKind, SimpleAssignmentTarget, Statement,
	StaticMemberExpression,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::operator::{
	AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};

use super::ast::{Arrow, BinaryOp, Expr, Literal, LogicalOp, Name, UnaryOp};
use crate::error::{Error, Result};
use crate::value::format_number;

/// Deepest bracket or expression nesting accepted.
pub const MAX_DEPTH: usize = 64;
/// Most words, punctuation characters and brackets one source may hold.
pub const MAX_TOKENS: usize = 256;

pub fn parse(source: &str) -> Result<Expr> {
	let source = source.trim();
	// the parser recurses along the source's nesting, bound it first
	check_size(source)?;

	let allocator = Allocator::default();
	let source_type = SourceType::default();

	if let Ok(expr) = Parser::new(&allocator, source, source_type).parse_expression() {
		if expr.span().end as usize == source.len() {
			return Lowering::default().expr(&expr);
		}
	}

	let ret = Parser::new(&allocator, source, source_type).parse();
	if let Some(error) = ret.errors.first() {
		return Err(Error::syntax(error.to_string(), 0));
	}
	if ret.panicked {
		return Err(Error::syntax("unexpected end of expression", source.len()));
	}

	let mut lowering = Lowering::default();
	let mut exprs = Vec::with_capacity(ret.program.body.len());
	for statement in ret.program.body.iter() {
		match statement {
			Statement::ExpressionStatement(statement) => exprs.push(lowering.expr(&statement.expression)?),
			Statement::EmptyStatement(_) => {}
			other => return Err(unsupported("statement", other.span())),
		}
	}

	match exprs.len() {
		0 => Err(Error::syntax("expected an expression", 0)),
		1 => Ok(exprs.remove(0)),
		_ => Ok(Expr::Sequence(exprs)),
	}
}

fn check_size(source: &str) -> Result<()> {
	let mut depth = 0usize;
	let mut tokens = 0usize;
	let mut in_word = false;
	let mut quote = None;
	let mut chars = source.char_indices();

	while let Some((pos, c)) = chars.next() {
		if let Some(open) = quote {
			if c == '\\' {
				chars.next();
			} else if c == open {
				quote = None;
			}
			continue;
		}

		let word = c.is_alphanumeric() || c == '_' || c == '$';
		if word && !in_word {
			tokens += 1;
		}
		in_word = word;

		match c {
			'\'' | '"' | '`' => {
				quote = Some(c);
				tokens += 1;
			}
			'(' | '[' | '{' => {
				depth += 1;
				tokens += 1;
				if depth > MAX_DEPTH {
					return Err(Error::syntax("expression nests too deeply", pos));
				}
			}
			')' | ']' | '}' => depth = depth.saturating_sub(1),
			c if !word && !c.is_whitespace() => tokens += 1,
			_ => {}
		}

		if tokens > MAX_TOKENS {
			return Err(Error::syntax("expression is too long", pos));
		}
	}
	Ok(())
}

fn unsupported(what: &str, span: Span) -> Error {
	Error::syntax(format!("unsupported {} in template expression", what), span.start as usize)
}

fn identifier(name: &str) -> Expr {
	match name {
		"undefined" => Expr::Literal(Literal::Undefined),
		_ => Expr::Name(Name::Unresolved(Rc::from(name))),
	}
}

fn boxed(expr: Expr) -> Box<Expr> {
	Box::new(expr)
}

#[derive(Default)]
struct Lowering {
	depth: usize,
}

impl Lowering {
	fn expr(&mut self, expr: &Expression<'_>) -> Result<Expr> {
		self.depth += 1;
		let lowered = if self.depth > MAX_DEPTH {
			Err(Error::syntax("expression nests too deeply", expr.span().start as usize))
		} else {
			self.lower(expr)
		};
		self.depth -= 1;
		lowered
	}

	fn lower(&mut self, expr: &Expression<'_>) -> Result<Expr> {
		Ok(match expr {
			Expression::BooleanLiteral(b) => Expr::Literal(Literal::Bool(b.value)),
			Expression::NullLiteral(_) => Expr::Literal(Literal::Null),
			Expression::NumericLiteral(n) => Expr::Literal(Literal::Number(n.value)),
			Expression::StringLiteral(s) => Expr::Literal(Literal::String(Rc::from(s.value.as_str()))),
			Expression::Identifier(id) => identifier(id.name.as_str()),
			Expression::ParenthesizedExpression(paren) => self.expr(&paren.expression)?,

			Expression::ArrayExpression(array) => {
				let mut items = Vec::with_capacity(array.elements.len());
				for element in array.elements.iter() {
					match element.as_expression() {
						Some(item) => items.push(self.expr(item)?),
						None => return Err(unsupported("spread or hole in array literal", array.span)),
					}
				}
				Expr::Array(items)
			}

			Expression::ObjectExpression(object) => {
				let mut props = Vec::with_capacity(object.properties.len());
				for property in object.properties.iter() {
					let ObjectPropertyKind::ObjectProperty(property) = property else {
						return Err(unsupported("spread property", object.span));
					};
					if property.method || !matches!(property.kind, PropertyKind::Init) {
						return Err(unsupported("method property", property.span));
					}
					let key: Rc<str> = match &property.key {
						PropertyKey::StaticIdentifier(id) => Rc::from(id.name.as_str()),
						PropertyKey::StringLiteral(s) => Rc::from(s.value.as_str()),
						PropertyKey::NumericLiteral(n) => Rc::from(format_number(n.value)),
						_ => return Err(unsupported("computed property key", property.span)),
					};
					props.push((key, self.expr(&property.value)?));
				}
				Expr::Object(props)
			}

			Expression::StaticMemberExpression(member) => self.static_member(member)?,
			Expression::ComputedMemberExpression(member) => self.computed_member(member)?,
			Expression::CallExpression(call) => self.call(call)?,
			Expression::ChainExpression(chain) => match &chain.expression {
				ChainElement::CallExpression(call) => self.call(call)?,
				ChainElement::StaticMemberExpression(member) => self.static_member(member)?,
				ChainElement::ComputedMemberExpression(member) => self.computed_member(member)?,
				_ => return Err(unsupported("optional chain", chain.span)),
			},

			Expression::UnaryExpression(unary) => {
				let op = match unary.operator {
					UnaryOperator::LogicalNot => UnaryOp::Not,
					UnaryOperator::UnaryNegation => UnaryOp::Neg,
					UnaryOperator::UnaryPlus => UnaryOp::Plus,
					UnaryOperator::Typeof => UnaryOp::TypeOf,
					other => return Err(unsupported(&format!("operator {:?}", other), unary.span)),
				};
				Expr::Unary {
					op,
					operand: boxed(self.expr(&unary.argument)?),
				}
			}

			Expression::UpdateExpression(update) => Expr::Update {
				increment: matches!(update.operator, UpdateOperator::Increment),
				prefix: update.prefix,
				target: boxed(self.simple_target(&update.argument)?),
			},

			Expression::BinaryExpression(binary) => {
				let op = match binary.operator {
					BinaryOperator::Addition => BinaryOp::Add,
					BinaryOperator::Subtraction => BinaryOp::Sub,
					BinaryOperator::Multiplication => BinaryOp::Mul,
					BinaryOperator::Division => BinaryOp::Div,
					BinaryOperator::Remainder => BinaryOp::Rem,
					BinaryOperator::LessThan => BinaryOp::Lt,
					BinaryOperator::GreaterThan => BinaryOp::Gt,
					BinaryOperator::LessEqualThan => BinaryOp::Le,
					BinaryOperator::GreaterEqualThan => BinaryOp::Ge,
					BinaryOperator::Equality => BinaryOp::Eq,
					BinaryOperator::Inequality => BinaryOp::Ne,
					BinaryOperator::StrictEquality => BinaryOp::StrictEq,
					BinaryOperator::StrictInequality => BinaryOp::StrictNe,
					other => return Err(unsupported(&format!("operator {:?}", other), binary.span)),
				};
				Expr::Binary {
					op,
					left: boxed(self.expr(&binary.left)?),
					right: boxed(self.expr(&binary.right)?),
				}
			}

			Expression::LogicalExpression(logical) => Expr::Logical {
				op: match logical.operator {
					LogicalOperator::And => LogicalOp::And,
					LogicalOperator::Or => LogicalOp::Or,
					LogicalOperator::Coalesce => LogicalOp::Nullish,
				},
				left: boxed(self.expr(&logical.left)?),
				right: boxed(self.expr(&logical.right)?),
			},

			Expression::ConditionalExpression(cond) => Expr::Conditional {
				test: boxed(self.expr(&cond.test)?),
				consequent: boxed(self.expr(&cond.consequent)?),
				alternate: boxed(self.expr(&cond.alternate)?),
			},

			Expression::AssignmentExpression(assign) => {
				let op = match assign.operator {
					AssignmentOperator::Assign => None,
					AssignmentOperator::Addition => Some(BinaryOp::Add),
					AssignmentOperator::Subtraction => Some(BinaryOp::Sub),
					AssignmentOperator::Multiplication => Some(BinaryOp::Mul),
					AssignmentOperator::Division => Some(BinaryOp::Div),
					AssignmentOperator::Remainder => Some(BinaryOp::Rem),
					other => return Err(unsupported(&format!("operator {:?}", other), assign.span)),
				};
				let target = match &assign.left {
					AssignmentTarget::AssignmentTargetIdentifier(id) => identifier(id.name.as_str()),
					AssignmentTarget::StaticMemberExpression(member) => self.static_member(member)?,
					AssignmentTarget::ComputedMemberExpression(member) => self.computed_member(member)?,
					_ => return Err(unsupported("assignment target", assign.span)),
				};
				if !target.is_assignable() {
					return Err(Error::syntax("invalid assignment target", assign.span.start as usize));
				}
				Expr::Assign {
					op,
					target: boxed(target),
					value: boxed(self.expr(&assign.right)?),
				}
			}

			Expression::ArrowFunctionExpression(arrow) => {
				if arrow.r#async || !arrow.expression || arrow.params.rest.is_some() {
					return Err(unsupported("arrow function form", arrow.span));
				}
				let mut params = Vec::with_capacity(arrow.params.items.len());
				for param in arrow.params.items.iter() {
					match &param.pattern {
						BindingPattern::BindingIdentifier(id) => params.push(Rc::from(id.name.as_str())),
						_ => return Err(unsupported("destructuring parameter", arrow.span)),
					}
				}
				let Some(Statement::ExpressionStatement(body)) = arrow.body.statements.first() else {
					return Err(unsupported("arrow function body", arrow.span));
				};
				Expr::Arrow(Rc::new(Arrow {
					params,
					frame: 0,
					body: self.expr(&body.expression)?,
				}))
			}

			Expression::SequenceExpression(seq) => {
				let mut exprs = Vec::with_capacity(seq.expressions.len());
				for item in seq.expressions.iter() {
					exprs.push(self.expr(item)?);
				}
				Expr::Sequence(exprs)
			}

			other => return Err(unsupported("syntax", other.span())),
		})
	}

	fn static_member(&mut self, member: &StaticMemberExpression<'_>) -> Result<Expr> {
		Ok(Expr::Member {
			object: boxed(self.expr(&member.object)?),
			property: Rc::from(member.property.name.as_str()),
			optional: member.optional,
		})
	}

	fn computed_member(&mut self, member: &ComputedMemberExpression<'_>) -> Result<Expr> {
		Ok(Expr::Index {
			object: boxed(self.expr(&member.object)?),
			index: boxed(self.expr(&member.expression)?),
			optional: member.optional,
		})
	}

	fn call(&mut self, call: &CallExpression<'_>) -> Result<Expr> {
		if call.optional {
			return Err(unsupported("optional call", call.span));
		}
		let callee = self.expr(&call.callee)?;
		let mut args = Vec::with_capacity(call.arguments.len());
		for argument in call.arguments.iter() {
			match argument.as_expression() {
				Some(arg) => args.push(self.expr(arg)?),
				None => return Err(unsupported("spread argument", call.span)),
			}
		}
		Ok(Expr::Call {
			callee: boxed(callee),
			args,
		})
	}

	fn simple_target(&mut self, target: &SimpleAssignmentTarget<'_>) -> Result<Expr> {
		match target {
			SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => match identifier(id.name.as_str()) {
				target @ Expr::Name(_) => Ok(target),
				_ => Err(Error::syntax("invalid update target", id.span.start as usize)),
			},
			SimpleAssignmentTarget::StaticMemberExpression(member) => self.static_member(member),
			SimpleAssignmentTarget::ComputedMemberExpression(member) => self.computed_member(member),
			other => Err(unsupported("update target", other.span())),
		}
	}
}
