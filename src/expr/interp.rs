use std::rc::Rc;

use super::ast::{Arrow, BinaryOp, Expr, Literal, LogicalOp, Name, UnaryOp};
use super::builtins::{self, PropKey};
use super::parser::parse;
use super::resolve::resolve;
use crate::error::{Error, Result};
use crate::reactive::Object;
use crate::scope::Bindings;
use crate::value::{loose_equals, strict_equals, Function, Value};

/// Parsed and resolved expression, ready to run against any bindings
/// that define the same set of names.
#[derive(Debug)]
pub struct Program {
	source: Rc<str>,
	root: Expr,
	names: Rc<[Rc<str>]>,
}

impl Program {
	/// `available` must be sorted.
	pub fn compile(source: &str, available: &[Rc<str>]) -> Result<Program> {
		let (root, names) = resolve(parse(source)?, available);
		Ok(Program {
			source: Rc::from(source),
			root,
			names: names.into(),
		})
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	/// Bindings the expression reads.
	pub fn names(&self) -> &[Rc<str>] {
		&self.names
	}

	/// Plain reference such as `save` or `form.submit`.
	pub fn is_path(&self) -> bool {
		self.root.is_path()
	}

	pub fn run(&self, bindings: &Bindings) -> Result<Value> {
		self.env(bindings).eval(&self.root)
	}

	/// Store `value` into the location the expression names.
	pub fn assign(&self, bindings: &Bindings, value: Value) -> Result<()> {
		if !self.root.is_assignable() {
			return Err(Error::Assign(self.source.to_string()));
		}
		self.env(bindings).assign(&self.root, value)
	}

	fn env(&self, bindings: &Bindings) -> Env {
		Env {
			names: self.names.clone(),
			bindings: bindings.clone(),
			locals: Vec::new(),
		}
	}
}

#[derive(Clone)]
struct Env {
	names: Rc<[Rc<str>]>,
	bindings: Bindings,
	locals: Vec<Value>,
}

impl Env {
	fn eval(&mut self, expr: &Expr) -> Result<Value> {
		match expr {
			Expr::Literal(literal) => Ok(match literal {
				Literal::Undefined => Value::Undefined,
				Literal::Null => Value::Null,
				Literal::Bool(b) => Value::Bool(*b),
				Literal::Number(n) => Value::Number(*n),
				Literal::String(s) => Value::String(s.clone()),
			}),
			Expr::Name(name) => self.read(name),
			Expr::Array(items) => {
				let items = items
					.iter()
					.map(|item| self.eval(item).map(Value::into_raw))
					.collect::<Result<Vec<_>>>()?;
				Ok(Value::Array(items.into_iter().collect()))
			}
			Expr::Object(props) => {
				let object = Object::new();
				for (key, value) in props {
					object.insert(key, self.eval(value)?);
				}
				Ok(Value::Object(object))
			}
			Expr::Member {
				object,
				property,
				optional,
			} => {
				let target = self.eval(object)?;
				if *optional && target.clone().unref().is_nullish() {
					return Ok(Value::Undefined);
				}
				builtins::get_property(&target, &PropKey::Name(property.clone()))
			}
			Expr::Index {
				object,
				index,
				optional,
			} => {
				let target = self.eval(object)?;
				if *optional && target.clone().unref().is_nullish() {
					return Ok(Value::Undefined);
				}
				let key = PropKey::from_value(&self.eval(index)?.unref());
				builtins::get_property(&target, &key)
			}
			Expr::Call { callee, args } => self.call(callee, args),
			Expr::Unary { op, operand } => {
				if let (UnaryOp::TypeOf, Expr::Name(Name::Unknown(_))) = (op, &**operand) {
					return Ok(Value::str("undefined"));
				}
				let value = self.eval(operand)?.unref();
				Ok(match op {
					UnaryOp::Not => Value::Bool(!value.truthy()),
					UnaryOp::Neg => Value::Number(-value.to_number()),
					UnaryOp::Plus => Value::Number(value.to_number()),
					UnaryOp::TypeOf => Value::str(value.type_of()),
				})
			}
			Expr::Update {
				increment,
				prefix,
				target,
			} => {
				let old = self.eval(target)?.to_number();
				let new = if *increment { old + 1.0 } else { old - 1.0 };
				self.assign(target, Value::Number(new))?;
				Ok(Value::Number(if *prefix { new } else { old }))
			}
			Expr::Binary { op, left, right } => {
				let left = self.eval(left)?.unref();
				let right = self.eval(right)?.unref();
				Ok(binary(*op, &left, &right))
			}
			Expr::Logical { op, left, right } => {
				let left = self.eval(left)?;
				let short = match op {
					LogicalOp::And => !left.truthy(),
					LogicalOp::Or => left.truthy(),
					LogicalOp::Nullish => !left.clone().unref().is_nullish(),
				};
				if short {
					Ok(left)
				} else {
					self.eval(right)
				}
			}
			Expr::Conditional {
				test,
				consequent,
				alternate,
			} => {
				if self.eval(test)?.truthy() {
					self.eval(consequent)
				} else {
					self.eval(alternate)
				}
			}
			Expr::Assign { op, target, value } => {
				let value = match op {
					None => self.eval(value)?,
					Some(op) => {
						let current = self.eval(target)?.unref();
						let rhs = self.eval(value)?.unref();
						binary(*op, &current, &rhs)
					}
				};
				self.assign(target, value.clone())?;
				Ok(value)
			}
			Expr::Arrow(arrow) => Ok(self.closure(arrow)),
			Expr::Sequence(exprs) => {
				let mut last = Value::Undefined;
				for expr in exprs {
					last = self.eval(expr)?;
				}
				Ok(last)
			}
		}
	}

	fn read(&self, name: &Name) -> Result<Value> {
		match name {
			Name::Var(slot) => {
				let name = &self.names[*slot];
				self.bindings
					.lookup(name)
					.ok_or_else(|| Error::Reference(name.to_string()))
			}
			Name::Unresolved(name) => self
				.bindings
				.lookup(name)
				.ok_or_else(|| Error::Reference(name.to_string())),
			Name::Local(index) => Ok(self.locals.get(*index).cloned().unwrap_or_default()),
			Name::Global(global) => Ok(builtins::global(*global)),
			Name::Unknown(name) => Err(Error::Reference(name.to_string())),
		}
	}

	fn assign(&mut self, target: &Expr, value: Value) -> Result<()> {
		match target {
			Expr::Name(Name::Var(slot)) => {
				let name = self.names[*slot].clone();
				self.bindings.assign(&name, value)
			}
			Expr::Name(Name::Unresolved(name)) => self.bindings.assign(name, value),
			Expr::Name(Name::Local(index)) => {
				if let Some(local) = self.locals.get_mut(*index) {
					*local = value;
				}
				Ok(())
			}
			Expr::Name(Name::Unknown(name)) => Err(Error::Reference(name.to_string())),
			Expr::Member { object, property, .. } => {
				let target = self.eval(object)?;
				builtins::set_property(&target, &PropKey::Name(property.clone()), value)
			}
			Expr::Index { object, index, .. } => {
				let target = self.eval(object)?;
				let key = PropKey::from_value(&self.eval(index)?.unref());
				builtins::set_property(&target, &key, value)
			}
			other => Err(Error::Assign(describe(other))),
		}
	}

	fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value> {
		let (target, method) = match callee {
			Expr::Member {
				object,
				property,
				optional,
			} => (self.eval(object)?, Some((property.clone(), *optional))),
			Expr::Index {
				object,
				index,
				optional,
			} => {
				let target = self.eval(object)?;
				let key = PropKey::from_value(&self.eval(index)?.unref());
				(target, Some((key.name(), *optional)))
			}
			_ => (self.eval(callee)?.unref(), None),
		};

		if let Some((_, true)) = method {
			if target.clone().unref().is_nullish() {
				return Ok(Value::Undefined);
			}
		}

		let args = args
			.iter()
			.map(|arg| self.eval(arg))
			.collect::<Result<Vec<_>>>()?;

		match method {
			Some((name, _)) => builtins::call_method(&target, &name, &args),
			None => match target {
				Value::Function(func) => func.call(&args),
				_ => Err(Error::type_error(format!("{} is not a function", self.describe_callee(callee)))),
			},
		}
	}

	fn describe_callee(&self, callee: &Expr) -> String {
		match callee {
			Expr::Name(Name::Var(slot)) => self.names[*slot].to_string(),
			other => describe(other),
		}
	}

	fn closure(&self, arrow: &Rc<Arrow>) -> Value {
		let arrow = arrow.clone();
		let mut captured = self.clone();
		captured.locals.truncate(arrow.frame);

		Value::Function(Function::named("arrow", move |args| {
			let mut env = captured.clone();
			for i in 0..arrow.params.len() {
				env.locals.push(args.get(i).cloned().unwrap_or_default());
			}
			env.eval(&arrow.body)
		}))
	}
}

fn describe(expr: &Expr) -> String {
	match expr {
		Expr::Name(Name::Unresolved(name) | Name::Unknown(name)) => name.to_string(),
		Expr::Member { object, property, .. } => format!("{}.{}", describe(object), property),
		Expr::Literal(literal) => format!("{:?}", literal),
		_ => "expression".to_owned(),
	}
}

fn is_numeric(value: &Value) -> bool {
	matches!(
		value,
		Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
	)
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
	let (l, r) = (left.to_number(), right.to_number());
	match op {
		BinaryOp::Add if is_numeric(left) && is_numeric(right) => Value::Number(l + r),
		BinaryOp::Add => Value::from(format!("{}{}", left, right)),
		BinaryOp::Sub => Value::Number(l - r),
		BinaryOp::Mul => Value::Number(l * r),
		BinaryOp::Div => Value::Number(l / r),
		BinaryOp::Rem => Value::Number(l % r),
		BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
			let ordering = match (left, right) {
				(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
				_ => l.partial_cmp(&r),
			};
			Value::Bool(ordering.is_some_and(|o| match op {
				BinaryOp::Lt => o.is_lt(),
				BinaryOp::Gt => o.is_gt(),
				BinaryOp::Le => o.is_le(),
				_ => o.is_ge(),
			}))
		}
		BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
		BinaryOp::Ne => Value::Bool(!loose_equals(left, right)),
		BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
		BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::r#ref::Ref;

	fn bindings() -> Bindings {
		Bindings::new(
			Object::new()
				.with("count", Ref::new(1))
				.with("name", "zest")
				.with("items", vec![1, 2, 3])
				.with("user", Object::new().with("age", 30)),
		)
	}

	fn run(source: &str, bindings: &Bindings) -> Result<Value> {
		Program::compile(source, &bindings.names())?.run(bindings)
	}

	#[test]
	fn evaluates_operators() {
		let b = bindings();
		assert_eq!(run("1 + 2 * 3", &b).unwrap(), Value::from(7));
		assert_eq!(run("'a' + 1", &b).unwrap(), Value::str("a1"));
		assert_eq!(run("count + 1", &b).unwrap(), Value::from(2));
		assert_eq!(run("user.age >= 18 ? 'adult' : 'minor'", &b).unwrap(), Value::str("adult"));
		assert_eq!(run("null ?? 'x'", &b).unwrap(), Value::str("x"));
		assert_eq!(run("0 || 'y'", &b).unwrap(), Value::str("y"));
		assert_eq!(run("1 == '1'", &b).unwrap(), Value::Bool(true));
		assert_eq!(run("1 === '1'", &b).unwrap(), Value::Bool(false));
		assert_eq!(run("typeof missing", &b).unwrap(), Value::str("undefined"));
		assert_eq!(run("!name", &b).unwrap(), Value::Bool(false));
	}

	#[test]
	fn refs_unwrap_at_use_sites() {
		let b = bindings();
		assert!(matches!(run("count", &b).unwrap(), Value::Ref(_)));
		assert_eq!(run("count.value", &b).unwrap(), Value::from(1));
		run("count.value++", &b).unwrap();
		assert_eq!(run("count * 10", &b).unwrap(), Value::from(20));
		run("count = 5", &b).unwrap();
		assert!(matches!(run("count", &b).unwrap(), Value::Ref(_)));
		assert_eq!(run("count + 0", &b).unwrap(), Value::from(5));
	}

	#[test]
	fn assigns_through_members_and_indices() {
		let b = bindings();
		run("user.age += 1; items[0] = 10; name = 'z'", &b).unwrap();
		assert_eq!(run("user.age", &b).unwrap(), Value::from(31));
		assert_eq!(run("items[0]", &b).unwrap(), Value::from(10));
		assert_eq!(run("name", &b).unwrap(), Value::str("z"));

		let program = Program::compile("user.age", &b.names()).unwrap();
		program.assign(&b, Value::from(40)).unwrap();
		assert_eq!(run("user.age", &b).unwrap(), Value::from(40));
		assert_eq!(
			Program::compile("a + b", &b.names()).unwrap().assign(&b, Value::Null),
			Err(Error::Assign("a + b".into()))
		);
	}

	#[test]
	fn arrows_capture_locals() {
		let b = bindings();
		assert_eq!(run("items.map(x => x * count).join('-')", &b).unwrap(), Value::str("1-2-3"));
		assert_eq!(
			run("items.filter((x, i) => i > 0).map(y => items.map(z => y + z).join()).join(';')", &b).unwrap(),
			Value::str("3,4,5;4,5,6")
		);
		assert_eq!(run("items.reduce((a, x) => a + x, 0)", &b).unwrap(), Value::from(6));
	}

	#[test]
	fn reports_reference_and_type_errors() {
		let b = bindings();
		assert_eq!(run("missing + 1", &b), Err(Error::Reference("missing".into())));
		assert!(matches!(run("name()", &b), Err(Error::Type(msg)) if msg == "name is not a function"));
		assert!(matches!(run("nothing.x", &Bindings::new(Object::new().with("nothing", ()))), Err(Error::Type(_))));
		assert_eq!(run("user?.missing?.deep", &b).unwrap(), Value::Undefined);
	}
}
