use std::rc::Rc;

use super::ast::{Arrow, Expr, Global, Name};

/// Bind every identifier in `expr` against the sorted `available` names.
///
/// Returns the rewritten tree and the dense list of bindings it actually
/// reads, so evaluation only looks those up.
pub fn resolve(expr: Expr, available: &[Rc<str>]) -> (Expr, Vec<Rc<str>>) {
	let mut resolver = Resolver {
		available,
		used: Vec::new(),
		locals: Vec::new(),
	};
	let root = resolver.expr(expr);
	(root, resolver.used)
}

struct Resolver<'a> {
	available: &'a [Rc<str>],
	used: Vec<Rc<str>>,
	locals: Vec<Rc<str>>,
}

impl Resolver<'_> {
	fn name(&mut self, name: Rc<str>) -> Name {
		if let Some(index) = self.locals.iter().rposition(|l| *l == name) {
			return Name::Local(index);
		}
		if self.available.binary_search(&name).is_ok() {
			let slot = match self.used.iter().position(|u| *u == name) {
				Some(slot) => slot,
				None => {
					self.used.push(name);
					self.used.len() - 1
				}
			};
			return Name::Var(slot);
		}
		Global::lookup(&name).map_or(Name::Unknown(name), Name::Global)
	}

	fn boxed(&mut self, expr: Box<Expr>) -> Box<Expr> {
		Box::new(self.expr(*expr))
	}

	fn all(&mut self, exprs: Vec<Expr>) -> Vec<Expr> {
		exprs.into_iter().map(|e| self.expr(e)).collect()
	}

	fn expr(&mut self, expr: Expr) -> Expr {
		match expr {
			Expr::Name(Name::Unresolved(name)) => Expr::Name(self.name(name)),
			Expr::Literal(_) | Expr::Name(_) => expr,
			Expr::Array(items) => Expr::Array(self.all(items)),
			Expr::Object(props) => Expr::Object(
				props
					.into_iter()
					.map(|(key, value)| (key, self.expr(value)))
					.collect(),
			),
			Expr::Member {
				object,
				property,
				optional,
			} => Expr::Member {
				object: self.boxed(object),
				property,
				optional,
			},
			Expr::Index {
				object,
				index,
				optional,
			} => Expr::Index {
				object: self.boxed(object),
				index: self.boxed(index),
				optional,
			},
			Expr::Call { callee, args } => Expr::Call {
				callee: self.boxed(callee),
				args: self.all(args),
			},
			Expr::Unary { op, operand } => Expr::Unary {
				op,
				operand: self.boxed(operand),
			},
			Expr::Update {
				increment,
				prefix,
				target,
			} => Expr::Update {
				increment,
				prefix,
				target: self.boxed(target),
			},
			Expr::Binary { op, left, right } => Expr::Binary {
				op,
				left: self.boxed(left),
				right: self.boxed(right),
			},
			Expr::Logical { op, left, right } => Expr::Logical {
				op,
				left: self.boxed(left),
				right: self.boxed(right),
			},
			Expr::Conditional {
				test,
				consequent,
				alternate,
			} => Expr::Conditional {
				test: self.boxed(test),
				consequent: self.boxed(consequent),
				alternate: self.boxed(alternate),
			},
			Expr::Assign { op, target, value } => Expr::Assign {
				op,
				target: self.boxed(target),
				value: self.boxed(value),
			},
			Expr::Arrow(arrow) => {
				let Arrow { params, body, .. } = Rc::try_unwrap(arrow).unwrap_or_else(|a| (*a).clone());
				let frame = self.locals.len();
				self.locals.extend(params.iter().cloned());
				let body = self.expr(body);
				self.locals.truncate(frame);
				Expr::Arrow(Rc::new(Arrow { params, frame, body }))
			}
			Expr::Sequence(exprs) => Expr::Sequence(self.all(exprs)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::parser::parse;

	fn names(list: &[&str]) -> Vec<Rc<str>> {
		let mut names: Vec<Rc<str>> = list.iter().map(|n| Rc::from(*n)).collect();
		names.sort();
		names
	}

	#[test]
	fn assigns_dense_slots_to_referenced_bindings() {
		let (root, used) = resolve(parse("b + a + b").unwrap(), &names(&["a", "b", "c"]));
		assert_eq!(used, vec![Rc::from("b"), Rc::from("a")]);
		let Expr::Binary { right, .. } = root else {
			panic!("expected binary");
		};
		assert_eq!(*right, Expr::Name(Name::Var(0)));
	}

	#[test]
	fn arrow_params_shadow_bindings() {
		let (root, used) = resolve(parse("list.map(x => x + y)").unwrap(), &names(&["list", "x"]));
		assert_eq!(used, vec![Rc::from("list")]);
		let Expr::Call { args, .. } = root else {
			panic!("expected call");
		};
		let Expr::Arrow(arrow) = &args[0] else {
			panic!("expected arrow");
		};
		assert_eq!(arrow.frame, 0);
		let Expr::Binary { left, right, .. } = &arrow.body else {
			panic!("expected binary");
		};
		assert_eq!(**left, Expr::Name(Name::Local(0)));
		assert_eq!(**right, Expr::Name(Name::Unknown("y".into())));
	}

	#[test]
	fn falls_back_to_globals() {
		let (root, used) = resolve(parse("NaN").unwrap(), &[]);
		assert!(used.is_empty());
		assert_eq!(root, Expr::Name(Name::Global(Global::NaN)));
	}
}
