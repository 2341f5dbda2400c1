use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Not,
	Neg,
	Plus,
	TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	Lt,
	Gt,
	Le,
	Ge,
	Eq,
	Ne,
	StrictEq,
	StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
	And,
	Or,
	Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Global {
	String,
	Number,
	Boolean,
	NaN,
	Infinity,
}

impl Global {
	pub fn lookup(name: &str) -> Option<Global> {
		Some(match name {
			"String" => Global::String,
			"Number" => Global::Number,
			"Boolean" => Global::Boolean,
			"NaN" => Global::NaN,
			"Infinity" => Global::Infinity,
			_ => return None,
		})
	}
}

/// How an identifier is reached at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum Name {
	/// As parsed, before resolution.
	Unresolved(Rc<str>),
	/// Slot into the program's referenced bindings.
	Var(usize),
	/// Arrow parameter, indexed from the outermost frame.
	Local(usize),
	Global(Global),
	/// Not bound anywhere; reading it is a reference error.
	Unknown(Rc<str>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
	pub params: Vec<Rc<str>>,
	/// Number of locals visible where the arrow is created.
	pub frame: usize,
	pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Literal(Literal),
	Name(Name),
	Array(Vec<Expr>),
	Object(Vec<(Rc<str>, Expr)>),
	Member {
		object: Box<Expr>,
		property: Rc<str>,
		optional: bool,
	},
	Index {
		object: Box<Expr>,
		index: Box<Expr>,
		optional: bool,
	},
	Call {
		callee: Box<Expr>,
		args: Vec<Expr>,
	},
	Unary {
		op: UnaryOp,
		operand: Box<Expr>,
	},
	Update {
		increment: bool,
		prefix: bool,
		target: Box<Expr>,
	},
	Binary {
		op: BinaryOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Logical {
		op: LogicalOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Conditional {
		test: Box<Expr>,
		consequent: Box<Expr>,
		alternate: Box<Expr>,
	},
	Assign {
		op: Option<BinaryOp>,
		target: Box<Expr>,
		value: Box<Expr>,
	},
	Arrow(Rc<Arrow>),
	Sequence(Vec<Expr>),
}

impl Expr {
	/// Plain reference such as `save` or `form.submit`.
	pub fn is_path(&self) -> bool {
		match self {
			Expr::Name(_) => true,
			Expr::Member { object, .. } | Expr::Index { object, .. } => object.is_path(),
			_ => false,
		}
	}

	pub fn is_assignable(&self) -> bool {
		matches!(
			self,
			Expr::Name(_) | Expr::Member { optional: false, .. } | Expr::Index { optional: false, .. }
		)
	}
}
