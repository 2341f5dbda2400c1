use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("syntax error at {position}: {message}")]
	Syntax { message: String, position: usize },

	#[error("{0} is not defined")]
	Reference(String),

	#[error("type error: {0}")]
	Type(String),

	#[error("invalid assignment target: {0}")]
	Assign(String),

	#[error("effect failed: {0}")]
	Effect(String),

	#[error("handler {attribute}=\"{value}\" failed: {source}")]
	Handler {
		attribute: String,
		value: String,
		source: Box<Error>,
	},

	#[error("mount target {0:?} could not be resolved")]
	MountTarget(String),

	#[error("hook failed: {0}")]
	Hook(String),

	#[error("flush aborted after {0} cycles, an effect keeps re-triggering itself")]
	FlushLimit(usize),
}

impl Error {
	pub fn syntax(message: impl Into<String>, position: usize) -> Self {
		Error::Syntax {
			message: message.into(),
			position,
		}
	}

	pub fn type_error(message: impl Into<String>) -> Self {
		Error::Type(message.into())
	}
}

/// Where an error was caught before being routed to the `OnError` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	Expression,
	Effect,
	Event,
	Compile,
	Hook,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Phase::Expression => "expression",
			Phase::Effect => "effect",
			Phase::Event => "event",
			Phase::Compile => "compile",
			Phase::Hook => "hook",
		})
	}
}
