use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// A dimension mismatch between a component's expected input shape and the
    /// actual input.
    Shape(String),
    /// A backward pass was requested without a matching pending forward pass.
    State(String),
    /// A value is invalid for semantic or domain reasons (e.g. a class label
    /// out of range).
    Value(String),
    /// Invalid construction or hyperparameter configuration.
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shape(msg) => write!(f, "shape error: {msg}"),
            Error::State(msg) => write!(f, "state error: {msg}"),
            Error::Value(msg) => write!(f, "value error: {msg}"),
            Error::Config(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
