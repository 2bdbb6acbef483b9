use std::io;

use thiserror::Error;

/// Every way evaluation (or reading) can fail.
///
/// Errors propagate straight up to the top-level form being evaluated; nothing
/// inside the interpreter catches them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("UnboundSymbol: {0}")]
    UnboundSymbol(String),

    #[error("NotCallable: {0}")]
    NotCallable(String),

    #[error("MalformedSpecialForm: {form}: {message}")]
    MalformedSpecialForm { form: &'static str, message: String },

    #[error("TypeError: {0}")]
    Type(String),

    #[error("ArityError: {0}")]
    Arity(String),

    #[error("DivisionByZero: {0}")]
    DivisionByZero(String),

    #[error("Error: {0}")]
    User(String),

    #[error("IoError: {0}")]
    Io(String),
}

impl EvalError {
    /// Short name of the error kind, as printed in front of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Syntax(_) => "SyntaxError",
            EvalError::UnboundSymbol(_) => "UnboundSymbol",
            EvalError::NotCallable(_) => "NotCallable",
            EvalError::MalformedSpecialForm { .. } => "MalformedSpecialForm",
            EvalError::Type(_) => "TypeError",
            EvalError::Arity(_) => "ArityError",
            EvalError::DivisionByZero(_) => "DivisionByZero",
            EvalError::User(_) => "Error",
            EvalError::Io(_) => "IoError",
        }
    }
}

impl From<io::Error> for EvalError {
    fn from(err: io::Error) -> Self { EvalError::Io(err.to_string()) }
}

#[macro_export]
macro_rules! syntax_error {
    ($($arg:tt)*) => (
        return Err($crate::interpreter::error::EvalError::Syntax(format!($($arg)*)))
    )
}

#[macro_export]
macro_rules! type_error {
    ($($arg:tt)*) => (
        return Err($crate::interpreter::error::EvalError::Type(format!($($arg)*)))
    )
}

#[macro_export]
macro_rules! arity_error {
    ($($arg:tt)*) => (
        return Err($crate::interpreter::error::EvalError::Arity(format!($($arg)*)))
    )
}

// malformed!("if", "expected 2 or 3 arguments, got {}", n)
#[macro_export]
macro_rules! malformed {
    ($form:expr, $($arg:tt)*) => (
        return Err($crate::interpreter::error::EvalError::MalformedSpecialForm {
            form: $form,
            message: format!($($arg)*),
        })
    )
}
