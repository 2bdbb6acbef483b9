use std::fmt;
use std::rc::Rc;

use crate::interpreter::cell::{self, CellRef};
use crate::interpreter::env::{Bindings, Environment};
use crate::interpreter::error::EvalError;
use crate::interpreter::value::Value;

use crate::{arity_error, type_error};

pub type NativeFn = fn(&mut Environment, Value) -> Result<Value, EvalError>;

/// A builtin procedure. It receives the evaluated argument list.
#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#<procedure:{}>", self.name) }
}

/// A user procedure created by `lambda`, `define` or `let`.
pub struct Closure {
    /// Every binding visible when the closure was created, flattened.
    pub captured: Rc<Bindings>,
    pub formals: Value,
    pub body: CellRef,
    /// Named-let loop name. Bound to the closure itself in each frame it pushes.
    pub name: Option<String>,
}

impl Closure {
    pub fn new(captured: Rc<Bindings>, formals: Value, body: CellRef, name: Option<String>) -> Closure {
        Closure {
            captured,
            formals,
            body,
            name,
        }
    }
}

/// Checks the shape of a formal parameter spec: `()`, `args`, `(a b)` or `(a b . rest)`.
pub fn check_formals(formals: &Value) -> Result<(), EvalError> {
    let mut iter = formals.iter();
    for formal in iter.by_ref() {
        if !matches!(formal, Value::Symbol(_)) {
            type_error!("Formal parameter must be a symbol: {}", formal)
        }
    }
    match iter.tail() {
        Value::Empty | Value::Symbol(_) => Ok(()),
        tail => type_error!("The rest parameter must be a symbol: {}", tail),
    }
}

/// Binds `formals` against the evaluated `args` in the innermost frame.
///
/// Positional formals take one argument each; a symbol in rest position (or a
/// bare symbol as the whole spec) takes the remaining argument list. Missing
/// arguments are an error, surplus ones without a rest parameter are ignored.
pub fn bind_formals(env: &mut Environment, formals: &Value, args: Value) -> Result<(), EvalError> {
    let mut formals = formals.clone();
    let mut args = args;
    loop {
        match formals {
            Value::Empty => return Ok(()),
            Value::Symbol(rest) => {
                env.define(rest, args);
                return Ok(());
            }
            Value::Pair(ref formal_cell) => {
                let (formal, next_formals) = cell::split(formal_cell);
                let name = match formal {
                    Value::Symbol(name) => name,
                    other => type_error!("Formal parameter must be a symbol: {}", other),
                };
                let (arg, next_args) = match args {
                    Value::Pair(ref arg_cell) => cell::split(arg_cell),
                    _ => arity_error!("Missing argument for parameter `{}`", name),
                };
                env.define(name, arg);
                formals = next_formals;
                args = next_args;
            }
            other => type_error!("The rest parameter must be a symbol: {}", other),
        }
    }
}
