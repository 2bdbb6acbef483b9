pub mod builtin;
pub mod cell;
pub mod env;
pub mod error;
pub mod number;
pub mod procedure;
pub mod special;
pub mod trampoline;
pub mod value;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::interpreter::env::Environment;
use crate::interpreter::error::EvalError;
use crate::interpreter::value::Value;
use crate::reader;
use crate::reader::parser::Node;

pub fn parse_code(src: &str) -> Result<Vec<Node>, EvalError> { reader::parse_code(src) }

/// Source text to values, without evaluating anything.
pub fn read(src: &str) -> Result<Vec<Value>, EvalError> { Ok(parse_code(src)?.iter().map(Value::from_node).collect()) }

/// Owns one root environment; definitions persist across calls.
pub struct Interpreter {
    pub env: Environment,
}

impl Default for Interpreter {
    fn default() -> Self { Interpreter::new() }
}

impl Interpreter {
    pub fn new() -> Interpreter { Interpreter { env: Environment::new_root() } }

    pub fn eval(&mut self, expr: &Value) -> Result<Value, EvalError> {
        debug!("eval {}", expr);
        let result = trampoline::eval(&mut self.env, expr);
        debug!("=> {:?}", result);
        result
    }

    /// Evaluates every form in order, stopping at the first failure. Returns
    /// the display form of the last result.
    pub fn run(&mut self, src: &str) -> Result<String, EvalError> {
        let mut last = Value::Absent;
        for expr in read(src)? {
            last = self.eval(&expr)?;
        }
        Ok(last.to_string())
    }

    /// Evaluates every form, carrying on after a failing one. Only a syntax
    /// error, which is found before anything runs, fails as a whole.
    pub fn execute(&mut self, src: &str) -> Result<Vec<Result<String, EvalError>>, EvalError> {
        let exprs = read(src)?;
        Ok(exprs.iter().map(|expr| self.eval(expr).map(|val| val.to_string())).collect())
    }
}
