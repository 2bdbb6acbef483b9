use std::fmt;

use tracing::trace;

use crate::interpreter::cell;
use crate::interpreter::env::Environment;
use crate::interpreter::error::EvalError;
use crate::interpreter::procedure::bind_formals;
use crate::interpreter::value::Value;

/// What a special form (or a closure call) hands back to the eval loop.
#[derive(PartialEq, Clone)]
pub enum Trampoline {
    Bounce(Value), // 继续求值这个表达式，尾位置，不增加 Rust 栈
    Land(Value),   // 最终结果
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trampoline::Bounce(val) => write!(f, "Bounce({:?})", val),
            Trampoline::Land(val) => write!(f, "Land({:?})", val),
        }
    }
}

/// Evaluates `expr` to a final value.
///
/// Frames pushed while evaluating are popped again before returning, whether
/// evaluation succeeded or not.
pub fn eval(env: &mut Environment, expr: &Value) -> Result<Value, EvalError> {
    let base = env.depth();
    let result = run(env, base, Trampoline::Bounce(expr.clone()));
    env.truncate(base);
    result
}

/// Calls `procedure` with already evaluated `args`. Used by natives such as `map` and `apply`.
pub fn apply(env: &mut Environment, procedure: &Value, args: Value) -> Result<Value, EvalError> {
    let base = env.depth();
    let result = call(env, base, procedure, args).and_then(|next| run(env, base, next));
    env.truncate(base);
    result
}

/// Evaluates all but the last expression of `body` for effect and bounces to the last.
pub fn eval_sequence(env: &mut Environment, body: &Value) -> Result<Trampoline, EvalError> {
    let mut exprs = body.iter();
    let Some(mut last) = exprs.next() else {
        return Ok(Trampoline::Land(Value::Absent));
    };
    for expr in exprs {
        eval(env, &last)?;
        last = expr;
    }
    Ok(Trampoline::Bounce(last))
}

fn run(env: &mut Environment, base: usize, mut next: Trampoline) -> Result<Value, EvalError> {
    loop {
        match next {
            Trampoline::Land(val) => return Ok(val),
            Trampoline::Bounce(expr) => {
                trace!("bounce: {}", expr);
                next = step(env, base, expr)?;
            }
        }
    }
}

fn step(env: &mut Environment, base: usize, expr: Value) -> Result<Trampoline, EvalError> {
    match expr {
        Value::Symbol(ref name) => env.resolve(name).map(Trampoline::Land),
        Value::Pair(ref cell) => {
            let (head, operands) = cell::split(cell);
            match eval(env, &head)? {
                Value::Special(form) => form.apply(env, operands),
                procedure @ (Value::Native(_) | Value::Closure(_)) => {
                    let args = eval_args(env, &operands)?;
                    call(env, base, &procedure, args)
                }
                other => Err(EvalError::NotCallable(other.to_string())),
            }
        }
        _ => Ok(Trampoline::Land(expr)),
    }
}

// Left to right, each in its own non-tail evaluation. A dotted tail is
// evaluated as well and becomes the tail of the argument list.
fn eval_args(env: &mut Environment, operands: &Value) -> Result<Value, EvalError> {
    let mut iter = operands.iter();
    let mut args = Vec::new();
    for operand in iter.by_ref() {
        args.push(eval(env, &operand)?);
    }
    let tail = match iter.tail() {
        Value::Empty => Value::Empty,
        tail => eval(env, tail)?,
    };
    Ok(cell::from_vec_with_tail(args, tail))
}

fn call(env: &mut Environment, base: usize, procedure: &Value, args: Value) -> Result<Trampoline, EvalError> {
    match procedure {
        Value::Native(native) => {
            trace!("call {}", native.name);
            (native.func)(env, args).map(Trampoline::Land)
        }
        Value::Closure(closure) => {
            env.enter_closure(closure, base);
            bind_formals(env, &closure.formals, args)?;
            eval_sequence(env, &Value::Pair(closure.body.clone()))
        }
        other => Err(EvalError::NotCallable(other.to_string())),
    }
}

#[cfg(test)]
mod test_trampoline {
    use super::*;
    use crate::interpreter::read;

    fn eval_in(env: &mut Environment, src: &str) -> Result<Value, EvalError> {
        let mut result = Value::Absent;
        for expr in read(src)? {
            result = eval(env, &expr)?;
        }
        Ok(result)
    }

    #[test]
    fn test_atoms_evaluate_to_themselves() {
        let mut env = Environment::new_root();
        assert_eq!(eval_in(&mut env, "42").unwrap().to_string(), "42");
        assert_eq!(eval_in(&mut env, "\"s\"").unwrap().to_string(), "\"s\"");
        assert_eq!(eval(&mut env, &Value::Empty).unwrap(), Value::Empty);
    }

    #[test]
    fn test_not_callable() {
        let mut env = Environment::new_root();
        assert_eq!(eval_in(&mut env, "(1 2)").unwrap_err(), EvalError::NotCallable("1".into()));
        assert_eq!(eval_in(&mut env, "(\"f\")").unwrap_err(), EvalError::NotCallable("\"f\"".into()));
        assert!(matches!(eval_in(&mut env, "(undefined-fn 1)"), Err(EvalError::UnboundSymbol(_))));
    }

    #[test]
    fn test_depth_restored_after_success_and_failure() {
        let mut env = Environment::new_root();
        eval_in(&mut env, "(define (f x) (g x)) (define (g x) (car x))").unwrap();
        assert_eq!(eval_in(&mut env, "(f '(1 2))").unwrap().to_string(), "1");
        assert_eq!(env.depth(), 1);
        assert!(matches!(eval_in(&mut env, "(f 5)"), Err(EvalError::Type(_))));
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_arguments_evaluated_left_to_right() {
        let mut env = Environment::new_root();
        let out = env.capture_output();
        eval_in(&mut env, "(list (display 1) (display 2) (display 3))").unwrap();
        assert_eq!(out.borrow().as_str(), "123");
    }

    #[test]
    fn test_dotted_argument_tail_is_evaluated() {
        let mut env = Environment::new_root();
        eval_in(&mut env, "(define xs '(2 3))").unwrap();
        assert_eq!(eval_in(&mut env, "(list 1 . xs)").unwrap().to_string(), "(1 2 3)");
    }

    #[test]
    fn test_apply_closure_and_native() {
        let mut env = Environment::new_root();
        let add = eval_in(&mut env, "+").unwrap();
        let args = Value::from_vec(vec![Value::Number(1.into()), Value::Number(2.into())]);
        assert_eq!(apply(&mut env, &add, args.clone()).unwrap().to_string(), "3");

        let swap = eval_in(&mut env, "(lambda (a b) (list b a))").unwrap();
        assert_eq!(apply(&mut env, &swap, args.clone()).unwrap().to_string(), "(2 1)");
        assert_eq!(env.depth(), 1);

        let form = eval_in(&mut env, "if").unwrap();
        assert_eq!(apply(&mut env, &form, args).unwrap_err(), EvalError::NotCallable("#<special:if>".into()));
    }

    #[test]
    fn test_eval_sequence() {
        let mut env = Environment::new_root();
        assert_eq!(eval_sequence(&mut env, &Value::Empty).unwrap(), Trampoline::Land(Value::Absent));
        let body = read("((define a 1) a)").unwrap().remove(0);
        assert_eq!(eval_sequence(&mut env, &body).unwrap(), Trampoline::Bounce(Value::symbol("a")));
        assert_eq!(env.resolve("a").unwrap().to_string(), "1");
    }

    #[test]
    fn test_self_tail_call_keeps_frame_depth_constant() {
        let mut env = Environment::new_root();
        eval_in(&mut env, "(define (count n) (if (= n 0) 'done (count (- n 1))))").unwrap();
        assert_eq!(eval_in(&mut env, "(count 50000)").unwrap().to_string(), "done");
    }
}
