use std::rc::Rc;

use phf::phf_map;

use crate::interpreter::cell::{self, CellRef};
use crate::interpreter::env::Environment;
use crate::interpreter::error::EvalError;
use crate::interpreter::procedure::{check_formals, Closure};
use crate::interpreter::trampoline::{eval, eval_sequence, Trampoline};
use crate::interpreter::value::Value;

use crate::malformed;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SpecialForm {
    Quote,
    If,
    Cond,
    Else,
    Lambda,
    Define,
    Let,
    Begin,
    And,
    Or,
}

pub static SPECIAL_FORMS: phf::Map<&'static str, SpecialForm> = phf_map! {
    "quote" => SpecialForm::Quote,
    "if" => SpecialForm::If,
    "cond" => SpecialForm::Cond,
    "else" => SpecialForm::Else,
    "lambda" => SpecialForm::Lambda,
    "λ" => SpecialForm::Lambda,
    "define" => SpecialForm::Define,
    "let" => SpecialForm::Let,
    "begin" => SpecialForm::Begin,
    "and" => SpecialForm::And,
    "or" => SpecialForm::Or,
};

/// Binds every special form in the root frame, so they can be passed around
/// (and shadowed) like any other value.
pub fn register(env: &mut Environment) {
    for (name, form) in SPECIAL_FORMS.entries() {
        env.define(*name, Value::Special(*form));
    }
}

impl SpecialForm {
    pub fn name(&self) -> &'static str {
        match self {
            SpecialForm::Quote => "quote",
            SpecialForm::If => "if",
            SpecialForm::Cond => "cond",
            SpecialForm::Else => "else",
            SpecialForm::Lambda => "lambda",
            SpecialForm::Define => "define",
            SpecialForm::Let => "let",
            SpecialForm::Begin => "begin",
            SpecialForm::And => "and",
            SpecialForm::Or => "or",
        }
    }

    /// `args` is the unevaluated operand list.
    pub fn apply(self, env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
        match self {
            SpecialForm::Quote => special_quote(args),
            SpecialForm::If => special_if(env, args),
            SpecialForm::Cond => special_cond(env, args),
            SpecialForm::Else => Ok(Trampoline::Land(Value::Boolean(true))),
            SpecialForm::Lambda => special_lambda(env, args),
            SpecialForm::Define => special_define(env, args),
            SpecialForm::Let => special_let(env, args),
            SpecialForm::Begin => {
                operands("begin", &args)?;
                eval_sequence(env, &args)
            }
            SpecialForm::And => special_and(env, args),
            SpecialForm::Or => special_or(env, args),
        }
    }
}

// operand list of `form`, which has to be a proper list
fn operands(form: &'static str, args: &Value) -> Result<Vec<Value>, EvalError> {
    let mut iter = args.iter();
    let items: Vec<Value> = iter.by_ref().collect();
    match iter.tail() {
        Value::Empty => Ok(items),
        tail => malformed!(form, "improper operand list ending in {}", tail),
    }
}

fn special_quote(args: Value) -> Result<Trampoline, EvalError> {
    match operands("quote", &args)?.as_slice() {
        [datum] => Ok(Trampoline::Land(datum.clone())),
        items => malformed!("quote", "expected exactly 1 argument, got {}", items.len()),
    }
}

fn special_if(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let items = operands("if", &args)?;
    let (test, then, otherwise) = match items.as_slice() {
        [test, then] => (test, then, None),
        [test, then, otherwise] => (test, then, Some(otherwise)),
        _ => malformed!("if", "expected 2 or 3 arguments, got {}", items.len()),
    };
    if eval(env, test)?.is_true() {
        return Ok(Trampoline::Bounce(then.clone()));
    }
    match otherwise {
        Some(expr) => Ok(Trampoline::Bounce(expr.clone())),
        None => Ok(Trampoline::Land(Value::Absent)),
    }
}

fn special_cond(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let clauses = operands("cond", &args)?;
    if clauses.is_empty() {
        malformed!("cond", "expected at least one clause");
    }
    for clause in clauses {
        let (test, body) = match clause {
            Value::Pair(ref cell) => cell::split(cell),
            _ => malformed!("cond", "clause must be a non-empty list: {}", clause),
        };
        operands("cond", &body)?;
        let pred = eval(env, &test)?;
        if pred.is_true() {
            // (test) on its own yields the test's value
            return match body {
                Value::Empty => Ok(Trampoline::Land(pred)),
                _ => eval_sequence(env, &body),
            };
        }
    }
    Ok(Trampoline::Land(Value::Absent))
}

// Shared by lambda, define and let. Formal errors are reported against `form`.
fn make_closure(form: &'static str, env: &Environment, formals: Value, body: Value, name: Option<String>) -> Result<Rc<Closure>, EvalError> {
    if let Err(EvalError::Type(message)) = check_formals(&formals) {
        malformed!(form, "{}", message);
    }
    operands(form, &body)?;
    let body: CellRef = match body {
        Value::Pair(cell) => cell,
        _ => malformed!(form, "expected at least one body expression"),
    };
    Ok(Rc::new(Closure::new(env.snapshot(), formals, body, name)))
}

fn special_lambda(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let (formals, body) = match args {
        Value::Pair(ref cell) => cell::split(cell),
        _ => malformed!("lambda", "expected formals and a body"),
    };
    let closure = make_closure("lambda", env, formals, body, None)?;
    Ok(Trampoline::Land(Value::Closure(closure)))
}

// (define name expr) | (define (name . formals) body...)
fn special_define(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let (target, rest) = match args {
        Value::Pair(ref cell) => cell::split(cell),
        _ => malformed!("define", "expected a name and a value"),
    };
    match target {
        Value::Symbol(name) => {
            let value = match operands("define", &rest)?.as_slice() {
                [expr] => eval(env, expr)?,
                exprs => malformed!("define", "expected exactly 1 expression for `{}`, got {}", name, exprs.len()),
            };
            env.define(name, value);
        }
        Value::Pair(ref cell) => {
            let (name, formals) = cell::split(cell);
            let name = match name {
                Value::Symbol(name) => name,
                other => malformed!("define", "procedure name must be a symbol, got {}", other),
            };
            let closure = make_closure("define", env, formals, rest, None)?;
            env.define(name, Value::Closure(closure));
        }
        other => malformed!("define", "expected a symbol or a list, got {}", other),
    }
    Ok(Trampoline::Land(Value::Absent))
}

// (let [name] ((var init) ...) body...) is a call to a fresh closure, so the
// inits are evaluated out here and the body runs in the closure's own frame.
fn special_let(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let (first, rest) = match args {
        Value::Pair(ref cell) => cell::split(cell),
        _ => malformed!("let", "expected bindings and a body"),
    };
    let (name, bindings, body) = match first {
        Value::Symbol(name) => match rest {
            Value::Pair(ref cell) => {
                let (bindings, body) = cell::split(cell);
                (Some(name), bindings, body)
            }
            _ => malformed!("let", "expected bindings after the loop name `{}`", name),
        },
        bindings => (None, bindings, rest),
    };

    let mut vars = Vec::new();
    let mut inits = Vec::new();
    for binding in operands("let", &bindings)? {
        match operands("let", &binding).ok().as_deref() {
            Some([var @ Value::Symbol(_), init]) => {
                vars.push(var.clone());
                inits.push(init.clone());
            }
            _ => malformed!("let", "each binding must be a (symbol expression) list, got {}", binding),
        }
    }

    let closure = make_closure("let", env, Value::from_vec(vars), body, name)?;
    Ok(Trampoline::Bounce(Value::cons(Value::Closure(closure), Value::from_vec(inits))))
}

fn special_and(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let mut exprs = operands("and", &args)?.into_iter();
    let Some(mut last) = exprs.next() else {
        return Ok(Trampoline::Land(Value::Boolean(true)));
    };
    for expr in exprs {
        let val = eval(env, &last)?;
        if !val.is_true() {
            return Ok(Trampoline::Land(val));
        }
        last = expr;
    }
    Ok(Trampoline::Bounce(last))
}

fn special_or(env: &mut Environment, args: Value) -> Result<Trampoline, EvalError> {
    let mut exprs = operands("or", &args)?.into_iter();
    let Some(mut last) = exprs.next() else {
        return Ok(Trampoline::Land(Value::Boolean(false)));
    };
    for expr in exprs {
        let val = eval(env, &last)?;
        if val.is_true() {
            return Ok(Trampoline::Land(val));
        }
        last = expr;
    }
    Ok(Trampoline::Bounce(last))
}
