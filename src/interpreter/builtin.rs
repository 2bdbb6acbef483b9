use std::io::{self, BufRead};

use crate::interpreter::cell;
use crate::interpreter::env::Environment;
use crate::interpreter::error::EvalError;
use crate::interpreter::number::Number;
use crate::interpreter::procedure::{Native, NativeFn};
use crate::interpreter::trampoline;
use crate::interpreter::value::{Port, Value};
use crate::reader;

use crate::{arity_error, type_error};

pub static BUILTINS: &[(&str, NativeFn)] = &[
    // arithmetic
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("<", less),
    (">", greater),
    ("=", equal),
    ("<=", less_equal),
    (">=", greater_equal),
    // predicates
    ("null?", is_null),
    ("pair?", is_pair),
    ("zero?", is_zero),
    ("number?", is_number),
    ("string?", is_string),
    ("symbol?", is_symbol),
    ("boolean?", is_boolean),
    ("procedure?", is_procedure),
    ("port?", is_port),
    ("eq?", is_eq),
    ("not", not),
    // lists
    ("cons", cons),
    ("car", car),
    ("cdr", cdr),
    ("set-car!", set_car),
    ("set-cdr!", set_cdr),
    ("list", list),
    ("length", length),
    ("append", append),
    // ports
    ("display", display),
    ("newline", newline),
    ("read", read_datum),
    ("current-output-port", current_output_port),
    ("current-input-port", current_input_port),
    ("open-output-string", open_output_string),
    ("get-output-string", get_output_string),
    // control
    ("map", map_lists),
    ("apply", apply_procedure),
    ("error", raise_error),
];

pub fn register(env: &mut Environment) {
    for &(name, func) in BUILTINS {
        env.define(name, Value::Native(Native { name, func }));
    }
}

fn add(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    args.to_vec()?.into_iter().try_fold(Value::Number(Number::zero()), |acc, arg| acc + arg)
}

fn mul(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    args.to_vec()?.into_iter().try_fold(Value::Number(Number::one()), |acc, arg| acc * arg)
}

fn sub(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let mut values = args.to_vec()?.into_iter();
    let Some(first) = values.next() else {
        arity_error!("`-` expects at least 1 argument, got 0");
    };
    if values.as_slice().is_empty() {
        return -first;
    }
    values.try_fold(first, |acc, arg| acc - arg)
}

fn div(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let mut values = args.to_vec()?.into_iter();
    let Some(first) = values.next() else {
        arity_error!("`/` expects at least 1 argument, got 0");
    };
    if values.as_slice().is_empty() {
        return Value::Number(Number::one()) / first;
    }
    values.try_fold(first, |acc, arg| acc / arg)
}

// every adjacent pair has to satisfy `op`; fewer than two numbers is trivially true
fn compare(args: Value, op: fn(&Number, &Number) -> bool) -> Result<Value, EvalError> {
    let numbers = args.to_vec()?.into_iter().map(Value::into_number).collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Boolean(numbers.windows(2).all(|pair| op(&pair[0], &pair[1]))))
}

fn less(_env: &mut Environment, args: Value) -> Result<Value, EvalError> { compare(args, |a, b| a < b) }

fn greater(_env: &mut Environment, args: Value) -> Result<Value, EvalError> { compare(args, |a, b| a > b) }

fn equal(_env: &mut Environment, args: Value) -> Result<Value, EvalError> { compare(args, |a, b| a == b) }

fn less_equal(_env: &mut Environment, args: Value) -> Result<Value, EvalError> { compare(args, |a, b| a <= b) }

fn greater_equal(_env: &mut Environment, args: Value) -> Result<Value, EvalError> { compare(args, |a, b| a >= b) }

macro_rules! predicate {
    ($fn_name:ident, $name:expr, $pattern:pat) => {
        fn $fn_name(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
            let [value] = args.unpack::<1>($name)?;
            Ok(Value::Boolean(matches!(value, $pattern)))
        }
    };
}

predicate!(is_null, "null?", Value::Empty);
predicate!(is_pair, "pair?", Value::Pair(_));
predicate!(is_number, "number?", Value::Number(_));
predicate!(is_string, "string?", Value::String(_));
predicate!(is_symbol, "symbol?", Value::Symbol(_));
predicate!(is_boolean, "boolean?", Value::Boolean(_));
predicate!(is_procedure, "procedure?", Value::Native(_) | Value::Closure(_));
predicate!(is_port, "port?", Value::Port(_));
predicate!(not, "not", Value::Boolean(false));

fn is_zero(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [value] = args.unpack::<1>("zero?")?;
    Ok(Value::Boolean(matches!(value, Value::Number(ref n) if n.is_zero())))
}

fn is_eq(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [a, b] = args.unpack::<2>("eq?")?;
    Ok(Value::Boolean(a == b))
}

fn cons(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [car, cdr] = args.unpack::<2>("cons")?;
    Ok(Value::cons(car, cdr))
}

fn car(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [pair] = args.unpack::<1>("car")?;
    let car = pair.as_pair()?.borrow().car.clone();
    Ok(car)
}

fn cdr(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [pair] = args.unpack::<1>("cdr")?;
    let cdr = pair.as_pair()?.borrow().cdr.clone();
    Ok(cdr)
}

fn set_car(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [pair, value] = args.unpack::<2>("set-car!")?;
    pair.as_pair()?.borrow_mut().car = value;
    Ok(Value::Absent)
}

fn set_cdr(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [pair, value] = args.unpack::<2>("set-cdr!")?;
    pair.as_pair()?.borrow_mut().cdr = value;
    Ok(Value::Absent)
}

fn list(_env: &mut Environment, args: Value) -> Result<Value, EvalError> { Ok(Value::from_vec(args.to_vec()?)) }

fn length(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [list] = args.unpack::<1>("length")?;
    let mut iter = list.iter();
    let count = iter.by_ref().count();
    match iter.tail() {
        Value::Empty => Ok(Value::Number(count.into())),
        _ => type_error!("`length` expects a proper list, got {}", list),
    }
}

// copies every list but the last, which becomes the shared tail
fn append(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let mut lists = args.to_vec()?;
    let Some(last) = lists.pop() else {
        return Ok(Value::Empty);
    };
    let mut items = Vec::new();
    for list in lists {
        items.extend(list.to_vec()?);
    }
    Ok(cell::from_vec_with_tail(items, last))
}

// optional trailing port argument, defaulting to the current output port
fn output_port(env: &Environment, name: &str, port: Option<&Value>) -> Result<Port, EvalError> {
    match port {
        None => Ok(env.output_port()),
        Some(Value::Port(Port::Stdin)) => type_error!("`{}` needs an output port, got #<port:stdin>", name),
        Some(value) => value.clone().into_port(),
    }
}

/// Strings and characters are written without quoting.
fn display(env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let values = args.to_vec()?;
    let (value, port) = match values.as_slice() {
        [value] => (value, output_port(env, "display", None)?),
        [value, port] => (value, output_port(env, "display", Some(port))?),
        _ => arity_error!("`display` expects 1 or 2 argument(s), got {}", values.len()),
    };
    match value {
        Value::String(s) => port.write_str(s)?,
        Value::Character(c) => port.write_str(c.encode_utf8(&mut [0; 4]))?,
        other => port.write_str(&other.to_string())?,
    }
    Ok(Value::Absent)
}

fn newline(env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let values = args.to_vec()?;
    let port = match values.as_slice() {
        [] => output_port(env, "newline", None)?,
        [port] => output_port(env, "newline", Some(port))?,
        _ => arity_error!("`newline` expects 0 or 1 argument(s), got {}", values.len()),
    };
    port.write_str("\n")?;
    Ok(Value::Absent)
}

/// Reads lines from stdin until one holds a datum, and returns the first datum on it.
fn read_datum(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    match args.to_vec()?.as_slice() {
        [] | [Value::Port(Port::Stdin)] => {}
        [other] => type_error!("`read` needs an input port, got {}", other),
        values => arity_error!("`read` expects 0 or 1 argument(s), got {}", values.len()),
    }
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(Value::Absent);
        }
        if let Some(node) = reader::parse_code(&line)?.first() {
            return Ok(Value::from_node(node));
        }
    }
}

fn current_output_port(env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [] = args.unpack::<0>("current-output-port")?;
    Ok(Value::Port(env.output_port()))
}

fn current_input_port(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [] = args.unpack::<0>("current-input-port")?;
    Ok(Value::Port(Port::Stdin))
}

fn open_output_string(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [] = args.unpack::<0>("open-output-string")?;
    Ok(Value::Port(Port::buffer()))
}

fn get_output_string(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let [port] = args.unpack::<1>("get-output-string")?;
    match port {
        Value::Port(Port::Buffer(buffer)) => Ok(Value::String(buffer.borrow().clone())),
        other => type_error!("`get-output-string` expects a string port, got {}", other),
    }
}

// (map proc list1 list2 ...), stopping at the shortest list
fn map_lists(env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let values = args.to_vec()?;
    let (procedure, lists) = match values.split_first() {
        Some((procedure, lists)) if !lists.is_empty() => (procedure, lists),
        _ => arity_error!("`map` expects a procedure and at least 1 list, got {} argument(s)", values.len()),
    };
    if let Some(other) = lists.iter().find(|list| !matches!(list, Value::Pair(_) | Value::Empty)) {
        type_error!("`map` expects lists, got {}", other);
    }

    let mut iters: Vec<cell::ListIter> = lists.iter().map(Value::iter).collect();
    let mut results = Vec::new();
    loop {
        let mut call_args = Vec::with_capacity(iters.len());
        for iter in iters.iter_mut() {
            match iter.next() {
                Some(value) => call_args.push(value),
                None => return Ok(Value::from_vec(results)),
            }
        }
        results.push(trampoline::apply(env, procedure, Value::from_vec(call_args))?);
    }
}

// (apply proc arg ... list)
fn apply_procedure(env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let values = args.to_vec()?;
    match values.as_slice() {
        [procedure, middle @ .., last] => {
            let mut call_args = middle.to_vec();
            call_args.extend(last.to_vec()?);
            trampoline::apply(env, procedure, Value::from_vec(call_args))
        }
        _ => arity_error!("`apply` expects a procedure and a list, got {} argument(s)", values.len()),
    }
}

fn raise_error(_env: &mut Environment, args: Value) -> Result<Value, EvalError> {
    let parts: Vec<String> = args
        .iter()
        .map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();
    Err(EvalError::User(parts.join(" ")))
}
