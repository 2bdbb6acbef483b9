use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::interpreter::cell::{self, Cell, CellRef, ListIter};
use crate::interpreter::error::EvalError;
use crate::interpreter::number::Number;
use crate::interpreter::procedure::{Closure, Native};
use crate::interpreter::special::SpecialForm;
use crate::reader::parser::Node;

use crate::{arity_error, type_error};

#[derive(Clone)]
pub enum Value {
    /// No value at all, e.g. the result of `define`. Not the empty list.
    Absent,
    Empty,
    Pair(CellRef),
    Number(Number),
    Character(char),
    Boolean(bool),
    String(String),
    Symbol(String),

    Native(Native),
    Special(SpecialForm),
    Closure(Rc<Closure>),

    Port(Port),
}

#[derive(Clone)]
pub enum Port {
    Stdin,
    Stdout,
    /// In-memory output port, readable by whoever holds the other end.
    Buffer(Rc<RefCell<String>>),
}

impl Port {
    pub fn buffer() -> Port { Port::Buffer(Rc::new(RefCell::new(String::new()))) }

    pub fn kind(&self) -> &'static str {
        match self {
            Port::Stdin => "stdin",
            Port::Stdout => "stdout",
            Port::Buffer(_) => "string",
        }
    }

    pub fn write_str(&self, text: &str) -> Result<(), EvalError> {
        match self {
            Port::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()?;
                Ok(())
            }
            Port::Buffer(buffer) => {
                buffer.borrow_mut().push_str(text);
                Ok(())
            }
            Port::Stdin => type_error!("Cannot write to an input port"),
        }
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Port) -> bool {
        match (self, other) {
            (Port::Stdin, Port::Stdin) | (Port::Stdout, Port::Stdout) => true,
            (Port::Buffer(a), Port::Buffer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn cons(car: Value, cdr: Value) -> Value { Value::Pair(Cell::new(car, cdr)) }

    pub fn symbol(name: &str) -> Value { Value::Symbol(name.to_string()) }

    pub fn from_vec(values: Vec<Value>) -> Value { cell::from_vec(values) }

    pub fn from_node(node: &Node) -> Value {
        match *node {
            Node::Symbol(ref name) => Value::Symbol(name.clone()),
            Node::Number(ref n) => Value::Number(n.clone()),
            Node::Boolean(b) => Value::Boolean(b),
            Node::Character(c) => Value::Character(c),
            Node::String(ref s) => Value::String(s.clone()),
            Node::List(ref items, ref tail) => {
                let tail = match tail {
                    Some(node) => Value::from_node(node),
                    None => Value::Empty,
                };
                cell::from_vec_with_tail(items.iter().map(Value::from_node).collect(), tail)
            }
        }
    }

    /// Everything except `#f` counts as true.
    pub fn is_true(&self) -> bool { !matches!(self, Value::Boolean(false)) }

    pub fn is_absent(&self) -> bool { matches!(self, Value::Absent) }

    pub fn iter(&self) -> ListIter { ListIter::new(self) }

    pub fn to_vec(&self) -> Result<Vec<Value>, EvalError> { cell::to_vec(self) }

    pub fn as_symbol(&self) -> Result<&str, EvalError> {
        match self {
            Value::Symbol(s) => Ok(s),
            _ => type_error!("Expected a symbol, got {}", self),
        }
    }

    pub fn into_number(self) -> Result<Number, EvalError> {
        match self {
            Value::Number(n) => Ok(n),
            _ => type_error!("Expected a number, got {}", self),
        }
    }

    pub fn as_pair(&self) -> Result<&CellRef, EvalError> {
        match self {
            Value::Pair(cell) => Ok(cell),
            _ => type_error!("Expected a pair, got {}", self),
        }
    }

    pub fn into_port(self) -> Result<Port, EvalError> {
        match self {
            Value::Port(port) => Ok(port),
            _ => type_error!("Expected a port, got {}", self),
        }
    }

    /// Proper list of exactly `N` elements, for fixed-arity natives.
    pub fn unpack<const N: usize>(&self, name: &str) -> Result<[Value; N], EvalError> {
        let values = self.to_vec()?;
        let count = values.len();
        match values.try_into() {
            Ok(array) => Ok(array),
            Err(_) => arity_error!("`{}` expects {} argument(s), got {}", name, N, count),
        }
    }
}

impl std::ops::Add for Value {
    type Output = Result<Value, EvalError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (a, b) => type_error!("Cannot `+` {} and {}", a, b),
        }
    }
}

impl std::ops::Sub for Value {
    type Output = Result<Value, EvalError>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (a, b) => type_error!("Cannot `-` {} and {}", a, b),
        }
    }
}

impl std::ops::Mul for Value {
    type Output = Result<Value, EvalError>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (a, b) => type_error!("Cannot `*` {} and {}", a, b),
        }
    }
}

impl std::ops::Div for Value {
    type Output = Result<Value, EvalError>;

    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => match a.checked_div(&b) {
                Some(n) => Ok(Value::Number(n)),
                None => Err(EvalError::DivisionByZero(format!("(/ {} {})", a, b))),
            },
            (a, b) => type_error!("Cannot `/` {} and {}", a, b),
        }
    }
}

impl std::ops::Neg for Value {
    type Output = Result<Value, EvalError>;

    fn neg(self) -> Self::Output {
        match self {
            Value::Number(a) => Ok(Value::Number(-a)),
            x => type_error!("Cannot `-` {}", x),
        }
    }
}

/// Same rules as `eq?`: pairs and closures by identity, procedures and forms
/// by name, atoms by value.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) | (Value::Empty, Value::Empty) => true,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Special(a), Value::Special(b)) => a.name() == b.name(),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Port(a), Value::Port(b)) => a == b,
            _ => false,
        }
    }
}

fn write_character(f: &mut fmt::Formatter, c: char) -> fmt::Result {
    match c {
        ' ' => write!(f, "#\\space"),
        '\n' => write!(f, "#\\newline"),
        '\t' => write!(f, "#\\tab"),
        _ => write!(f, "#\\{}", c),
    }
}

enum Pending {
    Value(Value),
    // the car of this cell is written, the cdr is next
    Rest(CellRef),
    // the list opened when `open` had this many cells ends here
    Close(usize),
}

/// Cells of the lists currently being printed. A pair that is already open
/// prints as `...`, so cycles through either car or cdr terminate.
#[derive(Default)]
struct OpenCells {
    order: Vec<*const RefCell<Cell>>,
    set: HashSet<*const RefCell<Cell>>,
}

impl OpenCells {
    fn contains(&self, cell: &CellRef) -> bool { self.set.contains(&Rc::as_ptr(cell)) }

    fn open(&mut self, cell: &CellRef) {
        self.order.push(Rc::as_ptr(cell));
        self.set.insert(Rc::as_ptr(cell));
    }

    fn close(&mut self, start: usize) {
        for ptr in self.order.drain(start..) {
            self.set.remove(&ptr);
        }
    }
}

fn write_atom(value: &Value, f: &mut fmt::Formatter) -> fmt::Result {
    match value {
        Value::Absent => Ok(()),
        Value::Empty => write!(f, "()"),
        Value::Pair(_) => write!(f, "#<pair>"),
        Value::Number(n) => write!(f, "{}", n),
        Value::Character(c) => write_character(f, *c),
        Value::Boolean(b) => write!(f, "#{}", if *b { "t" } else { "f" }),
        Value::String(s) => write!(f, "\"{}\"", s),
        Value::Symbol(s) => write!(f, "{}", s),
        Value::Native(native) => write!(f, "#<procedure:{}>", native.name),
        Value::Special(form) => write!(f, "#<special:{}>", form.name()),
        Value::Closure(closure) => match closure.name {
            Some(ref name) => write!(f, "#<closure:{}>", name),
            None => write!(f, "#<closure>"),
        },
        Value::Port(port) => write!(f, "#<port:{}>", port.kind()),
    }
}

// Lists are written from an explicit stack, nesting depth costs no host stack.
fn write_display(value: &Value, f: &mut fmt::Formatter) -> fmt::Result {
    let mut open = OpenCells::default();
    let mut stack = vec![Pending::Value(value.clone())];
    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Value(Value::Pair(cell)) => {
                if open.contains(&cell) {
                    write!(f, "...")?;
                    continue;
                }
                write!(f, "(")?;
                stack.push(Pending::Close(open.order.len()));
                open.open(&cell);
                let car = cell.borrow().car.clone();
                stack.push(Pending::Rest(cell));
                stack.push(Pending::Value(car));
            }
            Pending::Value(atom) => write_atom(&atom, f)?,
            Pending::Rest(cell) => {
                let cdr = cell.borrow().cdr.clone();
                match cdr {
                    Value::Empty => {}
                    Value::Pair(next) if open.contains(&next) => write!(f, " ...")?,
                    Value::Pair(next) => {
                        write!(f, " ")?;
                        open.open(&next);
                        let car = next.borrow().car.clone();
                        stack.push(Pending::Rest(next));
                        stack.push(Pending::Value(car));
                    }
                    tail => {
                        write!(f, " . ")?;
                        stack.push(Pending::Value(tail));
                    }
                }
            }
            Pending::Close(start) => {
                open.close(start);
                write!(f, ")")?;
            }
        }
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write_display(self, f) }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Absent => write!(f, "#<undefined>"),
            Value::Empty => write!(f, "#<nil>"),
            Value::Pair(_) => write!(f, "#<pair: {}>", self),
            Value::Number(ref n) => write!(f, "#<number: {}>", n),
            Value::Character(c) => write!(f, "#<character: {:?}>", c),
            Value::Boolean(b) => write!(f, "#<boolean: {}>", b),
            Value::String(ref s) => write!(f, "#<string: {:?}>", s),
            Value::Symbol(ref s) => write!(f, "#<symbol: {}>", s),
            Value::Native(ref native) => write!(f, "#<procedure: {}>", native.name),
            Value::Special(ref form) => write!(f, "#<special: {}>", form.name()),
            Value::Closure(ref closure) => write!(f, "#<closure: {} {}>", closure.formals, Value::Pair(closure.body.clone())),
            Value::Port(ref port) => write!(f, "#<port: {}>", port.kind()),
        }
    }
}
