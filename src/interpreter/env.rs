use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::interpreter::builtin;
use crate::interpreter::error::EvalError;
use crate::interpreter::procedure::Closure;
use crate::interpreter::special;
use crate::interpreter::value::{Port, Value};

pub type Bindings = HashMap<String, Value>;

struct Frame {
    /// Bindings a closure captured at creation time, shared between every
    /// frame the closure pushes.
    captured: Option<Rc<Bindings>>,
    locals: Bindings,
    /// The closure whose application pushed this frame.
    owner: Option<Rc<Closure>>,
}

impl Frame {
    fn new(captured: Option<Rc<Bindings>>, locals: Bindings, owner: Option<Rc<Closure>>) -> Frame { Frame { captured, locals, owner } }

    fn get(&self, key: &str) -> Option<&Value> {
        match self.locals.get(key) {
            Some(val) => Some(val),
            None => self.captured.as_ref().and_then(|captured| captured.get(key)),
        }
    }

    fn is_owned_by(&self, closure: &Rc<Closure>) -> bool { self.owner.as_ref().is_some_and(|owner| Rc::ptr_eq(owner, closure)) }
}

/// A stack of variable frames, innermost last. Frame 0 is the root frame
/// holding the builtins and top-level definitions; it is never popped.
pub struct Environment {
    frames: Vec<Frame>,
    output: Port,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "<Env depth={}>", self.frames.len()) }
}

impl Default for Environment {
    fn default() -> Self { Environment::new() }
}

impl Environment {
    /// An environment with a single, empty root frame.
    pub fn new() -> Environment {
        Environment {
            frames: vec![Frame::new(None, Bindings::new(), None)],
            output: Port::Stdout,
        }
    }

    /// A root environment with every special form and builtin procedure defined.
    pub fn new_root() -> Environment {
        let mut env = Environment::new();
        special::register(&mut env);
        builtin::register(&mut env);
        env
    }

    /// Searches frames innermost to outermost.
    pub fn get(&self, key: &str) -> Option<Value> { self.frames.iter().rev().find_map(|frame| frame.get(key)).cloned() }

    pub fn resolve(&self, key: &str) -> Result<Value, EvalError> {
        self.get(key).ok_or_else(|| EvalError::UnboundSymbol(key.to_string()))
    }

    /// Binds `key` in the innermost frame only, replacing any previous binding there.
    pub fn define(&mut self, key: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.insert(key.into(), value);
        }
    }

    pub fn extend(&mut self, bindings: Bindings) { self.frames.push(Frame::new(None, bindings, None)); }

    pub fn unextend(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Flattens every visible frame into one mapping, inner bindings winning.
    pub fn snapshot(&self) -> Rc<Bindings> {
        let mut flat = Bindings::new();
        for frame in &self.frames {
            if let Some(ref captured) = frame.captured {
                flat.extend(captured.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            flat.extend(frame.locals.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Rc::new(flat)
    }

    pub fn depth(&self) -> usize { self.frames.len() }

    /// Pops frames until `depth` remain (never the root frame).
    pub fn truncate(&mut self, depth: usize) { self.frames.truncate(depth.max(1)); }

    /// Makes a frame owned by `closure` the innermost one.
    ///
    /// A frame above `base` that `closure` already owns is reused, dropping the
    /// frames pushed after it; this keeps self and mutual tail recursion at a
    /// constant depth. Otherwise a fresh frame seeded from the closure's
    /// snapshot is pushed.
    pub fn enter_closure(&mut self, closure: &Rc<Closure>, base: usize) {
        let owned = (base.max(1)..self.frames.len()).rev().find(|&i| self.frames[i].is_owned_by(closure));
        match owned {
            Some(index) => {
                trace!("reuse frame {} (depth {})", index, self.frames.len());
                self.frames.truncate(index + 1);
            }
            None => {
                let mut locals = Bindings::new();
                if let Some(ref name) = closure.name {
                    locals.insert(name.clone(), Value::Closure(closure.clone()));
                }
                self.frames.push(Frame::new(Some(closure.captured.clone()), locals, Some(closure.clone())));
                trace!("push frame (depth {})", self.frames.len());
            }
        }
    }

    pub fn output_port(&self) -> Port { self.output.clone() }

    pub fn set_output_port(&mut self, port: Port) { self.output = port; }

    /// Redirects `display`/`newline` into a string buffer and returns it.
    pub fn capture_output(&mut self) -> Rc<RefCell<String>> {
        let buffer = Rc::new(RefCell::new(String::new()));
        self.output = Port::Buffer(buffer.clone());
        buffer
    }
}
