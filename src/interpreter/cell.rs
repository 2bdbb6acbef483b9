use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::interpreter::error::EvalError;
use crate::interpreter::value::Value;

use crate::type_error;

pub type CellRef = Rc<RefCell<Cell>>;

/// A mutable pair. Every list, argument list and code body is a chain of these.
///
/// Cells are shared: several `Value::Pair`s may hold the same cell, and
/// `set-car!`/`set-cdr!` are visible through all of them.
pub struct Cell {
    pub car: Value,
    pub cdr: Value,
}

impl Cell {
    pub fn new(car: Value, cdr: Value) -> CellRef { Rc::new(RefCell::new(Cell { car, cdr })) }
}

// Cells are unlinked through a worklist, otherwise dropping a long list (or
// one nested deeply through its cars) recurses once per cell.
impl Drop for Cell {
    fn drop(&mut self) {
        if !matches!(self.car, Value::Pair(_)) && !matches!(self.cdr, Value::Pair(_)) {
            return;
        }
        let mut pending = vec![mem::replace(&mut self.car, Value::Empty), mem::replace(&mut self.cdr, Value::Empty)];
        while let Some(value) = pending.pop() {
            let Value::Pair(cell) = value else { continue };
            // 共享的 cell 留给其他持有者
            if let Ok(cell) = Rc::try_unwrap(cell) {
                let mut cell = cell.into_inner();
                pending.push(mem::replace(&mut cell.car, Value::Empty));
                pending.push(mem::replace(&mut cell.cdr, Value::Empty));
            }
        }
    }
}

/// (car cdr) of a pair, cloned out of the cell.
pub fn split(cell: &CellRef) -> (Value, Value) {
    let cell = cell.borrow();
    (cell.car.clone(), cell.cdr.clone())
}

/// Builds `(v1 v2 ... . tail)`.
pub fn from_vec_with_tail(values: Vec<Value>, tail: Value) -> Value {
    values.into_iter().rfold(tail, |acc, val| Value::Pair(Cell::new(val, acc)))
}

pub fn from_vec(values: Vec<Value>) -> Value { from_vec_with_tail(values, Value::Empty) }

/// Walks the cars of a chain. Stops at the first non-pair cdr, which is kept
/// as the `tail` (empty-list for proper lists).
pub struct ListIter {
    current: Value,
}

impl ListIter {
    pub fn new(list: &Value) -> ListIter { ListIter { current: list.clone() } }

    /// Whatever is left once iteration stopped: `()`, a dotted tail, or the
    /// unvisited rest of the list.
    pub fn tail(&self) -> &Value { &self.current }
}

impl Iterator for ListIter {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let (car, cdr) = match self.current {
            Value::Pair(ref cell) => split(cell),
            _ => return None,
        };
        self.current = cdr;
        Some(car)
    }
}

/// Collects a proper list; an improper tail is an error.
pub fn to_vec(list: &Value) -> Result<Vec<Value>, EvalError> {
    let mut iter = ListIter::new(list);
    let values: Vec<Value> = iter.by_ref().collect();
    match iter.tail() {
        Value::Empty => Ok(values),
        tail => type_error!("Expected a proper list, but it ends in {}", tail),
    }
}
