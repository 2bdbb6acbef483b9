pub mod lexer;
pub mod parser;

use crate::interpreter::error::EvalError;

/// Source text to parse tree, one node per top-level form.
pub fn parse_code(src: &str) -> Result<Vec<parser::Node>, EvalError> {
    let tokens = lexer::tokenize(src)?;
    parser::parse(&tokens)
}
