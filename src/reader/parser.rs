use serde::Serialize;

use crate::interpreter::error::EvalError;
use crate::interpreter::number::Number;
use crate::reader::lexer::Token;

use crate::syntax_error;

/// Parse tree of one datum. `List(items, tail)` has `Some(tail)` for dotted lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Node {
    Symbol(String),
    Number(Number),
    Boolean(bool),
    Character(char),
    String(String),
    List(Vec<Node>, Option<Box<Node>>),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, EvalError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut nodes = Vec::new();
    while parser.peek().is_some() {
        nodes.push(parser.parse_node()?);
    }
    Ok(nodes)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> { self.tokens.get(self.pos) }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn parse_node(&mut self) -> Result<Node, EvalError> {
        let node = match self.next() {
            None => syntax_error!("Unexpected end of input"),
            Some(Token::LParen) => return self.parse_list(),
            Some(Token::RParen) => syntax_error!("Unbalanced parentheses: unexpected `)`"),
            Some(Token::Dot) => syntax_error!("Misplaced dot"),
            Some(Token::Quote) => {
                if matches!(self.peek(), None | Some(Token::RParen)) {
                    syntax_error!("Dangling quote");
                }
                // 'x => (quote x)
                let quoted = self.parse_node()?;
                Node::List(vec![Node::Symbol("quote".to_string()), quoted], None)
            }
            Some(Token::Str(s)) => Node::String(s.clone()),
            Some(Token::Number(n)) => Node::Number(n.clone()),
            Some(Token::Boolean(b)) => Node::Boolean(*b),
            Some(Token::Character(c)) => Node::Character(*c),
            Some(Token::Symbol(s)) => Node::Symbol(s.clone()),
        };
        Ok(node)
    }

    // the opening paren is already consumed
    fn parse_list(&mut self) -> Result<Node, EvalError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => syntax_error!("Unbalanced parentheses: missing `)`"),
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(Node::List(items, None));
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    if items.is_empty() || matches!(self.peek(), None | Some(Token::RParen)) {
                        syntax_error!("Misplaced dot");
                    }
                    let tail = self.parse_node()?;
                    return match self.next() {
                        Some(Token::RParen) => Ok(Node::List(items, Some(Box::new(tail)))),
                        None => syntax_error!("Unbalanced parentheses: missing `)`"),
                        Some(_) => syntax_error!("Misplaced dot: more than one datum after `.`"),
                    };
                }
                Some(_) => items.push(self.parse_node()?),
            }
        }
    }
}
