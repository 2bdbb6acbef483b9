use std::iter::Peekable;
use std::str::Chars;

use crate::interpreter::error::EvalError;
use crate::interpreter::number::Number;

use crate::syntax_error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Quote,
    Dot,
    Str(String),
    Number(Number),
    Boolean(bool),
    Character(char),
    Symbol(String),
}

/// The text stops inside a string literal, so more input can still make it
/// tokenize. Any other tokenize error stays an error however much follows.
pub fn ends_inside_string(src: &str) -> bool { tokenize(src).is_err() && tokenize(&format!("{}\"", src)).is_ok() }

fn is_delimiter(c: char) -> bool { c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '"' | ';') }

pub fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let mut chars = src.chars().peekable();
    let mut tokens = Vec::new();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                // 注释直到行尾
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' => {
                chars.next();
                tokens.push(Token::Quote);
            }
            '"' => {
                chars.next();
                tokens.push(read_string(&mut chars)?);
            }
            _ => tokens.push(classify(&read_atom(&mut chars))?),
        }
    }
    Ok(tokens)
}

// contents are taken as they are, there are no escapes
fn read_string(chars: &mut Peekable<Chars>) -> Result<Token, EvalError> {
    let mut text = String::new();
    for c in chars.by_ref() {
        if c == '"' {
            return Ok(Token::Str(text));
        }
        text.push(c);
    }
    syntax_error!("Unterminated string: \"{}", text)
}

fn read_atom(chars: &mut Peekable<Chars>) -> String {
    let mut text = String::new();
    while let Some(&c) = chars.peek() {
        // the char right after `#\` is taken even if it is a delimiter: #\( #\space
        if is_delimiter(c) && text != "#\\" {
            break;
        }
        text.push(c);
        chars.next();
    }
    text
}

fn classify(text: &str) -> Result<Token, EvalError> {
    if text == "." {
        return Ok(Token::Dot);
    }
    if let Some(name) = text.strip_prefix("#\\") {
        return character(name).map(Token::Character);
    }
    if text.starts_with('#') {
        return match text {
            "#t" | "#true" => Ok(Token::Boolean(true)),
            "#f" | "#false" => Ok(Token::Boolean(false)),
            _ => syntax_error!("Unknown # literal: {}", text),
        };
    }
    match Number::parse(text) {
        Some(n) => Ok(Token::Number(n)),
        None => Ok(Token::Symbol(text.to_string())),
    }
}

fn character(name: &str) -> Result<char, EvalError> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => match name {
            "space" => Ok(' '),
            "newline" => Ok('\n'),
            "tab" => Ok('\t'),
            _ => syntax_error!("Unknown character: #\\{}", name),
        },
    }
}
