//! 値の記法
//!
//! `name = ctor(...)` の束縛を並べたテキストから [`Value`](crate::value::Value) を組み立てる。
//!
//! ```text
//! a = int(1, NA)
//! b = df(x = dbl(1.5), y = factor("lo", "hi"))
//! c = datetime(0, tz = "UTC")  # コメント
//! ```

mod lexer;
mod parser;
mod token;

pub use lexer::{Lexer, TokenWithPosition};
pub use parser::{Binding, Document, ParseResult, Parser};
pub use token::{unescape_string, Token};

use serde::{Deserialize, Serialize};

use crate::error::NotationError;

/// ソース上の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

/// テキストを解析する（字句エラーがあれば最初のものを返す）
pub fn parse_str(source: &str) -> ParseResult<Document> {
    let (tokens, errors) = Lexer::new(source).tokenize();
    if let Some(error) = errors.into_iter().next() {
        return Err(error);
    }
    Parser::new(tokens).parse()
}

/// 字句エラーと構文エラーをすべて集めて解析する
pub fn parse_document(source: &str) -> Result<Document, Vec<NotationError>> {
    let (tokens, mut errors) = Lexer::new(source).tokenize();
    match Parser::new(tokens).parse() {
        Ok(document) if errors.is_empty() => Ok(document),
        Ok(_) => Err(errors),
        Err(error) => {
            errors.push(error);
            Err(errors)
        }
    }
}
