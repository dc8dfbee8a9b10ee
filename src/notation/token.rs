//! トークン定義

use logos::Logos;
use std::fmt;

/// 値の記法のトークン型
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"([ \t\f\r\n]+|#[^\n]*)")] // 空白文字とコメントをスキップ
pub enum Token {
    // キーワード
    #[token("NULL")]
    Null,
    #[token("NA")]
    Na,
    #[token("TRUE")]
    True,
    #[token("FALSE")]
    False,

    // 識別子（キーワードの後に来る必要がある）
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.]*", |lex| lex.slice().to_owned(), priority = 1)]
    Identifier(String),

    // 数値リテラル
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // 文字列リテラル
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    String(String),

    // 区切り文字
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(",")]
    Comma,
    #[token("=")]
    Assign,
    #[token(";")]
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Null => write!(f, "NULL"),
            Token::Na => write!(f, "NA"),
            Token::True => write!(f, "TRUE"),
            Token::False => write!(f, "FALSE"),
            Token::Identifier(name) => write!(f, "識別子 '{}'", name),
            Token::Integer(n) => write!(f, "整数 {}", n),
            Token::Float(n) => write!(f, "数値 {}", n),
            Token::String(s) => write!(f, "文字列 \"{}\"", s),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Assign => write!(f, "'='"),
            Token::Semicolon => write!(f, "';'"),
        }
    }
}

/// 文字列のエスケープシーケンスを処理
pub fn unescape_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                // 未知のエスケープはそのまま残す
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
