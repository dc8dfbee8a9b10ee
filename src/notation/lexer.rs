//! レキサーのメイン実装

use logos::{Lexer as LogosLexer, Logos};

use super::token::Token;
use super::Span;
use crate::error::NotationError;

/// 位置情報付きトークン
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPosition {
    pub token: Token,
    pub span: Span,
}

/// 値の記法のレキサー
pub struct Lexer<'a> {
    inner: LogosLexer<'a, Token>,
}

impl<'a> Lexer<'a> {
    /// 新しいレキサーを作成
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: Token::lexer(input),
        }
    }

    /// 次のトークンを取得（認識できない入力はエラーとして返す）
    pub fn next_token(&mut self) -> Option<Result<TokenWithPosition, NotationError>> {
        let token = self.inner.next()?;
        let span = Span::from(self.inner.span());

        Some(match token {
            Ok(token) => Ok(TokenWithPosition { token, span }),
            Err(()) => Err(NotationError::UnrecognizedToken {
                token: self.inner.slice().to_string(),
                span,
            }),
        })
    }

    /// すべてのトークンとエラーを収集
    pub fn tokenize(mut self) -> (Vec<TokenWithPosition>, Vec<NotationError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        while let Some(result) = self.next_token() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => errors.push(error),
            }
        }
        (tokens, errors)
    }

    /// すべてのトークンを収集（エラートークンは読み飛ばす）
    pub fn collect_tokens(self) -> Vec<TokenWithPosition> {
        self.tokenize().0
    }
}
