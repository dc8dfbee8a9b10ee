//! エラー報告用の引数パスと呼び出し元

use std::fmt;

/// 部分値の位置を表す引数パス
///
/// 表示は `x`、`..2`、`x$col`、`x[[3]]` のようになる。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Arg {
    #[default]
    Empty,
    /// 名前付きの引数
    Name(String),
    /// 位置引数（0始まり、表示は `..1` から）
    Position(usize),
    /// レコードの列
    Field(Box<Arg>, String),
    /// リストの要素（0始まり、表示は `[[1]]` から）
    Element(Box<Arg>, usize),
}

impl Arg {
    pub fn name(name: impl Into<String>) -> Self {
        Arg::Name(name.into())
    }

    pub fn position(index: usize) -> Self {
        Arg::Position(index)
    }

    pub fn field(&self, name: &str) -> Self {
        Arg::Field(Box::new(self.clone()), name.to_string())
    }

    pub fn element(&self, index: usize) -> Self {
        Arg::Element(Box::new(self.clone()), index)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Arg::Empty)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Empty => Ok(()),
            Arg::Name(name) => write!(f, "{}", name),
            Arg::Position(index) => write!(f, "..{}", index + 1),
            Arg::Field(parent, name) if parent.is_empty() => write!(f, "{}", name),
            Arg::Field(parent, name) => write!(f, "{}${}", parent, name),
            Arg::Element(parent, index) => write!(f, "{}[[{}]]", parent, index + 1),
        }
    }
}

/// エラーメッセージに表示する呼び出し元
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallSite(Option<String>);

impl CallSite {
    pub fn new(function: &str) -> Self {
        Self(Some(function.to_string()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(function) => write!(f, "{}()", function),
            None => Ok(()),
        }
    }
}
