//! 値の記法のパーサー
//!
//! 再帰下降構文解析で束縛の列を読み、各束縛の値を [`Value`] として組み立てる。
//! 束縛とその中の列・要素のパス（`b$x`、`l[[1]]`）ごとにスパンを記録する。

use indexmap::IndexMap;

use super::lexer::TokenWithPosition;
use super::token::Token;
use super::Span;
use crate::error::NotationError;
use crate::ptype::Arg;
use crate::value::Value;

pub type ParseResult<T> = Result<T, NotationError>;

/// 名前付きの値
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
    pub span: Span,
}

/// 解析結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub bindings: Vec<Binding>,
    spans: IndexMap<String, Span>,
}

impl Document {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == name)
    }

    /// 束縛名を引数パスとした入力の一覧
    pub fn inputs(&self) -> Vec<(Arg, &Value)> {
        self.bindings
            .iter()
            .map(|binding| (Arg::name(binding.name.as_str()), &binding.value))
            .collect()
    }

    /// 引数パスに対応するスパン
    ///
    /// パスそのものが記録されていなければ、末尾の `$name`・`[[i]]` を
    /// 取り除いた親のパスを順に探す。
    pub fn span_of(&self, path: &str) -> Option<Span> {
        let mut path = path;
        loop {
            if let Some(span) = self.spans.get(path) {
                return Some(*span);
            }
            let cut = [path.rfind('$'), path.rfind("[[")]
                .into_iter()
                .flatten()
                .max()?;
            path = &path[..cut];
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Na,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Literal(Literal),
    Value(Value),
}

#[derive(Debug, Clone)]
struct ArgItem {
    name: Option<String>,
    item: Item,
    span: Span,
}

/// 値の記法のパーサー
pub struct Parser {
    tokens: Vec<TokenWithPosition>,
    current: usize,
    spans: IndexMap<String, Span>,
}

impl Parser {
    pub fn new(tokens: Vec<TokenWithPosition>) -> Self {
        Self {
            tokens,
            current: 0,
            spans: IndexMap::new(),
        }
    }

    /// 束縛の列を解析
    pub fn parse(&mut self) -> ParseResult<Document> {
        let mut bindings: Vec<Binding> = Vec::new();
        while !self.is_at_end() {
            let binding = self.parse_binding()?;
            if bindings.iter().any(|b| b.name == binding.name) {
                return Err(NotationError::DuplicateBinding {
                    name: binding.name,
                    span: binding.span,
                });
            }
            bindings.push(binding);
            self.match_token(&Token::Semicolon);
        }

        Ok(Document {
            bindings,
            spans: std::mem::take(&mut self.spans),
        })
    }

    fn parse_binding(&mut self) -> ParseResult<Binding> {
        let start = self.current_span().start;
        let name = self.expect_identifier()?;
        self.expect(Token::Assign)?;
        let value = self.parse_expr(&name)?;
        let span = self.span_from(start);
        self.spans.insert(name.clone(), span);
        Ok(Binding { name, value, span })
    }

    fn parse_expr(&mut self, path: &str) -> ParseResult<Value> {
        if self.match_token(&Token::Null) {
            return Ok(Value::null());
        }

        let start = self.current_span().start;
        let name_span = self.current_span();
        let ctor = self.expect_identifier()?;
        self.expect(Token::LeftParen)?;
        let args = self.parse_args(&ctor, path)?;
        self.expect(Token::RightParen)?;

        build(&ctor, args, path, name_span, self.span_from(start))
    }

    fn parse_args(&mut self, ctor: &str, path: &str) -> ParseResult<Vec<ArgItem>> {
        let mut args = Vec::new();
        if self.check(&Token::RightParen) {
            return Ok(args);
        }

        loop {
            let start = self.current_span().start;
            let name = match (self.current_token(), self.peek(1)) {
                (Some(Token::Identifier(name)), Some(Token::Assign)) => {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    Some(name)
                }
                _ => None,
            };

            let child = child_path(ctor, path, name.as_deref(), args.len());
            let item = self.parse_item(child.as_deref().unwrap_or(path))?;
            let span = self.span_from(start);
            if let (Item::Value(_), Some(child)) = (&item, child) {
                self.spans.insert(child, span);
            }
            args.push(ArgItem { name, item, span });

            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_item(&mut self, path: &str) -> ParseResult<Item> {
        let literal = match self.current_token() {
            Some(Token::Na) => Literal::Na,
            Some(Token::True) => Literal::Bool(true),
            Some(Token::False) => Literal::Bool(false),
            Some(Token::Integer(n)) => Literal::Int(*n),
            Some(Token::Float(x)) => Literal::Float(*x),
            Some(Token::String(s)) => Literal::Str(s.clone()),
            Some(Token::Null) | Some(Token::Identifier(_)) => {
                return Ok(Item::Value(self.parse_expr(path)?));
            }
            Some(other) => {
                return Err(NotationError::UnexpectedToken {
                    expected: "値".to_string(),
                    found: other.to_string(),
                    span: self.current_span(),
                })
            }
            None => {
                return Err(NotationError::UnexpectedEof {
                    expected: "値".to_string(),
                    span: self.current_span(),
                })
            }
        };
        self.advance();
        Ok(Item::Literal(literal))
    }

    // ==================== ユーティリティメソッド ====================

    /// 現在のトークンを取得
    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|t| &t.token)
    }

    /// 特定のオフセット先のトークンを取得
    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset).map(|t| &t.token)
    }

    /// 現在のスパンを取得（終端では入力の末尾）
    fn current_span(&self) -> Span {
        match self.tokens.get(self.current) {
            Some(token) => token.span,
            None => {
                let end = self.tokens.last().map(|t| t.span.end).unwrap_or(0);
                Span::new(end, end)
            }
        }
    }

    /// 開始位置から直前のトークンの終了位置までのスパンを作成
    fn span_from(&self, start: usize) -> Span {
        let end = if self.current > 0 {
            self.tokens
                .get(self.current - 1)
                .map(|t| t.span.end)
                .unwrap_or(start)
        } else {
            start
        };
        Span::new(start, end)
    }

    /// 次のトークンに進む
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    /// 終端に到達したかチェック
    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    /// 特定のトークンをチェック（進まない）
    fn check(&self, token_type: &Token) -> bool {
        self.current_token()
            .map(|token| std::mem::discriminant(token) == std::mem::discriminant(token_type))
            .unwrap_or(false)
    }

    /// 特定のトークンにマッチしたら進む
    fn match_token(&mut self, token_type: &Token) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// 特定のトークンを期待
    fn expect(&mut self, token_type: Token) -> ParseResult<()> {
        if self.match_token(&token_type) {
            return Ok(());
        }
        Err(self.unexpected(token_type.to_string()))
    }

    /// 識別子を期待
    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.current_token() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("識別子".to_string())),
        }
    }

    fn unexpected(&self, expected: String) -> NotationError {
        let span = self.current_span();
        match self.current_token() {
            Some(found) => NotationError::UnexpectedToken {
                expected,
                found: found.to_string(),
                span,
            },
            None => NotationError::UnexpectedEof { expected, span },
        }
    }
}

/// 入れ子の値のパス（列と要素だけを記録する）
fn child_path(ctor: &str, path: &str, name: Option<&str>, index: usize) -> Option<String> {
    match (ctor, name) {
        ("df" | "tibble", Some(name)) => Some(format!("{}${}", path, name)),
        ("list", None) => Some(format!("{}[[{}]]", path, index + 1)),
        _ => None,
    }
}

fn invalid(ctor: &str, expected: &str, span: Span) -> NotationError {
    NotationError::InvalidLiteral {
        message: format!("{}() には{}を指定してください", ctor, expected),
        span,
    }
}

/// 名前なしのリテラル引数だけを取り出す
fn literals(ctor: &str, args: Vec<ArgItem>) -> ParseResult<Vec<(Literal, Span)>> {
    args.into_iter()
        .map(|arg| match (arg.name, arg.item) {
            (None, Item::Literal(literal)) => Ok((literal, arg.span)),
            _ => Err(invalid(ctor, "名前なしのリテラル", arg.span)),
        })
        .collect()
}

fn to_double(ctor: &str, literal: Literal, span: Span) -> ParseResult<Option<f64>> {
    match literal {
        Literal::Na => Ok(None),
        Literal::Int(n) => Ok(Some(n as f64)),
        Literal::Float(x) => Ok(Some(x)),
        _ => Err(invalid(ctor, "数値または NA", span)),
    }
}

fn build(ctor: &str, args: Vec<ArgItem>, path: &str, name_span: Span, span: Span) -> ParseResult<Value> {
    match ctor {
        "lgl" => Ok(Value::logical(
            literals(ctor, args)?
                .into_iter()
                .map(|(literal, span)| match literal {
                    Literal::Na => Ok(None),
                    Literal::Bool(b) => Ok(Some(b)),
                    _ => Err(invalid(ctor, "TRUE・FALSE または NA", span)),
                })
                .collect::<ParseResult<_>>()?,
        )),
        "int" => Ok(Value::integer(
            literals(ctor, args)?
                .into_iter()
                .map(|(literal, span)| match literal {
                    Literal::Na => Ok(None),
                    Literal::Int(n) => i32::try_from(n)
                        .map(Some)
                        .map_err(|_| invalid(ctor, "32ビット整数の範囲の値", span)),
                    _ => Err(invalid(ctor, "整数または NA", span)),
                })
                .collect::<ParseResult<_>>()?,
        )),
        "dbl" | "date" => {
            let values = literals(ctor, args)?
                .into_iter()
                .map(|(literal, span)| to_double(ctor, literal, span))
                .collect::<ParseResult<_>>()?;
            Ok(if ctor == "date" {
                Value::date(values)
            } else {
                Value::double(values)
            })
        }
        "chr" | "factor" => {
            let values: Vec<Option<String>> = literals(ctor, args)?
                .into_iter()
                .map(|(literal, span)| match literal {
                    Literal::Na => Ok(None),
                    Literal::Str(s) => Ok(Some(s)),
                    _ => Err(invalid(ctor, "文字列または NA", span)),
                })
                .collect::<ParseResult<_>>()?;
            if ctor == "chr" {
                return Ok(Value::character(values));
            }

            let mut levels: Vec<String> = values.iter().flatten().cloned().collect();
            levels.sort();
            levels.dedup();
            let codes = values
                .iter()
                .map(|v| {
                    v.as_ref()
                        .and_then(|v| levels.iter().position(|l| l == v))
                        .map(|i| i as i32 + 1)
                })
                .collect();
            Ok(Value::factor(&levels, codes))
        }
        "datetime" => {
            let mut tz = String::new();
            let mut seconds = Vec::new();
            for arg in args {
                match (arg.name.as_deref(), arg.item) {
                    (Some("tz"), Item::Literal(Literal::Str(s))) => tz = s,
                    (None, Item::Literal(literal)) => seconds.push(to_double(ctor, literal, arg.span)?),
                    _ => return Err(invalid(ctor, "数値と tz = \"...\"", arg.span)),
                }
            }
            Ok(Value::datetime(seconds, &tz))
        }
        "unspecified" => match literals(ctor, args)?.as_slice() {
            [] => Ok(Value::unspecified(0)),
            [(Literal::Int(n), span)] => usize::try_from(*n)
                .map(Value::unspecified)
                .map_err(|_| invalid(ctor, "0以上の長さ", *span)),
            [(_, span), ..] => Err(invalid(ctor, "長さを1つだけ", *span)),
        },
        "list" => {
            let mut elements = Vec::with_capacity(args.len());
            for arg in args {
                match (arg.name, arg.item) {
                    (None, Item::Value(value)) => elements.push(value),
                    _ => return Err(invalid(ctor, "名前なしの値", arg.span)),
                }
            }
            Ok(Value::list(elements))
        }
        "df" | "tibble" => {
            let mut columns: Vec<(String, Value)> = Vec::with_capacity(args.len());
            for arg in args {
                match (arg.name, arg.item) {
                    (Some(name), Item::Value(value)) => {
                        if columns.iter().any(|(existing, _)| *existing == name) {
                            return Err(NotationError::DuplicateBinding {
                                name: format!("{}${}", path, name),
                                span: arg.span,
                            });
                        }
                        columns.push((name, value));
                    }
                    _ => return Err(invalid(ctor, "名前付きの列", arg.span)),
                }
            }
            let frame = if ctor == "tibble" {
                Value::tibble(columns)
            } else {
                Value::data_frame(columns)
            };
            frame.map_err(|e| NotationError::InvalidValue {
                message: e.to_string(),
                span,
            })
        }
        "classed" => {
            let mut args = args.into_iter();
            let value = match args.next() {
                Some(ArgItem {
                    name: None,
                    item: Item::Value(value),
                    ..
                }) => value,
                Some(arg) => return Err(invalid(ctor, "最初の引数に値", arg.span)),
                None => return Err(invalid(ctor, "値とクラス名", span)),
            };
            let mut classes = Vec::new();
            for arg in args {
                match (arg.name, arg.item) {
                    (None, Item::Literal(Literal::Str(class))) => classes.push(class),
                    _ => return Err(invalid(ctor, "クラス名の文字列", arg.span)),
                }
            }
            classes.extend(value.class().iter().cloned());
            Ok(value.with_class(&classes))
        }
        _ => Err(NotationError::UnknownConstructor {
            name: ctor.to_string(),
            span: name_span,
        }),
    }
}
