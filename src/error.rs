//! 統一的なエラーハンドリングモジュール
//!
//! このモジュールは、ptype 解決・値の構築・記法の解析で使用される
//! エラー型と、codespan-reporting によるエラー報告システムを提供します。

use crate::notation::Span;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// protype の統一エラー型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtypeError {
    /// ptype 解決エラー
    #[error(transparent)]
    Ptype(#[from] PtypeError),

    /// 値の構築エラー
    #[error(transparent)]
    Value(#[from] ValueError),

    /// 記法の解析エラー
    #[error(transparent)]
    Notation(#[from] NotationError),

    /// ファイルI/Oエラー
    #[error("ファイル操作エラー: {0}")]
    Io(String),

    /// その他のエラー
    #[error("{0}")]
    Other(String),
}

/// 引数名と型表現を組み合わせてメッセージ用の文字列にする
fn describe(arg: &str, ty: &str) -> String {
    if arg.is_empty() {
        format!("<{}>", ty)
    } else {
        format!("`{}` <{}>", arg, ty)
    }
}

fn join_classes(classes: &[String]) -> String {
    classes.join("/")
}

fn describe_arg(arg: &str) -> String {
    if arg.is_empty() {
        "入力".to_string()
    } else {
        format!("`{}`", arg)
    }
}

fn in_call(call: &str) -> String {
    if call.is_empty() {
        String::new()
    } else {
        format!(" ({}の中)", call)
    }
}

/// ptype 解決・結合のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PtypeError {
    #[error("{}の `{generic}` に適用可能なメソッドがありません（クラス: {}）{}", describe_arg(.arg), .classes.join(", "), in_call(.call))]
    NoApplicableMethod {
        generic: String,
        classes: Vec<String>,
        arg: String,
        call: String,
    },

    #[error("{} の ptype が不正です: {reason}{}", describe(.arg, &join_classes(.classes)), in_call(.call))]
    MalformedPtype {
        classes: Vec<String>,
        reason: String,
        arg: String,
        call: String,
    },

    #[error("{} と {} を結合できません{}", describe(.x_arg, .x_type), describe(.y_arg, .y_type), in_call(.call))]
    IncompatibleTypes {
        x_type: String,
        y_type: String,
        x_arg: String,
        y_arg: String,
        call: String,
    },

    #[error("列 `{column}` は {} にありますが {} にありません{}", describe_arg(.present_in), describe_arg(.missing_from), in_call(.call))]
    IncompatibleColumns {
        column: String,
        present_in: String,
        missing_from: String,
        call: String,
    },

    #[error("{}の入れ子の深さが上限 {limit} を超えました{}", describe_arg(.arg), in_call(.call))]
    RecursionLimitExceeded {
        limit: usize,
        arg: String,
        call: String,
    },
}

impl PtypeError {
    /// エラーの原因となった部分値の引数パス
    pub fn arg(&self) -> &str {
        match self {
            PtypeError::NoApplicableMethod { arg, .. } => arg,
            PtypeError::MalformedPtype { arg, .. } => arg,
            PtypeError::IncompatibleTypes { y_arg, .. } => y_arg,
            PtypeError::IncompatibleColumns { present_in, .. } => present_in,
            PtypeError::RecursionLimitExceeded { arg, .. } => arg,
        }
    }
}

/// 値の構築エラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("列 `{column}` の長さが一致しません: {expected}行を期待しましたが、{found}行でした")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// 値の記法の解析エラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotationError {
    #[error("認識できないトークン: '{token}'")]
    UnrecognizedToken { token: String, span: Span },

    #[error("予期しないトークン: {expected}を期待しましたが、{found}が見つかりました")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("予期しない入力の終了: {expected}を期待していました")]
    UnexpectedEof { expected: String, span: Span },

    #[error("不正なリテラル: {message}")]
    InvalidLiteral { message: String, span: Span },

    #[error("不正な値: {message}")]
    InvalidValue { message: String, span: Span },

    #[error("未知のコンストラクタ: {name}")]
    UnknownConstructor { name: String, span: Span },

    #[error("{name} は既に定義されています")]
    DuplicateBinding { name: String, span: Span },
}

impl NotationError {
    pub fn span(&self) -> Span {
        match self {
            NotationError::UnrecognizedToken { span, .. }
            | NotationError::UnexpectedToken { span, .. }
            | NotationError::UnexpectedEof { span, .. }
            | NotationError::InvalidLiteral { span, .. }
            | NotationError::InvalidValue { span, .. }
            | NotationError::UnknownConstructor { span, .. }
            | NotationError::DuplicateBinding { span, .. } => *span,
        }
    }

    fn label_message(&self) -> Option<&'static str> {
        match self {
            NotationError::UnrecognizedToken { .. } => Some("ここに不正なトークンがあります"),
            NotationError::UnknownConstructor { .. } => Some("このコンストラクタは定義されていません"),
            NotationError::DuplicateBinding { .. } => Some("重複した定義"),
            _ => None,
        }
    }
}

/// エラー情報とソースコードの位置情報を含むエラー
#[derive(Debug, Clone)]
pub struct DiagnosticError {
    pub error: ProtypeError,
    pub file_id: usize,
    /// 記法エラー以外で、ソース上の位置が分かっている場合の位置
    pub span: Option<Span>,
}

impl DiagnosticError {
    pub fn new(error: ProtypeError, file_id: usize) -> Self {
        Self {
            error,
            file_id,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// codespan-reportingのDiagnosticに変換
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let message = self.error.to_string();
        let labels = match &self.error {
            ProtypeError::Notation(e) => {
                let span = e.span();
                let label = Label::primary(self.file_id, span.start..span.end);
                vec![match e.label_message() {
                    Some(text) => label.with_message(text),
                    None => label,
                }]
            }
            ProtypeError::Ptype(e) => self
                .span
                .map(|span| {
                    let label = Label::primary(self.file_id, span.start..span.end);
                    vec![label.with_message(ptype_label_message(e))]
                })
                .unwrap_or_default(),
            _ => self
                .span
                .map(|span| vec![Label::primary(self.file_id, span.start..span.end)])
                .unwrap_or_default(),
        };

        let diagnostic = Diagnostic::error().with_message(message).with_labels(labels);
        match &self.error {
            ProtypeError::Ptype(PtypeError::IncompatibleColumns { .. }) => diagnostic
                .with_notes(vec!["列の和集合を取るには --lenient を指定してください".to_string()]),
            ProtypeError::Ptype(PtypeError::RecursionLimitExceeded { .. }) => {
                diagnostic.with_notes(vec!["--max-depth で上限を変更できます".to_string()])
            }
            _ => diagnostic,
        }
    }
}

fn ptype_label_message(e: &PtypeError) -> String {
    match e {
        PtypeError::NoApplicableMethod { generic, .. } => {
            format!("この値には `{}` のメソッドがありません", generic)
        }
        PtypeError::MalformedPtype { .. } => "この値のメソッドが不正な ptype を返しました".to_string(),
        PtypeError::IncompatibleTypes { x_type, y_type, .. } => {
            format!("<{}> は <{}> と結合できません", y_type, x_type)
        }
        PtypeError::IncompatibleColumns { column, .. } => {
            format!("列 `{}` を含んでいます", column)
        }
        PtypeError::RecursionLimitExceeded { .. } => "入れ子が深すぎます".to_string(),
    }
}

/// 複数のエラーを蓄積するためのコレクター
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<DiagnosticError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// エラーを追加
    pub fn add_error(&mut self, error: DiagnosticError) {
        self.errors.push(error);
    }

    /// エラーがあるかどうか
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// エラーの数
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// すべてのエラーを取得
    pub fn errors(&self) -> &[DiagnosticError] {
        &self.errors
    }

    /// 最初のエラーを取得
    pub fn first_error(&self) -> Option<&DiagnosticError> {
        self.errors.first()
    }
}

/// Result型のエイリアス
pub type ProtypeResult<T> = Result<T, ProtypeError>;

/// ptype 解決用の Result型
pub type PtypeResult<T> = Result<T, PtypeError>;

impl From<std::io::Error> for ProtypeError {
    fn from(e: std::io::Error) -> Self {
        ProtypeError::Io(e.to_string())
    }
}
