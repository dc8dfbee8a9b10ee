//! 記法のファイルを読み込み、ptype を解決するセッション
//!
//! 字句解析・構文解析・ptype 解決の各段階でエラーを蓄積し、
//! 最後にまとめて codespan-reporting で報告する。

use std::fs;
use std::path::Path;

use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};
use log::debug;
use serde::Serialize;

use crate::error::{DiagnosticError, ErrorCollector, ProtypeError, ProtypeResult, PtypeError};
use crate::notation::{Document, Lexer, Parser, TokenWithPosition};
use crate::ptype::{Arg, CallSite, Combinator, MethodRegistry, PtypeOptions, PtypeTrace, Resolver};
use crate::value::Value;

/// 1つの束縛の ptype
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PtypeReport {
    pub name: String,
    pub full: String,
    pub abbr: String,
    pub ptype: Value,
}

/// セッションの状態
pub struct Session {
    pub source_file: String,
    pub source: String,
    pub files: SimpleFiles<String, String>,
    pub file_id: usize,
    pub error_collector: ErrorCollector,
    registry: &'static MethodRegistry,
    options: PtypeOptions,
}

impl Session {
    /// ファイルを読み込んでセッションを作成
    pub fn new<P: AsRef<Path>>(source_file: P) -> ProtypeResult<Self> {
        let source = fs::read_to_string(source_file.as_ref()).map_err(|e| {
            ProtypeError::Io(format!(
                "{} を読み込めません: {}",
                source_file.as_ref().display(),
                e
            ))
        })?;
        Ok(Self::new_from_string(
            &source_file.as_ref().display().to_string(),
            source,
        ))
    }

    /// 文字列からセッションを作成
    pub fn new_from_string(filename: &str, source: String) -> Self {
        let mut files = SimpleFiles::new();
        let file_id = files.add(filename.to_string(), source.clone());

        Self {
            source_file: filename.to_string(),
            source,
            files,
            file_id,
            error_collector: ErrorCollector::new(),
            registry: MethodRegistry::global(),
            options: PtypeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PtypeOptions) -> Self {
        self.options = options;
        self
    }

    /// 組み込み以外のメソッドを登録したレジストリを使う
    pub fn with_registry(mut self, registry: &'static MethodRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &PtypeOptions {
        &self.options
    }

    /// エラーを追加
    pub fn add_error(&mut self, error: ProtypeError) {
        self.error_collector
            .add_error(DiagnosticError::new(error, self.file_id));
    }

    /// ptype のエラーを、原因となった束縛・列の位置とともに追加
    fn add_ptype_error(&mut self, document: &Document, error: PtypeError) {
        let span = document.span_of(error.arg());
        let diagnostic = DiagnosticError::new(error.into(), self.file_id);
        self.error_collector.add_error(match span {
            Some(span) => diagnostic.with_span(span),
            None => diagnostic,
        });
    }

    /// 字句解析を実行
    pub fn tokenize(&mut self) -> Vec<TokenWithPosition> {
        debug!("ステップ: 字句解析を開始");
        let (tokens, errors) = Lexer::new(&self.source).tokenize();
        for error in errors {
            self.add_error(error.into());
        }
        tokens
    }

    /// 構文解析を実行
    pub fn parse(&mut self, tokens: Vec<TokenWithPosition>) -> Option<Document> {
        debug!("ステップ: 構文解析を開始");
        match Parser::new(tokens).parse() {
            Ok(document) => Some(document),
            Err(e) => {
                self.add_error(e.into());
                None
            }
        }
    }

    /// 字句解析と構文解析（エラーがあれば `None`）
    pub fn load(&mut self) -> Option<Document> {
        let tokens = self.tokenize();
        // 字句エラーがあっても構文エラーを集めるためにパースは続行する
        let document = self.parse(tokens);
        if self.has_errors() {
            None
        } else {
            document
        }
    }

    /// 各束縛の ptype
    pub fn show(&mut self, document: &Document) -> Vec<PtypeReport> {
        debug!("ステップ: 束縛ごとの ptype を解決");
        let resolver = Resolver::new(self.registry).with_max_depth(self.options.max_depth);
        let call = CallSite::new("vec_ptype");
        let mut reports = Vec::with_capacity(document.bindings.len());

        for binding in &document.bindings {
            match resolver.ptype(&binding.value, &Arg::name(binding.name.as_str()), &call) {
                Ok(ptype) => reports.push(PtypeReport {
                    name: binding.name.clone(),
                    full: ptype.ptype_full(),
                    abbr: ptype.ptype_abbr(),
                    ptype,
                }),
                Err(e) => self.add_ptype_error(document, e),
            }
        }
        reports
    }

    /// すべての束縛の共通 ptype
    pub fn common(&mut self, document: &Document) -> Option<Value> {
        debug!("ステップ: 共通 ptype を解決");
        let combinator = Combinator::new(self.registry, self.options);
        match combinator.ptype_common_args(&document.inputs()) {
            Ok(ptype) => Some(ptype),
            Err(e) => {
                self.add_ptype_error(document, e);
                None
            }
        }
    }

    /// 共通 ptype と導出過程
    pub fn common_traced(&mut self, document: &Document) -> Option<PtypeTrace> {
        debug!("ステップ: 共通 ptype を導出過程つきで解決");
        let combinator = Combinator::new(self.registry, self.options);
        match combinator.ptype_common_traced(&document.inputs()) {
            Ok(trace) => Some(trace),
            Err(e) => {
                self.add_ptype_error(document, e);
                None
            }
        }
    }

    /// すべての束縛について ptype の解決と確定を試し、エラーをすべて集める
    pub fn check(&mut self, document: &Document) -> bool {
        debug!("ステップ: 検査を開始");
        let resolver = Resolver::new(self.registry).with_max_depth(self.options.max_depth);
        let call = CallSite::new("vec_ptype");

        for binding in &document.bindings {
            let arg = Arg::name(binding.name.as_str());
            let result = resolver
                .ptype(&binding.value, &arg, &call)
                .and_then(|ptype| resolver.finalise(&ptype));
            if let Err(e) = result {
                self.add_ptype_error(document, e);
            }
        }
        !self.has_errors()
    }

    /// 診断情報を書き出す
    pub fn emit_diagnostics<W: WriteColor>(&self, writer: &mut W) -> ProtypeResult<()> {
        let config = codespan_reporting::term::Config::default();
        for error in self.error_collector.errors() {
            let diagnostic = error.to_diagnostic();
            codespan_reporting::term::emit(&mut *writer, &config, &self.files, &diagnostic)
                .map_err(|e| ProtypeError::Io(format!("診断情報を出力できません: {}", e)))?;
        }
        Ok(())
    }

    /// 診断情報を色なしの文字列にする
    pub fn render_diagnostics(&self) -> ProtypeResult<String> {
        let mut writer = NoColor::new(Vec::new());
        self.emit_diagnostics(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    /// 診断情報を標準エラーに報告
    pub fn report_diagnostics(&self) -> ProtypeResult<()> {
        let writer = StandardStream::stderr(ColorChoice::Always);
        let mut lock = writer.lock();
        self.emit_diagnostics(&mut lock)
    }

    /// エラーレポートを生成
    pub fn report_errors(&self) -> ProtypeResult<()> {
        self.report_diagnostics()?;
        if self.has_errors() {
            eprintln!("\n{} 個のエラーが見つかりました", self.error_count());
        }
        Ok(())
    }

    /// エラーがあるかチェック
    pub fn has_errors(&self) -> bool {
        self.error_collector.has_errors()
    }

    /// エラー数を取得
    pub fn error_count(&self) -> usize {
        self.error_collector.error_count()
    }
}
