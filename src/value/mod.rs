//! ベクトル値のデータモデル
//!
//! ptype 解決の対象となるベクトル的な値（アトミックベクトル、リスト、
//! レコード／データフレーム）と、その属性（クラスチェーンなど）を表現する。

mod format;

pub use format::{ptype_abbr, ptype_full};

use crate::error::ValueError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// データフレームの基底クラス名
pub const DATA_FRAME_CLASS: &str = "data.frame";

/// tibble のクラスチェーン
pub const TIBBLE_CLASS: [&str; 3] = ["tbl_df", "tbl", DATA_FRAME_CLASS];

/// 値の型タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Null,
    Unspecified,
    Logical,
    Integer,
    Double,
    Character,
    List,
    Record,
}

impl TypeTag {
    /// 型名（クラスを持たない値の暗黙のクラス名）
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Null => "NULL",
            TypeTag::Unspecified => "unspecified",
            TypeTag::Logical => "logical",
            TypeTag::Integer => "integer",
            TypeTag::Double => "double",
            TypeTag::Character => "character",
            TypeTag::List => "list",
            TypeTag::Record => "record",
        }
    }
}

/// レコード（列の順序付きマップと行数）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub columns: IndexMap<String, Value>,
    pub nrow: usize,
}

impl Frame {
    /// 列の長さを検証してレコードを作成
    pub fn new(columns: IndexMap<String, Value>) -> Result<Self, ValueError> {
        let nrow = columns.values().next().map(Value::len).unwrap_or(0);
        for (name, column) in &columns {
            if column.len() != nrow {
                return Err(ValueError::RaggedColumns {
                    column: name.clone(),
                    expected: nrow,
                    found: column.len(),
                });
            }
        }
        Ok(Self { columns, nrow })
    }

    /// 0行のレコードを作成（列はすでに長さ0であること）
    pub fn empty(columns: IndexMap<String, Value>) -> Self {
        Self { columns, nrow: 0 }
    }
}

/// 値の本体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    Null,
    /// 型が未確定であることを表すマーカー（要素はすべて欠損）
    Unspecified(usize),
    Logical(Vec<Option<bool>>),
    Integer(Vec<Option<i32>>),
    Double(Vec<Option<f64>>),
    Character(Vec<Option<String>>),
    List(Vec<Value>),
    Frame(Frame),
}

/// 値の属性
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    /// クラスチェーン（最も具体的なクラスが先頭）
    pub class: Vec<String>,
    /// その他の属性（factor の levels、datetime の tzone など）
    pub extra: IndexMap<String, Value>,
}

/// ベクトル的な値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub data: Data,
    #[serde(default)]
    pub attrs: Attributes,
}

impl Value {
    pub fn new(data: Data) -> Self {
        Self {
            data,
            attrs: Attributes::default(),
        }
    }

    pub fn null() -> Self {
        Self::new(Data::Null)
    }

    pub fn unspecified(len: usize) -> Self {
        Self::new(Data::Unspecified(len))
    }

    pub fn logical(values: Vec<Option<bool>>) -> Self {
        Self::new(Data::Logical(values))
    }

    pub fn integer(values: Vec<Option<i32>>) -> Self {
        Self::new(Data::Integer(values))
    }

    pub fn double(values: Vec<Option<f64>>) -> Self {
        Self::new(Data::Double(values))
    }

    pub fn character<S: Into<String>>(values: Vec<Option<S>>) -> Self {
        Self::new(Data::Character(
            values.into_iter().map(|v| v.map(Into::into)).collect(),
        ))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::new(Data::List(values))
    }

    /// クラスを持たないレコード
    pub fn record<S: Into<String>>(columns: Vec<(S, Value)>) -> Result<Self, ValueError> {
        let columns = columns
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Ok(Self::new(Data::Frame(Frame::new(columns)?)))
    }

    /// 素のデータフレーム（クラスは `data.frame` のみ）
    pub fn data_frame<S: Into<String>>(columns: Vec<(S, Value)>) -> Result<Self, ValueError> {
        Ok(Self::record(columns)?.with_class(&[DATA_FRAME_CLASS]))
    }

    pub fn tibble<S: Into<String>>(columns: Vec<(S, Value)>) -> Result<Self, ValueError> {
        Ok(Self::record(columns)?.with_class(&TIBBLE_CLASS))
    }

    /// factor（整数コード + levels 属性）
    pub fn factor<S: AsRef<str>>(levels: &[S], codes: Vec<Option<i32>>) -> Self {
        let levels = levels.iter().map(|l| Some(l.as_ref().to_string())).collect();
        Self::integer(codes)
            .with_class(&["factor"])
            .with_attr("levels", Self::new(Data::Character(levels)))
    }

    /// 日付（1970-01-01 からの日数）
    pub fn date(days: Vec<Option<f64>>) -> Self {
        Self::double(days).with_class(&["Date"])
    }

    /// 日時（UNIX 秒 + tzone 属性）
    pub fn datetime(seconds: Vec<Option<f64>>, tz: &str) -> Self {
        Self::double(seconds)
            .with_class(&["POSIXct", "POSIXt"])
            .with_attr("tzone", Self::character(vec![Some(tz)]))
    }

    /// クラスチェーンを置き換える
    pub fn with_class<S: AsRef<str>>(mut self, class: &[S]) -> Self {
        self.attrs.class = class.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// 属性を設定
    pub fn with_attr(mut self, name: &str, value: Value) -> Self {
        self.attrs.extra.insert(name.to_string(), value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.extra.get(name)
    }

    pub fn type_tag(&self) -> TypeTag {
        match &self.data {
            Data::Null => TypeTag::Null,
            Data::Unspecified(_) => TypeTag::Unspecified,
            Data::Logical(_) => TypeTag::Logical,
            Data::Integer(_) => TypeTag::Integer,
            Data::Double(_) => TypeTag::Double,
            Data::Character(_) => TypeTag::Character,
            Data::List(_) => TypeTag::List,
            Data::Frame(_) => TypeTag::Record,
        }
    }

    /// 要素数（レコードの場合は行数）
    pub fn len(&self) -> usize {
        match &self.data {
            Data::Null => 0,
            Data::Unspecified(n) => *n,
            Data::Logical(v) => v.len(),
            Data::Integer(v) => v.len(),
            Data::Double(v) => v.len(),
            Data::Character(v) => v.len(),
            Data::List(v) => v.len(),
            Data::Frame(frame) => frame.nrow,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class(&self) -> &[String] {
        &self.attrs.class
    }

    /// クラス属性を持つかどうか
    pub fn is_object(&self) -> bool {
        !self.attrs.class.is_empty()
    }

    pub fn inherits(&self, class: &str) -> bool {
        self.attrs.class.iter().any(|c| c == class)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self.data, Data::Unspecified(_))
    }

    pub fn frame(&self) -> Option<&Frame> {
        match &self.data {
            Data::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_data_frame(&self) -> bool {
        self.frame().is_some() && self.inherits(DATA_FRAME_CLASS)
    }

    /// クラスが `data.frame` のみのデータフレーム
    pub fn is_bare_data_frame(&self) -> bool {
        self.frame().is_some() && self.attrs.class.len() == 1 && self.inherits(DATA_FRAME_CLASS)
    }

    /// クラスを持たず、1要素以上あり、すべて欠損の論理ベクトル
    pub fn looks_unspecified(&self) -> bool {
        match &self.data {
            Data::Logical(values) => {
                !self.is_object() && !values.is_empty() && values.iter().all(Option::is_none)
            }
            _ => false,
        }
    }

    /// 暗黙のクラスチェーン
    pub fn implicit_class(&self) -> Vec<String> {
        if self.is_object() {
            self.attrs.class.clone()
        } else {
            vec![self.type_tag().name().to_string()]
        }
    }

    /// 長さ0のスライスを作成（属性は保持し、レコードの列も再帰的に空にする）
    pub fn slice_empty(&self) -> Self {
        let data = match &self.data {
            Data::Null => Data::Null,
            Data::Unspecified(_) => Data::Unspecified(0),
            Data::Logical(_) => Data::Logical(Vec::new()),
            Data::Integer(_) => Data::Integer(Vec::new()),
            Data::Double(_) => Data::Double(Vec::new()),
            Data::Character(_) => Data::Character(Vec::new()),
            Data::List(_) => Data::List(Vec::new()),
            Data::Frame(frame) => Data::Frame(Frame::empty(
                frame
                    .columns
                    .iter()
                    .map(|(name, column)| (name.clone(), column.slice_empty()))
                    .collect(),
            )),
        };
        Self {
            data,
            attrs: self.attrs.clone(),
        }
    }

    /// factor の levels
    pub fn levels(&self) -> Vec<String> {
        match self.attr("levels").map(|levels| &levels.data) {
            Some(Data::Character(levels)) => levels.iter().flatten().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// datetime のタイムゾーン（未設定なら空文字列）
    pub fn tzone(&self) -> String {
        match self.attr("tzone").map(|tz| &tz.data) {
            Some(Data::Character(tz)) => tz.iter().flatten().next().cloned().unwrap_or_default(),
            _ => String::new(),
        }
    }

    pub fn ptype_full(&self) -> String {
        ptype_full(self)
    }

    pub fn ptype_abbr(&self) -> String {
        ptype_abbr(self)
    }
}
