//! ptype の文字列表現
//!
//! `ptype_full` は列構造まで含む完全な表現、`ptype_abbr` は
//! 一覧表示やエラーメッセージ向けの短い表現を返す。

use super::{Data, Frame, Value};

/// 完全な型表現
///
/// データフレームは列ごとに1行ずつ、入れ子はインデントして表示する。
/// ```text
/// data.frame<
///   a: integer
///   b: character
/// >
/// ```
pub fn ptype_full(value: &Value) -> String {
    if let Some(frame) = value.frame() {
        return frame_full(frame_label(value), frame);
    }

    match value.class().first().map(String::as_str) {
        Some("factor") => format!("factor<{}>", value.levels().join(",")),
        Some("Date") => "date".to_string(),
        Some("POSIXct") => {
            let tz = value.tzone();
            format!("datetime<{}>", if tz.is_empty() { "local" } else { tz.as_str() })
        }
        Some(class) => class.to_string(),
        None => value.type_tag().name().to_string(),
    }
}

/// 短い型表現
pub fn ptype_abbr(value: &Value) -> String {
    if let Some(frame) = value.frame() {
        let label = match frame_label(value) {
            "data.frame" => "df",
            other => other,
        };
        return format!("{}[,{}]", label, frame.columns.len());
    }

    match value.class().first().map(String::as_str) {
        Some("factor") => "fct".to_string(),
        Some("Date") => "date".to_string(),
        Some("POSIXct") => "dttm".to_string(),
        Some(class) => class.to_string(),
        None => match value.data {
            Data::Null => "NULL",
            Data::Unspecified(_) => "???",
            Data::Logical(_) => "lgl",
            Data::Integer(_) => "int",
            Data::Double(_) => "dbl",
            Data::Character(_) => "chr",
            Data::List(_) => "list",
            Data::Frame(_) => "record",
        }
        .to_string(),
    }
}

fn frame_label(value: &Value) -> &str {
    if value.inherits("tbl_df") {
        return "tibble";
    }
    value
        .class()
        .first()
        .map(String::as_str)
        .unwrap_or("record")
}

fn frame_full(label: &str, frame: &Frame) -> String {
    if frame.columns.is_empty() {
        return format!("{}<>", label);
    }

    let mut out = format!("{}<\n", label);
    for (name, column) in &frame.columns {
        let inner = ptype_full(column).replace('\n', "\n  ");
        out.push_str(&format!("  {}: {}\n", name, inner));
    }
    out.push('>');
    out
}
