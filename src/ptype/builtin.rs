//! 組み込みメソッド
//!
//! 既定の `vec_ptype`／`vec_ptype_finalise` と、factor・日付・日時・tibble の
//! 結合規則を登録する。

use super::combine::Ptype2Ctx;
use super::dispatch::{MethodRegistry, DEFAULT_CLASS};
use crate::error::PtypeResult;
use crate::value::{Value, TIBBLE_CLASS};

/// 組み込みメソッドを登録
pub fn register_builtins(registry: &mut MethodRegistry) {
    registry.register_ptype(DEFAULT_CLASS, ptype_default);
    registry.register_finalise(DEFAULT_CLASS, finalise_default);

    registry.register_ptype2("factor", "factor", factor_factor);
    registry.register_ptype2("factor", "character", factor_character);
    registry.register_ptype2("Date", "Date", date_date);
    registry.register_ptype2("Date", "POSIXct", date_datetime);
    registry.register_ptype2("POSIXct", "POSIXct", datetime_datetime);
    registry.register_ptype2("tbl_df", "tbl_df", tibble_frame);
    registry.register_ptype2("tbl_df", "data.frame", tibble_frame);
}

/// 既定の ptype: 長さ0のスライス
pub fn ptype_default(x: &Value) -> PtypeResult<Value> {
    Ok(x.slice_empty())
}

/// 既定の確定処理: 未確定なら長さ0の論理ベクトル、それ以外はそのまま
pub fn finalise_default(x: &Value) -> PtypeResult<Value> {
    if x.is_unspecified() {
        Ok(Value::logical(Vec::new()))
    } else {
        Ok(x.clone())
    }
}

/// levels は両者の和集合を辞書順に並べたもの（引数の順序に依存させない）
fn factor_factor(x: &Value, y: &Value, _ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    let mut levels = x.levels();
    levels.extend(y.levels());
    levels.sort();
    levels.dedup();
    Ok(Value::factor(&levels, Vec::new()))
}

fn factor_character(_x: &Value, _y: &Value, _ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    Ok(Value::character::<String>(Vec::new()))
}

fn date_date(_x: &Value, _y: &Value, _ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    Ok(Value::date(Vec::new()))
}

fn date_datetime(_x: &Value, y: &Value, _ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    Ok(Value::datetime(Vec::new(), &y.tzone()))
}

fn datetime_datetime(x: &Value, y: &Value, _ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    Ok(Value::datetime(Vec::new(), &common_tzone(&x.tzone(), &y.tzone())))
}

/// 空のタイムゾーンは設定された方に譲り、両方設定されていて異なる場合は
/// 辞書順で小さい方を取る（引数の順序に依存させない）
fn common_tzone(x: &str, y: &str) -> String {
    match (x.is_empty(), y.is_empty()) {
        (true, _) => y.to_string(),
        (_, true) => x.to_string(),
        _ => x.min(y).to_string(),
    }
}

fn tibble_frame(x: &Value, y: &Value, ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    Ok(ctx.frame_ptype2(x, y)?.with_class(&TIBBLE_CLASS))
}
