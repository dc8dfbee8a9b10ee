//! ptype テストの共通モジュール
//!
//! テストで使用する値の組み立てと、結合結果を確認するヘルパー関数を定義する。

#![allow(dead_code)]

use protype::error::{PtypeError, PtypeResult};
use protype::ptype::{vec_ptype2, Arg, CallSite, Combinator, MethodRegistry, PtypeOptions};
use protype::value::Value;

/// データフレームを作成するヘルパー関数
pub fn df(columns: Vec<(&str, Value)>) -> Value {
    Value::data_frame(columns).expect("列の長さは揃っているはず")
}

/// tibble を作成するヘルパー関数
pub fn tibble(columns: Vec<(&str, Value)>) -> Value {
    Value::tibble(columns).expect("列の長さは揃っているはず")
}

pub fn int(values: &[i32]) -> Value {
    Value::integer(values.iter().copied().map(Some).collect())
}

pub fn dbl(values: &[f64]) -> Value {
    Value::double(values.iter().copied().map(Some).collect())
}

pub fn chr(values: &[&str]) -> Value {
    Value::character(values.iter().map(|v| Some(*v)).collect())
}

/// すべて欠損の論理ベクトル
pub fn na(len: usize) -> Value {
    Value::logical(vec![None; len])
}

/// `depth` 段の入れ子になったデータフレーム
pub fn nested_frame(depth: usize) -> Value {
    let mut value = df(vec![("leaf", int(&[1]))]);
    for _ in 0..depth {
        value = df(vec![("inner", value)]);
    }
    value
}

/// 組み込みレジストリで結合し、成功することを確認するヘルパー関数
pub fn combine(x: &Value, y: &Value) -> Value {
    vec_ptype2(x, y).expect("結合に成功するはず")
}

/// 両方向の結合が同じ結果になることを確認するヘルパー関数
pub fn assert_commutative(x: &Value, y: &Value) -> Value {
    let forward = combine(x, y);
    let backward = combine(y, x);
    assert_eq!(forward, backward, "結合は引数の順序に依存しないはず");
    forward
}

/// 引数名 `x`・`y` をつけて結合するヘルパー関数
pub fn combine_named(
    registry: &MethodRegistry,
    options: PtypeOptions,
    x: &Value,
    y: &Value,
) -> PtypeResult<Value> {
    let combinator = Combinator::new(registry, options);
    let mut counters = protype::ptype::Counters::with_args(
        Arg::name("x"),
        Arg::name("y"),
        CallSite::new("vec_ptype2"),
        options.max_depth,
    );
    combinator.ptype2(x, y, &mut counters)
}

/// 特定のエラーが発生することを確認するヘルパー関数
pub fn assert_ptype_error<F>(result: PtypeResult<Value>, check: F)
where
    F: Fn(&PtypeError) -> bool,
{
    match result {
        Ok(value) => panic!("エラーになるはずが {} になりました", value.ptype_full()),
        Err(error) => assert!(check(&error), "予期しないエラー: {:?}", error),
    }
}

// サブモジュールの宣言
#[cfg(test)]
mod combine_test;
#[cfg(test)]
mod dispatch_test;
