//! ptype（プロトタイプ）の解決と結合
//!
//! - [`Resolver`]: 単一の値の ptype と、未確定の ptype の確定処理
//! - [`Combinator`]: 2つの ptype の結合と、複数の入力の共通 ptype
//! - [`MethodRegistry`]: クラスチェーンによるメソッドディスパッチ
//!
//! 下の関数はプロセス全体の組み込みレジストリと既定の設定を使う。

mod arg;
mod builtin;
pub mod cache;
mod combine;
mod dispatch;
mod finalise;
mod options;
mod resolve;

pub use arg::{Arg, CallSite};
pub use builtin::{finalise_default, ptype_default};
pub use combine::{Combinator, Counters, Ptype2Ctx, PtypeTrace, TraceStep};
pub use dispatch::{
    BinaryMethod, BinaryTarget, DispatchTarget, Generic, MethodRegistry, UnaryMethod, DEFAULT_CLASS,
};
pub use options::{ColumnPolicy, PtypeOptions, DEFAULT_MAX_DEPTH};
pub use resolve::Resolver;

use crate::error::PtypeResult;
use crate::value::Value;

/// 値の ptype（未確定の ptype を返すことがある）
pub fn vec_ptype(x: &Value) -> PtypeResult<Value> {
    Resolver::new(MethodRegistry::global()).ptype(x, &Arg::Empty, &CallSite::new("vec_ptype"))
}

/// ptype を確定させる
pub fn vec_ptype_finalise(x: &Value) -> PtypeResult<Value> {
    Resolver::new(MethodRegistry::global()).finalise(x)
}

/// 2つの値の共通 ptype（両方が未確定なら未確定のまま）
pub fn vec_ptype2(x: &Value, y: &Value) -> PtypeResult<Value> {
    let combinator = Combinator::new(MethodRegistry::global(), PtypeOptions::default());
    let mut counters = combinator.counters(CallSite::new("vec_ptype2"));
    combinator.ptype2(x, y, &mut counters)
}

/// 複数の値の共通 ptype（確定済み）
pub fn vec_ptype_common(values: &[Value]) -> PtypeResult<Value> {
    Combinator::new(MethodRegistry::global(), PtypeOptions::default()).ptype_common(values)
}
