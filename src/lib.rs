//! protype: ベクトルのプロトタイプ（ptype）の解決
//!
//! 値から長さ0のプロトタイプを求め、複数の値を結合したときの共通の型を決める。
//! クラスごとの振る舞いは [`ptype::MethodRegistry`] に登録したメソッドで拡張できる。

pub mod error;
pub mod notation;
pub mod ptype;
pub mod session;
pub mod value;

// よく使う型の再エクスポート
pub use error::{ErrorCollector, ProtypeError, ProtypeResult, PtypeError, ValueError};
pub use notation::{parse_str, Document, Span};
pub use ptype::{
    vec_ptype, vec_ptype2, vec_ptype_common, vec_ptype_finalise, Arg, ColumnPolicy, Combinator,
    MethodRegistry, PtypeOptions, Resolver,
};
pub use session::Session;
pub use value::{Data, TypeTag, Value};
