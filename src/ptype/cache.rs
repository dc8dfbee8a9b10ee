//! プロセス全体で共有されるメソッドキャッシュ
//!
//! 初回アクセス時に一度だけ初期化され、以降は読み出しのみ。

use std::sync::{Arc, OnceLock};

use super::builtin;
use super::dispatch::{DispatchTarget, Generic, MethodRegistry, DEFAULT_CLASS};

static FINALISE_DISPATCH: OnceLock<DispatchTarget> = OnceLock::new();
static GLOBAL_REGISTRY: OnceLock<MethodRegistry> = OnceLock::new();

/// 確定処理のディスパッチに使うジェネリック名
pub fn finalise_symbol() -> &'static str {
    Generic::Finalise.name()
}

/// 確定処理の既定ディスパッチ先
///
/// レジストリに `vec_ptype_finalise` のメソッドが見つからないときに使われる。
pub fn finalise_dispatch() -> &'static DispatchTarget {
    FINALISE_DISPATCH.get_or_init(|| DispatchTarget {
        generic: Generic::Finalise,
        class: DEFAULT_CLASS.to_string(),
        method: Arc::new(builtin::finalise_default),
    })
}

/// 組み込みメソッドを登録したレジストリ
pub fn global_registry() -> &'static MethodRegistry {
    GLOBAL_REGISTRY.get_or_init(MethodRegistry::with_builtins)
}
