//! S3 風のメソッドディスパッチ
//!
//! `(ジェネリック, クラス名)` からメソッドへの明示的なレジストリ。
//! クラスチェーンは実行時のリストなので、Rust のトレイトではなく
//! 名前による探索でメソッドを解決する。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::trace;

use super::arg::{Arg, CallSite};
use super::combine::Ptype2Ctx;
use crate::error::{PtypeError, PtypeResult};
use crate::value::Value;

/// どのクラスにも一致しないときに使われるクラス名
pub const DEFAULT_CLASS: &str = "default";

/// 単一の値を受け取るメソッド（`vec_ptype`、`vec_ptype_finalise`）
pub type UnaryMethod = Arc<dyn Fn(&Value) -> PtypeResult<Value> + Send + Sync>;

/// 2つの ptype を結合するメソッド（`vec_ptype2`）
pub type BinaryMethod =
    Arc<dyn Fn(&Value, &Value, &mut Ptype2Ctx<'_>) -> PtypeResult<Value> + Send + Sync>;

/// ジェネリック関数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generic {
    Ptype,
    Finalise,
    Ptype2,
}

impl Generic {
    pub fn name(&self) -> &'static str {
        match self {
            Generic::Ptype => "vec_ptype",
            Generic::Finalise => "vec_ptype_finalise",
            Generic::Ptype2 => "vec_ptype2",
        }
    }
}

impl fmt::Display for Generic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 解決済みのディスパッチ先
#[derive(Clone)]
pub struct DispatchTarget {
    pub generic: Generic,
    /// メソッドが登録されていたクラス（既定メソッドなら `default`）
    pub class: String,
    pub method: UnaryMethod,
}

impl DispatchTarget {
    pub fn is_default(&self) -> bool {
        self.class == DEFAULT_CLASS
    }

    pub fn invoke(&self, x: &Value) -> PtypeResult<Value> {
        (self.method)(x)
    }
}

impl fmt::Debug for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchTarget({}.{})", self.generic, self.class)
    }
}

/// 解決済みの二項メソッド
#[derive(Clone)]
pub struct BinaryTarget {
    pub x_class: String,
    pub y_class: String,
    /// 登録が `(y, x)` の順だった場合は true（呼び出し時に引数を入れ替える）
    pub swapped: bool,
    pub method: BinaryMethod,
}

impl fmt::Debug for BinaryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BinaryTarget({}.{}.{}{})",
            Generic::Ptype2,
            self.x_class,
            self.y_class,
            if self.swapped { ", swapped" } else { "" }
        )
    }
}

type CacheKey = (Generic, String);

/// メソッドレジストリ
pub struct MethodRegistry {
    unary: HashMap<(Generic, String), UnaryMethod>,
    binary: HashMap<(String, String), BinaryMethod>,
    /// `(総称関数, クラス)` ごとの検索結果（見つからなかった結果も含む）
    ///
    /// 大きさは検索されたクラス名の種類数で抑えられる。
    cache: RwLock<HashMap<CacheKey, Option<DispatchTarget>>>,
}

impl MethodRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self {
            unary: HashMap::new(),
            binary: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 組み込みメソッドを登録したレジストリを作成
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// プロセス全体で共有される組み込みレジストリ
    pub fn global() -> &'static MethodRegistry {
        super::cache::global_registry()
    }

    pub fn register_ptype<F>(&mut self, class: &str, method: F)
    where
        F: Fn(&Value) -> PtypeResult<Value> + Send + Sync + 'static,
    {
        self.register_unary(Generic::Ptype, class, Arc::new(method));
    }

    pub fn register_finalise<F>(&mut self, class: &str, method: F)
    where
        F: Fn(&Value) -> PtypeResult<Value> + Send + Sync + 'static,
    {
        self.register_unary(Generic::Finalise, class, Arc::new(method));
    }

    /// `(x_class, y_class)` の組に結合メソッドを登録
    ///
    /// 逆順の組 `(y_class, x_class)` にも引数を入れ替えて適用される。
    pub fn register_ptype2<F>(&mut self, x_class: &str, y_class: &str, method: F)
    where
        F: Fn(&Value, &Value, &mut Ptype2Ctx<'_>) -> PtypeResult<Value> + Send + Sync + 'static,
    {
        self.binary
            .insert((x_class.to_string(), y_class.to_string()), Arc::new(method));
    }

    fn register_unary(&mut self, generic: Generic, class: &str, method: UnaryMethod) {
        self.unary.insert((generic, class.to_string()), method);
        // 登録によって解決結果が変わりうるので破棄する
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn has_method(&self, generic: Generic, class: &str) -> bool {
        self.unary.contains_key(&(generic, class.to_string()))
    }

    /// キャッシュ済みの解決結果の数
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// クラスチェーンを具体的な順に探索し、最後に `default` を探す
    pub fn resolve(&self, generic: Generic, chain: &[String]) -> Option<DispatchTarget> {
        let resolved = self
            .resolve_exact(generic, chain)
            .or_else(|| self.cached_target(generic, DEFAULT_CLASS));
        trace!("resolved {} for {:?}: {:?}", generic, chain, resolved);
        resolved
    }

    /// `default` にフォールバックせずにクラス固有のメソッドだけを探す
    pub fn resolve_exact(&self, generic: Generic, chain: &[String]) -> Option<DispatchTarget> {
        chain
            .iter()
            .find_map(|class| self.cached_target(generic, class))
    }

    fn cached_target(&self, generic: Generic, class: &str) -> Option<DispatchTarget> {
        let key = (generic, class.to_string());
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.clone();
        }

        let found = self.target(generic, class);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, found.clone());
        found
    }

    fn target(&self, generic: Generic, class: &str) -> Option<DispatchTarget> {
        self.unary
            .get(&(generic, class.to_string()))
            .map(|method| DispatchTarget {
                generic,
                class: class.to_string(),
                method: Arc::clone(method),
            })
    }

    /// 値のクラスチェーンでディスパッチする
    pub fn s3_dispatch(
        &self,
        x: &Value,
        generic: Generic,
        arg: &Arg,
        call: &CallSite,
    ) -> PtypeResult<DispatchTarget> {
        let chain = x.implicit_class();
        self.resolve(generic, &chain)
            .ok_or_else(|| PtypeError::NoApplicableMethod {
                generic: generic.name().to_string(),
                classes: chain,
                arg: arg.to_string(),
                call: call.to_string(),
            })
    }

    /// 2つのクラスチェーンによる二重ディスパッチ
    ///
    /// x のクラスを具体的な順に、それぞれについて y のクラスを具体的な順に
    /// 組み合わせ、`(cx, cy)`、`(cy, cx)` の順で探す。同じクラスの組 `(c, c)`
    /// も探索に含まれるため、共通の祖先クラスのメソッドもここで見つかる。
    pub fn resolve_ptype2(&self, x_chain: &[String], y_chain: &[String]) -> Option<BinaryTarget> {
        for cx in x_chain {
            for cy in y_chain {
                if let Some(method) = self.binary.get(&(cx.clone(), cy.clone())) {
                    return Some(BinaryTarget {
                        x_class: cx.clone(),
                        y_class: cy.clone(),
                        swapped: false,
                        method: Arc::clone(method),
                    });
                }
                if let Some(method) = self.binary.get(&(cy.clone(), cx.clone())) {
                    return Some(BinaryTarget {
                        x_class: cx.clone(),
                        y_class: cy.clone(),
                        swapped: true,
                        method: Arc::clone(method),
                    });
                }
            }
        }
        None
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}
