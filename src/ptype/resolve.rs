//! 単一の値の ptype 解決
//!
//! - クラスを持たないベクトル: 長さ0のスライス
//! - データフレーム: 列ごとに ptype を導出して0行のデータフレームを組み立てる
//! - その他のクラス付きの値: `vec_ptype` の S3 ディスパッチ

use indexmap::IndexMap;
use log::debug;

use super::arg::{Arg, CallSite};
use super::dispatch::{DispatchTarget, Generic, MethodRegistry};
use super::options::DEFAULT_MAX_DEPTH;
use crate::error::{PtypeError, PtypeResult};
use crate::value::{Data, Frame, Value, DATA_FRAME_CLASS};

/// 単一の値の ptype を解決する
///
/// データフレームやレコードの入れ子は `max_depth` 段までたどる。
#[derive(Clone, Copy)]
pub struct Resolver<'r> {
    pub(super) registry: &'r MethodRegistry,
    max_depth: usize,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r MethodRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &'r MethodRegistry {
        self.registry
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 値の ptype を求める
    ///
    /// すべて欠損の論理ベクトルは未確定（unspecified）の ptype になる。
    /// 未確定の ptype を具体的な型にするには [`Resolver::finalise`] を使う。
    pub fn ptype(&self, x: &Value, arg: &Arg, call: &CallSite) -> PtypeResult<Value> {
        self.ptype_at(x, arg, call, 0)
    }

    fn ptype_at(&self, x: &Value, arg: &Arg, call: &CallSite, depth: usize) -> PtypeResult<Value> {
        match &x.data {
            Data::Null => return Ok(Value::null()),
            Data::Unspecified(_) if !x.is_object() => return Ok(Value::unspecified(0)),
            _ => {}
        }

        if x.looks_unspecified() {
            return Ok(Value::unspecified(0));
        }

        if !x.is_object() {
            return self.record_ptype(x, arg, call, depth);
        }

        if x.is_data_frame() {
            if x.is_bare_data_frame() {
                return self.df_ptype_at(x, true, arg, call, depth);
            }
            // data.frame より具体的なクラスのメソッドがあればそちらを優先
            return match self.vec_ptype_method(x) {
                Some(target) => self.vec_ptype_invoke(x, &target, arg, call),
                None => self.df_ptype_at(x, false, arg, call, depth),
            };
        }

        self.s3_ptype(x, arg, call)
    }

    /// データフレームの ptype
    ///
    /// 列の順序と名前はそのまま、各列は長さ0になる。`bare` の場合はクラスを
    /// `data.frame` のみにし、その他の属性も落とす。
    pub fn df_ptype(&self, x: &Value, bare: bool, arg: &Arg, call: &CallSite) -> PtypeResult<Value> {
        self.df_ptype_at(x, bare, arg, call, 0)
    }

    fn df_ptype_at(
        &self,
        x: &Value,
        bare: bool,
        arg: &Arg,
        call: &CallSite,
        depth: usize,
    ) -> PtypeResult<Value> {
        let Some(frame) = x.frame() else {
            return Ok(vec_ptype_slice(x));
        };

        let mut columns = IndexMap::with_capacity(frame.columns.len());
        for (name, column) in &frame.columns {
            let ptype = self.col_ptype(column, &arg.field(name), call, depth + 1)?;
            columns.insert(name.clone(), ptype);
        }

        let mut out = Value::new(Data::Frame(Frame::empty(columns)));
        if bare {
            out.attrs.class = vec![DATA_FRAME_CLASS.to_string()];
        } else {
            out.attrs = x.attrs.clone();
        }
        Ok(out)
    }

    fn col_ptype(&self, x: &Value, arg: &Arg, call: &CallSite, depth: usize) -> PtypeResult<Value> {
        self.check_depth(depth, arg, call)?;
        self.ptype_at(x, arg, call, depth)
    }

    /// クラスを持たない値の ptype
    ///
    /// レコードはフィールドを再帰的に長さ0にする。フィールドの値はディスパッチしない。
    fn record_ptype(&self, x: &Value, arg: &Arg, call: &CallSite, depth: usize) -> PtypeResult<Value> {
        let Some(frame) = x.frame() else {
            return Ok(vec_ptype_slice(x));
        };

        let mut columns = IndexMap::with_capacity(frame.columns.len());
        for (name, field) in &frame.columns {
            let field_arg = arg.field(name);
            self.check_depth(depth + 1, &field_arg, call)?;
            columns.insert(
                name.clone(),
                self.record_ptype(field, &field_arg, call, depth + 1)?,
            );
        }

        Ok(Value {
            data: Data::Frame(Frame::empty(columns)),
            attrs: x.attrs.clone(),
        })
    }

    /// 入れ子の深さが上限以内であることを確認
    pub(super) fn check_depth(&self, depth: usize, arg: &Arg, call: &CallSite) -> PtypeResult<()> {
        if depth > self.max_depth {
            return Err(PtypeError::RecursionLimitExceeded {
                limit: self.max_depth,
                arg: arg.to_string(),
                call: call.to_string(),
            });
        }
        Ok(())
    }

    fn s3_ptype(&self, x: &Value, arg: &Arg, call: &CallSite) -> PtypeResult<Value> {
        let target = self.registry.s3_dispatch(x, Generic::Ptype, arg, call)?;
        self.vec_ptype_invoke(x, &target, arg, call)
    }

    /// データフレームのサブクラスに固有の `vec_ptype` メソッド
    fn vec_ptype_method(&self, x: &Value) -> Option<DispatchTarget> {
        let specific: Vec<String> = x
            .class()
            .iter()
            .take_while(|class| class.as_str() != DATA_FRAME_CLASS)
            .cloned()
            .collect();
        self.registry.resolve_exact(Generic::Ptype, &specific)
    }

    fn vec_ptype_invoke(
        &self,
        x: &Value,
        target: &DispatchTarget,
        arg: &Arg,
        call: &CallSite,
    ) -> PtypeResult<Value> {
        debug!("dispatching {:?} for `{}`", target, arg);
        let out = target.invoke(x)?;
        validate_ptype(x, &out, arg, call)?;
        Ok(out)
    }
}

/// クラスを持たない値の長さ0のスライス
fn vec_ptype_slice(x: &Value) -> Value {
    if x.is_empty() && x.frame().is_none() {
        x.clone()
    } else {
        x.slice_empty()
    }
}

/// メソッドの返した値が入力と同じ型の長さ0の値であることを確認
pub(super) fn validate_ptype(x: &Value, out: &Value, arg: &Arg, call: &CallSite) -> PtypeResult<()> {
    let reason = if !out.is_empty() {
        format!("長さ0ではなく長さ{}の値が返されました", out.len())
    } else if out.type_tag() != x.type_tag() {
        format!(
            "{} 型の値に対して {} 型の値が返されました",
            x.type_tag().name(),
            out.type_tag().name()
        )
    } else {
        return Ok(());
    };

    Err(PtypeError::MalformedPtype {
        classes: x.implicit_class(),
        reason,
        arg: arg.to_string(),
        call: call.to_string(),
    })
}
