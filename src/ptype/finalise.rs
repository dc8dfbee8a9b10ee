//! 未確定の ptype の確定処理

use indexmap::IndexMap;
use log::trace;

use super::arg::{Arg, CallSite};
use super::cache;
use super::dispatch::Generic;
use super::resolve::Resolver;
use crate::error::PtypeResult;
use crate::value::{Data, Frame, Value};

impl<'r> Resolver<'r> {
    /// ptype を確定させる
    ///
    /// 未確定の ptype は長さ0の論理ベクトルに、データフレームとレコードは列ごとに確定される。
    /// クラス付きの値は `vec_ptype_finalise` でディスパッチする。
    /// 結果が未確定の ptype を含むことはない。
    pub fn finalise(&self, x: &Value) -> PtypeResult<Value> {
        self.finalise_at(x, &Arg::Empty, 0)
    }

    fn finalise_at(&self, x: &Value, arg: &Arg, depth: usize) -> PtypeResult<Value> {
        match &x.data {
            Data::Null => Ok(Value::null()),
            Data::Unspecified(_) if !x.is_object() => Ok(finalise_unspecified()),
            Data::Frame(_) if x.is_data_frame() || !x.is_object() => self.df_finalise(x, arg, depth),
            _ if x.is_object() => self.finalise_dispatch(x, arg, depth),
            _ => Ok(x.clone()),
        }
    }

    /// クラス固有の確定メソッドがあるかどうか
    pub(super) fn has_finaliser(&self, x: &Value) -> bool {
        x.is_object()
            && self
                .registry
                .resolve_exact(Generic::Finalise, x.class())
                .is_some()
    }

    fn finalise_dispatch(&self, x: &Value, arg: &Arg, depth: usize) -> PtypeResult<Value> {
        let out = match self.registry.resolve(Generic::Finalise, x.class()) {
            Some(target) => target.invoke(x)?,
            None => cache::finalise_dispatch().invoke(x)?,
        };
        trace!("finalised {} to {}", x.ptype_abbr(), out.ptype_abbr());

        // メソッドの結果に未確定の部分が残っていても、ここで構造的に確定させる
        match &out.data {
            Data::Unspecified(_) => Ok(finalise_unspecified()),
            Data::Frame(_) => self.df_finalise(&out, arg, depth),
            _ => Ok(out),
        }
    }

    fn df_finalise(&self, x: &Value, arg: &Arg, depth: usize) -> PtypeResult<Value> {
        let Some(frame) = x.frame() else {
            return Ok(x.clone());
        };

        let call = CallSite::new("vec_ptype_finalise");
        let mut columns = IndexMap::with_capacity(frame.columns.len());
        for (name, column) in &frame.columns {
            let column_arg = arg.field(name);
            self.check_depth(depth + 1, &column_arg, &call)?;
            columns.insert(
                name.clone(),
                self.finalise_at(column, &column_arg, depth + 1)?,
            );
        }

        Ok(Value {
            data: Data::Frame(Frame {
                columns,
                nrow: frame.nrow,
            }),
            attrs: x.attrs.clone(),
        })
    }
}

fn finalise_unspecified() -> Value {
    Value::logical(Vec::new())
}
