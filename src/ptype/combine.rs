//! 2つの ptype の結合と、複数の入力にわたる共通 ptype
//!
//! 結合は可換で、引数の順序はエラーメッセージにだけ影響する。
//! 入力は最初に一度だけ解決し、以降は ptype 同士を結合する。
//! データフレームの列の結合は再帰するため、[`Counters`] の深さで上限を設ける。

use std::fmt;

use indexmap::IndexMap;
use log::debug;

use super::arg::{Arg, CallSite};
use super::dispatch::{BinaryTarget, MethodRegistry};
use super::options::{ColumnPolicy, PtypeOptions};
use super::resolve::Resolver;
use crate::error::{PtypeError, PtypeResult};
use crate::value::{Attributes, Data, Frame, TypeTag, Value, DATA_FRAME_CLASS};

/// 1回の結合要求の状態
///
/// 共通の型を決めた入力と結合中の入力の引数パス、呼び出し元、再帰の深さを持つ。
/// トップレベルの要求ごとに作成し、要求をまたいで共有しない。
#[derive(Debug, Clone)]
pub struct Counters {
    curr_arg: Arg,
    next_arg: Arg,
    call: CallSite,
    depth: usize,
    max_depth: usize,
}

impl Counters {
    pub fn new(call: CallSite, max_depth: usize) -> Self {
        Self {
            curr_arg: Arg::Empty,
            next_arg: Arg::Empty,
            call,
            depth: 0,
            max_depth,
        }
    }

    /// 2つの引数を指定して作成
    pub fn with_args(x_arg: Arg, y_arg: Arg, call: CallSite, max_depth: usize) -> Self {
        Self {
            curr_arg: x_arg,
            next_arg: y_arg,
            ..Self::new(call, max_depth)
        }
    }

    pub fn curr_arg(&self) -> &Arg {
        &self.curr_arg
    }

    pub fn next_arg(&self) -> &Arg {
        &self.next_arg
    }

    pub fn call(&self) -> &CallSite {
        &self.call
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 次の入力に進む
    pub fn shift(&mut self, next_arg: Arg) {
        self.next_arg = next_arg;
    }

    /// 結合中の入力を共通の型を決めた入力にする
    pub fn promote_next(&mut self) {
        self.curr_arg = self.next_arg.clone();
    }

    fn enter(&mut self, arg: &Arg) -> PtypeResult<()> {
        if self.depth >= self.max_depth {
            return Err(PtypeError::RecursionLimitExceeded {
                limit: self.max_depth,
                arg: arg.to_string(),
                call: self.call.to_string(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// 結合メソッドに渡される呼び出しコンテキスト
pub struct Ptype2Ctx<'a> {
    combinator: &'a Combinator<'a>,
    counters: &'a mut Counters,
    x_arg: &'a Arg,
    y_arg: &'a Arg,
}

impl<'a> Ptype2Ctx<'a> {
    pub fn x_arg(&self) -> &Arg {
        self.x_arg
    }

    pub fn y_arg(&self) -> &Arg {
        self.y_arg
    }

    pub fn call(&self) -> &CallSite {
        &self.counters.call
    }

    /// 列ごとの結合（クラスは両者の共通部分）
    ///
    /// `x` と `y` はメソッドに渡された ptype であること。列は解決し直さない。
    pub fn frame_ptype2(&mut self, x: &Value, y: &Value) -> PtypeResult<Value> {
        self.combinator
            .frame_ptype2(x, y, self.x_arg, self.y_arg, self.counters)
    }

    /// 入れ子の値を結合する（再帰の深さに数える）
    pub fn ptype2(&mut self, x: &Value, y: &Value) -> PtypeResult<Value> {
        self.counters.enter(self.y_arg)?;
        let out = self
            .combinator
            .ptype2_values(x, y, self.x_arg, self.y_arg, self.counters);
        self.counters.leave();
        out
    }

    /// 結合できないことを表すエラー
    pub fn incompatible(&self, x: &Value, y: &Value) -> PtypeError {
        incompatible(x, y, self.x_arg, self.y_arg, &self.counters.call)
    }
}

/// ptype の結合器
#[derive(Clone, Copy)]
pub struct Combinator<'r> {
    resolver: Resolver<'r>,
    options: PtypeOptions,
}

impl<'r> Combinator<'r> {
    pub fn new(registry: &'r MethodRegistry, options: PtypeOptions) -> Self {
        Self {
            resolver: Resolver::new(registry).with_max_depth(options.max_depth),
            options,
        }
    }

    pub fn resolver(&self) -> &Resolver<'r> {
        &self.resolver
    }

    pub fn options(&self) -> &PtypeOptions {
        &self.options
    }

    /// この結合器の設定で新しい要求の状態を作成
    pub fn counters(&self, call: CallSite) -> Counters {
        Counters::new(call, self.options.max_depth)
    }

    /// 2つの値の共通 ptype
    ///
    /// 引数パスは `counters` から取る。両方が未確定なら結果も未確定のまま。
    pub fn ptype2(&self, x: &Value, y: &Value, counters: &mut Counters) -> PtypeResult<Value> {
        let x_arg = counters.curr_arg.clone();
        let y_arg = counters.next_arg.clone();
        self.ptype2_values(x, y, &x_arg, &y_arg, counters)
    }

    /// 両方の値を一度だけ解決してから結合する
    fn ptype2_values(
        &self,
        x: &Value,
        y: &Value,
        x_arg: &Arg,
        y_arg: &Arg,
        counters: &mut Counters,
    ) -> PtypeResult<Value> {
        let call = counters.call.clone();
        let px = self.resolver.ptype(x, x_arg, &call)?;
        let py = self.resolver.ptype(y, y_arg, &call)?;
        self.ptype2_resolved(&px, &py, x_arg, y_arg, counters)
    }

    /// 解決済みの ptype 同士の結合
    fn ptype2_resolved(
        &self,
        px: &Value,
        py: &Value,
        x_arg: &Arg,
        y_arg: &Arg,
        counters: &mut Counters,
    ) -> PtypeResult<Value> {
        if px.is_null() {
            return Ok(py.clone());
        }
        if py.is_null() {
            return Ok(px.clone());
        }

        let finalised;
        let (px, py) = match (px.is_unspecified(), py.is_unspecified()) {
            (true, true) => return Ok(Value::unspecified(0)),
            (true, false) => {
                if !self.resolver.has_finaliser(px) {
                    return Ok(py.clone());
                }
                finalised = self.resolver.finalise(px)?;
                (&finalised, py)
            }
            (false, true) => {
                if !self.resolver.has_finaliser(py) {
                    return Ok(px.clone());
                }
                finalised = self.resolver.finalise(py)?;
                (px, &finalised)
            }
            (false, false) => (px, py),
        };

        if px.is_data_frame() && py.is_data_frame() {
            return self.df_ptype2(px, py, x_arg, y_arg, counters);
        }

        if !px.is_object() && !py.is_object() {
            if let Some(out) = atomic_ptype2(px, py) {
                return Ok(out);
            }
        }

        if let Some(target) = self
            .resolver
            .registry
            .resolve_ptype2(&px.implicit_class(), &py.implicit_class())
        {
            return self.invoke_ptype2(&target, px, py, x_arg, y_arg, counters);
        }

        if px == py {
            return Ok(px.clone());
        }

        Err(incompatible(px, py, x_arg, y_arg, &counters.call))
    }

    fn df_ptype2(
        &self,
        x: &Value,
        y: &Value,
        x_arg: &Arg,
        y_arg: &Arg,
        counters: &mut Counters,
    ) -> PtypeResult<Value> {
        match self.resolver.registry.resolve_ptype2(x.class(), y.class()) {
            Some(target) => self.invoke_ptype2(&target, x, y, x_arg, y_arg, counters),
            None => self.frame_ptype2(x, y, x_arg, y_arg, counters),
        }
    }

    fn invoke_ptype2(
        &self,
        target: &BinaryTarget,
        x: &Value,
        y: &Value,
        x_arg: &Arg,
        y_arg: &Arg,
        counters: &mut Counters,
    ) -> PtypeResult<Value> {
        debug!("dispatching {:?} for `{}` and `{}`", target, x_arg, y_arg);
        let out = if target.swapped {
            let mut ctx = Ptype2Ctx {
                combinator: self,
                counters: &mut *counters,
                x_arg: y_arg,
                y_arg: x_arg,
            };
            (target.method)(y, x, &mut ctx)?
        } else {
            let mut ctx = Ptype2Ctx {
                combinator: self,
                counters: &mut *counters,
                x_arg,
                y_arg,
            };
            (target.method)(x, y, &mut ctx)?
        };

        if !out.is_empty() {
            return Err(PtypeError::MalformedPtype {
                classes: vec![target.x_class.clone(), target.y_class.clone()],
                reason: format!("結合メソッドが長さ{}の値を返しました", out.len()),
                arg: y_arg.to_string(),
                call: counters.call.to_string(),
            });
        }
        Ok(out)
    }

    /// データフレームの ptype を列名で対応づけて結合する
    fn frame_ptype2(
        &self,
        x: &Value,
        y: &Value,
        x_arg: &Arg,
        y_arg: &Arg,
        counters: &mut Counters,
    ) -> PtypeResult<Value> {
        let call = counters.call.clone();
        let (Some(x_frame), Some(y_frame)) = (x.frame(), y.frame()) else {
            return Err(incompatible(x, y, x_arg, y_arg, &call));
        };

        let mut columns = IndexMap::with_capacity(x_frame.columns.len());
        for (name, x_col) in &x_frame.columns {
            let col_x_arg = x_arg.field(name);
            let Some(y_col) = y_frame.columns.get(name) else {
                self.check_one_sided(name, x_arg, y_arg, &call)?;
                columns.insert(name.clone(), x_col.clone());
                continue;
            };

            let col_y_arg = y_arg.field(name);
            counters.enter(&col_y_arg)?;
            let out = self.ptype2_resolved(x_col, y_col, &col_x_arg, &col_y_arg, counters);
            counters.leave();
            columns.insert(name.clone(), out?);
        }

        for (name, y_col) in &y_frame.columns {
            if x_frame.columns.contains_key(name) {
                continue;
            }
            self.check_one_sided(name, y_arg, x_arg, &call)?;
            columns.insert(name.clone(), y_col.clone());
        }

        Ok(Value {
            data: Data::Frame(Frame::empty(columns)),
            attrs: Attributes {
                class: common_class_suffix(x.class(), y.class()),
                extra: IndexMap::new(),
            },
        })
    }

    fn check_one_sided(
        &self,
        column: &str,
        present_in: &Arg,
        missing_from: &Arg,
        call: &CallSite,
    ) -> PtypeResult<()> {
        match self.options.columns {
            ColumnPolicy::Union => Ok(()),
            ColumnPolicy::Strict => Err(PtypeError::IncompatibleColumns {
                column: column.to_string(),
                present_in: present_in.to_string(),
                missing_from: missing_from.to_string(),
                call: call.to_string(),
            }),
        }
    }

    /// 畳み込みの1ステップ
    ///
    /// 結合結果が `next` の ptype と一致した場合、以降のエラーは `next` の引数を指す。
    pub fn ptype2_common(
        &self,
        current: &Value,
        next: &Value,
        counters: &mut Counters,
    ) -> PtypeResult<Value> {
        self.ptype2_step(current, next, counters).map(|(out, _)| out)
    }

    /// 結合結果と `next` の ptype を返す
    fn ptype2_step(
        &self,
        current: &Value,
        next: &Value,
        counters: &mut Counters,
    ) -> PtypeResult<(Value, Value)> {
        let x_arg = counters.curr_arg.clone();
        let y_arg = counters.next_arg.clone();
        let call = counters.call.clone();

        let current = self.resolver.ptype(current, &x_arg, &call)?;
        let next = self.resolver.ptype(next, &y_arg, &call)?;
        let out = self.ptype2_resolved(&current, &next, &x_arg, &y_arg, counters)?;
        if !next.is_null() && out == next {
            counters.promote_next();
        }
        Ok((out, next))
    }

    /// 位置引数（`..1`、`..2`、…）の共通 ptype
    pub fn ptype_common(&self, values: &[Value]) -> PtypeResult<Value> {
        let inputs: Vec<(Arg, &Value)> = values
            .iter()
            .enumerate()
            .map(|(i, value)| (Arg::position(i), value))
            .collect();
        self.ptype_common_args(&inputs)
    }

    /// 明示的な ptype があればそれを使い、なければ入力から求める
    pub fn ptype_common_with(&self, values: &[Value], ptype: Option<&Value>) -> PtypeResult<Value> {
        match ptype {
            Some(ptype) => {
                let call = CallSite::new("vec_ptype_common");
                let ptype = self.resolver.ptype(ptype, &Arg::name(".ptype"), &call)?;
                self.resolver.finalise(&ptype)
            }
            None => self.ptype_common(values),
        }
    }

    /// 引数パス付きの入力の共通 ptype（確定済み）
    pub fn ptype_common_args(&self, inputs: &[(Arg, &Value)]) -> PtypeResult<Value> {
        let ptype = self.reduce(inputs, None)?;
        self.resolver.finalise(&ptype)
    }

    /// 共通 ptype と、畳み込みの各ステップの記録
    pub fn ptype_common_traced(&self, inputs: &[(Arg, &Value)]) -> PtypeResult<PtypeTrace> {
        let mut steps = Vec::with_capacity(inputs.len());
        let ptype = self.reduce(inputs, Some(&mut steps))?;
        Ok(PtypeTrace {
            ptype: self.resolver.finalise(&ptype)?,
            steps,
        })
    }

    fn reduce(
        &self,
        inputs: &[(Arg, &Value)],
        mut steps: Option<&mut Vec<TraceStep>>,
    ) -> PtypeResult<Value> {
        let mut counters = self.counters(CallSite::new("vec_ptype_common"));
        let mut current = Value::null();

        for (arg, next) in inputs {
            counters.shift(arg.clone());
            let (out, next_ptype) = self.ptype2_step(&current, next, &mut counters)?;
            if let Some(steps) = steps.as_mut() {
                steps.push(TraceStep {
                    current: (!current.is_null()).then(|| current.ptype_abbr()),
                    next: next_ptype.ptype_abbr(),
                    result: out.ptype_abbr(),
                });
            }
            current = out;
        }

        Ok(current)
    }
}

/// 畳み込みの1ステップの記録
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStep {
    pub current: Option<String>,
    pub next: String,
    pub result: String,
}

/// 共通 ptype の導出過程
#[derive(Debug, Clone, PartialEq)]
pub struct PtypeTrace {
    pub ptype: Value,
    pub steps: Vec<TraceStep>,
}

impl fmt::Display for PtypeTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prototype: <{}>", self.ptype.ptype_abbr())?;

        let bracket = |s: &str| format!("<{}>", s);
        let currents: Vec<String> = self
            .steps
            .iter()
            .map(|step| step.current.as_deref().map(bracket).unwrap_or_default())
            .collect();
        let nexts: Vec<String> = self.steps.iter().map(|step| bracket(&step.next)).collect();
        let current_width = currents.iter().map(String::len).max().unwrap_or(0);
        let next_width = nexts.iter().map(String::len).max().unwrap_or(0);

        for (i, step) in self.steps.iter().enumerate() {
            write!(
                f,
                "\n{}. ( {:<cw$} , {:<nw$} ) = <{}>",
                i,
                currents[i],
                nexts[i],
                step.result,
                cw = current_width,
                nw = next_width
            )?;
        }
        Ok(())
    }
}

/// クラスを持たない値の型の束: logical < integer < double
fn atomic_ptype2(x: &Value, y: &Value) -> Option<Value> {
    fn rank(tag: TypeTag) -> Option<u8> {
        match tag {
            TypeTag::Logical => Some(0),
            TypeTag::Integer => Some(1),
            TypeTag::Double => Some(2),
            _ => None,
        }
    }

    let (x_tag, y_tag) = (x.type_tag(), y.type_tag());
    let tag = match (rank(x_tag), rank(y_tag)) {
        (Some(x_rank), Some(y_rank)) => {
            if x_rank >= y_rank {
                x_tag
            } else {
                y_tag
            }
        }
        _ if x_tag == y_tag && matches!(x_tag, TypeTag::Character | TypeTag::List) => x_tag,
        _ => return None,
    };

    Some(Value::new(match tag {
        TypeTag::Logical => Data::Logical(Vec::new()),
        TypeTag::Integer => Data::Integer(Vec::new()),
        TypeTag::Double => Data::Double(Vec::new()),
        TypeTag::Character => Data::Character(Vec::new()),
        _ => Data::List(Vec::new()),
    }))
}

/// 2つのクラスチェーンの末尾の共通部分（データフレームなら少なくとも `data.frame`）
fn common_class_suffix(x: &[String], y: &[String]) -> Vec<String> {
    let mut suffix: Vec<String> = x
        .iter()
        .rev()
        .zip(y.iter().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.clone())
        .collect();
    suffix.reverse();

    if suffix.is_empty() {
        vec![DATA_FRAME_CLASS.to_string()]
    } else {
        suffix
    }
}

fn incompatible(x: &Value, y: &Value, x_arg: &Arg, y_arg: &Arg, call: &CallSite) -> PtypeError {
    PtypeError::IncompatibleTypes {
        x_type: x.ptype_abbr(),
        y_type: y.ptype_abbr(),
        x_arg: x_arg.to_string(),
        y_arg: y_arg.to_string(),
        call: call.to_string(),
    }
}
