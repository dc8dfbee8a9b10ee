//! メソッドの登録・ディスパッチ・キャッシュのテスト

use super::*;
use pretty_assertions::assert_eq;
use protype::ptype::cache;
use protype::ptype::{Generic, Ptype2Ctx, DEFAULT_CLASS};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn chain(classes: &[&str]) -> Vec<String> {
    classes.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_registry_is_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MethodRegistry>();
}

#[test]
fn test_global_registry_is_shared() {
    assert!(std::ptr::eq(MethodRegistry::global(), MethodRegistry::global()));
    assert!(MethodRegistry::global().has_method(Generic::Finalise, DEFAULT_CLASS));
}

#[test]
fn test_default_finalise_target() {
    let target = cache::finalise_dispatch();
    assert!(target.is_default());
    assert_eq!(target.generic, Generic::Finalise);
    assert_eq!(cache::finalise_symbol(), "vec_ptype_finalise");
}

#[test]
fn test_resolution_is_cached_and_invalidated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = MethodRegistry::with_builtins();

    let target = registry.resolve(Generic::Ptype, &chain(&["money"])).unwrap();
    assert!(target.is_default());
    // "money" が見つからなかった結果と "default" の結果
    assert_eq!(registry.cached_len(), 2);

    // 2回目はキャッシュから返る
    let again = registry.resolve(Generic::Ptype, &chain(&["money"])).unwrap();
    assert_eq!(again.class, DEFAULT_CLASS);
    assert_eq!(registry.cached_len(), 2);

    // 登録するとキャッシュは破棄され、新しいメソッドが選ばれる
    let counter = Arc::clone(&calls);
    registry.register_ptype("money", move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(x.slice_empty())
    });
    assert_eq!(registry.cached_len(), 0);

    let target = registry.resolve(Generic::Ptype, &chain(&["money"])).unwrap();
    assert_eq!(target.class, "money");
    target.invoke(&dbl(&[1.0]).with_class(&["money"])).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cache_is_shared_across_threads() {
    let registry = MethodRegistry::with_builtins();
    let value = int(&[1]).with_class(&["shared"]);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let resolver = protype::ptype::Resolver::new(&registry);
                let ptype = resolver.ptype(&value, &Arg::Empty, &CallSite::none()).unwrap();
                assert_eq!(ptype.class(), &["shared".to_string()]);
            });
        }
    });
    assert_eq!(registry.cached_len(), 2);
}

#[test]
fn test_cache_is_keyed_by_class() {
    let mut registry = MethodRegistry::with_builtins();
    registry.register_ptype("money", |x| Ok(x.slice_empty()));

    let euro = registry.resolve(Generic::Ptype, &chain(&["euro", "money"])).unwrap();
    let yen = registry.resolve(Generic::Ptype, &chain(&["yen", "money"])).unwrap();
    assert_eq!(euro.class, "money");
    assert_eq!(yen.class, "money");
    // "euro"、"yen"、"money" の3件で、チェーンごとには増えない
    assert_eq!(registry.cached_len(), 3);
}

fn money_ptype2(x: &Value, y: &Value, ctx: &mut Ptype2Ctx<'_>) -> PtypeResult<Value> {
    // x は常に登録した順の "money" 側
    if !x.inherits("money") {
        return Err(ctx.incompatible(x, y));
    }
    Ok(Value::double(vec![]).with_class(&["money"]))
}

#[test]
fn test_pair_method_applies_in_both_orders() {
    let mut registry = MethodRegistry::with_builtins();
    registry.register_ptype2("money", "double", money_ptype2);

    let money = dbl(&[1.0]).with_class(&["money"]);
    let plain = dbl(&[2.0]);

    let target = registry
        .resolve_ptype2(&chain(&["double"]), &chain(&["money"]))
        .unwrap();
    assert!(target.swapped);

    let options = PtypeOptions::default();
    let forward = combine_named(&registry, options, &money, &plain).unwrap();
    let backward = combine_named(&registry, options, &plain, &money).unwrap();
    assert_eq!(forward, backward);
    assert_eq!(forward.class(), &["money".to_string()]);
}

#[test]
fn test_common_ancestor_method() {
    let mut registry = MethodRegistry::with_builtins();
    registry.register_ptype2("shape", "shape", |_, _, _| {
        Ok(Value::character::<String>(vec![]).with_class(&["shape"]))
    });

    let circle = chr(&["o"]).with_class(&["circle", "shape"]);
    let square = chr(&["□"]).with_class(&["square", "shape"]);

    let out = combine_named(&registry, PtypeOptions::default(), &circle, &square).unwrap();
    assert_eq!(out.class(), &["shape".to_string()]);
}

#[test]
fn test_pair_method_returning_non_empty_value_is_malformed() {
    let mut registry = MethodRegistry::with_builtins();
    // ptype は長さ0でも、メソッドは長さ1の値を返す
    registry.register_ptype2("worse", "worse", |_, _, _| {
        Ok(int(&[1]).with_class(&["worse"]))
    });

    let worse = int(&[1]).with_class(&["worse"]);
    assert_ptype_error(
        combine_named(&registry, PtypeOptions::default(), &worse, &worse),
        |e| matches!(e, PtypeError::MalformedPtype { .. }),
    );
}

fn boxed(inner: Value) -> Value {
    Value::list(vec![])
        .with_class(&["boxed"])
        .with_attr("inner", inner)
}

fn unbox(x: &Value) -> Value {
    x.attr("inner").cloned().unwrap_or_else(Value::null)
}

#[test]
fn test_pair_method_can_recurse_through_context() {
    let mut registry = MethodRegistry::with_builtins();
    // 中身の型を結合する包み型
    registry.register_ptype2("boxed", "boxed", |x, y, ctx| {
        let inner = ctx.ptype2(&unbox(x), &unbox(y))?;
        Ok(boxed(inner))
    });

    let x = boxed(Value::integer(vec![]));
    let y = boxed(Value::double(vec![]));

    let out = combine_named(&registry, PtypeOptions::default(), &x, &y).unwrap();
    assert_eq!(out.attr("inner"), Some(&Value::double(vec![])));

    let options = PtypeOptions::default().with_max_depth(0);
    assert_ptype_error(combine_named(&registry, options, &x, &y), |e| {
        matches!(e, PtypeError::RecursionLimitExceeded { .. })
    });
}
