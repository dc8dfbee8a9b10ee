//! 2つの ptype の結合と共通 ptype のテスト

use super::*;
use pretty_assertions::assert_eq;
use protype::ptype::{vec_ptype, vec_ptype_common, ColumnPolicy, DEFAULT_MAX_DEPTH};
use protype::value::TIBBLE_CLASS;

fn builtins() -> &'static MethodRegistry {
    MethodRegistry::global()
}

#[test]
fn test_integer_and_double_widen_to_double() {
    let out = assert_commutative(&int(&[1]), &dbl(&[2.5]));
    assert_eq!(out, Value::double(vec![]));
}

#[test]
fn test_incompatible_atomic_types() {
    assert_ptype_error(
        combine_named(builtins(), PtypeOptions::default(), &int(&[1]), &chr(&["a"])),
        |e| {
            matches!(
                e,
                PtypeError::IncompatibleTypes { x_type, y_type, x_arg, y_arg, .. }
                    if x_type == "int" && y_type == "chr" && x_arg == "x" && y_arg == "y"
            )
        },
    );
}

#[test]
fn test_list_combines_only_with_list() {
    let list = Value::list(vec![int(&[1])]);
    assert_eq!(assert_commutative(&list, &Value::list(vec![])), Value::list(vec![]));
    assert!(vec_ptype2(&list, &int(&[1])).is_err());
}

#[test]
fn test_null_is_identity() {
    let x = chr(&["a"]);
    assert_eq!(assert_commutative(&Value::null(), &x), Value::character::<String>(vec![]));
    assert!(combine(&Value::null(), &Value::null()).is_null());
}

#[test]
fn test_unspecified_combinations() {
    // 両方が未確定なら未確定のまま
    assert!(assert_commutative(&na(2), &Value::unspecified(3)).is_unspecified());
    // 片方が未確定ならもう片方の型
    assert_eq!(assert_commutative(&na(1), &int(&[1])), Value::integer(vec![]));
    let factor = Value::factor(&["a"], vec![Some(1)]);
    assert_eq!(assert_commutative(&Value::unspecified(1), &factor), factor.slice_empty());
}

#[test]
fn test_identical_data_frames_combine_to_themselves() {
    let x = df(vec![("a", int(&[1, 2])), ("b", chr(&["u", "v"]))]);
    let y = df(vec![("a", int(&[3])), ("b", chr(&["w"]))]);

    let out = assert_commutative(&x, &y);
    assert_eq!(out, vec_ptype(&x).unwrap());
    assert_eq!(out.len(), 0);
    assert_eq!(out.ptype_abbr(), "df[,2]");
}

#[test]
fn test_data_frame_columns_are_widened() {
    let x = df(vec![("a", int(&[1])), ("b", na(1))]);
    let y = df(vec![("a", dbl(&[1.0])), ("b", chr(&["z"]))]);

    let out = assert_commutative(&x, &y);
    let columns = &out.frame().unwrap().columns;
    assert_eq!(columns["a"], Value::double(vec![]));
    assert_eq!(columns["b"], Value::character::<String>(vec![]));
}

#[test]
fn test_extra_column_fails_in_strict_mode() {
    let x = df(vec![("a", int(&[1]))]);
    let y = df(vec![("a", int(&[1])), ("c", chr(&["z"]))]);

    assert_ptype_error(
        combine_named(builtins(), PtypeOptions::default(), &x, &y),
        |e| {
            matches!(
                e,
                PtypeError::IncompatibleColumns { column, present_in, missing_from, .. }
                    if column == "c" && present_in == "y" && missing_from == "x"
            )
        },
    );
    assert_ptype_error(vec_ptype2(&y, &x), |e| {
        matches!(e, PtypeError::IncompatibleColumns { .. })
    });
}

#[test]
fn test_union_policy_keeps_x_columns_first() {
    let x = df(vec![("b", int(&[1])), ("a", int(&[1]))]);
    let y = df(vec![("c", chr(&["z"])), ("a", dbl(&[1.0]))]);
    let options = PtypeOptions::default().with_columns(ColumnPolicy::Union);

    let out = combine_named(builtins(), options, &x, &y).unwrap();
    let columns = &out.frame().unwrap().columns;
    assert_eq!(columns.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    assert_eq!(columns["a"], Value::double(vec![]));
}

#[test]
fn test_nested_column_error_names_full_path() {
    let x = df(vec![("a", df(vec![("b", int(&[1]))]))]);
    let y = df(vec![("a", df(vec![("b", chr(&["z"]))]))]);

    assert_ptype_error(
        combine_named(builtins(), PtypeOptions::default(), &x, &y),
        |e| {
            matches!(
                e,
                PtypeError::IncompatibleTypes { x_arg, y_arg, .. }
                    if x_arg == "x$a$b" && y_arg == "y$a$b"
            )
        },
    );
}

#[test]
fn test_recursion_guard_stops_deep_nesting() {
    let deep = nested_frame(10);
    let options = PtypeOptions::default().with_max_depth(3);

    assert_ptype_error(combine_named(builtins(), options, &deep, &deep), |e| {
        matches!(e, PtypeError::RecursionLimitExceeded { limit: 3, .. })
    });
    // 既定の上限では同じ入力を結合できる
    assert_eq!(combine(&deep, &deep), vec_ptype(&deep).unwrap());
}

/// 既定のスタックを持つスレッドで結合する
fn combine_on_thread(depth: usize, options: PtypeOptions) -> PtypeResult<Value> {
    std::thread::spawn(move || {
        let deep = nested_frame(depth);
        combine_named(builtins(), options, &deep, &deep)
    })
    .join()
    .expect("スタックを使い果たさずに終わるはず")
}

#[test]
fn test_default_limit_is_reachable_without_overflow() {
    // 最も深い列 `leaf` がちょうど上限の深さになる
    let out = combine_on_thread(DEFAULT_MAX_DEPTH - 1, PtypeOptions::default()).unwrap();
    assert_eq!(out, vec_ptype(&nested_frame(DEFAULT_MAX_DEPTH - 1)).unwrap());
}

#[test]
fn test_default_limit_rejects_deeper_input() {
    let result = combine_on_thread(DEFAULT_MAX_DEPTH + 10, PtypeOptions::default());
    assert_ptype_error(result, |e| {
        matches!(e, PtypeError::RecursionLimitExceeded { limit, .. } if *limit == DEFAULT_MAX_DEPTH)
    });
}

#[test]
fn test_very_deep_input_is_rejected_at_any_limit() {
    let options = PtypeOptions::default().with_max_depth(50);
    assert_ptype_error(combine_on_thread(1000, options), |e| {
        matches!(e, PtypeError::RecursionLimitExceeded { limit: 50, arg, .. } if arg.starts_with("x$inner"))
    });
}

#[test]
fn test_data_frame_class_is_common_suffix() {
    let x = df(vec![("a", int(&[1]))]).with_class(&["my_df", "data.frame"]);
    let y = df(vec![("a", int(&[1]))]).with_class(&["other_df", "data.frame"]);

    assert_eq!(assert_commutative(&x, &y).class(), &["data.frame".to_string()]);
}

#[test]
fn test_tibble_wins_over_data_frame() {
    let x = tibble(vec![("a", int(&[1]))]);
    let y = df(vec![("a", dbl(&[1.0]))]);

    let out = assert_commutative(&x, &y);
    assert_eq!(out.class(), TIBBLE_CLASS.map(String::from).as_slice());
    assert_eq!(out.ptype_full(), "tibble<\n  a: double\n>");
}

#[test]
fn test_factor_levels_are_unioned() {
    let x = Value::factor(&["a", "b"], vec![Some(1)]);
    let y = Value::factor(&["c", "a"], vec![Some(1)]);

    let out = assert_commutative(&x, &y);
    assert_eq!(out.levels(), vec!["a", "b", "c"]);

    let reversed = Value::factor(&["b", "a"], vec![Some(1)]);
    let ordered = Value::factor(&["a", "b"], vec![Some(1)]);
    assert_eq!(assert_commutative(&reversed, &ordered).levels(), vec!["a", "b"]);
}

#[test]
fn test_factor_and_character_give_character() {
    let factor = Value::factor(&["a"], vec![Some(1)]);
    let out = assert_commutative(&factor, &chr(&["b"]));
    assert_eq!(out, Value::character::<String>(vec![]));
}

#[test]
fn test_date_and_datetime() {
    let date = Value::date(vec![Some(1.0)]);
    let utc = Value::datetime(vec![Some(0.0)], "UTC");
    let local = Value::datetime(vec![Some(0.0)], "");
    let tokyo = Value::datetime(vec![Some(0.0)], "Asia/Tokyo");

    assert_eq!(combine(&date, &date), Value::date(vec![]));
    assert_eq!(assert_commutative(&date, &utc), Value::datetime(vec![], "UTC"));
    assert_eq!(assert_commutative(&local, &utc).tzone(), "UTC");
    assert_eq!(assert_commutative(&tokyo, &utc).tzone(), "Asia/Tokyo");
    assert!(vec_ptype2(&date, &int(&[1])).is_err());
}

#[test]
fn test_common_of_several_inputs() {
    let values = vec![na(1), int(&[1]), Value::null(), dbl(&[1.0])];
    assert_eq!(vec_ptype_common(&values).unwrap(), Value::double(vec![]));
}

#[test]
fn test_common_is_always_finalised() {
    assert_eq!(vec_ptype_common(&[na(2), na(1)]).unwrap(), Value::logical(vec![]));
    assert!(vec_ptype_common(&[]).unwrap().is_null());
}

#[test]
fn test_reduce_blames_input_that_set_the_type() {
    // ..2 が double を決めたので ..3 との衝突は ..2 のせいになる
    assert_ptype_error(
        vec_ptype_common(&[int(&[1]), dbl(&[1.0]), chr(&["a"])]),
        |e| {
            matches!(
                e,
                PtypeError::IncompatibleTypes { x_arg, y_arg, .. }
                    if x_arg == "..2" && y_arg == "..3"
            )
        },
    );

    // ..2 は型を変えなかったので ..1 のまま
    assert_ptype_error(
        vec_ptype_common(&[dbl(&[1.0]), int(&[1]), chr(&["a"])]),
        |e| {
            matches!(
                e,
                PtypeError::IncompatibleTypes { x_arg, y_arg, .. }
                    if x_arg == "..1" && y_arg == "..3"
            )
        },
    );
}

#[test]
fn test_explicit_ptype_overrides_inputs() {
    let combinator = Combinator::new(builtins(), PtypeOptions::default());
    let values = vec![int(&[1]), chr(&["a"])];

    assert!(combinator.ptype_common_with(&values, None).is_err());
    assert_eq!(
        combinator
            .ptype_common_with(&values, Some(&na(1)))
            .unwrap(),
        Value::logical(vec![])
    );
    assert_eq!(
        combinator
            .ptype_common_with(&values, Some(&dbl(&[1.0])))
            .unwrap(),
        Value::double(vec![])
    );
}

#[test]
fn test_named_inputs_appear_in_errors() {
    let combinator = Combinator::new(builtins(), PtypeOptions::default());
    let a = int(&[1]);
    let b = chr(&["z"]);

    let error = combinator
        .ptype_common_args(&[(Arg::name("a"), &a), (Arg::name("b"), &b)])
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "`a` <int> と `b` <chr> を結合できません (vec_ptype_common()の中)"
    );
}

#[test]
fn test_trace_records_every_step() {
    let combinator = Combinator::new(builtins(), PtypeOptions::default());
    let a = na(1);
    let b = int(&[1]);
    let c = dbl(&[1.0]);

    let trace = combinator
        .ptype_common_traced(&[
            (Arg::position(0), &a),
            (Arg::position(1), &b),
            (Arg::position(2), &c),
        ])
        .unwrap();

    assert_eq!(trace.ptype, Value::double(vec![]));
    assert_eq!(trace.steps.len(), 3);
    assert_eq!(trace.steps[0].current, None);
    assert_eq!(trace.steps[0].result, "???");
    assert_eq!(trace.steps[1].current.as_deref(), Some("???"));
    assert_eq!(trace.steps[2].result, "dbl");
}
