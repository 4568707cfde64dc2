#![allow(missing_docs)]
//! End-to-end exercises of the scalar-function surface, driven the way
//! the host SQL engine would drive it.

use bjson::{
    Error, FuncCtx, OutputClass, SqlValue, ValueRef, array_length, error_position, extract, insert,
    make_blob, make_text, patch, remove, set, type_of, valid,
};

fn text<'a>(s: &'a str) -> ValueRef<'a> {
    ValueRef::text(s)
}

fn path<'a>(s: &'a str) -> ValueRef<'a> {
    ValueRef::text(s)
}

fn json_of(v: Option<SqlValue>) -> String {
    match v.expect("non-null result") {
        SqlValue::Text { text, tagged } => {
            assert!(tagged, "JSON results carry the sub-type tag");
            text
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn extract_by_path() {
    let mut ctx = FuncCtx::new();
    let j = text("{\"a\":{\"b\":[10,20,30]}}");
    let got = extract(&mut ctx, &j, &[path("$.a.b[1]")], OutputClass::Text)
        .unwrap()
        .unwrap();
    assert_eq!(got, SqlValue::Integer(20));
}

#[test]
fn extract_multiple_paths_builds_array() {
    let mut ctx = FuncCtx::new();
    let j = text("{\"a\":1,\"b\":\"x\"}");
    let got = extract(
        &mut ctx,
        &j,
        &[path("$.b"), path("$.missing"), path("$.a")],
        OutputClass::Text,
    )
    .unwrap();
    assert_eq!(json_of(got), "[\"x\",null,1]");
}

#[test]
fn extract_missing_single_path_is_null() {
    let mut ctx = FuncCtx::new();
    let j = text("{\"a\":1}");
    assert!(
        extract(&mut ctx, &j, &[path("$.q")], OutputClass::Text)
            .unwrap()
            .is_none()
    );
}

#[test]
fn array_length_cases() {
    let mut ctx = FuncCtx::new();
    assert_eq!(
        array_length(&mut ctx, &text("[1,2,3,4]"), None).unwrap(),
        Some(4)
    );
    assert_eq!(
        array_length(&mut ctx, &text("{\"a\":[9]}"), Some(&path("$.a"))).unwrap(),
        Some(1)
    );
    // Not an array: zero.
    assert_eq!(
        array_length(&mut ctx, &text("{\"a\":1}"), None).unwrap(),
        Some(0)
    );
    assert_eq!(
        array_length(&mut ctx, &text("[1]"), Some(&path("$.q"))).unwrap(),
        None
    );
}

#[test]
fn set_creates_and_overwrites() {
    let mut ctx = FuncCtx::new();
    let got = set(
        &mut ctx,
        &[text("{\"a\":1}"), path("$.b"), ValueRef::Integer(2)],
        OutputClass::Text,
    )
    .unwrap();
    assert_eq!(json_of(got), "{\"a\":1,\"b\":2}");
}

#[test]
fn remove_member() {
    let mut ctx = FuncCtx::new();
    let got = remove(
        &mut ctx,
        &[text("{\"a\":1,\"b\":2}"), path("$.a")],
        OutputClass::Text,
    )
    .unwrap();
    assert_eq!(json_of(got), "{\"b\":2}");
}

#[test]
fn merge_patch_function() {
    let mut ctx = FuncCtx::new();
    let got = patch(
        &mut ctx,
        &text("{\"a\":1,\"b\":2}"),
        &text("{\"b\":null,\"c\":3}"),
        OutputClass::Text,
    )
    .unwrap();
    assert_eq!(json_of(got), "{\"a\":1,\"c\":3}");
}

#[test]
fn type_names() {
    let mut ctx = FuncCtx::new();
    let j = text("{\"x\":[true,null,1.5]}");
    assert_eq!(
        type_of(&mut ctx, &j, Some(&path("$.x[2]"))).unwrap(),
        Some("real")
    );
    assert_eq!(
        type_of(&mut ctx, &j, Some(&path("$.x[0]"))).unwrap(),
        Some("true")
    );
    assert_eq!(type_of(&mut ctx, &j, None).unwrap(), Some("object"));
    assert_eq!(type_of(&mut ctx, &j, Some(&path("$.q"))).unwrap(), None);
}

#[test]
fn validity_flags() {
    let mut ctx = FuncCtx::new();
    assert_eq!(
        valid(&mut ctx, &text("{a:1,}"), Some(2)).unwrap(),
        Some(true)
    );
    assert_eq!(
        valid(&mut ctx, &text("{a:1,}"), Some(1)).unwrap(),
        Some(false)
    );
}

#[test]
fn error_position_scenario() {
    let mut ctx = FuncCtx::new();
    assert_eq!(
        error_position(&mut ctx, &text("[1,2,,3]")).unwrap(),
        Some(6)
    );
}

#[test]
fn multi_edit_applies_left_to_right() {
    // The second path resolves against the state left by the first.
    let mut ctx = FuncCtx::new();
    let got = insert(
        &mut ctx,
        &[
            text("{}"),
            path("$.a"),
            ValueRef::json("[]"),
            path("$.a[0]"),
            ValueRef::Integer(1),
        ],
        OutputClass::Text,
    )
    .unwrap();
    assert_eq!(json_of(got), "{\"a\":[1]}");
}

#[test]
fn blob_and_text_forms_agree() {
    let mut ctx = FuncCtx::new();
    let src = "{\"k\":[1,{\"d\":true}],\"s\":\"str\"}";
    let blob = make_blob(&mut ctx, &text(src)).unwrap().unwrap();
    let blob = blob.as_blob().unwrap().to_vec();

    // A blob document drives the same functions as text.
    let j = ValueRef::Blob(&blob);
    assert_eq!(
        extract(&mut ctx, &j, &[path("$.k[1].d")], OutputClass::Text).unwrap(),
        Some(SqlValue::Integer(1))
    );
    assert_eq!(json_of(make_text(&mut ctx, &j).unwrap()), src);

    // A blob-class edit result feeds back as a document.
    let edited = set(
        &mut ctx,
        &[j, path("$.s"), ValueRef::Integer(7)],
        OutputClass::Blob,
    )
    .unwrap()
    .unwrap();
    let j2 = ValueRef::Blob(edited.as_blob().unwrap());
    assert_eq!(
        json_of(make_text(&mut ctx, &j2).unwrap()),
        "{\"k\":[1,{\"d\":true}],\"s\":7}"
    );
}

#[test]
fn foreign_blob_is_refused() {
    let mut ctx = FuncCtx::new();
    assert_eq!(
        make_text(&mut ctx, &ValueRef::Blob(b"\x99\x98garbage")),
        Err(Error::Malformed)
    );
}

#[test]
fn null_inputs_are_null_results() {
    let mut ctx = FuncCtx::new();
    assert!(make_text(&mut ctx, &ValueRef::Null).unwrap().is_none());
    assert!(
        extract(&mut ctx, &ValueRef::Null, &[path("$")], OutputClass::Text)
            .unwrap()
            .is_none()
    );
    assert!(valid(&mut ctx, &ValueRef::Null, None).unwrap().is_none());
    assert!(
        error_position(&mut ctx, &ValueRef::Null)
            .unwrap()
            .is_none()
    );
}

#[test]
fn edit_failure_leaves_no_partial_result() {
    let mut ctx = FuncCtx::new();
    // Second path is malformed: the whole call fails.
    let r = set(
        &mut ctx,
        &[
            text("{\"a\":1}"),
            path("$.b"),
            ValueRef::Integer(2),
            path("$...x"),
            ValueRef::Integer(3),
        ],
        OutputClass::Text,
    );
    assert!(matches!(r, Err(Error::BadPath(_))));
}
