#![no_main]
//! Arbitrary bytes presented as a BJSON blob: adoption either refuses
//! them or every downstream operation runs without panicking.

use bjson::{FuncCtx, OutputClass, ValueRef, extract, make_text, set, valid};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut ctx = FuncCtx::new();
    let j = ValueRef::Blob(data);
    let _ = valid(&mut ctx, &j, Some(4));
    let _ = make_text(&mut ctx, &j);
    let _ = extract(
        &mut ctx,
        &j,
        &[ValueRef::text("$.a[0]")],
        OutputClass::Text,
    );
    let _ = set(
        &mut ctx,
        &[j, ValueRef::text("$.a.b"), ValueRef::Integer(1)],
        OutputClass::Blob,
    );
});
