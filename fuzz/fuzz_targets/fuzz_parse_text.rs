#![no_main]
//! Text input of any shape must either parse and re-render cleanly or be
//! rejected; it must never panic, and a successful parse must yield a
//! structurally consistent encoding.

use bjson::{FuncCtx, SqlValue, ValueRef, make_blob, make_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let mut ctx = FuncCtx::new();
    if let Ok(Some(SqlValue::Blob(blob))) = make_blob(&mut ctx, &ValueRef::text(text)) {
        // Whatever parsed must render, and the rendering must re-parse.
        let rendered = make_text(&mut ctx, &ValueRef::Blob(&blob))
            .unwrap()
            .unwrap();
        let rendered = rendered.as_text().unwrap();
        make_text(&mut ctx, &ValueRef::text(rendered))
            .expect("canonical output must re-parse")
            .expect("non-null");
    }
});
