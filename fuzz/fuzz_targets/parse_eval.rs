#![no_main]
use libfuzzer_sys::fuzz_target;
use reckon_eval::Value;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(expr) = reckon_syntax::parse::<Value>(s) {
            let printed = reckon_syntax::print(&expr);
            assert!(reckon_syntax::parse::<Value>(&printed).is_ok());

            let mut ctx = expr.context_default();
            for slot in 0..ctx.len() {
                let _ = ctx.assign(slot, slot as i64);
            }
            let _ = expr.evaluate(&mut ctx);
        }
    }
});
