//! Tokenizer fuzz target: arbitrary UTF-8 must yield tokens or a grammar error, never a panic.
//! Build with: cargo fuzz run tokenize_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(tokens) = p4calc::tokenize(s) {
        assert_eq!(tokens.len(), 3);
    }
    let _ = p4calc::parse(s);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run tokenize_fuzz");
}
