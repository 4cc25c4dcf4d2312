//! Decode fuzz target: feed arbitrary bytes as a received frame to both schemas.
//! Decoding must not panic; it returns fields, a truncation error, or no match.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let frame = match p4calc::Frame::parse(data) {
        Ok(f) => f,
        Err(_) => return,
    };
    for topology in [p4calc::Topology::SingleStage, p4calc::Topology::Cascade] {
        let d = p4calc::Dispatcher::for_topology(topology);
        if let Ok(Some(values)) = d.decode(&frame) {
            // Anything decoded must encode back to the same prefix.
            let bytes = d.schema().encode(&values).expect("re-encode decoded fields");
            assert_eq!(&frame.payload[..bytes.len()], &bytes[..]);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
