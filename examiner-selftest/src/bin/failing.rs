//! A suite with one failing test between two passing ones, plus a scope of
//! assertion failures used to check diagnostics.

use std::process::ExitCode;

use examiner::{Registry, assertions::*};

#[allow(clippy::panic)]
fn main() -> ExitCode {
    let config = examiner::init();

    let mut registry = Registry::new();
    registry
        .test("seq", "a", || println!("ran seq.a"))
        .test("seq", "b", || {
            println!("ran seq.b");
            assert_equal_int(1, 2);
        })
        .test("seq", "c", || println!("ran seq.c"));

    registry
        .test("diag", "double", || assert_equal_double(1.0, 1.001))
        .test("diag", "mem", || {
            assert_equal_mem(&[0x01, 0x02, 0x03], &[0x01, 0xff, 0x03], 3);
        })
        .test("diag", "bool", || assert_false(true))
        .test("diag", "panic", || panic!("not an assertion"));

    examiner::run(&registry, &config)
}
