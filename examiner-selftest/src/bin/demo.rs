//! A passing suite exercising every assertion kind, hooks and pending tests.

use std::{cell::Cell, process::ExitCode, rc::Rc};

use examiner::{Registry, assertions::*};

fn register_math(registry: &mut Registry) {
    registry
        .test("math", "add", || assert_equal_int(4, 2 + 2))
        .test("math", "sub", || assert_not_equal_int(0, 5 - 2))
        .test("math", "div", || assert_equal_double(0.333_33, 1.0 / 3.0))
        .test("math", "sqrt", || assert_not_equal_float(1.41, 2.0_f32.sqrt()))
        .pending("math", "overflow", || assert_true(false));
}

fn register_str(registry: &mut Registry) {
    registry
        .test("str", "concat", || {
            assert_equal_str("hello world", &["hello", "world"].join(" "));
        })
        .test("str", "case", || {
            assert_not_equal_str("Examiner", &"Examiner".to_lowercase());
        })
        .test("str", "empty", || {
            assert_true(String::new().is_empty());
            assert_false("x".is_empty());
        });
}

fn register_mem(registry: &mut Registry) {
    registry
        .test("mem", "same", || {
            let buf = [0xde, 0xad, 0xbe, 0xef];
            assert_equal_mem(&buf, &buf.clone(), buf.len());
        })
        .test("mem", "inverted", || {
            let buf: Vec<u8> = (0..32).collect();
            let inverted: Vec<u8> = buf.iter().map(|b| !b).collect();
            assert_not_equal_mem(&buf, &inverted, buf.len());
        });
}

fn register_counter(registry: &mut Registry) {
    let counter = Rc::new(Cell::new(0_i64));

    let reset = counter.clone();
    registry.before_each("counter", move || reset.set(10));

    let check = counter.clone();
    registry.after_each("counter", move || assert_true(check.get() > 10));

    let incremented = counter.clone();
    registry.test("counter", "increment", move || {
        incremented.set(incremented.get() + 1);
        assert_equal_int(11, incremented.get());
    });

    let doubled = counter;
    registry.test("counter", "double", move || {
        doubled.set(doubled.get() * 2);
        assert_equal_int(20, doubled.get());
    });
}

fn main() -> ExitCode {
    let config = examiner::init();

    let mut registry = Registry::new();
    register_math(&mut registry);
    register_str(&mut registry);
    register_mem(&mut registry);
    register_counter(&mut registry);

    examiner::run(&registry, &config)
}
