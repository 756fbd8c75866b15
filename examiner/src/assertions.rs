//! Assertions usable from test bodies and hooks.
//!
//! Every assertion is silent on success. On mismatch it hands a [`Mismatch`]
//! describing the problem, together with the caller's source location, to the
//! failure channel; control does not return to the caller.

use std::fmt::Display;

use crate::failure::{self, Failure};

/// Tolerance used by the floating-point assertions.
pub const EPSILON: f64 = 0.0001;

/// Maximum number of offsets listed in a memory-comparison diagnostic.
pub const MAX_REPORTED_OFFSETS: usize = 16;

/// A file/line pair identifying the call site of an assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file path as reported by the compiler.
    pub file: &'static str,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Location of the (track-caller) call site.
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The relation an assertion required between expected and actual values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Values had to be equal.
    Equal,
    /// Values had to differ.
    NotEqual,
}

/// One offset reported by a memory comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteOffset {
    /// Offset from the start of both buffers.
    pub offset: usize,
    /// Byte in the expected buffer.
    pub expected: u8,
    /// Byte in the actual buffer.
    pub actual: u8,
}

/// Outcome of a byte-by-byte comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByteReport {
    /// `Equal` lists differing offsets; `NotEqual` lists identical ones.
    pub relation: Relation,
    /// The first offsets violating the relation, at most [`MAX_REPORTED_OFFSETS`].
    pub offsets: Vec<ByteOffset>,
    /// Total number of offsets violating the relation.
    pub total: usize,
    /// Number of bytes compared.
    pub len: usize,
}

impl ByteReport {
    fn collect(expected: &[u8], actual: &[u8], relation: Relation) -> Self {
        let mut report = Self {
            relation,
            offsets: Vec::new(),
            total: 0,
            len: expected.len().min(actual.len()),
        };

        for (offset, (&e, &a)) in expected.iter().zip(actual).enumerate() {
            let violates = match relation {
                Relation::Equal => e != a,
                Relation::NotEqual => e == a,
            };
            if !violates {
                continue;
            }

            if report.offsets.len() < MAX_REPORTED_OFFSETS {
                report.offsets.push(ByteOffset {
                    offset,
                    expected: e,
                    actual: a,
                });
            }
            report.total += 1;
        }

        report
    }

    /// Whether more offsets violated the relation than were recorded.
    pub fn is_truncated(&self) -> bool {
        self.total > self.offsets.len()
    }
}

/// What an assertion found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// A boolean assertion saw the opposite value.
    Bool {
        /// The value that was required.
        expected: bool,
    },
    /// A scalar or string comparison failed.
    Values {
        /// Required relation.
        relation: Relation,
        /// Expected value, rendered.
        expected: String,
        /// Actual value, rendered.
        actual: String,
    },
    /// A memory comparison failed.
    Bytes(ByteReport),
    /// A memory comparison asked for more bytes than a buffer holds.
    Length {
        /// Requested number of bytes.
        len: usize,
        /// Size of the expected buffer.
        expected_len: usize,
        /// Size of the actual buffer.
        actual_len: usize,
    },
    /// The body panicked outside of an assertion.
    Panic(String),
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool { expected } => write!(f, "expected: {expected} received: {}", !expected),
            Self::Values {
                relation: Relation::Equal,
                expected,
                actual,
            } => write!(f, "Expected: {expected} Result: {actual}"),
            Self::Values {
                relation: Relation::NotEqual,
                expected,
                actual,
            } => write!(f, "Expected: not {expected} Result: {actual}"),
            Self::Bytes(report) => {
                let verdict = match report.relation {
                    Relation::Equal => "different",
                    Relation::NotEqual => "same",
                };
                write!(f, "{} of {} bytes are {verdict}", report.total, report.len)
            }
            Self::Length {
                len,
                expected_len,
                actual_len,
            } => write!(
                f,
                "cannot compare {len} bytes: expected holds {expected_len}, actual holds {actual_len}"
            ),
            Self::Panic(message) => write!(f, "panicked: {message}"),
        }
    }
}

#[track_caller]
fn fail(mismatch: Mismatch) -> ! {
    failure::fire(Failure::new(SourceLocation::caller(), mismatch))
}

#[track_caller]
fn check_values<T: Display>(holds: bool, relation: Relation, expected: T, actual: T) {
    if !holds {
        fail(Mismatch::Values {
            relation,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
}

// Both predicates are false for NaN differences, so neither assertion fails on them.
fn beyond_epsilon(expected: f64, actual: f64) -> bool {
    (expected - actual).abs() >= EPSILON
}

fn within_epsilon(expected: f64, actual: f64) -> bool {
    (expected - actual).abs() < EPSILON
}

/// Fails unless `value` is true.
#[track_caller]
pub fn assert_true(value: bool) {
    if !value {
        fail(Mismatch::Bool { expected: true });
    }
}

/// Fails unless `value` is false.
#[track_caller]
pub fn assert_false(value: bool) {
    if value {
        fail(Mismatch::Bool { expected: false });
    }
}

/// Fails when the values differ by [`EPSILON`] or more.
#[track_caller]
pub fn assert_equal_double(expected: f64, actual: f64) {
    check_values(
        !beyond_epsilon(expected, actual),
        Relation::Equal,
        Fixed(expected),
        Fixed(actual),
    );
}

/// Fails when the values are within [`EPSILON`] of each other.
#[track_caller]
pub fn assert_not_equal_double(expected: f64, actual: f64) {
    check_values(
        !within_epsilon(expected, actual),
        Relation::NotEqual,
        Fixed(expected),
        Fixed(actual),
    );
}

/// Single-precision variant of [`assert_equal_double`].
#[track_caller]
pub fn assert_equal_float(expected: f32, actual: f32) {
    assert_equal_double(f64::from(expected), f64::from(actual));
}

/// Single-precision variant of [`assert_not_equal_double`].
#[track_caller]
pub fn assert_not_equal_float(expected: f32, actual: f32) {
    assert_not_equal_double(f64::from(expected), f64::from(actual));
}

/// Fails unless the integers are identical.
#[track_caller]
pub fn assert_equal_int(expected: i64, actual: i64) {
    check_values(expected == actual, Relation::Equal, expected, actual);
}

/// Fails when the integers are identical.
#[track_caller]
pub fn assert_not_equal_int(expected: i64, actual: i64) {
    check_values(expected != actual, Relation::NotEqual, expected, actual);
}

/// Fails unless the strings are byte-for-byte identical.
#[track_caller]
pub fn assert_equal_str(expected: &str, actual: &str) {
    check_values(expected == actual, Relation::Equal, expected, actual);
}

/// Fails when the strings are byte-for-byte identical.
#[track_caller]
pub fn assert_not_equal_str(expected: &str, actual: &str) {
    check_values(expected != actual, Relation::NotEqual, expected, actual);
}

/// Fails if any of the first `len` bytes differ.
#[track_caller]
pub fn assert_equal_mem(expected: &[u8], actual: &[u8], len: usize) {
    compare_mem(expected, actual, len, Relation::Equal);
}

/// Fails if any of the first `len` bytes are the same.
#[track_caller]
pub fn assert_not_equal_mem(expected: &[u8], actual: &[u8], len: usize) {
    compare_mem(expected, actual, len, Relation::NotEqual);
}

#[track_caller]
fn compare_mem(expected: &[u8], actual: &[u8], len: usize, relation: Relation) {
    let (Some(e), Some(a)) = (expected.get(..len), actual.get(..len)) else {
        fail(Mismatch::Length {
            len,
            expected_len: expected.len(),
            actual_len: actual.len(),
        });
    };

    let report = ByteReport::collect(e, a, relation);
    if report.total > 0 {
        fail(Mismatch::Bytes(report));
    }
}

/// Renders a float the way `printf("%f")` does.
struct Fixed(f64);

impl Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
