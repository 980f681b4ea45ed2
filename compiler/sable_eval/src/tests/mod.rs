//! Evaluator scenario tests, run under both strategies where the
//! behavior is shared.

#[expect(clippy::expect_used, reason = "Tests use expect for brevity")]
mod call_tests;
mod hoisting_tests;
mod support;
