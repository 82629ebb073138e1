//! Line diffs for mismatch messages.

use std::fmt::Write as _;

/// Render a line diff between expected and actual text. Lines are compared
/// by position; there is no realignment after insertions.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let mut left = expected.lines();
    let mut right = actual.lines();
    let mut out = String::from("--- expected\n+++ actual\n");
    let mut line = 0;
    loop {
        line += 1;
        let pair = (left.next(), right.next());
        if pair == (None, None) {
            break;
        }
        if pair.0 == pair.1 {
            continue;
        }
        let _ = writeln!(out, "@@ line {line} @@");
        if let Some(old) = pair.0 {
            let _ = writeln!(out, "-{old}");
        }
        if let Some(new) = pair.1 {
            let _ = writeln!(out, "+{new}");
        }
    }
    out
}
