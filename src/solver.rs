//! Brute-force solver and answer checker for the reach-24 game.
//!
//! A board is four digits in `1..=9`. The solver enumerates every ordering of
//! the four digits, every choice of three binary operators and every
//! parenthesization shape, evaluating in `f64` so intermediate fractions such
//! as `8 / (3 - 8/3)` survive. Expression text is deduplicated before
//! evaluation so equivalent renderings are only tried once.

use std::collections::HashSet;
use std::iter::Peekable;
use std::str::Chars;

/// Value an expression has to reach.
pub const TARGET: f64 = 24.0;

/// Tolerance when comparing a candidate value against [`TARGET`].
const EPSILON: f64 = 1e-5;

const OPS: [char; 4] = ['+', '-', '*', '/'];

/// Number of distinct parenthesization shapes over four operands.
const SHAPES: usize = 5;

/// Why an expression failed to produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvalError {
    /// The text does not parse as an arithmetic expression.
    Malformed,
    /// A division by zero was hit while evaluating.
    DivisionByZero,
}

/// Searches for an expression over `nums` that reaches 24.
///
/// Returns the first matching expression as text, or `None` when the board is
/// unsolvable within `+ - * /` and parentheses.
pub fn solve(nums: [i64; 4]) -> Option<String> {
    let mut seen = HashSet::new();
    for ordered in orderings(nums) {
        let values = ordered.map(|n| n as f64);
        for &p in OPS.iter() {
            for &q in OPS.iter() {
                for &r in OPS.iter() {
                    let ops = [p, q, r];
                    for shape in 0..SHAPES {
                        let text = render_shape(shape, ordered, ops);
                        if !seen.insert(text.clone()) {
                            continue;
                        }
                        if let Some(value) = eval_shape(shape, values, ops) {
                            if hits_target(value) {
                                return Some(text);
                            }
                        }
                    }
                }
            }
        }
    }
    None
}

/// Checks a player-submitted expression against a board.
///
/// The expression must use only digits, the four operators, parentheses and
/// whitespace, must use exactly the board's digit multiset, and must evaluate
/// to 24. Division by zero anywhere in the expression makes it wrong. Boards
/// hold single-digit numbers, which is what makes the multiset check sound.
pub fn check_answer(expr: &str, nums: [i64; 4]) -> bool {
    if !charset_ok(expr) {
        return false;
    }
    if !digits_match(expr, nums) {
        return false;
    }
    match evaluate(expr) {
        Ok(value) => hits_target(value),
        Err(_) => false,
    }
}

pub(crate) fn hits_target(value: f64) -> bool {
    (value - TARGET).abs() < EPSILON
}

/// Character-level shape check: digits, operators, parentheses, whitespace.
pub(crate) fn charset_ok(expr: &str) -> bool {
    !expr.trim().is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_whitespace() || "+-*/()".contains(c))
}

/// Compares the digit multiset of `expr` against the board's digits.
pub(crate) fn digits_match(expr: &str, nums: [i64; 4]) -> bool {
    let mut used: Vec<u8> = expr.bytes().filter(|b| b.is_ascii_digit()).collect();
    let mut expected: Vec<u8> = nums.iter().map(|&n| b'0' + n as u8).collect();
    used.sort_unstable();
    expected.sort_unstable();
    used == expected
}

/// Evaluates an infix expression with `+ - * /` and parentheses.
pub(crate) fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let mut chars = expr.chars().peekable();
    let value = evaluate_expression(&mut chars)?;
    skip_whitespace(&mut chars);
    if chars.next().is_some() {
        // Trailing characters the grammar did not consume.
        return Err(EvalError::Malformed);
    }
    Ok(value)
}

fn evaluate_expression(chars: &mut Peekable<Chars>) -> Result<f64, EvalError> {
    let mut value = evaluate_term(chars)?;
    loop {
        skip_whitespace(chars);
        match chars.peek() {
            Some('+') => {
                chars.next();
                value += evaluate_term(chars)?;
            }
            Some('-') => {
                chars.next();
                value -= evaluate_term(chars)?;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn evaluate_term(chars: &mut Peekable<Chars>) -> Result<f64, EvalError> {
    let mut value = evaluate_primary(chars)?;
    loop {
        skip_whitespace(chars);
        match chars.peek() {
            Some('*') => {
                chars.next();
                value *= evaluate_primary(chars)?;
            }
            Some('/') => {
                chars.next();
                let divisor = evaluate_primary(chars)?;
                if divisor.abs() < f64::EPSILON {
                    return Err(EvalError::DivisionByZero);
                }
                value /= divisor;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn evaluate_primary(chars: &mut Peekable<Chars>) -> Result<f64, EvalError> {
    skip_whitespace(chars);
    match chars.peek() {
        Some('(') => {
            chars.next();
            let value = evaluate_expression(chars)?;
            skip_whitespace(chars);
            if chars.next() != Some(')') {
                return Err(EvalError::Malformed);
            }
            Ok(value)
        }
        Some(c) if c.is_ascii_digit() => evaluate_number(chars),
        _ => Err(EvalError::Malformed),
    }
}

fn evaluate_number(chars: &mut Peekable<Chars>) -> Result<f64, EvalError> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    digits.parse::<f64>().map_err(|_| EvalError::Malformed)
}

fn skip_whitespace(chars: &mut Peekable<Chars>) {
    while let Some(c) = chars.peek() {
        if c.is_ascii_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
}

/// All 24 orderings of the four board digits, duplicates included.
fn orderings(nums: [i64; 4]) -> Vec<[i64; 4]> {
    let mut out = Vec::with_capacity(24);
    for i in 0..4 {
        for j in 0..4 {
            if j == i {
                continue;
            }
            for k in 0..4 {
                if k == i || k == j {
                    continue;
                }
                let l = 6 - i - j - k;
                out.push([nums[i], nums[j], nums[k], nums[l]]);
            }
        }
    }
    out
}

fn apply(op: char, a: f64, b: f64) -> Option<f64> {
    match op {
        '+' => Some(a + b),
        '-' => Some(a - b),
        '*' => Some(a * b),
        '/' => {
            if b.abs() < f64::EPSILON {
                None
            } else {
                Some(a / b)
            }
        }
        _ => None,
    }
}

fn eval_shape(shape: usize, n: [f64; 4], ops: [char; 3]) -> Option<f64> {
    let [a, b, c, d] = n;
    let [p, q, r] = ops;
    match shape {
        0 => apply(q, apply(p, a, b)?, apply(r, c, d)?),
        1 => apply(r, apply(p, a, apply(q, b, c)?)?, d),
        2 => apply(r, apply(q, apply(p, a, b)?, c)?, d),
        3 => apply(p, a, apply(r, apply(q, b, c)?, d)?),
        4 => apply(p, a, apply(q, b, apply(r, c, d)?)?),
        _ => None,
    }
}

fn render_shape(shape: usize, n: [i64; 4], ops: [char; 3]) -> String {
    let [a, b, c, d] = n;
    let [p, q, r] = ops;
    match shape {
        0 => format!("({a} {p} {b}) {q} ({c} {r} {d})"),
        1 => format!("({a} {p} ({b} {q} {c})) {r} {d}"),
        2 => format!("(({a} {p} {b}) {q} {c}) {r} {d}"),
        3 => format!("{a} {p} (({b} {q} {c}) {r} {d})"),
        4 => format!("{a} {p} ({b} {q} ({c} {r} {d}))"),
        _ => String::new(),
    }
}
