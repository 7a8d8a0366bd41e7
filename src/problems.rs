//! Problem generation and answer grading for every game variant.
//!
//! Quiz sessions walk a fixed 30-step program: steps 1-10 are prime
//! factorizations, step 11 is a polynomial root-sum question, steps 12-30 come
//! from a canned multiple-choice pool. The adaptive variant picks an
//! arithmetic kind from a difficulty ladder whose reach grows with the
//! session score.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::solver;
use crate::solver::EvalError;

/// Game variants a participant can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Reach 24 from four digits, fixed time budget.
    TwentyFour,
    /// Rapid-fire addition, fixed time budget.
    Addition,
    /// 30-step quiz with three lives.
    Quiz,
    /// Arithmetic with score-scaled difficulty and earned time.
    Adaptive,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::TwentyFour => "twenty_four",
            GameKind::Addition => "addition",
            GameKind::Quiz => "quiz",
            GameKind::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "24" | "twenty_four" | "twentyfour" | "twenty-four" => Ok(GameKind::TwentyFour),
            "addition" | "add" => Ok(GameKind::Addition),
            "quiz" => Ok(GameKind::Quiz),
            "adaptive" => Ok(GameKind::Adaptive),
            other => Err(format!("unknown game kind: {}", other)),
        }
    }
}

/// What family a single problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Factorization,
    RootSum,
    MultipleChoice,
    TwentyFour,
    Addition,
    Arithmetic,
}

impl FromStr for ProblemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "factorization" => Ok(ProblemKind::Factorization),
            "root_sum" | "rootsum" => Ok(ProblemKind::RootSum),
            "multiple_choice" | "multiplechoice" => Ok(ProblemKind::MultipleChoice),
            "24" | "twenty_four" | "twentyfour" | "twenty-four" => Ok(ProblemKind::TwentyFour),
            "addition" | "add" => Ok(ProblemKind::Addition),
            "arithmetic" => Ok(ProblemKind::Arithmetic),
            other => Err(format!("unknown problem kind: {}", other)),
        }
    }
}

/// Expected answer for a problem, matched against the player's raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Answer {
    /// A single integer.
    Value(i64),
    /// Prime factors in ascending order, submitted space-separated.
    Factors(Vec<u64>),
    /// A multiple-choice letter in `A..=E`.
    Choice(char),
    /// A reach-24 board; any expression over these digits that makes 24 wins.
    Expression([i64; 4]),
}

/// One generated problem, ready to show to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub prompt: String,
    pub answer: Answer,
    pub points: i64,
}

/// Outcome of grading one submission against a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Correct,
    Wrong,
    /// The text does not have the right shape for this problem. The player
    /// gets a retry hint and loses nothing.
    Invalid,
}

impl Problem {
    /// Grades raw player text against this problem's expected answer.
    pub fn grade(&self, text: &str) -> Grade {
        let trimmed = text.trim();
        match &self.answer {
            Answer::Value(expected) => match trimmed.parse::<i64>() {
                Ok(v) if v == *expected => Grade::Correct,
                Ok(_) => Grade::Wrong,
                Err(_) => Grade::Invalid,
            },
            Answer::Factors(expected) => {
                if trimmed.is_empty() {
                    return Grade::Invalid;
                }
                let parsed: Result<Vec<u64>, _> =
                    trimmed.split_whitespace().map(|t| t.parse::<u64>()).collect();
                match parsed {
                    Ok(factors) if &factors == expected => Grade::Correct,
                    Ok(_) => Grade::Wrong,
                    Err(_) => Grade::Invalid,
                }
            }
            Answer::Choice(expected) => {
                let mut chars = trimmed.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => {
                        let letter = c.to_ascii_uppercase();
                        if !('A'..='E').contains(&letter) {
                            Grade::Invalid
                        } else if letter == *expected {
                            Grade::Correct
                        } else {
                            Grade::Wrong
                        }
                    }
                    _ => Grade::Invalid,
                }
            }
            Answer::Expression(nums) => {
                if !solver::charset_ok(trimmed) {
                    return Grade::Invalid;
                }
                match solver::evaluate(trimmed) {
                    Err(EvalError::Malformed) => Grade::Invalid,
                    // Dividing by zero is a wrong answer, not a format error.
                    Err(EvalError::DivisionByZero) => Grade::Wrong,
                    Ok(value) => {
                        if solver::digits_match(trimmed, *nums) && solver::hits_target(value) {
                            Grade::Correct
                        } else {
                            Grade::Wrong
                        }
                    }
                }
            }
        }
    }

    /// Short format reminder shown when a submission is [`Grade::Invalid`].
    pub fn retry_hint(&self) -> &'static str {
        match self.answer {
            Answer::Value(_) => "Send a whole number.",
            Answer::Factors(_) => "Send the prime factors in ascending order, separated by spaces, e.g. 2 2 7.",
            Answer::Choice(_) => "Send a single letter from A to E.",
            Answer::Expression(_) => "Send an expression built from the four digits with +, -, *, / and parentheses.",
        }
    }
}

/// Generates the next problem for an active session.
///
/// `step` drives the quiz program, `score` drives adaptive difficulty; the
/// other variants ignore both.
pub fn generate(kind: GameKind, step: u32, score: i64, rng: &mut impl Rng) -> Problem {
    match kind {
        GameKind::TwentyFour => twenty_four(rng),
        GameKind::Addition => addition(rng),
        GameKind::Quiz => quiz_problem(step, rng),
        GameKind::Adaptive => adaptive(score, rng),
    }
}

/// Generates a standalone problem for a broadcast contest announcement.
pub fn broadcast(kind: ProblemKind, rng: &mut impl Rng) -> Problem {
    match kind {
        ProblemKind::Factorization => factorization(rng),
        ProblemKind::RootSum => root_sum(rng),
        ProblemKind::MultipleChoice => multiple_choice_at(rng.gen_range(0..MC_POOL.len()), rng),
        ProblemKind::TwentyFour => twenty_four(rng),
        ProblemKind::Addition => addition(rng),
        ProblemKind::Arithmetic => adaptive(BROADCAST_ARITHMETIC_SCORE, rng),
    }
}

/// Difficulty stand-in used when an arithmetic problem is broadcast outside a
/// session and no score is available.
const BROADCAST_ARITHMETIC_SCORE: i64 = 25;

/// Quiz program: factorizations, then one root-sum, then multiple choice.
fn quiz_problem(step: u32, rng: &mut impl Rng) -> Problem {
    match step {
        0..=10 => factorization(rng),
        11 => root_sum(rng),
        later => multiple_choice_at((later as usize - 12) % MC_POOL.len(), rng),
    }
}

/// Prime-factorization question over a random composite in `100..10_000`.
pub fn factorization(rng: &mut impl Rng) -> Problem {
    let n = rng.gen_range(100..10_000u64);
    Problem {
        kind: ProblemKind::Factorization,
        prompt: format!(
            "Break {} down into prime factors. Send them in ascending order separated by spaces, e.g. 2 2 7.",
            n
        ),
        answer: Answer::Factors(prime_factors(n)),
        points: 1,
    }
}

/// Prime factors of `n` in ascending order, with multiplicity.
pub fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut d = 2;
    while d * d <= n {
        while n % d == 0 {
            factors.push(d);
            n /= d;
        }
        d += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Root-sum question over a random polynomial of order 5 to 16.
///
/// Only the two leading coefficients matter for the answer; the rest flavor
/// the prompt. The expected reply encodes the reduced fraction p/q as the
/// single number `100 * p + q` with `q > 0`.
pub fn root_sum(rng: &mut impl Rng) -> Problem {
    let order = rng.gen_range(5..=16usize);
    let coeffs: Vec<i64> = (0..=order).map(|_| nonzero_coeff(rng)).collect();
    Problem {
        kind: ProblemKind::RootSum,
        prompt: format!(
            "Find the sum of all roots (with multiplicity, complex included) of\np(x) = {}\nWrite the sum as a reduced fraction p/q with q > 0, then send the single number 100*p + q.",
            render_poly(&coeffs)
        ),
        answer: Answer::Value(encode_root_sum(coeffs[0], coeffs[1])),
        points: 2,
    }
}

fn nonzero_coeff(rng: &mut impl Rng) -> i64 {
    loop {
        let c = rng.gen_range(-99..=99i64);
        if c != 0 {
            return c;
        }
    }
}

/// Encodes the Vieta root sum `-next/lead` as `100 * p + q` for the reduced
/// fraction p/q with a positive denominator.
pub fn encode_root_sum(lead: i64, next: i64) -> i64 {
    let mut num = -next;
    let mut den = lead;
    let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i64;
    num /= g;
    den /= g;
    if den < 0 {
        num = -num;
        den = -den;
    }
    100 * num + den
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Renders a polynomial from coefficients in descending power order.
///
/// Zero coefficients are skipped, unit coefficients drop the `1` in front of
/// `x`, and an all-zero input renders as `0`.
pub fn render_poly(coeffs: &[i64]) -> String {
    let degree = coeffs.len() - 1;
    let mut out = String::new();
    for (i, &c) in coeffs.iter().enumerate() {
        if c == 0 {
            continue;
        }
        let power = degree - i;
        if out.is_empty() {
            if c < 0 {
                out.push('-');
            }
        } else {
            out.push_str(if c < 0 { " - " } else { " + " });
        }
        let magnitude = c.unsigned_abs();
        if magnitude != 1 || power == 0 {
            out.push_str(&magnitude.to_string());
        }
        match power {
            0 => {}
            1 => out.push('x'),
            _ => {
                out.push_str("x^");
                out.push_str(&power.to_string());
            }
        }
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

struct McItem {
    question: &'static str,
    // The first option is the correct one; presentation order is shuffled.
    options: [&'static str; 5],
}

const MC_POOL: [McItem; 19] = [
    McItem {
        question: "What is the derivative of sin(x)?",
        options: ["cos(x)", "-cos(x)", "sin(x)", "-sin(x)", "tan(x)"],
    },
    McItem {
        question: "What is the derivative of e^(2x)?",
        options: ["2e^(2x)", "e^(2x)", "2e^x", "e^(2x)/2", "2xe^(2x)"],
    },
    McItem {
        question: "What is the integral of 2x dx?",
        options: ["x^2 + C", "2x^2 + C", "x^2/2 + C", "2x + C", "x + C"],
    },
    McItem {
        question: "What is the limit of sin(x)/x as x approaches 0?",
        options: ["1", "0", "infinity", "-1", "it does not exist"],
    },
    McItem {
        question: "What is the derivative of ln(x) for x > 0?",
        options: ["1/x", "ln(x)/x", "1/x^2", "x ln(x)", "e^x"],
    },
    McItem {
        question: "What is the value of the integral of 3x^2 from 0 to 1?",
        options: ["1", "3", "1/3", "3/2", "0"],
    },
    McItem {
        question: "What is the slope of f(x) = x^5 at x = 1?",
        options: ["5", "1", "4", "20", "0"],
    },
    McItem {
        question: "What is the sum of the roots of x^2 - 7x + 10 = 0?",
        options: ["7", "10", "-7", "5", "2"],
    },
    McItem {
        question: "What is the product of the roots of x^2 - 7x + 10 = 0?",
        options: ["10", "7", "-10", "5", "2"],
    },
    McItem {
        question: "What is the derivative of tan(x)?",
        options: ["sec^2(x)", "sec(x)tan(x)", "cot(x)", "-csc^2(x)", "tan^2(x)"],
    },
    McItem {
        question: "What is the limit of (1 + 1/n)^n as n goes to infinity?",
        options: ["e", "1", "0", "infinity", "2"],
    },
    McItem {
        question: "What is the integral of cos(x) dx?",
        options: ["sin(x) + C", "-sin(x) + C", "cos(x) + C", "-cos(x) + C", "tan(x) + C"],
    },
    McItem {
        question: "What is the second derivative of x^3?",
        options: ["6x", "3x^2", "6", "3x", "x^2"],
    },
    McItem {
        question: "What is 2 to the power of 10?",
        options: ["1024", "512", "2048", "1000", "100"],
    },
    McItem {
        question: "What is the greatest common divisor of 84 and 36?",
        options: ["12", "6", "4", "18", "24"],
    },
    McItem {
        question: "At which x does the parabola y = x^2 - 6x + 1 reach its minimum?",
        options: ["3", "-3", "6", "-6", "1"],
    },
    McItem {
        question: "What is the derivative of x e^x?",
        options: ["(x + 1)e^x", "e^x", "x e^x", "(x - 1)e^x", "x e^(x-1)"],
    },
    McItem {
        question: "What is the value of the integral of 1/x from 1 to e?",
        options: ["1", "e", "e - 1", "0", "1/e"],
    },
    McItem {
        question: "What is the slope of the line y = 3x + 2?",
        options: ["3", "2", "5", "1/3", "-3"],
    },
];

/// Multiple-choice question from the pool with shuffled option order.
fn multiple_choice_at(idx: usize, rng: &mut impl Rng) -> Problem {
    let item = &MC_POOL[idx];
    let mut order: Vec<usize> = (0..item.options.len()).collect();
    order.shuffle(rng);

    let mut prompt = String::from(item.question);
    let mut correct = 'A';
    for (slot, &option) in order.iter().enumerate() {
        let letter = (b'A' + slot as u8) as char;
        if option == 0 {
            correct = letter;
        }
        prompt.push_str(&format!("\n{}) {}", letter, item.options[option]));
    }
    prompt.push_str("\nSend the letter of the correct option.");

    Problem {
        kind: ProblemKind::MultipleChoice,
        prompt,
        answer: Answer::Choice(correct),
        points: 1,
    }
}

/// Probability that an unsolvable reach-24 draw is thrown away and redrawn.
const SOLVABLE_REDRAW_CHANCE: f64 = 0.8;

/// Reach-24 board of four digits in `1..=9`.
///
/// Unsolvable draws are mostly redrawn, so an occasional board has no
/// solution and the player has to recognize that and pass.
pub fn twenty_four(rng: &mut impl Rng) -> Problem {
    let nums = loop {
        let draw = [
            rng.gen_range(1..=9i64),
            rng.gen_range(1..=9i64),
            rng.gen_range(1..=9i64),
            rng.gen_range(1..=9i64),
        ];
        if solver::solve(draw).is_some() || !rng.gen_bool(SOLVABLE_REDRAW_CHANCE) {
            break draw;
        }
    };
    Problem {
        kind: ProblemKind::TwentyFour,
        prompt: format!(
            "Make 24 out of {}, {}, {} and {} using +, -, *, / and parentheses. Use every number exactly once. Send `pass` to get new numbers.",
            nums[0], nums[1], nums[2], nums[3]
        ),
        answer: Answer::Expression(nums),
        points: 1,
    }
}

/// Simple addition of two numbers in `1..=10`.
pub fn addition(rng: &mut impl Rng) -> Problem {
    let a = rng.gen_range(1..=10i64);
    let b = rng.gen_range(1..=10i64);
    Problem {
        kind: ProblemKind::Addition,
        prompt: format!("{} + {} = ?", a, b),
        answer: Answer::Value(a + b),
        points: 1,
    }
}

/// Arithmetic kinds on the adaptive difficulty ladder, easiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArithmeticKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Sqrt,
    TripleProduct,
    QuadraticRoot,
}

const LADDER: [ArithmeticKind; 8] = [
    ArithmeticKind::Add,
    ArithmeticKind::Sub,
    ArithmeticKind::Mul,
    ArithmeticKind::Div,
    ArithmeticKind::Pow,
    ArithmeticKind::Sqrt,
    ArithmeticKind::TripleProduct,
    ArithmeticKind::QuadraticRoot,
];

/// Picks an arithmetic kind for the given score.
///
/// Draws uniformly from `[0, (score + 10)^(1/2.2) - 1.5)` and floors into the
/// ladder, so harder kinds only become reachable as the score grows.
pub fn pick_arithmetic(score: i64, rng: &mut impl Rng) -> ArithmeticKind {
    let upper = ((score as f64 + 10.0).powf(1.0 / 2.2) - 1.5).max(1.0);
    let selector = rng.gen_range(0.0..upper);
    let idx = (selector as usize).min(LADDER.len() - 1);
    LADDER[idx]
}

/// Power-law operand scaling: `base + score^exp`, floored.
fn scaled(score: i64, base: i64, exp: f64) -> i64 {
    base + (score.max(0) as f64).powf(exp) as i64
}

/// Adaptive arithmetic problem whose kind and operand sizes grow with score.
pub fn adaptive(score: i64, rng: &mut impl Rng) -> Problem {
    let kind = pick_arithmetic(score, rng);
    let (prompt, value, points) = match kind {
        ArithmeticKind::Add => {
            let hi = scaled(score, 10, 1.2);
            let a = rng.gen_range(1..=hi);
            let b = rng.gen_range(1..=hi);
            (format!("{} + {} = ?", a, b), a + b, 1)
        }
        ArithmeticKind::Sub => {
            let hi = scaled(score, 10, 1.2);
            let a = rng.gen_range(2..=hi.max(2));
            let b = rng.gen_range(1..=a);
            (format!("{} - {} = ?", a, b), a - b, 1)
        }
        ArithmeticKind::Mul => {
            let hi = scaled(score, 5, 0.9);
            let a = rng.gen_range(2..=hi);
            let b = rng.gen_range(2..=hi);
            (format!("{} * {} = ?", a, b), a * b, 1)
        }
        ArithmeticKind::Div => {
            let hi = scaled(score, 3, 0.7);
            let divisor = rng.gen_range(2..=hi);
            let quotient = rng.gen_range(2..=hi);
            (format!("{} / {} = ?", divisor * quotient, divisor), quotient, 1)
        }
        ArithmeticKind::Pow => {
            let base = rng.gen_range(2..=scaled(score, 3, 0.35));
            let exp = rng.gen_range(2..=scaled(score, 2, 0.25));
            (format!("{} ^ {} = ?", base, exp), base.pow(exp as u32), 1)
        }
        ArithmeticKind::Sqrt => {
            let root = rng.gen_range(2..=scaled(score, 4, 0.55));
            (format!("The square root of {} = ?", root * root), root, 1)
        }
        ArithmeticKind::TripleProduct => {
            let hi = scaled(score, 3, 0.5);
            let a = rng.gen_range(2..=hi);
            let b = rng.gen_range(2..=hi);
            let c = rng.gen_range(2..=hi);
            (format!("{} * {} * {} = ?", a, b, c), a * b * c, 2)
        }
        ArithmeticKind::QuadraticRoot => {
            let hi = scaled(score, 5, 0.45);
            let r1 = rng.gen_range(-hi..=hi);
            let r2 = loop {
                let r = rng.gen_range(-hi..=hi);
                if r != r1 {
                    break r;
                }
            };
            let poly = render_poly(&[1, -(r1 + r2), r1 * r2]);
            (
                format!("What is the largest root of {} = 0?", poly),
                r1.max(r2),
                2,
            )
        }
    };
    Problem {
        kind: ProblemKind::Arithmetic,
        prompt,
        answer: Answer::Value(value),
        points,
    }
}

/// Seconds of extra time earned by a correct adaptive answer.
///
/// Uses the score after the answer was credited, so early answers earn small
/// bonuses and a long streak keeps the clock alive.
pub fn time_bonus_secs(score: i64, points: i64) -> f64 {
    (score.max(0) as f64).powf(0.53) * points as f64 / 1.6
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::test_case;
    use rand::thread_rng;

    #[test_case(360, "2 2 2 3 3 5")]
    #[test_case(97, "97")]
    #[test_case(100, "2 2 5 5")]
    fn prime_factors_ascending_with_multiplicity(n: u64, expected: &str) {
        let factors = prime_factors(n);
        let rendered: Vec<String> = factors.iter().map(|f| f.to_string()).collect();
        assert_eq!(rendered.join(" "), expected);
        assert_eq!(factors.iter().product::<u64>(), n);
    }

    #[test]
    fn factorization_grades_sorted_reply_only() {
        let mut rng = thread_rng();
        let problem = factorization(&mut rng);
        let Answer::Factors(factors) = &problem.answer else {
            panic!("factorization should expect factors");
        };
        let sorted: Vec<String> = factors.iter().map(|f| f.to_string()).collect();
        assert_eq!(problem.grade(&sorted.join(" ")), Grade::Correct);
        if factors.len() > 1 && factors.first() != factors.last() {
            let reversed: Vec<String> = factors.iter().rev().map(|f| f.to_string()).collect();
            assert_eq!(problem.grade(&reversed.join(" ")), Grade::Wrong);
        }
        assert_eq!(problem.grade("two three"), Grade::Invalid);
        assert_eq!(problem.grade(""), Grade::Invalid);
    }

    #[test]
    fn root_sum_encoding_reduces_and_signs() {
        // x^2 sums: -next/lead, reduced, denominator kept positive.
        assert_eq!(encode_root_sum(2, -7), 702);
        assert_eq!(encode_root_sum(-4, -6), -298);
        assert_eq!(encode_root_sum(4, 2), -98);
        assert_eq!(encode_root_sum(1, -1), 101);
    }

    #[test]
    fn root_sum_problem_asks_for_encoded_value() {
        let mut rng = thread_rng();
        let problem = root_sum(&mut rng);
        assert_eq!(problem.kind, ProblemKind::RootSum);
        assert_eq!(problem.points, 2);
        assert!(problem.prompt.contains("p(x) ="));
        let Answer::Value(encoded) = problem.answer else {
            panic!("root sum should expect a single value");
        };
        assert_eq!(problem.grade(&encoded.to_string()), Grade::Correct);
        assert_eq!(problem.grade("not a number"), Grade::Invalid);
    }

    #[test]
    fn polynomial_rendering() {
        assert_eq!(render_poly(&[1, -5, 6]), "x^2 - 5x + 6");
        assert_eq!(render_poly(&[-7, 0, 3]), "-7x^2 + 3");
        assert_eq!(render_poly(&[1, 1]), "x + 1");
        assert_eq!(render_poly(&[2]), "2");
        assert_eq!(render_poly(&[0]), "0");
        assert_eq!(render_poly(&[-1, 0, 0]), "-x^2");
    }

    #[test]
    fn multiple_choice_lists_five_options_and_grades_letters() {
        let mut rng = thread_rng();
        let problem = multiple_choice_at(0, &mut rng);
        for letter in ['A', 'B', 'C', 'D', 'E'] {
            assert!(
                problem.prompt.contains(&format!("\n{}) ", letter)),
                "missing option {} in {}",
                letter,
                problem.prompt
            );
        }
        let Answer::Choice(correct) = problem.answer else {
            panic!("multiple choice should expect a letter");
        };
        assert_eq!(problem.grade(&correct.to_string()), Grade::Correct);
        assert_eq!(
            problem.grade(&correct.to_ascii_lowercase().to_string()),
            Grade::Correct
        );
        let wrong = if correct == 'A' { "B" } else { "A" };
        assert_eq!(problem.grade(wrong), Grade::Wrong);
        assert_eq!(problem.grade("F"), Grade::Invalid);
        assert_eq!(problem.grade("AB"), Grade::Invalid);
    }

    #[test]
    fn quiz_program_walks_factor_root_sum_then_pool() {
        let mut rng = thread_rng();
        assert_eq!(quiz_problem(1, &mut rng).kind, ProblemKind::Factorization);
        assert_eq!(quiz_problem(10, &mut rng).kind, ProblemKind::Factorization);
        assert_eq!(quiz_problem(11, &mut rng).kind, ProblemKind::RootSum);
        assert_eq!(quiz_problem(12, &mut rng).kind, ProblemKind::MultipleChoice);
        assert_eq!(quiz_problem(30, &mut rng).kind, ProblemKind::MultipleChoice);
        // Steps 12 and 30 land on different pool entries.
        let first = quiz_problem(12, &mut rng);
        let last = quiz_problem(30, &mut rng);
        assert_ne!(
            first.prompt.lines().next(),
            last.prompt.lines().next()
        );
    }

    #[test]
    fn twenty_four_board_digits_stay_in_range() {
        let mut rng = thread_rng();
        for _ in 0..20 {
            let problem = twenty_four(&mut rng);
            let Answer::Expression(nums) = problem.answer else {
                panic!("reach-24 should expect an expression");
            };
            assert!(nums.iter().all(|n| (1..=9).contains(n)));
            for n in nums {
                assert!(problem.prompt.contains(&n.to_string()));
            }
        }
    }

    #[test]
    fn addition_problem_grades_the_sum() {
        let mut rng = thread_rng();
        let problem = addition(&mut rng);
        let Answer::Value(sum) = problem.answer else {
            panic!("addition should expect a value");
        };
        assert_eq!(problem.grade(&format!(" {} ", sum)), Grade::Correct);
        assert_eq!(problem.grade(&(sum + 1).to_string()), Grade::Wrong);
        assert_eq!(problem.grade("?"), Grade::Invalid);
    }

    #[test]
    fn adaptive_ladder_starts_with_easy_kinds() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let kind = pick_arithmetic(0, &mut rng);
            assert!(
                kind == ArithmeticKind::Add || kind == ArithmeticKind::Sub,
                "score 0 drew {:?}",
                kind
            );
        }
    }

    #[test]
    fn adaptive_ladder_reaches_hard_kinds_at_high_score() {
        let mut rng = thread_rng();
        let saw_hard = (0..200).any(|_| pick_arithmetic(200, &mut rng) >= ArithmeticKind::Pow);
        assert!(saw_hard, "score 200 never escaped the easy kinds");
    }

    #[test]
    fn adaptive_problems_grade_their_own_answer() {
        let mut rng = thread_rng();
        for score in [0, 10, 50, 150] {
            for _ in 0..20 {
                let problem = adaptive(score, &mut rng);
                let Answer::Value(v) = problem.answer else {
                    panic!("adaptive should expect a value");
                };
                assert_eq!(problem.grade(&v.to_string()), Grade::Correct);
                assert!(problem.points == 1 || problem.points == 2);
            }
        }
    }

    #[test]
    fn time_bonus_matches_the_documented_curve() {
        // One point at score 1 is worth 1^0.53 * 1 / 1.6 seconds.
        assert!((time_bonus_secs(1, 1) - 0.625).abs() < 1e-9);
        assert!(time_bonus_secs(100, 1) > time_bonus_secs(1, 1));
        assert!(time_bonus_secs(10, 2) > time_bonus_secs(10, 1));
    }

    #[test]
    fn game_kind_round_trips_through_str() {
        for kind in [
            GameKind::TwentyFour,
            GameKind::Addition,
            GameKind::Quiz,
            GameKind::Adaptive,
        ] {
            assert_eq!(kind.as_str().parse::<GameKind>(), Ok(kind));
        }
        assert_eq!("24".parse::<GameKind>(), Ok(GameKind::TwentyFour));
        assert!("chess".parse::<GameKind>().is_err());
    }
}
