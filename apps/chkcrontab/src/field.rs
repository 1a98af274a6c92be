//! Time field grammar.
//!
//! A field is tokenized by a small character state machine into a list of
//! terms (`*`, `*/S`, `N`, `N-M`, `N-M/S`, each endpoint a number or a
//! symbolic name), then every term is checked against the field's bounds
//! and name table. Tokenizing never looks at bounds, so the two halves can
//! be tested separately.

use crate::models::field::Field;
use crate::models::{Code, Finding};
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One endpoint of a term.
pub enum Atom<'a> {
    Number(&'a str),
    Name(&'a str),
}

impl<'a> Atom<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Atom::Number(t) | Atom::Name(t) => t,
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self, Atom::Name(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One comma-separated element of a time field.
pub enum Term<'a> {
    Star,
    StarStep(&'a str),
    Single(Atom<'a>),
    Range(Atom<'a>, Atom<'a>),
    RangeStep(Atom<'a>, Atom<'a>, &'a str),
}

impl Term<'_> {
    pub fn is_range(&self) -> bool {
        matches!(self, Term::Range(..) | Term::RangeStep(..))
    }

    pub fn uses_names(&self) -> bool {
        match self {
            Term::Star | Term::StarStep(_) => false,
            Term::Single(a) => a.is_name(),
            Term::Range(a, b) | Term::RangeStep(a, b, _) => a.is_name() || b.is_name(),
        }
    }
}

impl fmt::Display for Term<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Star => f.write_str("*"),
            Term::StarStep(s) => write!(f, "*/{s}"),
            Term::Single(a) => f.write_str(a.text()),
            Term::Range(a, b) => write!(f, "{}-{}", a.text(), b.text()),
            Term::RangeStep(a, b, s) => write!(f, "{}-{}/{s}", a.text(), b.text()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Star,
    StarSlash,
    StarStep,
    Low,
    Dash,
    High,
    RangeSlash,
    RangeStep,
}

impl State {
    fn accepting(self) -> bool {
        matches!(
            self,
            State::Star | State::StarStep | State::Low | State::High | State::RangeStep
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Digit,
    Alpha,
    Star,
    Dash,
    Slash,
    Comma,
    Other,
}

fn classify_char(c: char) -> Class {
    match c {
        '0'..='9' => Class::Digit,
        'a'..='z' | 'A'..='Z' => Class::Alpha,
        '*' => Class::Star,
        '-' => Class::Dash,
        '/' => Class::Slash,
        ',' => Class::Comma,
        _ => Class::Other,
    }
}

/// Byte spans of the pieces of the element being scanned.
#[derive(Default)]
struct Scratch {
    low: Range<usize>,
    low_alpha: bool,
    high: Range<usize>,
    high_alpha: bool,
    step: Range<usize>,
}

impl Scratch {
    fn atom<'a>(text: &'a str, span: &Range<usize>, alpha: bool) -> Atom<'a> {
        let s = &text[span.clone()];
        if alpha {
            Atom::Name(s)
        } else {
            Atom::Number(s)
        }
    }

    fn term<'a>(&self, state: State, text: &'a str) -> Option<Term<'a>> {
        let low = || Self::atom(text, &self.low, self.low_alpha);
        let high = || Self::atom(text, &self.high, self.high_alpha);
        match state {
            State::Star => Some(Term::Star),
            State::StarStep => Some(Term::StarStep(&text[self.step.clone()])),
            State::Low => Some(Term::Single(low())),
            State::High => Some(Term::Range(low(), high())),
            State::RangeStep => Some(Term::RangeStep(low(), high(), &text[self.step.clone()])),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Tokenizer output. Terms scanned before an error are still returned.
pub struct Tokens<'a> {
    pub terms: Vec<Term<'a>>,
    pub error: Option<String>,
}

/// Split a time field into terms.
pub fn tokenize(text: &str) -> Tokens<'_> {
    let mut terms = Vec::new();
    let mut state = State::Start;
    let mut sc = Scratch::default();

    for (i, c) in text.char_indices() {
        let class = classify_char(c);
        let next = match (state, class) {
            (State::Start, Class::Star) => Some(State::Star),
            (State::Start, Class::Digit | Class::Alpha) => {
                sc.low = i..i + 1;
                sc.low_alpha = class == Class::Alpha;
                Some(State::Low)
            }
            (State::Star, Class::Slash) => Some(State::StarSlash),
            (State::StarSlash | State::RangeSlash, Class::Digit) => {
                sc.step = i..i + 1;
                Some(if state == State::StarSlash {
                    State::StarStep
                } else {
                    State::RangeStep
                })
            }
            (State::StarStep | State::RangeStep, Class::Digit) => {
                sc.step.end = i + 1;
                Some(state)
            }
            (State::Low, Class::Digit) if !sc.low_alpha => {
                sc.low.end = i + 1;
                Some(State::Low)
            }
            (State::Low, Class::Alpha) if sc.low_alpha => {
                sc.low.end = i + 1;
                Some(State::Low)
            }
            (State::Low, Class::Dash) => Some(State::Dash),
            // both ends of a range are numbers or both are names
            (State::Dash, Class::Digit | Class::Alpha)
                if (class == Class::Alpha) == sc.low_alpha =>
            {
                sc.high = i..i + 1;
                sc.high_alpha = sc.low_alpha;
                Some(State::High)
            }
            (State::High, Class::Digit) if !sc.high_alpha => {
                sc.high.end = i + 1;
                Some(State::High)
            }
            (State::High, Class::Alpha) if sc.high_alpha => {
                sc.high.end = i + 1;
                Some(State::High)
            }
            (State::High, Class::Slash) => Some(State::RangeSlash),
            (s, Class::Comma) if s.accepting() => {
                terms.extend(sc.term(s, text));
                Some(State::Start)
            }
            _ => None,
        };
        match next {
            Some(s) => state = s,
            None => {
                let error = if state == State::Start && class == Class::Comma {
                    format!("empty list element in \"{text}\"")
                } else {
                    format!(
                        "\"{}[[{}]]{}\"",
                        &text[..i],
                        c,
                        &text[i + c.len_utf8()..]
                    )
                };
                return Tokens {
                    terms,
                    error: Some(error),
                };
            }
        }
    }

    let error = if state.accepting() {
        terms.extend(sc.term(state, text));
        None
    } else if state == State::Start {
        if text.is_empty() {
            Some("field is empty".to_string())
        } else {
            Some(format!("empty list element in \"{text}\""))
        }
    } else {
        Some(format!("\"{text}\" is incomplete"))
    };
    Tokens { terms, error }
}

#[derive(Debug, Clone)]
/// Terms of a field together with what was wrong with them.
pub struct FieldCheck<'a> {
    pub terms: Vec<Term<'a>>,
    pub findings: Vec<Finding>,
    pub parsed: bool,
}

impl FieldCheck<'_> {
    /// True when the field is a lone `*`.
    pub fn is_unrestricted(&self) -> bool {
        self.parsed && self.terms == [Term::Star]
    }

    pub fn is_clean(&self) -> bool {
        self.parsed && self.findings.iter().all(|f| f.code != Code::FieldValueError)
    }
}

/// Validate a single field, returning only the findings.
pub fn validate_field(field: &Field<'_>) -> Vec<Finding> {
    check_field(field).findings
}

/// Tokenize and validate a single field.
pub fn check_field<'a>(field: &Field<'a>) -> FieldCheck<'a> {
    let tokens = tokenize(field.text);
    let mut findings = Vec::new();
    let parsed = tokens.error.is_none();
    if let Some(err) = tokens.error {
        findings.push(Finding::new(
            Code::FieldParseError,
            format!("failed to parse \"{}\" field here: {err}", field.name),
        ));
    }
    for term in &tokens.terms {
        tracing::trace!(field = %field.name, term = %term, "checking term");
        check_term(field, term, &mut findings);
    }
    FieldCheck {
        terms: tokens.terms,
        findings,
        parsed,
    }
}

fn check_term(field: &Field<'_>, term: &Term<'_>, out: &mut Vec<Finding>) {
    match *term {
        Term::Star => {}
        Term::StarStep(s) => {
            if let Some(step) = check_step(field, s, out) {
                let span = field.max - field.min;
                if step > span {
                    out.push(step_warning(field, step, span, term));
                }
            }
        }
        Term::Single(a) => {
            if let Err(f) = resolve(field, a) {
                out.push(f);
            }
        }
        Term::Range(a, b) => {
            check_range(field, a, b, out);
        }
        Term::RangeStep(a, b, s) => {
            let bounds = check_range(field, a, b, out);
            let step = check_step(field, s, out);
            if let (Some((lo, hi)), Some(step)) = (bounds, step) {
                if step > hi - lo {
                    out.push(step_warning(field, step, hi - lo, term));
                }
            }
        }
    }
}

fn check_range(field: &Field<'_>, a: Atom<'_>, b: Atom<'_>, out: &mut Vec<Finding>) -> Option<(u32, u32)> {
    let lo = resolve(field, a).map_err(|f| out.push(f)).ok();
    let hi = resolve(field, b).map_err(|f| out.push(f)).ok();
    let (lo, hi) = (lo?, hi?);
    if lo > hi {
        out.push(Finding::new(
            Code::FieldValueError,
            format!(
                "invalid range \"{}-{}\" in field \"{}\": {lo} is greater than {hi}",
                a.text(),
                b.text(),
                field.name
            ),
        ));
        return None;
    }
    Some((lo, hi))
}

fn check_step(field: &Field<'_>, text: &str, out: &mut Vec<Finding>) -> Option<u32> {
    // Only digits reach here, so a parse failure means overflow.
    let step = text.parse::<u32>().unwrap_or(u32::MAX);
    if step == 0 {
        out.push(Finding::new(
            Code::FieldValueError,
            format!("step 0 is too low for field \"{}\" (steps start at 1)", field.name),
        ));
        return None;
    }
    Some(step)
}

fn step_warning(field: &Field<'_>, step: u32, span: u32, term: &Term<'_>) -> Finding {
    Finding::new(
        Code::StepNoEffect,
        format!(
            "step {step} is larger than the range it steps over ({span}) in field \"{}\" ({term}); the step has no effect",
            field.name
        ),
    )
}

fn resolve(field: &Field<'_>, atom: Atom<'_>) -> Result<u32, Finding> {
    match atom {
        Atom::Number(text) => {
            let value = text.parse::<u32>().ok();
            match value {
                Some(v) if v < field.min => Err(out_of_bounds(field, text, "low")),
                Some(v) if v <= field.max => Ok(v),
                _ => Err(out_of_bounds(field, text, "high")),
            }
        }
        Atom::Name(text) => {
            if field.names.is_empty() {
                return Err(Finding::new(
                    Code::FieldValueError,
                    format!(
                        "\"{text}\" is not valid for field \"{}\", which only accepts numbers {}-{}",
                        field.name, field.min, field.max
                    ),
                ));
            }
            field.resolve_name(text).ok_or_else(|| {
                let expected: Vec<&str> = field.names.iter().map(|(n, _)| *n).collect();
                Finding::new(
                    Code::FieldValueError,
                    format!(
                        "\"{text}\" is not a valid name for field \"{}\" (expected one of {})",
                        field.name,
                        expected.join(", ")
                    ),
                )
            })
        }
    }
}

fn out_of_bounds(field: &Field<'_>, text: &str, which: &str) -> Finding {
    Finding::new(
        Code::FieldValueError,
        format!(
            "{text} is too {which} for field \"{}\" (allowed {}-{})",
            field.name, field.min, field.max
        ),
    )
}
