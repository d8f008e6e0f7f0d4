//! Failure collection and message templating.
//!
//! Key behaviors:
//! - Placeholder rendering over an explicit token grammar, independent of
//!   any native locale facility:
//!   `%1$$`..`%5$$` custom tokens (locale-formatted expected/actual/
//!   difference, expected/actual coordinates), printf-style positionals
//!   (`%3$0.4f`, bare `%s`/`%f`/`%d`), `%%` escape.
//! - Locale-style decimals: thousands `.`, decimal `,`, configurable
//!   precision.
//! - A failure counter inserting a blank line after every Nth message.
//! - One aggregated report listing every failure in registration order.
//!
//! Tokens that cannot be filled (wrong type, absent side) render verbatim,
//! so a malformed template still produces a readable message.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell_value::CellValue;
use crate::evaluate::EvaluationOutcome;
use crate::scenario::TestScenario;

/// Component name for structured events.
pub const REPORT_COMPONENT: &str = "report";

/// Separator between coordinate elements in rendered messages.
pub const COORDINATE_SEPARATOR: &str = " / ";

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

/// Host-tunable reporting knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Insert a blank line after every Nth failure; `None` or `Some(0)`
    /// disables the separator.
    pub block_size: Option<u32>,
    /// Decimal places used by the locale-style number tokens.
    pub decimals: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            block_size: Some(5),
            decimals: 2,
        }
    }
}

impl ReportConfig {
    pub fn effective_block_size(&self) -> Option<u32> {
        match self.block_size {
            None | Some(0) => None,
            size => size,
        }
    }
}

// ---------------------------------------------------------------------------
// Decimal formatting
// ---------------------------------------------------------------------------

/// Format a number the way the report tokens expect: thousands separated
/// by `.`, decimal separated by `,`, rounded to `decimals` places.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let unsigned = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    let rounded_to_zero = digits.iter().all(|d| *d == '0')
        && frac_part.map_or(true, |frac| frac.chars().all(|d| d == '0'));

    let mut out = String::new();
    if value < 0.0 && !rounded_to_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

// ---------------------------------------------------------------------------
// Token grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Escaped,
    /// `%N$$`, the custom locale/coordinate tokens.
    Locale { index: usize, raw: String },
    Positional(PositionalSpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PositionalSpec {
    /// Explicit `N$` argument index; `None` consumes sequentially.
    index: Option<usize>,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    conversion: char,
    raw: String,
}

fn tokenize(template: &str) -> Vec<Token> {
    let chars: Vec<char> = template.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '%' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }
        match parse_token(&chars, i) {
            Some((token, next)) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(token);
                i = next;
            }
            None => {
                literal.push('%');
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn parse_token(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let len = chars.len();
    let mut i = start + 1;
    if i < len && chars[i] == '%' {
        return Some((Token::Escaped, i + 1));
    }

    let mut index = None;
    let digit_start = i;
    while i < len && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i > digit_start {
        let parsed: usize = chars[digit_start..i].iter().collect::<String>().parse().ok()?;
        if i + 1 < len && chars[i] == '$' && chars[i + 1] == '$' {
            let raw: String = chars[start..i + 2].iter().collect();
            return Some((Token::Locale { index: parsed, raw }, i + 2));
        }
        if i < len && chars[i] == '$' {
            index = Some(parsed);
            i += 1;
        } else {
            return None;
        }
    }

    let mut zero_pad = false;
    while i < len && matches!(chars[i], '0' | '-' | '+' | ' ') {
        if chars[i] == '0' {
            zero_pad = true;
        }
        i += 1;
    }

    let width_start = i;
    while i < len && chars[i].is_ascii_digit() {
        i += 1;
    }
    let width = if i > width_start {
        chars[width_start..i].iter().collect::<String>().parse().ok()?
    } else {
        0
    };

    let mut precision = None;
    if i < len && chars[i] == '.' {
        i += 1;
        let precision_start = i;
        while i < len && chars[i].is_ascii_digit() {
            i += 1;
        }
        precision = Some(if i > precision_start {
            chars[precision_start..i].iter().collect::<String>().parse().ok()?
        } else {
            0
        });
    }

    if i >= len || !chars[i].is_ascii_alphabetic() {
        return None;
    }
    let conversion = chars[i];
    i += 1;
    let raw: String = chars[start..i].iter().collect();
    Some((
        Token::Positional(PositionalSpec {
            index,
            zero_pad,
            width,
            precision,
            conversion,
            raw,
        }),
        i,
    ))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Everything a template can reference, resolved ahead of rendering.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub expected: Option<CellValue>,
    pub actual: CellValue,
    /// Present only when the expected parameter is cube-backed.
    pub expected_coordinates: Option<Vec<String>>,
    /// Present only when the actual parameter is cube-backed.
    pub actual_coordinates: Option<Vec<String>>,
}

impl MessageContext {
    fn difference(&self) -> Option<f64> {
        let expected = self.expected.as_ref()?;
        if !expected.is_numeric() || !self.actual.is_numeric() {
            return None;
        }
        match (self.actual.as_number(), expected.as_number()) {
            (Some(actual), Some(expected)) => Some(actual - expected),
            _ => None,
        }
    }
}

/// Substitute recognized placeholders. Pure: same inputs, same output.
///
/// Templates without `%` pass through untouched.
pub fn render_message(template: &str, context: &MessageContext, decimals: usize) -> String {
    if !template.contains('%') {
        return template.to_string();
    }

    let difference = context.difference().map(CellValue::Float);
    let mut sequential = 1usize;
    let mut out = String::with_capacity(template.len());

    for token in tokenize(template) {
        match token {
            Token::Literal(text) => out.push_str(&text),
            Token::Escaped => out.push('%'),
            Token::Locale { index, raw } => {
                match render_locale_token(index, context, &difference, decimals) {
                    Some(text) => out.push_str(&text),
                    None => out.push_str(&raw),
                }
            }
            Token::Positional(spec) => {
                let index = match spec.index {
                    Some(explicit) => explicit,
                    None => {
                        let next = sequential;
                        sequential += 1;
                        next
                    }
                };
                let value = positional_value(index, context, &difference);
                match value.and_then(|value| render_positional(&spec, value)) {
                    Some(text) => out.push_str(&text),
                    None => out.push_str(&spec.raw),
                }
            }
        }
    }
    out
}

fn render_locale_token(
    index: usize,
    context: &MessageContext,
    difference: &Option<CellValue>,
    decimals: usize,
) -> Option<String> {
    match index {
        1 => match &context.expected {
            Some(expected) if expected.is_numeric() => {
                Some(format_decimal(expected.as_number()?, decimals))
            }
            _ => None,
        },
        2 if context.actual.is_numeric() => {
            Some(format_decimal(context.actual.as_number()?, decimals))
        }
        3 => match difference {
            Some(CellValue::Float(diff)) => Some(format_decimal(*diff, decimals)),
            _ => None,
        },
        4 => context
            .expected_coordinates
            .as_ref()
            .map(|coordinates| coordinates.join(COORDINATE_SEPARATOR)),
        5 => context
            .actual_coordinates
            .as_ref()
            .map(|coordinates| coordinates.join(COORDINATE_SEPARATOR)),
        _ => None,
    }
}

fn positional_value<'a>(
    index: usize,
    context: &'a MessageContext,
    difference: &'a Option<CellValue>,
) -> Option<&'a CellValue> {
    match index {
        1 => context.expected.as_ref(),
        2 => Some(&context.actual),
        3 => difference.as_ref(),
        _ => None,
    }
}

fn render_positional(spec: &PositionalSpec, value: &CellValue) -> Option<String> {
    let text = match spec.conversion {
        'f' | 'F' => {
            let number = value.is_numeric().then(|| value.as_number()).flatten()?;
            format!("{:.*}", spec.precision.unwrap_or(6), number)
        }
        'd' | 'u' => {
            let number = value.is_numeric().then(|| value.as_number()).flatten()?;
            format!("{}", number.trunc() as i64)
        }
        's' => value.to_string(),
        _ => return None,
    };
    Some(pad(text, spec.width, spec.zero_pad))
}

fn pad(text: String, width: usize, zero_pad: bool) -> String {
    if text.len() >= width {
        return text;
    }
    let fill = if zero_pad { '0' } else { ' ' };
    let padding: String = std::iter::repeat(fill).take(width - text.len()).collect();
    if zero_pad && text.starts_with('-') {
        format!("-{}{}", padding, &text[1..])
    } else {
        format!("{padding}{text}")
    }
}

// ---------------------------------------------------------------------------
// FailureLog / FailureReport
// ---------------------------------------------------------------------------

/// Ordered collection of formatted failure messages for one test.
#[derive(Debug, Default)]
pub struct FailureLog {
    messages: Vec<String>,
    counter: u64,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format and append the failure of one scenario.
    ///
    /// Binary comparisons run the template through the placeholder
    /// renderer; unary truth checks append their message untouched.
    pub fn record(
        &mut self,
        scenario: &TestScenario,
        outcome: &EvaluationOutcome,
        config: &ReportConfig,
    ) {
        let mut message = if scenario.kind().is_unary() {
            scenario.message().to_string()
        } else {
            let context = MessageContext {
                expected: outcome.expected.clone(),
                actual: outcome.actual.clone(),
                expected_coordinates: scenario
                    .expected()
                    .filter(|param| param.is_cube_backed())
                    .map(|param| param.display_coordinates()),
                actual_coordinates: scenario
                    .actual()
                    .is_cube_backed()
                    .then(|| scenario.actual().display_coordinates()),
            };
            render_message(scenario.message(), &context, config.decimals)
        };

        self.counter += 1;
        if let Some(block_size) = config.effective_block_size() {
            if self.counter % u64::from(block_size) == 0 {
                message.push('\n');
            }
        }
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.counter = 0;
    }

    /// Drain into an aggregated report, or `None` when every scenario
    /// passed. Resets the log either way.
    pub fn take_report(&mut self) -> Option<FailureReport> {
        self.counter = 0;
        if self.messages.is_empty() {
            return None;
        }
        let messages = std::mem::take(&mut self.messages);
        Some(FailureReport {
            count: messages.len() as u64,
            messages,
        })
    }
}

/// Aggregated failure surfaced once per test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub count: u64,
    pub messages: Vec<String>,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} assertions failed:", self.count)?;
        for message in &self.messages {
            write!(f, "\n\t{message}")?;
        }
        Ok(())
    }
}
