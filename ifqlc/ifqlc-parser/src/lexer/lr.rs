use enum_as_inner::EnumAsInner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokens(pub Vec<Token>);

#[derive(Clone, PartialEq, Serialize, Deserialize, Eq, JsonSchema)]
pub struct Token {
    pub kind: TokenKind,
    pub span: std::ops::Range<usize>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
pub enum TokenKind {
    /// A line break or a `;`
    NewLine,

    Ident(String),
    Keyword(String),
    Literal(Literal),
    /// A dotted version such as `1.2.0`, used in import declarations.
    Version(String),

    /// single-char control tokens
    Control(char),

    ArrowFat,      // =>
    Eq,            // ==
    Ne,            // !=
    Gte,           // >=
    Lte,           // <=
    RegexMatch,    // =~
    RegexNotMatch, // !~
}

#[derive(
    Debug, EnumAsInner, PartialEq, Clone, Serialize, Deserialize, strum::AsRefStr, JsonSchema,
)]
pub enum Literal {
    String(String),
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Boolean(bool),
    Duration(Vec<DurationSegment>),
    /// RFC 3339 text, as written. Parsed into a point in time during semantic
    /// analysis.
    DateTime(String),
    /// Pattern text between the slashes, with `\/` already unescaped.
    Regexp(String),
    /// The `$` placeholder for the current row's field value.
    Field,
}

/// One `<int><unit>` part of a duration literal such as `1h30m`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct DurationSegment {
    pub magnitude: i64,
    pub unit: DurationUnit,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    JsonSchema,
)]
pub enum DurationUnit {
    #[strum(to_string = "ns")]
    Nanosecond,
    #[strum(to_string = "us")]
    Microsecond,
    #[strum(to_string = "ms")]
    Millisecond,
    #[strum(to_string = "s")]
    Second,
    #[strum(to_string = "m")]
    Minute,
    #[strum(to_string = "h")]
    Hour,
    #[strum(to_string = "d")]
    Day,
    #[strum(to_string = "w")]
    Week,
    #[strum(to_string = "y")]
    Year,
}

impl DurationUnit {
    /// Length of one unit in nanoseconds. Days, weeks and years are fixed
    /// multiples of 24 hours; there is no calendar arithmetic.
    pub fn nanoseconds(self) -> i64 {
        const SECOND: i64 = 1_000_000_000;
        const DAY: i64 = 24 * 60 * 60 * SECOND;
        match self {
            DurationUnit::Nanosecond => 1,
            DurationUnit::Microsecond => 1_000,
            DurationUnit::Millisecond => 1_000_000,
            DurationUnit::Second => SECOND,
            DurationUnit::Minute => 60 * SECOND,
            DurationUnit::Hour => 60 * 60 * SECOND,
            DurationUnit::Day => DAY,
            DurationUnit::Week => 7 * DAY,
            DurationUnit::Year => 365 * DAY,
        }
    }
}

impl DurationSegment {
    /// `None` when the segment overflows an `i64` of nanoseconds.
    pub fn nanoseconds(&self) -> Option<i64> {
        self.magnitude.checked_mul(self.unit.nanoseconds())
    }
}

/// Total length of a duration literal in nanoseconds.
pub fn duration_nanoseconds(segments: &[DurationSegment]) -> Option<i64> {
    segments
        .iter()
        .try_fold(0i64, |acc, s| acc.checked_add(s.nanoseconds()?))
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{}", quote_string(s)),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::UnsignedInteger(u) => write!(f, "{u}u"),
            Literal::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Literal::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Literal::Duration(segments) => {
                for s in segments {
                    write!(f, "{}{}", s.magnitude, s.unit)?;
                }
                Ok(())
            }
            Literal::DateTime(text) => f.write_str(text),
            Literal::Regexp(pattern) => write!(f, "/{}/", pattern.replace('/', "\\/")),
            Literal::Field => f.write_str("$"),
        }
    }
}

fn quote_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for ch in s.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => result.extend(c.escape_unicode()),
            c => result.push(c),
        }
    }
    result.push('"');
    result
}

// This is here because Literal::Float(f64) does not implement Hash, so we cannot simply derive it.
// chumsky::Error needs Hash for the TokenKind, so it can deduplicate tokens in error.
// So this could lead to duplicated tokens in error messages.
#[allow(clippy::derived_hash_with_manual_eq)]
impl std::hash::Hash for TokenKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
    }
}

impl std::cmp::Eq for TokenKind {}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::NewLine => write!(f, "new line"),
            TokenKind::Ident(s) => {
                if s.is_empty() {
                    // FYI this shows up in errors
                    write!(f, "an identifier")
                } else {
                    write!(f, "{s}")
                }
            }
            TokenKind::Keyword(s) => write!(f, "keyword {s}"),
            TokenKind::Literal(lit) => write!(f, "{lit}"),
            TokenKind::Version(v) => write!(f, "version {v}"),
            TokenKind::Control(c) => write!(f, "{c}"),

            TokenKind::ArrowFat => f.write_str("=>"),
            TokenKind::Eq => f.write_str("=="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Gte => f.write_str(">="),
            TokenKind::Lte => f.write_str("<="),
            TokenKind::RegexMatch => f.write_str("=~"),
            TokenKind::RegexNotMatch => f.write_str("!~"),
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}..{}: {:?}", self.span.start, self.span.end, self.kind)
    }
}
