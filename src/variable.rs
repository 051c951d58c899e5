//! Tuning variable model
//!
//! Variables are declared once by the recording tool and referenced everywhere
//! else by their canonical id. Stored codes follow the recorder's schema:
//! value types `0..=3` and statistical categories `0..=3`.

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Canonical variable id, the only stable cross-reference in an artifact
pub type VariableId = i64;
/// Problem id from `problem_descriptions`
pub type ProblemId = i64;
/// Trial id from `trials`
pub type TrialId = i64;

/// Declared value type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ValueType {
    /// Decode the stored type code
    pub fn from_code(variable: VariableId, code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Boolean),
            1 => Ok(Self::Integer),
            2 => Ok(Self::Float),
            3 => Ok(Self::Text),
            _ => Err(CompileError::UnknownValueType { variable, code }),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Boolean => 0,
            Self::Integer => 1,
            Self::Float => 2,
            Self::Text => 3,
        }
    }

    /// Boolean and text encodings carry no metric, so they never quantize
    pub fn is_metric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// Nominal statistical category of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticalCategory {
    Categorical,
    Ordinal,
    Interval,
    Ratio,
}

impl StatisticalCategory {
    /// Decode the stored category code
    pub fn from_code(variable: VariableId, code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Categorical),
            1 => Ok(Self::Ordinal),
            2 => Ok(Self::Interval),
            3 => Ok(Self::Ratio),
            _ => Err(CompileError::UnknownStatisticalCategory { variable, code }),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Categorical => 0,
            Self::Ordinal => 1,
            Self::Interval => 2,
            Self::Ratio => 3,
        }
    }
}

/// Whether a variable is a context input or a tuned output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Input,
    Output,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// A catalogued variable (immutable once loaded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub value_type: ValueType,
    pub category: StatisticalCategory,
    pub role: Role,
}

/// A stored value: exactly one of the discrete or continuous payloads
///
/// Ordering is numeric (`total_cmp` on the f64 projection) with the variant
/// as tie-break, so `Discrete(1)` and `Continuous(1.0)` are distinct keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Discrete(i64),
    Continuous(f64),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Discrete(v) => v as f64,
            Self::Continuous(v) => v,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Discrete(_) => 0,
            Self::Continuous(_) => 1,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => a.cmp(b),
            (Self::Continuous(a), Self::Continuous(b)) => a.total_cmp(b),
            _ => self
                .as_f64()
                .total_cmp(&other.as_f64())
                .then(self.rank().cmp(&other.rank())),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Discrete(v) => v.hash(state),
            Self::Continuous(v) => v.to_bits().hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discrete(v) => write!(f, "{}", v),
            Self::Continuous(v) => write!(f, "{}", v),
        }
    }
}

/// 64-bit key standing in for a text value
///
/// The recorder stores strings as `int64_t(std::hash<std::string>)` in
/// `discrete_result`; hosts must use [`TextKey::of`] so their keys match the
/// stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextKey(pub i64);

/// libstdc++ `_Hash_bytes` constants (64-bit murmur2 variant)
const HASH_MUL: u64 = 0xc6a4_a793_5bd1_e995;
const HASH_SEED: u64 = 0xc70f_6907;

impl TextKey {
    /// Key of a string, bit-identical to libstdc++'s `std::hash<std::string>`
    ///
    /// # Example
    /// ```
    /// use scholar::variable::TextKey;
    ///
    /// assert_eq!(TextKey::of("static"), TextKey(3930163824820145617));
    /// assert_ne!(TextKey::of("dynamic"), TextKey::of("static"));
    /// ```
    pub fn of(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut hash = HASH_SEED ^ (bytes.len() as u64).wrapping_mul(HASH_MUL);

        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            let data = shift_mix(u64::from_le_bytes(word).wrapping_mul(HASH_MUL))
                .wrapping_mul(HASH_MUL);
            hash ^= data;
            hash = hash.wrapping_mul(HASH_MUL);
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let data = tail
                .iter()
                .rev()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            hash ^= data;
            hash = hash.wrapping_mul(HASH_MUL);
        }

        hash = shift_mix(hash).wrapping_mul(HASH_MUL);
        Self(shift_mix(hash) as i64)
    }
}

fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

/// A host-facing typed value, as exchanged through the lookup contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(TextKey),
}

impl TypedValue {
    /// Project onto the stored representation
    pub fn to_value(self) -> Value {
        match self {
            Self::Boolean(b) => Value::Discrete(i64::from(b)),
            Self::Integer(v) => Value::Discrete(v),
            Self::Float(v) => Value::Continuous(v),
            Self::Text(key) => Value::Discrete(key.0),
        }
    }

    /// Rebuild a host value from a stored one using the declared type
    pub fn from_value(value: Value, value_type: ValueType) -> Self {
        match value_type {
            ValueType::Boolean => Self::Boolean(value.as_f64() != 0.0),
            ValueType::Integer => match value {
                Value::Discrete(v) => Self::Integer(v),
                Value::Continuous(v) => Self::Integer(v as i64),
            },
            ValueType::Float => Self::Float(value.as_f64()),
            ValueType::Text => match value {
                Value::Discrete(v) => Self::Text(TextKey(v)),
                Value::Continuous(v) => Self::Text(TextKey(v as i64)),
            },
        }
    }
}

impl TypedValue {
    /// Parse host-supplied text as a value of `value_type`
    ///
    /// Text values are keyed with [`TextKey::of`]; `#<i64>` passes a stored
    /// key through unchanged.
    pub fn parse(text: &str, value_type: ValueType) -> std::result::Result<Self, String> {
        match value_type {
            ValueType::Boolean => match text {
                "true" | "1" => Ok(Self::Boolean(true)),
                "false" | "0" => Ok(Self::Boolean(false)),
                _ => Err(format!("invalid boolean '{}'", text)),
            },
            ValueType::Integer => text
                .parse()
                .map(Self::Integer)
                .map_err(|e| format!("invalid integer '{}': {}", text, e)),
            ValueType::Float => text
                .parse()
                .map(Self::Float)
                .map_err(|e| format!("invalid float '{}': {}", text, e)),
            ValueType::Text => match text.strip_prefix('#') {
                Some(raw) => raw
                    .parse()
                    .map(|key| Self::Text(TextKey(key)))
                    .map_err(|e| format!("invalid text key '{}': {}", text, e)),
                None => Ok(Self::Text(TextKey::of(text))),
            },
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(key) => write!(f, "#{}", key.0),
        }
    }
}
