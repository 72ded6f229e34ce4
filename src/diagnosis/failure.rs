//! Failure values accepted by the classifier
//!
//! Anything that can go wrong between "build" and "finalized" converts into a
//! [`Failure`]. Remote transaction errors arrive as JSON, in whichever shape
//! the node or wallet produced, and are parsed leniently: anything that does
//! not look like an instruction error is simply treated as unstructured.

use serde_json::Value;

use super::Diagnosis;
use crate::transport::{SignerError, TransportError};
use crate::tx_builder::TransactionBuilderError;

/// Nesting depth the structured parser is willing to descend
const MAX_DEPTH: usize = 4;

/// Input to [`ErrorClassifier::classify`](super::ErrorClassifier::classify)
#[derive(Debug, Clone)]
pub enum Failure {
    /// Already classified, passed through unchanged
    Diagnosed(Diagnosis),
    /// A JSON error payload (transaction error, wallet error object, ...)
    Value(Value),
    Text(String),
    Transport(TransportError),
    Signer(SignerError),
    Build(TransactionBuilderError),
}

/// Error reported by one instruction of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionFailure {
    pub index: u8,
    pub error: InstructionErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionErrorKind {
    /// `Custom(code)` returned by the program
    Custom(u32),
    /// A runtime error variant such as `InvalidInstructionData`
    Builtin(String),
}

impl Failure {
    /// Structured instruction error, if this failure carries one.
    pub fn instruction_failure(&self) -> Option<InstructionFailure> {
        match self {
            Self::Value(value) => parse_instruction_failure(value, 0),
            Self::Transport(TransportError::Rejected {
                error: Some(value), ..
            }) => parse_instruction_failure(value, 0),
            _ => None,
        }
    }

    /// Log lines carried by the failure itself.
    pub fn logs(&self) -> &[String] {
        match self {
            Self::Transport(TransportError::Rejected { logs, .. }) => logs,
            _ => &[],
        }
    }

    /// Free text used by the pattern matchers.
    pub fn text(&self) -> String {
        match self {
            Self::Diagnosed(d) => d.message.clone(),
            Self::Value(Value::String(s)) => s.clone(),
            Self::Value(Value::Null) => String::new(),
            Self::Value(value) => value_text(value),
            Self::Text(text) => text.clone(),
            Self::Transport(err) => err.to_string(),
            Self::Signer(err) => err.to_string(),
            Self::Build(err) => err.to_string(),
        }
    }
}

/// Wallet-style error objects carry their text in `message`; anything else is
/// rendered as compact JSON.
fn value_text(value: &Value) -> String {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Accepts, possibly wrapped in `{"err": ..}` or `{"InstructionError": ..}`:
/// - the bare pair `[3, {"Custom": 1}]` / `[3, "InvalidInstructionData"]`
/// - the named form `{"index": 3, "code": 1}`
pub fn parse_instruction_failure(value: &Value, depth: usize) -> Option<InstructionFailure> {
    if depth > MAX_DEPTH {
        return None;
    }

    match value {
        Value::Array(pair) if pair.len() == 2 => {
            let index = as_index(&pair[0])?;
            let error = parse_error_kind(&pair[1])?;
            Some(InstructionFailure { index, error })
        }
        Value::Object(map) => {
            if let (Some(index), Some(code)) = (map.get("index"), map.get("code")) {
                let index = as_index(index)?;
                let error = match code {
                    Value::Number(_) => InstructionErrorKind::Custom(as_code(code)?),
                    other => parse_error_kind(other)?,
                };
                return Some(InstructionFailure { index, error });
            }
            ["InstructionError", "err", "error"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|inner| parse_instruction_failure(inner, depth + 1))
        }
        _ => None,
    }
}

fn parse_error_kind(value: &Value) -> Option<InstructionErrorKind> {
    match value {
        Value::String(name) => Some(InstructionErrorKind::Builtin(name.clone())),
        Value::Object(map) => {
            if let Some(code) = map.get("Custom") {
                return as_code(code).map(InstructionErrorKind::Custom);
            }
            // Struct-like builtin variants, e.g. {"BorshIoError": "..."}
            map.keys()
                .next()
                .map(|name| InstructionErrorKind::Builtin(name.clone()))
        }
        Value::Number(_) => as_code(value).map(InstructionErrorKind::Custom),
        _ => None,
    }
}

fn as_index(value: &Value) -> Option<u8> {
    value.as_u64().and_then(|n| u8::try_from(n).ok())
}

fn as_code(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

impl From<Diagnosis> for Failure {
    fn from(diagnosis: Diagnosis) -> Self {
        Self::Diagnosed(diagnosis)
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Failure {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Failure {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<SignerError> for Failure {
    fn from(err: SignerError) -> Self {
        Self::Signer(err)
    }
}

impl From<TransactionBuilderError> for Failure {
    fn from(err: TransactionBuilderError) -> Self {
        match err {
            TransactionBuilderError::Transport(inner) => Self::Transport(inner),
            TransactionBuilderError::Signing(inner) => Self::Signer(inner),
            other => Self::Build(other),
        }
    }
}
