//! Failure classification
//!
//! [`ErrorClassifier::classify`] turns any failure (typed error, JSON payload,
//! free text) plus optional log lines into a user-facing [`Diagnosis`]. It is
//! pure and total: junk input yields an `Unknown` diagnosis, never an error.
//!
//! ## Pipeline
//!
//! 1. An existing [`Diagnosis`] passes through unchanged.
//! 2. A signer rejection becomes `UserCancelled`.
//! 3. A structured instruction error (`[index, {"Custom": code}]` or
//!    `{"index", "code"}`) is mapped by code.
//! 4. Otherwise the text and logs run through the ordered matchers, ending in
//!    the `Unknown` catch-all.

pub mod failure;
mod matchers;
pub mod shortfall;

pub use failure::{Failure, InstructionErrorKind, InstructionFailure};
pub use shortfall::Shortfall;

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::program::{ErrorTable, ProgramContract};
use crate::transport::SignerError;
use matchers::{MatchInput, MATCHERS};

/// Decimals of the native token, used when rendering shortfalls
pub const NATIVE_DECIMALS: u8 = 9;

/// SPL token / system "insufficient funds" custom code
const CODE_INSUFFICIENT_FUNDS: u32 = 1;
/// Anchor `InstructionDidNotDeserialize`
const CODE_INSTRUCTION_DID_NOT_DESERIALIZE: u32 = 102;
/// Anchor `AccountNotInitialized`
const CODE_ACCOUNT_NOT_INITIALIZED: u32 = 3012;
/// Anchor account constraint and validation codes
const ACCOUNT_VALIDATION_CODES: std::ops::RangeInclusive<u32> = 2000..=3999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisKind {
    UserCancelled,
    StaleFreshnessToken,
    InsufficientFunds,
    AccountsNotReady,
    SimulationRejected,
    SwapSubsystemFailure,
    RemoteProgramError,
    TokenAccountError,
    Unknown,
}

impl DiagnosisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserCancelled => "user_cancelled",
            Self::StaleFreshnessToken => "stale_freshness_token",
            Self::InsufficientFunds => "insufficient_funds",
            Self::AccountsNotReady => "accounts_not_ready",
            Self::SimulationRejected => "simulation_rejected",
            Self::SwapSubsystemFailure => "swap_subsystem_failure",
            Self::RemoteProgramError => "remote_program_error",
            Self::TokenAccountError => "token_account_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DiagnosisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified, ready-to-display outcome of a failed operation
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct Diagnosis {
    pub kind: DiagnosisKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Shortfall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_index: Option<u8>,
    /// Remote program error code, when one was identified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl Diagnosis {
    pub fn new(kind: DiagnosisKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            shortfall: None,
            instruction_index: None,
            code: None,
        }
    }

    pub fn at_instruction(mut self, index: u8) -> Self {
        self.instruction_index = Some(index);
        self
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn user_cancelled() -> Self {
        Self::new(DiagnosisKind::UserCancelled, "Transaction cancelled by user")
    }

    pub fn stale_freshness_token() -> Self {
        Self::new(
            DiagnosisKind::StaleFreshnessToken,
            "Transaction expired before it was processed, please retry",
        )
    }

    /// Precise "need N more" message when the shortfall is known.
    pub fn insufficient_funds(shortfall: Option<Shortfall>) -> Self {
        let message = match &shortfall {
            Some(s) => format!("Insufficient funds: need {} more", s.missing_display()),
            None => "Insufficient funds for this transaction".to_string(),
        };
        Self {
            shortfall,
            ..Self::new(DiagnosisKind::InsufficientFunds, message)
        }
    }

    pub fn accounts_not_ready() -> Self {
        Self::new(
            DiagnosisKind::AccountsNotReady,
            "Required accounts are not initialized yet",
        )
    }

    pub fn remote_program_error(code: u32, message: impl Into<String>) -> Self {
        Self::new(DiagnosisKind::RemoteProgramError, message).with_code(code)
    }

    pub fn unknown(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            Self::new(DiagnosisKind::Unknown, "Transaction failed for an unknown reason")
        } else {
            Self::new(DiagnosisKind::Unknown, format!("Transaction failed: {}", text))
        }
    }
}

/// Stateless failure classifier bound to one program's error table
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    error_table: ErrorTable,
    native_decimals: u8,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(ErrorTable::perpetuals())
    }
}

impl ErrorClassifier {
    pub fn new(error_table: ErrorTable) -> Self {
        Self {
            error_table,
            native_decimals: NATIVE_DECIMALS,
        }
    }

    pub fn for_contract(contract: &ProgramContract) -> Self {
        Self::new(contract.error_table.clone())
    }

    pub fn with_native_decimals(mut self, decimals: u8) -> Self {
        self.native_decimals = decimals;
        self
    }

    pub fn error_table(&self) -> &ErrorTable {
        &self.error_table
    }

    pub fn native_decimals(&self) -> u8 {
        self.native_decimals
    }

    /// Classifies `failure`, using `logs` (and any logs the failure carries)
    /// to recover detail. Always returns a diagnosis.
    pub fn classify(&self, failure: impl Into<Failure>, logs: &[String]) -> Diagnosis {
        let failure = failure.into();
        let logs: Vec<&str> = logs
            .iter()
            .chain(failure.logs())
            .map(String::as_str)
            .collect();

        let diagnosis = match &failure {
            Failure::Diagnosed(diagnosis) => return diagnosis.clone(),
            Failure::Signer(SignerError::Rejected(_)) => Diagnosis::user_cancelled(),
            _ => match failure.instruction_failure() {
                Some(structured) => self.diagnose_instruction(&structured, &logs),
                None => self.match_text(&failure.text(), &logs),
            },
        };

        debug!(
            kind = %diagnosis.kind,
            code = ?diagnosis.code,
            instruction_index = ?diagnosis.instruction_index,
            "Classified failure"
        );
        diagnosis
    }

    fn diagnose_instruction(&self, failure: &InstructionFailure, logs: &[&str]) -> Diagnosis {
        let index = failure.index;
        let diagnosis = match &failure.error {
            InstructionErrorKind::Custom(CODE_INSUFFICIENT_FUNDS) => {
                Diagnosis::insufficient_funds(shortfall::scan(
                    logs.iter().copied(),
                    self.native_decimals,
                ))
                .with_code(CODE_INSUFFICIENT_FUNDS)
            }
            InstructionErrorKind::Builtin(name) if name == "InsufficientFunds" => {
                Diagnosis::insufficient_funds(shortfall::scan(
                    logs.iter().copied(),
                    self.native_decimals,
                ))
            }
            InstructionErrorKind::Custom(CODE_INSTRUCTION_DID_NOT_DESERIALIZE) => {
                Diagnosis::remote_program_error(
                    CODE_INSTRUCTION_DID_NOT_DESERIALIZE,
                    "Invalid instruction data",
                )
            }
            InstructionErrorKind::Builtin(name) if name == "InvalidInstructionData" => {
                Diagnosis::new(DiagnosisKind::RemoteProgramError, "Invalid instruction data")
            }
            InstructionErrorKind::Custom(CODE_ACCOUNT_NOT_INITIALIZED) => {
                Diagnosis::accounts_not_ready().with_code(CODE_ACCOUNT_NOT_INITIALIZED)
            }
            InstructionErrorKind::Builtin(name) if name == "UninitializedAccount" => {
                Diagnosis::accounts_not_ready()
            }
            InstructionErrorKind::Custom(code) if ACCOUNT_VALIDATION_CODES.contains(code) => {
                Diagnosis::remote_program_error(
                    *code,
                    format!("Account validation failed (code {})", code),
                )
            }
            InstructionErrorKind::Builtin(name) if name == "InvalidAccountData" => {
                Diagnosis::new(DiagnosisKind::RemoteProgramError, "Account validation failed")
            }
            InstructionErrorKind::Custom(code) => match self.error_table.message(*code) {
                Some(message) => Diagnosis::remote_program_error(*code, message),
                None => Diagnosis::remote_program_error(
                    *code,
                    format!("Instruction {} failed with code {}", index, code),
                ),
            },
            InstructionErrorKind::Builtin(name) => Diagnosis::new(
                DiagnosisKind::RemoteProgramError,
                format!("Instruction {} failed: {}", index, name),
            ),
        };
        diagnosis.at_instruction(index)
    }

    fn match_text(&self, text: &str, logs: &[&str]) -> Diagnosis {
        let mut haystack = text.to_lowercase();
        for line in logs {
            haystack.push('\n');
            haystack.push_str(&line.to_lowercase());
        }
        let input = MatchInput {
            text,
            haystack,
            logs,
            classifier: self,
        };

        MATCHERS
            .iter()
            .find_map(|(name, matcher)| {
                let diagnosis = matcher(&input)?;
                debug!(matcher = *name, "Unstructured failure matched");
                Some(diagnosis)
            })
            .unwrap_or_else(|| Diagnosis::unknown(text))
    }
}
