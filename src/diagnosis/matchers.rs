//! Ordered matchers for unstructured failures
//!
//! Each matcher inspects the lowercased failure text (and the logs where it
//! matters) and either produces a [`Diagnosis`] or passes. [`MATCHERS`] is
//! tried front to back and the first hit wins, so new matchers are appended,
//! never inserted.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{shortfall, Diagnosis, DiagnosisKind, ErrorClassifier};

/// Everything a matcher may look at
pub(crate) struct MatchInput<'a> {
    /// Original failure text
    pub text: &'a str,
    /// `text` lowercased, plus every log line lowercased
    pub haystack: String,
    pub logs: &'a [&'a str],
    pub classifier: &'a ErrorClassifier,
}

impl MatchInput<'_> {
    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.haystack.contains(n))
    }
}

pub(crate) type Matcher = fn(&MatchInput<'_>) -> Option<Diagnosis>;

pub(crate) const MATCHERS: &[(&str, Matcher)] = &[
    ("user_rejected", user_rejected),
    ("stale_blockhash", stale_blockhash),
    ("insufficient_funds", insufficient_funds),
    ("accounts_not_ready", accounts_not_ready),
    ("simulation_failed", simulation_failed),
    ("swap_subsystem", swap_subsystem),
    ("program_error_code", program_error_code),
    ("token_account", token_account),
];

static INSUFFICIENT_CUSTOM_CODE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"custom program error: 0x1\b").ok());

static HEX_CUSTOM_CODE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"custom program error: 0x([0-9a-f]+)").ok());

static ANCHOR_ERROR_NUMBER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"error number: (\d+)").ok());

static ANCHOR_ERROR_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Error Code: ([A-Za-z0-9_]+)").ok());

fn user_rejected(input: &MatchInput<'_>) -> Option<Diagnosis> {
    input
        .contains_any(&[
            "user rejected",
            "rejected the request",
            "user denied",
            "user cancelled",
            "user canceled",
            "signing rejected",
        ])
        .then(Diagnosis::user_cancelled)
}

fn stale_blockhash(input: &MatchInput<'_>) -> Option<Diagnosis> {
    input
        .contains_any(&[
            "blockhash not found",
            "blockhashnotfound",
            "block height exceeded",
            "transaction expired",
        ])
        .then(Diagnosis::stale_freshness_token)
}

fn insufficient_funds(input: &MatchInput<'_>) -> Option<Diagnosis> {
    let phrased = input.contains_any(&[
        "insufficient funds",
        "insufficientfunds",
        "insufficient lamports",
        "insufficient balance",
        "no record of a prior credit",
    ]);
    let coded = INSUFFICIENT_CUSTOM_CODE
        .as_ref()
        .is_some_and(|re| re.is_match(&input.haystack));
    if !(phrased || coded) {
        return None;
    }

    let lines = input.logs.iter().copied().chain(std::iter::once(input.text));
    Some(Diagnosis::insufficient_funds(shortfall::scan(
        lines,
        input.classifier.native_decimals(),
    )))
}

fn accounts_not_ready(input: &MatchInput<'_>) -> Option<Diagnosis> {
    input
        .contains_any(&[
            "account not found",
            "accountnotfound",
            "could not find account",
            "not initialized",
            "accountnotinitialized",
            "uninitialized account",
            "uninitializedaccount",
        ])
        .then(Diagnosis::accounts_not_ready)
}

fn simulation_failed(input: &MatchInput<'_>) -> Option<Diagnosis> {
    input
        .contains_any(&["simulation failed", "transaction simulation failed"])
        .then(|| {
            Diagnosis::new(
                DiagnosisKind::SimulationRejected,
                "Transaction simulation failed; the transaction would not succeed with current state",
            )
        })
}

fn swap_subsystem(input: &MatchInput<'_>) -> Option<Diagnosis> {
    input
        .contains_any(&[
            "swap failed",
            "swap error",
            "route not found",
            "no route found",
            "no routes found",
            "could not find any route",
        ])
        .then(|| {
            Diagnosis::new(
                DiagnosisKind::SwapSubsystemFailure,
                "Token swap failed; try a different amount or token",
            )
        })
}

/// Program error code in hex, Anchor error number or Anchor error name form,
/// resolved against the error table.
fn program_error_code(input: &MatchInput<'_>) -> Option<Diagnosis> {
    let hex = HEX_CUSTOM_CODE
        .as_ref()
        .and_then(|re| re.captures(&input.haystack))
        .and_then(|caps| u32::from_str_radix(caps.get(1)?.as_str(), 16).ok());
    let decimal = || {
        ANCHOR_ERROR_NUMBER
            .as_ref()
            .and_then(|re| re.captures(&input.haystack))
            .and_then(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
    };

    // names are case-sensitive, so these read the original lines
    let named = || {
        let re = ANCHOR_ERROR_NAME.as_ref()?;
        std::iter::once(input.text)
            .chain(input.logs.iter().copied())
            .filter_map(|line| re.captures(line))
            .find_map(|caps| input.classifier.error_table().code_for_name(caps.get(1)?.as_str()))
    };

    let code = hex.or_else(decimal).or_else(named)?;
    let message = input.classifier.error_table().message(code)?;
    Some(Diagnosis::remote_program_error(code, message))
}

fn token_account(input: &MatchInput<'_>) -> Option<Diagnosis> {
    input
        .contains_any(&[
            "token account",
            "tokenaccount",
            "invalid account owner",
            "owner does not match",
            "mint mismatch",
        ])
        .then(|| {
            Diagnosis::new(
                DiagnosisKind::TokenAccountError,
                "Token account is missing or invalid; make sure you hold the token being used",
            )
        })
}
