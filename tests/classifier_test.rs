//! Integration tests for failure classification
//!
//! Covers:
//! - structured instruction errors in both serializations
//! - shortfall recovery from log lines
//! - robustness against junk input
//! - matcher priority for unstructured text

use perps_client::diagnosis::Failure;
use perps_client::{Diagnosis, DiagnosisKind, ErrorClassifier, TransportError};
use proptest::prelude::*;
use serde_json::{json, Value};

fn classify(failure: impl Into<Failure>, logs: &[&str]) -> Diagnosis {
    let logs: Vec<String> = logs.iter().map(|l| l.to_string()).collect();
    ErrorClassifier::default().classify(failure, &logs)
}

#[test]
fn test_index_code_pair_without_logs() {
    let d = classify(json!({"index": 3, "code": 1}), &[]);
    assert_eq!(d.kind, DiagnosisKind::InsufficientFunds);
    assert!(d.shortfall.is_none());
    assert_eq!(d.instruction_index, Some(3));
}

#[test]
fn test_index_code_pair_with_shortfall_log() {
    let d = classify(
        json!({"index": 3, "code": 1}),
        &[
            "Program 11111111111111111111111111111111 invoke [2]",
            "Transfer: insufficient lamports 1000000000, need 1500000000",
            "Program 11111111111111111111111111111111 failed: custom program error: 0x1",
        ],
    );
    assert_eq!(d.kind, DiagnosisKind::InsufficientFunds);
    let shortfall = d.shortfall.expect("shortfall recovered");
    assert_eq!(shortfall.available, 1_000_000_000);
    assert_eq!(shortfall.required, 1_500_000_000);
    assert!((shortfall.missing_ui() - 0.5).abs() < 1e-12);
    assert_eq!(d.message, "Insufficient funds: need 0.5 more");
}

#[test]
fn test_bare_pair_matches_named_form() {
    let bare = classify(json!({"InstructionError": [3, {"Custom": 1}]}), &[]);
    let named = classify(json!({"index": 3, "code": 1}), &[]);
    assert_eq!(bare, named);
}

#[test]
fn test_program_table_lookup() {
    let d = classify(json!({"InstructionError": [1, {"Custom": 6014}]}), &[]);
    assert_eq!(d.kind, DiagnosisKind::RemoteProgramError);
    assert_eq!(d.code, Some(6014));
    assert_eq!(d.message, "Price slippage limit exceeded");
}

#[test]
fn test_unstructured_priority() {
    let cases = [
        ("User rejected the request.", DiagnosisKind::UserCancelled),
        ("Blockhash not found", DiagnosisKind::StaleFreshnessToken),
        ("block height exceeded", DiagnosisKind::StaleFreshnessToken),
        (
            "Attempt to debit an account but found no record of a prior credit.",
            DiagnosisKind::InsufficientFunds,
        ),
        ("AccountNotFound", DiagnosisKind::AccountsNotReady),
        (
            "Transaction simulation failed: Error processing Instruction 0",
            DiagnosisKind::SimulationRejected,
        ),
        ("Swap failed: route not found", DiagnosisKind::SwapSubsystemFailure),
        ("custom program error: 0x1770", DiagnosisKind::RemoteProgramError),
        ("invalid account owner", DiagnosisKind::TokenAccountError),
        ("the dog ate it", DiagnosisKind::Unknown),
    ];

    for (text, expected) in cases {
        assert_eq!(classify(text, &[]).kind, expected, "{}", text);
    }
}

#[test]
fn test_insufficient_funds_text_uses_logs() {
    let err = TransportError::Rejected {
        message: "Transaction simulation failed: insufficient funds for fee".to_string(),
        error: None,
        logs: vec!["Program log: insufficient funds: current=1,000,000,000 need=1,500,000,000".to_string()],
    };
    let d = classify(err, &[]);
    assert_eq!(d.kind, DiagnosisKind::InsufficientFunds);
    assert_eq!(d.shortfall.unwrap().missing, 500_000_000);
}

#[test]
fn test_network_unreachable_is_not_a_swap_failure() {
    let err = TransportError::Rpc(
        "error sending request for url (https://api.mainnet-beta.solana.com/): tcp connect error: No route to host (os error 113)"
            .to_string(),
    );
    let d = classify(err, &[]);
    assert_eq!(d.kind, DiagnosisKind::Unknown);
}

#[test]
fn test_expired_blockhash_while_confirming_is_stale() {
    let err = TransportError::BlockhashExpired {
        signature: perps_client::Signature::default(),
        last_valid_block_height: 100,
    };
    let d = classify(err, &[]);
    assert_eq!(d.kind, DiagnosisKind::StaleFreshnessToken);
}

#[test]
fn test_junk_never_panics() {
    let junk = [
        json!(null),
        json!(""),
        json!(42),
        json!([]),
        json!({}),
        json!({"err": null}),
        json!({"InstructionError": "nope"}),
        json!({"a": {"b": {"c": [1, {"Custom": "x"}]}}}),
        json!([[[[[[]]]]]]),
    ];
    for value in junk {
        let d = classify(value, &[]);
        assert!(!d.message.is_empty());
    }
}

fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ".{0,40}".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,16}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn prop_any_json_yields_diagnosis(value in arbitrary_json(), log in ".{0,80}") {
        let d = classify(value, &[log.as_str()]);
        prop_assert!(!d.message.is_empty());
    }

    #[test]
    fn prop_any_text_yields_diagnosis(text in ".{0,200}") {
        let d = classify(text.as_str(), &[]);
        prop_assert!(!d.message.is_empty());
    }
}
