//! Atomic composition, signing and submission
//!
//! [`TransactionComposer`] packs an ordered instruction list into one v0
//! transaction for a fee payer and freshness token. [`TransactionExecutor`]
//! drives a list through compose → sign → send → confirm and hands every
//! failure to the [`ErrorClassifier`].
//!
//! Nothing is retried here. A stale blockhash comes back as a
//! `StaleFreshnessToken` diagnosis and the caller decides whether to rebuild.

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::diagnosis::{Diagnosis, ErrorClassifier};
use crate::metrics::{metrics, Timer};
use crate::transport::{TransactionSigner, Transport};
use crate::tx_builder::TransactionBuilderError;

/// Builds unsigned v0 transactions
pub struct TransactionComposer;

impl TransactionComposer {
    /// All `instructions` in order, paid by `payer`, valid against `blockhash`.
    /// Signature slots are zeroed for the signer to fill.
    pub fn compose(
        payer: &Pubkey,
        instructions: &[Instruction],
        blockhash: Hash,
    ) -> Result<VersionedTransaction, TransactionBuilderError> {
        if instructions.is_empty() {
            return Err(TransactionBuilderError::compile("no instructions to compose"));
        }

        let message = MessageV0::try_compile(payer, instructions, &[], blockhash)
            .map_err(|e| TransactionBuilderError::compile(e.to_string()))?;
        let required = usize::from(message.header.num_required_signatures);

        Ok(VersionedTransaction {
            signatures: vec![Signature::default(); required],
            message: VersionedMessage::V0(message),
        })
    }
}

/// Submits composed transactions through injected capabilities
#[derive(Clone)]
pub struct TransactionExecutor {
    transport: Arc<dyn Transport>,
    signer: Arc<dyn TransactionSigner>,
    classifier: ErrorClassifier,
}

impl TransactionExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn TransactionSigner>,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            transport,
            signer,
            classifier,
        }
    }

    /// Fee payer, which is always the signer
    pub fn payer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Executes `instructions` atomically and waits for finality.
    ///
    /// `operation` labels metrics and logs.
    pub async fn execute(
        &self,
        operation: &'static str,
        instructions: &[Instruction],
    ) -> Result<Signature, Diagnosis> {
        self.submit(operation, instructions)
            .await
            .map_err(|err| self.diagnose(operation, err))
    }

    /// Classifies and records a failure of `operation`.
    pub fn diagnose(&self, operation: &'static str, err: TransactionBuilderError) -> Diagnosis {
        let category = err.category();
        let diagnosis = self.classifier.classify(err, &[]);
        metrics().record_diagnosis(&diagnosis);
        warn!(
            operation,
            category,
            kind = %diagnosis.kind,
            message = %diagnosis.message,
            "Operation failed"
        );
        diagnosis
    }

    async fn submit(
        &self,
        operation: &'static str,
        instructions: &[Instruction],
    ) -> Result<Signature, TransactionBuilderError> {
        let payer = self.payer();
        let freshness = self.transport.latest_blockhash().await?;
        let tx = TransactionComposer::compose(&payer, instructions, freshness.blockhash)?;
        let bytes = bincode::serialize(&tx)
            .map_err(|e| TransactionBuilderError::Serialization(e.to_string()))?;

        let signed = self.signer.sign(&bytes).await?;
        debug!(
            operation,
            payer = %payer,
            instructions = instructions.len(),
            size = signed.len(),
            "Transaction signed"
        );

        let signature = self.transport.send_signed_bytes(&signed).await?;
        metrics()
            .operations_submitted
            .with_label_values(&[operation])
            .inc();
        info!(operation, signature = %signature, "Transaction submitted");

        let timer = Timer::new();
        self.transport
            .confirm(&signature, freshness.last_valid_block_height)
            .await?;
        timer.observe_duration(&metrics().confirm_latency);
        metrics()
            .operations_confirmed
            .with_label_values(&[operation])
            .inc();
        info!(
            operation,
            signature = %signature,
            elapsed_secs = timer.elapsed_secs(),
            "Transaction finalized"
        );

        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::DiagnosisKind;
    use crate::test_utils::{Fixture, MockSigner};
    use crate::transport::TransportError;
    use serde_json::json;
    use solana_sdk::instruction::AccountMeta;

    fn noop_instruction(fixture: &Fixture, tag: u8) -> Instruction {
        Instruction::new_with_bytes(
            fixture.program_id,
            &[tag],
            vec![AccountMeta::new(fixture.owner, true)],
        )
    }

    fn executor(fixture: &Fixture, signer: Arc<MockSigner>) -> TransactionExecutor {
        TransactionExecutor::new(
            fixture.transport.clone(),
            signer,
            ErrorClassifier::for_contract(&fixture.contract),
        )
    }

    #[test]
    fn test_compose_keeps_order_and_payer() {
        let fixture = Fixture::with_mints(0);
        let blockhash = Hash::new_unique();
        let ixs = [noop_instruction(&fixture, 1), noop_instruction(&fixture, 2)];

        let tx = TransactionComposer::compose(&fixture.owner, &ixs, blockhash).unwrap();
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.message.static_account_keys()[0], fixture.owner);
        assert_eq!(*tx.message.recent_blockhash(), blockhash);

        let data: Vec<u8> = tx
            .message
            .instructions()
            .iter()
            .map(|ix| ix.data[0])
            .collect();
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn test_compose_empty_is_error() {
        let err = TransactionComposer::compose(&Pubkey::new_unique(), &[], Hash::default())
            .unwrap_err();
        assert!(matches!(err, TransactionBuilderError::Compile(_)));
    }

    #[tokio::test]
    async fn test_execute_signs_sends_and_confirms() {
        let fixture = Fixture::with_mints(0);
        let signer = fixture.signer();
        let executor = executor(&fixture, signer.clone());

        let signature = executor
            .execute("test", &[noop_instruction(&fixture, 7)])
            .await
            .unwrap();

        assert_eq!(
            fixture.transport.calls(),
            vec!["latest_blockhash", "send_signed_bytes", "confirm"]
        );
        assert_eq!(signer.sign_count(), 1);

        let sent = fixture.transport.sent_transactions();
        let tx: VersionedTransaction = bincode::deserialize(&sent[0]).unwrap();
        assert_eq!(tx.signatures[0], signature);
        assert_eq!(*tx.message.recent_blockhash(), fixture.transport.blockhash());
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
    }

    #[tokio::test]
    async fn test_rejected_signature_is_user_cancelled() {
        let fixture = Fixture::with_mints(0);
        let signer = Arc::new(MockSigner::rejecting(fixture.owner));
        let executor = executor(&fixture, signer);

        let diagnosis = executor
            .execute("test", &[noop_instruction(&fixture, 1)])
            .await
            .unwrap_err();

        assert_eq!(diagnosis.kind, DiagnosisKind::UserCancelled);
        assert!(fixture.transport.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_stale_blockhash_is_not_retried() {
        let fixture = Fixture::with_mints(0);
        fixture.transport.push_send_result(Err(TransportError::Rejected {
            message: "Transaction simulation failed: Blockhash not found".to_string(),
            error: Some(json!("BlockhashNotFound")),
            logs: vec![],
        }));
        let executor = executor(&fixture, fixture.signer());

        let diagnosis = executor
            .execute("test", &[noop_instruction(&fixture, 1)])
            .await
            .unwrap_err();

        assert_eq!(diagnosis.kind, DiagnosisKind::StaleFreshnessToken);
        assert_eq!(fixture.transport.sent_transactions().len(), 1);
        assert!(!fixture.transport.calls().contains(&"confirm"));
    }

    #[tokio::test]
    async fn test_onchain_failure_uses_logs() {
        let fixture = Fixture::with_mints(0);
        fixture.transport.push_confirm_result(Err(TransportError::Rejected {
            message: "Transaction failed".to_string(),
            error: Some(json!({"InstructionError": [0, {"Custom": 1}]})),
            logs: vec!["Transfer: insufficient lamports 1000000000, need 1500000000".to_string()],
        }));
        let executor = executor(&fixture, fixture.signer());

        let diagnosis = executor
            .execute("test", &[noop_instruction(&fixture, 1)])
            .await
            .unwrap_err();

        assert_eq!(diagnosis.kind, DiagnosisKind::InsufficientFunds);
        assert_eq!(diagnosis.shortfall.unwrap().missing_display(), "0.5");
        assert_eq!(diagnosis.instruction_index, Some(0));
    }

    #[tokio::test]
    async fn test_expired_before_landing_is_stale() {
        let fixture = Fixture::with_mints(0);
        fixture.transport.push_confirm_result(Err(TransportError::BlockhashExpired {
            signature: Signature::default(),
            last_valid_block_height: fixture.transport.last_valid_block_height(),
        }));
        let executor = executor(&fixture, fixture.signer());

        let diagnosis = executor
            .execute("test", &[noop_instruction(&fixture, 1)])
            .await
            .unwrap_err();

        assert_eq!(diagnosis.kind, DiagnosisKind::StaleFreshnessToken);
        assert_eq!(
            fixture.transport.confirm_heights(),
            vec![fixture.transport.last_valid_block_height()]
        );
        assert_eq!(fixture.transport.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_blockhash_failure_is_classified() {
        let fixture = Fixture::with_mints(0);
        fixture
            .transport
            .fail_blockhash(TransportError::Rpc("connection refused".to_string()));
        let executor = executor(&fixture, fixture.signer());

        let diagnosis = executor
            .execute("test", &[noop_instruction(&fixture, 1)])
            .await
            .unwrap_err();
        assert_eq!(diagnosis.kind, DiagnosisKind::Unknown);
        assert!(diagnosis.message.contains("connection refused"));
    }
}
