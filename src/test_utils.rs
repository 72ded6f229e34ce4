//! Test Utilities Module
//!
//! In-memory stand-ins for the injected capabilities plus a ready-made pool
//! fixture, so builders, the executor and the client can be exercised without
//! a cluster.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::address::AddressResolver;
use crate::program::{CustodyAccount, OracleParams, PoolAccount, ProgramContract};
use crate::transport::signer::sign_with_keypair;
use crate::transport::{Freshness, SignerError, Transport, TransactionSigner, TransportError};
use crate::tx_builder::{InstructionBuilder, SlippageTolerance};
use crate::types::CustodySnapshot;

/// Mock Transport for testing
///
/// Accounts live in a map; send and confirm outcomes can be scripted and are
/// consumed in FIFO order. Unscripted sends succeed with the transaction's
/// first signature and unscripted confirms succeed.
pub struct MockTransport {
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    blockhash: Hash,
    last_valid_block_height: u64,
    blockhash_error: Mutex<Option<TransportError>>,
    send_results: Mutex<VecDeque<Result<Signature, TransportError>>>,
    confirm_results: Mutex<VecDeque<Result<(), TransportError>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    confirm_heights: Mutex<Vec<u64>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
            blockhash_error: Mutex::new(None),
            send_results: Mutex::new(VecDeque::new()),
            confirm_results: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            confirm_heights: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn last_valid_block_height(&self) -> u64 {
        self.last_valid_block_height
    }

    /// Expiry heights passed to `confirm`, in call order.
    pub fn confirm_heights(&self) -> Vec<u64> {
        self.confirm_heights.lock().unwrap().clone()
    }

    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().remove(address);
    }

    /// Next `latest_blockhash` call fails with `error`.
    pub fn fail_blockhash(&self, error: TransportError) {
        *self.blockhash_error.lock().unwrap() = Some(error);
    }

    pub fn push_send_result(&self, result: Result<Signature, TransportError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn push_confirm_result(&self, result: Result<(), TransportError>) {
        self.confirm_results.lock().unwrap().push_back(result);
    }

    /// Raw bytes of every submitted transaction
    pub fn sent_transactions(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    /// Names of the transport methods invoked, in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn latest_blockhash(&self) -> Result<Freshness, TransportError> {
        self.record("latest_blockhash");
        match self.blockhash_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(Freshness {
                blockhash: self.blockhash,
                last_valid_block_height: self.last_valid_block_height,
            }),
        }
    }

    async fn send_signed_bytes(&self, bytes: &[u8]) -> Result<Signature, TransportError> {
        self.record("send_signed_bytes");
        self.sent.lock().unwrap().push(bytes.to_vec());
        if let Some(scripted) = self.send_results.lock().unwrap().pop_front() {
            return scripted;
        }

        let tx: VersionedTransaction =
            bincode::deserialize(bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn confirm(
        &self,
        _signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), TransportError> {
        self.record("confirm");
        self.confirm_heights
            .lock()
            .unwrap()
            .push(last_valid_block_height);
        self.confirm_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        self.record("fetch_account");
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn fetch_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, TransportError> {
        self.record("fetch_multiple_accounts");
        let accounts = self.accounts.lock().unwrap();
        Ok(addresses.iter().map(|a| accounts.get(a).cloned()).collect())
    }
}

/// Mock signer: signs with a local keypair, or rejects like a wallet whose
/// user pressed "cancel".
pub struct MockSigner {
    keypair: Option<Keypair>,
    pubkey: Pubkey,
    sign_count: AtomicUsize,
}

impl MockSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            pubkey: keypair.pubkey(),
            keypair: Some(keypair),
            sign_count: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(pubkey: Pubkey) -> Self {
        Self {
            keypair: None,
            pubkey,
            sign_count: AtomicUsize::new(0),
        }
    }

    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign(&self, transaction_bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.sign_count.fetch_add(1, Ordering::SeqCst);
        match &self.keypair {
            Some(keypair) => sign_with_keypair(keypair, transaction_bytes),
            None => Err(SignerError::Rejected(
                "User rejected the request.".to_string(),
            )),
        }
    }
}

/// A pool named "main" with `n` custodies, stored in a [`MockTransport`].
pub struct Fixture {
    pub program_id: Pubkey,
    pub owner_keypair: Keypair,
    pub owner: Pubkey,
    pub pool: Pubkey,
    /// In the pool's declared order
    pub custodies: Vec<CustodySnapshot>,
    pub contract: ProgramContract,
    pub transport: Arc<MockTransport>,
}

impl Fixture {
    pub fn with_mints(n: usize) -> Self {
        let program_id = Pubkey::new_unique();
        let resolver = AddressResolver::new(program_id);
        let pool = resolver.pool("main");
        let transport = Arc::new(MockTransport::new());

        let custodies: Vec<CustodySnapshot> = (0..n)
            .map(|i| {
                let mint = Pubkey::new_unique();
                CustodySnapshot {
                    address: resolver.custody(&pool, &mint),
                    pool,
                    mint,
                    token_account: resolver.custody_token_account(&pool, &mint),
                    oracle: Pubkey::new_unique(),
                    decimals: if i % 2 == 0 { 9 } else { 6 },
                }
            })
            .collect();

        for custody in &custodies {
            let account = CustodyAccount {
                pool,
                mint: custody.mint,
                token_account: custody.token_account,
                decimals: custody.decimals,
                is_stable: custody.decimals == 6,
                oracle: OracleParams {
                    oracle_account: custody.oracle,
                    oracle_type: 1,
                    max_price_error: 10_000,
                    max_price_age_sec: 60,
                },
            };
            transport.insert_account(custody.address, account.to_account_data());
        }
        let pool_account = PoolAccount {
            name: "main".to_string(),
            custodies: custodies.iter().map(|c| c.address).collect(),
        };
        transport.insert_account(pool, pool_account.to_account_data());

        let owner_keypair = Keypair::new();
        Self {
            program_id,
            owner: owner_keypair.pubkey(),
            owner_keypair,
            pool,
            custodies,
            contract: ProgramContract::perpetuals(program_id),
            transport,
        }
    }

    pub fn builder(&self) -> InstructionBuilder {
        InstructionBuilder::new(
            self.transport.clone(),
            &self.contract,
            SlippageTolerance::default(),
        )
    }

    /// Signer holding the owner's keypair
    pub fn signer(&self) -> Arc<MockSigner> {
        Arc::new(MockSigner::new(self.owner_keypair.insecure_clone()))
    }
}
