//! Trading client facade
//!
//! Wires an [`InstructionBuilder`] and a [`TransactionExecutor`] over the same
//! injected transport. Every operation builds, submits and waits for
//! finality, and every failure on the way comes back as a [`Diagnosis`].

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use std::future::Future;
use std::sync::Arc;
use tracing::{info_span, Instrument};

use crate::config::{ClientConfig, ConfigError};
use crate::diagnosis::{Diagnosis, ErrorClassifier};
use crate::executor::TransactionExecutor;
use crate::metrics::{metrics, Timer};
use crate::observability::CorrelationId;
use crate::program::ProgramContract;
use crate::transport::{RpcTransport, TransactionSigner, Transport};
use crate::tx_builder::{
    AddLiquidityRequest, ClosePositionRequest, InstructionBuilder, OpenPositionRequest,
    OpenPositionWithSwapRequest, RemoveLiquidityRequest, SlippageTolerance, SwapRequest,
    TransactionBuilderError,
};

pub struct PerpsClient {
    builder: InstructionBuilder,
    executor: TransactionExecutor,
}

impl PerpsClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn TransactionSigner>,
        contract: &ProgramContract,
        slippage: SlippageTolerance,
    ) -> Self {
        Self::with_classifier(
            transport,
            signer,
            contract,
            slippage,
            ErrorClassifier::for_contract(contract),
        )
    }

    pub fn with_classifier(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn TransactionSigner>,
        contract: &ProgramContract,
        slippage: SlippageTolerance,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            builder: InstructionBuilder::new(transport.clone(), contract, slippage),
            executor: TransactionExecutor::new(transport, signer, classifier),
        }
    }

    /// Client over JSON-RPC for the stock perpetuals program.
    pub fn from_config(
        config: &ClientConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let contract = ProgramContract::perpetuals(config.program_id()?);
        let slippage = SlippageTolerance::new(config.slippage_bps).map_err(|e| {
            ConfigError::Invalid {
                field: "slippage_bps",
                reason: e.to_string(),
            }
        })?;
        let transport = Arc::new(RpcTransport::new(
            config.rpc_url.clone(),
            config.commitment()?,
            config.confirm_timeout(),
            config.poll_interval(),
        ));
        let classifier =
            ErrorClassifier::for_contract(&contract).with_native_decimals(config.native_decimals);

        Ok(Self::with_classifier(
            transport, signer, &contract, slippage, classifier,
        ))
    }

    /// Owner of every position and token account this client touches
    pub fn owner(&self) -> Pubkey {
        self.executor.payer()
    }

    pub fn builder(&self) -> &InstructionBuilder {
        &self.builder
    }

    pub async fn swap(&self, req: &SwapRequest) -> Result<Signature, Diagnosis> {
        self.run("swap", async {
            self.check_owner(&req.owner)?;
            Ok(vec![self.builder.build_swap(req).await?])
        })
        .await
    }

    pub async fn add_liquidity(&self, req: &AddLiquidityRequest) -> Result<Signature, Diagnosis> {
        self.run("add_liquidity", async {
            self.check_owner(&req.owner)?;
            Ok(vec![self.builder.build_add_liquidity(req).await?])
        })
        .await
    }

    pub async fn remove_liquidity(
        &self,
        req: &RemoveLiquidityRequest,
    ) -> Result<Signature, Diagnosis> {
        self.run("remove_liquidity", async {
            self.check_owner(&req.owner)?;
            Ok(vec![self.builder.build_remove_liquidity(req).await?])
        })
        .await
    }

    pub async fn open_position(&self, req: &OpenPositionRequest) -> Result<Signature, Diagnosis> {
        self.run("open_position", async {
            self.check_owner(&req.owner)?;
            Ok(vec![self.builder.build_open_position(req).await?])
        })
        .await
    }

    /// Swap (when needed) and open in one atomic transaction.
    pub async fn open_position_with_swap(
        &self,
        req: &OpenPositionWithSwapRequest,
    ) -> Result<Signature, Diagnosis> {
        self.run("open_position_with_swap", async {
            self.check_owner(&req.owner)?;
            self.builder.build_open_position_with_swap(req).await
        })
        .await
    }

    pub async fn close_position(&self, req: &ClosePositionRequest) -> Result<Signature, Diagnosis> {
        self.run("close_position", async {
            self.check_owner(&req.owner)?;
            Ok(vec![self.builder.build_close_position(req).await?])
        })
        .await
    }

    /// The signer is the only key that signs, so it must own the request.
    fn check_owner(&self, owner: &Pubkey) -> Result<(), TransactionBuilderError> {
        let signer = self.owner();
        if *owner != signer {
            return Err(TransactionBuilderError::Configuration(format!(
                "request owner {} does not match signer {}",
                owner, signer
            )));
        }
        Ok(())
    }

    async fn run<F>(&self, operation: &'static str, build: F) -> Result<Signature, Diagnosis>
    where
        F: Future<Output = Result<Vec<Instruction>, TransactionBuilderError>>,
    {
        let correlation_id = CorrelationId::new();
        let span = info_span!(
            "perps_operation",
            operation,
            owner = %self.owner(),
            correlation_id = %correlation_id
        );

        async move {
            let timer = Timer::new();
            let instructions = build
                .await
                .map_err(|err| self.executor.diagnose(operation, err))?;
            timer.observe_duration(&metrics().build_latency);

            self.executor.execute(operation, &instructions).await
        }
        .instrument(span)
        .await
    }
}
