//! Mint orchestration
//!
//! A mint runs through these stages, stopping at the first failure:
//! 1. validate the request and locate the proof and verification key
//! 2. resolve the nullifier
//! 3. check the nullifier against the replay guard (fast reject)
//! 4. verify the proof (expensive)
//! 5. commit the nullifier atomically
//! 6. issue the transfer
//!
//! A failed proof never burns a nullifier because the commit only happens
//! after verification. A failed issuance after the commit is rolled back
//! when the ledger definitely does not hold the transaction. Stages 5 and 6
//! run in a spawned task that outlives the caller.

use anyhow::Context;
use num_bigint::BigUint;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use wormhole_common::{Address, Error, MintRequest, MintResponse, Nullifier, Result};

use crate::artifact::{verification_key_path, ArtifactReader, FsArtifactReader};
use crate::config::{Config, LedgerBackend, MissingNullifierPolicy, StoreBackend};
use crate::identity::MinterIdentity;
use crate::issuer::TransactionIssuer;
use crate::ledger::{Ledger, MemoryLedger, RpcLedger};
use crate::nullifier;
use crate::replay::ReplayGuard;
use crate::store::{KvStore, MemoryStore, RedisStore};
use crate::verifier::{CommandVerifier, FixtureBypass, ProofVerifier};

/// Stage of a mint, used for logging failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintStage {
    Validating,
    ResolvingNullifier,
    CheckingReplay,
    Verifying,
    CommittingReplay,
    Issuing,
    Done,
}

impl fmt::Display for MintStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MintStage::Validating => "validating",
            MintStage::ResolvingNullifier => "resolving nullifier",
            MintStage::CheckingReplay => "checking replay",
            MintStage::Verifying => "verifying",
            MintStage::CommittingReplay => "committing replay",
            MintStage::Issuing => "issuing",
            MintStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Validated request parameters
struct ValidatedMint {
    amount: BigUint,
    proof_path: PathBuf,
    vk_path: PathBuf,
}

/// Proof-gated mint service
#[derive(Clone)]
pub struct MintService {
    artifacts: Arc<dyn ArtifactReader>,
    replay: ReplayGuard,
    verifier: Arc<dyn ProofVerifier>,
    issuer: TransactionIssuer,
    missing_nullifier_policy: MissingNullifierPolicy,
    release_on_issue_failure: bool,
}

impl MintService {
    /// Create a service that rejects requests without a nullifier and
    /// releases the nullifier when issuance definitely failed
    pub fn new(
        artifacts: Arc<dyn ArtifactReader>,
        replay: ReplayGuard,
        verifier: Arc<dyn ProofVerifier>,
        issuer: TransactionIssuer,
    ) -> Self {
        Self {
            artifacts,
            replay,
            verifier,
            issuer,
            missing_nullifier_policy: MissingNullifierPolicy::Reject,
            release_on_issue_failure: true,
        }
    }

    pub fn with_missing_nullifier_policy(mut self, policy: MissingNullifierPolicy) -> Self {
        self.missing_nullifier_policy = policy;
        self
    }

    pub fn with_release_on_issue_failure(mut self, release: bool) -> Self {
        self.release_on_issue_failure = release;
        self
    }

    /// Wire up all components from configuration
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let identity = MinterIdentity::from_hex(&config.minter_private_key)
            .context("Failed to load minter identity")?;
        info!("Minting identity: {}", identity.address());

        let store: Arc<dyn KvStore> = match config.store_backend {
            StoreBackend::Memory => {
                warn!("Using in-memory replay store; spent nullifiers are lost on restart");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Redis => Arc::new(
                RedisStore::new(&config.redis_url)
                    .await
                    .context("Failed to connect to Redis")?,
            ),
        };

        let ledger: Arc<dyn Ledger> = match config.ledger_backend {
            LedgerBackend::Memory => {
                info!("Using in-memory ledger (chain id {})", config.chain_id);
                Arc::new(MemoryLedger::new(config.chain_id))
            }
            LedgerBackend::Rpc => {
                let url = config
                    .ledger_rpc_url
                    .clone()
                    .context("LEDGER_RPC_URL is required for the rpc ledger")?;
                Arc::new(RpcLedger::new(url))
            }
        };

        let artifacts: Arc<dyn ArtifactReader> = Arc::new(FsArtifactReader::new());
        let command = CommandVerifier::from_command_line(&config.verifier_command)
            .context("Invalid VERIFIER_COMMAND")?
            .with_timeout(config.verifier_timeout());
        let verifier: Arc<dyn ProofVerifier> = Arc::new(FixtureBypass::new(
            Arc::new(command),
            artifacts.clone(),
            config.allow_fixture_proofs,
        ));

        Ok(Self::new(
            artifacts,
            ReplayGuard::new(store),
            verifier,
            TransactionIssuer::new(ledger, identity),
        )
        .with_missing_nullifier_policy(config.missing_nullifier_policy)
        .with_release_on_issue_failure(config.release_on_issue_failure))
    }

    pub fn issuer(&self) -> &TransactionIssuer {
        &self.issuer
    }

    /// Verify the replay store is reachable
    pub async fn health_check(&self) -> Result<()> {
        self.replay.health_check().await
    }

    /// Mint `req.amount` to `req.to` if the proof checks out and its
    /// nullifier is unspent
    ///
    /// Dropping the returned future before the nullifier is committed cancels
    /// the mint and kills a running verifier process. Once committed, the
    /// commit, issuance and any rollback complete in the background.
    pub async fn mint(&self, req: MintRequest) -> Result<MintResponse> {
        let span = info_span!("mint", to = %req.to);
        async move {
            let mut stage = MintStage::Validating;
            match self.run(&req, &mut stage).await {
                Ok(response) => {
                    info!(
                        "Mint succeeded: tx {} nullifier {}",
                        response.tx_hash, response.nullifier
                    );
                    Ok(response)
                }
                Err(e) => {
                    warn!("Mint failed while {}: {}", stage, e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, req: &MintRequest, stage: &mut MintStage) -> Result<MintResponse> {
        let validated = self.validate(req).await?;

        *stage = MintStage::ResolvingNullifier;
        let resolved = nullifier::resolve(req, &validated.proof_path, self.artifacts.as_ref())
            .await
            .filter(|r| !r.nullifier.is_zero());

        let guarded = match resolved {
            Some(r) => {
                debug!("Nullifier {} resolved from {:?}", r.nullifier, r.source);
                Some(r.nullifier)
            }
            None => match self.missing_nullifier_policy {
                MissingNullifierPolicy::Reject => return Err(Error::MissingNullifier),
                MissingNullifierPolicy::Degraded => {
                    warn!(
                        "DEGRADED MODE: no nullifier for proof {}; minting WITHOUT replay protection",
                        validated.proof_path.display()
                    );
                    None
                }
            },
        };

        if let Some(n) = &guarded {
            *stage = MintStage::CheckingReplay;
            if self.replay.is_used(n).await? {
                warn!("Double-spending attempt detected: {}", n);
                return Err(Error::NullifierReplay(n.clone()));
            }
        }

        *stage = MintStage::Verifying;
        let started = std::time::Instant::now();
        let accepted = self
            .verifier
            .verify(&validated.vk_path, &validated.proof_path)
            .await?;
        if !accepted {
            return Err(Error::ProofRejected);
        }
        info!(
            "ZK Proof verification succeeded in {}",
            format_elapsed(started.elapsed())
        );

        // Dropping the JoinHandle does not abort the task
        *stage = MintStage::CommittingReplay;
        let service = self.clone();
        let to = req.to;
        let task = tokio::spawn(
            async move { service.commit_and_issue(guarded, to, validated.amount).await }
                .instrument(Span::current()),
        );
        let (reached, outcome) = task
            .await
            .map_err(|e| Error::Other(anyhow::anyhow!("mint task failed: {}", e)))?;
        *stage = reached;
        outcome
    }

    /// Commit the nullifier, issue the transfer and settle a failed issuance
    async fn commit_and_issue(
        &self,
        guarded: Option<Nullifier>,
        to: Address,
        amount: BigUint,
    ) -> (MintStage, Result<MintResponse>) {
        if let Some(n) = &guarded {
            if let Err(e) = self.replay.mark_used(n).await {
                return (MintStage::CommittingReplay, Err(e));
            }
        }

        let tx_hash = match self.issuer.issue(to, &amount).await {
            Ok(hash) => hash,
            Err(e) => {
                let definite = e.is_definite();
                if let Some(n) = &guarded {
                    self.settle_failed_issue(n, definite).await;
                }
                return (MintStage::Issuing, Err(e.into_error()));
            }
        };

        (
            MintStage::Done,
            Ok(MintResponse {
                tx_hash,
                nullifier: guarded.unwrap_or_default(),
            }),
        )
    }

    /// Amount first, then the proof reference, the proof and its key.
    /// Nothing is written on failure.
    async fn validate(&self, req: &MintRequest) -> Result<ValidatedMint> {
        let amount = req
            .amount
            .as_ref()
            .and_then(|a| a.to_biguint())
            .filter(|a| a.bits() > 0)
            .ok_or(Error::InvalidAmount)?;

        if req.proof_data.trim().is_empty() {
            return Err(Error::MissingProof);
        }

        let proof_path = PathBuf::from(&req.proof_data);
        if !self.artifacts.exists(&proof_path).await? {
            return Err(Error::ProofNotFound(proof_path));
        }

        let vk_path = verification_key_path(&proof_path);
        if !self.artifacts.exists(&vk_path).await? {
            return Err(Error::VerificationKeyNotFound(vk_path));
        }

        Ok(ValidatedMint {
            amount,
            proof_path,
            vk_path,
        })
    }

    /// Handle a committed nullifier whose mint did not go through
    async fn settle_failed_issue(&self, nullifier: &Nullifier, definite: bool) {
        if !definite {
            error!(
                "Nullifier {} is consumed but the mint transaction may not have landed; reconcile manually",
                nullifier
            );
            return;
        }

        if !self.release_on_issue_failure {
            error!(
                "Nullifier {} is consumed without a mint (rollback disabled); reconcile manually",
                nullifier
            );
            return;
        }

        match self.replay.release(nullifier).await {
            Ok(()) => warn!("Released nullifier {} after failed issuance", nullifier),
            Err(e) => error!(
                "Failed to release nullifier {} after failed issuance: {}; reconcile manually",
                nullifier, e
            ),
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() > 0 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
