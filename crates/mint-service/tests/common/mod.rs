//! Shared fixtures for the mint service integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mint_service::artifact::FsArtifactReader;
use mint_service::identity::MinterIdentity;
use mint_service::issuer::TransactionIssuer;
use mint_service::ledger::{Ledger, MemoryLedger, SubmitError};
use mint_service::replay::ReplayGuard;
use mint_service::store::MemoryStore;
use mint_service::transaction::SignedTransaction;
use mint_service::verifier::ProofVerifier;
use mint_service::MintService;
use num_bigint::{BigInt, BigUint};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wormhole_common::{Address, Error, MintRequest, Result, TxHash};

pub const CHAIN_ID: u64 = 1337;

pub fn minter() -> MinterIdentity {
    MinterIdentity::from_hex(&"46".repeat(32)).unwrap()
}

pub fn recipient() -> Address {
    Address::new([0x42; 20])
}

/// What a stub verifier answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
    Fail,
}

/// Verifier with a fixed answer that counts its invocations
pub struct StubVerifier {
    outcome: Outcome,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubVerifier {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofVerifier for StubVerifier {
    async fn verify(&self, _vk_path: &Path, _proof_path: &Path) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.outcome {
            Outcome::Accept => Ok(true),
            Outcome::Reject => Ok(false),
            Outcome::Fail => Err(Error::Verification("verifier crashed".to_string())),
        }
    }
}

/// Ledger whose submissions always fail
pub struct FailingLedger {
    pub failure: SubmitError,
}

#[async_trait]
impl Ledger for FailingLedger {
    async fn chain_id(&self) -> Result<u64> {
        Ok(CHAIN_ID)
    }

    async fn next_nonce(&self, _address: &Address) -> Result<u64> {
        Ok(0)
    }

    async fn submit(&self, _tx: &SignedTransaction) -> std::result::Result<TxHash, SubmitError> {
        Err(self.failure.clone())
    }
}

/// Ledger that stalls before answering nonce queries
pub struct SlowLedger {
    pub inner: Arc<dyn Ledger>,
    pub nonce_delay: Duration,
}

#[async_trait]
impl Ledger for SlowLedger {
    async fn chain_id(&self) -> Result<u64> {
        self.inner.chain_id().await
    }

    async fn next_nonce(&self, address: &Address) -> Result<u64> {
        tokio::time::sleep(self.nonce_delay).await;
        self.inner.next_nonce(address).await
    }

    async fn submit(&self, tx: &SignedTransaction) -> std::result::Result<TxHash, SubmitError> {
        self.inner.submit(tx).await
    }
}

/// A proof artifact with its verification key next to it
pub struct ProofFixture {
    _dir: tempfile::TempDir,
    pub proof_path: PathBuf,
}

impl ProofFixture {
    pub fn new(proof: &[u8]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let proof_path = dir.path().join("proof");
        std::fs::write(&proof_path, proof).unwrap();
        std::fs::write(dir.path().join("vk"), b"verification key").unwrap();
        Self {
            _dir: dir,
            proof_path,
        }
    }

    /// An opaque proof that carries no public inputs
    pub fn opaque() -> Self {
        Self::new(&[0xde, 0xad, 0xbe, 0xef])
    }

    pub fn request(&self, amount: i64, secret: Option<u64>) -> MintRequest {
        MintRequest {
            to: recipient(),
            amount: Some(BigInt::from(amount)),
            proof_data: self.proof_path.display().to_string(),
            nullifier: None,
            secret: secret.map(BigUint::from),
        }
    }
}

/// A mint service over in-memory components
pub struct TestContext {
    pub service: MintService,
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<MemoryLedger>,
    pub verifier: Arc<StubVerifier>,
}

impl TestContext {
    pub fn new(outcome: Outcome) -> Self {
        Self::with_verifier(StubVerifier::new(outcome))
    }

    pub fn with_verifier(verifier: StubVerifier) -> Self {
        Self::build(verifier, Duration::ZERO)
    }

    /// Accepting verifier, and a ledger that takes `nonce_delay` to hand out nonces
    pub fn with_slow_ledger(nonce_delay: Duration) -> Self {
        Self::build(StubVerifier::new(Outcome::Accept), nonce_delay)
    }

    fn build(verifier: StubVerifier, nonce_delay: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MemoryLedger::new(CHAIN_ID));
        let verifier = Arc::new(verifier);
        let backend: Arc<dyn Ledger> = if nonce_delay.is_zero() {
            ledger.clone()
        } else {
            Arc::new(SlowLedger {
                inner: ledger.clone(),
                nonce_delay,
            })
        };
        let service = build_service(store.clone(), backend, verifier.clone());
        Self {
            service,
            store,
            ledger,
            verifier,
        }
    }
}

pub fn build_service(
    store: Arc<MemoryStore>,
    ledger: Arc<dyn Ledger>,
    verifier: Arc<dyn ProofVerifier>,
) -> MintService {
    MintService::new(
        Arc::new(FsArtifactReader::new()),
        ReplayGuard::new(store),
        verifier,
        TransactionIssuer::new(ledger, minter()),
    )
}
