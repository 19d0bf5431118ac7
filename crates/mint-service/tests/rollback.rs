//! Replay commit handling when issuance fails

mod common;

use common::{build_service, FailingLedger, Outcome, ProofFixture, StubVerifier};
use mint_service::ledger::SubmitError;
use mint_service::replay::ReplayGuard;
use mint_service::store::MemoryStore;
use num_bigint::BigUint;
use std::sync::Arc;
use wormhole_common::{Error, ErrorKind, Nullifier};

fn failing_service(
    failure: SubmitError,
    release: bool,
) -> (mint_service::MintService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = build_service(
        store.clone(),
        Arc::new(FailingLedger { failure }),
        Arc::new(StubVerifier::new(Outcome::Accept)),
    )
    .with_release_on_issue_failure(release);
    (service, store)
}

#[tokio::test]
async fn test_rejected_submission_releases_nullifier() {
    let (service, store) =
        failing_service(SubmitError::Rejected("insufficient funds".to_string()), true);
    let proof = ProofFixture::opaque();

    let err = service.mint(proof.request(10, Some(11))).await.unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
    assert_eq!(err.kind(), ErrorKind::Backend);

    let nullifier = Nullifier::from_secret(&BigUint::from(11u32));
    assert!(!ReplayGuard::new(store).is_used(&nullifier).await.unwrap());
}

#[tokio::test]
async fn test_rollback_disabled_keeps_nullifier() {
    let (service, store) =
        failing_service(SubmitError::Rejected("insufficient funds".to_string()), false);
    let proof = ProofFixture::opaque();

    service.mint(proof.request(10, Some(12))).await.unwrap_err();

    let nullifier = Nullifier::from_secret(&BigUint::from(12u32));
    assert!(ReplayGuard::new(store).is_used(&nullifier).await.unwrap());
}

#[tokio::test]
async fn test_indeterminate_submission_keeps_nullifier() {
    let (service, store) =
        failing_service(SubmitError::Indeterminate("connection reset".to_string()), true);
    let proof = ProofFixture::opaque();

    let err = service.mint(proof.request(10, Some(13))).await.unwrap_err();
    assert!(matches!(err, Error::Backend(_)));

    // The transfer may have landed, so the nullifier stays spent
    let nullifier = Nullifier::from_secret(&BigUint::from(13u32));
    assert!(ReplayGuard::new(store).is_used(&nullifier).await.unwrap());
}
