//! Proof verification oracle
//!
//! The verifier is an external program: exit status 0 accepts the proof,
//! anything else rejects it. Its output is logged and otherwise ignored.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use wormhole_common::{Error, Result};

use crate::artifact::ArtifactReader;
use crate::nullifier::is_fixture_proof;

/// Default verifier timeout
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(120);

/// Capability to check a proof against a verification key
#[async_trait]
pub trait ProofVerifier: Send + Sync {
    /// `Ok(true)` if accepted, `Ok(false)` if rejected, `Err` if the
    /// verifier could not be run at all. An error is never an acceptance.
    async fn verify(&self, vk_path: &Path, proof_path: &Path) -> Result<bool>;
}

/// Verifier that runs an external command
///
/// Invoked as `<program> <args..> -k <vk> -p <proof>`. The child is killed if
/// the verification future is dropped or the timeout elapses.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandVerifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    /// `bb verify`, the Barretenberg CLI
    pub fn barretenberg() -> Self {
        Self::new("bb").with_args(["verify"])
    }

    /// Build from a split command line (program first)
    pub fn from_command_line(parts: &[String]) -> Result<Self> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| Error::Verification("empty verifier command".to_string()))?;
        Ok(Self::new(program.clone()).with_args(args.iter().cloned()))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProofVerifier for CommandVerifier {
    async fn verify(&self, vk_path: &Path, proof_path: &Path) -> Result<bool> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg("-k")
            .arg(vk_path)
            .arg("-p")
            .arg(proof_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("ZK Proof verification command failed to execute: {}", e);
                return Err(Error::Verification(format!(
                    "failed to run {}: {}",
                    self.program, e
                )));
            }
            Err(_) => {
                error!(
                    "ZK Proof verification timed out after {}s",
                    self.timeout.as_secs()
                );
                return Err(Error::VerifierTimeout(self.timeout.as_secs()));
            }
        };

        info!(
            "ZK Proof verification executed: stdout={:?} stderr={:?}",
            String::from_utf8_lossy(&output.stdout).trim(),
            String::from_utf8_lossy(&output.stderr).trim()
        );

        if output.status.success() {
            return Ok(true);
        }

        match output.status.code() {
            Some(code) => warn!("ZK Proof verification failed with exit code {}", code),
            None => warn!("ZK Proof verification terminated by signal"),
        }
        Ok(false)
    }
}

/// Test-fixture bypass around another verifier
///
/// TEST ONLY. When enabled, a proof whose bytes are exactly the fixture
/// payload is accepted without running the inner verifier. When disabled
/// every proof, fixtures included, goes to the inner verifier.
pub struct FixtureBypass {
    inner: Arc<dyn ProofVerifier>,
    artifacts: Arc<dyn ArtifactReader>,
    enabled: bool,
}

impl FixtureBypass {
    pub fn new(
        inner: Arc<dyn ProofVerifier>,
        artifacts: Arc<dyn ArtifactReader>,
        enabled: bool,
    ) -> Self {
        if enabled {
            warn!("Fixture proof bypass is ENABLED; never run this configuration in production");
        }
        Self {
            inner,
            artifacts,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl ProofVerifier for FixtureBypass {
    async fn verify(&self, vk_path: &Path, proof_path: &Path) -> Result<bool> {
        if self.enabled {
            if let Some(bytes) = self.artifacts.read_bytes(proof_path).await? {
                if is_fixture_proof(&bytes) {
                    warn!(
                        "TEST FIXTURE BYPASS: accepting fixture proof {} without verification",
                        proof_path.display()
                    );
                    return Ok(true);
                }
            }
        }

        self.inner.verify(vk_path, proof_path).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::artifact::FsArtifactReader;
    use crate::nullifier::FIXTURE_PROOF_PAYLOAD;
    use std::path::PathBuf;

    fn fixture_dir(proof: &[u8]) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let proof_path = dir.path().join("proof");
        let vk_path = dir.path().join("vk");
        std::fs::write(&proof_path, proof).unwrap();
        std::fs::write(&vk_path, b"mock-vk-data").unwrap();
        (dir, proof_path, vk_path)
    }

    #[tokio::test]
    async fn test_exit_zero_accepts() {
        let (_dir, proof, vk) = fixture_dir(b"proof");
        let verifier = CommandVerifier::new("true");
        assert!(verifier.verify(&vk, &proof).await.unwrap());
    }

    #[tokio::test]
    async fn test_nonzero_exit_rejects() {
        let (_dir, proof, vk) = fixture_dir(b"proof");
        let verifier = CommandVerifier::new("false");
        assert!(!verifier.verify(&vk, &proof).await.unwrap());
    }

    #[tokio::test]
    async fn test_verifier_receives_key_and_proof_paths() {
        let (_dir, proof, vk) = fixture_dir(b"proof");
        // $1..$4 are: -k <vk> -p <proof>
        let verifier = CommandVerifier::new("sh").with_args([
            "-c",
            r#"[ "$1" = "-k" ] && [ -f "$2" ] && [ "$3" = "-p" ] && [ -f "$4" ]"#,
            "verifier",
        ]);
        assert!(verifier.verify(&vk, &proof).await.unwrap());
    }

    #[tokio::test]
    async fn test_launch_failure_is_error() {
        let (_dir, proof, vk) = fixture_dir(b"proof");
        let verifier = CommandVerifier::new("/nonexistent/verifier-binary");
        let err = verifier.verify(&vk, &proof).await.unwrap_err();
        assert!(matches!(err, Error::Verification(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_error() {
        let (_dir, proof, vk) = fixture_dir(b"proof");
        let verifier = CommandVerifier::new("sh")
            .with_args(["-c", "sleep 5", "verifier"])
            .with_timeout(Duration::from_millis(100));
        let err = verifier.verify(&vk, &proof).await.unwrap_err();
        assert!(matches!(err, Error::VerifierTimeout(_)));
    }

    #[test]
    fn test_from_command_line() {
        let verifier =
            CommandVerifier::from_command_line(&["bb".to_string(), "verify".to_string()]).unwrap();
        assert_eq!(verifier.program, "bb");
        assert_eq!(verifier.args, vec!["verify".to_string()]);
        assert!(CommandVerifier::from_command_line(&[]).is_err());
    }

    #[tokio::test]
    async fn test_fixture_accepted_only_when_bypass_enabled() {
        let (_dir, proof, vk) = fixture_dir(FIXTURE_PROOF_PAYLOAD);
        let rejecting: Arc<dyn ProofVerifier> = Arc::new(CommandVerifier::new("false"));
        let artifacts: Arc<dyn ArtifactReader> = Arc::new(FsArtifactReader::new());

        let enabled = FixtureBypass::new(rejecting.clone(), artifacts.clone(), true);
        assert!(enabled.verify(&vk, &proof).await.unwrap());

        let disabled = FixtureBypass::new(rejecting, artifacts, false);
        assert!(!disabled.verify(&vk, &proof).await.unwrap());
    }

    #[tokio::test]
    async fn test_bypass_does_not_accept_other_proofs() {
        let (_dir, proof, vk) = fixture_dir(b"real proof bytes");
        let bypass = FixtureBypass::new(
            Arc::new(CommandVerifier::new("false")),
            Arc::new(FsArtifactReader::new()),
            true,
        );
        assert!(!bypass.verify(&vk, &proof).await.unwrap());
    }
}
