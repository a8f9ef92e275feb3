use std::{fs, path::PathBuf};

use ethers::types::{Bytes, H256};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::{circuit::CircuitDescriptor, error::SdkError, prover::CompiledArtifacts};

const COMPILED_CIRCUIT_FILE: &str = "compiledCircuit";
const PROVING_KEY_FILE: &str = "pk";
const VERIFYING_KEY_FILE: &str = "vk";
const MANIFEST_FILE: &str = "manifest.json";

/// Checksums of what was last compiled into an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub circuit: CircuitDescriptor,
    pub circuit_digest: H256,
    pub compiled_circuit: H256,
    pub proving_key: H256,
    pub verifying_key: H256,
}

pub fn checksum(bytes: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(bytes))
}

/// Compiled artifacts and proofs kept as opaque blobs under one directory.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn proof_path(&self, tx_hash: H256) -> PathBuf {
        self.dir.join(format!("proof-{tx_hash:?}"))
    }

    fn read(&self, name: &str) -> Result<Bytes, SdkError> {
        let path = self.dir.join(name);
        fs::read(&path)
            .map(Bytes::from)
            .map_err(|source| SdkError::Artifact { path, source })
    }

    /// Writes `bytes` to `name` unless the file already holds exactly them.
    /// Returns whether the file was (re)written.
    fn write_if_changed(&self, name: &str, bytes: &[u8]) -> Result<bool, SdkError> {
        let path = self.dir.join(name);
        if let Ok(existing) = fs::read(&path) {
            if checksum(&existing) == checksum(bytes) {
                debug!("{} unchanged, keeping it", path.display());
                return Ok(false);
            }
        }

        let tmp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp, bytes).map_err(|source| SdkError::Artifact {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| SdkError::Artifact { path, source })?;
        Ok(true)
    }

    pub fn manifest(&self) -> Result<Option<ArtifactManifest>, SdkError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read(&path).map_err(|source| SdkError::Artifact {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|err| SdkError::Manifest {
                path,
                reason: err.to_string(),
            })
    }

    /// Loads the stored setup if it was compiled from `circuit` and is intact.
    pub fn current_setup(
        &self,
        circuit: &CircuitDescriptor,
    ) -> Result<Option<CompiledArtifacts>, SdkError> {
        let manifest = match self.manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return Ok(None),
            Err(err) => {
                debug!("Stored manifest unusable: {err}");
                return Ok(None);
            }
        };
        if manifest.circuit_digest != circuit.digest() {
            debug!("Stored artifacts belong to circuit {}", manifest.circuit.name);
            return Ok(None);
        }

        let artifacts = match self.read_setup() {
            Ok(artifacts) => artifacts,
            Err(err) => {
                debug!("Stored artifacts unreadable: {err}");
                return Ok(None);
            }
        };
        let intact = checksum(&artifacts.compiled_circuit) == manifest.compiled_circuit
            && checksum(&artifacts.proving_key) == manifest.proving_key
            && checksum(&artifacts.verifying_key) == manifest.verifying_key;

        Ok(intact.then_some(artifacts))
    }

    /// Persists compiled artifacts and their manifest, leaving identical files untouched.
    pub fn persist(
        &self,
        circuit: &CircuitDescriptor,
        artifacts: &CompiledArtifacts,
    ) -> Result<(), SdkError> {
        fs::create_dir_all(&self.dir).map_err(|source| SdkError::Artifact {
            path: self.dir.clone(),
            source,
        })?;

        let manifest = ArtifactManifest {
            circuit: circuit.clone(),
            circuit_digest: circuit.digest(),
            compiled_circuit: checksum(&artifacts.compiled_circuit),
            proving_key: checksum(&artifacts.proving_key),
            verifying_key: checksum(&artifacts.verifying_key),
        };
        let manifest_json =
            serde_json::to_vec_pretty(&manifest).map_err(|err| SdkError::Manifest {
                path: self.dir.join(MANIFEST_FILE),
                reason: err.to_string(),
            })?;

        let mut written = 0;
        for (name, bytes) in [
            (COMPILED_CIRCUIT_FILE, &artifacts.compiled_circuit[..]),
            (PROVING_KEY_FILE, &artifacts.proving_key[..]),
            (VERIFYING_KEY_FILE, &artifacts.verifying_key[..]),
            (MANIFEST_FILE, &manifest_json[..]),
        ] {
            if self.write_if_changed(name, bytes)? {
                written += 1;
            }
        }
        info!(
            "Artifacts for circuit {} saved to {} ({written} files written)",
            circuit.name,
            self.dir.display()
        );
        Ok(())
    }

    /// Reads back the compiled circuit, proving key and verifying key.
    pub fn read_setup(&self) -> Result<CompiledArtifacts, SdkError> {
        Ok(CompiledArtifacts {
            compiled_circuit: self.read(COMPILED_CIRCUIT_FILE)?,
            proving_key: self.read(PROVING_KEY_FILE)?,
            verifying_key: self.read(VERIFYING_KEY_FILE)?,
        })
    }

    pub fn write_proof(&self, tx_hash: H256, proof: &Bytes) -> Result<PathBuf, SdkError> {
        let path = self.proof_path(tx_hash);
        fs::write(&path, proof).map_err(|source| SdkError::Artifact {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use crate::circuit::AppCircuit;

    use super::*;

    fn artifacts(seed: u8) -> CompiledArtifacts {
        CompiledArtifacts {
            compiled_circuit: Bytes::from(vec![seed; 64]),
            proving_key: Bytes::from(vec![seed.wrapping_add(1); 128]),
            verifying_key: Bytes::from(vec![seed.wrapping_add(2); 16]),
        }
    }

    #[test]
    fn persist_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let circuit = AppCircuit::Age.descriptor();

        store.persist(&circuit, &artifacts(7)).unwrap();

        assert_eq!(store.read_setup().unwrap(), artifacts(7));
        assert_eq!(store.current_setup(&circuit).unwrap(), Some(artifacts(7)));
    }

    #[test]
    fn tampered_artifact_is_not_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let circuit = AppCircuit::Age.descriptor();
        store.persist(&circuit, &artifacts(7)).unwrap();

        fs::write(dir.path().join(PROVING_KEY_FILE), b"garbage").unwrap();

        assert_eq!(store.current_setup(&circuit).unwrap(), None);
    }

    #[test]
    fn missing_setup_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.read_setup(),
            Err(SdkError::Artifact { .. })
        ));
        assert_eq!(store.manifest().unwrap(), None);
    }

    #[test]
    fn corrupt_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), b"{").unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.manifest(), Err(SdkError::Manifest { .. })));
    }

    #[test]
    fn corrupt_manifest_is_not_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let circuit = AppCircuit::Age.descriptor();
        store.persist(&circuit, &artifacts(7)).unwrap();

        fs::write(dir.path().join(MANIFEST_FILE), b"{").unwrap();

        assert_eq!(store.current_setup(&circuit).unwrap(), None);
    }

    #[test]
    fn proof_file_is_named_after_tx() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let tx_hash = H256::repeat_byte(0xab);

        let path = store.write_proof(tx_hash, &Bytes::from(vec![1, 2, 3])).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("proof-0x{}", "ab".repeat(32))
        );
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
