//! Collaborator capabilities the registries resolve hosts through.
//!
//! The registries never talk to the network or hold key material themselves;
//! they are handed these capabilities at construction.

use std::collections::HashMap;

use census_model::{HostAddress, NodeProfile, PublicKey};
use census_population::Population;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Currently active nodes, looked up by address.
pub trait ActiveNodeDirectory: Send + Sync {
    fn active_node_by_address(&self, address: &HostAddress) -> Option<NodeProfile>;
}

/// The local node's certificate.
pub trait CertificateProvider: Send + Sync {
    /// Public key the certificate was issued for.
    fn public_key(&self) -> PublicKey;

    /// Discovery nodes listed in the certificate.
    fn discovery_nodes(&self) -> Vec<HostAddress>;
}

/// Signing and verification.
pub trait CryptographyService: Send + Sync {
    /// Public half of the local signing key.
    fn public_key(&self) -> PublicKey;

    fn sign(&self, message: &[u8]) -> [u8; 64];

    /// Verify `signature` over `message` by `key`.
    fn verify(&self, key: &PublicKey, message: &[u8], signature: &[u8; 64]) -> Result<()>;

    /// Check that `key` is usable for verification.
    fn check_public_key(&self, key: &PublicKey) -> Result<()>;
}

/// In-memory directory, refreshed from each committed population.
#[derive(Debug, Default)]
pub struct NodeDirectory {
    nodes: RwLock<HashMap<HostAddress, NodeProfile>>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory of the online members of `population`.
    pub fn from_population(population: &Population) -> Self {
        let directory = Self::new();
        directory.sync_with(population);
        directory
    }

    /// Replace the contents with the online members of `population`.
    pub fn sync_with(&self, population: &Population) {
        let nodes = population
            .online()
            .iter()
            .map(|n| (n.address(), n.clone()))
            .collect();
        *self.nodes.write() = nodes;
    }

    pub fn insert(&self, node: NodeProfile) -> Option<NodeProfile> {
        self.nodes.write().insert(node.address(), node)
    }

    pub fn remove(&self, address: &HostAddress) -> Option<NodeProfile> {
        self.nodes.write().remove(address)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl ActiveNodeDirectory for NodeDirectory {
    fn active_node_by_address(&self, address: &HostAddress) -> Option<NodeProfile> {
        self.nodes.read().get(address).cloned()
    }
}

/// A certificate with fixed contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCertificate {
    pub public_key: PublicKey,
    pub discovery_nodes: Vec<HostAddress>,
}

impl CertificateProvider for StaticCertificate {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn discovery_nodes(&self) -> Vec<HostAddress> {
        self.discovery_nodes.clone()
    }
}

/// Ed25519 signatures over a local signing key.
pub struct Ed25519Cryptography {
    signing_key: SigningKey,
}

impl Ed25519Cryptography {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Key from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    fn verifying_key(key: &PublicKey) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(key.as_bytes()).map_err(|e| Error::InvalidPublicKey(e.to_string()))
    }
}

impl std::fmt::Debug for Ed25519Cryptography {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Cryptography")
            .field("public_key", &CryptographyService::public_key(self))
            .finish_non_exhaustive()
    }
}

impl CryptographyService for Ed25519Cryptography {
    fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    fn verify(&self, key: &PublicKey, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let verifying_key = Self::verifying_key(key)?;
        let signature = Signature::from_bytes(signature);
        verifying_key
            .verify(message, &signature)
            .map_err(|_| Error::InvalidSignature)
    }

    fn check_public_key(&self, key: &PublicKey) -> Result<()> {
        Self::verifying_key(key).map(|_| ())
    }
}
