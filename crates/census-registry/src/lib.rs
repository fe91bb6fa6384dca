//! Census Registry
//!
//! Versioned census state and the registries each version carries.
//!
//! ```text
//! VersionedRegistries (pulse N)
//!   ├── MandateRegistry      cloud state hash of the lineage
//!   ├── MisbehaviorRegistry  sink for violation reports
//!   └── OfflinePopulation    resolves hosts outside the online set
//!           │
//!           └── ActiveNodeDirectory + CertificateProvider + CryptographyService
//! ```
//!
//! Registries are shared between versions behind `Arc`. Committing the next
//! pulse never mutates the version it starts from.

mod capability;
mod error;
mod mandate;
mod misbehavior;
mod offline;
mod versioned;

pub use capability::{
    ActiveNodeDirectory, CertificateProvider, CryptographyService, Ed25519Cryptography,
    NodeDirectory, StaticCertificate,
};
pub use error::{Error, Result};
pub use mandate::{CloudMandateRegistry, MandateRegistry};
pub use misbehavior::{
    BlameKind, FraudKind, Misbehavior, MisbehaviorRegistry, MisbehaviorReport,
    ReportingMisbehaviorRegistry,
};
pub use offline::{DirectoryOfflinePopulation, OfflinePopulation};
pub use versioned::VersionedRegistries;
