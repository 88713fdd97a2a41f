//! Core domain primitives shared by the medvault server and setup commands.

pub mod client;
pub mod credentials;
pub mod error;
pub mod fields;
pub mod keyvault;
pub mod records;

pub use client::{KmsProviders, connect_encrypted, connect_plain, kms_providers};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use fields::{CollectionSpec, EncryptedField, FieldValueType, QueryCapability};
pub use keyvault::KeyVault;
