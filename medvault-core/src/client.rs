use mongodb::bson::{Document, doc};
use mongodb::mongocrypt::ctx::KmsProvider;
use mongodb::options::{ClientOptions, TlsOptions};
use mongodb::{Client, Namespace};
use secrecy::ExposeSecret;
use tracing::info;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::fields::CollectionSpec;
use crate::keyvault::KeyVault;

/// KMS provider table in the shape the driver accepts.
pub type KmsProviders = Vec<(KmsProvider, Document, Option<TlsOptions>)>;

/// Renders the AWS KMS provider entry from loaded credentials.
pub fn kms_providers(credentials: &Credentials) -> KmsProviders {
    vec![(
        KmsProvider::aws(),
        doc! {
            "accessKeyId": credentials.aws_access_key_id.as_str(),
            "secretAccessKey": credentials.aws_secret_access_key.expose_secret().as_str(),
        },
        None,
    )]
}

/// Opens a client with no encryption attached; used for key-vault access and
/// for reading plaintext collections.
pub async fn connect_plain(credentials: &Credentials) -> Result<Client> {
    let options = ClientOptions::parse(&credentials.mongodb_uri).await?;
    Ok(Client::with_options(options)?)
}

/// Opens the auto-encrypting client for the given collection specs.
///
/// Every key alias is resolved against the vault up front; an unknown alias
/// aborts the connection instead of deferring the failure to first use.
pub async fn connect_encrypted(
    credentials: &Credentials,
    key_vault_namespace: Namespace,
    specs: &[CollectionSpec],
) -> Result<Client> {
    let plain = connect_plain(credentials).await?;
    let vault = KeyVault::new(&plain, key_vault_namespace.clone());

    let mut fields_map = Vec::with_capacity(specs.len());
    for spec in specs {
        let keys = vault.resolve(spec).await?;
        fields_map.push((spec.namespace().to_string(), spec.encrypted_fields(&keys)?));
    }

    let options = ClientOptions::parse(&credentials.mongodb_uri).await?;
    let mut builder =
        Client::encrypted_builder(options, key_vault_namespace.clone(), kms_providers(credentials))?
            .encrypted_fields_map(fields_map);
    if let Some(path) = &credentials.crypt_shared_lib_path {
        builder = builder.extra_options(doc! {
            "cryptSharedLibPath": path.display().to_string(),
        });
    }

    let client = builder.build().await?;
    info!(key_vault = %key_vault_namespace, collections = specs.len(), "encrypted client ready");
    Ok(client)
}
