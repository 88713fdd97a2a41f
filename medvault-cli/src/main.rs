use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, Document, doc};
use mongodb::client_encryption::{AwsMasterKey, ClientEncryption};

use medvault_core::{
    Credentials, KeyVault, connect_encrypted, connect_plain, kms_providers, records,
};

#[derive(Parser)]
#[command(name = "medvault", version, about = "Medvault setup commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reset the key vault, mint the data-encryption keys, and create the
    /// encrypted collection. Destroys any existing vault contents.
    Provision,
    /// Bulk-copy documents from a plaintext collection into the encrypted one.
    Import(ImportCmd),
}

#[derive(Args)]
struct ImportCmd {
    /// Plaintext source collection in the same database
    #[arg(long)]
    source: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Provision => handle_provision().await,
        Command::Import(cmd) => handle_import(cmd).await,
    }
}

async fn handle_provision() -> Result<()> {
    let credentials = Credentials::from_env()?;
    let client = connect_plain(&credentials).await?;
    let key_vault_namespace = records::key_vault_namespace();

    // Recreating aliases under the partial unique index needs a clean vault.
    client
        .database(records::KEY_VAULT_DATABASE)
        .drop()
        .await
        .context("failed to reset the key vault database")?;
    let vault = KeyVault::new(&client, key_vault_namespace.clone());
    vault
        .ensure_alias_index()
        .await
        .context("failed to create the key vault alias index")?;

    let client_encryption = ClientEncryption::new(
        client.clone(),
        key_vault_namespace,
        kms_providers(&credentials),
    )?;
    let master_key = AwsMasterKey::builder()
        .region(credentials.aws_key_region.clone())
        .key(credentials.aws_key_arn.clone())
        .build();
    for alias in records::KEY_ALIASES {
        let key_id = client_encryption
            .create_data_key(master_key.clone())
            .key_alt_names(vec![alias.to_string()])
            .await
            .with_context(|| format!("failed to create data encryption key {alias}"))?;
        println!(
            "created data encryption key {} for alias {alias}",
            render_key_id(&key_id)
        );
    }

    let namespace = records::patients_namespace();
    let spec = records::collection_spec(namespace.clone())?;
    let keys = vault.resolve(&spec).await?;
    let encrypted_fields = spec.encrypted_fields(&keys)?;
    client
        .database(&namespace.db)
        .create_collection(&namespace.coll)
        .encrypted_fields(encrypted_fields)
        .await
        .with_context(|| format!("failed to create encrypted collection {namespace}"))?;
    println!("created encrypted collection {namespace}");
    Ok(())
}

async fn handle_import(cmd: ImportCmd) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let namespace = records::patients_namespace();
    let spec = records::collection_spec(namespace.clone())?;

    let plain = connect_plain(&credentials).await?;
    let source: Collection<Document> = plain.database(&namespace.db).collection(&cmd.source);
    let documents: Vec<Document> = source
        .find(doc! {})
        .await
        .context("failed to query the source collection")?
        .try_collect()
        .await
        .context("failed to read the source collection")?;
    if documents.is_empty() {
        println!("no documents found in {}.{}", namespace.db, cmd.source);
        return Ok(());
    }

    let encrypted = connect_encrypted(
        &credentials,
        records::key_vault_namespace(),
        std::slice::from_ref(&spec),
    )
    .await?;
    let target: Collection<Document> = encrypted
        .database(&namespace.db)
        .collection(&namespace.coll);
    let count = documents.len();
    let result = target
        .insert_many(documents)
        .await
        .context("failed to insert into the encrypted collection")?;
    println!(
        "imported {} of {count} documents into {namespace}",
        result.inserted_ids.len()
    );
    Ok(())
}

fn render_key_id(key_id: &Binary) -> String {
    if key_id.subtype == BinarySubtype::Uuid
        && let Ok(bytes) = <[u8; 16]>::try_from(key_id.bytes.as_slice())
    {
        return mongodb::bson::Uuid::from_bytes(bytes).to_string();
    }
    format!("{key_id:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_key_ids_render_hyphenated() {
        let key_id = Binary {
            subtype: BinarySubtype::Uuid,
            bytes: vec![0xab; 16],
        };
        assert_eq!(render_key_id(&key_id), "abababab-abab-abab-abab-abababababab");
    }

    #[test]
    fn non_uuid_key_ids_fall_back_to_debug() {
        let key_id = Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![1, 2, 3],
        };
        assert!(render_key_id(&key_id).contains("Binary"));
    }
}
