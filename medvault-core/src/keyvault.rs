use std::collections::HashMap;

use mongodb::bson::{Binary, Bson, Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel, Namespace};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fields::CollectionSpec;

/// Read handle on the external key vault collection.
///
/// The vault is the sole source of truth for alias-to-key resolution. Outside
/// of provisioning, this type never writes to it.
pub struct KeyVault {
    collection: Collection<Document>,
    namespace: Namespace,
}

impl KeyVault {
    pub fn new(client: &Client, namespace: Namespace) -> Self {
        let collection = client
            .database(&namespace.db)
            .collection(&namespace.coll);
        Self {
            collection,
            namespace,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Looks up the data-encryption key id stored under the given alt-name.
    pub async fn find_key(&self, alias: &str) -> Result<Option<Binary>> {
        let document = self
            .collection
            .find_one(doc! { "keyAltNames": alias })
            .await?;
        match document {
            Some(document) => match document.get("_id") {
                Some(Bson::Binary(key_id)) => Ok(Some(key_id.clone())),
                _ => Err(Error::MalformedKeyDocument {
                    alias: alias.to_string(),
                }),
            },
            None => Ok(None),
        }
    }

    /// Like [`find_key`](Self::find_key), but a missing alias is an error.
    pub async fn require_key(&self, alias: &str) -> Result<Binary> {
        self.find_key(alias).await?.ok_or_else(|| Error::KeyNotFound {
            alias: alias.to_string(),
        })
    }

    /// Resolves every alias a collection spec references.
    ///
    /// Fails on the first unresolvable alias so a connection is never opened
    /// against a partial configuration.
    pub async fn resolve(&self, spec: &CollectionSpec) -> Result<HashMap<String, Binary>> {
        let mut keys = HashMap::new();
        for alias in spec.key_aliases() {
            if keys.contains_key(alias) {
                continue;
            }
            let key_id = self.require_key(alias).await?;
            debug!(alias, vault = %self.namespace, "resolved data encryption key");
            keys.insert(alias.to_string(), key_id);
        }
        Ok(keys)
    }

    /// Creates the partial unique index on `keyAltNames` the vault relies on
    /// for alias resolution. Provisioning only.
    pub async fn ensure_alias_index(&self) -> Result<()> {
        let options = IndexOptions::builder()
            .unique(true)
            .partial_filter_expression(doc! { "keyAltNames": { "$exists": true } })
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "keyAltNames": 1 })
            .options(options)
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}
