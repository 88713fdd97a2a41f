//! Field layout of the demonstration patient-records collection.

use mongodb::Namespace;

use crate::error::Result;
use crate::fields::{CollectionSpec, EncryptedField, FieldValueType, QueryCapability};

pub const DATABASE: &str = "medvault";
pub const COLLECTION: &str = "patients";

pub const KEY_VAULT_DATABASE: &str = "medvault_keys";
pub const KEY_VAULT_COLLECTION: &str = "__keyVault";

/// Key alt-names minted by `provision`, one per encrypted field.
pub const KEY_ALIASES: [&str; 4] = ["dataKey1", "dataKey2", "dataKey3", "dataKey4"];

pub fn key_vault_namespace() -> Namespace {
    Namespace::new(KEY_VAULT_DATABASE, KEY_VAULT_COLLECTION)
}

pub fn patients_namespace() -> Namespace {
    Namespace::new(DATABASE, COLLECTION)
}

/// The four-field demo layout: a queryable integer id, an opaque medication
/// array, a queryable SSN string, and an opaque billing subdocument.
pub fn collection_spec(namespace: Namespace) -> Result<CollectionSpec> {
    CollectionSpec::new(namespace)
        .with_field(
            EncryptedField::new("patientId", "dataKey1", FieldValueType::Int)?
                .with_queries(QueryCapability::Equality)?,
        )?
        .with_field(EncryptedField::new(
            "medications",
            "dataKey2",
            FieldValueType::Array,
        )?)?
        .with_field(
            EncryptedField::new("patientRecord.ssn", "dataKey3", FieldValueType::String)?
                .with_queries(QueryCapability::Equality)?,
        )?
        .with_field(EncryptedField::new(
            "patientRecord.billing",
            "dataKey4",
            FieldValueType::Object,
        )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_layout_is_valid() {
        let spec = collection_spec(patients_namespace()).expect("demo layout");
        assert_eq!(spec.fields().len(), 4);
        assert_eq!(spec.key_aliases().collect::<Vec<_>>(), KEY_ALIASES);
    }

    #[test]
    fn queryable_fields_are_scalars_only() {
        let spec = collection_spec(patients_namespace()).expect("demo layout");
        for field in spec.fields() {
            if field.queries().is_some() {
                assert!(field.value_type().is_scalar(), "{}", field.path());
            }
        }
    }
}
