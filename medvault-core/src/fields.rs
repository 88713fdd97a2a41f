use std::collections::HashMap;
use std::fmt;

use mongodb::Namespace;
use mongodb::bson::{Binary, Document, doc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Logical BSON type declared for an encrypted field.
///
/// Fixed at collection-creation time; changing it means recreating the
/// collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValueType {
    Int,
    Long,
    String,
    Date,
    Bool,
    ObjectId,
    Array,
    Object,
}

impl FieldValueType {
    /// The `bsonType` name the driver expects in an `encryptedFields`
    /// document.
    pub fn bson_type_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::String => "string",
            Self::Date => "date",
            Self::Bool => "bool",
            Self::ObjectId => "objectId",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether values of this type are single scalars. Only scalar fields
    /// may declare a query capability; arrays and subdocuments stay opaque.
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }
}

impl fmt::Display for FieldValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bson_type_name())
    }
}

/// Declared ability to query the ciphertext of a field without decrypting
/// every candidate document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCapability {
    Equality,
}

impl QueryCapability {
    pub fn query_type(self) -> &'static str {
        match self {
            Self::Equality => "equality",
        }
    }
}

/// One encrypted field of a collection: its dotted document path, the
/// alt-name of the data-encryption key protecting it, its declared type, and
/// an optional query capability.
#[derive(Debug, Clone)]
pub struct EncryptedField {
    path: String,
    key_alias: String,
    value_type: FieldValueType,
    queries: Option<QueryCapability>,
}

impl EncryptedField {
    pub fn new(
        path: impl Into<String>,
        key_alias: impl Into<String>,
        value_type: FieldValueType,
    ) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::EmptyFieldPath);
        }
        Ok(Self {
            path,
            key_alias: key_alias.into(),
            value_type,
            queries: None,
        })
    }

    /// Declares a query capability for the field.
    pub fn with_queries(mut self, queries: QueryCapability) -> Result<Self> {
        if !self.value_type.is_scalar() {
            return Err(Error::UnqueryableFieldType {
                path: self.path,
                value_type: self.value_type,
            });
        }
        self.queries = Some(queries);
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key_alias(&self) -> &str {
        &self.key_alias
    }

    pub fn value_type(&self) -> FieldValueType {
        self.value_type
    }

    pub fn queries(&self) -> Option<QueryCapability> {
        self.queries
    }

    fn render(&self, key_id: &Binary) -> Document {
        let mut field = doc! {
            "keyId": key_id.clone(),
            "path": self.path.as_str(),
            "bsonType": self.value_type.bson_type_name(),
        };
        if let Some(queries) = self.queries {
            field.insert("queries", doc! { "queryType": queries.query_type() });
        }
        field
    }
}

/// Immutable set of encrypted-field descriptors for one collection.
///
/// Assembled once at startup; the rendered `encryptedFields` document is what
/// the driver attaches to its auto-encryption options.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    namespace: Namespace,
    fields: Vec<EncryptedField>,
}

impl CollectionSpec {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            fields: Vec::new(),
        }
    }

    /// Adds a field descriptor, rejecting duplicate paths.
    pub fn with_field(mut self, field: EncryptedField) -> Result<Self> {
        if self.fields.iter().any(|known| known.path == field.path) {
            return Err(Error::DuplicateFieldPath { path: field.path });
        }
        self.fields.push(field);
        Ok(self)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn fields(&self) -> &[EncryptedField] {
        &self.fields
    }

    /// Every key alias this collection references, in declaration order.
    pub fn key_aliases(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.key_alias.as_str())
    }

    /// Renders the driver's `encryptedFields` document from resolved key ids.
    ///
    /// Every alias must be present in `keys`; a missing alias fails the whole
    /// rendering rather than producing a partial map.
    pub fn encrypted_fields(&self, keys: &HashMap<String, Binary>) -> Result<Document> {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let key_id = keys.get(&field.key_alias).ok_or_else(|| Error::KeyNotFound {
                    alias: field.key_alias.clone(),
                })?;
                Ok(field.render(key_id))
            })
            .collect::<Result<Vec<Document>>>()?;
        Ok(doc! { "fields": fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;
    use mongodb::bson::spec::BinarySubtype;

    fn key_id(seed: u8) -> Binary {
        Binary {
            subtype: BinarySubtype::Uuid,
            bytes: vec![seed; 16],
        }
    }

    fn spec() -> CollectionSpec {
        CollectionSpec::new(Namespace::new("medvault", "patients"))
    }

    #[test]
    fn rejects_empty_path() {
        let err = EncryptedField::new("  ", "dataKey1", FieldValueType::Int)
            .expect_err("blank path should be rejected");
        assert!(matches!(err, Error::EmptyFieldPath));
    }

    #[test]
    fn rejects_equality_on_composite_types() {
        let err = EncryptedField::new("medications", "dataKey2", FieldValueType::Array)
            .expect("descriptor")
            .with_queries(QueryCapability::Equality)
            .expect_err("arrays are opaque");
        assert!(matches!(
            err,
            Error::UnqueryableFieldType {
                value_type: FieldValueType::Array,
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_paths() {
        let err = spec()
            .with_field(EncryptedField::new("patientId", "dataKey1", FieldValueType::Int).unwrap())
            .unwrap()
            .with_field(
                EncryptedField::new("patientId", "dataKey2", FieldValueType::Long).unwrap(),
            )
            .expect_err("duplicate path should be rejected");
        assert!(matches!(err, Error::DuplicateFieldPath { path } if path == "patientId"));
    }

    #[test]
    fn renders_driver_document_shape() {
        let spec = spec()
            .with_field(
                EncryptedField::new("patientId", "dataKey1", FieldValueType::Int)
                    .unwrap()
                    .with_queries(QueryCapability::Equality)
                    .unwrap(),
            )
            .unwrap()
            .with_field(
                EncryptedField::new("patientRecord.billing", "dataKey4", FieldValueType::Object)
                    .unwrap(),
            )
            .unwrap();

        let mut keys = HashMap::new();
        keys.insert("dataKey1".to_string(), key_id(1));
        keys.insert("dataKey4".to_string(), key_id(4));

        let rendered = spec.encrypted_fields(&keys).expect("rendered fields");
        let fields = rendered.get_array("fields").expect("fields array");
        assert_eq!(fields.len(), 2);

        let first = fields[0].as_document().expect("field document");
        assert_eq!(first.get("keyId"), Some(&Bson::Binary(key_id(1))));
        assert_eq!(first.get_str("path").expect("path"), "patientId");
        assert_eq!(first.get_str("bsonType").expect("bsonType"), "int");
        assert_eq!(
            first
                .get_document("queries")
                .expect("queries")
                .get_str("queryType")
                .expect("queryType"),
            "equality"
        );

        let second = fields[1].as_document().expect("field document");
        assert_eq!(second.get_str("bsonType").expect("bsonType"), "object");
        assert!(!second.contains_key("queries"));
    }

    #[test]
    fn rendering_fails_fast_on_unresolved_alias() {
        let spec = spec()
            .with_field(
                EncryptedField::new("patientRecord.ssn", "dataKey3", FieldValueType::String)
                    .unwrap(),
            )
            .unwrap();
        let err = spec
            .encrypted_fields(&HashMap::new())
            .expect_err("unresolved alias should fail");
        assert!(matches!(err, Error::KeyNotFound { alias } if alias == "dataKey3"));
    }
}
