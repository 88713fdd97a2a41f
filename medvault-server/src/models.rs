use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Query string for `GET /patients`.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientQuery {
    pub first_name: Option<String>,
}

/// Query string for `GET /patients/ssns`; `ssns` is a comma-separated list.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipQuery {
    pub ssns: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientListResponse {
    pub patients: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertPatientResponse {
    pub inserted_id: String,
}

impl InsertPatientResponse {
    pub fn from_inserted_id(id: &Bson) -> Self {
        let inserted_id = match id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        Self { inserted_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientResponse {
    pub modified_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePatientResponse {
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn object_ids_render_as_hex() {
        let oid = ObjectId::new();
        let response = InsertPatientResponse::from_inserted_id(&Bson::ObjectId(oid));
        assert_eq!(response.inserted_id, oid.to_hex());
    }

    #[test]
    fn other_id_types_render_via_display() {
        let response = InsertPatientResponse::from_inserted_id(&Bson::Int32(7));
        assert_eq!(response.inserted_id, "7");
    }
}
