use mongodb::Collection;
use mongodb::bson::Document;

/// Shared handles for request handlers.
///
/// The collection handle wraps the single auto-encrypting client; the driver
/// manages pooling, so handlers clone the state freely.
#[derive(Clone)]
pub struct AppState {
    pub patients: Collection<Document>,
}

impl AppState {
    pub fn new(patients: Collection<Document>) -> Self {
        Self { patients }
    }
}
