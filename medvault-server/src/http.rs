use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, middleware, routing::get, routing::post};
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use tracing::Instrument;

use crate::error::{AppError, AppErrorKind, attach_correlation};
use crate::models::{
    DeletePatientResponse, InsertPatientResponse, MembershipQuery, PatientListResponse,
    PatientQuery, UpdatePatientResponse,
};
use crate::path::{parse_patient_id, split_membership_list};
use crate::state::AppState;
use crate::telemetry::{CorrelationId, correlation_layer, request_span};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/patients", get(list_patients).post(insert_patient))
        .route("/patients/ssn/{ssn}", get(patient_by_ssn))
        .route("/patients/ssns", get(patients_by_ssns))
        .route("/patients/medications/{medication}", get(patient_by_medication))
        .route("/patients/billing", post(patient_by_billing))
        .route(
            "/patients/{patient_id}",
            axum::routing::put(update_patient).delete(delete_patient),
        )
        .layer(middleware::from_fn(correlation_layer))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Point lookup by exact first name when the parameter is present, full list
/// otherwise. Order of the list is whatever the store returns.
async fn list_patients(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(query): Query<PatientQuery>,
) -> Result<Response, AppError> {
    let span = request_span("http.list", &correlation.0);
    async move {
        match query.first_name {
            Some(first_name) => {
                let patient = find_one_or_404(&state, doc! { "firstName": first_name }).await?;
                Ok((StatusCode::OK, Json(patient)).into_response())
            }
            None => {
                let patients: Vec<Document> = state
                    .patients
                    .find(doc! {})
                    .await
                    .map_err(AppError::from)?
                    .try_collect()
                    .await
                    .map_err(AppError::from)?;
                Ok((StatusCode::OK, Json(PatientListResponse { patients })).into_response())
            }
        }
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

/// Equality lookup on the encrypted `patientRecord.ssn` field; the driver
/// matches against the ciphertext index.
async fn patient_by_ssn(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(ssn): Path<String>,
) -> Result<Response, AppError> {
    let span = request_span("http.get_ssn", &correlation.0);
    async move {
        let patient = find_one_or_404(&state, doc! { "patientRecord.ssn": ssn }).await?;
        Ok((StatusCode::OK, Json(patient)).into_response())
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

/// Set-membership lookup. An empty set short-circuits to an empty result
/// without a store round-trip.
async fn patients_by_ssns(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(query): Query<MembershipQuery>,
) -> Result<Response, AppError> {
    let span = request_span("http.get_ssns", &correlation.0);
    async move {
        let ssns = split_membership_list(query.ssns.as_deref());
        if ssns.is_empty() {
            let empty = PatientListResponse {
                patients: Vec::new(),
            };
            return Ok((StatusCode::OK, Json(empty)).into_response());
        }

        let patients: Vec<Document> = state
            .patients
            .find(doc! { "patientRecord.ssn": { "$in": ssns } })
            .await
            .map_err(AppError::from)?
            .try_collect()
            .await
            .map_err(AppError::from)?;
        Ok((StatusCode::OK, Json(PatientListResponse { patients })).into_response())
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

/// Point lookup matching an element of the `medications` array. The field
/// declares no query capability, so the store decides whether the filter is
/// answerable; the request is forwarded unchanged.
async fn patient_by_medication(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(medication): Path<String>,
) -> Result<Response, AppError> {
    let span = request_span("http.get_medication", &correlation.0);
    async move {
        let patient = find_one_or_404(&state, doc! { "medications": medication }).await?;
        Ok((StatusCode::OK, Json(patient)).into_response())
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

/// Point lookup by the full billing subdocument given in the body.
async fn patient_by_billing(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(billing): Json<Document>,
) -> Result<Response, AppError> {
    let span = request_span("http.get_billing", &correlation.0);
    async move {
        let patient = find_one_or_404(&state, doc! { "patientRecord.billing": billing }).await?;
        Ok((StatusCode::OK, Json(patient)).into_response())
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

async fn insert_patient(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(patient): Json<Document>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.insert", &correlation.0);
    async move {
        let result = state
            .patients
            .insert_one(patient)
            .await
            .map_err(AppError::from)?;
        let response = InsertPatientResponse::from_inserted_id(&result.inserted_id);
        Ok((StatusCode::CREATED, Json(response)))
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

async fn update_patient(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(patient_id): Path<String>,
    Json(update): Json<Document>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.update", &correlation.0);
    async move {
        let patient_id = parse_patient_id(&patient_id)?;
        let result = state
            .patients
            .update_one(doc! { "patientId": patient_id }, doc! { "$set": update })
            .await
            .map_err(AppError::from)?;
        if result.matched_count == 0 {
            return Err(AppError::new(AppErrorKind::NotFound));
        }
        let response = UpdatePatientResponse {
            modified_count: result.modified_count,
        };
        Ok((StatusCode::OK, Json(response)))
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

async fn delete_patient(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(patient_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let span = request_span("http.delete", &correlation.0);
    async move {
        let patient_id = parse_patient_id(&patient_id)?;
        let result = state
            .patients
            .delete_one(doc! { "patientId": patient_id })
            .await
            .map_err(AppError::from)?;
        if result.deleted_count == 0 {
            return Err(AppError::new(AppErrorKind::NotFound));
        }
        Ok((StatusCode::OK, Json(DeletePatientResponse { deleted: true })))
    }
    .instrument(span)
    .await
    .map_err(|err| attach_correlation(err, &correlation))
}

async fn find_one_or_404(state: &AppState, filter: Document) -> Result<Document, AppError> {
    state
        .patients
        .find_one(filter)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::new(AppErrorKind::NotFound))
}
