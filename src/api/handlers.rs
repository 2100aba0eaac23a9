//! Request handlers.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::core::NetCareSystem;
use crate::error::NetcareError;
use crate::models::{ApiMode, PatientData, Prescription, TreatmentPlan};

type Engine = web::Data<NetCareSystem>;
type HandlerResult = Result<HttpResponse, NetcareError>;

const DEFAULT_EXPORT_SAMPLES: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub last: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ModeResponse {
    mode: ApiMode,
}

pub async fn health(engine: Engine) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "mode": engine.api_status().mode,
        "active_cases": engine.active_case_count(),
    }))
}

// ===== Cases =====

#[instrument(skip_all, fields(patient = %patient.name))]
pub async fn create_case(engine: Engine, patient: web::Json<PatientData>) -> HandlerResult {
    let snapshot = engine.create_case(patient.into_inner()).await?;
    Ok(HttpResponse::Created().json(snapshot))
}

pub async fn list_cases(engine: Engine) -> HttpResponse {
    HttpResponse::Ok().json(engine.list_cases())
}

pub async fn get_case(engine: Engine, case_id: web::Path<String>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(engine.get_case(&case_id)?))
}

pub async fn case_metrics(engine: Engine, case_id: web::Path<String>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(engine.get_case_metrics(&case_id)?))
}

pub async fn refresh_vitals(engine: Engine, case_id: web::Path<String>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(engine.refresh_vitals(&case_id)?))
}

#[instrument(skip(engine))]
pub async fn close_case(engine: Engine, case_id: web::Path<String>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(engine.close_case(&case_id)?))
}

pub async fn prescribe(
    engine: Engine,
    case_id: web::Path<String>,
    prescription: web::Json<Prescription>,
) -> HandlerResult {
    Ok(HttpResponse::Ok().json(engine.prescribe(&case_id, prescription.into_inner())?))
}

pub async fn set_treatment_plan(
    engine: Engine,
    case_id: web::Path<String>,
    plan: web::Json<TreatmentPlan>,
) -> HandlerResult {
    Ok(HttpResponse::Ok().json(engine.set_treatment_plan(&case_id, plan.into_inner())?))
}

// ===== Doctors =====

pub async fn list_doctors(engine: Engine) -> HttpResponse {
    HttpResponse::Ok().json(engine.doctors())
}

// ===== Network =====

pub async fn network_metrics(engine: Engine) -> HttpResponse {
    HttpResponse::Ok().json(engine.get_metrics_history())
}

pub async fn export_metrics(engine: Engine, query: web::Query<ExportQuery>) -> HttpResponse {
    let last = query.last.unwrap_or(DEFAULT_EXPORT_SAMPLES);
    HttpResponse::Ok().json(engine.export_metrics(last))
}

#[instrument(skip(engine))]
pub async fn test_connection(engine: Engine) -> HttpResponse {
    let mode = engine.test_connection().await;
    HttpResponse::Ok().json(ModeResponse { mode })
}

pub async fn network_status(engine: Engine) -> HttpResponse {
    HttpResponse::Ok().json(engine.api_status())
}
