//! # REST API for Breeding Records
//!
//! Endpoints for breeding records, pregnancies, births, offspring and
//! comments. Mounted under `/api/breeding`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

use crate::backend::domain::commands::breeding::{
    ConfirmPregnancyCommand, CreateBreedingRecordCommand, RemoveFromBreedingResult,
    UpdateBreedingRecordCommand,
};
use crate::backend::domain::commands::comments::{AddCommentCommand, UpdateCommentUrgencyCommand};
use crate::backend::domain::commands::offspring::RecordBirthCommand;
use crate::backend::domain::gestation::{
    breeding_advice, expected_birth_date, is_in_breeding_season, next_expected_birth_date,
};
use crate::backend::domain::BreedingError;
use crate::backend::AppState;
use shared::{
    AddCommentRequest, BirthsWindowRequest, BreedingAdviceRequest, BreedingAdviceResponse,
    BreedingRecordListResponse, BreedingRecordResponse, ConfirmPregnancyRequest,
    CreateBreedingRecordRequest, ErrorResponse, OffspringListResponse, RecordBirthRequest, RecordBirthResponse,
    RemoveFromBreedingRequest, RemoveFromBreedingResponse, RetractOffspringRequest,
    Species, UnconfirmPregnancyRequest, UpdateBreedingRecordRequest, UpdateCommentUrgencyRequest,
};

#[derive(Debug, Deserialize)]
pub struct NextBirthQuery {
    pub species: Species,
}

/// Create a router for breeding related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/reload", post(reload_farm))
        .route("/classified", get(get_classified))
        .route("/stats", get(get_stats))
        .route("/pregnancies", get(get_active_pregnancies))
        .route("/births-window", get(get_births_window))
        .route("/births-window/summary", get(get_births_window_summary))
        .route("/advice", post(get_breeding_advice))
        .route("/by-animal/:animal_id", get(get_records_by_animal))
        .route("/offspring/retract", post(retract_offspring))
        .route("/:id", get(get_record).put(update_record).delete(delete_record))
        .route("/:id/next-birth", get(get_next_expected_birth))
        .route("/:id/confirm-pregnancy", post(confirm_pregnancy))
        .route("/:id/unconfirm-pregnancy", post(unconfirm_pregnancy))
        .route("/:id/remove-animal", post(remove_from_breeding))
        .route("/:id/births", post(record_birth))
        .route("/:id/offspring", get(list_offspring))
        .route("/:id/comments", post(add_comment))
        .route("/:id/comments/:comment_id/urgency", put(update_comment_urgency))
}

/// Translate a domain error into an HTTP response
fn error_response(action: &str, e: BreedingError) -> Response {
    error!("Failed to {}: {}", action, e);
    match e {
        BreedingError::Validation(_) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
        BreedingError::NotFound(_) => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
        BreedingError::PartialBatchFailure {
            ref created_ids,
            failed_index,
            ..
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": e.to_string(),
                "createdIds": created_ids,
                "failedIndex": failed_index,
            })),
        )
            .into_response(),
        BreedingError::Persistence(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )
            .into_response(),
    }
}

pub async fn list_records(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/breeding");
    let records = state.breeding_service.records();
    (StatusCode::OK, Json(BreedingRecordListResponse { records }))
}

/// Reload the active farm's records from the store
pub async fn reload_farm(State(state): State<AppState>) -> Response {
    info!("POST /api/breeding/reload");
    match state.breeding_service.load_farm().await {
        Ok(count) => (StatusCode::OK, Json(json!({ "loaded": count }))).into_response(),
        Err(e) => error_response("reload breeding records", e),
    }
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(request): Json<CreateBreedingRecordRequest>,
) -> Response {
    info!("POST /api/breeding - male {}", request.male_id);

    let command = CreateBreedingRecordCommand {
        male_id: request.male_id,
        female_breeding_info: request.female_breeding_info,
        breeding_date: request.breeding_date,
        notes: request.notes,
    };

    match state.breeding_service.create_record(command).await {
        Ok(record) => {
            let success_message = format!("Breeding {} created", record.breeding_id);
            (StatusCode::CREATED, Json(BreedingRecordResponse { record, success_message })).into_response()
        }
        Err(e) => error_response("create breeding record", e),
    }
}

pub async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("GET /api/breeding/{}", id);
    match state.breeding_service.find_record(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response("get breeding record", e),
    }
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateBreedingRecordRequest>,
) -> Response {
    info!("PUT /api/breeding/{}", id);

    let command = UpdateBreedingRecordCommand {
        male_id: request.male_id,
        female_breeding_info: request.female_breeding_info,
        breeding_date: request.breeding_date,
        notes: request.notes,
    };

    match state.breeding_service.update_record(&id, command).await {
        Ok(record) => {
            let success_message = format!("Breeding {} updated", record.breeding_id);
            (StatusCode::OK, Json(BreedingRecordResponse { record, success_message })).into_response()
        }
        Err(e) => error_response("update breeding record", e),
    }
}

pub async fn delete_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("DELETE /api/breeding/{}", id);
    match state.breeding_service.delete_record(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete breeding record", e),
    }
}

pub async fn get_classified(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/breeding/classified");
    (StatusCode::OK, Json(state.breeding_service.classified()))
}

pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/breeding/stats");
    (StatusCode::OK, Json(state.breeding_service.get_stats()))
}

pub async fn get_active_pregnancies(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/breeding/pregnancies");
    (StatusCode::OK, Json(state.breeding_service.get_active_pregnancies()))
}

pub async fn get_births_window(
    State(state): State<AppState>,
    Query(request): Query<BirthsWindowRequest>,
) -> impl IntoResponse {
    let days = request.days.unwrap_or(state.upcoming_days);
    info!("GET /api/breeding/births-window?days={}", days);
    let window = state.breeding_service.get_births_window(days);
    (StatusCode::OK, Json(window.as_ref().clone()))
}

pub async fn get_births_window_summary(
    State(state): State<AppState>,
    Query(request): Query<BirthsWindowRequest>,
) -> impl IntoResponse {
    let days = request.days.unwrap_or(state.upcoming_days);
    info!("GET /api/breeding/births-window/summary?days={}", days);
    (StatusCode::OK, Json(state.breeding_service.get_births_window_summary(days)))
}

/// Expected birth date and advisory notes for a planned breeding
pub async fn get_breeding_advice(Json(request): Json<BreedingAdviceRequest>) -> impl IntoResponse {
    info!("POST /api/breeding/advice - species {}", request.species);
    let response = BreedingAdviceResponse {
        expected_birth_date: expected_birth_date(request.breeding_date, request.species),
        in_season: is_in_breeding_season(request.breeding_date, request.species),
        advice: breeding_advice(request.breeding_date, request.species, request.female_age_months),
    };
    (StatusCode::OK, Json(response))
}

pub async fn get_records_by_animal(
    State(state): State<AppState>,
    Path(animal_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/breeding/by-animal/{}", animal_id);
    let records = state.breeding_service.get_records_by_animal(&animal_id);
    (StatusCode::OK, Json(BreedingRecordListResponse { records }))
}

/// Earliest upcoming birth among the record's confirmed pregnancies
pub async fn get_next_expected_birth(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NextBirthQuery>,
) -> Response {
    info!("GET /api/breeding/{}/next-birth?species={}", id, query.species);
    match state.breeding_service.find_record(&id).await {
        Ok(record) => {
            let next = next_expected_birth_date(&record, query.species, Utc::now());
            (StatusCode::OK, Json(json!({ "nextExpectedBirthDate": next }))).into_response()
        }
        Err(e) => error_response("get next expected birth", e),
    }
}

pub async fn confirm_pregnancy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ConfirmPregnancyRequest>,
) -> Response {
    info!("POST /api/breeding/{}/confirm-pregnancy - female {}", id, request.female_id);

    let command = ConfirmPregnancyCommand {
        record_id: id,
        female_id: request.female_id,
        confirmed_date: request.confirmed_date,
        species: request.species,
        expected_birth_date: request.expected_birth_date,
    };

    match state.breeding_service.confirm_pregnancy(command).await {
        Ok(record) => {
            let success_message = "Pregnancy confirmed".to_string();
            (StatusCode::OK, Json(BreedingRecordResponse { record, success_message })).into_response()
        }
        Err(e) => error_response("confirm pregnancy", e),
    }
}

pub async fn unconfirm_pregnancy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UnconfirmPregnancyRequest>,
) -> Response {
    info!("POST /api/breeding/{}/unconfirm-pregnancy - female {}", id, request.female_id);
    match state.breeding_service.unconfirm_pregnancy(&id, &request.female_id).await {
        Ok(record) => {
            let success_message = "Pregnancy confirmation removed".to_string();
            (StatusCode::OK, Json(BreedingRecordResponse { record, success_message })).into_response()
        }
        Err(e) => error_response("unconfirm pregnancy", e),
    }
}

pub async fn remove_from_breeding(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RemoveFromBreedingRequest>,
) -> Response {
    info!("POST /api/breeding/{}/remove-animal - animal {}", id, request.animal_id);
    match state.breeding_service.remove_from_breeding(&id, &request.animal_id).await {
        Ok(RemoveFromBreedingResult::RecordDeleted) => {
            let response = RemoveFromBreedingResponse {
                record: None,
                success_message: "Breeding record deleted".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(RemoveFromBreedingResult::FemaleRemoved(record)) => {
            let response = RemoveFromBreedingResponse {
                success_message: format!("{} removed from breeding", request.animal_id),
                record: Some(record),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response("remove animal from breeding", e),
    }
}

pub async fn record_birth(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RecordBirthRequest>,
) -> Response {
    info!(
        "POST /api/breeding/{}/births - female {}, {} offspring",
        id,
        request.female_id,
        request.offspring.len()
    );

    let command = RecordBirthCommand {
        record_id: id,
        female_id: request.female_id,
        actual_birth_date: request.actual_birth_date,
        offspring: request.offspring,
        fallback_species: request.species,
    };

    match state.offspring_service.record_birth(command).await {
        Ok(result) => {
            let response = RecordBirthResponse {
                success_message: format!("Birth recorded with {} offspring", result.offspring_ids.len()),
                record: result.record,
                offspring_ids: result.offspring_ids,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response("record birth", e),
    }
}

pub async fn list_offspring(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("GET /api/breeding/{}/offspring", id);
    match state.offspring_service.offspring_of(&id).await {
        Ok(animals) => (StatusCode::OK, Json(OffspringListResponse { animals })).into_response(),
        Err(e) => error_response("list offspring", e),
    }
}

/// Compensation for a partially failed birth recording
pub async fn retract_offspring(
    State(state): State<AppState>,
    Json(request): Json<RetractOffspringRequest>,
) -> Response {
    info!("POST /api/breeding/offspring/retract - {} ids", request.offspring_ids.len());
    match state.offspring_service.retract_offspring(&request.offspring_ids).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "retracted": count }))).into_response(),
        Err(e) => error_response("retract offspring", e),
    }
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddCommentRequest>,
) -> Response {
    info!("POST /api/breeding/{}/comments", id);

    let command = AddCommentCommand {
        record_id: id,
        content: request.content,
        urgency: request.urgency,
    };

    match state.comment_service.add_comment(command).await {
        Ok(record) => {
            let success_message = "Comment added".to_string();
            (StatusCode::CREATED, Json(BreedingRecordResponse { record, success_message })).into_response()
        }
        Err(e) => error_response("add comment", e),
    }
}

pub async fn update_comment_urgency(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
    Json(request): Json<UpdateCommentUrgencyRequest>,
) -> Response {
    info!("PUT /api/breeding/{}/comments/{}/urgency - {}", id, comment_id, request.urgency);

    let command = UpdateCommentUrgencyCommand {
        record_id: id,
        comment_id,
        urgency: request.urgency,
    };

    match state.comment_service.update_comment_urgency(command).await {
        Ok(record) => {
            let success_message = "Comment urgency updated".to_string();
            (StatusCode::OK, Json(BreedingRecordResponse { record, success_message })).into_response()
        }
        Err(e) => error_response("update comment urgency", e),
    }
}
