use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    classify::{classify_spo2, classify_weight_blood},
    dto::{Spo2Form, WeightBloodForm},
    repo::HealthRecord,
};
use crate::{auth::services::MSG_SYSTEM_ERROR, state::AppState, views};

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/check-weight-blood",
            get(weight_blood_form).post(check_weight_blood),
        )
        .route("/check-spo2", get(spo2_form).post(check_spo2))
}

pub async fn weight_blood_form() -> Html<String> {
    views::weight_blood_form(&[])
}

pub async fn spo2_form() -> Html<String> {
    views::spo2_form(&[])
}

#[instrument(skip(state, form))]
pub async fn check_weight_blood(
    State(state): State<AppState>,
    Form(form): Form<WeightBloodForm>,
) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        warn!(?errors, "weight/blood submission rejected");
        return (StatusCode::UNPROCESSABLE_ENTITY, views::weight_blood_form(&errors)).into_response();
    }
    let result = classify_weight_blood(form.height, form.weight, form.systolic, form.diastolic);

    if let Err(resp) = record(&state, HealthRecord::from(&form)).await {
        return resp;
    }

    info!(bmi = result.bmi, weight = %result.weight_category, blood = %result.blood_category, "weight/blood classified");
    views::weight_blood_result(form.name.trim(), form.systolic, form.diastolic, &result).into_response()
}

#[instrument(skip(state, form))]
pub async fn check_spo2(State(state): State<AppState>, Form(form): Form<Spo2Form>) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        warn!(?errors, "spo2 submission rejected");
        return (StatusCode::UNPROCESSABLE_ENTITY, views::spo2_form(&errors)).into_response();
    }
    let result = classify_spo2(form.spo2);

    if let Err(resp) = record(&state, HealthRecord::from(&form)).await {
        return resp;
    }

    info!(category = %result.spo2_category, "spo2 classified");
    views::spo2_result(form.name.trim(), form.spo2, &result).into_response()
}

/// Persist a submission. In lenient mode a failure is only logged and the
/// caller still renders its result; in strict mode it becomes a 500 page.
async fn record(state: &AppState, rec: HealthRecord) -> Result<(), Response> {
    match state.health.append(&rec).await {
        Ok(()) => Ok(()),
        Err(e) if state.config.strict_health_persist => {
            error!(error = %e, "insert health_data failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, views::system_error(MSG_SYSTEM_ERROR)).into_response())
        }
        Err(e) => {
            error!(error = %e, "insert health_data failed; returning result anyway");
            Ok(())
        }
    }
}
