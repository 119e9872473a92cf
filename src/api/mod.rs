use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::database::DocumentStore;
use crate::document::{Landlord, Tenant};
use crate::llm::{QueryPipeline, QueryResult};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<QueryPipeline>,
    store: Arc<RwLock<DocumentStore>>,
}

#[derive(Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 2000))]
    question: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    answer: String,
    relevant_docs: Vec<String>,
    locadores: Vec<Option<Landlord>>,
    locatarios: Vec<Option<Tenant>>,
}

impl From<QueryResult> for AskResponse {
    fn from(result: QueryResult) -> Self {
        Self {
            relevant_docs: result.relevant_doc_names(),
            locadores: result.landlords(),
            locatarios: result.tenants(),
            answer: result.answer,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: usize,
    model: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Create and configure the API router
pub fn create_api(pipeline: QueryPipeline, store: Arc<RwLock<DocumentStore>>) -> Router {
    let state = AppState {
        pipeline: Arc::new(pipeline),
        store,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/ask", post(ask_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

async fn ask_handler(State(state): State<AppState>, payload: Result<Json<AskRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    if let Err(e) = request.validate() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }
    let question = request.question.trim();
    if question.is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "question must not be blank".to_string());
    }

    let store = state.store.read().await;
    match state.pipeline.process_query(&store, question).await {
        Ok(result) => Json(AskResponse::from(result)).into_response(),
        Err(e) => {
            log::error!("Query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Response {
    let documents = state.store.read().await.len();
    Json(HealthResponse {
        status: "ok",
        documents,
        model: state.pipeline.oracle().model_info(),
    })
    .into_response()
}
