use actix_web::{web, HttpResponse, Responder, ResponseError};
use uuid::Uuid;

use crate::core::{CancelOutcome, MatchError, Matchmaker};
use crate::models::{
    CancelResponse, HealthResponse, StatusResponse, SubmitMatchRequest, SubmitMatchResponse,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matchmaker: Matchmaker,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches", web::post().to(submit_match))
        .route("/matches/{request_id}", web::get().to(get_status))
        .route("/matches/{request_id}/cancel", web::post().to(cancel_match))
        .route("/matches/users/{user_id}/cancel", web::post().to(cancel_user_match));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.matchmaker.store_healthy().await;
    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        pending_requests: state.matchmaker.pending_count().await,
    })
}

/// Submit a match request
///
/// POST /api/v1/matches
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "displayName": "string",
///   "transportHandle": "string",
///   "difficultyLevels": ["Easy"],
///   "categories": ["arrays"],
///   "programmingLanguages": ["Python"],
///   "generalizeLanguages": false
/// }
/// ```
async fn submit_match(
    state: web::Data<AppState>,
    req: web::Json<SubmitMatchRequest>,
) -> impl Responder {
    let payload = req.into_inner();
    tracing::debug!("Match request from user {}", payload.user_id);

    match state.matchmaker.submit(payload).await {
        Ok(submission) => {
            let status = submission.status();
            let request = submission.request;
            HttpResponse::Ok().json(SubmitMatchResponse {
                message: "User added".to_string(),
                request_id: request.request_id,
                room_id: submission
                    .result
                    .map(|result| result.room_id)
                    .unwrap_or(request.request_id),
                user_id: request.user_id,
                transport_handle: request.transport_handle,
                status,
            })
        }
        Err(e) => {
            tracing::info!("Rejected match request: {}", e);
            e.error_response()
        }
    }
}

/// Current status of a request
///
/// GET /api/v1/matches/{request_id}
async fn get_status(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let request_id = path.into_inner();

    match state.matchmaker.status(request_id).await {
        Ok(status) => HttpResponse::Ok().json(StatusResponse { request_id, status }),
        Err(e) => e.error_response(),
    }
}

/// Cancel a request by id
///
/// POST /api/v1/matches/{request_id}/cancel
async fn cancel_match(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    cancel_response(state.matchmaker.cancel(path.into_inner()).await)
}

/// Cancel whatever the user has pending
///
/// POST /api/v1/matches/users/{user_id}/cancel
async fn cancel_user_match(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    cancel_response(state.matchmaker.cancel_for_user(&user_id).await)
}

fn cancel_response(outcome: Result<CancelOutcome, MatchError>) -> HttpResponse {
    match outcome {
        Ok(outcome) => {
            let message = match outcome {
                CancelOutcome::Cancelled(_) => "Match search canceled",
                CancelOutcome::AlreadyResolved(_, _) => "Request already resolved",
                CancelOutcome::Unknown => "No pending request",
            };

            HttpResponse::Ok().json(CancelResponse {
                success: true,
                request_id: outcome.request_id(),
                status: outcome.status(),
                message: message.to_string(),
            })
        }
        Err(e) => {
            tracing::error!("Cancel failed: {}", e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Collaborators, MatchmakerConfig};
    use crate::models::{ErrorResponse, RequestStatus};
    use crate::services::{InMemoryStore, LogNotifier, LogPublisher};
    use actix_web::{test, App};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState {
            matchmaker: Matchmaker::new(
                MatchmakerConfig::default(),
                Collaborators {
                    store: Arc::new(InMemoryStore::new()),
                    publisher: Arc::new(LogPublisher),
                    notifier: Arc::new(LogNotifier),
                },
            ),
        }
    }

    fn body(user: &str, languages: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "userId": user,
            "displayName": user,
            "transportHandle": format!("sock-{}", user),
            "difficultyLevels": ["Easy"],
            "categories": ["arrays"],
            "programmingLanguages": languages,
            "generalizeLanguages": false
        })
    }

    #[actix_web::test]
    async fn test_submit_then_match() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches")
            .set_json(body("a", &["Python"]))
            .to_request();
        let first: SubmitMatchResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first.status, RequestStatus::Pending);
        assert_eq!(first.room_id, first.request_id);

        let req = test::TestRequest::post()
            .uri("/api/v1/matches")
            .set_json(body("b", &["Python", "Go"]))
            .to_request();
        let second: SubmitMatchResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(second.status, RequestStatus::Matched);
        assert_eq!(second.room_id, first.request_id);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/matches/{}", first.request_id))
            .to_request();
        let status: StatusResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status.status, RequestStatus::Matched);
    }

    #[actix_web::test]
    async fn test_invalid_submission_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let mut payload = body("a", &[]);
        payload["difficultyLevels"] = serde_json::json!([]);

        let req = test::TestRequest::post()
            .uri("/api/v1/matches")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.error, "validation_failed");
    }

    #[actix_web::test]
    async fn test_cancel_unknown_is_success() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/matches/{}/cancel", Uuid::new_v4()))
            .to_request();
        let resp: CancelResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.success);
        assert!(resp.status.is_none());

        let req = test::TestRequest::post()
            .uri("/api/v1/matches/users/nobody/cancel")
            .to_request();
        let resp: CancelResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.success);
    }

    #[actix_web::test]
    async fn test_cancel_by_user() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches")
            .set_json(body("d", &["Java"]))
            .to_request();
        let submitted: SubmitMatchResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches/users/d/cancel")
            .to_request();
        let resp: CancelResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.request_id, Some(submitted.request_id));
        assert_eq!(resp.status, Some(RequestStatus::Cancelled));
    }

    #[actix_web::test]
    async fn test_health_reports_pending() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches")
            .set_json(body("h", &["Go"]))
            .to_request();
        let _: SubmitMatchResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let health: HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.pending_requests, 1);
    }
}
