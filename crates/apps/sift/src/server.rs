//! HTTP surface for classification runs

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use serde::Serialize;
use triage::{ClassificationResult, Triage};

const CLASSIFY_PATH: &str = "/emails/classify/";

#[derive(Serialize)]
struct ClassifiedEmails {
    classified_emails: Vec<ClassificationResult>,
}

pub fn router(triage: Arc<Triage>) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, CLASSIFY_PATH)]) }),
        )
        .route(CLASSIFY_PATH, get(classify_recent))
        .route("/classify", get(classify_recent))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(triage)
}

pub async fn serve(triage: Triage, addr: SocketAddr) -> Result<()> {
    let app = router(Arc::new(triage));

    info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Run one fetch-and-classify pass; each request is independent
async fn classify_recent(State(triage): State<Arc<Triage>>) -> Response {
    let outcome = tokio::task::spawn_blocking(move || triage.fetch_and_classify_recent()).await;

    match outcome {
        Ok(Ok(classified_emails)) => Json(ClassifiedEmails { classified_emails }).into_response(),
        Ok(Err(e)) => {
            error!("Classification run failed: {:#}", e);
            internal_error(format!("{:#}", e))
        }
        Err(e) => {
            error!("Classification task failed: {}", e);
            internal_error(e.to_string())
        }
    }
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

async fn shutdown_signal() {
    use tokio::signal;
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let term = async {
        if let Ok(mut s) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            s.recv().await;
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();
    tokio::select! { _ = ctrl_c => {}, _ = term => {} }
    info!("shutting down");
}
