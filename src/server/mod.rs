mod extractors;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{events, jobs, members, pricing, sessions};

pub use extractors::BearerToken;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/members", post(members::register))
        .route("/members/:id", get(members::find))
        .route("/members/:id/vehicles", post(members::add_vehicle))
        .route("/members/:id/documents", post(members::submit_document))
        .route(
            "/members/:id/documents/:document_id",
            patch(members::review_document),
        )
        .route("/members/:id/status", patch(members::set_status))
        .route("/members/:id/payout", post(members::payout))
        .route("/sessions", post(sessions::login).delete(sessions::logout))
        .route(
            "/pricing/config",
            get(pricing::find_config).put(pricing::update_config),
        )
        .route(
            "/pricing/thresholds",
            get(pricing::find_thresholds).put(pricing::update_thresholds),
        )
        .route("/pricing/estimate", get(pricing::estimate))
        .route("/jobs", get(jobs::list).post(jobs::create))
        .route("/jobs/:id", get(jobs::find).patch(jobs::update))
        .route("/jobs/:id/bids", post(jobs::place_bid))
        .route("/jobs/:id/offer", get(jobs::evaluate_offer))
        .route("/jobs/:id/bids/:bid_id/accept", patch(jobs::accept_bid))
        .route("/jobs/:id/status", patch(jobs::update_status))
        .route("/jobs/:id/cancel", patch(jobs::cancel))
        .route("/jobs/:id/reject", patch(jobs::reject))
        .route("/jobs/:id/dispute", patch(jobs::dispute))
        .route("/jobs/:id/resolve", patch(jobs::resolve))
        .route("/jobs/:id/messages", post(jobs::post_message))
        .route("/events", get(events::stream))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let api = Arc::new(api) as DynAPI;
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server error: {:?}", err);
            unexpected_error()
        })
}
