use crate::http::handlers::{admin, checkout, ops, payments, waivers};
use crate::http::middleware::admin_auth::require_internal_api_key;
use crate::http::middleware::rate_limit::{self, RateLimitState};
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

/// Public POST routes sit behind the rate limiter when one is given; the
/// processor webhook and read-only routes do not.
pub fn build_router(state: AppState, admin_key: String, rate_limit: Option<RateLimitState>) -> Router {
    let mut public_writes = Router::new()
        .route("/waiver-acceptances", post(waivers::accept_waiver))
        .route("/checkout-sessions", post(checkout::create_checkout_session))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/payments/cancel", post(payments::cancel_payment));
    if let Some(limits) = rate_limit {
        public_writes = public_writes.layer(from_fn_with_state(limits, rate_limit::enforce));
    }

    let admin_routes = Router::new()
        .route("/admin/payments", get(admin::list_payments))
        .route("/admin/waiver-acceptances", get(admin::list_acceptances))
        .layer(from_fn_with_state(admin_key, require_internal_api_key));

    Router::new()
        .route("/health", get(payments::health))
        .route("/ops/liveness", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .route("/waiver-acceptances/document", get(waivers::acceptance_document))
        .route("/payments/webhook", post(payments::processor_webhook))
        .merge(public_writes)
        .merge(admin_routes)
        .with_state(state)
}
