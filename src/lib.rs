pub mod catalog;
pub mod config;
pub mod domain {
    pub mod context;
    pub mod error;
    pub mod member;
    pub mod payment;
    pub mod waiver;
}
pub mod http {
    pub mod handlers {
        pub mod admin;
        pub mod checkout;
        pub mod ops;
        pub mod payments;
        pub mod waivers;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
    pub mod rejection;
    pub mod router;
}
pub mod processor;
pub mod repo {
    pub mod members_repo;
    pub mod orders_repo;
    pub mod payments_repo;
    pub mod registrations_repo;
    pub mod waiver_acceptances_repo;
}
pub mod service {
    pub mod checkout_service;
    pub mod notifier;
    pub mod reconciliation_service;
    pub mod waiver_service;
}
pub mod waiver;

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub redis_client: redis::Client,
    pub waiver_service: service::waiver_service::WaiverService,
    pub checkout_service: service::checkout_service::CheckoutService,
    pub reconciliation_service: service::reconciliation_service::ReconciliationService,
    pub payments_repo: repo::payments_repo::PaymentsRepo,
    pub acceptances_repo: repo::waiver_acceptances_repo::WaiverAcceptancesRepo,
}
