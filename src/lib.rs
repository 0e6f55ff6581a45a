pub mod config;
pub mod domain {
    pub mod audit;
    pub mod payment;
    pub mod webhook;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod gateways;
        pub mod payments;
        pub mod webhooks;
    }
    pub mod routes;
}
pub mod money;
pub mod repo {
    pub mod audit_repo;
}
pub mod service {
    pub mod audit_logger;
    pub mod payment_service;
}

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
}
