use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::store::{Store, UnitOfWork};

/// Body of both probes; `store` is only filled by `/ready`
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
}

impl ProbeResponse {
    fn new(status: &str, store: Option<bool>) -> Self {
        Self {
            status: status.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            store,
        }
    }
}

/// GET /health
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(ProbeResponse::new("healthy", None))
}

/// GET /ready, 503 while the store cannot open a unit of work
pub async fn readiness_check(store: web::Data<Arc<dyn Store>>) -> impl Responder {
    if store_reachable(store.get_ref().as_ref()).await {
        HttpResponse::Ok().json(ProbeResponse::new("ready", Some(true)))
    } else {
        HttpResponse::ServiceUnavailable().json(ProbeResponse::new("unavailable", Some(false)))
    }
}

async fn store_reachable(store: &dyn Store) -> bool {
    let mut uow = match store.begin().await {
        Ok(uow) => uow,
        Err(e) => {
            tracing::error!(error = %e, "Readiness check could not reach the store");
            return false;
        }
    };

    match uow.rollback().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Readiness rollback failed");
            false
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check));
}
