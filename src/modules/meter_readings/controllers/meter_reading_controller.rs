use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{ApiResponse, AppError, Caller};
use crate::modules::meter_readings::models::{RecordReadingRequest, UpdateReadingRequest};
use crate::modules::meter_readings::services::MeterReadingService;

/// Record a meter reading
/// POST /api/meter-readings
pub async fn record_reading(
    service: web::Data<Arc<MeterReadingService>>,
    caller: Caller,
    request: web::Json<RecordReadingRequest>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let recorded = service.record_reading(&caller, request.into_inner()).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok("Meter reading recorded", recorded)))
}

/// Correct a meter reading
/// PUT /api/meter-readings/{id}
pub async fn update_reading(
    service: web::Data<Arc<MeterReadingService>>,
    caller: Caller,
    path: web::Path<i64>,
    request: web::Json<UpdateReadingRequest>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let updated = service
        .update_reading(path.into_inner(), request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Meter reading updated", updated)))
}

/// DELETE /api/meter-readings/{id}
pub async fn delete_reading(
    service: web::Data<Arc<MeterReadingService>>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    service.delete_reading(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Meter reading deleted")))
}

/// Latest reading of a customer
/// GET /api/meter-readings/last/{customer_id}
pub async fn last_reading(
    service: web::Data<Arc<MeterReadingService>>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let last = service.last_reading(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Last meter reading", last)))
}

/// Configure meter reading routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/meter-readings")
            .route("", web::post().to(record_reading))
            .route("/last/{customer_id}", web::get().to(last_reading))
            .route("/{id}", web::put().to(update_reading))
            .route("/{id}", web::delete().to(delete_reading)),
    );
}
