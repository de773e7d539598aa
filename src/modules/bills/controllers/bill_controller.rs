use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{ApiResponse, AppError, Caller};
use crate::modules::bills::models::{
    BulkGenerationRequest, GenerateBillRequest, UpdateBillStatusRequest,
};
use crate::modules::bills::services::{BillGenerator, BillService};

/// Generate the bill of one meter reading
/// POST /api/bills/generate
pub async fn generate_bill(
    generator: web::Data<Arc<BillGenerator>>,
    caller: Caller,
    request: web::Json<GenerateBillRequest>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let selector = request.into_inner().into_selector()?;
    let bill = generator.generate(selector).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok("Bill generated", bill)))
}

/// Generate bills for every unbilled reading of a month
/// POST /api/bills/generate-bulk, body optional (current local month when absent)
pub async fn generate_bulk(
    generator: web::Data<Arc<BillGenerator>>,
    caller: Caller,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let month = BulkGenerationRequest::from_body(&body)?.bill_month;
    let report = generator.generate_bulk(month).await?;

    let message = format!(
        "Generated {} of {} bills",
        report.success_count, report.total_readings
    );
    Ok(HttpResponse::Ok().json(ApiResponse::ok(message, report)))
}

/// GET /api/bills/{id}
pub async fn get_bill(
    service: web::Data<Arc<BillService>>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let detail = service.bill_detail(&caller, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Bill found", detail)))
}

/// Manual status override
/// PUT /api/bills/{id}/status
pub async fn update_bill_status(
    service: web::Data<Arc<BillService>>,
    caller: Caller,
    path: web::Path<i64>,
    request: web::Json<UpdateBillStatusRequest>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let bill = service
        .update_bill_status(path.into_inner(), &request.status)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Bill status updated", bill)))
}

/// DELETE /api/bills/{id}
pub async fn delete_bill(
    service: web::Data<Arc<BillService>>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    service.delete_bill(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Bill deleted")))
}

/// Configure bill routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bills")
            .route("/generate", web::post().to(generate_bill))
            .route("/generate-bulk", web::post().to(generate_bulk))
            .route("/{id}", web::get().to(get_bill))
            .route("/{id}", web::delete().to(delete_bill))
            .route("/{id}/status", web::put().to(update_bill_status)),
    );
}
