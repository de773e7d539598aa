use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{ApiResponse, AppError, Caller};
use crate::modules::payments::models::{
    DecidePaymentRequest, StatisticsQuery, SubmitPaymentRequest,
};
use crate::modules::payments::services::PaymentVerifier;

/// Submit a payment for verification
/// POST /api/payments
pub async fn submit_payment(
    verifier: web::Data<Arc<PaymentVerifier>>,
    caller: Caller,
    request: web::Json<SubmitPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let submitted = verifier.submit(&caller, request.into_inner()).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(
        "Payment submitted, waiting for admin verification",
        submitted,
    )))
}

/// Verify or reject a pending payment
/// PUT /api/payments/{id}/verify
pub async fn decide_payment(
    verifier: web::Data<Arc<PaymentVerifier>>,
    caller: Caller,
    path: web::Path<i64>,
    request: web::Json<DecidePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let request = request.into_inner();
    let outcome = verifier
        .decide(&caller, path.into_inner(), &request.status, request.notes)
        .await?;

    let message = format!("Payment {}", outcome.status);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(message, outcome)))
}

/// GET /api/payments/statistics?month=YYYY-MM
pub async fn payment_statistics(
    verifier: web::Data<Arc<PaymentVerifier>>,
    caller: Caller,
    query: web::Query<StatisticsQuery>,
) -> Result<HttpResponse, AppError> {
    caller.require_admin()?;
    let stats = verifier.statistics(query.into_inner().month).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Payment statistics", stats)))
}

/// Configure payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::post().to(submit_payment))
            .route("/statistics", web::get().to(payment_statistics))
            .route("/{id}/verify", web::put().to(decide_payment)),
    );
}
