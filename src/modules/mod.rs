pub mod bills;
pub mod customers;
pub mod health;
pub mod meter_readings;
pub mod payments;
pub mod tariffs;

use std::sync::Arc;

use actix_web::web;

use crate::config::BillingConfig;
use crate::core::Clock;
use crate::middleware::{json_error_handler, path_error_handler, query_error_handler};
use crate::store::Store;
use bills::services::{BillGenerator, BillService};
use meter_readings::services::MeterReadingService;
use payments::services::PaymentVerifier;

/// Every service of the application, wired to one store and one clock
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub readings: Arc<MeterReadingService>,
    pub generator: Arc<BillGenerator>,
    pub bills: Arc<BillService>,
    pub payments: Arc<PaymentVerifier>,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, billing: BillingConfig) -> Self {
        Self {
            readings: Arc::new(MeterReadingService::new(store.clone())),
            generator: Arc::new(BillGenerator::new(
                store.clone(),
                clock.clone(),
                billing.clone(),
            )),
            bills: Arc::new(BillService::new(store.clone(), clock.clone())),
            payments: Arc::new(PaymentVerifier::new(store.clone(), clock, billing)),
            store,
        }
    }

    /// Register shared state, extractor error handlers and all routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.store.clone()))
            .app_data(web::Data::new(self.readings.clone()))
            .app_data(web::Data::new(self.generator.clone()))
            .app_data(web::Data::new(self.bills.clone()))
            .app_data(web::Data::new(self.payments.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .configure(health::controllers::configure)
            .service(
                web::scope("/api")
                    .configure(meter_readings::controllers::configure)
                    .configure(bills::controllers::configure)
                    .configure(payments::controllers::configure),
            );
    }
}
