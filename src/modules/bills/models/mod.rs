mod bill;

pub use bill::{
    derive_display_status, Bill, BillDetail, BillStatus, BillingCandidate, BulkFailure,
    BulkGenerationReport, BulkGenerationRequest, DisplayStatus, GenerateBillRequest, GeneratedBill, NewBill,
    ReadingSelector, UpdateBillStatusRequest,
};
