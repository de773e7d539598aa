mod payment;

pub use payment::{
    DecidePaymentRequest, Decision, DecisionOutcome, NewPayment, Payment, PaymentDecision,
    PaymentMethod, PaymentStatistics, PaymentStatus, StatisticsQuery, StatusCount, StatusTotals,
    SubmitPaymentRequest, SubmittedPayment,
};
