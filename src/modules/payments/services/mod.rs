pub mod payment_verifier;

pub use payment_verifier::PaymentVerifier;
