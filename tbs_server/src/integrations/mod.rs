mod payment;

pub use payment::HttpPaymentGateway;
