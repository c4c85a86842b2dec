mod hmac;

pub use hmac::{WebhookSignatureFactory, WEBHOOK_SIGNATURE_HEADER};
