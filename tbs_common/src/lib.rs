mod cents;
mod secret;

pub use cents::{Cents, CentsConversionError};
pub use secret::Secret;
