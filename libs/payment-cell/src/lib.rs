pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{CardDetails, Payment, PaymentError, PaymentMethod, PaymentStatus};
pub use services::PaymentService;
