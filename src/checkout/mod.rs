pub mod coordinator;
pub mod error;
pub mod presentation;
pub mod session;

pub use coordinator::{CheckoutCoordinator, CheckoutState, FailureReason, Outcome};
pub use error::CheckoutError;
pub use presentation::{ConsoleSink, PresentationSink};
pub use session::SessionSlot;
