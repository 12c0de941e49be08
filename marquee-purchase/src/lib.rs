pub mod events;
pub mod finalizer;
pub mod validator;

pub use events::{BroadcastSink, EventSink};
pub use finalizer::{FinalizeError, PurchaseFinalizer};
pub use validator::{PurchasePolicy, Violation};
