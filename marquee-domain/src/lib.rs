pub mod clock;
pub mod events;
pub mod hold;
pub mod purchase;
pub mod store;
pub mod ticket;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{PurchaseEvent, TicketHeldEvent};
pub use hold::Hold;
pub use purchase::{Purchase, PurchaseStatus};
pub use store::{StoreError, TicketState, TicketStateStore};
pub use ticket::{Ticket, TicketStatus};
