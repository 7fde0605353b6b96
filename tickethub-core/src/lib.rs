pub mod event;
pub mod inventory;
pub mod refund;
pub mod repository;
pub mod testing;

pub use event::{
    Category, Comment, Event, EventPatch, NewComment, NewEvent, Ticket, TicketSpec,
    ValidationError,
};
pub use inventory::{apply_ticket_delta, InventoryError};
pub use refund::{RefundDecodeError, RefundMessage};
pub use repository::{EventRepository, Page, TicketAdjustment, TicketUpdateError};
