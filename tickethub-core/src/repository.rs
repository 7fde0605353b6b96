use async_trait::async_trait;
use uuid::Uuid;

use crate::event::{Comment, Event, EventPatch, NewComment, NewEvent};

/// Pagination window shared by the list endpoints. Mirrors the public API
/// contract: negative skip clamps to zero, limit outside (0, 50] falls back
/// to 50.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;

    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        let skip = skip.unwrap_or(0).max(0);
        let limit = match limit {
            Some(l) if l > 0 && l < Self::DEFAULT_LIMIT => l,
            _ => Self::DEFAULT_LIMIT,
        };
        Page { skip, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

/// Outcome of a successful ticket-quantity adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAdjustment {
    Applied { new_quantity: i64 },
    /// The idempotency key was already recorded; nothing was written.
    AlreadyProcessed,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketUpdateError {
    #[error("Event not found")]
    EventNotFound,

    #[error("Ticket type not found: {0}")]
    TicketTypeNotFound(String),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i64, available: i64 },

    #[error("Concurrent update conflict, retries exhausted")]
    Conflict,

    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistence boundary for the event aggregate.
///
/// `adjust_ticket_quantity` is the single write path for ticket quantities:
/// both the HTTP update endpoint and the refund consumer go through it, and
/// the implementation is responsible for making the read-modify-write safe
/// under concurrent writers.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create_event(
        &self,
        event: &NewEvent,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    /// Comments are not loaded on the read paths; `Event::comments` comes
    /// back empty.
    async fn get_event(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_events(
        &self,
        page: Page,
    ) -> Result<Vec<Event>, Box<dyn std::error::Error + Send + Sync>>;

    /// Events with a future start date and at least one ticket available.
    async fn list_available_events(
        &self,
        page: Page,
    ) -> Result<Vec<Event>, Box<dyn std::error::Error + Send + Sync>>;

    /// Among the given ids, the not-yet-started event closest to now.
    async fn closest_upcoming_event(
        &self,
        ids: &[Uuid],
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>>;

    /// Returns false when the event does not exist.
    async fn update_event_fields(
        &self,
        id: Uuid,
        patch: EventPatch,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Minimum price across ticket types that still have quantity, or None
    /// when nothing is available (or the event does not exist).
    async fn minimum_ticket_price(
        &self,
        id: Uuid,
    ) -> Result<Option<f64>, Box<dyn std::error::Error + Send + Sync>>;

    /// Total available quantity across all ticket types; 0 for unknown ids.
    async fn total_ticket_quantity(
        &self,
        id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;

    /// Apply a signed delta to one ticket type. With an idempotency key the
    /// write and the key record commit atomically, and a repeated key is a
    /// no-op reported as `AlreadyProcessed`.
    async fn adjust_ticket_quantity(
        &self,
        id: Uuid,
        ticket_type: &str,
        delta: i64,
        idempotency_key: Option<&str>,
    ) -> Result<TicketAdjustment, TicketUpdateError>;

    /// Returns false when the event does not exist.
    async fn add_comment(
        &self,
        id: Uuid,
        comment: NewComment,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Newest first.
    async fn list_comments(
        &self,
        id: Uuid,
        page: Page,
    ) -> Result<Vec<Comment>, Box<dyn std::error::Error + Send + Sync>>;

    /// 0 for unknown ids.
    async fn comment_count(
        &self,
        id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>>;
}
