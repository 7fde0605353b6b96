//! In-memory [`EventRepository`] used by handler and consumer tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::event::{Comment, Event, EventPatch, NewComment, NewEvent, Ticket};
use crate::inventory::{apply_ticket_delta, InventoryError};
use crate::repository::{EventRepository, Page, TicketAdjustment, TicketUpdateError};

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    processed_refunds: HashSet<String>,
    fail_writes: bool,
}

/// HashMap-backed repository double. Write behavior matches the Postgres
/// implementation: validation before writes, idempotency keys recorded
/// atomically with the adjustment, read paths returning events without
/// comments.
#[derive(Default)]
pub struct InMemoryEventRepository {
    inner: Mutex<Inner>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event directly, bypassing validation.
    pub fn insert(&self, event: Event) -> Uuid {
        let id = event.id;
        self.inner.lock().unwrap().events.insert(id, event);
        id
    }

    /// Snapshot of a stored event, comments included.
    pub fn event(&self, id: Uuid) -> Option<Event> {
        self.inner.lock().unwrap().events.get(&id).cloned()
    }

    pub fn was_processed(&self, refund_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .processed_refunds
            .contains(refund_id)
    }

    /// Make every subsequent write fail, for persistence-failure paths.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    fn write_error() -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(std::io::Error::other("simulated store failure"))
    }

    fn without_comments(event: &Event) -> Event {
        let mut event = event.clone();
        event.comments.clear();
        event
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn create_event(
        &self,
        event: &NewEvent,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        event.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(Self::write_error());
        }
        let id = Uuid::new_v4();
        inner.events.insert(
            id,
            Event {
                id,
                title: event.title.clone(),
                category: event.category,
                description: event.description.clone(),
                organizer: event.organizer.clone(),
                start_date: event.start_date,
                end_date: event.end_date,
                location: event.location.clone(),
                tickets: event.tickets.iter().cloned().map(Ticket::from).collect(),
                image: event.image.clone(),
                comments: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn get_event(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.get(&id).map(Self::without_comments))
    }

    async fn list_events(
        &self,
        page: Page,
    ) -> Result<Vec<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.lock().unwrap();
        let mut events: Vec<Event> = inner.events.values().map(Self::without_comments).collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn list_available_events(
        &self,
        page: Page,
    ) -> Result<Vec<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let now = Utc::now();
        let inner = self.inner.lock().unwrap();
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| e.start_date > now && e.tickets.iter().any(|t| t.quantity > 0))
            .map(Self::without_comments)
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn closest_upcoming_event(
        &self,
        ids: &[Uuid],
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let now = Utc::now();
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.events.get(id))
            .filter(|e| e.start_date > now)
            .min_by_key(|e| e.start_date)
            .map(Self::without_comments))
    }

    async fn update_event_fields(
        &self,
        id: Uuid,
        patch: EventPatch,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        patch.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(Self::write_error());
        }
        let Some(event) = inner.events.get_mut(&id) else {
            return Ok(false);
        };
        patch.apply(event)?;
        Ok(true)
    }

    async fn minimum_ticket_price(
        &self,
        id: Uuid,
    ) -> Result<Option<f64>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.get(&id).and_then(|e| {
            e.tickets
                .iter()
                .filter(|t| t.quantity > 0)
                .map(|t| t.price)
                .fold(None, |min, p| match min {
                    Some(m) if m <= p => Some(m),
                    _ => Some(p),
                })
        }))
    }

    async fn total_ticket_quantity(
        &self,
        id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .get(&id)
            .map(|e| e.tickets.iter().map(|t| t.quantity).sum())
            .unwrap_or(0))
    }

    async fn adjust_ticket_quantity(
        &self,
        id: Uuid,
        ticket_type: &str,
        delta: i64,
        idempotency_key: Option<&str>,
    ) -> Result<TicketAdjustment, TicketUpdateError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(TicketUpdateError::Store(Self::write_error()));
        }
        if let Some(key) = idempotency_key {
            if inner.processed_refunds.contains(key) {
                return Ok(TicketAdjustment::AlreadyProcessed);
            }
        }
        let event = inner
            .events
            .get_mut(&id)
            .ok_or(TicketUpdateError::EventNotFound)?;
        let new_quantity = apply_ticket_delta(event, ticket_type, delta).map_err(|e| match e {
            InventoryError::TicketTypeNotFound(name) => {
                TicketUpdateError::TicketTypeNotFound(name)
            }
            InventoryError::InsufficientInventory {
                requested,
                available,
            } => TicketUpdateError::InsufficientInventory {
                requested,
                available,
            },
        })?;
        if let Some(key) = idempotency_key {
            inner.processed_refunds.insert(key.to_string());
        }
        Ok(TicketAdjustment::Applied { new_quantity })
    }

    async fn add_comment(
        &self,
        id: Uuid,
        comment: NewComment,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(Self::write_error());
        }
        let Some(event) = inner.events.get_mut(&id) else {
            return Ok(false);
        };
        event.comments.push(comment.into_comment(Utc::now()));
        Ok(true)
    }

    async fn list_comments(
        &self,
        id: Uuid,
        page: Page,
    ) -> Result<Vec<Comment>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.lock().unwrap();
        let mut comments: Vec<Comment> = inner
            .events
            .get(&id)
            .map(|e| e.comments.clone())
            .unwrap_or_default();
        comments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(comments
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn comment_count(
        &self,
        id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .get(&id)
            .map(|e| e.comments.len() as i64)
            .unwrap_or(0))
    }
}
