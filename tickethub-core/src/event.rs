use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    #[serde(rename = "Charity Event")]
    CharityEvent,
    #[serde(rename = "Concert")]
    Concert,
    #[serde(rename = "Conference")]
    Conference,
    #[serde(rename = "Convention")]
    Convention,
    #[serde(rename = "Exhibition")]
    Exhibition,
    #[serde(rename = "Festival")]
    Festival,
    #[serde(rename = "Product Launch")]
    ProductLaunch,
    #[serde(rename = "Sports Event")]
    SportsEvent,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CharityEvent => "Charity Event",
            Category::Concert => "Concert",
            Category::Conference => "Conference",
            Category::Convention => "Convention",
            Category::Exhibition => "Exhibition",
            Category::Festival => "Festival",
            Category::ProductLaunch => "Product Launch",
            Category::SportsEvent => "Sports Event",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Charity Event" => Ok(Category::CharityEvent),
            "Concert" => Ok(Category::Concert),
            "Conference" => Ok(Category::Conference),
            "Convention" => Ok(Category::Convention),
            "Exhibition" => Ok(Category::Exhibition),
            "Festival" => Ok(Category::Festival),
            "Product Launch" => Ok(Category::ProductLaunch),
            "Sports Event" => Ok(Category::SportsEvent),
            other => Err(ValidationError::UnknownCategory(other.to_string())),
        }
    }
}

/// A named inventory line within an event. Tickets have no id of their own;
/// `name` identifies them within the owning event and lookups are
/// first-match, so names must be unique per event (checked at write time).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub name: String,
    pub quantity: i64,
    pub initial_quantity: i64,
    pub price: f64,
}

/// Inbound ticket shape: `initial_quantity` is captured from `quantity`
/// when the ticket is first stored, never supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSpec {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

impl From<TicketSpec> for Ticket {
    fn from(spec: TicketSpec) -> Self {
        Ticket {
            name: spec.name,
            quantity: spec.quantity,
            initial_quantity: spec.quantity,
            price: spec.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub username: String,
    pub content: String,
}

impl NewComment {
    pub fn into_comment(self, date: DateTime<Utc>) -> Comment {
        Comment {
            username: self.username,
            date,
            content: self.content,
        }
    }
}

/// The aggregate root: a ticketed happening owning its ticket types and
/// comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub organizer: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub tickets: Vec<Ticket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

/// Payload for event creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub organizer: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub tickets: Vec<TicketSpec>,
    pub image: Option<String>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("description", &self.description)?;
        require_non_empty("organizer", &self.organizer)?;
        require_non_empty("location", &self.location)?;
        if self.end_date <= self.start_date {
            return Err(ValidationError::DateOrder);
        }
        validate_tickets(&self.tickets)
    }
}

/// Field-by-field patch for event updates. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub tickets: Option<Vec<TicketSpec>>,
    pub image: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.organizer.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.location.is_none()
            && self.tickets.is_none()
            && self.image.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_non_empty("title", title)?;
        }
        if let Some(description) = &self.description {
            require_non_empty("description", description)?;
        }
        if let Some(organizer) = &self.organizer {
            require_non_empty("organizer", organizer)?;
        }
        if let Some(location) = &self.location {
            require_non_empty("location", location)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end <= start {
                return Err(ValidationError::DateOrder);
            }
        }
        if let Some(tickets) = &self.tickets {
            validate_tickets(tickets)?;
        }
        Ok(())
    }

    /// Apply the patch to a loaded event. Cross-field invariants are
    /// re-checked against the merged result, so a patch moving only
    /// `end_date` before the stored `start_date` still fails.
    pub fn apply(self, event: &mut Event) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(organizer) = self.organizer {
            event.organizer = organizer;
        }
        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(tickets) = self.tickets {
            event.tickets = tickets.into_iter().map(Ticket::from).collect();
        }
        if let Some(image) = self.image {
            event.image = Some(image);
        }
        if event.end_date <= event.start_date {
            return Err(ValidationError::DateOrder);
        }
        Ok(())
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

fn validate_tickets(tickets: &[TicketSpec]) -> Result<(), ValidationError> {
    if tickets.is_empty() {
        return Err(ValidationError::NoTickets);
    }
    for ticket in tickets {
        require_non_empty("tickets.name", &ticket.name)?;
        if ticket.quantity < 0 {
            return Err(ValidationError::NegativeQuantity(ticket.name.clone()));
        }
        if ticket.price < 0.0 {
            return Err(ValidationError::NegativePrice(ticket.name.clone()));
        }
    }
    for (i, ticket) in tickets.iter().enumerate() {
        if tickets[..i].iter().any(|t| t.name == ticket.name) {
            return Err(ValidationError::DuplicateTicketName(ticket.name.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    EmptyField(&'static str),

    #[error("End date must be after start date")]
    DateOrder,

    #[error("At least one ticket is required")]
    NoTickets,

    #[error("Duplicate ticket name: {0}")]
    DuplicateTicketName(String),

    #[error("Ticket quantity must be non-negative: {0}")]
    NegativeQuantity(String),

    #[error("Ticket price must be non-negative: {0}")]
    NegativePrice(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
