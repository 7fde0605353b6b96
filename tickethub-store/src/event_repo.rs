use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use tickethub_core::event::{Comment, Event, EventPatch, NewComment, NewEvent, Ticket};
use tickethub_core::inventory::{apply_ticket_delta, InventoryError};
use tickethub_core::repository::{EventRepository, Page, TicketAdjustment, TicketUpdateError};

/// Postgres-backed event repository. One row per aggregate: scalar columns
/// plus `tickets` and `comments` JSONB documents and a `version` counter
/// used for the compare-and-swap ticket write path.
pub struct StoreEventRepository {
    pool: PgPool,
}

impl StoreEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Retries for the optimistic-concurrency loop before reporting a conflict.
const MAX_CAS_ATTEMPTS: u32 = 3;

const EVENT_COLUMNS: &str =
    "id, title, category, description, organizer, start_date, end_date, location, image, tickets";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    category: String,
    description: String,
    organizer: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    location: String,
    image: Option<String>,
    tickets: Value,
    #[sqlx(default)]
    version: i64,
}

impl EventRow {
    fn into_event(self) -> Result<Event, Box<dyn std::error::Error + Send + Sync>> {
        let tickets: Vec<Ticket> = serde_json::from_value(self.tickets)?;
        Ok(Event {
            id: self.id,
            title: self.title,
            category: self.category.parse()?,
            description: self.description,
            organizer: self.organizer,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            tickets,
            image: self.image,
            comments: Vec::new(),
        })
    }
}

fn store_err<E>(err: E) -> TicketUpdateError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TicketUpdateError::Store(Box::new(err))
}

#[async_trait]
impl EventRepository for StoreEventRepository {
    async fn create_event(
        &self,
        event: &NewEvent,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        event.validate()?;

        let id = Uuid::new_v4();
        let tickets: Vec<Ticket> = event.tickets.iter().cloned().map(Ticket::from).collect();
        let tickets_json = serde_json::to_value(&tickets)?;

        sqlx::query(
            r#"
            INSERT INTO events (id, title, category, description, organizer, start_date, end_date, location, image, tickets, comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, '[]'::jsonb)
            "#,
        )
        .bind(id)
        .bind(&event.title)
        .bind(event.category.as_str())
        .bind(&event.description)
        .bind(&event.organizer)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(&event.image)
        .bind(&tickets_json)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_event(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRow::into_event).transpose()
    }

    async fn list_events(
        &self,
        page: Page,
    ) -> Result<Vec<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at OFFSET $1 LIMIT $2"
        ))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn list_available_events(
        &self,
        page: Page,
    ) -> Result<Vec<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE start_date > now()
              AND EXISTS (
                  SELECT 1 FROM jsonb_array_elements(tickets) AS t
                  WHERE (t->>'quantity')::bigint > 0
              )
            ORDER BY start_date
            OFFSET $1 LIMIT $2
            "#
        ))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn closest_upcoming_event(
        &self,
        ids: &[Uuid],
    ) -> Result<Option<Event>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE id = ANY($1) AND start_date > now()
            ORDER BY start_date
            LIMIT 1
            "#
        ))
        .bind(ids)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRow::into_event).transpose()
    }

    async fn update_event_fields(
        &self,
        id: Uuid,
        patch: EventPatch,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        patch.validate()?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let mut event = row.into_event()?;
        patch.apply(&mut event)?;

        let tickets_json = serde_json::to_value(&event.tickets)?;
        sqlx::query(
            r#"
            UPDATE events
            SET title = $1, category = $2, description = $3, organizer = $4,
                start_date = $5, end_date = $6, location = $7, image = $8,
                tickets = $9, version = version + 1, updated_at = now()
            WHERE id = $10
            "#,
        )
        .bind(&event.title)
        .bind(event.category.as_str())
        .bind(&event.description)
        .bind(&event.organizer)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(&event.image)
        .bind(&tickets_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    async fn minimum_ticket_price(
        &self,
        id: Uuid,
    ) -> Result<Option<f64>, Box<dyn std::error::Error + Send + Sync>> {
        let min_price = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT MIN((t->>'price')::float8)
            FROM events e, jsonb_array_elements(e.tickets) AS t
            WHERE e.id = $1 AND (t->>'quantity')::bigint > 0
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(min_price)
    }

    async fn total_ticket_quantity(
        &self,
        id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM((t->>'quantity')::bigint), 0)::bigint
            FROM events e, jsonb_array_elements(e.tickets) AS t
            WHERE e.id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn adjust_ticket_quantity(
        &self,
        id: Uuid,
        ticket_type: &str,
        delta: i64,
        idempotency_key: Option<&str>,
    ) -> Result<TicketAdjustment, TicketUpdateError> {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let mut tx = self.pool.begin().await.map_err(store_err)?;

            if let Some(key) = idempotency_key {
                let seen = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM processed_refunds WHERE refund_id = $1)",
                )
                .bind(key)
                .fetch_one(&mut *tx)
                .await
                .map_err(store_err)?;
                if seen {
                    return Ok(TicketAdjustment::AlreadyProcessed);
                }
            }

            let row = sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {EVENT_COLUMNS}, version FROM events WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;

            let Some(row) = row else {
                return Err(TicketUpdateError::EventNotFound);
            };
            let version = row.version;
            let mut event = row.into_event().map_err(TicketUpdateError::Store)?;

            let new_quantity =
                apply_ticket_delta(&mut event, ticket_type, delta).map_err(|e| match e {
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

            let tickets_json = serde_json::to_value(&event.tickets).map_err(store_err)?;
            let updated = sqlx::query(
                r#"
                UPDATE events
                SET tickets = $1, version = version + 1, updated_at = now()
                WHERE id = $2 AND version = $3
                "#,
            )
            .bind(&tickets_json)
            .bind(id)
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

            if updated.rows_affected() == 0 {
                // Lost the race against a concurrent writer; reload and retry.
                tx.rollback().await.map_err(store_err)?;
                tracing::debug!(event_id = %id, attempt, "ticket update CAS conflict, retrying");
                continue;
            }

            if let Some(key) = idempotency_key {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO processed_refunds (refund_id, event_id)
                    VALUES ($1, $2)
                    ON CONFLICT (refund_id) DO NOTHING
                    "#,
                )
                .bind(key)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
                // A concurrent consumer recorded the same refund first.
                if inserted.rows_affected() == 0 {
                    tx.rollback().await.map_err(store_err)?;
                    return Ok(TicketAdjustment::AlreadyProcessed);
                }
            }

            tx.commit().await.map_err(store_err)?;
            return Ok(TicketAdjustment::Applied { new_quantity });
        }

        Err(TicketUpdateError::Conflict)
    }

    async fn add_comment(
        &self,
        id: Uuid,
        comment: NewComment,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let comment = comment.into_comment(Utc::now());
        let comment_json = serde_json::to_value(&comment)?;

        let result = sqlx::query(
            r#"
            UPDATE events
            SET comments = comments || jsonb_build_array($1::jsonb), updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(&comment_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(
        &self,
        id: Uuid,
        page: Page,
    ) -> Result<Vec<Comment>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT c
            FROM events e, jsonb_array_elements(e.comments) AS c
            WHERE e.id = $1
            ORDER BY (c->>'date')::timestamptz DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|c| serde_json::from_value(c).map_err(Into::into))
            .collect()
    }

    async fn comment_count(
        &self,
        id: Uuid,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let count = sqlx::query_scalar::<_, i32>(
            "SELECT jsonb_array_length(comments) FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0) as i64)
    }
}
