use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use tickethub_core::refund::RefundMessage;
use tickethub_core::repository::{EventRepository, TicketAdjustment, TicketUpdateError};

pub const REFUND_EXCHANGE: &str = "refund_exchange";
pub const REFUND_QUEUE: &str = "refund_queue";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// What to tell the broker about a processed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Done with this message: applied, duplicate, or never processable.
    Ack,
    /// Unusable against current data; reject without requeue.
    DeadLetter,
    /// Transient failure; put the message back for redelivery.
    Requeue,
}

/// Run the refund consumer for the lifetime of the process. Connection or
/// stream failures tear down to this supervisor loop, which reconnects with
/// capped exponential backoff and re-declares the topology.
pub async fn start_refund_consumer(amqp_url: String, repo: Arc<dyn EventRepository>) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match run(&amqp_url, repo.clone()).await {
            Ok(()) => {
                warn!("Refund consumer stream closed, reconnecting");
                backoff = INITIAL_BACKOFF;
            }
            Err(err) => {
                error!("Refund consumer failed: {}", err);
            }
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn run(amqp_url: &str, repo: Arc<dyn EventRepository>) -> Result<(), lapin::Error> {
    let conn = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
    let channel = conn.create_channel().await?;
    // One unacked message in flight; the broker holds the rest.
    channel.basic_qos(1, BasicQosOptions::default()).await?;
    declare_topology(&channel).await?;

    let mut consumer = channel
        .basic_consume(
            REFUND_QUEUE,
            "tickethub-refund-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    info!("Refund consumer bound to {}, waiting for messages...", REFUND_QUEUE);

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;
        let decision = handle_refund(repo.as_ref(), &delivery.data).await;
        settle(&delivery, decision).await?;
    }
    Ok(())
}

/// Declarations are idempotent, so this re-runs safely on every reconnect.
async fn declare_topology(channel: &Channel) -> Result<(), lapin::Error> {
    channel
        .exchange_declare(
            REFUND_EXCHANGE,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_declare(
            REFUND_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            REFUND_QUEUE,
            REFUND_EXCHANGE,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

async fn settle(delivery: &Delivery, decision: Decision) -> Result<(), lapin::Error> {
    match decision {
        Decision::Ack => delivery.ack(BasicAckOptions::default()).await,
        Decision::DeadLetter => {
            delivery
                .nack(BasicNackOptions {
                    requeue: false,
                    ..Default::default()
                })
                .await
        }
        Decision::Requeue => {
            delivery
                .nack(BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                })
                .await
        }
    }
}

/// Process one refund payload and classify the outcome for the broker.
///
/// A refund only ever restocks, so the shared adjustment path is called
/// with a positive delta and the message's `refundID` as idempotency key.
/// No outcome is allowed to take the consumer down: bad payloads and
/// unresolvable ticket types are consumed (retrying cannot fix them),
/// unknown events are dead-lettered, and store failures go back to the
/// queue for redelivery.
pub async fn handle_refund(repo: &dyn EventRepository, payload: &[u8]) -> Decision {
    let msg = match RefundMessage::decode(payload) {
        Ok(msg) => msg,
        Err(err) => {
            warn!("Dropping malformed refund message: {}", err);
            return Decision::Ack;
        }
    };

    let event_id = match Uuid::parse_str(&msg.event_id) {
        Ok(id) => id,
        Err(_) => {
            warn!("Refund references unparseable event id {:?}", msg.event_id);
            return Decision::DeadLetter;
        }
    };

    match repo
        .adjust_ticket_quantity(
            event_id,
            &msg.ticket_type,
            msg.ticket_quantity,
            msg.refund_id.as_deref(),
        )
        .await
    {
        Ok(TicketAdjustment::Applied { new_quantity }) => {
            info!(
                %event_id,
                ticket_type = %msg.ticket_type,
                new_quantity,
                "Restocked {} tickets",
                msg.ticket_quantity
            );
            Decision::Ack
        }
        Ok(TicketAdjustment::AlreadyProcessed) => {
            info!(%event_id, refund_id = ?msg.refund_id, "Refund already applied, dropping redelivery");
            Decision::Ack
        }
        Err(TicketUpdateError::EventNotFound) => {
            warn!(%event_id, "Refund references unknown event");
            Decision::DeadLetter
        }
        Err(TicketUpdateError::TicketTypeNotFound(name)) => {
            warn!(%event_id, ticket_type = %name, "Refund references unknown ticket type");
            Decision::Ack
        }
        Err(TicketUpdateError::InsufficientInventory { .. }) => {
            // Unreachable with positive deltas; consume rather than loop.
            warn!(%event_id, "Refund rejected by inventory bounds check");
            Decision::Ack
        }
        Err(TicketUpdateError::Conflict) => {
            warn!(%event_id, "Refund lost concurrent update races, requeueing");
            Decision::Requeue
        }
        Err(TicketUpdateError::Store(err)) => {
            error!(%event_id, "Refund could not be persisted: {}", err);
            Decision::Requeue
        }
    }
}
