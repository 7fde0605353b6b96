use crate::event::Event;

/// Apply a signed quantity delta to one ticket type within an event.
///
/// Lookup is a linear scan, first exact name match wins (names are unique
/// per event by write-time validation). The event is left untouched on any
/// failure. Persistence is the caller's job; this only mutates the loaded
/// representation, so the HTTP path and the refund consumer share one
/// bounds check.
pub fn apply_ticket_delta(
    event: &mut Event,
    ticket_type: &str,
    delta: i64,
) -> Result<i64, InventoryError> {
    let ticket = event
        .tickets
        .iter_mut()
        .find(|t| t.name == ticket_type)
        .ok_or_else(|| InventoryError::TicketTypeNotFound(ticket_type.to_string()))?;

    let new_quantity = ticket.quantity + delta;
    if new_quantity < 0 {
        return Err(InventoryError::InsufficientInventory {
            requested: delta.unsigned_abs() as i64,
            available: ticket.quantity,
        });
    }

    ticket.quantity = new_quantity;
    Ok(new_quantity)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InventoryError {
    #[error("Ticket type not found: {0}")]
    TicketTypeNotFound(String),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i64, available: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Category, Event, Ticket};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn event_with_tickets(tickets: Vec<Ticket>) -> Event {
        let start = Utc::now() + Duration::days(30);
        Event {
            id: Uuid::new_v4(),
            title: "Summer Fest".to_string(),
            category: Category::Festival,
            description: "Outdoor music festival".to_string(),
            organizer: "Fest Co".to_string(),
            start_date: start,
            end_date: start + Duration::days(3),
            location: "Hyde Park".to_string(),
            tickets,
            image: None,
            comments: Vec::new(),
        }
    }

    fn ticket(name: &str, quantity: i64) -> Ticket {
        Ticket {
            name: name.to_string(),
            quantity,
            initial_quantity: quantity,
            price: 35.0,
        }
    }

    #[test]
    fn negative_delta_decrements_quantity() {
        let mut event = event_with_tickets(vec![ticket("VIP", 5)]);
        let new_quantity = apply_ticket_delta(&mut event, "VIP", -3).unwrap();
        assert_eq!(new_quantity, 2);
        assert_eq!(event.tickets[0].quantity, 2);
    }

    #[test]
    fn overdraw_fails_and_leaves_event_unchanged() {
        let mut event = event_with_tickets(vec![ticket("VIP", 5)]);
        let before = event.clone();
        let err = apply_ticket_delta(&mut event, "VIP", -10).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientInventory {
                requested: 10,
                available: 5,
            }
        );
        assert_eq!(event.tickets, before.tickets);
    }

    #[test]
    fn unknown_ticket_type_fails_regardless_of_delta() {
        let mut event = event_with_tickets(vec![ticket("VIP", 5)]);
        for delta in [-10, -1, 1, 10] {
            let err = apply_ticket_delta(&mut event, "GA", delta).unwrap_err();
            assert_eq!(err, InventoryError::TicketTypeNotFound("GA".to_string()));
        }
        assert_eq!(event.tickets[0].quantity, 5);
    }

    #[test]
    fn restock_has_no_upper_bound() {
        let mut event = event_with_tickets(vec![ticket("GA", 2)]);
        let new_quantity = apply_ticket_delta(&mut event, "GA", 1_000_000).unwrap();
        assert_eq!(new_quantity, 1_000_002);
        assert!(new_quantity > event.tickets[0].initial_quantity);
    }

    #[test]
    fn siblings_are_untouched() {
        let mut event = event_with_tickets(vec![ticket("GA", 40), ticket("VIP", 8)]);
        apply_ticket_delta(&mut event, "VIP", -2).unwrap();
        assert_eq!(event.tickets[0].quantity, 40);
        assert_eq!(event.tickets[1].quantity, 6);
    }

    #[test]
    fn draining_to_exactly_zero_is_allowed() {
        let mut event = event_with_tickets(vec![ticket("GA", 4)]);
        assert_eq!(apply_ticket_delta(&mut event, "GA", -4).unwrap(), 0);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut event = event_with_tickets(vec![ticket("vip", 5)]);
        let err = apply_ticket_delta(&mut event, "VIP", -1).unwrap_err();
        assert_eq!(err, InventoryError::TicketTypeNotFound("VIP".to_string()));
    }

    #[test]
    fn initial_quantity_is_never_touched() {
        let mut event = event_with_tickets(vec![ticket("GA", 10)]);
        apply_ticket_delta(&mut event, "GA", -7).unwrap();
        apply_ticket_delta(&mut event, "GA", 20).unwrap();
        assert_eq!(event.tickets[0].initial_quantity, 10);
    }
}
