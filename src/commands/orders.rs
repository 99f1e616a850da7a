use chrono::{Duration, NaiveDateTime};

use crate::db::Collection;
use crate::error::{ProductionError, Result};
use crate::models::{
    DeletedOrder, MinuteOfDay, NewOrderLine, Order, OrderLine, OrderPatch, OrderStatus,
};
use crate::production::Production;

/// Window after an edit during which an order shows as changed.
const CHANGE_WINDOW_HOURS: i64 = 24;

/// Presentation status of an order.
///
/// Late: placed on its due day after the outlet's cutoff. Change: edited
/// within the last 24 hours. Late wins over change.
pub fn derive_status(
    order: &Order,
    cutoff: Option<MinuteOfDay>,
    now: NaiveDateTime,
) -> OrderStatus {
    if let Some(cutoff) = cutoff {
        let created = order.created_at;
        if created.date() == order.due.date() && created.time() > cutoff.as_time() {
            return OrderStatus::Late;
        }
    }

    if let Some(changed_at) = order.changed_at {
        if now.signed_duration_since(changed_at) <= Duration::hours(CHANGE_WINDOW_HOURS) {
            return OrderStatus::Change;
        }
    }

    OrderStatus::Normal
}

fn materialize_lines(lines: Vec<NewOrderLine>) -> Vec<OrderLine> {
    lines
        .into_iter()
        .map(|line| OrderLine {
            id: Production::new_id(),
            item: line.item,
            qty: line.qty,
            unit: line.unit,
            finished_item_id: line.finished_item_id,
            recipe_id: line.recipe_id,
        })
        .collect()
}

impl Production {
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, id: &str) -> Result<&Order> {
        self.order_ref(id)
    }

    pub fn create_order(
        &mut self,
        outlet_id: &str,
        due: NaiveDateTime,
        lines: Vec<NewOrderLine>,
        notes: Option<String>,
    ) -> Result<Order> {
        self.outlet(outlet_id)?;

        let order = Order {
            id: Self::new_id(),
            outlet_id: outlet_id.to_string(),
            due,
            lines: materialize_lines(lines),
            notes,
            created_at: self.now(),
            changed_at: None,
        };

        self.orders.push(order.clone());
        self.persist(Collection::Orders)?;
        tracing::info!(order_id = %order.id, outlet_id, %due, lines = order.lines.len(), "order created");

        Ok(order)
    }

    pub fn edit_order(&mut self, id: &str, patch: OrderPatch) -> Result<Order> {
        if let Some(outlet_id) = &patch.outlet_id {
            self.outlet(outlet_id)?;
        }
        let now = self.now();

        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ProductionError::not_found("order", id))?;

        if let Some(outlet_id) = patch.outlet_id {
            order.outlet_id = outlet_id;
        }
        if let Some(due) = patch.due {
            order.due = due;
        }
        if let Some(lines) = patch.lines {
            order.lines = materialize_lines(lines);
        }
        if let Some(notes) = patch.notes {
            order.notes = notes;
        }
        order.changed_at = Some(now);

        let order = order.clone();
        self.persist(Collection::Orders)?;
        tracing::info!(order_id = id, "order edited");

        Ok(order)
    }

    pub fn order_status(&self, order: &Order) -> OrderStatus {
        let cutoff = self
            .outlets
            .iter()
            .find(|o| o.id == order.outlet_id)
            .map(|o| o.order_cutoff);
        derive_status(order, cutoff, self.now())
    }

    /// Moves an order to the trash. Its tasks stay on the calendar until
    /// the order is purged.
    pub fn delete_order(&mut self, id: &str, reason: Option<String>) -> Result<DeletedOrder> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| ProductionError::not_found("order", id))?;

        let order = self.orders.remove(index);
        let deleted = DeletedOrder {
            order,
            deleted_at: self.now(),
            deleted_by: self.actor().map(|a| a.id.clone()),
            delete_reason: reason,
        };

        self.deleted_orders.push(deleted.clone());
        self.persist_all(&[Collection::Orders, Collection::DeletedOrders])?;

        let message = match &deleted.delete_reason {
            Some(reason) => format!("Deleted order {} ({})", deleted.order.id, reason),
            None => format!("Deleted order {}", deleted.order.id),
        };
        self.record("delete", message)?;
        tracing::info!(order_id = id, "order moved to trash");

        Ok(deleted)
    }

    pub fn restore_order(&mut self, id: &str) -> Result<Order> {
        let index = self
            .deleted_orders
            .iter()
            .position(|d| d.order.id == id)
            .ok_or_else(|| ProductionError::not_found("deleted order", id))?;

        let order = self.deleted_orders.remove(index).order;
        self.orders.push(order.clone());
        self.persist_all(&[Collection::Orders, Collection::DeletedOrders])?;

        self.record("restore", format!("Restored order {}", order.id))?;
        tracing::info!(order_id = id, "order restored from trash");

        Ok(order)
    }
}
