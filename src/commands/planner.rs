use chrono::Timelike;

use crate::db::Collection;
use crate::error::{ProductionError, Result};
use crate::models::{
    Assignment, FinishedDraw, MinuteOfDay, Order, OrderStatus, Role, Task, TaskCategory,
    MINUTES_PER_DAY,
};
use crate::production::Production;

pub const LATE_COLOR: &str = "#ef4444";
pub const CHANGE_COLOR: &str = "#f59e0b";
pub const UNASSIGNED_COLOR: &str = "#64748b";

/// Stable colour for a role, derived from a hash of its id.
pub fn role_color(role_id: &str) -> String {
    let hash = role_id
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    format!("hsl({}, 65%, 45%)", hash % 360)
}

pub fn task_color(status: OrderStatus, role_id: Option<&str>) -> String {
    match status {
        OrderStatus::Late => LATE_COLOR.to_string(),
        OrderStatus::Change => CHANGE_COLOR.to_string(),
        OrderStatus::Normal => role_id
            .map(role_color)
            .unwrap_or_else(|| UNASSIGNED_COLOR.to_string()),
    }
}

/// First role, in catalog order, tagged with `capability`.
pub fn resolve_role<'a>(roles: &'a [Role], capability: &str) -> Option<&'a Role> {
    roles.iter().find(|r| r.tags.contains(capability))
}

/// Window of `duration` minutes ending at `due`, kept inside the day.
pub fn window_ending_at(due: u16, duration: u16) -> (MinuteOfDay, MinuteOfDay) {
    let last = MINUTES_PER_DAY - 1;
    let duration = duration.clamp(1, last);
    let end = due.max(duration).min(last);
    (
        MinuteOfDay::saturating(i32::from(end - duration)),
        MinuteOfDay::saturating(i32::from(end)),
    )
}

fn order_task(order: &Order, title: String, category: TaskCategory) -> Task {
    Task {
        id: Production::new_id(),
        title,
        date: order.due.date(),
        start: MinuteOfDay::MIDNIGHT,
        end: MinuteOfDay::MIDNIGHT,
        outlet_id: Some(order.outlet_id.clone()),
        order_id: Some(order.id.clone()),
        role_id: None,
        staff_id: None,
        recipe_id: None,
        qty: None,
        unit: None,
        category,
        color: UNASSIGNED_COLOR.to_string(),
        done: false,
        inv_accounted: false,
        pull_from_finished: Vec::new(),
        use_raw: Vec::new(),
        lane_bias: 0,
        pending: false,
        pending_original_date: None,
        pending_original_start: None,
        pending_original_end: None,
    }
}

impl Production {
    /// Turns an order into tasks, drawing from finished stock first.
    ///
    /// Each line with stock on hand yields a short pull task and takes the
    /// allocated quantity out of stock immediately. Whatever stock cannot
    /// cover becomes a produce task carrying the recipe, so completing it
    /// credits the finished item. Calling this again on the same order adds
    /// a fresh set of tasks alongside any earlier ones.
    pub fn plan_order(&mut self, order_id: &str, assignment: Option<Assignment>) -> Result<Vec<Task>> {
        let order = self.order_ref(order_id)?.clone();
        let assignment = assignment.unwrap_or_default();

        if let Some(role_id) = &assignment.role_id {
            self.role(role_id)?;
        }
        if let Some(staff_id) = &assignment.staff_id {
            self.staff_member(staff_id)?;
        }

        let status = self.order_status(&order);
        let due_minute = (order.due.hour() * 60 + order.due.minute()) as u16;
        let pull_window = window_ending_at(due_minute, self.config().pull_task_minutes);
        let produce_window = window_ending_at(due_minute, self.config().produce_task_minutes);
        let default_capability = self.config().default_capability.clone();

        let mut planned = Vec::new();

        for line in &order.lines {
            let mut allocated = 0.0;
            let mut capability = None;
            let mut recipe_id = line.recipe_id.clone();

            if let Some(finished_id) = &line.finished_item_id {
                match self.finished_items.iter_mut().find(|f| &f.id == finished_id) {
                    Some(item) => {
                        capability = item.capability.clone();
                        if recipe_id.is_none() {
                            recipe_id = item.recipe_id.clone();
                        }
                        if item.on_hand > 0.0 && line.qty > 0.0 {
                            allocated = item.on_hand.min(line.qty);
                            item.on_hand = (item.on_hand - allocated).max(0.0);
                            tracing::debug!(
                                finished_item_id = %item.id,
                                allocated,
                                remaining_stock = item.on_hand,
                                "allocated finished stock"
                            );
                        }
                    }
                    None => {
                        tracing::warn!(
                            finished_item_id = %finished_id,
                            order_id,
                            "order line references unknown finished item"
                        );
                    }
                }
            }

            if allocated > 0.0 {
                let mut task = order_task(&order, format!("Pull {}", line.item), TaskCategory::Delivery);
                task.start = pull_window.0;
                task.end = pull_window.1;
                task.qty = Some(allocated);
                task.unit = Some(line.unit.clone());
                task.role_id = assignment.role_id.clone();
                task.staff_id = assignment.staff_id.clone();
                task.color = task_color(status, task.role_id.as_deref());
                task.pull_from_finished = vec![FinishedDraw {
                    finished_item_id: line.finished_item_id.clone().unwrap_or_default(),
                    qty: allocated,
                }];
                planned.push(task);
            }

            let remaining = line.qty - allocated;
            if remaining > 0.0 {
                let capability = capability.unwrap_or_else(|| default_capability.clone());
                let role_id = assignment.role_id.clone().or_else(|| {
                    resolve_role(&self.roles, &capability).map(|r| r.id.clone())
                });

                let mut task = order_task(&order, format!("Produce {}", line.item), TaskCategory::Production);
                task.start = produce_window.0;
                task.end = produce_window.1;
                task.recipe_id = recipe_id;
                task.qty = Some(remaining);
                task.unit = Some(line.unit.clone());
                task.staff_id = assignment.staff_id.clone();
                task.color = task_color(status, role_id.as_deref());
                task.role_id = role_id;
                planned.push(task);
            }
        }

        self.tasks.extend(planned.iter().cloned());
        self.persist_all(&[Collection::FinishedItems, Collection::Tasks])?;
        tracing::info!(order_id, tasks = planned.len(), "order planned");

        Ok(planned)
    }

    /// Tasks generated from, or attached to, an order.
    pub fn tasks_for_order(&self, order_id: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.order_id.as_deref() == Some(order_id))
            .collect()
    }

    pub(crate) fn require_order_exists(&self, order_id: &str) -> Result<()> {
        let active = self.orders.iter().any(|o| o.id == order_id);
        let trashed = self.deleted_orders.iter().any(|d| d.order.id == order_id);
        if active || trashed {
            Ok(())
        } else {
            Err(ProductionError::not_found("order", order_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_role_color_is_stable() {
        assert_eq!(role_color("baker"), role_color("baker"));
        assert!(role_color("baker").starts_with("hsl("));
    }

    #[test]
    fn test_status_overrides_role_color() {
        assert_eq!(task_color(OrderStatus::Late, Some("baker")), LATE_COLOR);
        assert_eq!(task_color(OrderStatus::Change, Some("baker")), CHANGE_COLOR);
        assert_eq!(task_color(OrderStatus::Normal, None), UNASSIGNED_COLOR);
        assert_eq!(task_color(OrderStatus::Normal, Some("baker")), role_color("baker"));
    }

    #[test]
    fn test_resolve_role_by_tag_in_catalog_order() {
        let roles = vec![
            Role {
                id: "cook".to_string(),
                name: "Line Cook".to_string(),
                tags: BTreeSet::from(["production".to_string()]),
            },
            Role {
                id: "pastry".to_string(),
                name: "Pastry".to_string(),
                tags: BTreeSet::from(["baking".to_string(), "production".to_string()]),
            },
        ];

        assert_eq!(resolve_role(&roles, "baking").unwrap().id, "pastry");
        assert_eq!(resolve_role(&roles, "production").unwrap().id, "cook");
        assert!(resolve_role(&roles, "butchery").is_none());
    }

    #[test]
    fn test_window_ends_at_due_time() {
        let (start, end) = window_ending_at(9 * 60, 120);
        assert_eq!(start.to_string(), "07:00");
        assert_eq!(end.to_string(), "09:00");
    }

    #[test]
    fn test_window_near_midnight_stays_in_day() {
        let (start, end) = window_ending_at(30, 120);
        assert_eq!(start.to_string(), "00:00");
        assert_eq!(end.to_string(), "02:00");
    }
}
