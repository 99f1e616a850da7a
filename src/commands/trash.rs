use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;

use crate::db::Collection;
use crate::error::Result;
use crate::models::{DeletedOrder, SweepReport};
use crate::production::Production;

/// True once `since` is at least `ttl_days` old.
pub fn is_expired(since: NaiveDateTime, now: NaiveDateTime, ttl_days: i64) -> bool {
    now.signed_duration_since(since) >= Duration::days(ttl_days)
}

impl Production {
    /// Soft-deleted orders, most recently deleted first.
    pub fn trash(&self) -> Vec<&DeletedOrder> {
        let mut trash: Vec<&DeletedOrder> = self.deleted_orders.iter().collect();
        trash.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        trash
    }

    /// Drops expired trash (with the tasks that still point at it) and old
    /// log entries. Safe to run at any time.
    pub fn sweep(&mut self) -> Result<SweepReport> {
        let now = self.now();
        let trash_ttl = self.config().trash_ttl_days;
        let log_ttl = self.config().log_ttl_days;

        let expired: HashSet<String> = self
            .deleted_orders
            .iter()
            .filter(|d| is_expired(d.deleted_at, now, trash_ttl))
            .map(|d| d.order.id.clone())
            .collect();

        let mut report = SweepReport::default();

        if !expired.is_empty() {
            self.deleted_orders.retain(|d| !expired.contains(&d.order.id));

            let before = self.tasks.len();
            self.tasks.retain(|t| match &t.order_id {
                Some(order_id) => !expired.contains(order_id),
                None => true,
            });

            report.orders_purged = expired.len();
            report.tasks_removed = before - self.tasks.len();
            self.persist_all(&[Collection::DeletedOrders, Collection::Tasks])?;
        }

        let before = self.logs.len();
        self.logs.retain(|entry| !is_expired(entry.ts, now, log_ttl));
        report.logs_purged = before - self.logs.len();
        if report.logs_purged > 0 {
            self.persist(Collection::Logs)?;
        }

        if report != SweepReport::default() {
            tracing::info!(
                orders_purged = report.orders_purged,
                tasks_removed = report.tasks_removed,
                logs_purged = report.logs_purged,
                "expired records swept"
            );
        }

        Ok(report)
    }
}
