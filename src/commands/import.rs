use crate::error::Result;
use crate::models::{CommissaryOrder, Order, Task};
use crate::production::Production;

impl Production {
    /// Entry point for orders originating outside the kitchen. Creates the
    /// order and auto-plans it exactly as a manually entered order.
    pub fn import_commissary_order(&mut self, payload: CommissaryOrder) -> Result<(Order, Vec<Task>)> {
        let order = self.create_order(
            &payload.outlet_id,
            payload.due_timestamp,
            payload.lines,
            payload.notes,
        )?;
        let tasks = self.plan_order(&order.id, None)?;

        self.record(
            "import",
            format!(
                "Imported commissary order {} for outlet {} ({} tasks)",
                order.id,
                order.outlet_id,
                tasks.len()
            ),
        )?;
        tracing::info!(order_id = %order.id, tasks = tasks.len(), "commissary order imported");

        Ok((order, tasks))
    }

    pub fn import_commissary_json(&mut self, body: &str) -> Result<(Order, Vec<Task>)> {
        let payload: CommissaryOrder = serde_json::from_str(body)?;
        self.import_commissary_order(payload)
    }
}
