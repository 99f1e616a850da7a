use crate::db::Collection;
use crate::error::Result;
use crate::models::Task;
use crate::production::Production;

impl Task {
    /// Snapshots the pre-drag schedule. Later drags before a confirm or
    /// revert keep the first snapshot.
    pub(crate) fn begin_pending(&mut self) {
        if self.pending {
            return;
        }
        self.pending = true;
        self.pending_original_date = Some(self.date);
        self.pending_original_start = Some(self.start);
        self.pending_original_end = Some(self.end);
    }

    fn clear_pending(&mut self) {
        self.pending = false;
        self.pending_original_date = None;
        self.pending_original_start = None;
        self.pending_original_end = None;
    }
}

impl Production {
    /// Accepts the task's current schedule and drops the snapshot.
    pub fn confirm_pending(&mut self, task_id: &str) -> Result<Task> {
        let task = self.task_mut(task_id)?;
        if !task.pending {
            return Ok(task.clone());
        }
        task.clear_pending();
        let task = task.clone();

        self.persist(Collection::Tasks)?;
        Ok(task)
    }

    /// Puts the task back where it was before the first uncommitted drag.
    pub fn revert_pending(&mut self, task_id: &str) -> Result<Task> {
        let task = self.task_mut(task_id)?;
        if !task.pending {
            return Ok(task.clone());
        }

        if let Some(date) = task.pending_original_date {
            task.date = date;
        }
        if let Some(start) = task.pending_original_start {
            task.start = start;
        }
        if let Some(end) = task.pending_original_end {
            task.end = end;
        }
        task.clear_pending();
        let task = task.clone();

        self.persist(Collection::Tasks)?;
        tracing::debug!(task_id, "pending schedule change reverted");
        Ok(task)
    }

    /// Uncommitted schedule changes on tasks derived from `order_id`.
    pub fn pending_for_order(&self, order_id: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.pending && t.order_id.as_deref() == Some(order_id))
            .collect()
    }

    pub fn pending_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.pending).collect()
    }
}
