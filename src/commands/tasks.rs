use chrono::NaiveDate;

use crate::commands::planner::UNASSIGNED_COLOR;
use crate::db::Collection;
use crate::error::{ProductionError, Result};
use crate::models::{MinuteOfDay, NewTask, Task};
use crate::production::Production;

fn check_interval(start: MinuteOfDay, end: MinuteOfDay) -> Result<()> {
    if start < end {
        Ok(())
    } else {
        Err(ProductionError::InvalidInterval)
    }
}

impl Production {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ProductionError::not_found("task", id))
    }

    /// Tasks on `date` in insertion order.
    pub fn tasks_for_day(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.date == date).collect()
    }

    pub fn create_task(&mut self, task: NewTask) -> Result<Task> {
        check_interval(task.start, task.end)?;
        if let Some(order_id) = &task.order_id {
            self.require_order_exists(order_id)?;
        }

        let task = Task {
            id: Self::new_id(),
            title: task.title,
            date: task.date,
            start: task.start,
            end: task.end,
            outlet_id: task.outlet_id,
            order_id: task.order_id,
            role_id: task.role_id,
            staff_id: task.staff_id,
            recipe_id: task.recipe_id,
            qty: task.qty,
            unit: task.unit,
            category: task.category,
            color: task.color.unwrap_or_else(|| UNASSIGNED_COLOR.to_string()),
            done: false,
            inv_accounted: false,
            pull_from_finished: task.pull_from_finished,
            use_raw: task.use_raw,
            lane_bias: 0,
            pending: false,
            pending_original_date: None,
            pending_original_start: None,
            pending_original_end: None,
        };

        self.tasks.push(task.clone());
        self.persist(Collection::Tasks)?;
        Ok(task)
    }

    /// Replaces a task's editable fields. Completion and inventory state
    /// are kept; use `set_done` to change them.
    pub fn update_task(&mut self, task: Task) -> Result<Task> {
        check_interval(task.start, task.end)?;
        if let Some(order_id) = &task.order_id {
            self.require_order_exists(order_id)?;
        }

        let slot = self.task_mut(&task.id)?;
        let done = slot.done;
        let inv_accounted = slot.inv_accounted;
        *slot = Task {
            done,
            inv_accounted,
            lane_bias: task.lane_bias.clamp(-9, 9),
            ..task
        };
        let task = slot.clone();

        self.persist(Collection::Tasks)?;
        Ok(task)
    }

    /// Removes a task without touching inventory.
    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ProductionError::not_found("task", id))?;
        self.tasks.remove(index);
        self.persist(Collection::Tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_must_be_forward() {
        let six = MinuteOfDay::from_hm(6, 0).unwrap();
        let eight = MinuteOfDay::from_hm(8, 0).unwrap();
        assert!(check_interval(six, eight).is_ok());
        assert!(check_interval(eight, six).is_err());
        assert!(check_interval(six, six).is_err());
    }
}
