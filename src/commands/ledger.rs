use crate::db::Collection;
use crate::error::Result;
use crate::models::Task;
use crate::production::Production;

/// Direction of an inventory effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Apply,
    Reverse,
}

impl Effect {
    fn sign(self) -> f64 {
        match self {
            Effect::Apply => 1.0,
            Effect::Reverse => -1.0,
        }
    }
}

/// Adds `delta` to a stock level, clamping at zero. Returns true if the
/// clamp swallowed part of the change.
fn shift_stock(on_hand: &mut f64, delta: f64) -> bool {
    let next = *on_hand + delta;
    if next < 0.0 {
        *on_hand = 0.0;
        true
    } else {
        *on_hand = next;
        false
    }
}

impl Production {
    /// Sets a task's done flag. This is the only path that moves stock.
    ///
    /// Marking done consumes the task's pulls and raw draws and credits a
    /// produced recipe; marking not-done reverses exactly that. Setting the
    /// flag to its current value changes nothing.
    pub fn set_done(&mut self, task_id: &str, done: bool) -> Result<Task> {
        let task = self.task_mut(task_id)?;
        if task.done == done {
            return Ok(task.clone());
        }
        task.done = done;

        let effect = match (done, task.inv_accounted) {
            (true, false) => Some(Effect::Apply),
            (false, true) => Some(Effect::Reverse),
            _ => None,
        };
        if let Some(effect) = effect {
            task.inv_accounted = effect == Effect::Apply;
        }
        let task = task.clone();

        if let Some(effect) = effect {
            self.account_inventory(&task, effect);
            self.persist_all(&[
                Collection::Tasks,
                Collection::FinishedItems,
                Collection::RawItems,
            ])?;
            tracing::debug!(task_id, ?effect, "inventory effects applied");
        } else {
            self.persist(Collection::Tasks)?;
        }

        Ok(task)
    }

    pub fn toggle_done(&mut self, task_id: &str) -> Result<Task> {
        let done = !self.task_mut(task_id)?.done;
        self.set_done(task_id, done)
    }

    fn account_inventory(&mut self, task: &Task, effect: Effect) {
        let sign = effect.sign();

        for draw in &task.pull_from_finished {
            if let Some(item) = self
                .finished_items
                .iter_mut()
                .find(|f| f.id == draw.finished_item_id)
            {
                if shift_stock(&mut item.on_hand, -sign * draw.qty) {
                    tracing::warn!(finished_item_id = %item.id, task_id = %task.id, "finished stock clamped at zero");
                }
            }
        }

        for draw in &task.use_raw {
            if let Some(item) = self.raw_items.iter_mut().find(|r| r.id == draw.raw_item_id) {
                if shift_stock(&mut item.on_hand, -sign * draw.qty) {
                    tracing::warn!(raw_item_id = %item.id, task_id = %task.id, "raw stock clamped at zero");
                }
            }
        }

        if let (Some(recipe_id), Some(qty)) = (&task.recipe_id, task.qty) {
            if let Some(item) = self
                .finished_items
                .iter_mut()
                .find(|f| f.recipe_id.as_deref() == Some(recipe_id.as_str()))
            {
                if shift_stock(&mut item.on_hand, sign * qty) {
                    tracing::warn!(finished_item_id = %item.id, task_id = %task.id, "produced stock clamped at zero");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_stock_clamps() {
        let mut on_hand = 5.0;
        assert!(!shift_stock(&mut on_hand, -3.0));
        assert_eq!(on_hand, 2.0);
        assert!(shift_stock(&mut on_hand, -3.0));
        assert_eq!(on_hand, 0.0);
        assert!(!shift_stock(&mut on_hand, 7.5));
        assert_eq!(on_hand, 7.5);
    }

    #[test]
    fn test_effect_sign() {
        assert_eq!(Effect::Apply.sign(), 1.0);
        assert_eq!(Effect::Reverse.sign(), -1.0);
    }
}
