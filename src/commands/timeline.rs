//! Day timeline: lane assignment for overlapping tasks and the drag contract.
//!
//! Tasks on one day are swept by start time. A new overlap group opens
//! whenever nothing seen so far is still running when the next task starts.
//! Inside a group each task takes the lowest lane whose previous occupant has
//! already ended, which uses exactly as many lanes as the group's peak
//! concurrency.

use chrono::NaiveDate;

use crate::db::Collection;
use crate::error::Result;
use crate::models::{MinuteOfDay, ScheduledTask, Task, TaskLayout, MINUTES_PER_DAY};
use crate::production::Production;

pub const SNAP_MINUTES: i32 = 15;
pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_LANE_BIAS: i8 = 9;

const LAST_MINUTE: i32 = MINUTES_PER_DAY as i32 - 1;

/// Rounds a minute delta to the nearest snap step.
pub fn snap(delta: i32) -> i32 {
    (delta + delta.signum() * (SNAP_MINUTES / 2)) / SNAP_MINUTES * SNAP_MINUTES
}

/// Largest whole number of snap steps that fits in `room` minutes.
fn snap_floor(room: i32) -> i32 {
    room.max(0) / SNAP_MINUTES * SNAP_MINUTES
}

/// Lays out one day's tasks. The result is index-aligned with `tasks`.
///
/// Ordering is by start, then end, then input position, so the same set of
/// tasks always gets the same lanes.
pub fn layout_day(tasks: &[&Task]) -> Vec<TaskLayout> {
    let mut sweep: Vec<usize> = (0..tasks.len()).collect();
    sweep.sort_by_key(|&i| (tasks[i].start, tasks[i].end, i));

    let mut placed: Vec<(usize, usize, usize)> = Vec::with_capacity(tasks.len());
    let mut lanes_per_group: Vec<usize> = Vec::new();
    let mut lane_ends: Vec<MinuteOfDay> = Vec::new();
    let mut group_end: Option<MinuteOfDay> = None;

    for &i in &sweep {
        let task = tasks[i];

        if let Some(end) = group_end {
            if task.start >= end {
                lanes_per_group.push(lane_ends.len());
                lane_ends.clear();
                group_end = None;
            }
        }

        let lane = match lane_ends.iter().position(|&end| end <= task.start) {
            Some(lane) => {
                lane_ends[lane] = task.end;
                lane
            }
            None => {
                lane_ends.push(task.end);
                lane_ends.len() - 1
            }
        };

        group_end = Some(group_end.map_or(task.end, |end| end.max(task.end)));
        placed.push((i, lanes_per_group.len(), lane));
    }
    if !lane_ends.is_empty() {
        lanes_per_group.push(lane_ends.len());
    }

    let mut layouts = vec![
        TaskLayout {
            group: 0,
            lane: 0,
            lanes_total: 1,
            offset: 0.0,
            width: 1.0,
        };
        tasks.len()
    ];

    for (i, group, lane) in placed {
        let lanes_total = lanes_per_group[group];
        let biased = (lane as i64 + i64::from(tasks[i].lane_bias)).clamp(0, lanes_total as i64 - 1);
        layouts[i] = TaskLayout {
            group,
            lane,
            lanes_total,
            offset: biased as f64 / lanes_total as f64,
            width: 1.0 / lanes_total as f64,
        };
    }

    layouts
}

/// Whole lane steps for a horizontal drag of `dx` across lanes of `lane_width`.
pub fn lane_steps(dx: f64, lane_width: f64, ratio: f64) -> i8 {
    if lane_width.is_nan() || lane_width <= 0.0 || !dx.is_finite() {
        return 0;
    }
    let threshold = lane_width * ratio;
    if dx.abs() < threshold {
        return 0;
    }
    let steps = 1.0 + ((dx.abs() - threshold) / lane_width).floor();
    let steps = steps.min(f64::from(2 * MAX_LANE_BIAS)) as i8;
    if dx < 0.0 {
        -steps
    } else {
        steps
    }
}

impl Production {
    /// The day's tasks with their computed lanes, in insertion order.
    pub fn day_schedule(&self, date: NaiveDate) -> Vec<ScheduledTask> {
        let tasks = self.tasks_for_day(date);
        let layouts = layout_day(&tasks);
        tasks
            .into_iter()
            .zip(layouts)
            .map(|(task, layout)| ScheduledTask {
                task: task.clone(),
                layout,
            })
            .collect()
    }

    /// Moves a task by `delta_minutes`, snapped, keeping its duration and
    /// staying inside the day. At the day's edges the move stops at the
    /// last whole snap step that still fits.
    pub fn drag_task_body(&mut self, task_id: &str, delta_minutes: i32) -> Result<Task> {
        let task = self.task_mut(task_id)?;
        let start = i32::from(task.start.minutes());
        let end = i32::from(task.end.minutes());

        let delta = snap(delta_minutes).clamp(-snap_floor(start), snap_floor(LAST_MINUTE - end));
        if delta == 0 {
            return Ok(task.clone());
        }

        task.begin_pending();
        task.start = MinuteOfDay::saturating(start + delta);
        task.end = MinuteOfDay::saturating(end + delta);
        let task = task.clone();

        self.persist(Collection::Tasks)?;
        Ok(task)
    }

    /// Stretches or shrinks a task's end by `delta_minutes`, snapped, never
    /// below the minimum duration or past the end of the day.
    pub fn drag_task_end(&mut self, task_id: &str, delta_minutes: i32) -> Result<Task> {
        let task = self.task_mut(task_id)?;
        let start = i32::from(task.start.minutes());
        let end = i32::from(task.end.minutes());

        let delta = snap(delta_minutes).clamp(
            -snap_floor(end - start - MIN_DURATION_MINUTES),
            snap_floor(LAST_MINUTE - end),
        );
        if delta == 0 {
            return Ok(task.clone());
        }

        task.begin_pending();
        task.end = MinuteOfDay::saturating(end + delta);
        let task = task.clone();

        self.persist(Collection::Tasks)?;
        Ok(task)
    }

    pub fn move_task_to_date(&mut self, task_id: &str, date: NaiveDate) -> Result<Task> {
        let task = self.task_mut(task_id)?;
        if task.date == date {
            return Ok(task.clone());
        }

        task.begin_pending();
        task.date = date;
        let task = task.clone();

        self.persist(Collection::Tasks)?;
        Ok(task)
    }

    /// Shifts a task's rendered lane after a horizontal drag. Pending state
    /// is not touched.
    pub fn nudge_lane(&mut self, task_id: &str, dx: f64, lane_width: f64) -> Result<Task> {
        let steps = lane_steps(dx, lane_width, self.config().lane_nudge_ratio);
        let task = self.task_mut(task_id)?;
        if steps == 0 {
            return Ok(task.clone());
        }

        task.lane_bias = (i16::from(task.lane_bias) + i16::from(steps))
            .clamp(-i16::from(MAX_LANE_BIAS), i16::from(MAX_LANE_BIAS)) as i8;
        let task = task.clone();

        self.persist(Collection::Tasks)?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskCategory;

    fn task(id: &str, start: &str, end: &str) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
            outlet_id: None,
            order_id: None,
            role_id: None,
            staff_id: None,
            recipe_id: None,
            qty: None,
            unit: None,
            category: TaskCategory::Production,
            color: "#64748b".to_string(),
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

    fn overlaps(a: &Task, b: &Task) -> bool {
        a.start < b.end && b.start < a.end
    }

    /// Peak number of tasks running at once among `members`.
    fn peak(members: &[&Task]) -> usize {
        members
            .iter()
            .map(|t| members.iter().filter(|o| o.start <= t.start && t.start < o.end).count())
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_snap_rounds_to_quarter_hour() {
        assert_eq!(snap(0), 0);
        assert_eq!(snap(7), 0);
        assert_eq!(snap(8), 15);
        assert_eq!(snap(22), 15);
        assert_eq!(snap(23), 30);
        assert_eq!(snap(-8), -15);
        assert_eq!(snap(60), 60);
    }

    #[test]
    fn test_disjoint_tasks_get_own_groups() {
        let a = task("a", "06:00", "07:00");
        let b = task("b", "07:00", "08:00");
        let refs = vec![&a, &b];
        let layout = layout_day(&refs);

        assert_eq!(layout[0].group, 0);
        assert_eq!(layout[1].group, 1);
        assert_eq!(layout[0].lanes_total, 1);
        assert_eq!(layout[1].lanes_total, 1);
        assert_eq!(layout[1].offset, 0.0);
    }

    #[test]
    fn test_chain_reuses_freed_lane() {
        // a overlaps b, b overlaps c, a ends before c starts
        let a = task("a", "06:00", "08:00");
        let b = task("b", "07:00", "10:00");
        let c = task("c", "08:00", "09:00");
        let refs = vec![&a, &b, &c];
        let layout = layout_day(&refs);

        assert!(layout.iter().all(|l| l.group == 0));
        assert_eq!(layout[0].lane, 0);
        assert_eq!(layout[1].lane, 1);
        assert_eq!(layout[2].lane, 0);
        assert!(layout.iter().all(|l| l.lanes_total == 2));
        assert_eq!(layout[1].offset, 0.5);
        assert_eq!(layout[1].width, 0.5);
    }

    #[test]
    fn test_no_collision_and_minimal_lanes() {
        let tasks = vec![
            task("a", "05:00", "09:00"),
            task("b", "06:00", "07:00"),
            task("c", "06:30", "08:00"),
            task("d", "07:00", "07:30"),
            task("e", "08:00", "10:00"),
            task("f", "11:00", "12:00"),
            task("g", "11:15", "11:45"),
            task("h", "06:00", "07:00"),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let layout = layout_day(&refs);

        for i in 0..tasks.len() {
            for j in (i + 1)..tasks.len() {
                if overlaps(&tasks[i], &tasks[j]) {
                    assert_eq!(layout[i].group, layout[j].group);
                    assert_ne!(layout[i].lane, layout[j].lane, "{} and {}", tasks[i].id, tasks[j].id);
                }
            }
        }

        let groups: std::collections::BTreeSet<usize> = layout.iter().map(|l| l.group).collect();
        for group in groups {
            let members: Vec<&Task> = tasks
                .iter()
                .zip(&layout)
                .filter(|(_, l)| l.group == group)
                .map(|(t, _)| t)
                .collect();
            let total = layout.iter().find(|l| l.group == group).unwrap().lanes_total;
            assert_eq!(total, peak(&members));
        }
    }

    #[test]
    fn test_layout_ignores_input_order_for_distinct_intervals() {
        let a = task("a", "06:00", "08:00");
        let b = task("b", "06:30", "07:00");
        let c = task("c", "07:30", "09:00");

        let forward = layout_day(&[&a, &b, &c]);
        let backward = layout_day(&[&c, &b, &a]);

        assert_eq!(forward[0], backward[2]);
        assert_eq!(forward[1], backward[1]);
        assert_eq!(forward[2], backward[0]);
    }

    #[test]
    fn test_identical_intervals_tie_break_on_input_position() {
        let mut a = task("a", "06:00", "08:00");
        a.lane_bias = 1;
        let b = task("b", "06:00", "08:00");

        let forward = layout_day(&[&a, &b]);
        let backward = layout_day(&[&b, &a]);

        // Same input, same layout
        assert_eq!(forward, layout_day(&[&a, &b]));

        // Only the lane order follows input position
        assert_eq!((forward[0].lane, forward[1].lane), (0, 1));
        assert_eq!((backward[0].lane, backward[1].lane), (0, 1));
        for layout in forward.iter().chain(&backward) {
            assert_eq!(layout.group, 0);
            assert_eq!(layout.lanes_total, 2);
            assert_eq!(layout.width, 0.5);
        }

        // a's bias pushes it right in both orders, clamped into the group
        assert_eq!(forward[0].offset, 0.5);
        assert_eq!(backward[1].offset, 0.5);
        assert_eq!(forward[1].offset, 0.5);
        assert_eq!(backward[0].offset, 0.0);
    }

    #[test]
    fn test_lane_bias_is_clamped_into_group() {
        let a = task("a", "06:00", "08:00");
        let mut b = task("b", "06:00", "08:00");
        b.lane_bias = 9;
        let mut c = task("c", "06:30", "07:00");
        c.lane_bias = -9;

        let layout = layout_day(&[&a, &b, &c]);
        assert_eq!(layout[1].lanes_total, 3);
        assert_eq!(layout[1].lane, 1);
        assert!((layout[1].offset - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(layout[2].offset, 0.0);
    }

    #[test]
    fn test_lane_steps_threshold() {
        assert_eq!(lane_steps(40.0, 100.0, 0.5), 0);
        assert_eq!(lane_steps(50.0, 100.0, 0.5), 1);
        assert_eq!(lane_steps(149.0, 100.0, 0.5), 1);
        assert_eq!(lane_steps(150.0, 100.0, 0.5), 2);
        assert_eq!(lane_steps(-260.0, 100.0, 0.5), -3);
        assert_eq!(lane_steps(500.0, 0.0, 0.5), 0);
    }

    #[test]
    fn test_empty_day() {
        assert!(layout_day(&[]).is_empty());
    }
}
