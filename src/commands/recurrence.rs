use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ProductionError, Result};
use crate::models::{
    GuideLine, MinuteOfDay, NewOrderLine, Order, OrderDraft, Outlet, QuickOrderRule,
};
use crate::production::Production;

/// Day of week with 0 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Parses a comma-separated `HH:MM` list, skipping blank entries.
pub fn parse_times(times: &str) -> Result<Vec<MinuteOfDay>> {
    times
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse::<MinuteOfDay>)
        .collect()
}

/// Weekday sets hold 0 (Sunday) through 6 only.
fn check_weekdays(days: &BTreeSet<u8>) -> Result<()> {
    match days.iter().find(|d| **d > 6) {
        Some(day) => Err(ProductionError::InvalidWeekday(*day)),
        None => Ok(()),
    }
}

fn days_between(start: NaiveDate, until: NaiveDate) -> Result<impl Iterator<Item = NaiveDate>> {
    if until < start {
        return Err(ProductionError::InvalidRange);
    }
    Ok(start.iter_days().take_while(move |d| *d <= until))
}

impl GuideLine {
    /// Non-recurring lines apply every day. Recurring lines apply on their
    /// listed weekdays, or every day when none are listed.
    pub fn applies_on(&self, weekday: u8) -> bool {
        !self.recurring || self.days.is_empty() || self.days.contains(&weekday)
    }

    fn due_times(&self) -> Result<Vec<MinuteOfDay>> {
        check_weekdays(&self.days)?;
        parse_times(&self.times)
    }

    fn order_line(&self) -> NewOrderLine {
        NewOrderLine {
            item: self.item.clone(),
            qty: self.default_qty,
            unit: self.unit.clone(),
            finished_item_id: self.finished_item_id.clone(),
            recipe_id: self.recipe_id.clone(),
        }
    }
}

/// One order per qualifying day in `[start, end]` at the rule's time.
pub fn expand_quick_order(rule: &QuickOrderRule) -> Result<Vec<OrderDraft>> {
    check_weekdays(&rule.weekdays)?;
    let drafts = days_between(rule.start, rule.end)?
        .filter(|d| rule.weekdays.is_empty() || rule.weekdays.contains(&weekday_index(*d)))
        .map(|date| OrderDraft {
            outlet_id: rule.outlet_id.clone(),
            due: rule.time.on(date),
            lines: rule.lines.clone(),
            notes: rule.notes.clone(),
        })
        .collect();
    Ok(drafts)
}

/// Expands an outlet's guide over `[start, until]`.
///
/// Matching lines are bucketed by date and time first, so every guide item
/// due at the same moment lands in a single multi-line order.
pub fn expand_outlet_guide(
    outlet: &Outlet,
    start: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<OrderDraft>> {
    let guide: Vec<(&GuideLine, Vec<MinuteOfDay>)> = outlet
        .guide
        .iter()
        .map(|line| line.due_times().map(|times| (line, times)))
        .collect::<Result<_>>()?;

    let mut buckets: BTreeMap<(NaiveDate, MinuteOfDay), Vec<NewOrderLine>> = BTreeMap::new();

    for date in days_between(start, until)? {
        let weekday = weekday_index(date);
        for (line, times) in &guide {
            if !line.applies_on(weekday) {
                continue;
            }
            for time in times {
                buckets
                    .entry((date, *time))
                    .or_default()
                    .push(line.order_line());
            }
        }
    }

    let notes = format!("{} order guide", outlet.name);
    Ok(buckets
        .into_iter()
        .map(|((date, time), lines)| OrderDraft {
            outlet_id: outlet.id.clone(),
            due: time.on(date),
            lines,
            notes: Some(notes.clone()),
        })
        .collect())
}

impl Production {
    fn materialize_drafts(&mut self, drafts: Vec<OrderDraft>, plan: bool) -> Result<Vec<Order>> {
        let mut orders = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let order = self.create_order(&draft.outlet_id, draft.due, draft.lines, draft.notes)?;
            if plan {
                self.plan_order(&order.id, None)?;
            }
            orders.push(order);
        }
        Ok(orders)
    }

    pub fn schedule_quick_order(&mut self, rule: &QuickOrderRule, plan: bool) -> Result<Vec<Order>> {
        self.outlet(&rule.outlet_id)?;
        let drafts = expand_quick_order(rule)?;
        let orders = self.materialize_drafts(drafts, plan)?;

        self.record(
            "recurrence",
            format!(
                "Generated {} quick orders {} to {}",
                orders.len(),
                rule.start,
                rule.end
            ),
        )?;
        Ok(orders)
    }

    pub fn schedule_outlet_guide(
        &mut self,
        outlet_id: &str,
        start: NaiveDate,
        until: NaiveDate,
        plan: bool,
    ) -> Result<Vec<Order>> {
        let drafts = expand_outlet_guide(self.outlet(outlet_id)?, start, until)?;
        let orders = self.materialize_drafts(drafts, plan)?;

        self.record(
            "recurrence",
            format!(
                "Generated {} guide orders for outlet {} from {} to {}",
                orders.len(),
                outlet_id,
                start,
                until
            ),
        )?;
        tracing::info!(outlet_id, orders = orders.len(), "outlet guide expanded");
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutletType;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn guide_line(item: &str, days: &[u8], times: &str) -> GuideLine {
        GuideLine {
            item: item.to_string(),
            default_qty: 50.0,
            unit: "pcs".to_string(),
            recurring: true,
            days: days.iter().copied().collect(),
            times: times.to_string(),
            finished_item_id: None,
            recipe_id: None,
        }
    }

    fn outlet(guide: Vec<GuideLine>) -> Outlet {
        Outlet {
            id: "lobby".to_string(),
            name: "Lobby Cafe".to_string(),
            kind: OutletType::Outlet,
            order_cutoff: "10:00".parse().unwrap(),
            open_time: None,
            close_time: None,
            guide,
        }
    }

    #[test]
    fn test_weekday_index_starts_sunday() {
        assert_eq!(weekday_index(date(1)), 0);
        assert_eq!(weekday_index(date(2)), 1);
        assert_eq!(weekday_index(date(7)), 6);
    }

    #[test]
    fn test_parse_times_skips_blanks() {
        let times = parse_times(" 06:00, ,15:30,").unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1].to_string(), "15:30");
        assert!(parse_times("06:00,noon").is_err());
    }

    #[test]
    fn test_out_of_range_hours_are_rejected() {
        assert!(matches!(
            "1093:00".parse::<MinuteOfDay>(),
            Err(ProductionError::InvalidTime(_))
        ));
        assert!(matches!(
            "24:00".parse::<MinuteOfDay>(),
            Err(ProductionError::InvalidTime(_))
        ));
        assert!(parse_times("06:00,1093:00").is_err());
        assert_eq!(parse_times("23:59").unwrap()[0].minutes(), 1439);
    }

    #[test]
    fn test_guide_expands_days_times() {
        // Sat 7th to Wed 11th: Monday and Wednesday match
        let outlet = outlet(vec![guide_line("Croissant", &[1, 3, 5], "06:00,15:00")]);
        let drafts = expand_outlet_guide(&outlet, date(7), date(11)).unwrap();

        assert_eq!(drafts.len(), 4);
        for draft in &drafts {
            assert_eq!(draft.lines.len(), 1);
            assert_eq!(draft.lines[0].qty, 50.0);
            assert_eq!(draft.lines[0].unit, "pcs");
        }
        assert_eq!(drafts[0].due, MinuteOfDay::from_hm(6, 0).unwrap().on(date(9)));
        assert_eq!(drafts[3].due, MinuteOfDay::from_hm(15, 0).unwrap().on(date(11)));
    }

    #[test]
    fn test_same_time_lines_share_one_order() {
        let outlet = outlet(vec![
            guide_line("Croissant", &[1], "06:00"),
            guide_line("Muffin", &[1], "06:00,12:00"),
            GuideLine {
                recurring: false,
                ..guide_line("Baguette", &[], "06:00")
            },
        ]);
        let drafts = expand_outlet_guide(&outlet, date(9), date(10)).unwrap();

        // Monday 06:00 (3 lines), Monday 12:00, Tuesday 06:00 (baguette only)
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].lines.len(), 3);
        assert_eq!(drafts[1].lines.len(), 1);
        assert_eq!(drafts[1].lines[0].item, "Muffin");
        assert_eq!(drafts[2].lines.len(), 1);
        assert_eq!(drafts[2].lines[0].item, "Baguette");
    }

    #[test]
    fn test_quick_order_weekday_filter() {
        let rule = QuickOrderRule {
            outlet_id: "lobby".to_string(),
            lines: vec![NewOrderLine {
                item: "Scones".to_string(),
                qty: 24.0,
                unit: "pcs".to_string(),
                finished_item_id: None,
                recipe_id: None,
            }],
            start: date(1),
            end: date(14),
            weekdays: BTreeSet::from([0, 6]),
            time: "07:30".parse().unwrap(),
            notes: None,
        };

        let drafts = expand_quick_order(&rule).unwrap();
        assert_eq!(drafts.len(), 4);
        assert!(drafts
            .iter()
            .all(|d| matches!(weekday_index(d.due.date()), 0 | 6)));
    }

    #[test]
    fn test_quick_order_empty_weekdays_means_daily() {
        let rule = QuickOrderRule {
            outlet_id: "lobby".to_string(),
            lines: Vec::new(),
            start: date(1),
            end: date(3),
            weekdays: BTreeSet::new(),
            time: "07:30".parse().unwrap(),
            notes: None,
        };
        assert_eq!(expand_quick_order(&rule).unwrap().len(), 3);
    }

    #[test]
    fn test_weekdays_outside_week_are_rejected() {
        let outlet = outlet(vec![guide_line("Croissant", &[1, 7], "06:00")]);
        assert!(matches!(
            expand_outlet_guide(&outlet, date(1), date(7)),
            Err(ProductionError::InvalidWeekday(7))
        ));

        let rule = QuickOrderRule {
            outlet_id: "lobby".to_string(),
            lines: Vec::new(),
            start: date(1),
            end: date(7),
            weekdays: BTreeSet::from([9]),
            time: "07:30".parse().unwrap(),
            notes: None,
        };
        assert!(matches!(
            expand_quick_order(&rule),
            Err(ProductionError::InvalidWeekday(9))
        ));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let outlet = outlet(Vec::new());
        assert!(matches!(
            expand_outlet_guide(&outlet, date(5), date(4)),
            Err(ProductionError::InvalidRange)
        ));
    }
}
