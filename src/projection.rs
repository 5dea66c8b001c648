//! Read-only queries over a [`Heatmap`] shared by the hourly, team and
//! user-week presentations.

use std::collections::BTreeMap;

use chrono::Weekday;

use crate::heatmap::Heatmap;
use crate::models::{AgentFilter, HOURS_PER_DAY, WEEK_DAYS};

pub const MAX_INTENSITY: u8 = 9;

/// Largest hourly value for `day`, never below 1 so it can scale colours.
pub fn max_value(heatmap: &Heatmap, day: Weekday, filter: &AgentFilter) -> u32 {
    heatmap
        .hours(day)
        .iter()
        .map(|cell| cell.value(filter))
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Largest single-agent hourly value on `day`, floor 1.
pub fn max_agent_value_for_day(heatmap: &Heatmap, day: Weekday) -> u32 {
    heatmap
        .hours(day)
        .iter()
        .flat_map(|cell| cell.by_agent().values().copied())
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Largest hourly value for one agent across the whole week, floor 1.
pub fn max_value_across_week(heatmap: &Heatmap, agent_id: &str) -> u32 {
    WEEK_DAYS
        .iter()
        .flat_map(|&day| heatmap.hours(day).iter())
        .map(|cell| cell.agent_count(agent_id))
        .max()
        .unwrap_or(0)
        .max(1)
}

pub fn hour_values_for_day(
    heatmap: &Heatmap,
    day: Weekday,
    filter: &AgentFilter,
) -> [u32; HOURS_PER_DAY] {
    let hours = heatmap.hours(day);
    std::array::from_fn(|hour| hours[hour].value(filter))
}

pub fn hour_totals_for_day(heatmap: &Heatmap, day: Weekday) -> [u32; HOURS_PER_DAY] {
    hour_values_for_day(heatmap, day, &AgentFilter::All)
}

pub fn day_total(heatmap: &Heatmap, day: Weekday) -> u32 {
    heatmap.hours(day).iter().map(|cell| cell.total()).sum()
}

/// Per-agent sum over the 24 hours of `day`.
pub fn agent_totals_for_day(heatmap: &Heatmap, day: Weekday) -> BTreeMap<String, u32> {
    let mut totals: BTreeMap<String, u32> =
        heatmap.agents().iter().map(|a| (a.clone(), 0)).collect();
    for cell in heatmap.hours(day) {
        for (agent, count) in cell.by_agent() {
            *totals.entry(agent.clone()).or_insert(0) += count;
        }
    }
    totals
}

/// One agent's 24-hour sum for each day, Sunday first.
pub fn day_totals_for_agent(heatmap: &Heatmap, agent_id: &str) -> BTreeMap<u8, u32> {
    WEEK_DAYS
        .iter()
        .map(|&day| {
            let total: u32 = heatmap
                .hours(day)
                .iter()
                .map(|cell| cell.agent_count(agent_id))
                .sum();
            (day.num_days_from_sunday() as u8, total)
        })
        .collect()
}

/// One hour slot summed over all seven days for one agent, `None` when
/// `hour` is outside 0..24.
pub fn hour_totals_across_week(heatmap: &Heatmap, hour: usize, agent_id: &str) -> Option<u32> {
    WEEK_DAYS
        .iter()
        .map(|&day| heatmap.cell(day, hour).map(|cell| cell.agent_count(agent_id)))
        .sum()
}

/// Colour bucket from 0 (no activity) up to [`MAX_INTENSITY`].
pub fn intensity(value: u32, max: u32) -> u8 {
    if value == 0 {
        return 0;
    }
    let max = max.max(1) as f64;
    let scaled = ((value as f64 / max) * MAX_INTENSITY as f64).floor() as u32;
    scaled.clamp(1, MAX_INTENSITY as u32) as u8
}

/// `0` → `12 AM`, `13` → `1 PM`.
pub fn format_hour(hour: usize) -> String {
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display} {suffix}")
}
