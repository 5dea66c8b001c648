//! Day-of-week × hour-of-day bucketing.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Weekday;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::models::{day_name, AgentFilter, ResponseEvent, WeekRange, HOURS_PER_DAY, WEEK_DAYS};

/// One (day, hour) bucket. `total` always equals the sum of `by_agent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourCell {
    total: u32,
    by_agent: BTreeMap<String, u32>,
}

impl HourCell {
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn by_agent(&self) -> &BTreeMap<String, u32> {
        &self.by_agent
    }

    pub fn agent_count(&self, agent_id: &str) -> u32 {
        self.by_agent.get(agent_id).copied().unwrap_or(0)
    }

    /// `total` for [`AgentFilter::All`], otherwise that agent's count.
    pub fn value(&self, filter: &AgentFilter) -> u32 {
        match filter {
            AgentFilter::All => self.total,
            AgentFilter::Agent(agent) => self.agent_count(agent),
        }
    }
}

/// Immutable snapshot of counts for one range and agent filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    agents: Vec<String>,
    days: [[HourCell; HOURS_PER_DAY]; 7],
}

impl Heatmap {
    /// All-zero heatmap with a slot for every known agent.
    pub fn empty(agents: Vec<String>) -> Self {
        let zeroed = HourCell {
            total: 0,
            by_agent: agents.iter().map(|a| (a.clone(), 0)).collect(),
        };
        Self {
            days: std::array::from_fn(|_| std::array::from_fn(|_| zeroed.clone())),
            agents,
        }
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    pub fn hours(&self, day: Weekday) -> &[HourCell; HOURS_PER_DAY] {
        &self.days[day.num_days_from_sunday() as usize]
    }

    /// `None` when `hour` is outside 0..24.
    pub fn cell(&self, day: Weekday, hour: usize) -> Option<&HourCell> {
        self.hours(day).get(hour)
    }

    pub fn total(&self) -> u64 {
        self.days
            .iter()
            .flatten()
            .map(|cell| cell.total as u64)
            .sum()
    }

    fn bump(&mut self, event: &ResponseEvent) {
        let cell = &mut self.days[event.day_of_week() as usize][event.hour_of_day() as usize];
        cell.total += 1;
        *cell.by_agent.entry(event.agent_id().to_string()).or_insert(0) += 1;
    }
}

impl Serialize for Heatmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(WEEK_DAYS.len()))?;
        for day in WEEK_DAYS {
            map.serialize_entry(day_name(day), self.hours(day))?;
        }
        map.end()
    }
}

/// Counts the events that fall inside `range` and match `filter`. Every
/// agent present in `events` gets a slot in every cell, even when filtered
/// out. No range yields an all-zero heatmap.
pub fn build_heatmap(
    events: &[ResponseEvent],
    range: Option<&WeekRange>,
    filter: &AgentFilter,
) -> Heatmap {
    let agents: Vec<String> = events
        .iter()
        .map(|e| e.agent_id())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut heatmap = Heatmap::empty(agents);

    let Some(range) = range else {
        return heatmap;
    };

    for event in events
        .iter()
        .filter(|e| range.contains(e.calendar_date()) && filter.matches(e.agent_id()))
    {
        heatmap.bump(event);
    }

    heatmap
}
