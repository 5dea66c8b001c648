use std::fmt::Write;

use chrono::Weekday;

use crate::heatmap::Heatmap;
use crate::models::{day_name, AgentFilter, ViewMode, DISPLAY_DAYS, HOURS_PER_DAY};
use crate::projection::{
    agent_totals_for_day, day_total, day_totals_for_agent, format_hour, hour_totals_across_week,
    hour_totals_for_day, hour_values_for_day, intensity, max_agent_value_for_day, max_value,
    max_value_across_week,
};
use crate::session::Session;

/// Short name shown for an agent: the local part of the email.
pub fn agent_label(agent_id: &str) -> &str {
    agent_id.split('@').next().unwrap_or(agent_id)
}

pub fn build_report(session: &Session, view: ViewMode, day: Weekday) -> String {
    let summary = session.summary();
    let mut output = String::new();

    let _ = writeln!(output, "# Support Team Response Heatmap");
    match session.selected_range() {
        Some(range) => {
            let _ = writeln!(
                output,
                "Week {} for {}",
                range,
                filter_label(session.agent_filter())
            );
        }
        None => {
            let _ = writeln!(output, "No responses loaded.");
        }
    }

    let _ = writeln!(output);
    let heatmap = session.heatmap();
    match (view, session.agent_filter()) {
        (ViewMode::Hourly, filter) => render_hourly(&mut output, heatmap, day, filter),
        (ViewMode::Team, _) => render_team(&mut output, heatmap, day),
        (ViewMode::User, AgentFilter::Agent(agent)) => render_user_week(&mut output, heatmap, agent),
        (ViewMode::User, AgentFilter::All) => {
            let _ = writeln!(
                output,
                "Select a specific team member to view their weekly response pattern."
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Summary");
    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => {
            let _ = writeln!(output, "- Date range: {first} to {last}");
        }
        _ => {
            let _ = writeln!(output, "- Date range: none");
        }
    }
    let _ = writeln!(output, "- Team members: {}", summary.agent_count);
    let _ = writeln!(output, "- Total responses: {}", summary.total_events);
    for file in &summary.files {
        let _ = writeln!(output, "- {}: {} responses", file.name, file.event_count);
    }

    output
}

pub fn render_hourly(output: &mut String, heatmap: &Heatmap, day: Weekday, filter: &AgentFilter) {
    let max = max_value(heatmap, day, filter);
    let values = hour_values_for_day(heatmap, day, filter);

    let _ = writeln!(output, "## {} by hour", day_name(day));
    let _ = writeln!(output);
    let _ = writeln!(output, "| Hour | Responses | Level |");
    let _ = writeln!(output, "| --- | ---: | ---: |");
    for (hour, value) in values.iter().enumerate() {
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            format_hour(hour),
            value,
            intensity(*value, max)
        );
    }
}

pub fn render_team(output: &mut String, heatmap: &Heatmap, day: Weekday) {
    let max = max_agent_value_for_day(heatmap, day);
    let totals = agent_totals_for_day(heatmap, day);

    let _ = writeln!(output, "## {} by team member (peak {})", day_name(day), max);
    let _ = writeln!(output);
    write_hour_header(output, "Team Member");

    if heatmap.agents().is_empty() {
        let _ = writeln!(output, "No team members in this window.");
        return;
    }

    for agent in heatmap.agents() {
        let _ = write!(output, "| {} |", agent_label(agent));
        for cell in heatmap.hours(day) {
            write_count(output, cell.agent_count(agent));
        }
        let _ = writeln!(output, " {} |", totals.get(agent).copied().unwrap_or(0));
    }

    let _ = write!(output, "| Hour Totals |");
    for total in hour_totals_for_day(heatmap, day) {
        let _ = write!(output, " {} |", total);
    }
    let _ = writeln!(output, " {} |", day_total(heatmap, day));
}

pub fn render_user_week(output: &mut String, heatmap: &Heatmap, agent_id: &str) {
    let max = max_value_across_week(heatmap, agent_id);
    let totals = day_totals_for_agent(heatmap, agent_id);

    let _ = writeln!(
        output,
        "## Weekly Response Pattern for {} (peak {})",
        agent_label(agent_id),
        max
    );
    let _ = writeln!(output);
    write_hour_header(output, "Day");

    for day in DISPLAY_DAYS {
        let _ = write!(output, "| {} |", day_name(day));
        for cell in heatmap.hours(day) {
            write_count(output, cell.agent_count(agent_id));
        }
        let total = totals
            .get(&(day.num_days_from_sunday() as u8))
            .copied()
            .unwrap_or(0);
        let _ = writeln!(output, " {} |", total);
    }

    let _ = write!(output, "| Hourly Totals |");
    for hour in 0..HOURS_PER_DAY {
        let total = hour_totals_across_week(heatmap, hour, agent_id).unwrap_or(0);
        let _ = write!(output, " {} |", total);
    }
    let _ = writeln!(output, " {} |", totals.values().sum::<u32>());
}

fn filter_label(filter: &AgentFilter) -> &str {
    match filter {
        AgentFilter::All => "all team members",
        AgentFilter::Agent(agent) => agent_label(agent),
    }
}

fn write_hour_header(output: &mut String, first: &str) {
    let _ = write!(output, "| {} |", first);
    for hour in 0..HOURS_PER_DAY {
        let _ = write!(output, " {} |", format_hour(hour));
    }
    let _ = writeln!(output, " Total |");
    let _ = write!(output, "| --- |");
    for _ in 0..=HOURS_PER_DAY {
        let _ = write!(output, " ---: |");
    }
    let _ = writeln!(output);
}

// Zero cells stay blank so busy hours stand out.
fn write_count(output: &mut String, value: u32) {
    if value == 0 {
        let _ = write!(output, "  |");
    } else {
        let _ = write!(output, " {} |", value);
    }
}
