use chrono::{NaiveDate, Weekday};

use support_response_heatmap::heatmap::build_heatmap;
use support_response_heatmap::models::{HOURS_PER_DAY, WEEK_DAYS};
use support_response_heatmap::{AgentFilter, Session, SourceFile, WeekRange};

const MARCH: &str = "created_at_est,user_email,subject\n\
    2024-03-10T08:00:00,a@x.com,Welcome\n\
    2024-03-11T09:15:00,a@x.com,Refund\n\
    2024-03-11T09:45:00,a@x.com,Refund\n\
    2024-03-11T09:05:00,b@x.com,Login\n\
    2024-03-12T23:50:00,,Customer reply\n\
    2024-03-14T16:20:00,b@x.com,Billing\n";

const APRIL: &str = "created_at_est;user_email\n\
    2024-04-01 10:00:00;c@x.com\n\
    2024-04-02 11:30:00;a@x.com\n\
    not a date;a@x.com\n";

fn d(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

fn whole_span() -> WeekRange {
    WeekRange::new(d("2024-01-01"), d("2024-12-31")).unwrap()
}

async fn loaded() -> Session {
    let mut session = Session::new();
    let outcome = session
        .submit_files(vec![
            SourceFile::new("march.csv", MARCH),
            SourceFile::new("april.csv", APRIL),
        ])
        .await;
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    session
}

#[tokio::test]
async fn heatmap_total_matches_filtered_event_count() {
    let mut session = loaded().await;
    session.select_range(whole_span()).unwrap();

    for filter in [
        AgentFilter::All,
        AgentFilter::Agent("a@x.com".to_string()),
        AgentFilter::Agent("c@x.com".to_string()),
    ] {
        session.select_agent(filter.clone());
        let expected = session
            .store()
            .snapshot()
            .events
            .iter()
            .filter(|e| filter.matches(e.agent_id()))
            .count() as u64;
        assert_eq!(session.heatmap().total(), expected, "{filter}");
    }
}

#[tokio::test]
async fn every_cell_total_is_sum_of_agents() {
    let mut session = loaded().await;
    session.select_range(whole_span()).unwrap();
    let heatmap = session.heatmap();
    for day in WEEK_DAYS {
        for cell in heatmap.hours(day) {
            assert_eq!(cell.total(), cell.by_agent().values().sum::<u32>());
        }
    }
}

#[tokio::test]
async fn reupload_is_idempotent() {
    let mut session = loaded().await;
    let before = session.store().snapshot().events.to_vec();
    let files_before = session.files().len();

    session
        .submit_files(vec![SourceFile::new("march.csv", MARCH)])
        .await;

    let mut after = session.store().snapshot().events.to_vec();
    let mut expected = before;
    let key = |e: &support_response_heatmap::ResponseEvent| {
        (e.source_file().to_string(), e.timestamp(), e.agent_id().to_string())
    };
    after.sort_by_key(key);
    expected.sort_by_key(key);
    assert_eq!(after, expected);
    assert_eq!(session.files().len(), files_before);
}

#[tokio::test]
async fn removing_a_file_subtracts_its_count() {
    let mut session = loaded().await;
    session.select_range(whole_span()).unwrap();
    let total_before = session.heatmap().total();
    let march_count = session
        .files()
        .iter()
        .find(|f| f.name == "march.csv")
        .unwrap()
        .event_count;

    session.remove_file("march.csv").unwrap();
    session.select_range(whole_span()).unwrap();

    assert_eq!(
        session.heatmap().total(),
        total_before - march_count as u64
    );
    assert!(session
        .store()
        .snapshot()
        .events
        .iter()
        .all(|e| e.source_file() != "march.csv"));
}

#[tokio::test]
async fn weeks_are_truncated_to_data() {
    let session = loaded().await;
    let weeks = session.available_weeks();
    assert_eq!(
        weeks.first(),
        Some(&WeekRange {
            start: d("2024-03-10"),
            end: d("2024-03-14")
        })
    );
    assert_eq!(
        weeks.last(),
        Some(&WeekRange {
            start: d("2024-03-31"),
            end: d("2024-04-02")
        })
    );
    assert_eq!(session.selected_range(), weeks.last().copied());
}

#[tokio::test]
async fn all_filter_equals_sum_of_agent_filters() {
    let session = loaded().await;
    let events = session.store().snapshot().events;
    let range = whole_span();
    let all = build_heatmap(events, Some(&range), &AgentFilter::All);
    let per_agent: Vec<_> = session
        .agents()
        .iter()
        .map(|a| build_heatmap(events, Some(&range), &AgentFilter::Agent(a.clone())))
        .collect();

    for day in WEEK_DAYS {
        for hour in 0..HOURS_PER_DAY {
            let sum: u32 = per_agent.iter().map(|h| h.cell(day, hour).unwrap().total()).sum();
            assert_eq!(all.cell(day, hour).unwrap().total(), sum);
        }
    }
}

#[tokio::test]
async fn documented_monday_scenario() {
    let csv = "created_at_est,user_email\n\
        2024-03-11T09:15:00,a@x.com\n\
        2024-03-11T09:45:00,a@x.com\n\
        2024-03-11T09:05:00,b@x.com\n\
        2024-03-12T23:50:00,null\n";
    let mut session = Session::new();
    let outcome = session
        .submit_files(vec![SourceFile::new("scenario.csv", csv)])
        .await;

    assert_eq!(outcome.file_results[0].event_count, 3);
    let cell = session.heatmap().cell(Weekday::Mon, 9).unwrap();
    assert_eq!(cell.total(), 3);
    assert_eq!(cell.by_agent().get("a@x.com"), Some(&2));
    assert_eq!(cell.by_agent().get("b@x.com"), Some(&1));
}

#[tokio::test]
async fn file_without_valid_rows_still_recorded() {
    let mut session = Session::new();
    let outcome = session
        .submit_files(vec![SourceFile::new(
            "quiet.csv",
            "created_at_est,user_email\n2024-03-11T09:15:00,\n",
        )])
        .await;
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.file_results[0].event_count, 0);
    assert!(session.available_weeks().is_empty());
    assert_eq!(session.heatmap().total(), 0);
}
