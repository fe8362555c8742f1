//! Dashboard aggregates and chart shaping.
//!
//! SQL does the grouping; the functions here turn grouped rows into the
//! response shapes the charts consume.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::card_status;

/// Cards grouped by (status, due date)
#[derive(Debug, Clone, FromRow)]
pub struct StatusRow {
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkStatistics {
    pub todo: i64,
    pub in_progress: i64,
    pub done: i64,
    pub overdue: i64,
    pub total: i64,
}

pub fn is_overdue(status: &str, due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    !card_status::is_complete(status) && due_date.is_some_and(|due| due < now)
}

/// Overdue cards count only as overdue; unknown statuses only count in the total.
pub fn tally(rows: &[StatusRow], now: DateTime<Utc>) -> WorkStatistics {
    let mut stats = WorkStatistics::default();
    for row in rows {
        if is_overdue(&row.status, row.due_date, now) {
            stats.overdue += row.count;
        } else if card_status::is_complete(&row.status) {
            stats.done += row.count;
        } else if row.status == card_status::TODO {
            stats.todo += row.count;
        } else if row.status == card_status::IN_PROGRESS {
            stats.in_progress += row.count;
        }
        stats.total += row.count;
    }
    stats
}

/// Rounded percentage of done cards; 0 when there are none
pub fn completion_rate(done: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Status,
    Timeline,
    Member,
    Priority,
    Department,
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(ChartType::Status),
            "timeline" => Ok(ChartType::Timeline),
            "member" => Ok(ChartType::Member),
            "priority" => Ok(ChartType::Priority),
            "department" => Ok(ChartType::Department),
            other => Err(format!("Invalid chart type '{}'", other)),
        }
    }
}

/// Window of the timeline chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineRange {
    Week,
    Month,
    Quarter,
}

impl TimelineRange {
    /// Unknown values fall back to a month
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("week") => TimelineRange::Week,
            Some("quarter") => TimelineRange::Quarter,
            _ => TimelineRange::Month,
        }
    }

    pub fn days(&self) -> i32 {
        match self {
            TimelineRange::Week => 7,
            TimelineRange::Month => 30,
            TimelineRange::Quarter => 90,
        }
    }

    /// `to_char` pattern of the bucket
    pub fn period_format(&self) -> &'static str {
        match self {
            TimelineRange::Week => "IYYY-IW",
            TimelineRange::Month | TimelineRange::Quarter => "YYYY-MM",
        }
    }
}

/// Bucket size of the gantt chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GanttRange {
    Day,
    Week,
    Month,
}

impl GanttRange {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("day") => GanttRange::Day,
            Some("week") => GanttRange::Week,
            _ => GanttRange::Month,
        }
    }

    /// `date_trunc` unit
    pub fn unit(&self) -> &'static str {
        match self {
            GanttRange::Day => "day",
            GanttRange::Week => "week",
            GanttRange::Month => "month",
        }
    }

    /// How far back the chart looks, as a Postgres interval
    pub fn lookback(&self) -> &'static str {
        match self {
            GanttRange::Day => "7 days",
            GanttRange::Week => "8 weeks",
            GanttRange::Month => "12 months",
        }
    }

    pub fn label(&self, period: DateTime<Utc>) -> String {
        match self {
            GanttRange::Day => period.format("%b %-d").to_string(),
            GanttRange::Week => format!("Week of {}", period.format("%b %-d")),
            GanttRange::Month => period.format("%b %Y").to_string(),
        }
    }
}

/// Pie/donut style data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSeries {
    pub series: Vec<i64>,
    pub labels: Vec<String>,
}

pub fn status_chart(stats: &WorkStatistics) -> LabeledSeries {
    LabeledSeries {
        series: vec![stats.todo, stats.in_progress, stats.done, stats.overdue],
        labels: ["Todo", "In Progress", "Done", "Overdue"].map(String::from).to_vec(),
    }
}

/// `rows` are (priority, count); cards without a priority are left out
pub fn priority_chart(rows: &[(Option<String>, i64)]) -> LabeledSeries {
    let mut counts = [0i64; 3];
    for (priority, count) in rows {
        let slot = match priority.as_deref() {
            Some("low") => 0,
            Some("medium") => 1,
            Some("high") => 2,
            _ => continue,
        };
        counts[slot] += count;
    }
    LabeledSeries {
        series: counts.to_vec(),
        labels: ["Low", "Medium", "High"].map(String::from).to_vec(),
    }
}

/// (label, count) rows as a labeled series
pub fn labeled(rows: Vec<(String, i64)>) -> LabeledSeries {
    let (labels, series) = rows.into_iter().unzip();
    LabeledSeries { series, labels }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<i64>,
}

/// Bar/line style data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySeries {
    pub series: Vec<NamedSeries>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<GanttRange>,
}

pub fn timeline_chart(rows: Vec<(String, i64)>) -> CategorySeries {
    let (categories, data) = rows.into_iter().unzip();
    CategorySeries {
        series: vec![NamedSeries { name: "Tasks".to_string(), data }],
        categories,
        time_range: None,
    }
}

pub fn gantt_chart(range: GanttRange, rows: Vec<(DateTime<Utc>, i64)>) -> CategorySeries {
    let categories = rows.iter().map(|(period, _)| range.label(*period)).collect();
    let data = rows.into_iter().map(|(_, count)| count).collect();
    CategorySeries {
        series: vec![NamedSeries { name: "Completed tasks".to_string(), data }],
        categories,
        time_range: Some(range),
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberActivity {
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub done_tasks: i64,
    pub overdue_tasks: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_boards: i64,
    pub total_cards: i64,
    pub total_members: i64,
    pub completion_rate: i64,
    pub recent_activity: Vec<RecentActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn row(status: &str, due: Option<DateTime<Utc>>, count: i64) -> StatusRow {
        StatusRow { status: status.to_string(), due_date: due, count }
    }

    #[test]
    fn overdue_takes_precedence_over_status() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        let future = Some(now + Duration::days(1));
        let rows = vec![
            row("todo", past, 2),
            row("todo", future, 3),
            row("inProgress", None, 1),
            row("done", past, 4),
            row("completed", None, 1),
            row("blocked", None, 5),
        ];
        let stats = tally(&rows, now);
        assert_eq!(
            stats,
            WorkStatistics { todo: 3, in_progress: 1, done: 5, overdue: 2, total: 16 }
        );
    }

    #[test]
    fn completion_rate_rounds() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
    }

    #[test]
    fn chart_type_rejects_unknown() {
        assert_eq!("member".parse::<ChartType>(), Ok(ChartType::Member));
        assert!("pie".parse::<ChartType>().is_err());
    }

    #[test]
    fn status_and_priority_series_have_fixed_slots() {
        let stats = WorkStatistics { todo: 1, in_progress: 2, done: 3, overdue: 4, total: 10 };
        assert_eq!(status_chart(&stats).series, vec![1, 2, 3, 4]);

        let rows = vec![(Some("high".to_string()), 2), (None, 7), (Some("low".to_string()), 1)];
        let chart = priority_chart(&rows);
        assert_eq!(chart.series, vec![1, 0, 2]);
        assert_eq!(chart.labels, vec!["Low", "Medium", "High"]);
    }

    #[test]
    fn gantt_labels_follow_range() {
        let period = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(GanttRange::Day.label(period), "Mar 4");
        assert_eq!(GanttRange::Week.label(period), "Week of Mar 4");
        assert_eq!(GanttRange::Month.label(period), "Mar 2024");

        let chart = gantt_chart(GanttRange::Month, vec![(period, 5)]);
        assert_eq!(chart.categories, vec!["Mar 2024"]);
        assert_eq!(chart.series[0].data, vec![5]);
    }

    #[test]
    fn ranges_default_sensibly() {
        assert_eq!(TimelineRange::parse(Some("decade")), TimelineRange::Month);
        assert_eq!(TimelineRange::parse(Some("quarter")).days(), 90);
        assert_eq!(GanttRange::parse(None), GanttRange::Month);
        assert_eq!(GanttRange::parse(Some("week")).lookback(), "8 weeks");
    }
}
