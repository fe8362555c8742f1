use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::dashboard::{
    self, CategorySeries, ChartType, GanttRange, LabeledSeries, MemberActivity, Overview,
    RecentActivity, StatusRow, TimelineRange, WorkStatistics,
};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::visibility::OwnerScope;

const OVERDUE: &str = "c.status NOT IN ('done', 'completed') AND c.due_date < NOW()";

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Labeled(LabeledSeries),
    Category(CategorySeries),
}

pub struct DashboardService {
    pool: PgPool,
}

/// `<select> FROM cards c JOIN boards b ... WHERE <live rows in scope>`
fn scoped_cards<'a>(select: &str, scope: &OwnerScope) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(select);
    query.push(
        " FROM cards c JOIN boards b ON b.id = c.board_id WHERE c.deleted_at IS NULL AND b.deleted_at IS NULL AND ",
    );
    scope.push_predicate(&mut query, "b.owner_id");
    query
}

impl DashboardService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    async fn status_rows(&self, scope: &OwnerScope) -> Result<Vec<StatusRow>, sqlx::Error> {
        let mut query = scoped_cards("SELECT c.status, c.due_date, COUNT(*) AS count", scope);
        query.push(" GROUP BY c.status, c.due_date");
        query.build_query_as::<StatusRow>().fetch_all(&self.pool).await
    }

    pub async fn work_statistics(&self, user: &CurrentUser) -> Result<WorkStatistics, ApiError> {
        let scope = OwnerScope::for_viewer(&user.viewer());
        let rows = self.status_rows(&scope).await?;
        Ok(dashboard::tally(&rows, Utc::now()))
    }

    pub async fn active_members(&self, user: &CurrentUser) -> Result<Vec<MemberActivity>, ApiError> {
        let scope = OwnerScope::for_viewer(&user.viewer());
        let mut query = QueryBuilder::new(format!(
            r#"
            SELECT u.id AS member_id, u.name, u.email, u.avatar,
                   COUNT(DISTINCT c.id) AS total_tasks,
                   COUNT(DISTINCT c.id) FILTER (WHERE c.status = 'todo' AND NOT ({overdue})) AS todo_tasks,
                   COUNT(DISTINCT c.id) FILTER (WHERE c.status = 'inProgress' AND NOT ({overdue})) AS in_progress_tasks,
                   COUNT(DISTINCT c.id) FILTER (WHERE c.status IN ('done', 'completed')) AS done_tasks,
                   COUNT(DISTINCT c.id) FILTER (WHERE {overdue}) AS overdue_tasks
            FROM board_members bm
            JOIN boards b ON b.id = bm.board_id
            JOIN users u ON u.id = bm.member_id
            LEFT JOIN card_members cm ON cm.member_id = u.id
            LEFT JOIN cards c ON c.id = cm.card_id AND c.board_id = b.id AND c.deleted_at IS NULL
            WHERE b.deleted_at IS NULL AND u.deleted_at IS NULL AND "#,
            overdue = OVERDUE
        ));
        scope.push_predicate(&mut query, "b.owner_id");
        query.push(" GROUP BY u.id, u.name, u.email, u.avatar ORDER BY u.name ASC");

        let members = query.build_query_as::<MemberActivity>().fetch_all(&self.pool).await?;
        Ok(members)
    }

    pub async fn chart_data(
        &self,
        user: &CurrentUser,
        chart_type: &str,
        time_range: Option<&str>,
    ) -> Result<ChartData, ApiError> {
        let chart_type: ChartType = chart_type.parse().map_err(ApiError::bad_request)?;
        let scope = OwnerScope::for_viewer(&user.viewer());

        let chart = match chart_type {
            ChartType::Status => {
                let rows = self.status_rows(&scope).await?;
                ChartData::Labeled(dashboard::status_chart(&dashboard::tally(&rows, Utc::now())))
            }
            ChartType::Timeline => {
                let range = TimelineRange::parse(time_range);
                let mut query = QueryBuilder::new("SELECT to_char(c.created_at, ");
                query.push_bind(range.period_format()).push(") AS period, COUNT(*) AS count");
                query.push(
                    " FROM cards c JOIN boards b ON b.id = c.board_id WHERE c.deleted_at IS NULL AND b.deleted_at IS NULL AND ",
                );
                scope.push_predicate(&mut query, "b.owner_id");
                query
                    .push(" AND c.created_at >= NOW() - make_interval(days => ")
                    .push_bind(range.days())
                    .push(") GROUP BY period ORDER BY period ASC");
                let rows = query.build_query_as::<(String, i64)>().fetch_all(&self.pool).await?;
                ChartData::Category(dashboard::timeline_chart(rows))
            }
            ChartType::Member => {
                let mut query = QueryBuilder::new(
                    r#"
                    SELECT u.name, COUNT(DISTINCT c.id) AS count
                    FROM card_members cm
                    JOIN cards c ON c.id = cm.card_id
                    JOIN boards b ON b.id = c.board_id
                    JOIN users u ON u.id = cm.member_id
                    WHERE c.deleted_at IS NULL AND b.deleted_at IS NULL AND u.deleted_at IS NULL AND "#,
                );
                scope.push_predicate(&mut query, "b.owner_id");
                query.push(" GROUP BY u.id, u.name ORDER BY count DESC, u.name ASC LIMIT 10");
                let rows = query.build_query_as::<(String, i64)>().fetch_all(&self.pool).await?;
                ChartData::Labeled(dashboard::labeled(rows))
            }
            ChartType::Priority => {
                let mut query = scoped_cards("SELECT c.priority, COUNT(*) AS count", &scope);
                query.push(" GROUP BY c.priority");
                let rows = query
                    .build_query_as::<(Option<String>, i64)>()
                    .fetch_all(&self.pool)
                    .await?;
                ChartData::Labeled(dashboard::priority_chart(&rows))
            }
            ChartType::Department => {
                let mut query = QueryBuilder::new(
                    r#"
                    SELECT COALESCE(d.name, 'Unassigned') AS department, COUNT(DISTINCT c.id) AS count
                    FROM card_members cm
                    JOIN cards c ON c.id = cm.card_id
                    JOIN boards b ON b.id = c.board_id
                    JOIN users u ON u.id = cm.member_id
                    LEFT JOIN departments d ON d.id = u.department_id
                    WHERE c.deleted_at IS NULL AND b.deleted_at IS NULL AND "#,
                );
                scope.push_predicate(&mut query, "b.owner_id");
                query.push(" GROUP BY department ORDER BY count DESC, department ASC");
                let rows = query.build_query_as::<(String, i64)>().fetch_all(&self.pool).await?;
                ChartData::Labeled(dashboard::labeled(rows))
            }
        };
        Ok(chart)
    }

    pub async fn overview(&self, user: &CurrentUser) -> Result<Overview, ApiError> {
        let scope = OwnerScope::for_viewer(&user.viewer());

        let mut boards = QueryBuilder::new("SELECT COUNT(*) FROM boards b WHERE b.deleted_at IS NULL AND ");
        scope.push_predicate(&mut boards, "b.owner_id");

        let mut cards = scoped_cards(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE c.status IN ('done', 'completed')) AS done",
            &scope,
        );

        let mut members = QueryBuilder::new(
            r#"
            SELECT COUNT(DISTINCT bm.member_id)
            FROM board_members bm
            JOIN boards b ON b.id = bm.board_id
            WHERE b.deleted_at IS NULL AND "#,
        );
        scope.push_predicate(&mut members, "b.owner_id");

        let mut recent = QueryBuilder::new(
            r#"
            SELECT c.id, c.title, c.status, c.updated_at, u.name AS updated_by
            FROM cards c
            JOIN boards b ON b.id = c.board_id
            LEFT JOIN users u ON u.id = c.updated_by
            WHERE c.deleted_at IS NULL AND b.deleted_at IS NULL AND "#,
        );
        scope.push_predicate(&mut recent, "b.owner_id");
        recent.push(" ORDER BY c.updated_at DESC LIMIT 5");

        let ((total_boards,), (total_cards, done), (total_members,), recent_activity) = futures::try_join!(
            boards.build_query_as::<(i64,)>().fetch_one(&self.pool),
            cards.build_query_as::<(i64, i64)>().fetch_one(&self.pool),
            members.build_query_as::<(i64,)>().fetch_one(&self.pool),
            recent.build_query_as::<RecentActivity>().fetch_all(&self.pool),
        )?;

        Ok(Overview {
            total_boards,
            total_cards,
            total_members,
            completion_rate: dashboard::completion_rate(done, total_cards),
            recent_activity,
        })
    }

    /// Completed cards bucketed by the day, week or month they ended in
    pub async fn gantt_chart(&self, user: &CurrentUser, time_range: Option<&str>) -> Result<CategorySeries, ApiError> {
        let range = GanttRange::parse(time_range);
        let scope = OwnerScope::for_viewer(&user.viewer());

        let mut query = QueryBuilder::new("SELECT date_trunc(");
        query
            .push_bind(range.unit())
            .push(", c.end_date) AS period, COUNT(*) AS count");
        query.push(
            " FROM cards c JOIN boards b ON b.id = c.board_id WHERE c.deleted_at IS NULL AND b.deleted_at IS NULL AND ",
        );
        scope.push_predicate(&mut query, "b.owner_id");
        query
            .push(" AND c.status = 'done' AND c.end_date IS NOT NULL AND c.end_date >= NOW() - ")
            .push_bind(range.lookback())
            .push("::interval GROUP BY period ORDER BY period ASC");

        let rows = query
            .build_query_as::<(DateTime<Utc>, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(dashboard::gantt_chart(range, rows))
    }
}
