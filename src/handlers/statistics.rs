use axum::{extract::State, Extension};
use chrono::NaiveDate;

use crate::api::{ApiResponse, Params};
use crate::auth::middleware::AuthUser;
use crate::dates::{days_before, today};
use crate::dto::{
    HabitProgress, LogSummary, StatisticsQuery, StatisticsResponse, StatusDistribution,
    StatusShare, TaskStats,
};
use crate::error::AppResult;
use crate::AppState;

const PROGRESS_LIMIT: usize = 20;

/// Normalized period name and the first day it covers. Unknown periods fall
/// back to `month`.
pub fn period_range(period: Option<&str>, today: NaiveDate) -> (&'static str, NaiveDate) {
    match period.map(str::trim) {
        Some("week") => ("week", days_before(today, 7)),
        Some("year") => ("year", days_before(today, 365)),
        Some("all") => (
            "all",
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(today),
        ),
        _ => ("month", days_before(today, 30)),
    }
}

/// Rounded percentage, 0 when `total` is 0.
pub fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (part as f64 * 100.0 / total as f64).round() as i64
}

#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
struct LogCounts {
    completed: i64,
    skipped: i64,
    failed: i64,
    total: i64,
}

impl From<LogCounts> for LogSummary {
    fn from(c: LogCounts) -> Self {
        LogSummary {
            success_rate: percent(c.completed, c.total),
            completed: c.completed,
            skipped: c.skipped,
            failed: c.failed,
            total: c.total,
        }
    }
}

fn distribution(summary: &LogSummary) -> StatusDistribution {
    let share = |count| StatusShare {
        count,
        percentage: percent(count, summary.total),
    };
    StatusDistribution {
        completed: share(summary.completed),
        skipped: share(summary.skipped),
        failed: share(summary.failed),
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProgressRow {
    id: i64,
    title: String,
    icon: String,
    color: String,
    total_logs: i64,
    completed: i64,
}

/// Best completion rate first, ties by habit id, at most twenty entries.
fn rank_progress(rows: Vec<ProgressRow>) -> Vec<HabitProgress> {
    let mut progress: Vec<HabitProgress> = rows
        .into_iter()
        .map(|row| HabitProgress {
            completion_rate: percent(row.completed, row.total_logs),
            id: row.id,
            title: row.title,
            icon: row.icon,
            color: row.color,
            total_logs: row.total_logs,
            completed: row.completed,
        })
        .collect();

    progress.sort_by(|a, b| {
        b.completion_rate
            .cmp(&a.completion_rate)
            .then(a.id.cmp(&b.id))
    });
    progress.truncate(PROGRESS_LIMIT);
    progress
}

pub async fn get_statistics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<StatisticsQuery>,
) -> AppResult<ApiResponse<StatisticsResponse>> {
    let end = today();
    let (period, start) = period_range(query.period.as_deref(), end);

    let counts = sqlx::query_as::<_, LogCounts>(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
            COALESCE(SUM(CASE WHEN status = 'skipped' THEN 1 ELSE 0 END), 0) AS skipped,
            COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed,
            COUNT(*) AS total
        FROM habit_logs
        WHERE user_id = ? AND log_date BETWEEN ? AND ?
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, ProgressRow>(
        r#"
        SELECT h.id, h.title, h.icon, h.color,
               COUNT(hl.id) AS total_logs,
               COALESCE(SUM(CASE WHEN hl.status = 'completed' THEN 1 ELSE 0 END), 0) AS completed
        FROM habits h
        JOIN habit_logs hl ON hl.habit_id = h.id AND hl.log_date BETWEEN ? AND ?
        WHERE h.user_id = ? AND h.is_active = 1
        GROUP BY h.id, h.title, h.icon, h.color
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let task_stats = sqlx::query_as::<_, TaskStats>(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
            COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
            COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled
        FROM tasks
        WHERE user_id = ? AND date(created_at) BETWEEN ? AND ?
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .fetch_one(&state.db)
    .await?;

    let summary = LogSummary::from(counts);
    let response = StatisticsResponse {
        period: period.to_string(),
        start_date: start,
        end_date: end,
        status_distribution: distribution(&summary),
        summary,
        habit_progress: rank_progress(rows),
        task_stats,
    };

    Ok(ApiResponse::ok("Statistics retrieved successfully", response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(id: i64, total_logs: i64, completed: i64) -> ProgressRow {
        ProgressRow {
            id,
            title: format!("habit {id}"),
            icon: "check".into(),
            color: "#FF4081".into(),
            total_logs,
            completed,
        }
    }

    #[test]
    fn test_period_range() {
        let today = d(2024, 3, 10);
        assert_eq!(period_range(Some("week"), today), ("week", d(2024, 3, 3)));
        assert_eq!(period_range(None, today), ("month", d(2024, 2, 9)));
        assert_eq!(period_range(Some("year"), today), ("year", d(2023, 3, 11)));
        assert_eq!(period_range(Some("all"), today), ("all", d(2000, 1, 1)));
        assert_eq!(period_range(Some("decade"), today).0, "month");
    }

    #[test]
    fn test_percent_never_divides_by_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(4, 4), 100);
    }

    #[test]
    fn test_empty_summary() {
        let summary = LogSummary::from(LogCounts::default());
        assert_eq!(summary.success_rate, 0);
        let dist = distribution(&summary);
        assert_eq!(dist.completed, StatusShare::default());
        assert_eq!(dist.failed.percentage, 0);
    }

    #[test]
    fn test_distribution_percentages() {
        let summary = LogSummary::from(LogCounts {
            completed: 3,
            skipped: 1,
            failed: 0,
            total: 4,
        });
        assert_eq!(summary.success_rate, 75);
        let dist = distribution(&summary);
        assert_eq!(dist.completed, StatusShare { count: 3, percentage: 75 });
        assert_eq!(dist.skipped, StatusShare { count: 1, percentage: 25 });
    }

    #[test]
    fn test_rank_progress_orders_and_truncates() {
        let ranked = rank_progress(vec![row(1, 4, 1), row(2, 2, 2), row(3, 4, 2), row(4, 2, 1)]);
        let ids: Vec<i64> = ranked.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 4, 1]);
        assert_eq!(ranked[0].completion_rate, 100);

        let many = (1..=30).map(|id| row(id, 1, 1)).collect();
        assert_eq!(rank_progress(many).len(), PROGRESS_LIMIT);
    }
}
