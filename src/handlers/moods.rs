use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};

use crate::api::{ApiResponse, Params, Payload};
use crate::auth::middleware::AuthUser;
use crate::dates::today;
use crate::error::{AppError, AppResult};
use crate::models::mood::{Mood, MoodQuery, SaveMoodRequest};
use crate::AppState;

/// One day's mood with `date`, or a range with `start_date` and `end_date`.
pub async fn get_moods(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<MoodQuery>,
) -> AppResult<Response> {
    if let Some(date) = query.date {
        let mood = sqlx::query_as::<_, Mood>(
            "SELECT * FROM moods WHERE user_id = ? AND mood_date = ?",
        )
        .bind(user.id)
        .bind(date)
        .fetch_optional(&state.db)
        .await?;

        return Ok(ApiResponse::optional("Mood retrieved", mood).into_response());
    }

    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(AppError::BadRequest("Missing date parameters".into()));
    };

    let moods = sqlx::query_as::<_, Mood>(
        r#"
        SELECT * FROM moods
        WHERE user_id = ? AND mood_date BETWEEN ? AND ?
        ORDER BY mood_date ASC
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok("Moods retrieved", moods).into_response())
}

/// Saves the mood for a day, replacing any earlier entry for that day.
pub async fn save_mood(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Payload(req): Payload<SaveMoodRequest>,
) -> AppResult<ApiResponse<Mood>> {
    let level = req.level()?;
    let date = req.mood_date.unwrap_or_else(today);

    let mood = sqlx::query_as::<_, Mood>(
        r#"
        INSERT INTO moods (user_id, mood_date, mood_level, mood_emoji, notes)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, mood_date) DO UPDATE SET
            mood_level = excluded.mood_level,
            mood_emoji = excluded.mood_emoji,
            notes = excluded.notes
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(date)
    .bind(level)
    .bind(&req.mood_emoji)
    .bind(req.notes.as_deref().unwrap_or(""))
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::ok("Mood saved successfully", mood))
}
