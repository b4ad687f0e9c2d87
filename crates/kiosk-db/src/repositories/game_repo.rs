//! Game repository implementation

use async_trait::async_trait;
use kiosk_core::{models::Game, traits::GameStore, AppError, AppResult};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of GameStore
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameStore for PgGameRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Game>> {
        debug!("Finding game by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, GameRow>(
            "SELECT id, game_name, status FROM es_game WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding game {}: {}", id, e);
            AppError::Database(format!("Failed to find game: {}", e))
        })?;

        Ok(result.map(|row| Game {
            id: row.id,
            game_name: row.game_name,
            status: row.status,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GameRow {
    id: i32,
    game_name: String,
    status: String,
}
