/// Relational queries over accounts, subscription edges, and videos
///
/// Derived channel/history views are computed with explicit SQL joins and
/// counts rather than a pipeline description.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::{
    db::models::{Subscription, Video},
    error::{AppError, AppResult},
};

/// Channel profile with derived subscription fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub email: String,
}

/// Minimal owner profile embedded in watch-history items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub full_name: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// A watched video with its owner resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryItem {
    #[serde(flatten)]
    pub video: Video,
    pub watched_at: DateTime<Utc>,
    pub owner: OwnerProfile,
}

/// Computes channel and history views from the relational store
#[derive(Clone)]
pub struct ChannelQueryEngine {
    db: SqlitePool,
}

impl ChannelQueryEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Channel profile for `username`, as seen by `viewer`
    ///
    /// `subscribers_count` counts edges pointing at the channel,
    /// `channels_subscribed_to_count` counts edges leaving it, and
    /// `is_subscribed` reports whether the viewer holds such an edge.
    pub async fn channel_profile(
        &self,
        viewer_id: Option<&str>,
        username: &str,
    ) -> AppResult<ChannelProfile> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }

        let row = sqlx::query(
            "SELECT a.id, a.full_name, a.username, a.email, a.avatar_url, a.cover_url,
                    (SELECT COUNT(*) FROM subscription s WHERE s.channel_id = a.id) AS subscribers_count,
                    (SELECT COUNT(*) FROM subscription s WHERE s.subscriber_id = a.id) AS channels_subscribed_to_count,
                    EXISTS (
                        SELECT 1 FROM subscription s
                        WHERE s.channel_id = a.id AND s.subscriber_id = ?2
                    ) AS is_subscribed
             FROM account a WHERE a.username = ?1",
        )
        .bind(&username)
        .bind(viewer_id)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

        Ok(ChannelProfile {
            full_name: row.get("full_name"),
            username: row.get("username"),
            subscribers_count: row.get("subscribers_count"),
            channels_subscribed_to_count: row.get("channels_subscribed_to_count"),
            is_subscribed: row.get("is_subscribed"),
            avatar_url: row.get("avatar_url"),
            cover_url: row.get("cover_url"),
            email: row.get("email"),
        })
    }

    /// The account's watch history, most recently watched first, each video
    /// carrying its owner's minimal profile
    pub async fn watch_history(&self, account_id: &str) -> AppResult<Vec<WatchHistoryItem>> {
        // The history must resolve against an existing account, not just
        // return an empty list for any id
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE id = ?1")
            .bind(account_id)
            .fetch_one(&self.db)
            .await
            .map_err(AppError::Database)?;
        if exists == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        let rows = sqlx::query(
            "SELECT v.id, v.title, v.description, v.video_url, v.duration_secs, v.views,
                    v.is_published, v.owner_id, v.created_at, v.updated_at, h.watched_at,
                    o.full_name AS owner_full_name, o.username AS owner_username,
                    o.avatar_url AS owner_avatar_url
             FROM watch_history h
             JOIN video v ON v.id = h.video_id
             JOIN account o ON o.id = v.owner_id
             WHERE h.account_id = ?1
             ORDER BY h.watched_at DESC, h.rowid DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        let items = rows
            .into_iter()
            .map(|row| WatchHistoryItem {
                video: Video {
                    id: row.get("id"),
                    title: row.get("title"),
                    description: row.get("description"),
                    video_url: row.get("video_url"),
                    duration_secs: row.get("duration_secs"),
                    views: row.get("views"),
                    is_published: row.get("is_published"),
                    owner_id: row.get("owner_id"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                },
                watched_at: row.get("watched_at"),
                owner: OwnerProfile {
                    full_name: row.get("owner_full_name"),
                    username: row.get("owner_username"),
                    avatar_url: row.get("owner_avatar_url"),
                },
            })
            .collect();

        Ok(items)
    }

    /// Create a subscription edge; Conflict if it already exists
    pub async fn subscribe(&self, subscriber_id: &str, channel_id: &str) -> AppResult<()> {
        if subscriber_id == channel_id {
            return Err(AppError::Validation(
                "Cannot subscribe to your own channel".to_string(),
            ));
        }

        let edge = Subscription {
            id: Uuid::new_v4().to_string(),
            subscriber_id: subscriber_id.to_string(),
            channel_id: channel_id.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO subscription (id, subscriber_id, channel_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&edge.id)
        .bind(&edge.subscriber_id)
        .bind(&edge.channel_id)
        .bind(edge.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Already subscribed to this channel".to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(())
    }

    /// Remove a subscription edge
    pub async fn unsubscribe(&self, subscriber_id: &str, channel_id: &str) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2")
                .bind(subscriber_id)
                .bind(channel_id)
                .execute(&self.db)
                .await
                .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Subscription not found".to_string()));
        }

        Ok(())
    }
}
