/// Channel profile, subscription, and watch-history endpoints
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::{
    api::ApiResponse,
    auth::{AuthContext, OptionalAuthContext},
    context::AppContext,
    error::AppResult,
    query::{ChannelProfile, WatchHistoryItem},
};

/// Build channel and history routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/channels/:username", get(channel_profile))
        .route(
            "/api/v1/channels/:username/subscribe",
            post(subscribe).delete(unsubscribe),
        )
        .route("/api/v1/accounts/watch-history", get(watch_history))
}

/// Channel profile with derived subscription counts
///
/// Works without authentication; `isSubscribed` is false for anonymous
/// viewers.
async fn channel_profile(
    State(ctx): State<AppContext>,
    viewer: OptionalAuthContext,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<ChannelProfile>>> {
    let viewer_id = viewer.auth.as_ref().map(|a| a.account_id.as_str());
    let profile = ctx
        .channel_queries
        .channel_profile(viewer_id, &username)
        .await?;

    Ok(ApiResponse::ok(profile, "Channel profile fetched"))
}

async fn subscribe(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let channel = ctx.accounts.find_by_username(&username).await?;
    ctx.channel_queries
        .subscribe(&auth.account_id, &channel.id)
        .await?;

    Ok(ApiResponse::ok(serde_json::json!({}), "Subscribed"))
}

async fn unsubscribe(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let channel = ctx.accounts.find_by_username(&username).await?;
    ctx.channel_queries
        .unsubscribe(&auth.account_id, &channel.id)
        .await?;

    Ok(ApiResponse::ok(serde_json::json!({}), "Unsubscribed"))
}

/// The caller's watch history, most recently watched first
async fn watch_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<ApiResponse<Vec<WatchHistoryItem>>>> {
    let history = ctx.channel_queries.watch_history(&auth.account_id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched"))
}
