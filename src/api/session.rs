/// Account and session endpoints
use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    account::{
        ChangePasswordRequest, LoginOutcome, LoginRequest, NewAccount, PublicAccount,
        RefreshRequest, UpdateProfileRequest,
    },
    api::ApiResponse,
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    token::TokenPair,
};

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/accounts/register", post(register))
        .route("/api/v1/accounts/login", post(login))
        .route("/api/v1/accounts/logout", post(logout))
        .route("/api/v1/accounts/refresh-token", post(refresh_token))
        .route("/api/v1/accounts/change-password", post(change_password))
        .route("/api/v1/accounts/me", get(current_account))
        .route("/api/v1/accounts/profile", patch(update_profile))
        .route("/api/v1/accounts/avatar", patch(update_avatar))
        .route("/api/v1/accounts/cover-image", patch(update_cover_image))
}

/// Register endpoint: multipart form with profile fields plus the avatar
/// (required) and cover image (optional) files
async fn register(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut full_name = String::new();
    let mut email = String::new();
    let mut username = String::new();
    let mut password = String::new();
    let mut avatar: Option<PathBuf> = None;
    let mut cover: Option<PathBuf> = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "fullName" => full_name = field_text(field).await?,
            "email" => email = field_text(field).await?,
            "username" => username = field_text(field).await?,
            "password" => password = field_text(field).await?,
            "avatar" => avatar = Some(spool_upload(&ctx, field).await?),
            "coverImage" => cover = Some(spool_upload(&ctx, field).await?),
            other => tracing::debug!("ignoring unknown multipart field {:?}", other),
        }
    }

    let result = ctx
        .session_manager
        .register(
            NewAccount {
                full_name,
                email,
                username,
                password,
            },
            avatar.as_deref(),
            cover.as_deref(),
        )
        .await;

    // Temp files are one-shot regardless of outcome
    for path in [avatar, cover].into_iter().flatten() {
        let _ = tokio::fs::remove_file(path).await;
    }

    let account = result?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(account, "Account registered successfully"),
    ))
}

/// Login endpoint; sets the token cookies alongside the JSON body
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<LoginOutcome>>)> {
    let identifier = req.username.or(req.email).unwrap_or_default();
    let outcome = ctx
        .session_manager
        .login(identifier.trim(), &req.password)
        .await?;

    let jar = jar
        .add(token_cookie("accessToken", &outcome.tokens.access_token))
        .add(token_cookie("refreshToken", &outcome.tokens.refresh_token));

    Ok((jar, ApiResponse::ok(outcome, "Login successful")))
}

/// Logout endpoint; clears the persisted refresh token and both cookies
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<serde_json::Value>>)> {
    ctx.session_manager.logout(&auth.account_id).await?;

    let jar = jar
        .remove(expired_cookie("accessToken"))
        .remove(expired_cookie("refreshToken"));

    Ok((
        jar,
        ApiResponse::ok(serde_json::json!({}), "Logged out successfully"),
    ))
}

/// Refresh endpoint; the incoming token may be a cookie or a body field
async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<(CookieJar, Json<ApiResponse<TokenPair>>)> {
    let incoming = jar
        .get("refreshToken")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token));

    let pair = ctx.session_manager.refresh(incoming.as_deref()).await?;

    let jar = jar
        .add(token_cookie("accessToken", &pair.access_token))
        .add(token_cookie("refreshToken", &pair.refresh_token));

    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ctx.session_manager
        .change_password(&auth.account_id, &req.old_password, &req.new_password)
        .await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

async fn current_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<ApiResponse<PublicAccount>>> {
    let account = ctx.session_manager.current_account(&auth.account_id).await?;
    Ok(ApiResponse::ok(account, "Current account fetched"))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<PublicAccount>>> {
    let account = ctx
        .session_manager
        .update_profile(&auth.account_id, &req.full_name, &req.email)
        .await?;

    Ok(ApiResponse::ok(account, "Profile updated successfully"))
}

async fn update_avatar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<PublicAccount>>> {
    let file = spool_single_file(&ctx, multipart, "avatar").await?;
    let result = ctx
        .session_manager
        .update_avatar(&auth.account_id, file.as_deref())
        .await;

    if let Some(path) = file {
        let _ = tokio::fs::remove_file(path).await;
    }

    Ok(ApiResponse::ok(result?, "Avatar updated successfully"))
}

async fn update_cover_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<PublicAccount>>> {
    let file = spool_single_file(&ctx, multipart, "coverImage").await?;
    let result = ctx
        .session_manager
        .update_cover_image(&auth.account_id, file.as_deref())
        .await;

    if let Some(path) = file {
        let _ = tokio::fs::remove_file(path).await;
    }

    Ok(ApiResponse::ok(result?, "Cover image updated successfully"))
}

/// httpOnly + Secure token cookie
fn token_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

/// Removal cookie matching the path the token cookies were set with
fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

async fn next_field(multipart: &mut Multipart) -> AppResult<Option<Field<'_>>> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart request: {}", e)))
}

async fn field_text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart field: {}", e)))
}

/// Write an uploaded file part into the tmp directory
async fn spool_upload(ctx: &AppContext, field: Field<'_>) -> AppResult<PathBuf> {
    let original = field.file_name().unwrap_or("upload").to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;

    if data.len() > ctx.config.service.upload_limit {
        return Err(AppError::Validation("Uploaded file is too large".to_string()));
    }

    let path = ctx
        .config
        .storage
        .tmp_directory
        .join(format!("{}-{}", Uuid::new_v4(), original));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &data).await?;

    Ok(path)
}

/// Extract a single named file part from a multipart body
async fn spool_single_file(
    ctx: &AppContext,
    mut multipart: Multipart,
    name: &str,
) -> AppResult<Option<PathBuf>> {
    let mut file = None;
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some(name) {
            file = Some(spool_upload(ctx, field).await?);
        }
    }
    Ok(file)
}
