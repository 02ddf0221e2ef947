use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{
        AssignRolesRequest, ChangePasswordRequest, LoginRequest, MessageResponse,
        PaginationQuery, RegisterRequest, TokenResponse, UpdateProfileRequest,
    },
    middleware::Principal,
    models::{new_id, ProfileUpdate, User, UserProfile},
    services::{roles::USER_ROLE, StoreError},
    utils::password::{hash_password, verify_password, Password},
    AppState,
};

/// Creates an account holding the default user role.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!("Email already registered")));
    }

    let default_role = state
        .roles
        .role_by_name(USER_ROLE)
        .await?
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Default user role is missing")))?;

    let password_hash = hash_password(&Password::new(req.password))?;

    let user = User {
        id: new_id(),
        first_name: req.first_name,
        last_name: req.last_name,
        email,
        password: password_hash,
        phone_number: req.phone_number,
        address: req.address,
        roles: vec![default_role],
        invoices: Vec::new(),
        reports: Vec::new(),
        logs: Vec::new(),
        device_token: None,
        archived: false,
    };

    state.users.insert_user(&user).await.map_err(|e| match e {
        StoreError::Duplicate(_) => AppError::Conflict(anyhow::anyhow!("Email already registered")),
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    req.validate()?;

    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"));

    let user = state
        .users
        .find_user_by_email(&req.email.trim().to_lowercase())
        .await?
        .filter(|user| !user.archived)
        .ok_or_else(invalid)?;

    verify_password(&Password::new(req.password), &user.password).map_err(|_| invalid())?;

    let token = state.jwt.generate_access_token(&user.id, &user.email)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expiry_seconds(),
    }))
}

fn user_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("User not found"))
}

async fn load_profile(state: &AppState, user_id: &str) -> Result<UserProfile, AppError> {
    let user = state
        .users
        .find_user(user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(UserProfile::from(&user))
}

pub async fn get_self(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(load_profile(&state, &principal.user_id).await?))
}

pub async fn update_self(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let changes = ProfileUpdate::from(req);
    if !state.users.update_profile(&principal.user_id, &changes).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %principal.user_id, "Profile updated");
    let profile = load_profile(&state, &principal.user_id).await?;
    Ok((StatusCode::ACCEPTED, Json(profile)))
}

/// Replaces the caller's password after checking the current one.
pub async fn change_password(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    let user = state
        .users
        .find_user(&principal.user_id)
        .await?
        .ok_or_else(user_not_found)?;

    verify_password(&Password::new(req.current_password), &user.password).map_err(|_| {
        AppError::Unauthorized(anyhow::anyhow!("Current password is incorrect"))
    })?;

    let password_hash = hash_password(&Password::new(req.new_password))?;
    if !state.users.set_password(&user.id, &password_hash).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

pub async fn archive_self(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<StatusCode, AppError> {
    if !state.users.archive_user(&principal.user_id).await? {
        return Err(user_not_found());
    }
    tracing::info!(user_id = %principal.user_id, "User archived own account");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let (skip, limit) = page.window()?;
    let users = state.users.list_users(skip, limit).await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(load_profile(&state, &user_id).await?))
}

pub async fn archive_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.users.archive_user(&user_id).await? {
        return Err(user_not_found());
    }
    tracing::info!(user_id = %user_id, archived_by = %principal.user_id, "User archived");
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces a user's roles with snapshots of the named roles.
pub async fn assign_roles(
    State(state): State<AppState>,
    principal: Principal,
    Path(user_id): Path<String>,
    Json(req): Json<AssignRolesRequest>,
) -> Result<Json<UserProfile>, AppError> {
    req.validate()?;

    let roles = state.roles.roles_by_names(&req.roles).await?;
    if let Some(unknown) = req
        .roles
        .iter()
        .find(|name| !roles.iter().any(|role| &role.name == *name))
    {
        return Err(AppError::BadRequest(anyhow::anyhow!("Unknown role '{}'", unknown)));
    }

    if !state.users.set_roles(&user_id, &roles).await? {
        return Err(user_not_found());
    }

    tracing::info!(
        user_id = %user_id,
        assigned_by = %principal.user_id,
        roles = ?req.roles,
        "Roles assigned"
    );

    Ok(Json(load_profile(&state, &user_id).await?))
}
