use std::time::Duration;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::dto::auth::{
    Claims, LoginRequest, LoginResponse, ProfileResponse, ProfileSource, RegisterRequest,
    UpdatePasswordRequest,
};
use crate::{
    audit,
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Profile, Role},
    response::{ApiResponse, Meta},
};

/// Accounts provisioned outside the normal signup flow get their role from
/// this table when their profile row is first created (or synthesized).
const SEED_ACCOUNTS: [(&str, Role); 3] = [
    ("admin@photostudio.dev", Role::Admin),
    ("staff@photostudio.dev", Role::Staff),
    ("editor@photostudio.dev", Role::Editor),
];

/// Upper bound on the profile load during session bootstrap. When the
/// database is slower than this, the caller gets a synthesized fallback
/// profile instead of waiting.
const PROFILE_LOAD_TIMEOUT: Duration = Duration::from_secs(3);

pub fn seed_role_for_email(email: &str) -> Role {
    SEED_ACCOUNTS
        .iter()
        .find(|(seed, _)| *seed == email)
        .map(|(_, role)| *role)
        .unwrap_or(Role::Customer)
}

pub async fn register_user(
    pool: &DbPool,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<Profile>> {
    let RegisterRequest {
        email,
        password,
        full_name,
        phone,
    } = payload;

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;

    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&password)?;
    let role = seed_role_for_email(&email);

    let profile: Profile = sqlx::query_as(
        r#"
        INSERT INTO profiles (id, email, password_hash, full_name, role, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.as_str())
    .bind(password_hash)
    .bind(full_name)
    .bind(role.as_str())
    .bind(phone)
    .fetch_one(pool)
    .await?;

    audit::record(
        pool,
        Some(profile.id),
        "user_register",
        "profiles",
        serde_json::json!({ "user_id": profile.id, "role": role.as_str() }),
    )
    .await;

    Ok(ApiResponse::success("Account created", profile, None))
}

pub async fn login_user(
    pool: &DbPool,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let profile: Option<Profile> =
        sqlx::query_as("SELECT * FROM profiles WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(pool)
            .await?;

    let profile = match profile {
        Some(p) => p,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    if !profile.is_active {
        return Err(AppError::Forbidden);
    }

    verify_password(&password, &profile.password_hash)?;

    let token = issue_token(&profile)?;
    let resp = LoginResponse {
        token: format!("Bearer {}", token),
    };

    audit::record(
        pool,
        Some(profile.id),
        "user_login",
        "profiles",
        serde_json::json!({ "user_id": profile.id }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

/// Session/role context load. Races the profile fetch against a fixed
/// timeout; a slow or failed load still yields a usable profile, tagged as
/// fallback so callers can tell it apart from authoritative data. A missing
/// row is created lazily on the way.
pub async fn load_profile(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<ProfileResponse>> {
    let loaded =
        tokio::time::timeout(PROFILE_LOAD_TIMEOUT, fetch_or_create_profile(pool, user)).await;

    let resp = match loaded {
        Ok(Ok(profile)) => ProfileResponse {
            profile,
            source: ProfileSource::Authoritative,
        },
        Ok(Err(err)) => {
            tracing::warn!(error = %err, user_id = %user.user_id, "profile load failed, serving fallback");
            ProfileResponse {
                profile: fallback_profile(user),
                source: ProfileSource::Fallback,
            }
        }
        Err(_) => {
            tracing::warn!(user_id = %user.user_id, "profile load timed out, serving fallback");
            ProfileResponse {
                profile: fallback_profile(user),
                source: ProfileSource::Fallback,
            }
        }
    };

    Ok(ApiResponse::success("Profile", resp, Some(Meta::empty())))
}

async fn fetch_or_create_profile(pool: &DbPool, user: &AuthUser) -> AppResult<Profile> {
    let existing: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    if let Some(profile) = existing {
        return Ok(profile);
    }

    // Read miss: create the row lazily. ON CONFLICT keeps two concurrent
    // first requests from double-creating it.
    let role = seed_role_for_email(&user.email);
    sqlx::query(
        r#"
        INSERT INTO profiles (id, email, password_hash, role)
        VALUES ($1, $2, '', $3)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(user.user_id)
    .bind(user.email.as_str())
    .bind(role.as_str())
    .execute(pool)
    .await?;

    let profile: Profile = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;
    Ok(profile)
}

fn fallback_profile(user: &AuthUser) -> Profile {
    let now = Utc::now();
    let role = match seed_role_for_email(&user.email) {
        Role::Customer => user.role,
        seeded => seeded,
    };
    Profile {
        id: user.user_id,
        email: user.email.clone(),
        password_hash: String::new(),
        full_name: None,
        role: role.as_str().to_string(),
        is_active: true,
        phone: None,
        department: None,
        created_at: now,
        updated_at: now,
    }
}

pub async fn update_password(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdatePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let profile: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    let profile = match profile {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    verify_password(&payload.current_password, &profile.password_hash)?;

    let new_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE profiles SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user.user_id)
        .bind(new_hash)
        .execute(pool)
        .await?;

    audit::record(
        pool,
        Some(user.user_id),
        "password_update",
        "profiles",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> AppResult<()> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }
    Ok(())
}

fn issue_token(profile: &Profile) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: profile.id.to_string(),
        email: profile.email.clone(),
        role: profile.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
    Ok(token)
}
