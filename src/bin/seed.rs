use photostudio_api::{
    config::AppConfig, db::create_pool, services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_profile(&pool, "admin@photostudio.dev", "admin123", "admin").await?;
    let staff_id = ensure_profile(&pool, "staff@photostudio.dev", "staff123", "staff").await?;
    let editor_id = ensure_profile(&pool, "editor@photostudio.dev", "editor123", "editor").await?;
    let customer_id =
        ensure_profile(&pool, "customer@example.com", "customer123", "customer").await?;
    seed_services(&pool).await?;

    println!(
        "Seed completed. Admin: {admin_id}, Staff: {staff_id}, Editor: {editor_id}, Customer: {customer_id}"
    );
    Ok(())
}

async fn ensure_profile(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO profiles (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let profile_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM profiles WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured profile {email} (role={role})");
    Ok(profile_id)
}

async fn seed_services(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let services = vec![
        (
            "Basic Retouch",
            "Exposure, color and blemish cleanup",
            "retouching",
            1000_i64,
            "48 hours",
            vec!["Color correction", "Blemish removal"],
        ),
        (
            "Background Removal",
            "Clean cutouts on transparent or solid backgrounds",
            "cutout",
            1500,
            "24 hours",
            vec!["Transparent PNG", "Solid color background"],
        ),
        (
            "Portrait Enhancement",
            "Skin smoothing and studio-grade portrait polish",
            "retouching",
            2500,
            "72 hours",
            vec!["Skin smoothing", "Eye/teeth enhancement", "Stray hair cleanup"],
        ),
        (
            "Real Estate HDR",
            "Bracketed exposure blending for interiors",
            "real-estate",
            2000,
            "48 hours",
            vec!["HDR blending", "Window pulls", "Sky replacement"],
        ),
    ];

    for (name, desc, category, price, turnaround, features) in services {
        sqlx::query(
            r#"
            INSERT INTO services (id, name, description, category, base_price, turnaround_time, features)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(category)
        .bind(price)
        .bind(turnaround)
        .bind(serde_json::json!(features))
        .execute(pool)
        .await?;
    }

    println!("Seeded services");
    Ok(())
}
