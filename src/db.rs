use sqlx::SqlitePool;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Foreign keys are critical - fail if this doesn't work
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    // Name tables share one shape; name_key enforces case/whitespace-insensitive uniqueness
    for table in ["assignment_groups", "manufacturers", "categories", "set_names"] {
        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
            )"#,
            table
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    // sets: assignment is NULL for free availability, otherwise a JSON array of bare ids
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS sets (
            id TEXT PRIMARY KEY,
            manufacturer_id TEXT NOT NULL,
            set_name_id TEXT NOT NULL,
            category_id TEXT NULL,
            set_number TEXT NOT NULL,
            state_id TEXT NULL,
            assignment TEXT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(manufacturer_id) REFERENCES manufacturers(id),
            FOREIGN KEY(set_name_id) REFERENCES set_names(id),
            FOREIGN KEY(category_id) REFERENCES categories(id)
        )"#,
    )
    .execute(pool)
    .await?;

    // products: one row per physical unit
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            set_id TEXT NOT NULL,
            manufacturer_id TEXT NULL,
            product_type TEXT NOT NULL DEFAULT '',
            designation TEXT NOT NULL DEFAULT '',
            cost_center TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            active_state TEXT NOT NULL DEFAULT '',
            serial_number TEXT NOT NULL DEFAULT '',
            electrical_test_required INTEGER NOT NULL DEFAULT 0,
            testing_interval TEXT NOT NULL DEFAULT '',
            inspection_id TEXT NOT NULL DEFAULT '',
            inventoried INTEGER NOT NULL DEFAULT 0,
            area_code TEXT NOT NULL DEFAULT '',
            inventory_number TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(set_id) REFERENCES sets(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // users: set_assignments is a JSON array of bare ids (group ids and/or set ids)
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user',
            set_assignments TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    // sessions are issued elsewhere; this service only validates bearer tokens against them
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_sets_manufacturer", "CREATE INDEX IF NOT EXISTS idx_sets_manufacturer ON sets(manufacturer_id)"),
        ("idx_sets_set_name", "CREATE INDEX IF NOT EXISTS idx_sets_set_name ON sets(set_name_id)"),
        ("idx_products_set", "CREATE INDEX IF NOT EXISTS idx_products_set ON products(set_id)"),
        ("idx_sessions_user", "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if msg.contains("already exists") || msg.contains("duplicate") {
                        tracing::debug!("Index {} already exists, skipping", name);
                    } else {
                        tracing::warn!("Failed to create index {}: {}", name, e);
                    }
                }
                _ => {
                    tracing::warn!("Failed to create index {}: {}", name, e);
                }
            }
        }
    }

    Ok(())
}
