//! Database migrations
//!
//! This module manages PostgreSQL schema migrations for escruta.
//! Migrations are versioned and applied in order on startup.

use sqlx::PgPool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 5;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
"#;

/// Migration 1: Users and access tokens
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY NOT NULL,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    -- Only the SHA-256 of each bearer token is stored
    CREATE TABLE IF NOT EXISTS access_tokens (
        token CHAR(64) PRIMARY KEY NOT NULL,
        email TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_access_tokens_email ON access_tokens(email);
    CREATE INDEX IF NOT EXISTS idx_access_tokens_expires_at ON access_tokens(expires_at);
"#;

/// Migration 2: Notebooks, notes and sources
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS notebooks (
        id UUID PRIMARY KEY NOT NULL,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        icon TEXT,
        title TEXT NOT NULL,
        summary TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE INDEX IF NOT EXISTS idx_notebooks_user_id ON notebooks(user_id);

    CREATE TABLE IF NOT EXISTS notes (
        id UUID PRIMARY KEY NOT NULL,
        notebook_id UUID NOT NULL REFERENCES notebooks(id) ON DELETE CASCADE,
        icon TEXT,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE INDEX IF NOT EXISTS idx_notes_notebook_id ON notes(notebook_id);

    CREATE TABLE IF NOT EXISTS sources (
        id UUID PRIMARY KEY NOT NULL,
        notebook_id UUID NOT NULL REFERENCES notebooks(id) ON DELETE CASCADE,
        icon TEXT,
        title TEXT NOT NULL,
        link TEXT,
        content TEXT NOT NULL DEFAULT '',
        summary TEXT,
        is_converted_by_ai BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE INDEX IF NOT EXISTS idx_sources_notebook_id ON sources(notebook_id);
"#;

/// Migration 3: pgvector document store
const MIGRATION_V3: &str = r#"
    CREATE EXTENSION IF NOT EXISTS vector;

    CREATE TABLE IF NOT EXISTS vector_store (
        id UUID PRIMARY KEY NOT NULL DEFAULT gen_random_uuid(),
        content TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        embedding vector(1536) NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_vector_store_embedding
        ON vector_store USING hnsw (embedding vector_cosine_ops);
    CREATE INDEX IF NOT EXISTS idx_vector_store_notebook
        ON vector_store ((metadata->>'notebookId'));
    CREATE INDEX IF NOT EXISTS idx_vector_store_source
        ON vector_store ((metadata->>'sourceId'));
"#;

/// Migration 4: Windowed chat memory
const MIGRATION_V4: &str = r#"
    CREATE TABLE IF NOT EXISTS chat_memory (
        sequence BIGSERIAL PRIMARY KEY,
        conversation_id VARCHAR(36) NOT NULL,
        notebook_id UUID NOT NULL REFERENCES notebooks(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        type VARCHAR(10) NOT NULL CHECK (type IN ('USER', 'ASSISTANT', 'SYSTEM')),
        "timestamp" TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE INDEX IF NOT EXISTS idx_chat_memory_conversation
        ON chat_memory(notebook_id, conversation_id, sequence);
"#;

/// Migration 5: Generation jobs
const MIGRATION_V5: &str = r#"
    CREATE TABLE IF NOT EXISTS generation_jobs (
        id UUID PRIMARY KEY NOT NULL,
        notebook_id UUID NOT NULL REFERENCES notebooks(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        type VARCHAR(20) NOT NULL
            CHECK (type IN ('MIND_MAP', 'STUDY_GUIDE', 'FLASHCARDS', 'QUESTIONNAIRE')),
        status VARCHAR(20) NOT NULL
            CHECK (status IN ('PENDING', 'PROCESSING', 'COMPLETED', 'FAILED')),
        result TEXT,
        error_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        completed_at TIMESTAMPTZ
    );

    CREATE INDEX IF NOT EXISTS idx_generation_jobs_notebook_user
        ON generation_jobs(notebook_id, user_id, created_at DESC);

    -- At most one running job per notebook, user and type
    CREATE UNIQUE INDEX IF NOT EXISTS idx_generation_jobs_active
        ON generation_jobs(notebook_id, user_id, type)
        WHERE status IN ('PENDING', 'PROCESSING');
"#;

/// Ordered list of (version, description, sql)
const MIGRATIONS: &[(i32, &str, &str)] = &[
    (1, "Users and access tokens", MIGRATION_V1),
    (2, "Notebooks, notes and sources", MIGRATION_V2),
    (3, "pgvector document store", MIGRATION_V3),
    (4, "Chat memory", MIGRATION_V4),
    (5, "Generation jobs", MIGRATION_V5),
];

/// Get the current schema version from the database
async fn get_current_version(pool: &PgPool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(row.0.unwrap_or(0))
}

/// Run all pending migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    for (version, description, sql) in MIGRATIONS {
        if current_version >= *version {
            continue;
        }

        tracing::info!(version = *version, "Applying migration: {}", description);

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO _migrations (version) VALUES ($1)")
            .bind(*version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Get migration status information
pub async fn migration_status(pool: &PgPool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_contiguous() {
        for (index, (version, _, _)) in MIGRATIONS.iter().enumerate() {
            assert_eq!(*version, index as i32 + 1);
        }
        assert_eq!(MIGRATIONS.last().map(|m| m.0), Some(CURRENT_VERSION));
    }

    #[test]
    fn test_vector_store_schema() {
        assert!(MIGRATION_V3.contains("CREATE EXTENSION IF NOT EXISTS vector"));
        assert!(MIGRATION_V3.contains("vector_cosine_ops"));
    }
}
