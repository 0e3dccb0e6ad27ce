pub mod sqlite_agent_repository;
pub mod sqlite_call_repository;
pub mod sqlite_lead_repository;
pub mod sqlite_store;

pub use sqlite_agent_repository::SqliteAgentRepository;
pub use sqlite_call_repository::SqliteCallRepository;
pub use sqlite_lead_repository::SqliteLeadRepository;
pub use sqlite_store::SqliteAssignmentStore;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use dialer_core::DialerResult;

/// 创建嵌入式SQLite连接池，自动初始化数据库
pub async fn create_embedded_pool(
    database_url: &str,
    max_connections: u32,
) -> DialerResult<SqlitePool> {
    debug!("Creating embedded SQLite pool at: {}", database_url);

    // 启用外键约束和WAL模式
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .connect_with(connect_options)
        .await?;

    run_migrations(&pool).await?;

    debug!("Successfully created embedded SQLite pool");
    Ok(pool)
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> DialerResult<()> {
    debug!("Running SQLite database migrations");

    // 线索表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            email TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'NEW',
            assigned_agent INTEGER,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_call_attempt DATETIME,
            next_eligible_time DATETIME,
            meeting_details TEXT,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 坐席表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_available INTEGER NOT NULL DEFAULT 1,
            current_lead INTEGER,
            total_calls INTEGER NOT NULL DEFAULT 0,
            successful_calls INTEGER NOT NULL DEFAULT 0,
            meetings_scheduled INTEGER NOT NULL DEFAULT 0,
            last_activity_at DATETIME NOT NULL,
            registered_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 通话表，记录不删除
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL,
            agent_id INTEGER NOT NULL,
            started_at DATETIME NOT NULL,
            ended_at DATETIME,
            duration_seconds INTEGER,
            status TEXT NOT NULL DEFAULT 'IN_PROGRESS',
            notes TEXT NOT NULL DEFAULT '',
            recording_url TEXT,
            quality TEXT,
            meeting_details TEXT,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (lead_id) REFERENCES leads(id),
            FOREIGN KEY (agent_id) REFERENCES agents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 线索通话历史，自增主键即追加顺序
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lead_call_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL,
            agent_id INTEGER NOT NULL,
            recorded_at DATETIME NOT NULL,
            outcome TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            recording_url TEXT,
            FOREIGN KEY (lead_id) REFERENCES leads(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建索引
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status)",
        "CREATE INDEX IF NOT EXISTS idx_leads_next_eligible_time ON leads(next_eligible_time)",
        "CREATE INDEX IF NOT EXISTS idx_leads_assigned_agent ON leads(assigned_agent)",
        "CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_agents_availability ON agents(is_active, is_available)",
        "CREATE INDEX IF NOT EXISTS idx_calls_agent_status ON calls(agent_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_calls_lead_id ON calls(lead_id)",
        "CREATE INDEX IF NOT EXISTS idx_history_lead_id ON lead_call_history(lead_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    debug!("Successfully completed SQLite database migrations");
    Ok(())
}
