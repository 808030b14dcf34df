use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// `stocks` and `daystocks` carry no key constraint: they are append-only and
// duplicate prevention belongs to the caller.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_market_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS companies (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    symbol TEXT NOT NULL UNIQUE,
    isin TEXT,
    euronext TEXT,
    boursorama TEXT
);

CREATE TABLE IF NOT EXISTS stocks (
    date TIMESTAMP NOT NULL,
    cid BIGINT NOT NULL,
    value DOUBLE NOT NULL,
    volume DOUBLE
);

CREATE TABLE IF NOT EXISTS daystocks (
    date DATE NOT NULL,
    cid BIGINT NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume DOUBLE,
    mean DOUBLE,
    std DOUBLE
);

CREATE TABLE IF NOT EXISTS file_done (
    name TEXT PRIMARY KEY,
    processed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_stocks_cid_date ON stocks(cid, date);
CREATE INDEX IF NOT EXISTS idx_daystocks_cid_date ON daystocks(cid, date);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
