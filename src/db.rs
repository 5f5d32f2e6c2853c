//! SQLite position store: open positions and first-sighting records

use crate::types::{canonical_address, Position, SeenToken};
use alloy::primitives::U256;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{info, warn};

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &str) -> Result<Self> {
        let in_memory = path.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(path)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if in_memory {
            // Every connection to an in-memory database sees its own empty schema
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.initialize().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_tokens (
                token TEXT PRIMARY KEY,
                first_seen_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // qty and prices are decimal strings, never REAL
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                token TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                decimals INTEGER NOT NULL,
                qty TEXT NOT NULL,
                entry_price_usd TEXT NOT NULL,
                tp_pct TEXT NOT NULL,
                sl_pct TEXT NOT NULL,
                bought_at_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database initialized");
        Ok(())
    }

    /// Record the first sighting of a token.
    ///
    /// Insert-only: an existing record is left untouched. Returns the stored
    /// record either way.
    pub async fn record_seen(&self, token: &str, now_ms: i64) -> Result<SeenToken> {
        let token = canonical_address(token);

        sqlx::query("INSERT OR IGNORE INTO seen_tokens (token, first_seen_ms) VALUES (?, ?)")
            .bind(&token)
            .bind(now_ms)
            .execute(&self.pool)
            .await?;

        self.get_seen(&token)
            .await?
            .with_context(|| format!("seen record for {} missing after insert", token))
    }

    /// Look up a first-sighting record
    pub async fn get_seen(&self, token: &str) -> Result<Option<SeenToken>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT token, first_seen_ms FROM seen_tokens WHERE token = ?")
                .bind(canonical_address(token))
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(token, first_seen_ms)| SeenToken { token, first_seen_ms }))
    }

    /// Insert or wholesale replace a position (buy path only)
    pub async fn upsert_position(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO positions (token, symbol, decimals, qty, entry_price_usd, tp_pct, sl_pct, bought_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(canonical_address(&position.token))
        .bind(&position.symbol)
        .bind(position.decimals as i64)
        .bind(position.quantity.to_string())
        .bind(position.entry_price_usd.to_string())
        .bind(position.take_profit_pct.to_string())
        .bind(position.stop_loss_pct.to_string())
        .bind(position.bought_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get all open positions
    pub async fn list_positions(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query("SELECT * FROM positions ORDER BY bought_at_ms")
            .fetch_all(&self.pool)
            .await?;

        let positions = rows
            .iter()
            .filter_map(|row| match row_to_position(row) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Skipping unreadable position row: {:#}", e);
                    None
                }
            })
            .collect();

        Ok(positions)
    }

    /// Get the position for a token, if held
    pub async fn get_position(&self, token: &str) -> Result<Option<Position>> {
        let row = sqlx::query("SELECT * FROM positions WHERE token = ?")
            .bind(canonical_address(token))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(row_to_position(&r)?)),
            None => Ok(None),
        }
    }

    /// Check whether a position exists for a token
    pub async fn has_position(&self, token: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM positions WHERE token = ?")
            .bind(canonical_address(token))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete a position unconditionally
    pub async fn remove_position(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM positions WHERE token = ?")
            .bind(canonical_address(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_position(row: &SqliteRow) -> Result<Position> {
    let token: String = row.try_get("token")?;
    let qty: String = row.try_get("qty")?;
    let entry_price: String = row.try_get("entry_price_usd")?;
    let tp: String = row.try_get("tp_pct")?;
    let sl: String = row.try_get("sl_pct")?;
    let decimals: i64 = row.try_get("decimals")?;

    Ok(Position {
        quantity: U256::from_str_radix(&qty, 10)
            .with_context(|| format!("invalid quantity {:?} for {}", qty, token))?,
        entry_price_usd: Decimal::from_str(&entry_price)
            .with_context(|| format!("invalid entry price {:?} for {}", entry_price, token))?,
        take_profit_pct: Decimal::from_str(&tp)?,
        stop_loss_pct: Decimal::from_str(&sl)?,
        decimals: u8::try_from(decimals)
            .with_context(|| format!("invalid decimals {} for {}", decimals, token))?,
        symbol: row.try_get("symbol")?,
        bought_at_ms: row.try_get("bought_at_ms")?,
        token,
    })
}
