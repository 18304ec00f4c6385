//! PostgreSQL community store
//!
//! Reads the community backend's tables with runtime-checked queries. The
//! only write is recording the pool derived for a community.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::core::{Claims, ClaimsVerifier, Community, CommunityStore, ServiceError, ServiceResult};

const COMMUNITY_COLUMNS: &str = "id, creator_id, token_mint, pool_address";

/// PostgreSQL-backed community store and session verifier
#[derive(Clone)]
pub struct PgCommunityStore {
    pool: PgPool,
}

impl PgCommunityStore {
    /// Connect to PostgreSQL
    pub async fn connect(config: &DatabaseConfig) -> ServiceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await?;

        info!("PostgreSQL connected successfully");

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check
    pub async fn health_check(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_pubkey(column: &str, value: &str) -> ServiceResult<Pubkey> {
    Pubkey::from_str(value).map_err(|e| ServiceError::Store(format!("invalid {} {:?}: {}", column, value, e)))
}

fn community_from_row(row: &PgRow) -> ServiceResult<Community> {
    let token_mint: String = row.try_get("token_mint")?;
    let pool_address: Option<String> = row.try_get("pool_address")?;
    Ok(Community {
        id: row.try_get("id")?,
        creator_id: row.try_get("creator_id")?,
        token_mint: parse_pubkey("token_mint", &token_mint)?,
        pool_address: pool_address
            .as_deref()
            .map(|value| parse_pubkey("pool_address", value))
            .transpose()?,
    })
}

#[async_trait]
impl CommunityStore for PgCommunityStore {
    async fn get_community(&self, id: Uuid) -> ServiceResult<Option<Community>> {
        let query = format!("SELECT {} FROM communities WHERE id = $1", COMMUNITY_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(community_from_row).transpose()
    }

    async fn find_community_by_pool(&self, pool: &Pubkey) -> ServiceResult<Option<Community>> {
        let query = format!("SELECT {} FROM communities WHERE pool_address = $1", COMMUNITY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(pool.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(community_from_row).transpose()
    }

    async fn find_communities_by_creator(&self, creator_id: Uuid) -> ServiceResult<Vec<Community>> {
        let query = format!(
            "SELECT {} FROM communities WHERE creator_id = $1 ORDER BY created_at",
            COMMUNITY_COLUMNS
        );
        let rows = sqlx::query(&query).bind(creator_id).fetch_all(&self.pool).await?;
        rows.iter().map(community_from_row).collect()
    }

    async fn record_pool_address(&self, id: Uuid, pool: &Pubkey) -> ServiceResult<()> {
        let result = sqlx::query("UPDATE communities SET pool_address = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(pool.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found(format!("community {}", id)));
        }
        debug!(community = %id, pool = %pool, "Recorded pool address");
        Ok(())
    }
}

#[async_trait]
impl ClaimsVerifier for PgCommunityStore {
    async fn verify(&self, token: &str) -> ServiceResult<Option<Claims>> {
        let row = sqlx::query("SELECT user_id, wallet_address FROM sessions WHERE token = $1 AND expires_at > NOW()")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let wallet: String = row.try_get("wallet_address")?;
        Ok(Some(Claims {
            subject: row.try_get("user_id")?,
            wallet: parse_pubkey("wallet_address", &wallet)?,
        }))
    }
}
