//! Postgres Tariff Store
//!
//! Implements the `TariffStore` port on a `sqlx` connection pool.
//! Reconciliation is insert-or-ignore followed by a read-back inside one
//! transaction; snapshot replacement is delete+insert inside one
//! transaction, so a failure anywhere rolls back to the previous day.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::domain::tariff::{NewTariffRow, StoredTariff, TariffFields, WarehouseId};
use crate::error::{SyncError, SyncResult};
use crate::ports::tariff_store::TariffStore;

/// Postgres-backed tariff store.
#[derive(Clone)]
pub struct PgTariffStore {
    pool: PgPool,
}

/// A `warehouse_list` row joined with its warehouse name.
#[derive(sqlx::FromRow)]
struct TariffRecord {
    id: i64,
    get_date: NaiveDate,
    warehouse_name_id: i32,
    warehouse_name: String,
    box_delivery_base: Option<String>,
    box_delivery_coef_expr: Option<String>,
    box_delivery_liter: Option<String>,
    box_delivery_marketplace_base: Option<String>,
    box_delivery_marketplace_coef_expr: Option<String>,
    box_delivery_marketplace_liter: Option<String>,
    box_storage_base: Option<String>,
    box_storage_coef_expr: Option<String>,
    box_storage_liter: Option<String>,
    geo_name: Option<String>,
}

impl From<TariffRecord> for StoredTariff {
    fn from(r: TariffRecord) -> Self {
        Self {
            id: r.id,
            date: r.get_date,
            warehouse_id: r.warehouse_name_id,
            warehouse_name: r.warehouse_name,
            fields: TariffFields {
                box_delivery_base: r.box_delivery_base,
                box_delivery_coef_expr: r.box_delivery_coef_expr,
                box_delivery_liter: r.box_delivery_liter,
                box_delivery_marketplace_base: r.box_delivery_marketplace_base,
                box_delivery_marketplace_coef_expr: r.box_delivery_marketplace_coef_expr,
                box_delivery_marketplace_liter: r.box_delivery_marketplace_liter,
                box_storage_base: r.box_storage_base,
                box_storage_coef_expr: r.box_storage_coef_expr,
                box_storage_liter: r.box_storage_liter,
                geo_name: r.geo_name,
            },
        }
    }
}

/// Column-wise arrays for a bulk `UNNEST` insert.
#[derive(Default)]
struct TariffColumns {
    box_delivery_base: Vec<Option<String>>,
    box_delivery_coef_expr: Vec<Option<String>>,
    box_delivery_liter: Vec<Option<String>>,
    box_delivery_marketplace_base: Vec<Option<String>>,
    box_delivery_marketplace_coef_expr: Vec<Option<String>>,
    box_delivery_marketplace_liter: Vec<Option<String>>,
    box_storage_base: Vec<Option<String>>,
    box_storage_coef_expr: Vec<Option<String>>,
    box_storage_liter: Vec<Option<String>>,
    geo_name: Vec<Option<String>>,
    warehouse_name_id: Vec<i32>,
}

impl TariffColumns {
    fn from_rows(rows: &[NewTariffRow]) -> Self {
        let mut columns = Self::default();
        for row in rows {
            let f = row.fields.clone();
            columns.box_delivery_base.push(f.box_delivery_base);
            columns.box_delivery_coef_expr.push(f.box_delivery_coef_expr);
            columns.box_delivery_liter.push(f.box_delivery_liter);
            columns.box_delivery_marketplace_base.push(f.box_delivery_marketplace_base);
            columns
                .box_delivery_marketplace_coef_expr
                .push(f.box_delivery_marketplace_coef_expr);
            columns.box_delivery_marketplace_liter.push(f.box_delivery_marketplace_liter);
            columns.box_storage_base.push(f.box_storage_base);
            columns.box_storage_coef_expr.push(f.box_storage_coef_expr);
            columns.box_storage_liter.push(f.box_storage_liter);
            columns.geo_name.push(f.geo_name);
            columns.warehouse_name_id.push(row.warehouse_id);
        }
        columns
    }
}

impl PgTariffStore {
    /// Connect a pool using the configured parameters.
    #[instrument(skip(config), fields(host = %config.host, db = %config.database))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(config.password.expose());

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("Failed to connect to Postgres")?;

        info!("Database connection pool created");
        Ok(Self::from_pool(pool))
    }

    /// Connect a pool from a `postgres://` URL.
    pub async fn connect_url(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[async_trait]
impl TariffStore for PgTariffStore {
    #[instrument(skip(self, names), fields(names = names.len()))]
    async fn reconcile_warehouses(
        &self,
        names: &[String],
    ) -> SyncResult<HashMap<String, WarehouseId>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO warehouse_names (name)
            SELECT DISTINCT t.name FROM UNNEST($1::varchar[]) AS t(name)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(names)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Read committed: this statement also sees names committed by a
        // concurrent run after our insert skipped them.
        let resolved = sqlx::query_as::<_, (i32, String)>(
            r#"
            SELECT id, name FROM warehouse_names
            WHERE name = ANY($1::varchar[])
            "#,
        )
        .bind(names)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let ids: HashMap<String, WarehouseId> =
            resolved.into_iter().map(|(id, name)| (name, id)).collect();

        if let Some(missing) = names.iter().find(|n| !ids.contains_key(*n)) {
            return Err(SyncError::StorageUnavailable(format!(
                "warehouse {missing:?} could not be resolved after insert"
            )));
        }

        debug!(inserted, resolved = ids.len(), "Warehouse names reconciled");
        Ok(ids)
    }

    #[instrument(skip(self, rows), fields(%date, rows = rows.len()))]
    async fn replace_snapshot(&self, date: NaiveDate, rows: &[NewTariffRow]) -> SyncResult<u64> {
        let mut tx = self.pool.begin().await?;

        // Overlapping replaces of one day queue here; the later one then
        // deletes the rows the earlier one committed.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('warehouse_list'), $1)")
            .bind(date.num_days_from_ce())
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM warehouse_list WHERE get_date = $1")
            .bind(date)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted = 0;
        if !rows.is_empty() {
            let c = TariffColumns::from_rows(rows);
            inserted = sqlx::query(
                r#"
                INSERT INTO warehouse_list (
                    get_date,
                    box_delivery_base, box_delivery_coef_expr, box_delivery_liter,
                    box_delivery_marketplace_base, box_delivery_marketplace_coef_expr,
                    box_delivery_marketplace_liter,
                    box_storage_base, box_storage_coef_expr, box_storage_liter,
                    geo_name, warehouse_name_id
                )
                SELECT
                    $1,
                    t.box_delivery_base, t.box_delivery_coef_expr, t.box_delivery_liter,
                    t.box_delivery_marketplace_base, t.box_delivery_marketplace_coef_expr,
                    t.box_delivery_marketplace_liter,
                    t.box_storage_base, t.box_storage_coef_expr, t.box_storage_liter,
                    t.geo_name, t.warehouse_name_id
                FROM UNNEST(
                    $2::varchar[], $3::varchar[], $4::varchar[],
                    $5::varchar[], $6::varchar[], $7::varchar[],
                    $8::varchar[], $9::varchar[], $10::varchar[],
                    $11::varchar[], $12::int4[]
                ) WITH ORDINALITY AS t(
                    box_delivery_base, box_delivery_coef_expr, box_delivery_liter,
                    box_delivery_marketplace_base, box_delivery_marketplace_coef_expr,
                    box_delivery_marketplace_liter,
                    box_storage_base, box_storage_coef_expr, box_storage_liter,
                    geo_name, warehouse_name_id, ord
                )
                ORDER BY t.ord
                "#,
            )
            .bind(date)
            .bind(c.box_delivery_base)
            .bind(c.box_delivery_coef_expr)
            .bind(c.box_delivery_liter)
            .bind(c.box_delivery_marketplace_base)
            .bind(c.box_delivery_marketplace_coef_expr)
            .bind(c.box_delivery_marketplace_liter)
            .bind(c.box_storage_base)
            .bind(c.box_storage_coef_expr)
            .bind(c.box_storage_liter)
            .bind(c.geo_name)
            .bind(c.warehouse_name_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        info!(deleted, inserted, "Tariff snapshot replaced");
        Ok(inserted)
    }

    #[instrument(skip(self), fields(%date))]
    async fn load_snapshot(&self, date: NaiveDate) -> SyncResult<Vec<StoredTariff>> {
        let records = sqlx::query_as::<_, TariffRecord>(
            r#"
            SELECT
                l.id, l.get_date, l.warehouse_name_id, n.name AS warehouse_name,
                l.box_delivery_base, l.box_delivery_coef_expr, l.box_delivery_liter,
                l.box_delivery_marketplace_base, l.box_delivery_marketplace_coef_expr,
                l.box_delivery_marketplace_liter,
                l.box_storage_base, l.box_storage_coef_expr, l.box_storage_liter,
                l.geo_name
            FROM warehouse_list l
            JOIN warehouse_names n ON n.id = l.warehouse_name_id
            WHERE l.get_date = $1
            ORDER BY l.id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(StoredTariff::from).collect())
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
