//! `PostgreSQL` implementation of [`UnitRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cop_types::{Unit, UnitId, UnitStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::UnitRepository;

/// Unit store over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgUnitStore {
    pool: PgPool,
}

impl PgUnitStore {
    /// Create a store bound to `pool`.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitRepository for PgUnitStore {
    async fn find_by_call_sign(&self, call_sign: &str) -> Result<Option<Unit>, DbError> {
        let row = sqlx::query_as::<_, UnitRow>(
            r"SELECT id, call_sign, unit_type, status, latitude, longitude, heading, speed,
                     last_update, commander_id
              FROM units
              WHERE call_sign = $1",
        )
        .bind(call_sign)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Unit::try_from).transpose()
    }

    async fn save_unit(&self, unit: Unit) -> Result<Unit, DbError> {
        let row = sqlx::query_as::<_, UnitRow>(
            r"INSERT INTO units (id, call_sign, unit_type, status, latitude, longitude, heading, speed,
                                 last_update, commander_id)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
              ON CONFLICT (id) DO UPDATE SET
                  call_sign = EXCLUDED.call_sign,
                  unit_type = EXCLUDED.unit_type,
                  status = EXCLUDED.status,
                  latitude = EXCLUDED.latitude,
                  longitude = EXCLUDED.longitude,
                  heading = EXCLUDED.heading,
                  speed = EXCLUDED.speed,
                  last_update = EXCLUDED.last_update,
                  commander_id = EXCLUDED.commander_id,
                  updated_at = now()
              RETURNING id, call_sign, unit_type, status, latitude, longitude, heading, speed,
                        last_update, commander_id",
        )
        .bind(unit.id.into_inner())
        .bind(&unit.call_sign)
        .bind(&unit.unit_type)
        .bind(unit.status.as_str())
        .bind(unit.latitude)
        .bind(unit.longitude)
        .bind(unit.heading)
        .bind(unit.speed)
        .bind(unit.last_update)
        .bind(&unit.commander_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(call_sign = %unit.call_sign, "Unit committed");
        Unit::try_from(row)
    }
}

/// A row from the `units` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitRow {
    /// Unit ID.
    pub id: Uuid,
    /// Call sign.
    pub call_sign: String,
    /// Unit type.
    pub unit_type: String,
    /// Status as stored text.
    pub status: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Heading.
    pub heading: Option<f64>,
    /// Speed.
    pub speed: Option<f64>,
    /// Last position report.
    pub last_update: DateTime<Utc>,
    /// Commanding user.
    pub commander_id: String,
}

impl TryFrom<UnitRow> for Unit {
    type Error = DbError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        let status = UnitStatus::parse(&row.status)
            .ok_or_else(|| DbError::Decode(format!("unknown unit status {}", row.status)))?;
        Ok(Self {
            id: UnitId::from(row.id),
            call_sign: row.call_sign,
            unit_type: row.unit_type,
            status,
            latitude: row.latitude,
            longitude: row.longitude,
            heading: row.heading,
            speed: row.speed,
            last_update: row.last_update,
            commander_id: row.commander_id,
        })
    }
}
