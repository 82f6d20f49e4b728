use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

/// The two submission shapes stored in `health_data`.
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    WeightBlood {
        height: f64,
        weight: f64,
        systolic: f64,
        diastolic: f64,
    },
    Spo2 {
        spo2: f64,
    },
}

/// Append-only record; not linked to any user account.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    pub name: String,
    pub age: i32,
    pub measurement: Measurement,
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn append(&self, record: &HealthRecord) -> anyhow::Result<()>;
    async fn close(&self) {}
}

#[derive(Clone)]
pub struct PgHealthRepo {
    db: PgPool,
}

impl PgHealthRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HealthRepo for PgHealthRepo {
    async fn append(&self, record: &HealthRecord) -> anyhow::Result<()> {
        let query = match record.measurement {
            Measurement::WeightBlood {
                height,
                weight,
                systolic,
                diastolic,
            } => sqlx::query(
                r#"
                INSERT INTO health_data (name, age, height, weight, systolic, diastolic)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&record.name)
            .bind(record.age)
            .bind(height)
            .bind(weight)
            .bind(systolic)
            .bind(diastolic),
            Measurement::Spo2 { spo2 } => sqlx::query(
                r#"
                INSERT INTO health_data (name, age, spo2)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&record.name)
            .bind(record.age)
            .bind(spo2),
        };
        query
            .execute(&self.db)
            .await
            .context("insert health_data")?;
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
