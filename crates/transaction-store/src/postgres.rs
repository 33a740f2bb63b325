use async_trait::async_trait;
use chrono::SubsecRound;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Amount, ConsumerId, Result, StoreError, Tenor, Transaction, TransactionId, TransactionQuery,
    store::TransactionStore,
};

const SELECT_COLUMNS: &str = "SELECT id, contract_number, consumer_id, tenor, otr, admin_fee, \
     installment, interest, asset_name, created_at, updated_at FROM transactions";

/// Name of the unique constraint guarding contract numbers.
const UNIQUE_CONTRACT_NUMBER: &str = "unique_contract_number";

/// PostgreSQL-backed transaction store implementation.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    /// Creates a new PostgreSQL transaction store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_transaction(row: PgRow) -> Result<Transaction> {
        Ok(Transaction {
            id: Some(TransactionId::new(row.try_get("id")?)),
            contract_number: row.try_get("contract_number")?,
            consumer_id: ConsumerId::new(from_i64(row.try_get("consumer_id")?, "consumer_id")?),
            tenor: Tenor::new(
                u32::try_from(row.try_get::<i32, _>("tenor")?)
                    .map_err(|_| StoreError::ValueOutOfRange { column: "tenor" })?,
            ),
            otr: Amount::new(from_i64(row.try_get("otr")?, "otr")?),
            admin_fee: Amount::new(from_i64(row.try_get("admin_fee")?, "admin_fee")?),
            installment: Amount::new(from_i64(row.try_get("installment")?, "installment")?),
            interest: Amount::new(from_i64(row.try_get("interest")?, "interest")?),
            asset_name: row.try_get("asset_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn to_i64(value: u64, column: &'static str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::ValueOutOfRange { column })
}

fn page_bound(value: usize, column: &'static str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::ValueOutOfRange { column })
}

fn from_i64(value: i64, column: &'static str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::ValueOutOfRange { column })
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    #[tracing::instrument(skip(self, transaction), fields(contract_number = %transaction.contract_number))]
    async fn insert(&self, transaction: Transaction) -> Result<Transaction> {
        if let Some(id) = transaction.id {
            return Err(StoreError::AlreadyPersisted(id));
        }

        let tenor = i32::try_from(transaction.tenor.periods())
            .map_err(|_| StoreError::ValueOutOfRange { column: "tenor" })?;
        // TIMESTAMPTZ keeps microseconds; return what a later read returns.
        let created_at = transaction.created_at.trunc_subsecs(6);
        let updated_at = transaction.updated_at.trunc_subsecs(6);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (contract_number, consumer_id, tenor, otr, admin_fee,
                                      installment, interest, asset_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&transaction.contract_number)
        .bind(to_i64(transaction.consumer_id.as_u64(), "consumer_id")?)
        .bind(tenor)
        .bind(to_i64(transaction.otr.value(), "otr")?)
        .bind(to_i64(transaction.admin_fee.value(), "admin_fee")?)
        .bind(to_i64(transaction.installment.value(), "installment")?)
        .bind(to_i64(transaction.interest.value(), "interest")?)
        .bind(&transaction.asset_name)
        .bind(created_at)
        .bind(updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(UNIQUE_CONTRACT_NUMBER)
            {
                tracing::warn!("transaction already exists for contract number");
                return StoreError::DuplicateContractNumber(transaction.contract_number.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(Transaction {
            id: Some(TransactionId::new(id)),
            created_at,
            updated_at,
            ..transaction
        })
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_transaction).transpose()
    }

    async fn find_by_contract_number(&self, contract_number: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE contract_number = $1"))
            .bind(contract_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_transaction).transpose()
    }

    async fn find_all(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.consumer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND consumer_id = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(consumer_id) = query.consumer_id {
            sqlx_query = sqlx_query.bind(to_i64(consumer_id.as_u64(), "consumer_id")?);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(page_bound(limit, "limit")?);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(page_bound(offset, "offset")?);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_transaction).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_by_id(&self, id: TransactionId) -> Result<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}
