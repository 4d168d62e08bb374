use chrono::{DateTime, Utc};
use porter_storage::{
    Account, AccountId, AccountStore, CreateAccountParams, MemberId, PendingIdentity, StoreError,
    SubscriptionStatus,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const ACCOUNT_COLUMNS: &str =
    "id, email, invite_code, external_id, subscription_status, linked_at, created_at, updated_at";

type AccountRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<i64>,
    i64,
    i64,
);

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {}", ms)))
}

fn parse_account_id(s: &str) -> Result<AccountId, StoreError> {
    Uuid::try_parse(s)
        .map(AccountId)
        .map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, StoreError> {
    s.parse().map_err(StoreError::Backend)
}

fn account_from_row(row: AccountRow) -> Result<Account, StoreError> {
    let (id, email, invite_code, external_id, status, linked_at, created_at, updated_at) = row;
    let external_id = external_id
        .map(|s| s.parse::<MemberId>())
        .transpose()
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Account {
        id: parse_account_id(&id)?,
        email,
        invite_code,
        external_id,
        subscription_status: parse_status(&status)?,
        linked_at: linked_at.map(from_millis).transpose()?,
        created_at: from_millis(created_at)?,
        updated_at: from_millis(updated_at)?,
    })
}

#[async_trait::async_trait]
impl AccountStore for SqliteStore {
    // ───────────────────────────── Accounts ─────────────────────────────

    async fn create_account(&self, params: &CreateAccountParams) -> Result<Account, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO accounts(id, email, invite_code, subscription_status, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&params.email)
        .bind(&params.invite_code)
        .bind(params.subscription_status.to_string())
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let s = e.to_string();
            if s.contains("UNIQUE") {
                StoreError::AlreadyExists
            } else {
                StoreError::Backend(s)
            }
        })?;

        self.get_account(&AccountId(id)).await
    }

    async fn get_account(&self, account_id: &AccountId) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => account_from_row(row),
        }
    }

    async fn set_subscription_status(
        &self,
        account_id: &AccountId,
        status: SubscriptionStatus,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "UPDATE accounts SET subscription_status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(Utc::now().timestamp_millis())
        .bind(account_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ───────────────────────────── Identity linkage ─────────────────────────────

    async fn query_pending_identities(
        &self,
        limit: u32,
    ) -> Result<Vec<PendingIdentity>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, i64)>(
            "SELECT id, invite_code, subscription_status, updated_at FROM accounts
             WHERE external_id IS NULL
               AND invite_code IS NOT NULL AND invite_code <> ''
               AND subscription_status IN ('active', 'trialing')
             ORDER BY updated_at DESC, id DESC
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, invite_code, status, updated_at) in rows {
            out.push(PendingIdentity {
                account_id: parse_account_id(&id)?,
                invite_code,
                subscription_active: parse_status(&status)?.is_active(),
                last_updated: from_millis(updated_at)?,
            });
        }
        Ok(out)
    }

    async fn lookup_account_by_invite(&self, code: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE invite_code = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(account_from_row).transpose()
    }

    async fn link_identity(
        &self,
        account_id: &AccountId,
        member_id: &MemberId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let member = member_id.to_string();
        let id = account_id.0.to_string();
        let at_ms = at.timestamp_millis();

        // One member maps to at most one account
        sqlx::query(
            "UPDATE accounts SET external_id = NULL, linked_at = NULL, updated_at = ?
             WHERE external_id = ? AND id <> ?",
        )
        .bind(at_ms)
        .bind(&member)
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let res = sqlx::query(
            "UPDATE accounts SET external_id = ?, linked_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&member)
        .bind(at_ms)
        .bind(at_ms)
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
            tx.rollback().await.map_err(backend)?;
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn unlink_identity(&self, member_id: &MemberId) -> Result<bool, StoreError> {
        let res = sqlx::query(
            "UPDATE accounts SET external_id = NULL, linked_at = NULL, updated_at = ?
             WHERE external_id = ?",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(member_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(res.rows_affected() > 0)
    }
}
