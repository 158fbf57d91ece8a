use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use crate::models::{
    Account, AccountChanges, District, EcoCode, FilterCriteria, IbanDraft, IbanView, Locality,
    NewAccount,
};

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The persistence contract for accounts, reference data and IBAN records.
/// Handlers and services only ever see `Arc<dyn Repository>`, which lets the
/// Postgres store and the in-memory store be swapped freely.
///
/// Every method is a single self-contained unit of work against the store.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_account_by_username(&self, username: &str) -> RepoResult<Option<Account>>;
    async fn get_account(&self, id: Uuid) -> RepoResult<Option<Account>>;
    async fn list_accounts(&self) -> RepoResult<Vec<Account>>;
    async fn count_accounts(&self) -> RepoResult<i64>;
    /// Whether another account (not `except`) already uses `username`.
    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> RepoResult<bool>;
    /// Whether another account (not `except`) already uses `email`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> RepoResult<bool>;
    async fn create_account(&self, account: NewAccount) -> RepoResult<Account>;
    async fn update_account(&self, id: Uuid, changes: AccountChanges)
    -> RepoResult<Option<Account>>;
    async fn delete_account(&self, id: Uuid) -> RepoResult<bool>;

    // --- Reference Data ---
    async fn list_eco_codes(&self) -> RepoResult<Vec<EcoCode>>;
    async fn list_districts(&self) -> RepoResult<Vec<District>>;
    /// Localities of one district; empty when the district has none or does not exist.
    async fn list_localities(&self, district_code: &str) -> RepoResult<Vec<Locality>>;
    async fn get_eco_code(&self, code: &str) -> RepoResult<Option<EcoCode>>;
    async fn get_district(&self, code: &str) -> RepoResult<Option<District>>;
    async fn get_locality(&self, district_code: &str, code: &str)
    -> RepoResult<Option<Locality>>;
    /// Every locality with this code, across all districts.
    async fn find_localities_by_code(&self, code: &str) -> RepoResult<Vec<Locality>>;

    // --- IBAN Records ---
    /// Records matching every supplied criterion, ordered by id ascending.
    async fn filter_ibans(&self, criteria: &FilterCriteria) -> RepoResult<Vec<IbanView>>;
    async fn get_iban(&self, id: i64) -> RepoResult<Option<IbanView>>;
    /// Id of the record occupying the (year, eco code, district, locality) slot, if any.
    async fn find_iban_in_slot(&self, draft: &IbanDraft) -> RepoResult<Option<i64>>;
    async fn create_iban(&self, draft: IbanDraft, created_by: Uuid) -> RepoResult<IbanView>;
    async fn update_iban(
        &self,
        id: i64,
        draft: IbanDraft,
        updated_by: Uuid,
    ) -> RepoResult<Option<IbanView>>;
    async fn delete_iban(&self, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const ACCOUNT_COLUMNS: &str = r#"
    a.id, a.username, a.password_hash, a.full_name, a.email, a.roles,
    a.district_code, d.name AS district_name, a.created_at
"#;

const IBAN_VIEW_COLUMNS: &str = r#"
    i.id, i.iban_code, i.year, i.eco_code, e.label AS eco_label,
    i.district_code, d.name AS district_name,
    i.locality_code, l.name AS locality_name
"#;

const IBAN_VIEW_JOINS: &str = r#"
    JOIN eco_codes e ON e.code = i.eco_code
    JOIN districts d ON d.code = i.district_code
    JOIN localities l ON l.district_code = i.district_code AND l.code = i.locality_code
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_account_by_username(&self, username: &str) -> RepoResult<Option<Account>> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts a \
             LEFT JOIN districts d ON d.code = a.district_code \
             WHERE a.username = $1"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts a \
             LEFT JOIN districts d ON d.code = a.district_code \
             WHERE a.id = $1"
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts a \
             LEFT JOIN districts d ON d.code = a.district_code \
             ORDER BY a.username ASC"
        );
        sqlx::query_as::<_, Account>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn count_accounts(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await
    }

    /// Inserts the account and joins the district name in the same statement (CTE).
    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        let query = format!(
            r#"
            WITH a AS (
                INSERT INTO accounts (id, username, password_hash, full_name, email, roles, district_code, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
                RETURNING *
            )
            SELECT {ACCOUNT_COLUMNS} FROM a LEFT JOIN districts d ON d.code = a.district_code
            "#
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(account.username)
            .bind(account.password_hash)
            .bind(account.full_name)
            .bind(account.email)
            .bind(account.roles.to_strings())
            .bind(account.district_code)
            .fetch_one(&self.pool)
            .await
    }

    /// Replaces the account fields. `COALESCE` keeps the stored hash when no new one is given.
    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepoResult<Option<Account>> {
        let query = format!(
            r#"
            WITH a AS (
                UPDATE accounts
                SET username = $2,
                    password_hash = COALESCE($3, password_hash),
                    full_name = $4,
                    email = $5,
                    roles = $6,
                    district_code = $7,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {ACCOUNT_COLUMNS} FROM a LEFT JOIN districts d ON d.code = a.district_code
            "#
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(changes.username)
            .bind(changes.password_hash)
            .bind(changes.full_name)
            .bind(changes.email)
            .bind(changes.roles.to_strings())
            .bind(changes.district_code)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_account(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_eco_codes(&self) -> RepoResult<Vec<EcoCode>> {
        sqlx::query_as::<_, EcoCode>("SELECT code, label FROM eco_codes ORDER BY code ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_districts(&self) -> RepoResult<Vec<District>> {
        sqlx::query_as::<_, District>("SELECT code, name FROM districts ORDER BY name ASC, code ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_localities(&self, district_code: &str) -> RepoResult<Vec<Locality>> {
        sqlx::query_as::<_, Locality>(
            "SELECT code, name, district_code FROM localities WHERE district_code = $1 ORDER BY name ASC, code ASC",
        )
        .bind(district_code)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_eco_code(&self, code: &str) -> RepoResult<Option<EcoCode>> {
        sqlx::query_as::<_, EcoCode>("SELECT code, label FROM eco_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_district(&self, code: &str) -> RepoResult<Option<District>> {
        sqlx::query_as::<_, District>("SELECT code, name FROM districts WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_locality(
        &self,
        district_code: &str,
        code: &str,
    ) -> RepoResult<Option<Locality>> {
        sqlx::query_as::<_, Locality>(
            "SELECT code, name, district_code FROM localities WHERE district_code = $1 AND code = $2",
        )
        .bind(district_code)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_localities_by_code(&self, code: &str) -> RepoResult<Vec<Locality>> {
        sqlx::query_as::<_, Locality>(
            "SELECT code, name, district_code FROM localities WHERE code = $1 ORDER BY district_code ASC",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
    }

    /// filter_ibans
    ///
    /// Builds the compound filter with `QueryBuilder` so every criterion is a bound
    /// parameter. Criteria are ANDed; absent ones add no clause.
    async fn filter_ibans(&self, criteria: &FilterCriteria) -> RepoResult<Vec<IbanView>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {IBAN_VIEW_COLUMNS} FROM ibans i {IBAN_VIEW_JOINS} WHERE TRUE"
        ));

        if let Some(year) = criteria.year {
            builder.push(" AND i.year = ");
            builder.push_bind(year);
        }
        if let Some(eco_code) = &criteria.eco_code {
            builder.push(" AND i.eco_code = ");
            builder.push_bind(eco_code.clone());
        }
        if let Some(district_code) = &criteria.district_code {
            builder.push(" AND i.district_code = ");
            builder.push_bind(district_code.clone());
        }
        if let Some(locality_code) = &criteria.locality_code {
            builder.push(" AND i.locality_code = ");
            builder.push_bind(locality_code.clone());
        }

        builder.push(" ORDER BY i.id ASC");

        builder
            .build_query_as::<IbanView>()
            .fetch_all(&self.pool)
            .await
    }

    async fn get_iban(&self, id: i64) -> RepoResult<Option<IbanView>> {
        let query =
            format!("SELECT {IBAN_VIEW_COLUMNS} FROM ibans i {IBAN_VIEW_JOINS} WHERE i.id = $1");
        sqlx::query_as::<_, IbanView>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_iban_in_slot(&self, draft: &IbanDraft) -> RepoResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT id FROM ibans
               WHERE year = $1 AND eco_code = $2 AND district_code = $3 AND locality_code = $4"#,
        )
        .bind(draft.year)
        .bind(&draft.eco_code)
        .bind(&draft.district_code)
        .bind(&draft.locality_code)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts the record and returns it joined with its display names (CTE).
    async fn create_iban(&self, draft: IbanDraft, created_by: Uuid) -> RepoResult<IbanView> {
        let query = format!(
            r#"
            WITH i AS (
                INSERT INTO ibans (iban_code, year, eco_code, district_code, locality_code, created_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                RETURNING *
            )
            SELECT {IBAN_VIEW_COLUMNS} FROM i {IBAN_VIEW_JOINS}
            "#
        );
        sqlx::query_as::<_, IbanView>(&query)
            .bind(draft.iban_code)
            .bind(draft.year)
            .bind(draft.eco_code)
            .bind(draft.district_code)
            .bind(draft.locality_code)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_iban(
        &self,
        id: i64,
        draft: IbanDraft,
        updated_by: Uuid,
    ) -> RepoResult<Option<IbanView>> {
        let query = format!(
            r#"
            WITH i AS (
                UPDATE ibans
                SET iban_code = $2,
                    year = $3,
                    eco_code = $4,
                    district_code = $5,
                    locality_code = $6,
                    updated_by = $7,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {IBAN_VIEW_COLUMNS} FROM i {IBAN_VIEW_JOINS}
            "#
        );
        sqlx::query_as::<_, IbanView>(&query)
            .bind(id)
            .bind(draft.iban_code)
            .bind(draft.year)
            .bind(draft.eco_code)
            .bind(draft.district_code)
            .bind(draft.locality_code)
            .bind(updated_by)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_iban(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM ibans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-Memory ---

struct StoredIban {
    draft: IbanDraft,
    created_by: Uuid,
    updated_by: Option<Uuid>,
}

#[derive(Default)]
struct MemoryData {
    districts: BTreeMap<String, District>,
    // Keyed by (district code, locality code).
    localities: BTreeMap<(String, String), Locality>,
    eco_codes: BTreeMap<String, EcoCode>,
    accounts: BTreeMap<Uuid, Account>,
    ibans: BTreeMap<i64, StoredIban>,
    next_iban_id: i64,
}

impl MemoryData {
    fn with_district_name(&self, mut account: Account) -> Account {
        account.district_name = account
            .district_code
            .as_ref()
            .and_then(|code| self.districts.get(code))
            .map(|district| district.name.clone());
        account
    }

    /// Joins a stored record with its reference data. Records whose references
    /// are missing are skipped, mirroring the inner joins of the SQL store.
    fn view(&self, id: i64, stored: &StoredIban) -> Option<IbanView> {
        let draft = &stored.draft;
        let eco = self.eco_codes.get(&draft.eco_code)?;
        let district = self.districts.get(&draft.district_code)?;
        let locality = self
            .localities
            .get(&(draft.district_code.clone(), draft.locality_code.clone()))?;
        Some(IbanView {
            id,
            iban_code: draft.iban_code.clone(),
            year: draft.year,
            eco_code: eco.code.clone(),
            eco_label: eco.label.clone(),
            district_code: district.code.clone(),
            district_name: district.name.clone(),
            locality_code: locality.code.clone(),
            locality_name: locality.name.clone(),
        })
    }
}

/// MemoryRepository
///
/// An in-process implementation of `Repository` used by the test suite and for
/// running the service without a database. Reference data is seeded through the
/// `with_*` builders.
#[derive(Default)]
pub struct MemoryRepository {
    data: RwLock<MemoryData>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_district(self, code: &str, name: &str) -> Self {
        self.write().districts.insert(
            code.to_string(),
            District {
                code: code.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn with_locality(self, district_code: &str, code: &str, name: &str) -> Self {
        self.write().localities.insert(
            (district_code.to_string(), code.to_string()),
            Locality {
                code: code.to_string(),
                name: name.to_string(),
                district_code: district_code.to_string(),
            },
        );
        self
    }

    pub fn with_eco_code(self, code: &str, label: &str) -> Self {
        self.write().eco_codes.insert(
            code.to_string(),
            EcoCode {
                code: code.to_string(),
                label: label.to_string(),
            },
        );
        self
    }

    /// Creator and last editor of a stored record, as the `created_by` and
    /// `updated_by` columns hold them in Postgres.
    pub fn authors_of(&self, id: i64) -> Option<(Uuid, Option<Uuid>)> {
        self.read()
            .ibans
            .get(&id)
            .map(|stored| (stored.created_by, stored.updated_by))
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_account_by_username(&self, username: &str) -> RepoResult<Option<Account>> {
        let data = self.read();
        Ok(data
            .accounts
            .values()
            .find(|account| account.username == username)
            .cloned()
            .map(|account| data.with_district_name(account)))
    }

    async fn get_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        let data = self.read();
        Ok(data
            .accounts
            .get(&id)
            .cloned()
            .map(|account| data.with_district_name(account)))
    }

    async fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        let data = self.read();
        let mut accounts: Vec<Account> = data
            .accounts
            .values()
            .cloned()
            .map(|account| data.with_district_name(account))
            .collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    async fn count_accounts(&self) -> RepoResult<i64> {
        Ok(self.read().accounts.len() as i64)
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> RepoResult<bool> {
        Ok(self
            .read()
            .accounts
            .values()
            .any(|account| account.username == username && Some(account.id) != except))
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> RepoResult<bool> {
        Ok(self
            .read()
            .accounts
            .values()
            .any(|account| account.email == email && Some(account.id) != except))
    }

    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        let mut data = self.write();
        let created = Account {
            id: Uuid::new_v4(),
            username: account.username,
            password_hash: account.password_hash,
            full_name: account.full_name,
            email: account.email,
            roles: account.roles,
            district_code: account.district_code,
            district_name: None,
            created_at: Utc::now(),
        };
        data.accounts.insert(created.id, created.clone());
        Ok(data.with_district_name(created))
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepoResult<Option<Account>> {
        let mut data = self.write();
        let Some(account) = data.accounts.get_mut(&id) else {
            return Ok(None);
        };
        account.username = changes.username;
        if let Some(hash) = changes.password_hash {
            account.password_hash = hash;
        }
        account.full_name = changes.full_name;
        account.email = changes.email;
        account.roles = changes.roles;
        account.district_code = changes.district_code;
        let updated = account.clone();
        Ok(Some(data.with_district_name(updated)))
    }

    async fn delete_account(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.write().accounts.remove(&id).is_some())
    }

    async fn list_eco_codes(&self) -> RepoResult<Vec<EcoCode>> {
        Ok(self.read().eco_codes.values().cloned().collect())
    }

    async fn list_districts(&self) -> RepoResult<Vec<District>> {
        let mut districts: Vec<District> = self.read().districts.values().cloned().collect();
        districts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(districts)
    }

    async fn list_localities(&self, district_code: &str) -> RepoResult<Vec<Locality>> {
        let mut localities: Vec<Locality> = self
            .read()
            .localities
            .values()
            .filter(|locality| locality.district_code == district_code)
            .cloned()
            .collect();
        localities.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(localities)
    }

    async fn get_eco_code(&self, code: &str) -> RepoResult<Option<EcoCode>> {
        Ok(self.read().eco_codes.get(code).cloned())
    }

    async fn get_district(&self, code: &str) -> RepoResult<Option<District>> {
        Ok(self.read().districts.get(code).cloned())
    }

    async fn get_locality(
        &self,
        district_code: &str,
        code: &str,
    ) -> RepoResult<Option<Locality>> {
        Ok(self
            .read()
            .localities
            .get(&(district_code.to_string(), code.to_string()))
            .cloned())
    }

    async fn find_localities_by_code(&self, code: &str) -> RepoResult<Vec<Locality>> {
        Ok(self
            .read()
            .localities
            .values()
            .filter(|locality| locality.code == code)
            .cloned()
            .collect())
    }

    async fn filter_ibans(&self, criteria: &FilterCriteria) -> RepoResult<Vec<IbanView>> {
        let data = self.read();
        // BTreeMap iteration is already id-ascending.
        Ok(data
            .ibans
            .iter()
            .filter(|(_, stored)| {
                let draft = &stored.draft;
                criteria.year.is_none_or(|year| draft.year == year)
                    && criteria
                        .eco_code
                        .as_ref()
                        .is_none_or(|code| &draft.eco_code == code)
                    && criteria
                        .district_code
                        .as_ref()
                        .is_none_or(|code| &draft.district_code == code)
                    && criteria
                        .locality_code
                        .as_ref()
                        .is_none_or(|code| &draft.locality_code == code)
            })
            .filter_map(|(id, stored)| data.view(*id, stored))
            .collect())
    }

    async fn get_iban(&self, id: i64) -> RepoResult<Option<IbanView>> {
        let data = self.read();
        Ok(data.ibans.get(&id).and_then(|stored| data.view(id, stored)))
    }

    async fn find_iban_in_slot(&self, draft: &IbanDraft) -> RepoResult<Option<i64>> {
        Ok(self
            .read()
            .ibans
            .iter()
            .find(|(_, stored)| {
                let existing = &stored.draft;
                existing.year == draft.year
                    && existing.eco_code == draft.eco_code
                    && existing.district_code == draft.district_code
                    && existing.locality_code == draft.locality_code
            })
            .map(|(id, _)| *id))
    }

    async fn create_iban(&self, draft: IbanDraft, created_by: Uuid) -> RepoResult<IbanView> {
        let mut data = self.write();
        data.next_iban_id += 1;
        let id = data.next_iban_id;
        data.ibans.insert(
            id,
            StoredIban {
                draft,
                created_by,
                updated_by: None,
            },
        );
        data.ibans
            .get(&id)
            .and_then(|stored| data.view(id, stored))
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_iban(
        &self,
        id: i64,
        draft: IbanDraft,
        updated_by: Uuid,
    ) -> RepoResult<Option<IbanView>> {
        let mut data = self.write();
        let Some(stored) = data.ibans.get_mut(&id) else {
            return Ok(None);
        };
        stored.draft = draft;
        stored.updated_by = Some(updated_by);
        Ok(data.ibans.get(&id).and_then(|stored| data.view(id, stored)))
    }

    async fn delete_iban(&self, id: i64) -> RepoResult<bool> {
        Ok(self.write().ibans.remove(&id).is_some())
    }
}
