//! # Repository Module
//!
//! Database repository implementations for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Table, Sixteen Entities                          │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.table::<Clients>().list(&params)                           │
//! │       ▼                                                                 │
//! │  Table<R: Resource>                                                    │
//! │  ├── get(&self, id)                                                    │
//! │  ├── list(&self, params)       search + status + sort + page           │
//! │  ├── delete(&self, id)                                                 │
//! │  └── insert / update           only for R: Writable                    │
//! │       │                                                                 │
//! │       │  SQL built from R::SELECT and the entity's ListSpec            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Entity specifics live in `impl Table<Clients> { ... }` blocks next    │
//! │  to each Resource (tax ID lookup, the issuance transaction, ...).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identifier Safety
//! Only identifiers from the static [`ListSpec`] allowlists and the
//! `Resource` constants are ever written into SQL text. Every user-supplied
//! value is bound.

use std::marker::PhantomData;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{FromRow, QueryBuilder, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use convenio_core::query::{ListParams, ListSpec, Page, Paginator, StatusCondition};
use convenio_core::schema::EntitySchema;

use crate::error::{DbError, DbResult};

pub mod agreement;
pub mod classification;
pub mod installment;
pub mod issuance;
pub mod product;
pub mod registry;
pub mod sale;

// =============================================================================
// Resource traits
// =============================================================================

/// A table that can be read, listed and deleted.
pub trait Resource: Send + Sync + 'static {
    /// The record one row of [`Resource::SELECT`] decodes into.
    type Record: for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Unpin + 'static;

    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Physical table name.
    const TABLE: &'static str;

    /// Read projection. Must expose `id` and every search/sort/status column
    /// of the entity's list specification (joined names included).
    const SELECT: &'static str;

    fn schema() -> &'static EntitySchema;
}

/// A table written straight from a cleaned form draft.
pub trait Writable: Resource {
    type Draft: Send + Sync;

    /// Whether updates bump a `version` column.
    const VERSIONED: bool = false;

    /// Column/value pairs written on insert and update (no id, no timestamps).
    fn row(draft: &Self::Draft) -> Vec<(&'static str, SqlValue)>;
}

// =============================================================================
// Bind values
// =============================================================================

/// A value bound into an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Int(Option<i64>),
    Bool(bool),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Option<&str>> for SqlValue {
    fn from(v: Option<&str>) -> Self {
        SqlValue::Text(v.map(str::to_string))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(Some(i64::from(v)))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(Some(v))
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(Some(v))
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => qb.push_bind(v),
        SqlValue::Int(v) => qb.push_bind(v),
        SqlValue::Bool(v) => qb.push_bind(v),
        SqlValue::Date(v) => qb.push_bind(v),
        SqlValue::Time(v) => qb.push_bind(v),
    };
}

/// Generates a new record ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Escapes `%`, `_` and the escape character itself for a LIKE pattern.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Lowercases ASCII and the uppercase Latin-1 letters (`À` to `Þ`, not `×`).
///
/// SQLite's `lower()` only folds ASCII, so search applies this same mapping
/// to both sides of the `LIKE`: here for the term, [`folded_column`] in SQL.
pub(crate) fn fold_case(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'A'..='Z' => c.to_ascii_lowercase(),
        'À'..='Þ' if c != '×' => char::from_u32(c as u32 + 0x20).unwrap_or(c),
        _ => c,
    }
}

/// SQL expression for `column` folded the way [`fold_case`] folds text.
fn folded_column(column: &str) -> String {
    ('À'..='Þ')
        .filter(|c| *c != '×')
        .fold(format!("lower({column})"), |expr, upper| {
            format!("replace({expr}, '{upper}', '{}')", fold_char(upper))
        })
}

/// Appends `WHERE` conditions for the search term and status filter.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, spec: &ListSpec, params: &ListParams) {
    qb.push(" WHERE 1 = 1");

    if let Some(term) = params.search.as_deref() {
        if !spec.search_fields.is_empty() {
            let pattern = format!("%{}%", escape_like(&fold_case(term)));
            qb.push(" AND (");
            for (i, field) in spec.search_fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(folded_column(&format!("t.{field}")))
                    .push(" LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
    }

    match params.status {
        Some(StatusCondition::Flag { column, value }) => {
            qb.push(" AND t.").push(column).push(" = ").push_bind(value);
        }
        Some(StatusCondition::Code { column, value }) => {
            qb.push(" AND t.").push(column).push(" = ").push_bind(value.to_string());
        }
        None => {}
    }
}

// =============================================================================
// Table
// =============================================================================

/// Generic repository over one [`Resource`].
#[derive(Debug)]
pub struct Table<R> {
    pool: SqlitePool,
    _resource: PhantomData<R>,
}

impl<R> Clone for Table<R> {
    fn clone(&self) -> Self {
        Table {
            pool: self.pool.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Table<R> {
    /// Creates a new repository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Table {
            pool,
            _resource: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Gets a record by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(record))` - Record found
    /// * `Ok(None)` - No such ID
    pub async fn get(&self, id: &str) -> DbResult<Option<R::Record>> {
        let sql = format!("SELECT * FROM ({}) AS t WHERE t.id = ?1", R::SELECT);
        let record = sqlx::query_as::<_, R::Record>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Gets a record by its ID, failing with `NotFound`.
    pub async fn require(&self, id: &str) -> DbResult<R::Record> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found(R::ENTITY, id))
    }

    /// Lists one page of records.
    ///
    /// ## How It Works
    /// ```text
    /// 1. COUNT(*) over the filtered projection
    /// 2. clamp the requested page against the total
    /// 3. SELECT ... ORDER BY <allowlisted column> <dir>, id LIMIT/OFFSET
    /// ```
    /// The secondary order on `id` keeps pages stable when the sort column
    /// has ties.
    pub async fn list(&self, params: &ListParams) -> DbResult<Page<R::Record>> {
        let spec = &R::schema().list;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM (");
        count.push(R::SELECT).push(") AS t");
        push_filters(&mut count, spec, params);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let paginator = Paginator::new(total.max(0) as u64, params.per_page);
        let page = paginator.clamp(params.page.as_deref());

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM (");
        select.push(R::SELECT).push(") AS t");
        push_filters(&mut select, spec, params);
        select
            .push(" ORDER BY t.")
            .push(params.sort_by)
            .push(" ")
            .push(params.order.as_sql())
            .push(", t.id ASC LIMIT ")
            .push_bind(i64::from(paginator.per_page()))
            .push(" OFFSET ")
            .push_bind(paginator.offset(page) as i64);

        let items = select
            .build_query_as::<R::Record>()
            .fetch_all(&self.pool)
            .await?;

        debug!(
            entity = R::ENTITY,
            total,
            page,
            returned = items.len(),
            "Listed records"
        );

        Ok(Page::new(items, params, paginator, page))
    }

    /// Deletes a record.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such ID
    /// * `Err(DbError::ForeignKeyViolation)` - Other records still reference it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(entity = R::ENTITY, id = %id, "Deleting record");

        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(R::ENTITY, id));
        }

        Ok(())
    }

    /// Counts all rows (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

impl<R: Writable> Table<R> {
    /// Inserts a record from a cleaned draft and returns it as stored.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - A unique code already exists
    pub async fn insert(&self, draft: &R::Draft) -> DbResult<R::Record> {
        let id = generate_id();
        let now = Utc::now();
        debug!(entity = R::ENTITY, id = %id, "Inserting record");

        let row = R::row(draft);
        let mut qb = QueryBuilder::<Sqlite>::new("INSERT INTO ");
        qb.push(R::TABLE).push(" (id");
        for (column, _) in &row {
            qb.push(", ").push(column);
        }
        qb.push(", created_at, updated_at) VALUES (").push_bind(id.clone());
        for (_, value) in row {
            qb.push(", ");
            push_value(&mut qb, value);
        }
        qb.push(", ").push_bind(now).push(", ").push_bind(now).push(")");

        qb.build().execute(&self.pool).await?;

        self.require(&id).await
    }

    /// Updates a record from a cleaned draft and returns it as stored.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such ID
    pub async fn update(&self, id: &str, draft: &R::Draft) -> DbResult<R::Record> {
        debug!(entity = R::ENTITY, id = %id, "Updating record");

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE ");
        qb.push(R::TABLE).push(" SET ");
        for (column, value) in R::row(draft) {
            qb.push(column).push(" = ");
            push_value(&mut qb, value);
            qb.push(", ");
        }
        if R::VERSIONED {
            qb.push("version = version + 1, ");
        }
        qb.push("updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE id = ")
            .push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(R::ENTITY, id));
        }

        self.require(id).await
    }
}

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod testing {
    use convenio_core::forms::{AgreementDraft, ClientDraft};
    use convenio_core::money::Money;
    use convenio_core::types::Percentage;
    use convenio_core::validation::compute_client_balance;

    use crate::pool::{Database, DbConfig};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn client_draft(code: &str, tax_id: &str, name: &str, salary_cents: i64) -> ClientDraft {
        let salary = Money::from_cents(salary_cents);
        let percentage = Percentage::from_hundredths(3000);
        ClientDraft {
            internal_code: code.to_string(),
            registration: None,
            cancelled: false,
            full_name: name.to_string(),
            tax_id: tax_id.to_string(),
            rg: None,
            phone: None,
            email: format!("{}@example.com", code.to_lowercase()),
            street: None,
            postal_code: None,
            city: "Curitiba".to_string(),
            state: "PR".to_string(),
            salary,
            percentage,
            balance: compute_client_balance(salary, percentage),
        }
    }

    pub fn agreement_draft(name: &str, tax_id: &str, max_installments: i32) -> AgreementDraft {
        AgreementDraft {
            store_code: Some(1),
            name: name.to_string(),
            tax_id: tax_id.to_string(),
            contact: None,
            email: None,
            phone: None,
            active: true,
            max_installments,
            event_code: None,
            logo_ref: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Ana"), "Ana");
    }

    #[test]
    fn test_fold_case_covers_latin1_letters() {
        assert_eq!(fold_case("JOÃO ÁVILA"), "joão ávila");
        assert_eq!(fold_case("ÇÉÑÜ Þ"), "çéñü þ");
        // the multiplication sign has no lowercase
        assert_eq!(fold_case("2×3"), "2×3");
        assert_eq!(fold_case("Łódź"), "Łódź");
    }

    #[test]
    fn test_folded_column_wraps_lower() {
        let expr = folded_column("t.full_name");
        assert!(expr.starts_with("replace(replace("));
        assert!(expr.contains("lower(t.full_name)"));
        assert!(expr.contains("'Ã', 'ã'"));
        assert!(!expr.contains('×'));
    }
}
