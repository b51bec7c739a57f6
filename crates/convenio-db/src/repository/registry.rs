//! # Registry Repositories
//!
//! Clients, companies and users.
//!
//! ## Client Lookup by Tax ID
//! ```text
//! "123.456.789-01" ──► digits ──► SELECT ... WHERE tax_id = ?1 LIMIT 2
//!                                        │
//!                      ┌─────────────────┼──────────────────┐
//!                      ▼                 ▼                  ▼
//!                   0 rows            1 row              2 rows
//!                  not found          found        data-integrity error
//! ```
//! Fetching two rows is enough to tell "unique" from "ambiguous" without
//! reading every duplicate.

use tracing::debug;

use convenio_core::catalog::{Client, Company, User};
use convenio_core::forms::{ClientDraft, CompanyDraft, UserDraft};
use convenio_core::schema::{self, EntitySchema};

use super::{Resource, SqlValue, Table, Writable};
use crate::error::DbResult;

// =============================================================================
// Clients
// =============================================================================

/// The `clients` table.
#[derive(Debug)]
pub struct Clients;

impl Resource for Clients {
    type Record = Client;
    const ENTITY: &'static str = "Client";
    const TABLE: &'static str = "clients";
    const SELECT: &'static str = "SELECT * FROM clients";

    fn schema() -> &'static EntitySchema {
        &schema::CLIENT
    }
}

impl Writable for Clients {
    type Draft = ClientDraft;

    // Saving a client recomputes its balance, which issuances depend on.
    const VERSIONED: bool = true;

    fn row(d: &ClientDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("internal_code", d.internal_code.clone().into()),
            ("registration", d.registration.clone().into()),
            ("cancelled", d.cancelled.into()),
            ("full_name", d.full_name.clone().into()),
            ("tax_id", d.tax_id.clone().into()),
            ("rg", d.rg.clone().into()),
            ("phone", d.phone.clone().into()),
            ("email", d.email.clone().into()),
            ("street", d.street.clone().into()),
            ("postal_code", d.postal_code.clone().into()),
            ("city", d.city.clone().into()),
            ("state", d.state.clone().into()),
            ("salary_cents", d.salary.cents().into()),
            ("percentage_hundredths", d.percentage.hundredths().into()),
            ("balance_cents", d.balance.cents().into()),
        ]
    }
}

impl Table<Clients> {
    /// Clients carrying exactly this digits-only tax ID, at most two.
    ///
    /// ## Example
    /// ```rust,ignore
    /// match db.clients().find_by_tax_id("12345678901").await?.as_slice() {
    ///     [] => { /* not found */ }
    ///     [client] => { /* unique */ }
    ///     _ => { /* ambiguous */ }
    /// }
    /// ```
    pub async fn find_by_tax_id(&self, digits: &str) -> DbResult<Vec<Client>> {
        debug!(tax_id = %digits, "Looking up clients by tax ID");

        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE tax_id = ?1 ORDER BY created_at, id LIMIT 2",
        )
        .bind(digits)
        .fetch_all(self.pool())
        .await?;

        Ok(clients)
    }
}

// =============================================================================
// Companies
// =============================================================================

/// The `companies` table.
#[derive(Debug)]
pub struct Companies;

impl Resource for Companies {
    type Record = Company;
    const ENTITY: &'static str = "Company";
    const TABLE: &'static str = "companies";
    const SELECT: &'static str = "SELECT * FROM companies";

    fn schema() -> &'static EntitySchema {
        &schema::COMPANY
    }
}

impl Writable for Companies {
    type Draft = CompanyDraft;

    fn row(d: &CompanyDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("store_code", d.store_code.clone().into()),
            ("tax_id", d.tax_id.clone().into()),
            ("state_registration", d.state_registration.clone().into()),
            ("size", d.size.map(|s| s.code()).into()),
            ("situation", d.situation.code().into()),
            ("opened_on", d.opened_on.into()),
            ("name", d.name.clone().into()),
            ("legal_name", d.legal_name.clone().into()),
            ("trade_name", d.trade_name.clone().into()),
            ("contact", d.contact.clone().into()),
            ("phone", d.phone.clone().into()),
            ("email", d.email.clone().into()),
            ("street", d.street.clone().into()),
            ("number", d.number.clone().into()),
            ("district", d.district.clone().into()),
            ("city", d.city.clone().into()),
            ("state", d.state.clone().into()),
            ("postal_code", d.postal_code.clone().into()),
            ("main_cnae", d.main_cnae.clone().into()),
            ("simples_rate_hundredths", d.simples_rate.map(|p| p.hundredths()).into()),
            ("tax_regime", d.tax_regime.code().into()),
            ("cancelled", d.cancelled.into()),
        ]
    }
}

// =============================================================================
// Users
// =============================================================================

/// The `users` table.
#[derive(Debug)]
pub struct Users;

impl Resource for Users {
    type Record = User;
    const ENTITY: &'static str = "User";
    const TABLE: &'static str = "users";
    const SELECT: &'static str = "SELECT * FROM users";

    fn schema() -> &'static EntitySchema {
        &schema::USER
    }
}

impl Writable for Users {
    type Draft = UserDraft;

    /// The hash is only written when the draft carries one, so an update
    /// without a new password keeps the stored hash.
    fn row(d: &UserDraft) -> Vec<(&'static str, SqlValue)> {
        let mut row: Vec<(&'static str, SqlValue)> = vec![
            ("company_id", d.company_id.clone().into()),
            ("access_level", d.access_level.code().into()),
            ("permission", d.permission.code().into()),
            ("name", d.name.clone().into()),
            ("username", d.username.clone().into()),
            ("cancelled", d.cancelled.into()),
        ];
        if let Some(hash) = &d.password_hash {
            row.push(("password_hash", hash.clone().into()));
        }
        row
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::{client_draft, database};
    use convenio_core::query::{ListParams, ListRequest, PageSizing};
    use convenio_core::types::{AccessLevel, Permission};

    fn params(request: ListRequest) -> ListParams {
        ListParams::resolve(&request, &schema::CLIENT.list, PageSizing::default())
    }

    #[tokio::test]
    async fn test_insert_and_get_client() {
        let db = database().await;
        let clients = db.clients();

        let created = clients
            .insert(&client_draft("C001", "12345678901", "Ana Souza", 300_000))
            .await
            .unwrap();

        assert_eq!(created.balance_cents, 90_000);
        assert_eq!(created.version, 0);

        let fetched = clients.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.full_name, "Ana Souza");
        assert!(clients.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tax_id_is_unique_violation() {
        let db = database().await;
        let clients = db.clients();

        clients
            .insert(&client_draft("C001", "12345678901", "Ana Souza", 100_000))
            .await
            .unwrap();
        let err = clients
            .insert(&client_draft("C002", "12345678901", "Bruno Lima", 100_000))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.unique_column(), Some("tax_id"));
    }

    #[tokio::test]
    async fn test_find_by_tax_id() {
        let db = database().await;
        let clients = db.clients();
        clients
            .insert(&client_draft("C001", "12345678901", "Ana Souza", 100_000))
            .await
            .unwrap();

        let found = clients.find_by_tax_id("12345678901").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_name, "Ana Souza");

        // same answer twice
        let again = clients.find_by_tax_id("12345678901").await.unwrap();
        assert_eq!(found, again);

        assert!(clients.find_by_tax_id("99999999999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_recomputes_and_bumps_version() {
        let db = database().await;
        let clients = db.clients();
        let created = clients
            .insert(&client_draft("C001", "12345678901", "Ana Souza", 100_000))
            .await
            .unwrap();

        let updated = clients
            .update(&created.id, &client_draft("C001", "12345678901", "Ana Souza", 200_000))
            .await
            .unwrap();

        assert_eq!(updated.balance_cents, 60_000);
        assert_eq!(updated.version, created.version + 1);

        let err = clients
            .update("missing", &client_draft("C009", "1", "X", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_search_sort_and_page_clamp() {
        let db = database().await;
        let clients = db.clients();
        for (i, name) in ["Carla Dias", "ana souza", "Bruno Lima", "Ana Paula"].iter().enumerate() {
            clients
                .insert(&client_draft(
                    &format!("C{i:03}"),
                    &format!("1234567890{i}"),
                    name,
                    100_000 * (i as i64 + 1),
                ))
                .await
                .unwrap();
        }

        // case-insensitive containment
        let page = clients
            .list(&params(ListRequest {
                search: Some("ANA".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);

        // accented letters fold too
        let joao = clients
            .insert(&client_draft("C010", "98765432100", "JOÃO ÁVILA", 100_000))
            .await
            .unwrap();
        for term in ["joão", "JOÃO", "ávila", "João Ávila"] {
            let page = clients
                .list(&params(ListRequest {
                    search: Some(term.into()),
                    ..Default::default()
                }))
                .await
                .unwrap();
            assert_eq!(page.pagination.total, 1, "search {term:?}");
            assert_eq!(page.items[0].full_name, "JOÃO ÁVILA");
        }
        clients.delete(&joao.id).await.unwrap();

        // unknown sort falls back to full_name ascending
        let page = clients
            .list(&params(ListRequest {
                sort_by: Some("password".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.filters.sort_by, "full_name");
        assert_eq!(page.items[0].full_name, "Ana Paula");

        // descending balance
        let page = clients
            .list(&params(ListRequest {
                sort: Some("-balance_cents".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.items[0].full_name, "Ana Paula");
        assert_eq!(page.items[3].full_name, "Carla Dias");

        // page far past the end clamps to the last page
        let page = clients
            .list(&params(ListRequest {
                per_page: Some("2".into()),
                page: Some("9999".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.items.len(), 2);

        // non-integer page is the first page
        let page = clients
            .list(&params(ListRequest {
                per_page: Some("2".into()),
                page: Some("two".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.pagination.page, 1);
    }

    #[tokio::test]
    async fn test_list_status_filter() {
        let db = database().await;
        let clients = db.clients();
        let mut cancelled = client_draft("C001", "11111111111", "Ana Souza", 100_000);
        cancelled.cancelled = true;
        clients.insert(&cancelled).await.unwrap();
        clients
            .insert(&client_draft("C002", "22222222222", "Bruno Lima", 100_000))
            .await
            .unwrap();

        let page = clients
            .list(&params(ListRequest {
                status: Some("cancelado".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.filters.status.as_deref(), Some("cancelado"));

        // unknown status word filters nothing
        let page = clients
            .list(&params(ListRequest {
                status: Some("whatever".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.filters.status, None);
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let db = database().await;
        let clients = db.clients();
        clients
            .insert(&client_draft("C001", "11111111111", "Ana Souza", 100_000))
            .await
            .unwrap();

        let page = clients
            .list(&params(ListRequest {
                search: Some("%".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_user_update_keeps_hash_without_new_password() {
        let db = database().await;
        let users = db.table::<Users>();

        let mut draft = UserDraft {
            company_id: None,
            access_level: AccessLevel::Operator,
            permission: Permission::Partial,
            name: "Maria".into(),
            username: "maria".into(),
            password: None,
            password_hash: Some("$argon2id$stub".into()),
            cancelled: false,
        };
        let created = users.insert(&draft).await.unwrap();

        draft.password_hash = None;
        draft.name = "Maria Clara".into();
        let updated = users.update(&created.id, &draft).await.unwrap();

        assert_eq!(updated.name, "Maria Clara");
        assert_eq!(updated.password_hash, "$argon2id$stub");
    }
}
