//! # Sale Repository
//!
//! Sales settled through an issuance. The client and agreement columns are
//! copied from the issuance when the form is cleaned, so the row never
//! needs a second hop to find them.

use convenio_core::catalog::Sale;
use convenio_core::forms::SaleDraft;
use convenio_core::schema::{self, EntitySchema};

use super::{Resource, SqlValue, Writable};

/// The `sales` table, read with user, client and agreement names.
#[derive(Debug)]
pub struct Sales;

impl Resource for Sales {
    type Record = Sale;
    const ENTITY: &'static str = "Sale";
    const TABLE: &'static str = "sales";
    const SELECT: &'static str = "SELECT s.*, u.username AS username, \
         c.full_name AS client_name, a.name AS agreement_name \
         FROM sales s \
         JOIN users u ON u.id = s.user_id \
         JOIN clients c ON c.id = s.client_id \
         JOIN agreements a ON a.id = s.agreement_id";

    fn schema() -> &'static EntitySchema {
        &schema::SALE
    }
}

impl Writable for Sales {
    type Draft = SaleDraft;

    fn row(d: &SaleDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("user_id", d.user_id.clone().into()),
            ("issuance_id", d.issuance_id.clone().into()),
            ("client_id", d.client_id.clone().into()),
            ("agreement_id", d.agreement_id.clone().into()),
            ("sale_date", d.sale_date.into()),
            ("sale_time", d.sale_time.into()),
            ("value_cents", d.value.cents().into()),
            ("installments", d.installments.into()),
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
