//! # Agreement Repositories
//!
//! Agreements and their billing-period openings.
//!
//! ## Opening Sort Key
//! ```text
//! reference_month  "07/2025"  ──►  reference_key  "202507"
//! ```
//! Openings are stored with the display form of the month; the list
//! projection derives a `YYYYMM` key so "newest month first" sorts across
//! years.

use convenio_core::catalog::{Agreement, AgreementOpening};
use convenio_core::forms::{AgreementDraft, OpeningDraft};
use convenio_core::schema::{self, EntitySchema};

use super::{Resource, SqlValue, Writable};

/// The `agreements` table.
#[derive(Debug)]
pub struct Agreements;

impl Resource for Agreements {
    type Record = Agreement;
    const ENTITY: &'static str = "Agreement";
    const TABLE: &'static str = "agreements";
    const SELECT: &'static str = "SELECT * FROM agreements";

    fn schema() -> &'static EntitySchema {
        &schema::AGREEMENT
    }
}

impl Writable for Agreements {
    type Draft = AgreementDraft;

    fn row(d: &AgreementDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("store_code", d.store_code.into()),
            ("name", d.name.clone().into()),
            ("tax_id", d.tax_id.clone().into()),
            ("contact", d.contact.clone().into()),
            ("email", d.email.clone().into()),
            ("phone", d.phone.clone().into()),
            ("active", d.active.into()),
            ("max_installments", d.max_installments.into()),
            ("event_code", d.event_code.clone().into()),
            ("logo_ref", d.logo_ref.clone().into()),
        ]
    }
}

/// The `agreement_openings` table.
#[derive(Debug)]
pub struct AgreementOpenings;

impl Resource for AgreementOpenings {
    type Record = AgreementOpening;
    const ENTITY: &'static str = "Agreement opening";
    const TABLE: &'static str = "agreement_openings";
    const SELECT: &'static str = "SELECT o.*, \
         substr(o.reference_month, 4, 4) || substr(o.reference_month, 1, 2) AS reference_key \
         FROM agreement_openings o";

    fn schema() -> &'static EntitySchema {
        &schema::AGREEMENT_OPENING
    }
}

impl Writable for AgreementOpenings {
    type Draft = OpeningDraft;

    fn row(d: &OpeningDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("reference_month", d.reference_month.display().into()),
            ("status", d.status.code().into()),
            ("opened_on", d.opened_on.into()),
            ("closed_on", d.closed_on.into()),
            ("paid_on", d.paid_on.into()),
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{agreement_draft, database};
    use chrono::NaiveDate;
    use convenio_core::query::{ListParams, ListRequest, PageSizing};
    use convenio_core::types::{OpeningStatus, ReferenceMonth};

    fn opening(month: u32, year: i32, status: OpeningStatus) -> OpeningDraft {
        OpeningDraft {
            reference_month: ReferenceMonth::new(month, year, 1900, 2100).unwrap(),
            status,
            opened_on: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            closed_on: None,
            paid_on: None,
        }
    }

    #[tokio::test]
    async fn test_agreement_round_trip() {
        let db = database().await;
        let agreement = db
            .agreements()
            .insert(&agreement_draft("Prefeitura", "12345678000195", 6))
            .await
            .unwrap();

        assert_eq!(agreement.max_installments, 6);
        assert!(agreement.active);
        assert_eq!(agreement.store_code, Some(1));
    }

    #[tokio::test]
    async fn test_openings_sort_newest_month_first() {
        let db = database().await;
        let openings = db.table::<AgreementOpenings>();
        openings.insert(&opening(12, 2024, OpeningStatus::Closed)).await.unwrap();
        openings.insert(&opening(2, 2025, OpeningStatus::Open)).await.unwrap();
        openings.insert(&opening(11, 2024, OpeningStatus::Closed)).await.unwrap();

        let params = ListParams::resolve(
            &ListRequest::default(),
            &schema::AGREEMENT_OPENING.list,
            PageSizing::default(),
        );
        let page = openings.list(&params).await.unwrap();
        let months: Vec<&str> = page.items.iter().map(|o| o.reference_month.as_str()).collect();
        assert_eq!(months, vec!["02/2025", "12/2024", "11/2024"]);

        let params = ListParams::resolve(
            &ListRequest {
                status: Some("F".into()),
                ..Default::default()
            },
            &schema::AGREEMENT_OPENING.list,
            PageSizing::default(),
        );
        assert_eq!(openings.list(&params).await.unwrap().pagination.total, 2);
    }
}
