//! # Classification Repositories
//!
//! Sectors, categories, product groups, sub-groups and the fiscal code
//! tables (NCM, CFOP, CEST, CST/CSOSN).
//!
//! Sectors, categories and groups share one record and draft shape; each
//! gets its own marker type because each lives in its own table.

use convenio_core::catalog::{Cest, Cfop, Classification, CstCson, Ncm, SubGroup};
use convenio_core::forms::{
    CestDraft, CfopDraft, ClassificationDraft, CstCsonDraft, NcmDraft, SubGroupDraft,
};
use convenio_core::schema::{self, EntitySchema};

use super::{Resource, SqlValue, Writable};

fn classification_row(d: &ClassificationDraft) -> Vec<(&'static str, SqlValue)> {
    vec![
        ("code", d.code.clone().into()),
        ("description", d.description.clone().into()),
        ("cancelled", d.cancelled.into()),
    ]
}

macro_rules! classification_table {
    ($(#[$meta:meta])* $name:ident, $entity:literal, $table:literal, $schema:path) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name;

        impl Resource for $name {
            type Record = Classification;
            const ENTITY: &'static str = $entity;
            const TABLE: &'static str = $table;
            const SELECT: &'static str = concat!("SELECT * FROM ", $table);

            fn schema() -> &'static EntitySchema {
                &$schema
            }
        }

        impl Writable for $name {
            type Draft = ClassificationDraft;

            fn row(draft: &ClassificationDraft) -> Vec<(&'static str, SqlValue)> {
                classification_row(draft)
            }
        }
    };
}

classification_table!(
    /// The `sectors` table.
    Sectors, "Sector", "sectors", schema::SECTOR
);
classification_table!(
    /// The `categories` table.
    Categories, "Category", "categories", schema::CATEGORY
);
classification_table!(
    /// The `product_groups` table.
    ProductGroups, "Group", "product_groups", schema::GROUP
);

// =============================================================================
// Sub-groups
// =============================================================================

/// The `sub_groups` table, read with its parent group's description.
#[derive(Debug)]
pub struct SubGroups;

impl Resource for SubGroups {
    type Record = SubGroup;
    const ENTITY: &'static str = "Sub-group";
    const TABLE: &'static str = "sub_groups";
    const SELECT: &'static str = "SELECT s.*, g.description AS group_description \
         FROM sub_groups s JOIN product_groups g ON g.id = s.group_id";

    fn schema() -> &'static EntitySchema {
        &schema::SUB_GROUP
    }
}

impl Writable for SubGroups {
    type Draft = SubGroupDraft;

    fn row(d: &SubGroupDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("group_id", d.group_id.clone().into()),
            ("name", d.name.clone().into()),
            ("status", d.status.code().into()),
        ]
    }
}

// =============================================================================
// Fiscal tables
// =============================================================================

/// The `ncms` table.
#[derive(Debug)]
pub struct Ncms;

impl Resource for Ncms {
    type Record = Ncm;
    const ENTITY: &'static str = "NCM";
    const TABLE: &'static str = "ncms";
    const SELECT: &'static str = "SELECT * FROM ncms";

    fn schema() -> &'static EntitySchema {
        &schema::NCM
    }
}

impl Writable for Ncms {
    type Draft = NcmDraft;

    fn row(d: &NcmDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("code", d.code.clone().into()),
            ("description", d.description.clone().into()),
            ("valid_from", d.valid_from.into()),
            ("valid_until", d.valid_until.into()),
            ("year", d.year.clone().into()),
            ("number", d.number.clone().into()),
            ("segment", d.segment.clone().into()),
            ("cancelled", d.cancelled.into()),
        ]
    }
}

/// The `cfops` table.
#[derive(Debug)]
pub struct Cfops;

impl Resource for Cfops {
    type Record = Cfop;
    const ENTITY: &'static str = "CFOP";
    const TABLE: &'static str = "cfops";
    const SELECT: &'static str = "SELECT * FROM cfops";

    fn schema() -> &'static EntitySchema {
        &schema::CFOP
    }
}

impl Writable for Cfops {
    type Draft = CfopDraft;

    fn row(d: &CfopDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("code", d.code.clone().into()),
            ("category", d.category.clone().into()),
            ("description", d.description.clone().into()),
            ("cancelled", d.cancelled.into()),
        ]
    }
}

/// The `cests` table.
#[derive(Debug)]
pub struct Cests;

impl Resource for Cests {
    type Record = Cest;
    const ENTITY: &'static str = "CEST";
    const TABLE: &'static str = "cests";
    const SELECT: &'static str = "SELECT * FROM cests";

    fn schema() -> &'static EntitySchema {
        &schema::CEST
    }
}

impl Writable for Cests {
    type Draft = CestDraft;

    fn row(d: &CestDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("code", d.code.clone().into()),
            ("description", d.description.clone().into()),
            ("ncm_code", d.ncm_code.clone().into()),
            ("cancelled", d.cancelled.into()),
        ]
    }
}

/// The `cst_csons` table.
#[derive(Debug)]
pub struct CstCsons;

impl Resource for CstCsons {
    type Record = CstCson;
    const ENTITY: &'static str = "CST/CSOSN";
    const TABLE: &'static str = "cst_csons";
    const SELECT: &'static str = "SELECT * FROM cst_csons";

    fn schema() -> &'static EntitySchema {
        &schema::CST_CSON
    }
}

impl Writable for CstCsons {
    type Draft = CstCsonDraft;

    fn row(d: &CstCsonDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("code", d.code.clone().into()),
            ("description", d.description.clone().into()),
            ("regime", d.regime.code().into()),
            ("cancelled", d.cancelled.into()),
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::testing::database;
    use convenio_core::query::{ListParams, ListRequest, PageSizing};
    use convenio_core::types::{RecordStatus, TaxRegime};

    fn group(code: &str, description: &str) -> ClassificationDraft {
        ClassificationDraft {
            code: code.into(),
            description: description.into(),
            cancelled: false,
        }
    }

    #[tokio::test]
    async fn test_classification_tables_are_separate() {
        let db = database().await;
        db.table::<Sectors>().insert(&group("01", "Bakery")).await.unwrap();
        db.table::<Categories>().insert(&group("01", "Bakery")).await.unwrap();

        assert_eq!(db.table::<Sectors>().count().await.unwrap(), 1);
        assert_eq!(db.table::<Categories>().count().await.unwrap(), 1);
        assert_eq!(db.table::<ProductGroups>().count().await.unwrap(), 0);

        let err = db.table::<Sectors>().insert(&group("01", "Other")).await.unwrap_err();
        assert_eq!(err.unique_column(), Some("code"));
    }

    #[tokio::test]
    async fn test_sub_group_joins_group_and_cascades() {
        let db = database().await;
        let groups = db.table::<ProductGroups>();
        let sub_groups = db.table::<SubGroups>();

        let parent = groups.insert(&group("10", "Drinks")).await.unwrap();
        let child = sub_groups
            .insert(&SubGroupDraft {
                group_id: parent.id.clone(),
                name: "Juices".into(),
                status: RecordStatus::Active,
            })
            .await
            .unwrap();
        assert_eq!(child.group_description, "Drinks");

        let params = ListParams::resolve(
            &ListRequest {
                search: Some("drink".into()),
                ..Default::default()
            },
            &schema::SUB_GROUP.list,
            PageSizing::default(),
        );
        assert_eq!(sub_groups.list(&params).await.unwrap().pagination.total, 1);

        groups.delete(&parent.id).await.unwrap();
        assert!(sub_groups.get(&child.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fiscal_status_filter() {
        let db = database().await;
        let cfops = db.table::<Cfops>();
        cfops
            .insert(&CfopDraft {
                code: "5102".into(),
                category: "Saída".into(),
                description: "Venda de mercadoria".into(),
                cancelled: false,
            })
            .await
            .unwrap();
        cfops
            .insert(&CfopDraft {
                code: "5405".into(),
                category: "Saída".into(),
                description: "Venda com ST".into(),
                cancelled: true,
            })
            .await
            .unwrap();

        let params = ListParams::resolve(
            &ListRequest {
                status: Some("true".into()),
                ..Default::default()
            },
            &schema::CFOP.list,
            PageSizing::default(),
        );
        let page = cfops.list(&params).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].code, "5405");
    }

    #[tokio::test]
    async fn test_cst_cson_regime_round_trips_as_code() {
        let db = database().await;
        let stored = db
            .table::<CstCsons>()
            .insert(&CstCsonDraft {
                code: "102".into(),
                description: "Tributada sem permissão de crédito".into(),
                regime: TaxRegime::SimplesNacional,
                cancelled: false,
            })
            .await
            .unwrap();
        assert_eq!(stored.regime, TaxRegime::SimplesNacional);

        let err = db.table::<Ncms>().delete("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
