//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Classification Links
//! ```text
//! products ──(set null)──► sectors, product_groups, sub_groups,
//!                          ncms, cfops, cests, cst_csons
//! ```
//! Deleting a classification row leaves the product in place with the
//! link cleared.

use convenio_core::catalog::Product;
use convenio_core::forms::ProductDraft;
use convenio_core::schema::{self, EntitySchema};

use super::{Resource, SqlValue, Writable};

/// The `products` table.
#[derive(Debug)]
pub struct Products;

impl Resource for Products {
    type Record = Product;
    const ENTITY: &'static str = "Product";
    const TABLE: &'static str = "products";
    const SELECT: &'static str = "SELECT * FROM products";

    fn schema() -> &'static EntitySchema {
        &schema::PRODUCT
    }
}

impl Writable for Products {
    type Draft = ProductDraft;

    fn row(d: &ProductDraft) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("ean_code", d.ean_code.clone().into()),
            ("description", d.description.clone().into()),
            ("pos_description", d.pos_description.clone().into()),
            ("sale_unit", d.sale_unit.code().into()),
            ("package_qty_thousandths", d.package_qty.thousandths().into()),
            ("kind", d.kind.code().into()),
            ("weighed", d.weighed.into()),
            ("multipliable", d.multipliable.into()),
            ("own_use", d.own_use.into()),
            ("situation", d.situation.code().into()),
            ("icms_rate_hundredths", d.icms_rate.map(|p| p.hundredths()).into()),
            ("stock_thousandths", d.stock.thousandths().into()),
            ("net_weight_thousandths", d.net_weight.map(|q| q.thousandths()).into()),
            ("gross_weight_thousandths", d.gross_weight.map(|q| q.thousandths()).into()),
            ("price_cents", d.price.cents().into()),
            ("classification", d.classification.clone().into()),
            ("taxation", d.taxation.code().into()),
            ("sector_id", d.sector_id.clone().into()),
            ("group_id", d.group_id.clone().into()),
            ("sub_group_id", d.sub_group_id.clone().into()),
            ("cfop_id", d.cfop_id.clone().into()),
            ("cst_cson_id", d.cst_cson_id.clone().into()),
            ("ncm_id", d.ncm_id.clone().into()),
            ("cest_id", d.cest_id.clone().into()),
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
    use crate::repository::classification::Sectors;
    use crate::repository::testing::database;
    use convenio_core::forms::{clean_product, ClassificationDraft};
    use convenio_core::query::{ListParams, ListRequest, PageSizing};
    use convenio_core::types::{ProductKind, ProductSituation};
    use convenio_core::RawForm;

    fn draft(ean: &str, description: &str) -> ProductDraft {
        let form = RawForm::new()
            .with("ean_code", ean)
            .with("description", description)
            .with("price", "12,50")
            .with("stock", "3,5");
        clean_product(&form).unwrap()
    }

    #[tokio::test]
    async fn test_insert_product_with_scaled_values() {
        let db = database().await;
        let product = db.table::<Products>().insert(&draft("7891000100103", "Rice 5kg")).await.unwrap();

        assert_eq!(product.price_cents, 1250);
        assert_eq!(product.stock_thousandths, 3500);
        assert_eq!(product.package_qty_thousandths, 1000);
        assert_eq!(product.kind, ProductKind::Goods);
    }

    #[tokio::test]
    async fn test_deleting_sector_clears_link() {
        let db = database().await;
        let sector = db
            .table::<Sectors>()
            .insert(&ClassificationDraft {
                code: "01".into(),
                description: "Grocery".into(),
                cancelled: false,
            })
            .await
            .unwrap();

        let mut linked = draft("7891000100103", "Rice 5kg");
        linked.sector_id = Some(sector.id.clone());
        let product = db.table::<Products>().insert(&linked).await.unwrap();

        db.table::<Sectors>().delete(&sector.id).await.unwrap();
        let product = db.table::<Products>().require(&product.id).await.unwrap();
        assert_eq!(product.sector_id, None);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_foreign_key_violation() {
        let db = database().await;
        let mut linked = draft("7891000100103", "Rice 5kg");
        linked.ncm_id = Some("00000000-0000-4000-8000-000000000000".into());

        let err = db.table::<Products>().insert(&linked).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_situation_filter() {
        let db = database().await;
        let products = db.table::<Products>();
        products.insert(&draft("1", "Active item")).await.unwrap();
        let mut inactive = draft("2", "Inactive item");
        inactive.situation = ProductSituation::Inactive;
        products.insert(&inactive).await.unwrap();

        let params = ListParams::resolve(
            &ListRequest {
                status: Some("inativo".into()),
                ..Default::default()
            },
            &schema::PRODUCT.list,
            PageSizing::default(),
        );
        let page = products.list(&params).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].description, "Inactive item");
    }
}
