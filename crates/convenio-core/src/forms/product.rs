//! Product form.

use super::{Cleaner, FormErrors, RawForm};
use crate::money::Money;
use crate::schema;
use crate::types::{Percentage, ProductKind, ProductSituation, Quantity, SaleUnit, Taxation};
use crate::validation::{service_flag_violations, validate_non_negative_money};

/// A validated product submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub ean_code: String,
    pub description: String,
    pub pos_description: Option<String>,
    pub sale_unit: SaleUnit,
    pub package_qty: Quantity,
    pub kind: ProductKind,
    pub weighed: bool,
    pub multipliable: bool,
    pub own_use: bool,
    pub situation: ProductSituation,
    pub icms_rate: Option<Percentage>,
    pub stock: Quantity,
    pub net_weight: Option<Quantity>,
    pub gross_weight: Option<Quantity>,
    pub price: Money,
    pub classification: Option<String>,
    pub taxation: Taxation,
    pub sector_id: Option<String>,
    pub group_id: Option<String>,
    pub sub_group_id: Option<String>,
    pub cfop_id: Option<String>,
    pub cst_cson_id: Option<String>,
    pub ncm_id: Option<String>,
    pub cest_id: Option<String>,
}

/// Cleans a product form.
///
/// Services (`kind = S`) may be neither weighed nor for own use; each
/// offending flag gets its own field error.
pub fn clean_product(form: &RawForm) -> Result<ProductDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::PRODUCT);

    let ean_code = c.required_text("ean_code");
    let description = c.required_text("description");
    let pos_description = c.text("pos_description");
    let sale_unit = c.choice_or_default("sale_unit");
    let package_qty = c.quantity("package_qty").unwrap_or(Quantity::ONE);
    let kind = c.choice_or_default("kind");
    let weighed = c.boolean("weighed");
    let multipliable = c.boolean("multipliable");
    let own_use = c.boolean("own_use");
    for field in service_flag_violations(kind, weighed, own_use) {
        let message = format!("A service cannot be marked as {}", c.label(field).to_lowercase());
        c.error(field, message);
    }
    let situation = c.choice_or_default("situation");
    let icms_rate = c.percentage("icms_rate");
    let stock = c.quantity("stock").unwrap_or_default();
    let net_weight = c.quantity("net_weight");
    let gross_weight = c.quantity("gross_weight");
    let price = match c.money("price") {
        Some(price) => c.check("price", validate_non_negative_money(c.label("price"), price)),
        None => None,
    }
    .unwrap_or_default();
    let classification = c.text("classification");
    let taxation = c.choice_or_default("taxation");

    let sector_id = c.reference("sector_id");
    let group_id = c.reference("group_id");
    let sub_group_id = c.reference("sub_group_id");
    let cfop_id = c.reference("cfop_id");
    let cst_cson_id = c.reference("cst_cson_id");
    let ncm_id = c.reference("ncm_id");
    let cest_id = c.reference("cest_id");

    c.finish(ProductDraft {
        ean_code,
        description,
        pos_description,
        sale_unit,
        package_qty,
        kind,
        weighed,
        multipliable,
        own_use,
        situation,
        icms_rate,
        stock,
        net_weight,
        gross_weight,
        price,
        classification,
        taxation,
        sector_id,
        group_id,
        sub_group_id,
        cfop_id,
        cst_cson_id,
        ncm_id,
        cest_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_form() -> RawForm {
        RawForm::new()
            .with("ean_code", "7891000100103")
            .with("description", "Refrigerante 2L")
            .with("sale_unit", "UN")
            .with("kind", "V")
            .with("price", "9,99")
            .with("taxation", "T")
    }

    #[test]
    fn test_product_defaults() {
        let draft = clean_product(&product_form()).unwrap();
        assert_eq!(draft.price.cents(), 999);
        assert_eq!(draft.package_qty, Quantity::ONE);
        assert_eq!(draft.situation, ProductSituation::Active);
        assert_eq!(draft.sector_id, None);
    }

    #[test]
    fn test_goods_may_be_weighed() {
        let form = product_form().with("weighed", "on").with("own_use", "on");
        assert!(clean_product(&form).is_ok());
    }

    #[test]
    fn test_service_flags_rejected() {
        let form = product_form()
            .with("kind", "S")
            .with("weighed", "on")
            .with("own_use", "on");
        let errors = clean_product(&form).unwrap_err();
        assert_eq!(errors.messages("weighed"), ["A service cannot be marked as weighed"]);
        assert_eq!(errors.messages("own_use"), ["A service cannot be marked as own use"]);
    }

    #[test]
    fn test_invalid_reference_rejected() {
        let errors = clean_product(&product_form().with("ncm_id", "42")).unwrap_err();
        assert!(errors.has_field("ncm_id"));
    }
}
