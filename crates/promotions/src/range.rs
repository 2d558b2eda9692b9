//! Product ranges an offer applies to.

use std::collections::BTreeSet;

use common::{BrandId, CategoryId, ClassId, ProductId};
use serde::{Deserialize, Serialize};

use crate::basket::BasketLine;

/// Scoping rule for an offer.
///
/// Exclusions always win. With `include_all_products` unset, each non-empty
/// inclusion set is one dimension; `match_all_criteria` requires every
/// dimension to hold, otherwise one is enough. A range with no non-empty
/// dimension matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRange {
    #[serde(default)]
    pub include_all_products: bool,
    #[serde(default)]
    pub match_all_criteria: bool,
    #[serde(default)]
    pub included_products: BTreeSet<ProductId>,
    #[serde(default)]
    pub excluded_products: BTreeSet<ProductId>,
    #[serde(default)]
    pub included_categories: BTreeSet<CategoryId>,
    #[serde(default)]
    pub included_brands: BTreeSet<BrandId>,
    #[serde(default)]
    pub included_classes: BTreeSet<ClassId>,
}

impl OfferRange {
    /// A range covering every product.
    pub fn all_products() -> Self {
        Self {
            include_all_products: true,
            ..Self::default()
        }
    }

    /// An empty range to be filled with the `include_*` builders.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn match_all(mut self) -> Self {
        self.match_all_criteria = true;
        self
    }

    pub fn include_product(mut self, product: impl Into<ProductId>) -> Self {
        self.included_products.insert(product.into());
        self
    }

    pub fn exclude_product(mut self, product: impl Into<ProductId>) -> Self {
        self.excluded_products.insert(product.into());
        self
    }

    pub fn include_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.included_categories.insert(category.into());
        self
    }

    pub fn include_brand(mut self, brand: impl Into<BrandId>) -> Self {
        self.included_brands.insert(brand.into());
        self
    }

    pub fn include_class(mut self, class: impl Into<ClassId>) -> Self {
        self.included_classes.insert(class.into());
        self
    }

    /// Returns true if the line belongs to this range.
    pub fn matches(&self, line: &BasketLine) -> bool {
        if self.excluded_products.contains(&line.product_id) {
            return false;
        }
        if self.include_all_products {
            return true;
        }

        let mut dimensions = [
            (!self.included_products.is_empty())
                .then(|| self.included_products.contains(&line.product_id)),
            (!self.included_categories.is_empty()).then(|| {
                line.categories
                    .iter()
                    .any(|category| self.included_categories.contains(category))
            }),
            (!self.included_brands.is_empty()).then(|| {
                line.brand
                    .as_ref()
                    .is_some_and(|brand| self.included_brands.contains(brand))
            }),
            (!self.included_classes.is_empty()).then(|| {
                line.class
                    .as_ref()
                    .is_some_and(|class| self.included_classes.contains(class))
            }),
        ]
        .into_iter()
        .flatten()
        .peekable();

        if dimensions.peek().is_none() {
            return false;
        }
        if self.match_all_criteria {
            dimensions.all(|hit| hit)
        } else {
            dimensions.any(|hit| hit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn shoe(brand: &str) -> BasketLine {
        BasketLine::new(format!("shoe-{brand}"), Money::from_units(80), 1)
            .in_category("Shoes")
            .with_brand(brand)
    }

    #[test]
    fn match_all_requires_every_dimension() {
        let range = OfferRange::empty()
            .match_all()
            .include_category("Shoes")
            .include_brand("Acme");

        assert!(!range.matches(&shoe("Nike")));
        assert!(range.matches(&shoe("Acme")));
    }

    #[test]
    fn match_any_accepts_one_dimension() {
        let range = OfferRange::empty()
            .include_category("Shoes")
            .include_brand("Acme");

        assert!(range.matches(&shoe("Nike")));
        let hat = BasketLine::new("hat", Money::from_units(20), 1).with_brand("Acme");
        assert!(range.matches(&hat));
        let scarf = BasketLine::new("scarf", Money::from_units(20), 1).with_brand("Other");
        assert!(!range.matches(&scarf));
    }

    #[test]
    fn exclusion_overrides_everything() {
        let line = shoe("Acme");
        let everything = OfferRange::all_products().exclude_product(line.product_id.clone());
        assert!(!everything.matches(&line));

        let explicit = OfferRange::empty()
            .include_product(line.product_id.clone())
            .exclude_product(line.product_id.clone());
        assert!(!explicit.matches(&line));
    }

    #[test]
    fn include_all_matches_any_product() {
        let range = OfferRange::all_products();
        assert!(range.matches(&BasketLine::new("anything", Money::from_units(1), 1)));
    }

    #[test]
    fn empty_range_matches_nothing() {
        let line = shoe("Acme");
        assert!(!OfferRange::empty().matches(&line));
        assert!(!OfferRange::empty().match_all().matches(&line));
    }

    #[test]
    fn class_and_direct_product_dimensions() {
        let line = BasketLine::new("p-1", Money::from_units(5), 1).with_class("Apparel");

        assert!(OfferRange::empty().include_class("Apparel").matches(&line));
        assert!(OfferRange::empty().include_product("p-1").matches(&line));
        assert!(!OfferRange::empty()
            .match_all()
            .include_product("p-1")
            .include_class("Food")
            .matches(&line));
    }

    #[test]
    fn line_without_brand_fails_brand_dimension() {
        let line = BasketLine::new("p-2", Money::from_units(5), 1).in_category("Shoes");
        let range = OfferRange::empty()
            .match_all()
            .include_category("Shoes")
            .include_brand("Acme");
        assert!(!range.matches(&line));
    }
}
