//! Candidate lines evaluated against offers before checkout.

use common::{BrandId, CategoryId, ClassId, Money, ProductId};
use serde::{Deserialize, Serialize};

/// One basket line with its catalog membership already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketLine {
    pub product_id: ProductId,
    pub name: String,
    pub categories: Vec<CategoryId>,
    pub brand: Option<BrandId>,
    pub class: Option<ClassId>,
    pub unit_price: Money,
    pub quantity: u32,
}

impl BasketLine {
    pub fn new(product_id: impl Into<ProductId>, unit_price: Money, quantity: u32) -> Self {
        let product_id = product_id.into();
        Self {
            name: product_id.to_string(),
            product_id,
            categories: Vec::new(),
            brand: None,
            class: None,
            unit_price,
            quantity,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn in_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<BrandId>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<ClassId>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// `unit_price * quantity`.
    pub fn line_value(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
