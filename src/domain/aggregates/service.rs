//! Service catalog aggregate and price calculation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Money;
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    BusinessCards,
    Flyers,
    Posters,
    Banners,
    Brochures,
    Stickers,
    Stationery,
    LargeFormat,
    Other,
}

impl ServiceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceCategory::BusinessCards => "business_cards",
            ServiceCategory::Flyers => "flyers",
            ServiceCategory::Posters => "posters",
            ServiceCategory::Banners => "banners",
            ServiceCategory::Brochures => "brochures",
            ServiceCategory::Stickers => "stickers",
            ServiceCategory::Stationery => "stationery",
            ServiceCategory::LargeFormat => "large_format",
            ServiceCategory::Other => "other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Select,
    Checkbox,
    Number,
    Text,
}

/// Priced add-on on a catalog service, e.g. lamination or double-sided print.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceOption {
    pub id: String,
    pub label: String,
    pub kind: OptionKind,
    pub price_modifier: Decimal,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub choices: Vec<String>,
}

/// Catalog entry for a printable product.
///
/// Never hard-deleted: historical orders keep referencing deactivated
/// services through their snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: ServiceCategory,
    pub description: Option<String>,
    pub base_price: Money,
    pub unit: String,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub options: Vec<ServiceOption>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Computed price for one line: `unit = base + option modifiers`,
/// `total = unit * quantity`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    pub unit_price: Money,
    pub total_price: Money,
}

/// Partial update applied to an existing service.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub unit: Option<String>,
    pub min_quantity: Option<u32>,
    pub max_quantity: Option<u32>,
    pub options: Option<Vec<ServiceOption>>,
    pub active: Option<bool>,
}

impl Service {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        category: ServiceCategory,
        base_price: Money,
        unit: impl Into<String>,
        min_quantity: u32,
        max_quantity: u32,
        options: Vec<ServiceOption>,
    ) -> Result<Self> {
        let now = Utc::now();
        let service = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            description: None,
            base_price,
            unit: unit.into(),
            min_quantity,
            max_quantity,
            options,
            active: true,
            created_at: now,
            updated_at: now,
        };
        service.check_invariants()?;
        Ok(service)
    }

    pub fn apply(&mut self, update: ServiceUpdate) -> Result<()> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(base) = update.base_price {
            self.base_price = Money::new(base, self.base_price.currency());
        }
        if let Some(unit) = update.unit {
            self.unit = unit;
        }
        if let Some(min) = update.min_quantity {
            self.min_quantity = min;
        }
        if let Some(max) = update.max_quantity {
            self.max_quantity = max;
        }
        if let Some(options) = update.options {
            self.options = options;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.check_invariants()?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Price a quantity with a set of selected options.
    ///
    /// Quantity outside the service bounds is rejected before any price
    /// math. Selected options that do not exist on the service are ignored,
    /// matching the catalog's documented permissive-merge policy.
    pub fn quote(&self, quantity: u32, selected: &HashMap<String, serde_json::Value>) -> Result<Quote> {
        if quantity < self.min_quantity || quantity > self.max_quantity {
            return Err(Error::InvalidQuantity {
                got: quantity,
                min: self.min_quantity,
                max: self.max_quantity,
            });
        }
        let modifiers: Decimal = self
            .options
            .iter()
            .filter(|opt| selected.contains_key(&opt.id))
            .map(|opt| opt.price_modifier)
            .sum();
        let unit_price = Money::new(self.base_price.amount() + modifiers, self.base_price.currency());
        let total_price = unit_price.multiply(quantity);
        Ok(Quote { unit_price, total_price })
    }

    fn check_invariants(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("service name must not be empty".into()));
        }
        if self.min_quantity > self.max_quantity {
            return Err(Error::Validation(format!(
                "min_quantity {} exceeds max_quantity {}",
                self.min_quantity, self.max_quantity
            )));
        }
        for opt in &self.options {
            if opt.kind == OptionKind::Select && opt.choices.is_empty() {
                return Err(Error::Validation(format!(
                    "select option '{}' must define at least one choice",
                    opt.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flyers() -> Service {
        Service::new(
            "A5 Flyers",
            ServiceCategory::Flyers,
            Money::new(Decimal::new(50, 0), "EUR"),
            "per_100",
            100,
            10_000,
            vec![
                ServiceOption {
                    id: "lamination".into(),
                    label: "Lamination".into(),
                    kind: OptionKind::Checkbox,
                    price_modifier: Decimal::new(10, 0),
                    required: false,
                    choices: vec![],
                },
                ServiceOption {
                    id: "paper".into(),
                    label: "Paper weight".into(),
                    kind: OptionKind::Select,
                    price_modifier: Decimal::new(5, 0),
                    required: true,
                    choices: vec!["135g".into(), "170g".into()],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn quote_without_options() {
        let q = flyers().quote(500, &HashMap::new()).unwrap();
        assert_eq!(q.unit_price.amount(), Decimal::new(50, 0));
        assert_eq!(q.total_price.amount(), Decimal::new(25_000, 0));
    }

    #[test]
    fn quote_adds_option_modifiers() {
        let mut selected = HashMap::new();
        selected.insert("lamination".to_string(), serde_json::json!(true));
        selected.insert("paper".to_string(), serde_json::json!("170g"));
        let q = flyers().quote(100, &selected).unwrap();
        assert_eq!(q.unit_price.amount(), Decimal::new(65, 0));
        assert_eq!(q.total_price.amount(), Decimal::new(6_500, 0));
    }

    #[test]
    fn quote_ignores_unknown_options() {
        let mut selected = HashMap::new();
        selected.insert("gold_leaf".to_string(), serde_json::json!(true));
        let q = flyers().quote(100, &selected).unwrap();
        assert_eq!(q.unit_price.amount(), Decimal::new(50, 0));
    }

    #[test]
    fn quote_rejects_quantity_below_minimum() {
        match flyers().quote(50, &HashMap::new()) {
            Err(Error::InvalidQuantity { got: 50, min: 100, max: 10_000 }) => {}
            other => panic!("expected InvalidQuantity, got {other:?}"),
        }
    }

    #[test]
    fn quote_rejects_quantity_above_maximum() {
        assert!(matches!(
            flyers().quote(10_001, &HashMap::new()),
            Err(Error::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn new_rejects_inverted_bounds() {
        let res = Service::new(
            "Broken",
            ServiceCategory::Other,
            Money::new(Decimal::ONE, "EUR"),
            "unit",
            10,
            5,
            vec![],
        );
        assert!(matches!(res, Err(Error::Validation(_))));
    }

    #[test]
    fn select_option_requires_choices() {
        let res = Service::new(
            "Bad select",
            ServiceCategory::Other,
            Money::new(Decimal::ONE, "EUR"),
            "unit",
            1,
            10,
            vec![ServiceOption {
                id: "finish".into(),
                label: "Finish".into(),
                kind: OptionKind::Select,
                price_modifier: Decimal::ZERO,
                required: true,
                choices: vec![],
            }],
        );
        assert!(matches!(res, Err(Error::Validation(_))));
    }

    #[test]
    fn apply_revalidates_bounds() {
        let mut s = flyers();
        let res = s.apply(ServiceUpdate { min_quantity: Some(20_000), ..Default::default() });
        assert!(matches!(res, Err(Error::Validation(_))));
    }
}
