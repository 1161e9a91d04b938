use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::money::{checked_add, checked_mul, ensure_within_limit, percent_of};
use bss_core::{DomainError, DomainResult, ItemId, labelled_enum};

labelled_enum! {
    /// What a line item charges for.
    pub enum ItemType {
        Usage => "USAGE",
        Subscription => "SUBSCRIPTION",
        Product => "PRODUCT",
        Service => "SERVICE",
        Adjustment => "ADJUSTMENT",
    }
}

labelled_enum! {
    pub enum ItemStatus {
        Pending => "PENDING",
        Active => "ACTIVE",
        Cancelled => "CANCELLED",
    }
}

/// Input for a new line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub description: String,
    pub item_type: ItemType,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    /// Percent, e.g. `23` for 23 %.
    pub tax_rate: Decimal,
    pub status: ItemStatus,
}

impl NewLineItem {
    pub fn new(
        description: impl Into<String>,
        item_type: ItemType,
        quantity: u32,
        unit_price: Decimal,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            item_type,
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            tax_rate,
            status: ItemStatus::Active,
        }
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a line item; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChange {
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub status: Option<ItemStatus>,
}

impl ItemChange {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One priced line of a billable document.
///
/// Amounts are derived from the inputs whenever the item is built or changed:
/// - total = quantity × unit price
/// - net = total − discount
/// - tax = net × tax rate / 100, rounded to the currency scale
/// - final = net + tax
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    id: ItemId,
    description: String,
    item_type: ItemType,
    quantity: u32,
    unit_price: Decimal,
    discount: Decimal,
    tax_rate: Decimal,
    status: ItemStatus,
    total_price: Decimal,
    net_amount: Decimal,
    tax_amount: Decimal,
    final_amount: Decimal,
}

impl LineItem {
    pub fn new(input: NewLineItem) -> DomainResult<Self> {
        Self::with_id(ItemId::new(), input)
    }

    pub fn with_id(id: ItemId, input: NewLineItem) -> DomainResult<Self> {
        Self {
            id,
            description: input.description.trim().to_string(),
            item_type: input.item_type,
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount: input.discount,
            tax_rate: input.tax_rate,
            status: input.status,
            total_price: Decimal::ZERO,
            net_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            final_amount: Decimal::ZERO,
        }
        .priced()
    }

    /// Validate the inputs and derive the amounts.
    fn priced(mut self) -> DomainResult<Self> {
        if self.description.is_empty() {
            return Err(DomainError::validation("item description cannot be empty"));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(DomainError::validation("item unit price cannot be negative"));
        }
        if self.tax_rate < Decimal::ZERO {
            return Err(DomainError::validation("item tax rate cannot be negative"));
        }
        if self.discount < Decimal::ZERO {
            return Err(DomainError::validation("item discount cannot be negative"));
        }
        ensure_within_limit(self.unit_price, "item unit price")?;
        ensure_within_limit(self.discount, "item discount")?;
        ensure_within_limit(self.tax_rate, "item tax rate")?;

        let total_price = checked_mul(Decimal::from(self.quantity), self.unit_price)?;
        if self.discount > total_price {
            return Err(DomainError::validation(
                "item discount cannot exceed the item total price",
            ));
        }
        let net_amount = total_price - self.discount;
        let tax_amount = percent_of(net_amount, self.tax_rate)?;
        self.final_amount = checked_add(net_amount, tax_amount)?;
        self.total_price = total_price;
        self.net_amount = net_amount;
        self.tax_amount = tax_amount;
        Ok(self)
    }

    /// Apply a partial update, re-validating the result.
    pub fn apply(&self, change: &ItemChange) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(description) = &change.description {
            next.description = description.trim().to_string();
        }
        if let Some(quantity) = change.quantity {
            next.quantity = quantity;
        }
        if let Some(unit_price) = change.unit_price {
            next.unit_price = unit_price;
        }
        if let Some(discount) = change.discount {
            next.discount = discount;
        }
        if let Some(tax_rate) = change.tax_rate {
            next.tax_rate = tax_rate;
        }
        if let Some(status) = change.status {
            next.status = status;
        }
        next.priced()
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn net_amount(&self) -> Decimal {
        self.net_amount
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn final_amount(&self) -> Decimal {
        self.final_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn service(quantity: u32, unit_price: Decimal) -> NewLineItem {
        NewLineItem::new("Installation", ItemType::Service, quantity, unit_price, dec!(23))
    }

    #[test]
    fn derives_amounts_from_price_discount_and_tax() {
        let item = LineItem::new(service(3, dec!(10.00)).with_discount(dec!(5.00))).unwrap();

        assert_eq!(item.total_price(), dec!(30.00));
        assert_eq!(item.net_amount(), dec!(25.00));
        assert_eq!(item.tax_amount(), dec!(5.75));
        assert_eq!(item.final_amount(), dec!(30.75));
    }

    #[test]
    fn tax_rounds_half_away_from_zero() {
        // 0.25 * 23% = 0.0575 -> 0.06
        let item = LineItem::new(service(1, dec!(0.25))).unwrap();
        assert_eq!(item.tax_amount(), dec!(0.06));
        assert_eq!(item.final_amount(), dec!(0.31));
    }

    #[test]
    fn rejects_zero_quantity() {
        let err = LineItem::new(service(0, dec!(1))).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("quantity") => {}
            _ => panic!("Expected Validation for zero quantity"),
        }
    }

    #[test]
    fn rejects_negative_price_and_rate() {
        assert!(LineItem::new(service(1, dec!(-0.01))).is_err());

        let mut input = service(1, dec!(1));
        input.tax_rate = dec!(-1);
        assert!(LineItem::new(input).is_err());
    }

    #[test]
    fn discount_is_bounded_by_total_price() {
        assert!(LineItem::new(service(2, dec!(5)).with_discount(dec!(10))).is_ok());
        assert!(LineItem::new(service(2, dec!(5)).with_discount(dec!(10.01))).is_err());
        assert!(LineItem::new(service(2, dec!(5)).with_discount(dec!(-1))).is_err());
    }

    #[test]
    fn oversized_amounts_are_rejected_instead_of_overflowing() {
        let err = LineItem::new(service(u32::MAX, Decimal::MAX)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("unit price")));

        let mut input = service(1, dec!(10));
        input.tax_rate = Decimal::MAX;
        assert!(LineItem::new(input).is_err());

        // The largest accepted price times the largest quantity still fits.
        let limit = Decimal::from(bss_core::money::MAX_INPUT_MAGNITUDE);
        let item = LineItem::new(service(u32::MAX, limit)).unwrap();
        assert_eq!(item.total_price(), Decimal::from(u32::MAX) * limit);
    }

    #[test]
    fn apply_keeps_id_and_revalidates() {
        let item = LineItem::new(service(2, dec!(5)).with_discount(dec!(10))).unwrap();

        let updated = item
            .apply(&ItemChange {
                quantity: Some(4),
                ..ItemChange::default()
            })
            .unwrap();
        assert_eq!(updated.id(), item.id());
        assert_eq!(updated.total_price(), dec!(20));

        // Shrinking the quantity below the discount is rejected.
        let err = item
            .apply(&ItemChange {
                quantity: Some(1),
                ..ItemChange::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
