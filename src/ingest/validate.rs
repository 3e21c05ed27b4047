//! Structural checks applied to every decoded order before it is saved.

use crate::model::{Delivery, Item, Order, Payment};
use thiserror::Error;

/// First rule an order broke.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: &'static str) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

type Checked = Result<(), ValidationError>;

/// Validates orders coming off the wire.
///
/// Built once at startup and handed to the ingest worker.
#[derive(Debug, Clone)]
pub struct OrderValidator {
    max_sale: i32,
    min_chrt_id: i64,
}

impl Default for OrderValidator {
    fn default() -> Self {
        Self {
            max_sale: 100,
            min_chrt_id: 1,
        }
    }
}

impl OrderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self, order: &Order) -> Checked {
        required("order_uid", order.order_uid.as_str())?;
        required("customer_id", &order.customer_id)?;
        required("oof_shard", &order.oof_shard)?;
        non_negative("sm_id", order.sm_id as f64)?;

        self.validate_delivery(&order.delivery)?;
        self.validate_payment(&order.payment)?;

        if order.items.is_empty() {
            return Err(ValidationError::new("items", "at least one item is required"));
        }
        for (i, item) in order.items.iter().enumerate() {
            self.validate_item(i, item)?;
        }
        Ok(())
    }

    fn validate_delivery(&self, delivery: &Delivery) -> Checked {
        required("delivery.name", &delivery.name)?;
        required("delivery.phone", &delivery.phone)?;
        required("delivery.zip", &delivery.zip)?;
        required("delivery.city", &delivery.city)?;
        required("delivery.address", &delivery.address)?;
        required("delivery.region", &delivery.region)?;
        required("delivery.email", &delivery.email)?;
        if !looks_like_email(&delivery.email) {
            return Err(ValidationError::new("delivery.email", "not an email address"));
        }
        Ok(())
    }

    fn validate_payment(&self, payment: &Payment) -> Checked {
        required("payment.transaction", &payment.transaction)?;
        required("payment.currency", &payment.currency)?;
        required("payment.provider", &payment.provider)?;
        required("payment.bank", &payment.bank)?;
        non_negative("payment.amount", payment.amount)?;
        non_negative("payment.payment_dt", payment.payment_dt as f64)?;
        non_negative("payment.delivery_cost", payment.delivery_cost)?;
        non_negative("payment.goods_total", payment.goods_total as f64)?;
        non_negative("payment.custom_fee", payment.custom_fee)
    }

    fn validate_item(&self, index: usize, item: &Item) -> Checked {
        let field = |name: &str| format!("items[{index}].{name}");

        if item.chrt_id < self.min_chrt_id {
            return Err(ValidationError::new(field("chrt_id"), "must be at least 1"));
        }
        if item.track_number.is_empty() {
            return Err(ValidationError::new(field("track_number"), "is required"));
        }
        if !(0..=self.max_sale).contains(&item.sale) {
            return Err(ValidationError::new(field("sale"), "must be within 0..=100"));
        }
        for (name, value) in [
            ("price", item.price),
            ("total_price", item.total_price),
            ("nm_id", item.nm_id as f64),
            ("status", item.status as f64),
        ] {
            if value < 0.0 {
                return Err(ValidationError::new(field(name), "must not be negative"));
            }
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> Checked {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Checked {
    if value < 0.0 {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    Ok(())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::sample_order;

    fn rejected_field(order: &Order) -> String {
        OrderValidator::new().validate(order).unwrap_err().field
    }

    #[test]
    fn test_sample_order_is_valid() {
        assert!(OrderValidator::new().validate(&sample_order("o1")).is_ok());
    }

    #[test]
    fn test_required_fields() {
        let mut order = sample_order("");
        assert_eq!(rejected_field(&order), "order_uid");

        order = sample_order("o1");
        order.customer_id.clear();
        assert_eq!(rejected_field(&order), "customer_id");

        order = sample_order("o1");
        order.delivery.city = "   ".to_string();
        assert_eq!(rejected_field(&order), "delivery.city");

        order = sample_order("o1");
        order.payment.bank.clear();
        assert_eq!(rejected_field(&order), "payment.bank");
    }

    #[test]
    fn test_email_must_be_an_address() {
        let mut order = sample_order("o1");
        for bad in ["test.gmail.com", "@gmail.com", "test@", "a b@c.d"] {
            order.delivery.email = bad.to_string();
            assert_eq!(rejected_field(&order), "delivery.email", "{bad}");
        }
    }

    #[test]
    fn test_items_rules() {
        let mut order = sample_order("o1");
        order.items.clear();
        assert_eq!(rejected_field(&order), "items");

        order = sample_order("o1");
        order.items[0].chrt_id = 0;
        assert_eq!(rejected_field(&order), "items[0].chrt_id");

        order = sample_order("o1");
        order.items[0].sale = 101;
        assert_eq!(rejected_field(&order), "items[0].sale");

        order = sample_order("o1");
        order.items[0].sale = 100;
        assert!(OrderValidator::new().validate(&order).is_ok());

        order = sample_order("o1");
        order.items[0].price = -1.0;
        assert_eq!(rejected_field(&order), "items[0].price");
    }

    #[test]
    fn test_negative_payment_amount() {
        let mut order = sample_order("o1");
        order.payment.amount = -0.5;
        assert_eq!(rejected_field(&order), "payment.amount");
    }
}
