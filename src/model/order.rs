//! The order aggregate: scalar attributes, one delivery, one payment and one or
//! more line items.
//!
//! Once an `Order` is handed to the cache it is shared behind an `Arc` and never
//! mutated again; a newer version of the same order replaces it wholesale.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::Display;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderUid(pub String);

impl OrderUid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderUid {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OrderUid {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for OrderUid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for OrderUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Order {
    pub order_uid: OrderUid,
    pub track_number: String,
    pub entry: String,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
}

/// Where the order goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// How the order was paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Payment {
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: f64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: f64,
    pub goods_total: i64,
    pub custom_fee: f64,
}

/// A single line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: f64,
    pub rid: String,
    pub name: String,
    pub sale: i32,
    #[serde(default)]
    pub size: String,
    pub total_price: f64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

impl Order {
    pub fn uid(&self) -> &OrderUid {
        &self.order_uid
    }

    /// Number of line items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// A complete, valid order with the given uid.
    pub fn sample_order(uid: &str) -> Order {
        Order {
            order_uid: OrderUid::from(uid),
            track_number: "WBILMTESTTRACK".to_string(),
            entry: "WBIL".to_string(),
            locale: "en".to_string(),
            internal_signature: String::new(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shardkey: "9".to_string(),
            sm_id: 99,
            date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
            oof_shard: "1".to_string(),
            delivery: Delivery {
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: "test@gmail.com".to_string(),
            },
            payment: Payment {
                transaction: uid.to_string(),
                request_id: String::new(),
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1817.0,
                payment_dt: 1637907727,
                bank: "alpha".to_string(),
                delivery_cost: 1500.0,
                goods_total: 317,
                custom_fee: 0.0,
            },
            items: vec![Item {
                chrt_id: 9934930,
                track_number: "WBILMTESTTRACK".to_string(),
                price: 453.0,
                rid: "ab4219087a764ae0btest".to_string(),
                name: "Mascaras".to_string(),
                sale: 30,
                size: "0".to_string(),
                total_price: 317.0,
                nm_id: 2389212,
                brand: "Vivienne Sabo".to_string(),
                status: 202,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_order;
    use super::*;

    #[test]
    fn test_order_json_uses_plain_uid() {
        let order = sample_order("b563feb7b2b84b6test");
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["order_uid"], "b563feb7b2b84b6test");
        assert_eq!(json["items"][0]["chrt_id"], 9934930);

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let mut json = serde_json::to_value(sample_order("x")).unwrap();
        json["surprise"] = serde_json::Value::Bool(true);
        assert!(serde_json::from_value::<Order>(json).is_err());
    }
}
