#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use order_service::model::{Delivery, Item, Order, OrderUid, Payment};

/// A complete order that passes validation.
pub fn order(uid: &str) -> Order {
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

pub fn payload(order: &Order) -> Vec<u8> {
    serde_json::to_vec(order).unwrap()
}
