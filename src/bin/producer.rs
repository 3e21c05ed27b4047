//! # Order Producer
//!
//! Generates random, valid orders and writes them to stdout as newline-delimited
//! JSON, one every `--interval-ms`. Logs go to stderr, so the output can be
//! piped straight into the service's stdin source:
//!
//! ```bash
//! producer -n 100 --interval-ms 200 | RUST_LOG=info order-service
//!
//! # Fixture file for ORDERS_INGEST__SOURCE
//! producer -n 1000 --interval-ms 0 --seed 7 > orders.ndjson
//! ```
//!
//! Stops after `-n` orders (`0` runs until interrupted) or on Ctrl-C.

use chrono::{DateTime, Utc};
use clap::Parser;
use order_service::ingest::OrderValidator;
use order_service::model::{Delivery, Item, Order, OrderUid, Payment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "producer")]
#[command(about = "Writes generated orders as newline-delimited JSON")]
#[command(version)]
struct Cli {
    /// How many orders to write (0 - until interrupted)
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u64,

    /// Pause between orders, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!(count = cli.count, interval_ms = cli.interval_ms, "Producer started");

    let mut stdout = tokio::io::stdout();
    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Signal received, stopping");
    };
    let sent = produce(
        &mut stdout,
        &mut rng,
        cli.count,
        Duration::from_millis(cli.interval_ms),
        stop,
    )
    .await?;

    info!(sent, "Producer finished");
    Ok(())
}

/// Writes up to `count` orders to `out` (unbounded when `count` is 0) until
/// `stop` resolves. Returns how many were written.
async fn produce<W, F>(
    out: &mut W,
    rng: &mut StdRng,
    count: u64,
    interval: Duration,
    stop: F,
) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(stop);
    let validator = OrderValidator::new();
    let mut sent = 0u64;

    while count == 0 || sent < count {
        let order = generate_order(rng, Utc::now());
        if let Err(e) = validator.validate(&order) {
            warn!(order_uid = %order.order_uid, error = %e, "Generated an invalid order, skipping");
            continue;
        }

        let mut line = serde_json::to_vec(&order)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
        sent += 1;
        info!(sent, order_uid = %order.order_uid, size = line.len(), "Order written");

        if count != 0 && sent >= count {
            break;
        }
        tokio::select! {
            _ = &mut stop => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    Ok(sent)
}

fn generate_order(rng: &mut StdRng, now: DateTime<Utc>) -> Order {
    let uid = uuid::Builder::from_random_bytes(rng.random()).into_uuid().to_string();
    let short = &uid[..8];

    let item_count = rng.random_range(1..=3usize);
    let items: Vec<Item> = (0..item_count)
        .map(|_| {
            let price = f64::from(rng.random_range(100..2100u32)) / 100.0;
            Item {
                chrt_id: rng.random_range(1..=1_000_000),
                track_number: format!("TRK{:06}", rng.random_range(0..1_000_000u32)),
                price,
                rid: format!("RID{:04}", rng.random_range(0..10_000u32)),
                name: format!("Item-{}", rng.random_range(0..1000u32)),
                sale: rng.random_range(0..50),
                size: "M".to_string(),
                total_price: price,
                nm_id: rng.random_range(0..1_000_000),
                brand: "BrandX".to_string(),
                status: 1,
            }
        })
        .collect();
    let total: f64 = items.iter().map(|item| item.total_price).sum();

    Order {
        order_uid: OrderUid::from(uid.as_str()),
        track_number: format!("TRACK-{short}"),
        entry: "WEB".to_string(),
        locale: "en-GB".to_string(),
        internal_signature: String::new(),
        customer_id: format!("cust-{}", rng.random_range(0..100_000u32)),
        delivery_service: "dhl".to_string(),
        shardkey: rng.random_range(0..100u32).to_string(),
        sm_id: rng.random_range(0..1000),
        date_created: now,
        oof_shard: "1".to_string(),
        delivery: Delivery {
            name: "Ivan Ivanov".to_string(),
            phone: "+79991234567".to_string(),
            zip: "123456".to_string(),
            city: "Moscow".to_string(),
            address: "Lenina, 1".to_string(),
            region: "Moscow".to_string(),
            email: "ivan@example.com".to_string(),
        },
        payment: Payment {
            transaction: format!("tx-{short}"),
            request_id: String::new(),
            currency: "RUB".to_string(),
            provider: "bank".to_string(),
            amount: total,
            payment_dt: now.timestamp(),
            bank: "BigBank".to_string(),
            delivery_cost: 0.0,
            goods_total: total as i64,
            custom_fee: 0.0,
        },
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_service::ingest::{LineSource, MessageSource, SourceError};
    use std::collections::HashSet;

    #[test]
    fn test_generated_orders_are_valid_and_unique() {
        let mut rng = StdRng::seed_from_u64(42);
        let validator = OrderValidator::new();
        let mut uids = HashSet::new();

        for _ in 0..200 {
            let order = generate_order(&mut rng, Utc::now());
            validator.validate(&order).unwrap();
            assert!((1..=3).contains(&order.items.len()));
            assert!(uids.insert(order.order_uid.clone()));
        }
    }

    #[test]
    fn test_same_seed_same_orders() {
        let now = Utc::now();
        let a = generate_order(&mut StdRng::seed_from_u64(7), now);
        let b = generate_order(&mut StdRng::seed_from_u64(7), now);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_output_reads_back_as_line_source() {
        let mut out = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        let sent = produce(&mut out, &mut rng, 3, Duration::ZERO, std::future::pending())
            .await
            .unwrap();
        assert_eq!(sent, 3);

        let mut source = LineSource::new(out.as_slice());
        for _ in 0..3 {
            let line = source.recv().await.unwrap();
            let order: Order = serde_json::from_slice(&line).unwrap();
            OrderValidator::new().validate(&order).unwrap();
        }
        assert!(matches!(source.recv().await, Err(SourceError::Exhausted)));
    }

    #[tokio::test]
    async fn test_unbounded_run_stops_on_signal() {
        let mut out = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        let sent = produce(&mut out, &mut rng, 0, Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await
        .unwrap();

        assert!(sent >= 1);
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count() as u64, sent);
    }
}
