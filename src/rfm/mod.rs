//! Recency / Frequency / Monetary features per customer.
//!
//! Monetary value comes from `order_details` (price * quantity * (1 - discount),
//! summed per order) and is inner-joined onto `orders`, so an order without
//! line items contributes nothing, not even to frequency. Recency is measured
//! in whole days against a snapshot one day after the latest joined order.

mod artifact;

pub use artifact::{read_features, write_features};

use crate::store::Store;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RfmError {
    #[error("failed to read table {table}: {source}")]
    Store {
        table: &'static str,
        #[source]
        source: duckdb::Error,
    },

    #[error("order {order_id} has an unparseable order_date: {value:?}")]
    InvalidOrderDate {
        order_id: i64,
        value: Option<String>,
    },

    #[error("no orders with line items; snapshot date is undefined")]
    NoOrders,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfmRecord {
    /// Days between the snapshot and the customer's latest order
    pub recency: i64,
    /// Orders placed
    pub frequency: u64,
    /// Revenue after discount across all orders
    pub monetary: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: i64,
    pub customer_id: Option<String>,
    pub order_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderLine {
    pub order_id: i64,
    pub unit_price: f64,
    pub quantity: f64,
    pub discount: f64,
}

impl OrderLine {
    pub fn revenue(&self) -> f64 {
        self.unit_price * self.quantity * (1.0 - self.discount)
    }
}

const ORDERS_SQL: &str = "SELECT CAST(order_id AS BIGINT), CAST(customer_id AS VARCHAR), \
                          CAST(order_date AS VARCHAR) FROM orders";

const ORDER_LINES_SQL: &str = "SELECT CAST(order_id AS BIGINT), CAST(unit_price AS DOUBLE), \
                               CAST(quantity AS DOUBLE), CAST(discount AS DOUBLE) \
                               FROM order_details";

/// Read and compute RFM features from a loaded store
pub fn derive_rfm(store: &Store) -> Result<BTreeMap<String, RfmRecord>, RfmError> {
    let orders = load_orders(store)?;
    let lines = load_order_lines(store)?;
    tracing::info!(
        orders = orders.len(),
        order_lines = lines.len(),
        "loaded order history"
    );

    let rfm = compute_rfm(&orders, &lines)?;
    tracing::info!(customers = rfm.len(), "derived RFM features");
    Ok(rfm)
}

pub fn load_orders(store: &Store) -> Result<Vec<Order>, RfmError> {
    let store_err = |source: duckdb::Error| RfmError::Store {
        table: "orders",
        source,
    };

    let mut stmt = store.connection().prepare(ORDERS_SQL).map_err(store_err)?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .map_err(store_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(store_err)?;

    raw.into_iter()
        .map(|(order_id, customer_id, date)| -> Result<Order, RfmError> {
            let order_date = date
                .as_deref()
                .and_then(parse_order_date)
                .ok_or_else(|| RfmError::InvalidOrderDate {
                    order_id,
                    value: date.clone(),
                })?;
            Ok(Order {
                order_id,
                customer_id,
                order_date,
            })
        })
        .collect()
}

pub fn load_order_lines(store: &Store) -> Result<Vec<OrderLine>, RfmError> {
    let store_err = |source: duckdb::Error| RfmError::Store {
        table: "order_details",
        source,
    };

    let mut stmt = store
        .connection()
        .prepare(ORDER_LINES_SQL)
        .map_err(store_err)?;
    let lines = stmt
        .query_map([], |row| {
            Ok(OrderLine {
                order_id: row.get(0)?,
                unit_price: row.get(1)?,
                quantity: row.get(2)?,
                discount: row.get(3)?,
            })
        })
        .map_err(store_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(store_err)?;
    Ok(lines)
}

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD[ T]HH:MM:SS[.fff]`
pub fn parse_order_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Pure RFM computation over already-loaded rows
pub fn compute_rfm(
    orders: &[Order],
    lines: &[OrderLine],
) -> Result<BTreeMap<String, RfmRecord>, RfmError> {
    let mut order_monetary: HashMap<i64, f64> = HashMap::new();
    for line in lines {
        *order_monetary.entry(line.order_id).or_insert(0.0) += line.revenue();
    }

    // Inner join: orders with no line items drop out here
    let joined: Vec<(&Order, f64)> = orders
        .iter()
        .filter_map(|o| order_monetary.get(&o.order_id).map(|m| (o, *m)))
        .collect();

    let latest = joined
        .iter()
        .map(|(o, _)| o.order_date)
        .max()
        .ok_or(RfmError::NoOrders)?;
    let snapshot = latest + Duration::days(1);

    let dropped = orders.len() - joined.len();
    if dropped > 0 {
        tracing::debug!(dropped, "orders without line items excluded");
    }

    struct Acc {
        last_order: NaiveDateTime,
        frequency: u64,
        monetary: f64,
    }

    let mut per_customer: BTreeMap<&str, Acc> = BTreeMap::new();
    for (order, monetary) in &joined {
        // Null customer keys are skipped, as a group-by would
        let Some(customer) = order.customer_id.as_deref() else {
            continue;
        };
        per_customer
            .entry(customer)
            .and_modify(|acc| {
                acc.last_order = acc.last_order.max(order.order_date);
                acc.frequency += 1;
                acc.monetary += monetary;
            })
            .or_insert(Acc {
                last_order: order.order_date,
                frequency: 1,
                monetary: *monetary,
            });
    }

    Ok(per_customer
        .into_iter()
        .map(|(customer, acc)| {
            (
                customer.to_string(),
                RfmRecord {
                    recency: (snapshot - acc.last_order).num_days(),
                    frequency: acc.frequency,
                    monetary: acc.monetary,
                },
            )
        })
        .collect())
}
