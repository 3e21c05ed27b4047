//! # Mock Store
//!
//! Utilities for testing the service in isolation.
//!
//! [`MockStore`] answers store calls from a queue of expectations, in order,
//! and counts every call it receives. Tests use the counters to assert that a
//! code path did or did not touch the durable store, and [`MockStore::verify`]
//! to assert every expectation was consumed.
//!
//! ```ignore
//! let store = MockStore::new();
//! store.expect_get_by_id("o1").return_ok(order);
//! store.expect_save().return_err(OrderError::storage("disk full"));
//!
//! let service = OrderService::new(store.clone(), 16);
//! // exercise the service...
//! store.verify();
//! ```

use crate::context::RequestContext;
use crate::error::{OrderError, Result};
use crate::model::{Order, OrderUid};
use crate::store::DurableStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Represents an expected call and the response to give it.
enum Expectation {
    Save {
        response: Result<()>,
    },
    GetById {
        id: OrderUid,
        response: Result<Order>,
    },
    GetAll {
        response: Result<Vec<Order>>,
    },
}

impl Expectation {
    fn name(&self) -> &'static str {
        match self {
            Expectation::Save { .. } => "save",
            Expectation::GetById { .. } => "get_by_id",
            Expectation::GetAll { .. } => "get_all",
        }
    }
}

/// Number of calls received per operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub save: usize,
    pub get_by_id: usize,
    pub get_all: usize,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    calls: CallCounts,
    saved: Vec<Order>,
}

/// An expectation-driven [`DurableStore`]. Clones share state.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `save` call.
    pub fn expect_save(&self) -> SaveExpectationBuilder {
        SaveExpectationBuilder {
            state: Arc::clone(&self.state),
        }
    }

    /// Expects a `get_by_id` call for `id`.
    pub fn expect_get_by_id(&self, id: impl Into<OrderUid>) -> GetExpectationBuilder {
        GetExpectationBuilder {
            id: id.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Expects a `get_all` call.
    pub fn expect_get_all(&self) -> GetAllExpectationBuilder {
        GetAllExpectationBuilder {
            state: Arc::clone(&self.state),
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Orders passed to successful `save` calls, in call order.
    pub fn saved(&self) -> Vec<Order> {
        self.state.lock().saved.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.expectations.is_empty() {
            let pending: Vec<_> = state.expectations.iter().map(Expectation::name).collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                pending.len(),
                pending
            );
        }
    }

    fn next(&self, call: &'static str) -> Expectation {
        let mut state = self.state.lock();
        match call {
            "save" => state.calls.save += 1,
            "get_by_id" => state.calls.get_by_id += 1,
            _ => state.calls.get_all += 1,
        }
        match state.expectations.pop_front() {
            Some(expectation) => expectation,
            None => panic!("Unexpected {call} call: no expectations left"),
        }
    }
}

#[async_trait]
impl DurableStore for MockStore {
    async fn save(&self, ctx: &RequestContext, order: &Order) -> Result<()> {
        ctx.check()?;
        match self.next("save") {
            Expectation::Save { response } => {
                if response.is_ok() {
                    self.state.lock().saved.push(order.clone());
                }
                response
            }
            other => panic!("Expected {}, got save", other.name()),
        }
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Order> {
        ctx.check()?;
        match self.next("get_by_id") {
            Expectation::GetById {
                id: expected,
                response,
            } => {
                assert_eq!(&expected, id, "get_by_id called with unexpected id");
                response
            }
            other => panic!("Expected {}, got get_by_id", other.name()),
        }
    }

    async fn get_all(&self, ctx: &RequestContext) -> Result<Vec<Order>> {
        ctx.check()?;
        match self.next("get_all") {
            Expectation::GetAll { response } => response,
            other => panic!("Expected {}, got get_all", other.name()),
        }
    }
}

/// Builder for `save` expectations.
pub struct SaveExpectationBuilder {
    state: Arc<Mutex<State>>,
}

impl SaveExpectationBuilder {
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    pub fn return_err(self, error: OrderError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<()>) {
        self.state
            .lock()
            .expectations
            .push_back(Expectation::Save { response });
    }
}

/// Builder for `get_by_id` expectations.
pub struct GetExpectationBuilder {
    id: OrderUid,
    state: Arc<Mutex<State>>,
}

impl GetExpectationBuilder {
    pub fn return_ok(self, order: Order) {
        self.push(Ok(order));
    }

    /// Shorthand for a `NotFound` answer.
    pub fn return_not_found(self) {
        let error = OrderError::NotFound(self.id.to_string());
        self.push(Err(error));
    }

    pub fn return_err(self, error: OrderError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Order>) {
        self.state
            .lock()
            .expectations
            .push_back(Expectation::GetById {
                id: self.id,
                response,
            });
    }
}

/// Builder for `get_all` expectations.
pub struct GetAllExpectationBuilder {
    state: Arc<Mutex<State>>,
}

impl GetAllExpectationBuilder {
    pub fn return_ok(self, orders: Vec<Order>) {
        self.push(Ok(orders));
    }

    pub fn return_err(self, error: OrderError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Vec<Order>>) {
        self.state
            .lock()
            .expectations
            .push_back(Expectation::GetAll { response });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::sample_order;

    #[tokio::test]
    async fn test_mock_store_with_expectations() {
        let store = MockStore::new();
        store.expect_save().return_ok();
        store
            .expect_get_by_id("o1")
            .return_ok(sample_order("o1"));
        store.expect_get_by_id("o2").return_not_found();

        let ctx = RequestContext::background();
        store.save(&ctx, &sample_order("o1")).await.unwrap();
        let found = store.get_by_id(&ctx, &OrderUid::from("o1")).await.unwrap();
        assert_eq!(found.order_uid.as_str(), "o1");
        let missing = store.get_by_id(&ctx, &OrderUid::from("o2")).await;
        assert!(missing.unwrap_err().is_not_found());

        assert_eq!(
            store.calls(),
            CallCounts {
                save: 1,
                get_by_id: 2,
                get_all: 0
            }
        );
        assert_eq!(store.saved().len(), 1);
        store.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn test_verify_panics_on_leftovers() {
        let store = MockStore::new();
        store.expect_get_all().return_ok(vec![]);
        store.verify();
    }
}
