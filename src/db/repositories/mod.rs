//! Table-level data access.
//!
//! Repositories borrow any [`sea_orm::ConnectionTrait`], so the same queries
//! run on the pool or inside a transaction.

pub mod lab;
pub mod order;
pub mod patient;
pub mod payment;
pub mod user;
pub mod visit;

pub use lab::{LabRepository, NewLabGroup, NewLabResult, NewLabTest};
pub use order::{NewOrder, OrderFilter, OrderRepository};
pub use patient::{NewPatient, PatientRepository};
pub use payment::{NewPayment, PaymentFilter, PaymentRepository};
pub use user::{AccountFilter, NewAccount, UserRepository};
pub use visit::{NewVisit, VisitRepository};

/// One page of rows plus the total count before paging.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}
