pub mod account;
pub mod lab;
pub mod order;
pub mod patient;
pub mod payment;
pub mod visit;

pub use account::Account;
pub use lab::{LabGroup, LabResult, LabTest};
pub use order::{Order, OrderItem};
pub use patient::Patient;
pub use payment::Payment;
pub use visit::{Visit, VisitWithPatient};

pub use crate::entities::enums::{
    ApprovalStatus, Currency, OrderPaymentMethod, OrderStatus, PaymentMethod, PaymentStatus, Plan,
    Role, SubscriptionStatus, VisitStatus,
};
