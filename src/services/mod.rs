pub mod validation;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, RegisterRequest, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod membership_service;
pub mod membership_service_impl;
pub use membership_service::{
    ApprovalOptions, CreatePaymentRequest, MembershipDecision, MembershipError,
    MembershipService, PaymentInfoUpdate, PendingApprovals,
};
pub use membership_service_impl::SeaOrmMembershipService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{
    AccountDetail, AccountError, AccountService, AccountUpdate, DashboardStats, RevenueBucket,
    RevenuePeriod, SubscriptionUpdate,
};
pub use account_service_impl::SeaOrmAccountService;

pub mod registry_service;
pub mod registry_service_impl;
pub use registry_service::{PatientInput, RegistryError, RegistryService, VisitInput, VisitQuery};
pub use registry_service_impl::SeaOrmRegistryService;

pub mod lab_service;
pub mod lab_service_impl;
pub use lab_service::{LabError, LabGroupInput, LabResultInput, LabService, LabTestInput};
pub use lab_service_impl::SeaOrmLabService;

pub mod order_service;
pub mod order_service_impl;
pub use order_service::{CancelRequest, OrderError, OrderLine, OrderRequest, OrderService};
pub use order_service_impl::SeaOrmOrderService;
