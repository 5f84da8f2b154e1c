pub use super::lab_group_tests::Entity as LabGroupTests;
pub use super::lab_groups::Entity as LabGroups;
pub use super::lab_results::Entity as LabResults;
pub use super::lab_tests::Entity as LabTests;
pub use super::order_items::Entity as OrderItems;
pub use super::orders::Entity as Orders;
pub use super::patients::Entity as Patients;
pub use super::payments::Entity as Payments;
pub use super::users::Entity as Users;
pub use super::visits::Entity as Visits;
