pub mod prelude;

pub mod enums;
pub mod lab_group_tests;
pub mod lab_groups;
pub mod lab_results;
pub mod lab_tests;
pub mod order_items;
pub mod orders;
pub mod patients;
pub mod payments;
pub mod users;
pub mod visits;
