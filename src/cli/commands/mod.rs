mod admin;
mod init;
mod price;

pub use admin::cmd_create_admin;
pub use init::cmd_init;
pub use price::cmd_price;
