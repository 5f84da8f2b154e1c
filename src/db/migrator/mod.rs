use sea_orm_migration::prelude::*;

mod m20250901_initial;
mod m20250902_seed_admin;
mod m20250915_lab_orders;

pub use m20250902_seed_admin::DEFAULT_ADMIN_API_KEY;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_initial::Migration),
            Box::new(m20250902_seed_admin::Migration),
            Box::new(m20250915_lab_orders::Migration),
        ]
    }
}
