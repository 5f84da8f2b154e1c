use crate::config::Config;
use crate::domain::pricing;

pub fn cmd_price(config: &Config, plan: &str, months: u32) -> anyhow::Result<()> {
    let amount = pricing::calculate_price(plan, months)?;
    let currency = config.subscription.currency;

    println!("{plan} for {months} month(s): {amount} {currency}");

    Ok(())
}
