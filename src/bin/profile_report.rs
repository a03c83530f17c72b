//! Offline report of every demo profile: derived metrics, local strategy
//! estimates and allocation, as one pretty JSON document on stdout.

use serde_json::json;

use efi_navigator::config::Config;
use efi_navigator::metrics::{
    allocation, best_strategy_apy, strategy_estimates, total_eth_value, MetricsSnapshot,
};
use efi_navigator::profiles::get_all_user_profiles;

fn main() {
    let cfg = Config::from_env();
    let eth_price = std::env::args()
        .nth(1)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|p| *p > 0.0 && p.is_finite())
        .unwrap_or(cfg.eth_price);

    let mut report = Vec::new();
    for profile in get_all_user_profiles() {
        let balances = &profile.balances;
        let assumptions = &profile.assumptions;
        let snapshot = MetricsSnapshot::compute(balances, assumptions, eth_price, None)
            .with_reference_apy(best_strategy_apy(assumptions), eth_price);
        let notional = total_eth_value(balances, eth_price);
        let alloc = allocation(balances, eth_price);

        report.push(json!({
            "id": profile.id,
            "name": profile.name,
            "avatar": profile.avatar,
            "level": profile.level,
            "balances": balances,
            "assumptions": assumptions,
            "metrics": snapshot,
            "allocation": alloc.entries.iter().map(|(k, v)| json!({"asset": k, "pct": v})).collect::<Vec<_>>(),
            "strategies": strategy_estimates(notional, assumptions),
            "problems": profile.problems,
            "opportunities": profile.opportunities,
        }));
    }

    let doc = json!({ "eth_price": eth_price, "profiles": report });
    match serde_json::to_string_pretty(&doc) {
        Ok(s) => println!("{}", s),
        Err(err) => eprintln!("failed to render report: {}", err),
    }
}
