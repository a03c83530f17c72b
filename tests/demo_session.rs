//! End-to-end walk through the demo state and the metrics derived from it.

use efi_navigator::metrics::{
    diversification_score, health_badge, health_score, HealthBadge, MetricsSnapshot, DEFAULT_ETH_PRICE,
};
use efi_navigator::model::{BalancesPatch, RiskLevel};
use efi_navigator::profiles::{get_all_user_profiles, get_user_profile};
use efi_navigator::store::DemoStore;

#[test]
fn test_session_edit_switch_reset() {
    let mut store = DemoStore::new();
    let beginner = get_user_profile("beginner");
    let expert = get_user_profile("expert");

    store.update_balances(BalancesPatch::default().weeth(7.5)).unwrap();
    assert_eq!(store.balances().weeth, 7.5);
    assert_eq!(store.balances().eth, beginner.balances.eth);
    assert_eq!(store.assumptions(), &beginner.assumptions);

    store.switch_user("expert");
    assert_eq!(store.balances(), &expert.balances);
    assert_eq!(store.assumptions(), &expert.assumptions);

    store.update_balances(BalancesPatch::default().eth(0.0).liquid_usd(1.0)).unwrap();
    store.reset_to_demo();
    assert_eq!(store.balances(), &expert.balances);
    assert_eq!(store.current_user().map(|p| p.id), Some("expert"));

    assert_eq!(store.changes(), 4);
}

#[test]
fn test_rejected_update_is_not_counted() {
    let mut store = DemoStore::new();
    let before = store.snapshot();
    assert!(store.update_balances(BalancesPatch::default().eeth(-0.1)).is_err());
    assert!(store.update_balances(BalancesPatch::default().eth(f64::INFINITY)).is_err());
    assert_eq!(store.state(), &before);
    assert_eq!(store.changes(), 0);
}

#[test]
fn test_unknown_profile_lands_on_beginner() {
    let mut store = DemoStore::new();
    store.switch_user("expert");
    store.switch_user("whale");
    assert_eq!(store.current_user().map(|p| p.id), Some("beginner"));
    assert_eq!(store.balances(), &get_user_profile("beginner").balances);
}

#[test]
fn test_registry_snapshots_are_well_formed() {
    for profile in get_all_user_profiles() {
        let m = MetricsSnapshot::compute(&profile.balances, &profile.assumptions, DEFAULT_ETH_PRICE, None);
        assert!(m.total_value_usd > 0.0, "{}", profile.id);
        assert!(m.health_score <= 100);
        assert!(m.diversification_score <= 100);
        assert_eq!(m.health_badge, health_badge(m.health_score));
        assert!(m.blended_apy >= 0.0);
    }
}

#[test]
fn test_edit_changes_metrics() {
    let mut store = DemoStore::new();
    let before = MetricsSnapshot::compute(store.balances(), store.assumptions(), DEFAULT_ETH_PRICE, None);
    store
        .update_balances(BalancesPatch::default().eth(0.0).eeth(3.5))
        .unwrap();
    let after = MetricsSnapshot::compute(store.balances(), store.assumptions(), DEFAULT_ETH_PRICE, None);
    // staking idle ETH raises the effective yield and narrows the gap
    assert!(after.effective_apy > before.effective_apy);
    assert!(after.opportunity_cost.missed_apy_points < before.opportunity_cost.missed_apy_points);
}

#[test]
fn test_health_and_diversification_examples() {
    assert_eq!(health_score(RiskLevel::Low, 1.0, 0.0, 3500.0), 85);
    assert_eq!(health_score(RiskLevel::High, 1.0, 3500.0, 3500.0), 70);
    assert_eq!(health_badge(70), HealthBadge::Good);
    assert_eq!(health_badge(69), HealthBadge::Caution);
    assert_eq!(health_badge(39), HealthBadge::Risky);
    assert_eq!(diversification_score([100.0, 0.0]), 0);
    assert_eq!(diversification_score([50.0, 50.0]), 100);
}
