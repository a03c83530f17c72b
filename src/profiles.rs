//! Static registry of demo personas.
//!
//! Each profile bundles a wallet snapshot and a set of yield assumptions that
//! illustrate a different kind of user. The table is fixed at build time.

use serde::Serialize;

use crate::logging::log_profile_fallback;
use crate::model::{Assumptions, UserLevel, WalletBalances};

pub const BEGINNER_ID: &str = "beginner";
pub const EXPERT_ID: &str = "expert";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub avatar: &'static str,
    pub level: UserLevel,
    pub description: &'static str,
    pub story: &'static str,
    pub balances: WalletBalances,
    pub assumptions: Assumptions,
    pub problems: &'static [&'static str],
    pub opportunities: &'static [&'static str],
}

/// Registry order is the rendering order.
static USER_PROFILES: [UserProfile; 2] = [
    UserProfile {
        id: BEGINNER_ID,
        name: "Sam",
        avatar: "🌱",
        level: UserLevel::Beginner,
        description: "New to DeFi, holding mostly plain ETH",
        story: "Sam bought ETH on an exchange last year and moved it to a wallet. \
                A friend mentioned liquid staking, but Sam is not sure what eETH or \
                weETH are or whether they are worth the extra steps.",
        balances: WalletBalances::new(3.0, 0.5, 0.0, 250.0),
        assumptions: Assumptions::new(0.04, 0.10, 0.05, 0.50),
        problems: &[
            "Most ETH sits idle and earns nothing",
            "Unsure what the staking tokens do",
            "Almost no stable allocation for expenses",
        ],
        opportunities: &[
            "Stake idle ETH into eETH for base rewards",
            "Wrap eETH into weETH to use it across DeFi",
            "Park a small stable buffer in Liquid USD",
        ],
    },
    UserProfile {
        id: EXPERT_ID,
        name: "Riley",
        avatar: "🦉",
        level: UserLevel::Expert,
        description: "Active DeFi user running a looped weETH position",
        story: "Riley already holds weETH and a Liquid USD vault and wants to know \
                whether borrowing stables against weETH still pays after the latest \
                rate changes.",
        balances: WalletBalances::new(0.5, 2.0, 12.0, 18_000.0),
        assumptions: Assumptions::new(0.038, 0.11, 0.055, 0.50),
        problems: &[
            "Leverage spread shrinks when borrow rates rise",
            "Liquidation risk if ETH drops sharply",
            "Yield concentrated in one protocol",
        ],
        opportunities: &[
            "Rebalance borrowed amount below the LTV ceiling",
            "Compare the looped APY against plain staking",
            "Diversify stable yield across vaults",
        ],
    },
];

/// Look up a profile by id. Unknown ids fall back to the beginner profile.
pub fn get_user_profile(id: &str) -> &'static UserProfile {
    match find_user_profile(id) {
        Some(p) => p,
        None => {
            log_profile_fallback(id, BEGINNER_ID);
            beginner()
        }
    }
}

/// Strict lookup, `None` for unknown ids.
pub fn find_user_profile(id: &str) -> Option<&'static UserProfile> {
    USER_PROFILES.iter().find(|p| p.id == id)
}

pub fn get_all_user_profiles() -> &'static [UserProfile] {
    &USER_PROFILES
}

pub fn beginner() -> &'static UserProfile {
    &USER_PROFILES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_falls_back_to_beginner() {
        let fallback = get_user_profile("nonexistent");
        let beginner = get_user_profile("beginner");
        assert!(std::ptr::eq(fallback, beginner));
        assert_eq!(fallback.id, BEGINNER_ID);
    }

    #[test]
    fn test_known_ids_resolve() {
        assert_eq!(get_user_profile("expert").level, UserLevel::Expert);
        assert!(find_user_profile("expert").is_some());
        assert!(find_user_profile("whale").is_none());
    }

    #[test]
    fn test_registry_order_is_stable() {
        let ids: Vec<_> = get_all_user_profiles().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["beginner", "expert"]);
    }

    #[test]
    fn test_profiles_are_well_formed() {
        for p in get_all_user_profiles() {
            let b = p.balances;
            assert!(b.eth >= 0.0 && b.eeth >= 0.0 && b.weeth >= 0.0 && b.liquid_usd >= 0.0);
            assert!((0.0..=1.0).contains(&p.assumptions.ltv_weeth));
            assert!(!p.problems.is_empty());
            assert!(!p.opportunities.is_empty());
        }
    }
}
