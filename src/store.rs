//! Demo portfolio state.
//!
//! `DemoStore` is the single owner of the live balances, assumptions and
//! selected persona. All mutation goes through [`reduce`], which builds the
//! next state in full before it replaces the old one, so readers never see a
//! half-applied change. Each session gets its own store; nothing here is a
//! global.

use anyhow::Result;
use serde::Serialize;

use crate::logging::{log_state_change, log_state_rejected};
use crate::model::{Assumptions, BalancesPatch, WalletBalances};
use crate::profiles::{beginner, find_user_profile, get_user_profile, UserProfile};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoState {
    pub balances: WalletBalances,
    pub assumptions: Assumptions,
    /// Profile id, resolved through the registry on read.
    pub current_user: Option<&'static str>,
}

impl DemoState {
    pub fn from_profile(profile: &'static UserProfile) -> Self {
        Self {
            balances: profile.balances,
            assumptions: profile.assumptions,
            current_user: Some(profile.id),
        }
    }

    /// State with no selected persona, e.g. restored from elsewhere.
    pub fn detached(balances: WalletBalances, assumptions: Assumptions) -> Self {
        Self {
            balances,
            assumptions,
            current_user: None,
        }
    }

    pub fn current_profile(&self) -> Option<&'static UserProfile> {
        self.current_user.and_then(find_user_profile)
    }

    /// Deterministic hash for change tracking (floats quantized)
    pub fn hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();
        let b = &self.balances;
        for v in [b.eth, b.eeth, b.weeth, b.liquid_usd] {
            ((v * 1e8) as i64).hash(&mut h);
        }
        let a = &self.assumptions;
        for v in [a.apy_stake, a.apy_liquid_usd, a.borrow_rate, a.ltv_weeth] {
            ((v * 1e8) as i64).hash(&mut h);
        }
        self.current_user.hash(&mut h);
        h.finish()
    }
}

impl Default for DemoState {
    fn default() -> Self {
        Self::from_profile(beginner())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DemoAction {
    UpdateBalances(BalancesPatch),
    SwitchUser(String),
    ResetToDemo,
}

impl DemoAction {
    pub fn name(&self) -> &'static str {
        match self {
            DemoAction::UpdateBalances(_) => "update_balances",
            DemoAction::SwitchUser(_) => "switch_user",
            DemoAction::ResetToDemo => "reset_to_demo",
        }
    }
}

/// Pure transition: the next state for `action`, or an error leaving the
/// caller's state untouched.
pub fn reduce(state: &DemoState, action: &DemoAction) -> Result<DemoState> {
    match action {
        DemoAction::UpdateBalances(patch) => {
            patch.validate()?;
            Ok(DemoState {
                balances: state.balances.merged(patch),
                ..state.clone()
            })
        }
        DemoAction::SwitchUser(id) => Ok(switched(id)),
        DemoAction::ResetToDemo => Ok(reset(state)),
    }
}

/// State after selecting profile `id`; unknown ids resolve to beginner.
fn switched(id: &str) -> DemoState {
    DemoState::from_profile(get_user_profile(id))
}

/// Defaults of the current profile, or of beginner when none is set.
fn reset(state: &DemoState) -> DemoState {
    let profile = state.current_profile().unwrap_or_else(beginner);
    DemoState {
        balances: profile.balances,
        assumptions: profile.assumptions,
        current_user: state.current_user.or(Some(profile.id)),
    }
}

#[derive(Debug, Default)]
pub struct DemoStore {
    state: DemoState,
    changes: u64,
}

impl DemoStore {
    /// Starts on the beginner profile.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: DemoState) -> Self {
        Self { state, changes: 0 }
    }

    pub fn state(&self) -> &DemoState {
        &self.state
    }

    pub fn snapshot(&self) -> DemoState {
        self.state.clone()
    }

    pub fn balances(&self) -> &WalletBalances {
        &self.state.balances
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.state.assumptions
    }

    pub fn current_user(&self) -> Option<&'static UserProfile> {
        self.state.current_profile()
    }

    /// Number of applied mutations this session.
    pub fn changes(&self) -> u64 {
        self.changes
    }

    fn apply(&mut self, action: &'static str, next: DemoState) {
        self.state = next;
        self.changes += 1;
        log_state_change(action, self.state.current_user, self.state.hash());
    }

    pub fn dispatch(&mut self, action: DemoAction) -> Result<()> {
        match reduce(&self.state, &action) {
            Ok(next) => {
                self.apply(action.name(), next);
                Ok(())
            }
            Err(err) => {
                log_state_rejected(action.name(), &err.to_string());
                Err(err)
            }
        }
    }

    /// Merge the provided fields into the balances. Negative or non-finite
    /// amounts are rejected and nothing changes.
    pub fn update_balances(&mut self, patch: BalancesPatch) -> Result<()> {
        self.dispatch(DemoAction::UpdateBalances(patch))
    }

    /// Replace balances, assumptions and persona from the registry. Unknown ids
    /// select the beginner profile.
    pub fn switch_user(&mut self, id: &str) {
        self.apply("switch_user", switched(id));
    }

    /// Restore the current persona's defaults (beginner when none is set).
    pub fn reset_to_demo(&mut self) {
        let next = reset(&self.state);
        self.apply(DemoAction::ResetToDemo.name(), next);
    }
}
