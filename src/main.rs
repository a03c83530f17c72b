use std::time::Instant;

use anyhow::Result;
use serde_json::json;

use efi_navigator::api::{HttpNavigatorApi, NavigatorApi, SimRequest, SimResponse};
use efi_navigator::chat::ChatAssistant;
use efi_navigator::config::Config;
use efi_navigator::logging::{log, log_metrics_snapshot, log_session_summary, obj, v_num, v_str, Domain, Level};
use efi_navigator::metrics::MetricsSnapshot;
use efi_navigator::profiles::get_all_user_profiles;
use efi_navigator::store::DemoStore;
use efi_navigator::transcript::TranscriptStore;

/// Walks every demo profile, prints its metrics as JSON lines on stdout and,
/// when a question is given on the command line, asks the chat assistant
/// about the configured profile.
#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cfg = Config::from_env();
    let api = HttpNavigatorApi::new(&cfg)?;
    let mut store = DemoStore::new();
    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("api_base", v_str(&cfg.api_base)),
            ("eth_price", v_num(cfg.eth_price)),
            ("profile", v_str(&cfg.initial_profile)),
        ]),
    );

    let online = match api.health().await {
        Ok(h) => h.status == "ok",
        Err(e) => {
            log(
                Level::Warn,
                Domain::Api,
                "offline",
                obj(&[("msg", v_str(&format!("{:#}", e)))]),
            );
            false
        }
    };

    let mut eth_price = cfg.eth_price;
    if online {
        match api.rates(cfg.live_rates).await {
            Ok(rates) => {
                if let Some(p) = rates.eth_price.filter(|p| *p > 0.0 && p.is_finite()) {
                    eth_price = p;
                }
            }
            Err(e) => log(
                Level::Warn,
                Domain::Api,
                "rates_unavailable",
                obj(&[("msg", v_str(&format!("{:#}", e)))]),
            ),
        }
    }

    for profile in get_all_user_profiles() {
        store.switch_user(profile.id);
        let state = store.snapshot();

        let remote: Option<SimResponse> = if online {
            match api.simulate(&SimRequest::from_state(&state)).await {
                Ok(r) => Some(r),
                Err(e) => {
                    log(
                        Level::Warn,
                        Domain::Api,
                        "simulate_failed",
                        obj(&[("profile_id", v_str(profile.id)), ("msg", v_str(&format!("{:#}", e)))]),
                    );
                    None
                }
            }
        } else {
            None
        };

        let mut snapshot = MetricsSnapshot::compute(
            &state.balances,
            &state.assumptions,
            eth_price,
            remote.as_ref().map(|r| r.risk),
        );
        if let Some(best) = remote.as_ref().and_then(|r| r.best_apy()) {
            snapshot = snapshot.with_reference_apy(best, eth_price);
        }

        log_metrics_snapshot(
            Some(profile.id),
            &[
                ("health_score", json!(snapshot.health_score)),
                ("diversification_score", json!(snapshot.diversification_score)),
                ("blended_apy", v_num(snapshot.blended_apy)),
            ],
        );

        let forecast_final = if remote.is_some() {
            api.forecast(snapshot.total_value_usd, snapshot.blended_apy, cfg.forecast_months)
                .await
                .ok()
                .and_then(|f| f.final_value())
        } else {
            None
        };

        let line = json!({
            "profile": profile.id,
            "name": profile.name,
            "level": profile.level,
            "source": if remote.is_some() { "simulator" } else { "local" },
            "metrics": snapshot,
            "strategies": remote.as_ref().map(|r| &r.strategies),
            "forecast_final_usd": forecast_final,
        });
        println!("{}", line);
    }

    store.switch_user(&cfg.initial_profile);

    if !question.trim().is_empty() {
        let mut assistant = ChatAssistant::new(&api, eth_price);
        if let Some(path) = &cfg.transcript_path {
            let mut transcript = TranscriptStore::new(path)?;
            transcript.init()?;
            assistant = assistant.with_transcript(transcript, cfg.transcript_history);
        }
        match assistant.ask_cached(store.state(), &question).await {
            Ok(answer) => println!("{}", json!({ "question": question.trim(), "answer": answer })),
            Err(e) => log(
                Level::Error,
                Domain::Chat,
                "ask_failed",
                obj(&[("msg", v_str(&format!("{:#}", e)))]),
            ),
        }
    }

    log_session_summary(
        started.elapsed().as_millis() as u64,
        store.changes(),
        api.calls(),
        api.failures(),
    );
    Ok(())
}
