//! Wager Engine entry point
//!
//! Native: runs a headless demo session driven by settings, then saves the
//! balance. Web: initializes logging; the page talks to `platform::WebTable`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::PathBuf;

    use wager_engine::game::{
        EntropySource, OsEntropy, RevealResult, SeededEntropy, StopCondition, StopToken,
        ThreadPacer, run_autoplay,
    };
    use wager_engine::persistence;
    use wager_engine::{Ledger, SaveData, SessionPhase, Settings, Table, VariantPreset};

    /// Settings file, save file, optional variant override
    struct Args {
        settings: PathBuf,
        save: PathBuf,
        variant: Option<VariantPreset>,
    }

    fn parse_args() -> Args {
        let mut args = Args {
            settings: PathBuf::from("wager-engine.json"),
            save: PathBuf::from("wager-engine-save.json"),
            variant: None,
        };
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--settings" => {
                    if let Some(path) = iter.next() {
                        args.settings = PathBuf::from(path);
                    }
                }
                "--save" => {
                    if let Some(path) = iter.next() {
                        args.save = PathBuf::from(path);
                    }
                }
                other => match VariantPreset::from_str(other) {
                    Some(preset) => args.variant = Some(preset),
                    None => log::warn!("Ignoring unknown argument '{}'", other),
                },
            }
        }
        args
    }

    fn entropy(settings: &Settings) -> Box<dyn EntropySource> {
        match settings.seed {
            Some(seed) => {
                log::info!("Using fixed seed {}", seed);
                Box::new(SeededEntropy::new(seed))
            }
            None => Box::new(OsEntropy),
        }
    }

    /// Whether the saved balance covers the configured stake. Balances are never topped up.
    pub(crate) fn can_afford(save: &SaveData, settings: &Settings) -> bool {
        Ledger::new(save.balance).is_ok_and(|ledger| ledger.can_cover(settings.stake))
    }

    pub fn run() {
        let args = parse_args();
        let mut settings = Settings::load(&args.settings);
        if let Some(preset) = args.variant {
            settings.apply_preset(preset);
        }

        let save = if args.save.exists() {
            persistence::load_or_default(&args.save)
        } else {
            log::info!("New player, opening balance {}", settings.starting_balance);
            SaveData {
                balance: settings.starting_balance,
                last_played: None,
            }
        };
        if !can_afford(&save, &settings) {
            log::warn!(
                "Balance {} cannot cover a stake of {}; not playing",
                save.balance,
                settings.stake
            );
            return;
        }
        let mut table = match Table::from_save(&save, entropy(&settings)) {
            Ok(table) => table,
            Err(e) => {
                log::error!("Could not restore the saved balance: {}", e);
                return;
            }
        };

        let config = settings.variant.config();
        let handle = match table.open_session(settings.stake, settings.risk_density, &config) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Could not open a {} session: {}", config.name, e);
                return;
            }
        };
        println!(
            "{}: staked {} at risk {} (balance {})",
            config.name,
            settings.stake,
            settings.risk_density,
            table.balance()
        );

        let stop = settings
            .hit_target
            .map(StopCondition::hits)
            .unwrap_or_default();
        let token = StopToken::new();
        let report = match run_autoplay(
            &mut table,
            handle,
            settings.autoplay_interval(),
            stop,
            &token,
            &mut ThreadPacer,
        ) {
            Ok(report) => report,
            Err(e) => {
                log::error!("Autoplay failed: {}", e);
                return;
            }
        };
        for result in &report.results {
            match result {
                RevealResult::Safe { multiplier, hits } => {
                    println!("  hit #{hits}: x{multiplier:.4}")
                }
                RevealResult::Hazard { layout } => println!("  hazard! {layout:?}"),
                RevealResult::Cleared { multiplier, payout } => {
                    println!("  board cleared at x{multiplier:.4}, paid {:.2}", payout.amount)
                }
            }
        }

        if table.phase() == SessionPhase::Active {
            match table.cash_out(handle) {
                Ok(payout) => println!(
                    "Cashed out x{:.4}: {:.2} + bonus {:.2}",
                    payout.multiplier, payout.base, payout.bonus
                ),
                Err(e) => log::warn!("Cash-out refused: {}", e),
            }
        }
        println!("Balance: {:.2}", table.balance());

        if let Err(e) = persistence::save_to_file(&args.save, &table.to_save()) {
            log::error!("Failed to save: {}", e);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Wager Engine (web) ready");
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Wager Engine (native) starting...");
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
