use js_sys::Function;
use wasm_bindgen::prelude::*;

mod console;
pub mod deck;
pub mod error;
pub mod game;
pub mod hand;
pub mod payout;
pub mod player;
pub mod sim;
pub mod solver;
pub mod strategy;

pub use deck::{CardSource, Deck, Rank, ReplayShoe};
pub use error::{ConfigError, Error, InvalidAction, RoundError};
pub use game::{format_currency, ActiveHand, BalanceSink, Round, RoundPhase, RoundRecord};
pub use hand::{Hand, MAX_HANDS};
pub use payout::{Outcome, Settlement};
pub use player::{play_hand, play_round, Decision, InteractivePolicy, Policy, Prompt};
pub use sim::Bankroll;
pub use solver::{solve, EvTable, Solution};
pub use strategy::{Action, ActionSet, StrategyTable, TablePolicy};

fn setup() {
    console_error_panic_hook::set_once();
    console::init(log::LevelFilter::Info);
}

fn read_input(params: &JsValue) -> Result<sim::SessionInput, JsValue> {
    serde_wasm_bindgen::from_value(params.clone())
        .map_err(|err| JsValue::from_str(&format!("Invalid input: {err}")))
}

#[wasm_bindgen]
pub fn run_session(params: &JsValue) -> Result<JsValue, JsValue> {
    setup();
    let input = read_input(params)?;

    let result = sim::run(input)
        .map_err(|err| JsValue::from_str(&format!("Session failed: {err}")))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|err| JsValue::from_str(&format!("Serialization failed: {err}")))
}

#[wasm_bindgen]
pub fn run_session_with_progress(
    params: &JsValue,
    progress_callback: &Function,
) -> Result<JsValue, JsValue> {
    setup();
    let input = read_input(params)?;

    let progress_cb = |current: u32, total: u32| {
        let _ = progress_callback.call2(
            &JsValue::NULL,
            &JsValue::from(current),
            &JsValue::from(total),
        );
    };

    let result = sim::run_with_progress(input, progress_cb)
        .map_err(|err| JsValue::from_str(&format!("Session failed: {err}")))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|err| JsValue::from_str(&format!("Serialization failed: {err}")))
}

#[wasm_bindgen]
pub fn play_single_round(params: &JsValue) -> Result<JsValue, JsValue> {
    setup();
    let input = read_input(params)?;

    let record = sim::run_single_round(input)
        .map_err(|err| JsValue::from_str(&format!("Round failed: {err}")))?;

    serde_wasm_bindgen::to_value(&record)
        .map_err(|err| JsValue::from_str(&format!("Serialization failed: {err}")))
}

/// Solves the expected-value tables and returns them with the optimal chart
/// and the player's advantage.
#[wasm_bindgen]
pub fn solve_strategy() -> Result<JsValue, JsValue> {
    setup();
    let solution = solver::solve();

    serde_wasm_bindgen::to_value(&solution)
        .map_err(|err| JsValue::from_str(&format!("Serialization failed: {err}")))
}

/// Plays one round where `prompt(status, options)` returns the player's reply
/// for each decision. Returning anything but a string ends the round.
#[wasm_bindgen]
pub fn play_interactive_round(params: &JsValue, prompt: &Function) -> Result<JsValue, JsValue> {
    setup();
    let input = read_input(params)?;

    let mut policy = InteractivePolicy::new(JsPrompt {
        ask: prompt,
        notice: None,
    });
    let record = sim::run_round_with(&input, &mut policy)
        .map_err(|err| JsValue::from_str(&format!("Round failed: {err}")))?;

    serde_wasm_bindgen::to_value(&record)
        .map_err(|err| JsValue::from_str(&format!("Serialization failed: {err}")))
}

struct JsPrompt<'a> {
    ask: &'a Function,
    notice: Option<String>,
}

impl Prompt for JsPrompt<'_> {
    fn ask(&mut self, decision: &Decision<'_>, legal: ActionSet) -> Option<String> {
        let mut status = String::new();
        if let Some(notice) = self.notice.take() {
            status.push_str(&notice);
            status.push('\n');
        }
        status.push_str(&format!(
            "Dealer: {}\nHand: {}",
            decision.dealer(),
            decision.hand()
        ));
        self.ask
            .call2(
                &JsValue::NULL,
                &JsValue::from_str(&status),
                &JsValue::from_str(&legal.to_string()),
            )
            .ok()?
            .as_string()
    }

    fn report(&mut self, message: &str) {
        self.notice = Some(message.to_string());
    }
}
