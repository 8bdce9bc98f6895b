use serde::{Deserialize, Serialize};

use crate::{
    deck::{CardSource, Deck, Rank, ReplayShoe},
    error::{Error, Result},
    game::{format_currency, BalanceSink, Round, RoundRecord},
    payout::Outcome,
    player::{play_round, Policy},
    solver,
    strategy::{StrategyTable, TablePolicy},
};

fn default_rounds() -> u32 {
    1
}

fn default_progress_interval() -> u32 {
    10_000
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    /// Seed for the shuffled deck. Ignored when `shoe` is given.
    #[serde(default)]
    pub seed: u64,
    /// Card sequence to replay instead of a shuffled deck, e.g. `"AK 8 9"`.
    #[serde(default)]
    pub shoe: Option<String>,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Chart text or an array of rows of cell codes. Left out, the solved
    /// chart is played.
    #[serde(default)]
    pub strategy: serde_json::Value,
    #[serde(default)]
    pub starting_balance: f64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,
}

pub enum Shoe {
    Shuffled(Deck),
    Replay(ReplayShoe),
}

impl Shoe {
    pub fn from_input(input: &SessionInput) -> Result<Self> {
        match &input.shoe {
            Some(text) => {
                let cards = Rank::parse_sequence(text)
                    .map_err(|c| Error::Input(format!("unknown card symbol {c:?} in shoe")))?;
                ReplayShoe::new(cards)
                    .map(Shoe::Replay)
                    .ok_or_else(|| Error::Input("shoe must hold at least one card".to_string()))
            }
            None => Ok(Shoe::Shuffled(Deck::new(input.seed))),
        }
    }
}

impl CardSource for Shoe {
    fn next_card(&mut self) -> Rank {
        match self {
            Shoe::Shuffled(deck) => deck.next_card(),
            Shoe::Replay(replay) => replay.next_card(),
        }
    }
}

/// The player's running balance, the only state carried between rounds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bankroll {
    balance: f64,
    rounds_played: u32,
}

impl Bankroll {
    pub fn new(balance: f64) -> Self {
        Bankroll {
            balance,
            rounds_played: 0,
        }
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }
}

impl BalanceSink for Bankroll {
    fn apply(&mut self, delta: f64) {
        self.balance += delta;
        self.rounds_played += 1;
    }

    fn balance(&self) -> f64 {
        self.balance
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub rounds: u32,
    pub hands: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub blackjacks: u32,
    pub surrenders: u32,
    pub net: f64,
    pub total_bet: f64,
    pub balance: f64,
    pub expected_value: f64,
    pub return_rate: f64,
}

impl SessionResult {
    fn record(&mut self, round: &RoundRecord) {
        self.rounds += 1;
        self.net += round.delta;
        for hand in &round.hands {
            self.hands += 1;
            self.total_bet += hand.bet;
            match hand.outcome {
                Outcome::Win => self.wins += 1,
                Outcome::Lose => self.losses += 1,
                Outcome::Push => self.pushes += 1,
                Outcome::Blackjack => {
                    self.wins += 1;
                    self.blackjacks += 1;
                }
                Outcome::Surrender => self.surrenders += 1,
            }
        }
    }

    fn finalize(&mut self, bankroll: &Bankroll) {
        self.balance = bankroll.balance();
        self.expected_value = if self.rounds > 0 {
            self.net / self.rounds as f64
        } else {
            0.0
        };
        self.return_rate = if self.total_bet.abs() > f64::EPSILON {
            (self.net / self.total_bet) * 100.0
        } else {
            0.0
        };
    }
}

/// Plays one round to completion and snapshots it.
pub fn play_one(
    shoe: &mut dyn CardSource,
    policy: &mut dyn Policy,
    bankroll: &mut Bankroll,
) -> Result<RoundRecord> {
    let mut round = Round::new(shoe);
    play_round(&mut round, policy, bankroll)?;
    log::debug!("round {}:\n{round}", bankroll.rounds_played());
    Ok(RoundRecord::from_round(&round))
}

pub fn play_rounds<F>(
    shoe: &mut dyn CardSource,
    policy: &mut dyn Policy,
    bankroll: &mut Bankroll,
    rounds: u32,
    progress_interval: u32,
    mut progress_cb: F,
) -> Result<SessionResult>
where
    F: FnMut(u32, u32),
{
    let mut result = SessionResult::default();
    let progress_interval = progress_interval.max(1);
    for index in 0..rounds {
        let record = play_one(shoe, policy, bankroll)?;
        result.record(&record);

        let completed = index + 1;
        if completed % progress_interval == 0 || completed == rounds {
            progress_cb(completed, rounds);
        }
    }
    result.finalize(bankroll);
    log::info!(
        "played {} rounds: net {}, balance {}",
        result.rounds,
        format_currency(result.net),
        format_currency(result.balance)
    );
    Ok(result)
}

fn table_policy(input: &SessionInput) -> Result<TablePolicy> {
    let table = match &input.strategy {
        serde_json::Value::Null => solver::solve().strategy,
        strategy => StrategyTable::from_value(strategy.clone())?,
    };
    Ok(TablePolicy::new(table))
}

pub fn run(input: SessionInput) -> Result<SessionResult> {
    run_with_progress(input, |_current, _total| {})
}

/// Plays `input.rounds` rounds off the strategy chart. The chart is validated
/// before the first card is dealt.
pub fn run_with_progress<F>(input: SessionInput, progress_cb: F) -> Result<SessionResult>
where
    F: FnMut(u32, u32),
{
    let mut policy = table_policy(&input)?;
    let mut shoe = Shoe::from_input(&input)?;
    let mut bankroll = Bankroll::new(input.starting_balance);
    play_rounds(
        &mut shoe,
        &mut policy,
        &mut bankroll,
        input.rounds,
        input.progress_interval,
        progress_cb,
    )
}

pub fn run_single_round(input: SessionInput) -> Result<RoundRecord> {
    let mut policy = table_policy(&input)?;
    let mut shoe = Shoe::from_input(&input)?;
    let mut bankroll = Bankroll::new(input.starting_balance);
    play_one(&mut shoe, &mut policy, &mut bankroll)
}

/// One round where `policy` (usually interactive) makes every decision.
pub fn run_round_with(input: &SessionInput, policy: &mut dyn Policy) -> Result<RoundRecord> {
    let mut shoe = Shoe::from_input(input)?;
    let mut bankroll = Bankroll::new(input.starting_balance);
    play_one(&mut shoe, policy, &mut bankroll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::strategy::{COLS, ROWS};

    fn all_stand() -> serde_json::Value {
        serde_json::json!(vec![vec!["S"; COLS]; ROWS])
    }

    fn input(shoe: Option<&str>, rounds: u32, strategy: serde_json::Value) -> SessionInput {
        SessionInput {
            seed: 3,
            shoe: shoe.map(str::to_string),
            rounds,
            strategy,
            starting_balance: 10.0,
            progress_interval: 2,
        }
    }

    #[test]
    fn bankroll_counts_rounds() {
        let mut bankroll = Bankroll::new(5.0);
        bankroll.apply(-1.0);
        bankroll.apply(1.5);
        assert_eq!(bankroll.balance(), 5.5);
        assert_eq!(bankroll.rounds_played(), 2);
    }

    #[test]
    fn replayed_rounds_settle_in_order() {
        // round 1: dealer T 9, player T 8 stands: -1
        // round 2: dealer T 6, player A K: blackjack +1.5
        // round 3: dealer A K, player 8 9: -1
        let shoe = "T9T8 T6AK AK89";
        let mut calls = Vec::new();
        let result = run_with_progress(input(Some(shoe), 3, all_stand()), |done, total| {
            calls.push((done, total))
        })
        .unwrap();
        assert_eq!(result.rounds, 3);
        assert_eq!(result.wins, 1);
        assert_eq!(result.blackjacks, 1);
        assert_eq!(result.losses, 2);
        assert_eq!(result.net, -0.5);
        assert_eq!(result.balance, 9.5);
        assert_eq!(calls, vec![(2, 3), (3, 3)]);
    }

    #[test]
    fn malformed_strategy_fails_before_dealing() {
        let err = run(input(Some("T9T8"), 1, serde_json::json!([["S"]]))).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ColumnCount { row: 1, .. })));

        let err = run(input(None, 1, serde_json::json!({"rows": []}))).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::UnsupportedFormat)));
    }

    #[test]
    fn missing_strategy_plays_the_solved_chart() {
        // dealer T 6, player 8 8: the solved chart splits, each 8 draws a T
        // and stands on 18; the dealer draws a T and busts
        let record = run_single_round(input(Some("T688TTT"), 1, serde_json::Value::Null)).unwrap();
        assert_eq!(record.hands.len(), 2);
        assert_eq!(record.delta, 2.0);

        let result = run(input(None, 200, serde_json::Value::Null)).unwrap();
        assert_eq!(result.rounds, 200);
        assert_eq!(
            result.wins + result.losses + result.pushes + result.surrenders,
            result.hands
        );
    }

    #[test]
    fn bad_shoe_symbols_are_input_errors() {
        let err = run(input(Some("T9X"), 1, all_stand())).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        let err = run(input(Some(" "), 1, all_stand())).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let first = run(input(None, 50, all_stand())).unwrap();
        let second = run(input(None, 50, all_stand())).unwrap();
        assert_eq!(first.net, second.net);
        assert_eq!(first.hands, 50);
        assert_eq!(first.wins + first.losses + first.pushes, 50);
    }

    #[test]
    fn single_round_record() {
        let record = run_single_round(input(Some("T6T8T"), 1, all_stand())).unwrap();
        assert_eq!(record.dealer_value, 26);
        assert_eq!(record.hands.len(), 1);
        assert_eq!(record.hands[0].outcome, Outcome::Win);
        assert_eq!(record.delta, 1.0);
        assert_eq!(record.balance, Some(11.0));
    }
}
