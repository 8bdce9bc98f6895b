//! Exact expected values for Easy Blackjack against an infinite deck, where
//! every rank is drawn with probability 1/13, and the strategy chart that
//! follows from them.
//!
//! Both dealer cards are visible, so every table is indexed by the dealer's
//! full two-card hand using the chart's column labels.

use std::{collections::HashMap, fmt};

use serde::Serialize;

use crate::{
    deck::Rank,
    hand::{Hand, MAX_HANDS},
    strategy::{Action, Cell, StrategyTable, COLS, COL_LABELS, ROWS, ROW_LABELS},
};

const DRAW: f64 = 1.0 / 13.0;
const SURRENDER_EV: f64 = -0.5;
const BLACKJACK_EV: f64 = 1.5;
const BLACKJACK: &str = "BJ";

/// Final dealer outcomes: bust, then 17 through 21.
const DEALER_FINALS: [&str; 6] = ["bust", "17", "18", "19", "20", "21"];

/// A hand's point total and whether an Ace still counts eleven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Total {
    value: u8,
    soft: bool,
}

impl Total {
    fn hard(value: u8) -> Self {
        Total { value, soft: false }
    }

    fn soft(value: u8) -> Self {
        Total { value, soft: true }
    }

    fn of(cards: &[Rank]) -> Self {
        let hand = Hand::from_cards(cards);
        Total {
            value: hand.value(),
            soft: hand.is_soft(),
        }
    }

    fn add(self, card: Rank) -> Self {
        let mut value = self.value + card.value();
        let mut soft_aces = u8::from(self.soft) + u8::from(card == Rank::Ace);
        while value > 21 && soft_aces > 0 {
            value -= 10;
            soft_aces -= 1;
        }
        Total {
            value,
            soft: soft_aces > 0,
        }
    }

    fn is_bust(self) -> bool {
        self.value > 21
    }

    /// Row label shared by the stand, hit and double tables.
    fn label(self) -> String {
        match (self.soft, self.value) {
            (true, 12) => "AA".to_string(),
            (true, value) if value < 21 => format!("A{}", value - 11),
            (_, value) => value.to_string(),
        }
    }
}

fn dealer_draws(total: Total) -> bool {
    total.value < 17 || (total.value == 17 && total.soft)
}

/// The dealer hand behind a 0-based chart column.
fn dealer_column(col: usize) -> Total {
    if col < 17 {
        Total::hard(col as u8 + 4)
    } else {
        Total::soft(col as u8 - 17 + 12)
    }
}

/// The player hand behind a 0-based chart row, with the pair rank for the
/// pair rows.
fn player_row(row: usize) -> (Total, Option<Rank>) {
    match row {
        0..=16 => (Total::hard(row as u8 + 4), None),
        17..=25 => {
            let rank = Rank::ALL[row - 16];
            (Total::of(&[rank, rank]), Some(rank))
        }
        26 => (Total::soft(12), Some(Rank::Ace)),
        _ => (Total::soft(row as u8 - 27 + 13), None),
    }
}

fn pairs_with(rank: Rank, card: Rank) -> bool {
    rank == card || (rank.is_ten_valued() && card.is_ten_valued())
}

fn pair_label(rank: Rank) -> String {
    if rank.is_ten_valued() {
        "TT".to_string()
    } else {
        format!("{0}{0}", rank.symbol())
    }
}

/// Player totals that can stand: hard 4-21 and soft 12-20.
fn standing_totals() -> Vec<Total> {
    (4..=21)
        .map(Total::hard)
        .chain((12..=20).map(Total::soft))
        .collect()
}

fn initial_player_label(cards: [Rank; 2]) -> String {
    let hand = Hand::from_cards(&cards);
    if hand.is_blackjack() {
        BLACKJACK.to_string()
    } else if hand.is_pair() {
        pair_label(cards[0])
    } else {
        Total::of(&cards).label()
    }
}

fn initial_dealer_label(cards: [Rank; 2]) -> String {
    let hand = Hand::from_cards(&cards);
    if hand.is_blackjack() {
        BLACKJACK.to_string()
    } else if hand.is_soft() && hand.value() <= 17 {
        Total::soft(hand.value()).label()
    } else {
        hand.value().to_string()
    }
}

/// A labelled grid of numbers, one row per player hand and one column per
/// dealer hand unless stated otherwise.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvTable {
    rows: Vec<String>,
    cols: Vec<String>,
    cells: Vec<f64>,
}

impl EvTable {
    fn new<R, C>(rows: R, cols: C) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows: Vec<String> = rows.into_iter().map(Into::into).collect();
        let cols: Vec<String> = cols.into_iter().map(Into::into).collect();
        let cells = vec![0.0; rows.len() * cols.len()];
        EvTable { rows, cols, cells }
    }

    fn index(&self, row: &str, col: &str) -> Option<usize> {
        let r = self.rows.iter().position(|label| label == row)?;
        let c = self.cols.iter().position(|label| label == col)?;
        Some(r * self.cols.len() + c)
    }

    fn set(&mut self, row: &str, col: &str, value: f64) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] = value;
        }
    }

    fn add(&mut self, row: &str, col: &str, value: f64) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] += value;
        }
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        self.index(row, col).map(|i| self.cells[i])
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn cols(&self) -> &[String] {
        &self.cols
    }

    pub fn row_sum(&self, row: &str) -> Option<f64> {
        let r = self.rows.iter().position(|label| label == row)?;
        let width = self.cols.len();
        Some(self.cells[r * width..(r + 1) * width].iter().sum())
    }

    pub fn col_sum(&self, col: &str) -> Option<f64> {
        let c = self.cols.iter().position(|label| label == col)?;
        Some(self.cells.iter().skip(c).step_by(self.cols.len()).sum())
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }
}

impl fmt::Display for EvTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}", "")?;
        for col in &self.cols {
            write!(f, " {col:>7}")?;
        }
        writeln!(f)?;
        for (r, row) in self.rows.iter().enumerate() {
            write!(f, "{row:>4}")?;
            for value in &self.cells[r * self.cols.len()..(r + 1) * self.cols.len()] {
                write!(f, " {value:>7.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Every table the solver produces.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// Probability of each initial (player, dealer) deal.
    pub initial: EvTable,
    /// Probability of each final dealer outcome, one row per dealer hand.
    pub dealer: EvTable,
    pub stand: EvTable,
    pub hit: EvTable,
    pub double: EvTable,
    /// Split EV with every further split the hand cap allows.
    pub split: EvTable,
    /// Split EV with no further splits (`[0]`) or one more (`[1]`).
    pub resplit: Vec<EvTable>,
    /// Best EV per chart cell, counting surrender at -0.5.
    pub optimal: EvTable,
    pub strategy: StrategyTable,
    /// Expected return per initial bet under the chart.
    pub advantage: f64,
}

/// Memoized expected-value recursion over dealer columns.
struct Solver {
    finals: Vec<[f64; 6]>,
    dealer_memo: HashMap<Total, [f64; 6]>,
    hit_memo: HashMap<(Total, usize), f64>,
    split_memo: HashMap<(Rank, usize, usize), f64>,
}

impl Solver {
    fn new() -> Self {
        let mut solver = Solver {
            finals: Vec::with_capacity(COLS),
            dealer_memo: HashMap::new(),
            hit_memo: HashMap::new(),
            split_memo: HashMap::new(),
        };
        for col in 0..COLS {
            let finals = solver.dealer_finals(dealer_column(col));
            solver.finals.push(finals);
        }
        solver
    }

    fn dealer_finals(&mut self, total: Total) -> [f64; 6] {
        let mut out = [0.0; 6];
        if total.is_bust() {
            out[0] = 1.0;
            return out;
        }
        if !dealer_draws(total) {
            out[usize::from(total.value - 16)] = 1.0;
            return out;
        }
        if let Some(&cached) = self.dealer_memo.get(&total) {
            return cached;
        }
        for card in Rank::ALL {
            let next = self.dealer_finals(total.add(card));
            for (slot, p) in out.iter_mut().zip(next) {
                *slot += DRAW * p;
            }
        }
        self.dealer_memo.insert(total, out);
        out
    }

    fn stand(&self, total: Total, col: usize) -> f64 {
        self.finals[col]
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let dealer = if i == 0 { 0 } else { 16 + i as u8 };
                if dealer < total.value {
                    *p
                } else if dealer > total.value {
                    -p
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Hit once, then play on optimally with stand or hit.
    fn hit(&mut self, total: Total, col: usize) -> f64 {
        if let Some(&cached) = self.hit_memo.get(&(total, col)) {
            return cached;
        }
        let mut ev = 0.0;
        for card in Rank::ALL {
            let next = total.add(card);
            ev += DRAW
                * if next.is_bust() {
                    -1.0
                } else if next.value == 21 {
                    self.stand(next, col)
                } else {
                    self.stand(next, col).max(self.hit(next, col))
                };
        }
        self.hit_memo.insert((total, col), ev);
        ev
    }

    fn double(&self, total: Total, col: usize) -> f64 {
        let ev: f64 = Rank::ALL
            .iter()
            .map(|&card| {
                let next = total.add(card);
                if next.is_bust() {
                    -1.0
                } else {
                    self.stand(next, col)
                }
            })
            .sum();
        2.0 * DRAW * ev
    }

    /// Best play for a hand that came from a split: no surrender.
    fn play_split_hand(&mut self, total: Total, col: usize) -> f64 {
        let stand = self.stand(total, col);
        if total.value == 21 {
            return stand;
        }
        stand
            .max(self.hit(total, col))
            .max(self.double(total, col))
    }

    /// EV of splitting a pair of `rank` when `extra` more splits may follow.
    /// When both new hands pair again they share what is left, the first hand
    /// taking the odd one.
    fn split(&mut self, rank: Rank, extra: usize, col: usize) -> f64 {
        if let Some(&cached) = self.split_memo.get(&(rank, extra, col)) {
            return cached;
        }
        let mut ev = 0.0;
        for first in Rank::ALL {
            for second in Rank::ALL {
                let pairs = [pairs_with(rank, first), pairs_with(rank, second)];
                let shares = if pairs == [true, true] {
                    [extra - extra / 2, extra / 2]
                } else {
                    [extra, extra]
                };
                let hands = [first, second].into_iter().zip(pairs).zip(shares);
                for ((card, repairs), share) in hands {
                    ev += DRAW * DRAW * self.split_hand(rank, card, repairs, share, col);
                }
            }
        }
        self.split_memo.insert((rank, extra, col), ev);
        ev
    }

    fn split_hand(
        &mut self,
        rank: Rank,
        card: Rank,
        repairs: bool,
        share: usize,
        col: usize,
    ) -> f64 {
        let total = Total::of(&[rank, card]);
        // split Aces take one card each and stand
        if rank == Rank::Ace {
            return self.stand(total, col);
        }
        let played = self.play_split_hand(total, col);
        if repairs && share > 0 {
            played.max(self.split(rank, share - 1, col))
        } else {
            played
        }
    }

    fn solve(mut self) -> Solution {
        let splits_after_first = MAX_HANDS - 2;
        let totals = standing_totals();

        let mut stand = EvTable::new(totals.iter().map(|t| t.label()), COL_LABELS);
        let mut hit = EvTable::new(
            totals.iter().filter(|t| t.value < 21).map(|t| t.label()),
            COL_LABELS,
        );
        let mut double = hit.clone();
        let mut dealer = EvTable::new(COL_LABELS, DEALER_FINALS);
        let pair_ranks: Vec<Rank> = (17..=26).filter_map(|row| player_row(row).1).collect();
        let pair_labels: Vec<String> = pair_ranks.iter().map(|&r| pair_label(r)).collect();
        let mut split = EvTable::new(pair_labels.clone(), COL_LABELS);
        let mut resplit: Vec<EvTable> = (0..splits_after_first)
            .map(|_| EvTable::new(pair_labels.clone(), COL_LABELS))
            .collect();
        let mut optimal = EvTable::new(ROW_LABELS, COL_LABELS);
        let mut cells = Vec::with_capacity(ROWS * COLS);

        for (col, col_label) in COL_LABELS.iter().enumerate() {
            for (finals, name) in self.finals[col].iter().zip(DEALER_FINALS) {
                dealer.set(col_label, name, *finals);
            }
            for &total in &totals {
                let label = total.label();
                stand.set(&label, col_label, self.stand(total, col));
                if total.value < 21 {
                    hit.set(&label, col_label, self.hit(total, col));
                    double.set(&label, col_label, self.double(total, col));
                }
            }
            for (&rank, label) in pair_ranks.iter().zip(&pair_labels) {
                split.set(label, col_label, self.split(rank, splits_after_first, col));
                for (extra, table) in resplit.iter_mut().enumerate() {
                    table.set(label, col_label, self.split(rank, extra, col));
                }
            }
        }

        for (row, row_label) in ROW_LABELS.iter().enumerate() {
            for (col, col_label) in COL_LABELS.iter().enumerate() {
                let (cell, ev) = self.best_cell(row, col);
                optimal.set(row_label, col_label, ev);
                cells.push(cell);
            }
        }

        let initial = initial_table();
        let advantage = advantage(&initial, &optimal);
        log::debug!("solved strategy chart, player advantage {:.4}", advantage);

        Solution {
            initial,
            dealer,
            stand,
            hit,
            double,
            split,
            resplit,
            optimal,
            strategy: StrategyTable::from_cells(cells),
            advantage,
        }
    }

    /// The chart cell for a 0-based (row, column) and its EV. Ties go to the
    /// earlier of split, stand, hit, double, surrender.
    fn best_cell(&mut self, row: usize, col: usize) -> (Cell, f64) {
        let (total, pair) = player_row(row);
        let stand = self.stand(total, col);
        let hit = self.hit(total, col);

        let mut options = Vec::with_capacity(5);
        if let Some(rank) = pair {
            options.push((Action::Split, self.split(rank, MAX_HANDS - 2, col)));
        }
        options.extend([
            (Action::Stand, stand),
            (Action::Hit, hit),
            (Action::Double, self.double(total, col)),
            (Action::Surrender, SURRENDER_EV),
        ]);

        let (primary, ev) = options
            .into_iter()
            .fold((Action::Surrender, f64::NEG_INFINITY), |best, option| {
                if option.1 > best.1 {
                    option
                } else {
                    best
                }
            });
        let fallback = matches!(primary, Action::Double | Action::Surrender)
            .then_some(if stand < hit { Action::Hit } else { Action::Stand });
        (Cell { primary, fallback }, ev)
    }
}

/// Probability of every initial deal, with player rows in the order of the
/// chart plus `BJ`, and dealer columns in the order of the chart plus `BJ`.
fn initial_table() -> EvTable {
    let rows = ROW_LABELS
        .iter()
        .filter(|label| !matches!(**label, "4" | "20"))
        .copied()
        .chain([BLACKJACK]);
    let cols = COL_LABELS.iter().copied().chain([BLACKJACK]);
    let mut table = EvTable::new(rows, cols);

    let deal = DRAW.powi(4);
    for d1 in Rank::ALL {
        for d2 in Rank::ALL {
            let dealer = initial_dealer_label([d1, d2]);
            for p1 in Rank::ALL {
                for p2 in Rank::ALL {
                    table.add(&initial_player_label([p1, p2]), &dealer, deal);
                }
            }
        }
    }
    table
}

fn advantage(initial: &EvTable, optimal: &EvTable) -> f64 {
    let mut advantage = 0.0;
    for row in initial.rows() {
        for col in initial.cols() {
            let ev = match (row.as_str(), col.as_str()) {
                (BLACKJACK, BLACKJACK) => 0.0,
                (BLACKJACK, _) => BLACKJACK_EV,
                (_, BLACKJACK) => -1.0,
                _ => optimal.get(row, col).unwrap_or_default(),
            };
            advantage += initial.get(row, col).unwrap_or_default() * ev;
        }
    }
    advantage
}

/// Solves every table and builds the optimal strategy chart.
pub fn solve() -> Solution {
    Solver::new().solve()
}
