use std::fmt;

use serde::Serialize;

use crate::{
    deck::{CardSource, Rank},
    error::{InvalidAction, RoundError},
    hand::Hand,
    payout::{self, Outcome, Settlement},
    player::Decision,
};

/// Receives the balance change of each completed round.
pub trait BalanceSink {
    fn apply(&mut self, delta: f64);

    /// The running balance after every delta applied so far.
    fn balance(&self) -> f64;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Dealing,
    PlayerTurn(usize),
    DealerTurn,
    Resolved,
}

/// One round: the dealer's hand and up to [`crate::hand::MAX_HANDS`] player
/// hands, dealt from a borrowed card source.
pub struct Round<'s> {
    shoe: &'s mut dyn CardSource,
    dealer: Hand,
    hands: Vec<Hand>,
    current: usize,
    phase: RoundPhase,
    result: Option<f64>,
    balance: Option<f64>,
}

impl<'s> Round<'s> {
    pub fn new(shoe: &'s mut dyn CardSource) -> Self {
        Round {
            shoe,
            dealer: Hand::new(),
            hands: Vec::new(),
            current: 0,
            phase: RoundPhase::Dealing,
            result: None,
            balance: None,
        }
    }

    /// Deals two cards each to the dealer and the player. Returns `None` when a
    /// natural blackjack on either side ends the round before any decision.
    pub fn start_round(&mut self) -> Result<Option<ActiveHand<'_, 's>>, RoundError> {
        if self.phase != RoundPhase::Dealing {
            return Err(RoundError::AlreadyStarted);
        }
        self.dealer = Hand::new();
        self.dealer.draw(2, self.shoe);
        let mut first = Hand::new();
        first.draw(2, self.shoe);
        self.hands.push(first);
        self.current = 0;

        if self.hands[0].is_blackjack() || self.dealer.is_blackjack() {
            log::debug!(
                "natural blackjack: dealer {} player {}",
                self.dealer,
                self.hands[0]
            );
            self.phase = RoundPhase::DealerTurn;
            return Ok(None);
        }
        self.phase = RoundPhase::PlayerTurn(0);
        Ok(Some(ActiveHand { round: self }))
    }

    /// Moves to the next player hand, in the order hands were created, that
    /// still needs a decision. Hands split off Aces are skipped.
    pub fn advance(&mut self) -> Option<ActiveHand<'_, 's>> {
        match self.phase {
            RoundPhase::PlayerTurn(_) => {}
            _ => return None,
        }
        let next = (self.current + 1..self.hands.len()).find(|&i| self.hands[i].needs_decision());
        match next {
            Some(index) => {
                self.current = index;
                self.phase = RoundPhase::PlayerTurn(index);
                Some(ActiveHand { round: self })
            }
            None => {
                self.phase = RoundPhase::DealerTurn;
                None
            }
        }
    }

    /// The hand receiving actions, while the player is on turn.
    pub fn active(&mut self) -> Option<ActiveHand<'_, 's>> {
        match self.phase {
            RoundPhase::PlayerTurn(_) => Some(ActiveHand { round: self }),
            _ => None,
        }
    }

    /// Plays out the dealer, settles every hand and reports the delta to
    /// `sink`.
    pub fn finish_round(&mut self, sink: &mut dyn BalanceSink) -> Result<f64, RoundError> {
        match self.phase {
            RoundPhase::Dealing => return Err(RoundError::NotStarted),
            RoundPhase::Resolved => return Err(RoundError::AlreadyResolved),
            RoundPhase::PlayerTurn(_) | RoundPhase::DealerTurn => {}
        }
        self.phase = RoundPhase::DealerTurn;

        let all_settled = self
            .hands
            .iter()
            .all(|hand| hand.is_bust() || hand.is_blackjack() || hand.is_surrendered());
        if !all_settled {
            while dealer_should_hit(&self.dealer) {
                self.dealer.hit(self.shoe);
                log::debug!("dealer draws: {}", self.dealer);
            }
        }

        let delta = payout::settle(&self.dealer, &self.hands);
        log::debug!("round settled at {}", format_currency(delta));
        sink.apply(delta);
        self.result = Some(delta);
        self.balance = Some(sink.balance());
        self.phase = RoundPhase::Resolved;
        Ok(delta)
    }

    fn split_hand(&mut self) -> Result<(), InvalidAction> {
        let count = self.hands.len();
        let card = self.hands[self.current].split(count)?;

        let mut sibling = Hand::new();
        sibling.add(card);

        let first = &mut self.hands[self.current];
        first.draw(1, self.shoe);
        first.mark_from_split();

        sibling.draw(1, self.shoe);
        sibling.mark_from_split();
        log::debug!("split into {} and {}", self.hands[self.current], sibling);
        self.hands.push(sibling);
        Ok(())
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Resolved
    }

    /// The settled delta, once the round is resolved.
    pub fn result(&self) -> Option<f64> {
        self.result
    }

    /// The sink's balance right after this round was settled.
    pub fn balance(&self) -> Option<f64> {
        self.balance
    }

    pub fn settlements(&self) -> Vec<Settlement> {
        self.hands
            .iter()
            .map(|hand| payout::resolve(&self.dealer, hand))
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HandRecord {
    pub cards: Vec<Rank>,
    pub value: u8,
    pub bet: f64,
    pub outcome: Outcome,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub dealer_cards: Vec<Rank>,
    pub dealer_value: u8,
    pub hands: Vec<HandRecord>,
    pub delta: f64,
    pub balance: Option<f64>,
}

impl RoundRecord {
    pub fn from_round(round: &Round<'_>) -> Self {
        let hands = round
            .hands()
            .iter()
            .zip(round.settlements())
            .map(|(hand, settlement)| HandRecord {
                cards: hand.cards().to_vec(),
                value: hand.value(),
                bet: hand.bet(),
                outcome: settlement.outcome,
                amount: settlement.amount,
            })
            .collect::<Vec<_>>();
        RoundRecord {
            dealer_cards: round.dealer().cards().to_vec(),
            dealer_value: round.dealer().value(),
            delta: hands.iter().map(|h| h.amount).sum(),
            balance: round.balance(),
            hands,
        }
    }
}

/// Dealer draws below 17 and on a soft 17.
pub fn dealer_should_hit(dealer: &Hand) -> bool {
    dealer.value() < 17 || (dealer.value() == 17 && dealer.is_soft())
}

/// The player hand currently receiving actions.
pub struct ActiveHand<'r, 's> {
    round: &'r mut Round<'s>,
}

impl<'r, 's> ActiveHand<'r, 's> {
    pub fn index(&self) -> usize {
        self.round.current
    }

    pub fn hand(&self) -> &Hand {
        &self.round.hands[self.round.current]
    }

    pub fn dealer(&self) -> &Hand {
        &self.round.dealer
    }

    pub fn round(&self) -> &Round<'s> {
        &*self.round
    }

    pub fn can_split(&self) -> bool {
        self.hand().can_split(self.round.hands.len())
    }

    pub fn needs_decision(&self) -> bool {
        self.hand().needs_decision()
    }

    pub fn decision(&self) -> Decision<'_> {
        Decision::new(self.hand(), self.dealer(), self.can_split())
    }

    fn hand_mut(&mut self) -> &mut Hand {
        &mut self.round.hands[self.round.current]
    }

    pub fn hit(&mut self) {
        let round = &mut *self.round;
        round.hands[round.current].hit(round.shoe);
    }

    pub fn stand(&mut self) {
        self.hand_mut().stand();
    }

    pub fn double_down(&mut self) -> Result<(), InvalidAction> {
        let round = &mut *self.round;
        round.hands[round.current].double_down(round.shoe)
    }

    pub fn split(&mut self) -> Result<(), InvalidAction> {
        self.round.split_hand()
    }

    pub fn surrender(&mut self) -> Result<(), InvalidAction> {
        self.hand_mut().surrender()
    }
}

pub fn format_currency(v: f64) -> String {
    if v > 0.0 {
        format!("+${v:.2}")
    } else if v < 0.0 {
        format!("-${:.2}", -v)
    } else {
        format!("${:.2}", 0.0)
    }
}

fn format_balance(v: f64) -> String {
    if v < 0.0 {
        format!("-${:.2}", -v)
    } else {
        format!("${v:.2}")
    }
}

impl fmt::Display for Round<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dealer: {}", self.dealer)?;
        for (i, hand) in self.hands.iter().enumerate() {
            writeln!(f, "Hand {}: {}", i + 1, hand)?;
        }
        if let Some(result) = self.result {
            writeln!(f, "Result: {}", format_currency(result))?;
        }
        if let Some(balance) = self.balance {
            writeln!(f, "Balance: {}", format_balance(balance))?;
        }
        Ok(())
    }
}
