use std::fmt;

use crate::{
    deck::{CardSource, Rank},
    error::InvalidAction,
};

/// Most player hands a round may hold after splitting.
pub const MAX_HANDS: usize = 4;

/// One hand of cards, either the dealer's or one of the player's.
///
/// `value` and `soft_aces` are kept up to date on every [`Hand::add`], so they
/// always agree with a from-scratch count of `cards`.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    cards: Vec<Rank>,
    value: u8,
    soft_aces: u8,
    bet: f64,
    surrendered: bool,
    done: bool,
    acted: bool,
    from_split: bool,
}

impl Default for Hand {
    fn default() -> Self {
        Self::new()
    }
}

impl Hand {
    pub fn new() -> Self {
        Hand {
            cards: Vec::with_capacity(4),
            value: 0,
            soft_aces: 0,
            bet: 1.0,
            surrendered: false,
            done: false,
            acted: false,
            from_split: false,
        }
    }

    pub fn from_cards(cards: &[Rank]) -> Self {
        let mut hand = Hand::new();
        for &card in cards {
            hand.add(card);
        }
        hand
    }

    pub fn add(&mut self, card: Rank) {
        self.cards.push(card);
        if card == Rank::Ace {
            if self.value + 11 > 21 {
                self.value += 1;
            } else {
                self.value += 11;
                self.soft_aces += 1;
            }
        } else {
            self.value += card.value();
        }

        if self.value > 21 && self.soft_aces > 0 {
            self.soft_aces -= 1;
            self.value -= 10;
        }
    }

    pub fn draw(&mut self, n: usize, shoe: &mut dyn CardSource) {
        for _ in 0..n {
            self.add(shoe.next_card());
        }
    }

    /// Removes the last card. The remaining cards are scored again, so a pair
    /// drops to half its value (a pair of Aces back to a soft 11).
    pub fn pop(&mut self) -> Result<Rank, InvalidAction> {
        let card = self.cards.pop().ok_or(InvalidAction::EmptyHand)?;
        let remaining = std::mem::take(&mut self.cards);
        self.value = 0;
        self.soft_aces = 0;
        for rank in remaining {
            self.add(rank);
        }
        Ok(card)
    }

    pub fn hit(&mut self, shoe: &mut dyn CardSource) {
        self.draw(1, shoe);
        self.acted = true;
    }

    pub fn double_down(&mut self, shoe: &mut dyn CardSource) -> Result<(), InvalidAction> {
        if self.cards.len() > 2 {
            return Err(InvalidAction::DoubleAfterDeal(self.cards.len()));
        }
        self.bet *= 2.0;
        self.hit(shoe);
        self.stand();
        Ok(())
    }

    pub fn surrender(&mut self) -> Result<(), InvalidAction> {
        if self.acted {
            return Err(InvalidAction::SurrenderAfterAction);
        }
        self.surrendered = true;
        self.stand();
        Ok(())
    }

    pub fn stand(&mut self) {
        self.acted = true;
        self.done = true;
    }

    /// Two identical ranks, or two ten-valued cards.
    pub fn is_pair(&self) -> bool {
        match self.cards.as_slice() {
            [a, b] => a == b || (a.is_ten_valued() && b.is_ten_valued()),
            _ => false,
        }
    }

    /// `hand_count` is the number of player hands currently in the round.
    pub fn can_split(&self, hand_count: usize) -> bool {
        hand_count < MAX_HANDS && self.is_pair()
    }

    /// Gives up the second card of a pair. The round turns it into a new hand.
    pub fn split(&mut self, hand_count: usize) -> Result<Rank, InvalidAction> {
        if !self.can_split(hand_count) {
            return Err(InvalidAction::SplitNotAllowed);
        }
        self.pop()
    }

    pub(crate) fn mark_from_split(&mut self) {
        self.from_split = true;
    }

    pub fn cards(&self) -> &[Rank] {
        &self.cards
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn soft_aces(&self) -> u8 {
        self.soft_aces
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn is_blackjack(&self) -> bool {
        !self.from_split && self.cards.len() == 2 && self.value == 21
    }

    pub fn is_bust(&self) -> bool {
        self.value > 21
    }

    pub fn is_soft(&self) -> bool {
        self.soft_aces > 0 && !self.is_blackjack() && !self.is_bust()
    }

    pub fn is_surrendered(&self) -> bool {
        self.surrendered
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn has_acted(&self) -> bool {
        self.acted
    }

    pub fn is_from_split(&self) -> bool {
        self.from_split
    }

    /// A hand split off a pair of Aces takes one card and no decisions.
    pub fn is_from_ace_split(&self) -> bool {
        self.from_split && self.cards.first() == Some(&Rank::Ace)
    }

    /// Whether the hand still waits on a player decision.
    pub fn needs_decision(&self) -> bool {
        !self.is_bust() && self.value != 21 && !self.done && !self.is_from_ace_split()
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for card in &self.cards {
            write!(f, "{card} ")?;
        }
        if self.is_blackjack() {
            write!(f, "(blackjack) ")?;
        } else if self.is_bust() {
            write!(f, "(bust) ")?;
        } else if self.is_soft() {
            write!(f, "(soft {}) ", self.value)?;
        } else {
            write!(f, "({}) ", self.value)?;
        }
        if self.bet > 1.0 {
            write!(f, "DOUBLE")?;
        }
        if self.surrendered {
            write!(f, "SURRENDER")?;
        }
        Ok(())
    }
}
