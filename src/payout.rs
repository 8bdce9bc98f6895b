use serde::Serialize;

use crate::hand::Hand;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Push,
    Blackjack,
    Surrender,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub outcome: Outcome,
    pub amount: f64,
}

/// Settles one player hand against the dealer's final hand.
///
/// The first matching rule wins, in this order: dealer bust, player bust,
/// equal value, dealer blackjack, player blackjack, surrender, higher value.
pub fn resolve(dealer: &Hand, hand: &Hand) -> Settlement {
    let bet = hand.bet();
    let (outcome, amount) = if dealer.is_bust() {
        if hand.is_bust() {
            (Outcome::Lose, -bet)
        } else {
            (Outcome::Win, bet)
        }
    } else if hand.is_bust() {
        (Outcome::Lose, -bet)
    } else if hand.value() == dealer.value() {
        (Outcome::Push, 0.0)
    } else if dealer.is_blackjack() {
        (Outcome::Lose, -bet)
    } else if hand.is_blackjack() {
        (Outcome::Blackjack, 1.5 * bet)
    } else if hand.is_surrendered() {
        (Outcome::Surrender, -0.5 * bet)
    } else if hand.value() > dealer.value() {
        (Outcome::Win, bet)
    } else {
        (Outcome::Lose, -bet)
    };
    Settlement { outcome, amount }
}

/// Net balance change over every player hand.
pub fn settle(dealer: &Hand, hands: &[Hand]) -> f64 {
    hands.iter().map(|hand| resolve(dealer, hand).amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Rank::{self, *};

    fn hand(cards: &[Rank]) -> Hand {
        Hand::from_cards(cards)
    }

    fn amount(dealer: &[Rank], player: &Hand) -> f64 {
        resolve(&hand(dealer), player).amount
    }

    #[test]
    fn dealer_bust_pays_every_standing_hand() {
        let dealer = [Ten, Six, Nine];
        assert_eq!(amount(&dealer, &hand(&[Ten, Two])), 1.0);
        assert_eq!(amount(&dealer, &hand(&[Ten, Two, King])), -1.0);
    }

    #[test]
    fn equal_values_push() {
        assert_eq!(
            resolve(&hand(&[Ace, Nine]), &hand(&[Ten, Jack])),
            Settlement { outcome: Outcome::Push, amount: 0.0 }
        );
        assert_eq!(amount(&[Ace, King], &hand(&[Ace, Queen])), 0.0);
    }

    #[test]
    fn dealer_blackjack_loses_unless_tied() {
        assert_eq!(amount(&[Ace, King], &hand(&[Eight, Nine])), -1.0);
        assert_eq!(amount(&[Ace, King], &hand(&[Seven, Seven, Seven])), 0.0);
    }

    #[test]
    fn player_blackjack_pays_three_to_two() {
        let settlement = resolve(&hand(&[Ten, Seven]), &hand(&[Ace, King]));
        assert_eq!(settlement.outcome, Outcome::Blackjack);
        assert_eq!(settlement.amount, 1.5);
    }

    #[test]
    fn surrender_loses_half_the_bet() {
        let mut surrendered = hand(&[Ten, Six]);
        surrendered.surrender().unwrap();
        let settlement = resolve(&hand(&[Ten, Nine]), &surrendered);
        assert_eq!(settlement.outcome, Outcome::Surrender);
        assert_eq!(settlement.amount, -0.5);

        // equal points push before surrender is considered
        assert_eq!(resolve(&hand(&[Nine, Seven]), &surrendered).outcome, Outcome::Push);
    }

    #[test]
    fn point_comparison_decides_the_rest() {
        assert_eq!(amount(&[Ten, Seven], &hand(&[Ten, Eight])), 1.0);
        assert_eq!(amount(&[Ten, Eight], &hand(&[Ten, Seven])), -1.0);
    }

    #[test]
    fn settle_sums_every_hand() {
        let dealer = hand(&[Ten, Eight]);
        let hands = [hand(&[Ten, Nine]), hand(&[Ten, Seven]), hand(&[Nine, Nine])];
        assert_eq!(settle(&dealer, &hands), 0.0);
    }
}
