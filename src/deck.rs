use std::fmt;

use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};
use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Point value with an Ace counted high.
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }

    pub fn is_ten_valued(self) -> bool {
        matches!(self, Rank::Ten | Rank::Jack | Rank::Queen | Rank::King)
    }

    pub fn symbol(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Rank> {
        let rank = match symbol.to_ascii_uppercase() {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return None,
        };
        Some(rank)
    }

    /// Parses a sequence of rank symbols. Whitespace and commas are ignored and
    /// `10` is read as a ten.
    pub fn parse_sequence(text: &str) -> Result<Vec<Rank>, char> {
        let cleaned = text.replace("10", "T");
        cleaned
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| Rank::from_symbol(c).ok_or(c))
            .collect()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.symbol())
    }
}

/// Anything that hands out one card per request.
pub trait CardSource {
    fn next_card(&mut self) -> Rank;
}

impl<F> CardSource for F
where
    F: FnMut() -> Rank,
{
    fn next_card(&mut self) -> Rank {
        self()
    }
}

/// A single shuffled deck, reshuffled in full once it runs dry.
pub struct Deck {
    cards: Vec<Rank>,
    rng: SmallRng,
}

impl Deck {
    pub fn new(seed: u64) -> Self {
        let mut deck = Deck {
            cards: Vec::with_capacity(52),
            rng: SmallRng::seed_from_u64(seed),
        };
        deck.shuffle();
        deck
    }

    pub fn shuffle(&mut self) {
        self.cards.clear();
        for rank in Rank::ALL {
            for _ in 0..4 {
                self.cards.push(rank);
            }
        }
        self.cards.shuffle(&mut self.rng);
    }

    pub fn remaining_cards(&self) -> usize {
        self.cards.len()
    }
}

impl CardSource for Deck {
    fn next_card(&mut self) -> Rank {
        if self.cards.is_empty() {
            log::debug!("deck exhausted, reshuffling");
            self.shuffle();
        }
        // The deck holds 52 cards right after a shuffle.
        self.cards.pop().unwrap_or(Rank::Ace)
    }
}

/// Replays a fixed card sequence, starting over from the top when exhausted.
pub struct ReplayShoe {
    cards: Vec<Rank>,
    position: usize,
}

impl ReplayShoe {
    pub fn new(cards: Vec<Rank>) -> Option<Self> {
        if cards.is_empty() {
            return None;
        }
        Some(ReplayShoe { cards, position: 0 })
    }

    pub fn dealt(&self) -> usize {
        self.position
    }
}

impl CardSource for ReplayShoe {
    fn next_card(&mut self) -> Rank {
        let index = self.position % self.cards.len();
        if index == 0 && self.position > 0 {
            log::warn!("replay shoe exhausted after {} cards, starting over", self.position);
        }
        self.position += 1;
        self.cards[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbols_and_ten_alias() {
        let ranks = Rank::parse_sequence("A 10 k,9 t").unwrap();
        assert_eq!(
            ranks,
            vec![Rank::Ace, Rank::Ten, Rank::King, Rank::Nine, Rank::Ten]
        );
        assert_eq!(Rank::parse_sequence("A X"), Err('X'));
    }

    #[test]
    fn deck_deals_a_full_deck_before_reshuffling() {
        let mut deck = Deck::new(7);
        let mut aces = 0;
        let mut tens = 0;
        for _ in 0..52 {
            let card = deck.next_card();
            if card == Rank::Ace {
                aces += 1;
            }
            if card.is_ten_valued() {
                tens += 1;
            }
        }
        assert_eq!(aces, 4);
        assert_eq!(tens, 16);
        assert_eq!(deck.remaining_cards(), 0);
        deck.next_card();
        assert_eq!(deck.remaining_cards(), 51);
    }

    #[test]
    fn same_seed_same_order() {
        let mut a = Deck::new(42);
        let mut b = Deck::new(42);
        let first: Vec<Rank> = (0..20).map(|_| a.next_card()).collect();
        let second: Vec<Rank> = (0..20).map(|_| b.next_card()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn replay_shoe_cycles() {
        let mut shoe = ReplayShoe::new(vec![Rank::Two, Rank::Ace]).unwrap();
        let dealt: Vec<Rank> = (0..5).map(|_| shoe.next_card()).collect();
        assert_eq!(
            dealt,
            vec![Rank::Two, Rank::Ace, Rank::Two, Rank::Ace, Rank::Two]
        );
        assert_eq!(shoe.dealt(), 5);
        assert!(ReplayShoe::new(Vec::new()).is_none());
    }

    #[test]
    fn closures_are_card_sources() {
        let mut next = Rank::Five;
        let mut source = move || {
            next = if next == Rank::Five { Rank::Six } else { Rank::Five };
            next
        };
        assert_eq!(source.next_card(), Rank::Six);
        assert_eq!(source.next_card(), Rank::Five);
    }
}
