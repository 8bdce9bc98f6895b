use crate::{
    error::{Error, InvalidAction, Result},
    game::{ActiveHand, BalanceSink, Round},
    hand::Hand,
    strategy::{Action, ActionSet},
};

/// What a policy sees at a decision point.
#[derive(Clone, Copy, Debug)]
pub struct Decision<'a> {
    hand: &'a Hand,
    dealer: &'a Hand,
    can_split: bool,
}

impl<'a> Decision<'a> {
    pub fn new(hand: &'a Hand, dealer: &'a Hand, can_split: bool) -> Self {
        Decision {
            hand,
            dealer,
            can_split,
        }
    }

    pub fn hand(&self) -> &'a Hand {
        self.hand
    }

    pub fn dealer(&self) -> &'a Hand {
        self.dealer
    }

    pub fn can_split(&self) -> bool {
        self.can_split
    }

    pub fn legal_actions(&self) -> ActionSet {
        self.legal_actions_with(self.can_split)
    }

    /// Legal actions, treating the hand as splittable or not.
    pub fn legal_actions_with(&self, splittable: bool) -> ActionSet {
        use Action::*;
        let from_split = self.hand.is_from_split();
        if splittable {
            if from_split {
                ActionSet::of(&[Stand, Hit, Double, Split])
            } else {
                ActionSet::of(&[Stand, Hit, Double, Split, Surrender])
            }
        } else if self.hand.has_acted() {
            ActionSet::of(&[Stand, Hit])
        } else if from_split {
            ActionSet::of(&[Stand, Hit, Double])
        } else {
            ActionSet::of(&[Stand, Hit, Double, Surrender])
        }
    }
}

/// Chooses one action per decision point.
pub trait Policy {
    fn decide(&mut self, decision: &Decision<'_>) -> Result<Action>;
}

pub fn apply(active: &mut ActiveHand<'_, '_>, action: Action) -> Result<(), InvalidAction> {
    match action {
        Action::Stand => active.stand(),
        Action::Hit => active.hit(),
        Action::Double => active.double_down()?,
        Action::Split => active.split()?,
        Action::Surrender => active.surrender()?,
    }
    Ok(())
}

/// Asks `policy` for actions until the active hand needs no more decisions.
pub fn play_hand(active: &mut ActiveHand<'_, '_>, policy: &mut dyn Policy) -> Result<()> {
    while active.needs_decision() {
        let action = policy.decide(&active.decision())?;
        apply(active, action)?;
    }
    Ok(())
}

/// Runs a full round: the deal, every player hand in order, then the dealer
/// and settlement. Returns the delta handed to `sink`.
pub fn play_round(
    round: &mut Round<'_>,
    policy: &mut dyn Policy,
    sink: &mut dyn BalanceSink,
) -> Result<f64> {
    if round.start_round()?.is_some() {
        loop {
            if let Some(mut active) = round.active() {
                play_hand(&mut active, policy)?;
            }
            if round.advance().is_none() {
                break;
            }
        }
    }
    Ok(round.finish_round(sink)?)
}

/// The external actor behind an [`InteractivePolicy`].
pub trait Prompt {
    /// Shows the decision and the legal actions, returns the raw reply or
    /// `None` once input is closed.
    fn ask(&mut self, decision: &Decision<'_>, legal: ActionSet) -> Option<String>;

    fn report(&mut self, message: &str);
}

pub struct InteractivePolicy<P> {
    prompt: P,
}

impl<P: Prompt> InteractivePolicy<P> {
    pub fn new(prompt: P) -> Self {
        InteractivePolicy { prompt }
    }

    pub fn into_inner(self) -> P {
        self.prompt
    }
}

/// Reads the first letter of a reply (`s`, `h`, `d`, `p`, `r`).
pub fn parse_action(input: &str) -> Option<Action> {
    input.trim().chars().next().and_then(Action::from_code)
}

impl<P: Prompt> Policy for InteractivePolicy<P> {
    fn decide(&mut self, decision: &Decision<'_>) -> Result<Action> {
        let legal = decision.legal_actions();
        loop {
            let reply = self.prompt.ask(decision, legal).ok_or(Error::InputClosed)?;
            match parse_action(&reply) {
                Some(action) if legal.contains(action) => return Ok(action),
                _ => {
                    log::warn!("unrecognized action {:?}", reply.trim());
                    self.prompt.report("Unrecognized action");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Rank::{self, *};

    struct Scripted {
        replies: Vec<&'static str>,
        asked: Vec<String>,
        reports: usize,
    }

    impl Scripted {
        fn new(replies: &[&'static str]) -> Self {
            Scripted {
                replies: replies.iter().rev().copied().collect(),
                asked: Vec::new(),
                reports: 0,
            }
        }
    }

    impl Prompt for Scripted {
        fn ask(&mut self, _decision: &Decision<'_>, legal: ActionSet) -> Option<String> {
            self.asked.push(legal.to_string());
            self.replies.pop().map(str::to_string)
        }

        fn report(&mut self, _message: &str) {
            self.reports += 1;
        }
    }

    struct Ledger(f64);

    impl BalanceSink for Ledger {
        fn apply(&mut self, delta: f64) {
            self.0 += delta;
        }

        fn balance(&self) -> f64 {
            self.0
        }
    }

    fn script(cards: Vec<Rank>) -> impl FnMut() -> Rank {
        let mut iter = cards.into_iter();
        move || iter.next().expect("script ran out of cards")
    }

    #[test]
    fn legal_sets_follow_hand_state() {
        let dealer = Hand::from_cards(&[Ten, Seven]);
        let pair = Hand::from_cards(&[Eight, Eight]);
        assert_eq!(
            Decision::new(&pair, &dealer, true).legal_actions().to_string(),
            "Stand (S) Hit (H) Double (D) Split (P) Surrender (R)"
        );

        let mut split_pair = pair.clone();
        split_pair.mark_from_split();
        assert_eq!(
            Decision::new(&split_pair, &dealer, true).legal_actions(),
            ActionSet::of(&[Action::Stand, Action::Hit, Action::Double, Action::Split])
        );
        assert_eq!(
            Decision::new(&split_pair, &dealer, false).legal_actions(),
            ActionSet::of(&[Action::Stand, Action::Hit, Action::Double])
        );

        let fresh = Hand::from_cards(&[Ten, Six]);
        assert_eq!(
            Decision::new(&fresh, &dealer, false).legal_actions(),
            ActionSet::of(&[Action::Stand, Action::Hit, Action::Double, Action::Surrender])
        );

        let mut source = || Rank::Two;
        let mut hit = Hand::from_cards(&[Two, Three]);
        hit.hit(&mut source);
        assert_eq!(
            Decision::new(&hit, &dealer, false).legal_actions(),
            ActionSet::of(&[Action::Stand, Action::Hit])
        );
    }

    #[test]
    fn unrecognized_and_illegal_replies_are_reprompted() {
        let dealer = Hand::from_cards(&[Ten, Seven]);
        let mut split = Hand::from_cards(&[Ten, Six]);
        split.mark_from_split();
        let mut policy = InteractivePolicy::new(Scripted::new(&["x", "", "r", " hit"]));
        let decision = Decision::new(&split, &dealer, false);
        assert_eq!(policy.decide(&decision).unwrap(), Action::Hit);
        let prompt = policy.into_inner();
        assert_eq!(prompt.reports, 3);
        assert_eq!(prompt.asked.len(), 4);
        assert_eq!(prompt.asked[0], "Stand (S) Hit (H) Double (D)");
    }

    #[test]
    fn closed_input_ends_the_session() {
        let dealer = Hand::from_cards(&[Ten, Seven]);
        let hand = Hand::from_cards(&[Ten, Six]);
        let mut policy = InteractivePolicy::new(Scripted::new(&[]));
        assert!(matches!(
            policy.decide(&Decision::new(&hand, &dealer, false)),
            Err(Error::InputClosed)
        ));
    }

    #[test]
    fn interactive_round_plays_until_stand() {
        // dealer T 7, player 5 4, hits a 2 then a 6, stands on 17
        let mut shoe = script(vec![Ten, Seven, Five, Four, Two, Six]);
        let mut round = Round::new(&mut shoe);
        let mut policy = InteractivePolicy::new(Scripted::new(&["h", "h", "s"]));
        let mut ledger = Ledger(0.0);
        let delta = play_round(&mut round, &mut policy, &mut ledger).unwrap();
        assert_eq!(delta, 0.0);
        assert_eq!(ledger.0, 0.0);
        assert_eq!(round.hands()[0].value(), 17);
    }

    #[test]
    fn split_aces_take_one_card_each() {
        // dealer T 8, player A A, split: A gets 9, sibling A gets K
        let mut shoe = script(vec![Ten, Eight, Ace, Ace, Nine, King]);
        let mut round = Round::new(&mut shoe);
        let mut policy = InteractivePolicy::new(Scripted::new(&["p"]));
        let mut ledger = Ledger(0.0);
        let delta = play_round(&mut round, &mut policy, &mut ledger).unwrap();
        assert_eq!(round.hands().len(), 2);
        assert!(!round.hands()[1].is_blackjack());
        assert_eq!(round.hands()[1].value(), 21);
        // 20 vs 18 wins, 21 vs 18 wins
        assert_eq!(delta, 2.0);
        assert_eq!(policy.into_inner().asked.len(), 1);
    }

    #[test]
    fn invalid_action_from_policy_propagates() {
        struct AlwaysDouble;
        impl Policy for AlwaysDouble {
            fn decide(&mut self, _decision: &Decision<'_>) -> Result<Action> {
                Ok(Action::Double)
            }
        }

        let mut shoe = script(vec![Ten, Seven, Two, Two, Two, Two]);
        let mut round = Round::new(&mut shoe);
        let mut active = round.start_round().unwrap().unwrap();
        active.hit();
        let err = play_hand(&mut active, &mut AlwaysDouble).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAction(InvalidAction::DoubleAfterDeal(3))
        ));
    }
}
