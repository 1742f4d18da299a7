//! Engagement Policy
//!
//! Maps an inbound content event and its tier to a set of independently
//! sampled actions:
//!
//! | Event | Tier | Actions |
//! |---|---|---|
//! | Mention | any | +1 budget, reply |
//! | DirectMessage | any | reply |
//! | TimelineItem | NotInteresting | none |
//! | TimelineItem | Interesting | favorite 5%, pester-reply 0.1% |
//! | TimelineItem | VeryInteresting | favorite 50%, reshare 10%, pester-reply 1% |
//!
//! A pester-reply spends one unit of the author's budget when it fires,
//! whatever the budget currently is.

use crate::interest::EngagementTier;
use crate::ledger::PesterLedger;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Kind of inbound content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Mention,
    TimelineItem,
    DirectMessage,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::TimelineItem => "timeline",
            Self::DirectMessage => "direct_message",
        }
    }
}

/// An engagement action, executed later through the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Favorite,
    Reshare,
    /// `unprompted` replies are the ones that spent pester budget
    Reply { unprompted: bool },
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Favorite => "favorite",
            Self::Reshare => "reshare",
            Self::Reply { unprompted: false } => "reply",
            Self::Reply { unprompted: true } => "pester_reply",
        }
    }
}

/// Probabilities for timeline engagement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementOdds {
    pub interesting_favorite: f64,
    pub interesting_reply: f64,
    pub very_interesting_favorite: f64,
    pub very_interesting_reshare: f64,
    pub very_interesting_reply: f64,
}

impl Default for EngagementOdds {
    fn default() -> Self {
        Self {
            interesting_favorite: 0.05,
            interesting_reply: 0.001,
            very_interesting_favorite: 0.5,
            very_interesting_reshare: 0.1,
            very_interesting_reply: 0.01,
        }
    }
}

/// Range the pre-action delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Bounds are reordered if given backwards
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.min && delay <= self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_secs(1, 6)
    }
}

/// Injectable random source shared by every probability-gated decision
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }

    /// True with probability `p`
    pub fn chance(&self, p: f64) -> bool {
        self.rng.lock().gen::<f64>() < p
    }

    /// Uniform delay within `range`
    pub fn delay(&self, range: DelayRange) -> Duration {
        self.rng.lock().gen_range(range.min..=range.max)
    }
}

/// Decides which actions an event earns
pub struct EngagementPolicy {
    odds: EngagementOdds,
}

impl EngagementPolicy {
    pub fn new(odds: EngagementOdds) -> Self {
        Self { odds }
    }

    pub fn odds(&self) -> &EngagementOdds {
        &self.odds
    }

    /// Sample the actions for one event.
    ///
    /// Callers filter re-shares and check the author's pester budget before
    /// scoring timeline items. Budget changes are applied here, at decision
    /// time.
    pub fn decide(
        &self,
        kind: ContentKind,
        tier: EngagementTier,
        author: &str,
        ledger: &PesterLedger,
        rng: &RandomSource,
    ) -> Vec<Action> {
        let actions = match kind {
            ContentKind::DirectMessage => vec![Action::Reply { unprompted: false }],
            ContentKind::Mention => {
                ledger.increment(author);
                vec![Action::Reply { unprompted: false }]
            }
            ContentKind::TimelineItem => self.decide_timeline(tier, author, ledger, rng),
        };

        debug!(
            "{} from @{} ({}) -> {:?}",
            kind.as_str(),
            author,
            tier.as_str(),
            actions.iter().map(Action::as_str).collect::<Vec<_>>()
        );
        actions
    }

    fn decide_timeline(
        &self,
        tier: EngagementTier,
        author: &str,
        ledger: &PesterLedger,
        rng: &RandomSource,
    ) -> Vec<Action> {
        let (favorite, reshare, reply) = match tier {
            EngagementTier::NotInteresting => return Vec::new(),
            EngagementTier::Interesting => (
                self.odds.interesting_favorite,
                None,
                self.odds.interesting_reply,
            ),
            EngagementTier::VeryInteresting => (
                self.odds.very_interesting_favorite,
                Some(self.odds.very_interesting_reshare),
                self.odds.very_interesting_reply,
            ),
        };

        let mut actions = Vec::new();
        if rng.chance(favorite) {
            actions.push(Action::Favorite);
        }
        if let Some(p) = reshare {
            if rng.chance(p) {
                actions.push(Action::Reshare);
            }
        }
        if rng.chance(reply) {
            ledger.decrement(author);
            actions.push(Action::Reply { unprompted: true });
        }
        actions
    }
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self::new(EngagementOdds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(hits: usize, trials: usize) -> f64 {
        hits as f64 / trials as f64
    }

    #[test]
    fn test_mention_increments_and_replies() {
        let policy = EngagementPolicy::default();
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(1);

        for tier in [
            EngagementTier::NotInteresting,
            EngagementTier::Interesting,
            EngagementTier::VeryInteresting,
        ] {
            let before = ledger.record_for("alice").pesters_left;
            let actions = policy.decide(ContentKind::Mention, tier, "alice", &ledger, &rng);
            assert_eq!(actions, vec![Action::Reply { unprompted: false }]);
            assert_eq!(ledger.record_for("alice").pesters_left, before + 1);
        }
    }

    #[test]
    fn test_direct_message_replies_without_budget() {
        let policy = EngagementPolicy::default();
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(2);

        let actions = policy.decide(
            ContentKind::DirectMessage,
            EngagementTier::NotInteresting,
            "bob",
            &ledger,
            &rng,
        );
        assert_eq!(actions, vec![Action::Reply { unprompted: false }]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_not_interesting_timeline_does_nothing() {
        let policy = EngagementPolicy::default();
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(3);

        for _ in 0..1000 {
            let actions = policy.decide(
                ContentKind::TimelineItem,
                EngagementTier::NotInteresting,
                "carol",
                &ledger,
                &rng,
            );
            assert!(actions.is_empty());
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_certain_odds_fire_every_action() {
        let policy = EngagementPolicy::new(EngagementOdds {
            interesting_favorite: 1.0,
            interesting_reply: 1.0,
            very_interesting_favorite: 1.0,
            very_interesting_reshare: 1.0,
            very_interesting_reply: 1.0,
        });
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(4);

        let actions = policy.decide(
            ContentKind::TimelineItem,
            EngagementTier::VeryInteresting,
            "dave",
            &ledger,
            &rng,
        );
        assert_eq!(
            actions,
            vec![Action::Favorite, Action::Reshare, Action::Reply { unprompted: true }]
        );

        let actions = policy.decide(
            ContentKind::TimelineItem,
            EngagementTier::Interesting,
            "dave",
            &ledger,
            &rng,
        );
        assert_eq!(actions, vec![Action::Favorite, Action::Reply { unprompted: true }]);
    }

    #[test]
    fn test_pester_reply_decrements_below_zero() {
        // Budget is spent even when the author has none left
        let policy = EngagementPolicy::new(EngagementOdds {
            very_interesting_reply: 1.0,
            ..EngagementOdds::default()
        });
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(5);

        for _ in 0..3 {
            policy.decide(
                ContentKind::TimelineItem,
                EngagementTier::VeryInteresting,
                "erin",
                &ledger,
                &rng,
            );
        }
        assert_eq!(ledger.record_for("erin").pesters_left, -2);
    }

    #[test]
    fn test_same_seed_same_decisions() {
        let policy = EngagementPolicy::default();
        let run = |seed| {
            let ledger = PesterLedger::new();
            let rng = RandomSource::seeded(seed);
            (0..500)
                .map(|_| {
                    policy.decide(
                        ContentKind::TimelineItem,
                        EngagementTier::VeryInteresting,
                        "frank",
                        &ledger,
                        &rng,
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_very_interesting_rates_converge() {
        let policy = EngagementPolicy::default();
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(0xC10E);
        let trials = 200_000;

        let (mut favorites, mut reshares, mut replies) = (0, 0, 0);
        for _ in 0..trials {
            for action in policy.decide(
                ContentKind::TimelineItem,
                EngagementTier::VeryInteresting,
                "grace",
                &ledger,
                &rng,
            ) {
                match action {
                    Action::Favorite => favorites += 1,
                    Action::Reshare => reshares += 1,
                    Action::Reply { .. } => replies += 1,
                }
            }
        }

        assert!((rate(favorites, trials) - 0.5).abs() < 0.01);
        assert!((rate(reshares, trials) - 0.1).abs() < 0.005);
        assert!((rate(replies, trials) - 0.01).abs() < 0.002);
        assert_eq!(
            ledger.record_for("grace").pesters_left,
            1 - replies as i64
        );
    }

    #[test]
    fn test_interesting_rates_converge() {
        let policy = EngagementPolicy::default();
        let ledger = PesterLedger::new();
        let rng = RandomSource::seeded(99);
        let trials = 200_000;

        let (mut favorites, mut replies) = (0, 0);
        for _ in 0..trials {
            for action in policy.decide(
                ContentKind::TimelineItem,
                EngagementTier::Interesting,
                "heidi",
                &ledger,
                &rng,
            ) {
                match action {
                    Action::Favorite => favorites += 1,
                    Action::Reply { .. } => replies += 1,
                    Action::Reshare => panic!("interesting items are never reshared"),
                }
            }
        }

        assert!((rate(favorites, trials) - 0.05).abs() < 0.003);
        assert!((rate(replies, trials) - 0.001).abs() < 0.0005);
    }

    #[test]
    fn test_delay_within_range() {
        let rng = RandomSource::seeded(6);
        let range = DelayRange::default();
        for _ in 0..1000 {
            assert!(range.contains(rng.delay(range)));
        }
    }

    #[test]
    fn test_delay_with_huge_bound_stays_in_range() {
        let rng = RandomSource::seeded(1);
        let range = DelayRange::from_secs(1, u64::MAX / 1000 + 1);
        for _ in 0..100 {
            assert!(range.contains(rng.delay(range)));
        }

        let fixed = DelayRange::from_secs(u64::MAX, u64::MAX);
        assert_eq!(rng.delay(fixed), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_delay_range_reorders_bounds() {
        let range = DelayRange::from_secs(6, 1);
        assert_eq!(range.min(), Duration::from_secs(1));
        assert_eq!(range.max(), Duration::from_secs(6));
    }
}
