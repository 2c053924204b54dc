//! Class pricing by skill level.

use crate::types::{Money, SkillLevel};

/// Maps a skill level to the class price
#[derive(Clone, Copy, Debug, Default)]
pub struct PricingCalculator;

impl PricingCalculator {
    /// Create a calculator with the standard price table
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Price for a form value; anything outside the closed set costs zero
    #[must_use]
    pub fn price_for(&self, skill_level: &str) -> Money {
        skill_level
            .parse::<SkillLevel>()
            .map_or(Money::ZERO, |level| self.price_for_level(level))
    }

    /// Price for a known skill level
    #[must_use]
    pub const fn price_for_level(&self, level: SkillLevel) -> Money {
        match level {
            SkillLevel::Beginner => Money::from_units(50),
            SkillLevel::Intermediate => Money::from_units(70),
            SkillLevel::Advanced => Money::from_units(80),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn price_table() {
        let pricing = PricingCalculator::new();
        assert_eq!(pricing.price_for("beginner"), Money::from_units(50));
        assert_eq!(pricing.price_for("intermediate"), Money::from_units(70));
        assert_eq!(pricing.price_for("advanced"), Money::from_units(80));
        assert_eq!(pricing.price_for(""), Money::ZERO);
        assert_eq!(pricing.price_for("pro"), Money::ZERO);
    }

    proptest! {
        #[test]
        fn unknown_levels_are_free(s in "[a-z]{0,12}") {
            prop_assume!(SkillLevel::ALL.iter().all(|l| l.as_str() != s));
            prop_assert_eq!(PricingCalculator::new().price_for(&s), Money::ZERO);
        }

        #[test]
        fn price_is_stable(level in prop::sample::select(SkillLevel::ALL.to_vec())) {
            let pricing = PricingCalculator::new();
            prop_assert_eq!(pricing.price_for(level.as_str()), pricing.price_for_level(level));
            prop_assert!(pricing.price_for_level(level) > Money::ZERO);
        }
    }
}
