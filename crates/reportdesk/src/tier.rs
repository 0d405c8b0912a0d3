//! Subscription tiers and the tier claims carried by callers

use std::fmt;

use serde::{Deserialize, Serialize};

string_enum! {
    /// Subscription level gating access to non-public templates
    #[derive(Default)]
    pub enum SubscriptionTier {
        #[default]
        Free => "free",
        Basic => "basic",
        Standard => "standard",
        Premium => "premium",
        Enterprise => "enterprise",
    }
}

impl SubscriptionTier {
    /// Position in the fixed ordering free < basic < standard < premium < enterprise
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Basic => 1,
            SubscriptionTier::Standard => 2,
            SubscriptionTier::Premium => 3,
            SubscriptionTier::Enterprise => 4,
        }
    }
}

/// A tier as asserted by an external party.
///
/// Identity providers and stored documents may carry tier strings this crate
/// does not know. Those are kept as [`TierClaim::Unrecognized`] so the access
/// policy can deny them explicitly instead of failing to parse the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TierClaim {
    Known(SubscriptionTier),
    Unrecognized(String),
}

impl TierClaim {
    /// Rank of the claimed tier, `None` when the tier is not recognized
    pub fn rank(&self) -> Option<u8> {
        match self {
            TierClaim::Known(tier) => Some(tier.rank()),
            TierClaim::Unrecognized(_) => None,
        }
    }
}

impl From<SubscriptionTier> for TierClaim {
    fn from(tier: SubscriptionTier) -> Self {
        TierClaim::Known(tier)
    }
}

impl From<&str> for TierClaim {
    fn from(s: &str) -> Self {
        match s.parse::<SubscriptionTier>() {
            Ok(tier) => TierClaim::Known(tier),
            Err(_) => TierClaim::Unrecognized(s.to_string()),
        }
    }
}

impl From<String> for TierClaim {
    fn from(s: String) -> Self {
        match s.parse::<SubscriptionTier>() {
            Ok(tier) => TierClaim::Known(tier),
            Err(_) => TierClaim::Unrecognized(s),
        }
    }
}

impl From<TierClaim> for String {
    fn from(claim: TierClaim) -> Self {
        match claim {
            TierClaim::Known(tier) => tier.as_str().to_string(),
            TierClaim::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for TierClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierClaim::Known(tier) => f.write_str(tier.as_str()),
            TierClaim::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ranks_follow_fixed_order() {
        let ranks: Vec<u8> = SubscriptionTier::ALL.iter().map(|t| t.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_tier_claim_keeps_unknown_strings() {
        assert_eq!(
            TierClaim::from("premium"),
            TierClaim::Known(SubscriptionTier::Premium)
        );
        assert_eq!(
            TierClaim::from("platinum"),
            TierClaim::Unrecognized("platinum".to_string())
        );
        assert_eq!(TierClaim::from("platinum").rank(), None);
    }

    #[test]
    fn test_tier_claim_serde_is_a_plain_string() {
        let claim: TierClaim = serde_json::from_str("\"gold\"").unwrap();
        assert_eq!(claim, TierClaim::Unrecognized("gold".to_string()));
        assert_eq!(serde_json::to_string(&claim).unwrap(), "\"gold\"");

        let claim: TierClaim = serde_json::from_str("\"basic\"").unwrap();
        assert_eq!(claim, TierClaim::Known(SubscriptionTier::Basic));
    }

    #[test]
    fn test_default_tier_is_free() {
        assert_eq!(SubscriptionTier::default(), SubscriptionTier::Free);
    }
}
