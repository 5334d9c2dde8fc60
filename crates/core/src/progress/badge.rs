use serde::Serialize;
use serde::ser::SerializeStruct;

/// Achievement tier derived from a completion percentage.
///
/// Variants are declared lowest to highest so `Ord` follows tier rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    None,
    Bronze,
    Silver,
    Gold,
    Complete,
}

impl Badge {
    pub const BRONZE_THRESHOLD: u8 = 25;
    pub const SILVER_THRESHOLD: u8 = 50;
    pub const GOLD_THRESHOLD: u8 = 75;
    pub const COMPLETE_THRESHOLD: u8 = 100;

    #[must_use]
    pub fn for_percentage(percentage: u8) -> Self {
        match percentage {
            p if p >= Self::COMPLETE_THRESHOLD => Self::Complete,
            p if p >= Self::GOLD_THRESHOLD => Self::Gold,
            p if p >= Self::SILVER_THRESHOLD => Self::Silver,
            p if p >= Self::BRONZE_THRESHOLD => Self::Bronze,
            _ => Self::None,
        }
    }

    /// Empty for [`Badge::None`].
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Bronze => "🥉",
            Self::Silver => "🥈",
            Self::Gold => "🥇",
            Self::Complete => "⭐",
        }
    }

    /// Display name; empty for [`Badge::None`].
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Bronze => "銅メダル",
            Self::Silver => "銀メダル",
            Self::Gold => "金メダル",
            Self::Complete => "完全制覇",
        }
    }
}

/// Tier earned by the raw number of visited stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitTier {
    Starter,
    Explorer,
    Adventurer,
    Master,
}

impl VisitTier {
    /// Tiers from highest to lowest threshold.
    const DESCENDING: [Self; 4] = [Self::Master, Self::Adventurer, Self::Explorer, Self::Starter];

    #[must_use]
    pub fn threshold(self) -> u32 {
        match self {
            Self::Starter => 50,
            Self::Explorer => 100,
            Self::Adventurer => 200,
            Self::Master => 500,
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Starter => "🌟",
            Self::Explorer => "🧭",
            Self::Adventurer => "🗺️",
            Self::Master => "👑",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Starter => "スターター",
            Self::Explorer => "エクスプローラー",
            Self::Adventurer => "アドベンチャー",
            Self::Master => "マスター",
        }
    }
}

/// Visit-count achievement: either an earned tier or the distance to the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitCountBadge {
    None { remaining: u32 },
    Earned(VisitTier),
}

impl VisitCountBadge {
    #[must_use]
    pub fn from_count(visited: u32) -> Self {
        VisitTier::DESCENDING
            .into_iter()
            .find(|tier| visited >= tier.threshold())
            .map_or_else(
                || Self::None {
                    remaining: VisitTier::Starter.threshold() - visited,
                },
                Self::Earned,
            )
    }

    #[must_use]
    pub fn tier(self) -> Option<VisitTier> {
        match self {
            Self::Earned(tier) => Some(tier),
            Self::None { .. } => None,
        }
    }

    /// Stores left until the first tier; `None` once a tier is earned.
    #[must_use]
    pub fn remaining(self) -> Option<u32> {
        match self {
            Self::None { remaining } => Some(remaining),
            Self::Earned(_) => None,
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        self.tier().map_or("", VisitTier::icon)
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Earned(tier) => tier.label().to_string(),
            Self::None { remaining } => {
                format!("{}まであと{remaining}店舗", VisitTier::Starter.label())
            }
        }
    }
}

impl Serialize for VisitCountBadge {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("VisitCountBadge", 5)?;
        match self {
            Self::Earned(tier) => {
                state.serialize_field("type", tier)?;
                state.serialize_field("count", &tier.threshold())?;
                state.skip_field("nextTarget")?;
                state.skip_field("remaining")?;
            }
            Self::None { remaining } => {
                state.serialize_field("type", "none")?;
                state.serialize_field("count", &0)?;
                state.serialize_field("nextTarget", &VisitTier::Starter.threshold())?;
                state.serialize_field("remaining", remaining)?;
            }
        }
        state.serialize_field("name", &self.label())?;
        state.end()
    }
}
