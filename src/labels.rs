use std::collections::HashMap;

/// Rank given to labels that have no place in the display order.
/// Sorts after every known label.
pub const UNRANKED: usize = usize::MAX;

/// A fixed lookup table from raw benchmark ids to display labels, plus the
/// order in which those labels are drawn and listed.
#[derive(Debug, Clone, Copy)]
pub struct LabelFamily {
    pub labels: &'static [(&'static str, &'static str)],
    pub order: &'static [&'static str],
}

/// Data-structure variants.
pub const STRUCTURE: LabelFamily = LabelFamily {
    labels: &[
        ("single", "Single"),
        ("mrv-flex-vector", "MRV"),
        ("pr-array", "PR"),
    ],
    order: &["Single", "MRV", "PR"],
};

/// Balance strategies of the MRV vector, as full ids and as bare suffixes.
pub const BALANCE: LabelFamily = LabelFamily {
    labels: &[
        ("mrv-flex-vector.balance-none", "None"),
        ("mrv-flex-vector.balance-random", "Random"),
        ("mrv-flex-vector.balance-minmax", "Min-max"),
        ("mrv-flex-vector.balance-all", "All"),
        ("balance-none", "None"),
        ("balance-random", "Random"),
        ("balance-minmax", "Min-max"),
        ("balance-all", "All"),
    ],
    order: &["All", "Min-max", "Random", "None"],
};

/// Raw id → display label, display label → rank.
///
/// The default map is empty: every id passes through unchanged and is unranked.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: HashMap<String, String>,
    ranks: HashMap<String, usize>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both built-in families.
    pub fn standard() -> Self {
        Self::new().with_family(&STRUCTURE).with_family(&BALANCE)
    }

    pub fn structure() -> Self {
        Self::new().with_family(&STRUCTURE)
    }

    pub fn balance() -> Self {
        Self::new().with_family(&BALANCE)
    }

    /// Add a family. Ranks are the positions in `family.order`; a later family
    /// overrides the rank of a label an earlier one already placed.
    pub fn with_family(mut self, family: &LabelFamily) -> Self {
        for (raw, display) in family.labels {
            self.labels.insert(raw.to_string(), display.to_string());
        }
        for (rank, display) in family.order.iter().enumerate() {
            self.ranks.insert(display.to_string(), rank);
        }
        self
    }

    pub fn insert(&mut self, raw: &str, display: &str) {
        self.labels.insert(raw.to_string(), display.to_string());
    }

    pub fn set_rank(&mut self, display: &str, rank: usize) {
        self.ranks.insert(display.to_string(), rank);
    }

    /// Display label for `raw`; unmapped ids pass through unchanged.
    pub fn normalize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.labels.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn is_mapped(&self, raw: &str) -> bool {
        self.labels.contains_key(raw)
    }

    /// Fixed rank of a display label, [`UNRANKED`] for unknown ones.
    pub fn canonical_order(&self, display: &str) -> usize {
        self.ranks.get(display).copied().unwrap_or(UNRANKED)
    }

    /// Stable sort by canonical rank: equal ranks keep their relative order.
    pub fn sort_canonical<T, F>(&self, items: &mut [T], label: F)
    where
        F: Fn(&T) -> &str,
    {
        items.sort_by_key(|item| self.canonical_order(label(item)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_family_wins_rank() {
        let mut map = LabelMap::structure();
        map.set_rank("Single", 7);
        assert_eq!(map.canonical_order("Single"), 7);
        assert_eq!(map.canonical_order("MRV"), 1);
    }

    #[test]
    fn empty_map_is_identity() {
        let map = LabelMap::default();
        assert_eq!(map.normalize("pr-array"), "pr-array");
        assert_eq!(map.canonical_order("pr-array"), UNRANKED);
        assert!(!map.is_mapped("pr-array"));
    }
}
