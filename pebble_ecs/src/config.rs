use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`World`](crate::World). None of them affect correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Smallest capacity a pool column is allocated with. Growth doubles from here.
    pub min_capacity: usize,
    /// Pools with this many records or fewer are never compacted.
    pub compact_min_len: usize,
    /// Compacted capacity is the live count rounded up to a multiple of this.
    pub compact_granularity: usize,
    /// How many retired buffers may wait for the last open view to close.
    pub reclaim_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            min_capacity: 8,
            compact_min_len: 8,
            compact_granularity: 8,
            reclaim_capacity: 64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{ "reclaim_capacity": 4 }"#).unwrap();

        assert_eq!(config.reclaim_capacity, 4);
        assert_eq!(config.min_capacity, WorldConfig::default().min_capacity);
    }
}
