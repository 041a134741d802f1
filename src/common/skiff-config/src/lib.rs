use serde::{Deserialize, Serialize};

/// Configuration for skiff to use during the execution of a join.
/// Note that this should be immutable for a given end-to-end execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkiffExecutionConfig {
    /// Build-side position count above which a probe precomputes all join
    /// positions for a page in one batched lookup. The comparison is strict:
    /// a lookup source reporting exactly this many positions is probed row
    /// by row.
    pub join_position_cache_threshold: usize,
}

impl Default for SkiffExecutionConfig {
    fn default() -> Self {
        SkiffExecutionConfig {
            join_position_cache_threshold: 16384,
        }
    }
}

impl SkiffExecutionConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        let threshold_env_var_name = "SKIFF_JOIN_POSITION_CACHE_THRESHOLD";
        if let Ok(val) = std::env::var(threshold_env_var_name) {
            match val.trim().parse::<usize>() {
                Ok(threshold) => cfg.join_position_cache_threshold = threshold,
                Err(e) => log::warn!(
                    "ignoring invalid {} value {:?}: {}",
                    threshold_env_var_name,
                    val,
                    e
                ),
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::SkiffExecutionConfig;

    #[test]
    fn default_threshold() {
        let cfg = SkiffExecutionConfig::default();
        assert_eq!(cfg.join_position_cache_threshold, 16384);
    }

    #[test]
    fn from_env_override() {
        // single test owns the variable so parallel tests cannot race on it
        let var = "SKIFF_JOIN_POSITION_CACHE_THRESHOLD";
        std::env::set_var(var, "64");
        let cfg = SkiffExecutionConfig::from_env();
        assert_eq!(cfg.join_position_cache_threshold, 64);

        // an unparseable value is ignored and the default kept
        std::env::set_var(var, "a-lot");
        let cfg = SkiffExecutionConfig::from_env();
        std::env::remove_var(var);
        assert_eq!(cfg.join_position_cache_threshold, 16384);
    }
}
