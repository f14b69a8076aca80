//! Runtime configuration for the resonance subsystem.
//!
//! Defaults apply when a variable is unset. A variable that is set but does
//! not parse, or parses to an unusable value, is logged and ignored.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RENDER_FLOOR: f64 = 0.3;
pub const DEFAULT_RENDER_MAX_CHARS: usize = 2000;
pub const DEFAULT_FEEDBACK_STEP: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct ResonanceConfig {
    /// How long a built graph is served from cache before rehydration.
    pub cache_ttl: Duration,
    /// Minimum charge for a node to be rendered.
    pub render_floor: f64,
    pub render_max_chars: usize,
    /// Direct increment applied by positive feedback.
    pub feedback_step: f64,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            render_floor: DEFAULT_RENDER_FLOOR,
            render_max_chars: DEFAULT_RENDER_MAX_CHARS,
            feedback_step: DEFAULT_FEEDBACK_STEP,
        }
    }
}

impl ResonanceConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Read overrides from the environment.
    ///
    /// Reads:
    /// - RESONANCE_CACHE_TTL_SECS
    /// - RESONANCE_RENDER_FLOOR
    /// - RESONANCE_RENDER_MAX_CHARS
    /// - RESONANCE_FEEDBACK_STEP
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl: parse_var(&lookup, "RESONANCE_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            render_floor: parse_checked(&lookup, "RESONANCE_RENDER_FLOOR", |v: &f64| {
                (0.0..=1.0).contains(v)
            })
            .unwrap_or(defaults.render_floor),
            render_max_chars: parse_var(&lookup, "RESONANCE_RENDER_MAX_CHARS")
                .unwrap_or(defaults.render_max_chars),
            feedback_step: parse_checked(&lookup, "RESONANCE_FEEDBACK_STEP", |v: &f64| {
                v.is_finite() && *v > 0.0
            })
            .unwrap_or(defaults.feedback_step),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}

/// Like [`parse_var`], but also drops values `valid` rejects.
fn parse_checked<T: std::str::FromStr + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    valid: impl Fn(&T) -> bool,
) -> Option<T> {
    let value = parse_var(lookup, key)?;
    if valid(&value) {
        Some(value)
    } else {
        warn!(key, %value, "ignoring out-of-range config value");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let c = ResonanceConfig::default();
        assert_eq!(c.cache_ttl, Duration::from_secs(300));
        assert_eq!(c.render_floor, 0.3);
        assert_eq!(c.render_max_chars, 2000);
        assert_eq!(c.feedback_step, 0.02);
    }

    #[test]
    fn overrides_are_read() {
        let c = ResonanceConfig::from_lookup(lookup(&[
            ("RESONANCE_CACHE_TTL_SECS", "60"),
            ("RESONANCE_RENDER_MAX_CHARS", " 500 "),
        ]));
        assert_eq!(c.cache_ttl, Duration::from_secs(60));
        assert_eq!(c.render_max_chars, 500);
        assert_eq!(c.render_floor, DEFAULT_RENDER_FLOOR);
    }

    #[test]
    fn bad_values_fall_back() {
        let c = ResonanceConfig::from_lookup(lookup(&[
            ("RESONANCE_RENDER_FLOOR", "high"),
            ("RESONANCE_FEEDBACK_STEP", ""),
        ]));
        assert_eq!(c, ResonanceConfig::default());
    }

    #[test]
    fn non_finite_floor_falls_back() {
        for raw in ["NaN", "inf", "-inf", "-0.1", "1.5"] {
            let c = ResonanceConfig::from_lookup(lookup(&[("RESONANCE_RENDER_FLOOR", raw)]));
            assert_eq!(c.render_floor, DEFAULT_RENDER_FLOOR, "floor {raw}");
        }
        let c = ResonanceConfig::from_lookup(lookup(&[("RESONANCE_RENDER_FLOOR", "0.5")]));
        assert_eq!(c.render_floor, 0.5);
    }

    #[test]
    fn feedback_step_must_be_positive() {
        for raw in ["-0.5", "0", "NaN", "inf"] {
            let c = ResonanceConfig::from_lookup(lookup(&[("RESONANCE_FEEDBACK_STEP", raw)]));
            assert_eq!(c.feedback_step, DEFAULT_FEEDBACK_STEP, "step {raw}");
        }
        let c = ResonanceConfig::from_lookup(lookup(&[("RESONANCE_FEEDBACK_STEP", "0.05")]));
        assert_eq!(c.feedback_step, 0.05);
    }
}
