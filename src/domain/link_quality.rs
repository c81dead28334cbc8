//! Link-quality normalization from per-node transport statistics.

use crate::transport::{NodeStatistics, ProtocolVariant};

/// RSSI substituted when no sample can be read.
const FALLBACK_RSSI: i32 = -76;

/// RSSI reported as the literal `"MAX"`.
const RSSI_MAX: i32 = -50;

/// RSSI reported as the literal `"MIN"`.
const RSSI_MIN: i32 = -100;

/// Maps a raw signal metric (dBm-like, `-100` worst) into `0..=100`.
///
/// Affine `2 * (raw + 100)`, clamped. Monotonic in `raw`.
#[must_use]
pub fn normalize(raw: i32) -> u8 {
    let scaled = raw.saturating_add(100).saturating_mul(2).clamp(0, 100);
    u8::try_from(scaled).unwrap_or(0)
}

/// Averages the RSSI samples of a modern engine.
///
/// `"MAX"` and `"MIN"` count as their bounds, numbers count as-is, anything
/// else is skipped. With no usable sample the fallback value is returned.
#[must_use]
pub fn average_rssi(samples: &[String]) -> i32 {
    let readings: Vec<i32> = samples
        .iter()
        .filter_map(|sample| match sample.trim() {
            "MAX" => Some(RSSI_MAX),
            "MIN" => Some(RSSI_MIN),
            other => other.parse::<i32>().ok(),
        })
        .collect();

    let Ok(count) = i32::try_from(readings.len()) else {
        return FALLBACK_RSSI;
    };
    if count == 0 {
        return FALLBACK_RSSI;
    }
    readings.iter().fold(0i32, |acc, r| acc.saturating_add(*r)) / count
}

/// Computes the normalized link quality for a node.
#[must_use]
pub fn link_quality(stats: &NodeStatistics, variant: ProtocolVariant) -> u8 {
    match variant {
        ProtocolVariant::Legacy => normalize(stats.quality),
        ProtocolVariant::Modern => normalize(average_rssi(&stats.rssi)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_bounds() {
        assert_eq!(normalize(-100), 0);
        assert_eq!(normalize(-75), 50);
        assert_eq!(normalize(-50), 100);
        assert_eq!(normalize(-120), 0);
        assert_eq!(normalize(10), 100);
    }

    #[test]
    fn rssi_literals_and_garbage() {
        let samples = vec![
            "MAX".to_string(),
            "MIN".to_string(),
            "-80".to_string(),
            "n/a".to_string(),
        ];
        assert_eq!(average_rssi(&samples), (-50 - 100 - 80) / 3);
    }

    #[test]
    fn no_samples_falls_back() {
        assert_eq!(average_rssi(&[]), FALLBACK_RSSI);
        assert_eq!(average_rssi(&["".to_string()]), FALLBACK_RSSI);
    }

    #[test]
    fn variant_picks_metric() {
        let stats = NodeStatistics {
            quality: -60,
            rssi: vec!["MAX".to_string()],
        };
        assert_eq!(link_quality(&stats, ProtocolVariant::Legacy), 80);
        assert_eq!(link_quality(&stats, ProtocolVariant::Modern), 100);
    }

    proptest! {
        #[test]
        fn normalize_is_clamped(raw in any::<i32>()) {
            prop_assert!(normalize(raw) <= 100);
        }

        #[test]
        fn normalize_is_monotonic(a in any::<i32>(), b in any::<i32>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(normalize(lo) <= normalize(hi));
        }
    }
}
