//! Token tailoring: pure functions computing how many input/output tokens a
//! chat call may use out of a model's context window (spec §4.6).
//!
//! Both functions are integer-only (no float rounding drift across
//! platforms) and MUST reproduce the calibration table in spec §8 S1
//! bit-exactly, since callers on either side of a provider boundary need
//! to agree on the same numbers without renegotiating.

/// `floor(w * pct / 100)` done in integer arithmetic.
fn percent_of(w: u64, pct: u64) -> u64 {
    (w * pct) / 100
}

/// Maximum input tokens a request may use out of a context window `w`.
///
/// ```text
/// safety = floor(w * 0.10)
/// calc   = max(w - 2048 - 512 - safety, 0)
/// ratio  = floor(w * 0.65)
/// result = max(min(calc, ratio), 1024)
/// ```
pub fn max_input_tokens(context_window: u64) -> u64 {
    let safety = percent_of(context_window, 10);
    let reserved = 2048 + 512 + safety;
    let calc = context_window.saturating_sub(reserved);
    let ratio = percent_of(context_window, 65);
    calc.min(ratio).max(1024)
}

/// Maximum output tokens given a context window `w` and tokens already
/// used for input `u`: `max(w - u - 512 - floor(w * 0.10), 0)`.
pub fn max_output_tokens(context_window: u64, used_input_tokens: u64) -> u64 {
    let safety = percent_of(context_window, 10);
    let reserved = used_input_tokens + 512 + safety;
    context_window.saturating_sub(reserved)
}

#[cfg(test)]
mod tests {
    use super::*;

    // spec §8 S1 — calibration table, reproduced bit-exactly.
    #[test]
    fn tailor_calibration_table_s1() {
        assert_eq!(max_input_tokens(200_000), 130_000);
        assert_eq!(max_input_tokens(131_072), 85_196);
        assert_eq!(max_input_tokens(128_000), 83_200);
        assert_eq!(max_input_tokens(8_192), 4_813);
        assert_eq!(max_input_tokens(2_048), 1_024);
    }

    // spec §8 invariant 4.
    #[test]
    fn tailor_stays_within_bounds_for_large_windows() {
        for w in [4096u64, 8192, 16384, 32768, 65536, 128_000, 131_072, 200_000, 1_000_000] {
            let tailored = max_input_tokens(w);
            assert!(tailored >= 1024, "w={w} tailored={tailored}");
            assert!(
                (tailored as f64) <= 0.65 * (w as f64) + 1.0,
                "w={w} tailored={tailored}"
            );
        }
    }

    #[test]
    fn tailor_floors_small_windows_to_the_minimum() {
        assert_eq!(max_input_tokens(0), 1024);
        assert_eq!(max_input_tokens(1024), 1024);
    }

    #[test]
    fn max_output_tokens_subtracts_input_usage_and_safety_margin() {
        let window = 200_000;
        let used = max_input_tokens(window);
        let out = max_output_tokens(window, used);
        assert_eq!(out, window - used - 512 - percent_of(window, 10));
    }

    #[test]
    fn max_output_tokens_floors_at_zero() {
        assert_eq!(max_output_tokens(1000, 999_999), 0);
    }

    proptest::proptest! {
        #[test]
        fn max_input_tokens_never_exceeds_window(w in 0u64..5_000_000) {
            let tailored = max_input_tokens(w);
            proptest::prop_assert!(tailored <= w.max(1024));
        }
    }
}
