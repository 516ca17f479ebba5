//! The named-parameter surface: everything listed is settable, and values
//! round-trip through the listing.

use proptest::prelude::*;

use loki_core::Config;

#[test]
fn every_listed_parameter_name_is_settable() {
    let mut config = Config::default();
    for row in config.clone().list_parameters() {
        // Re-apply the current value through the override path; every name
        // the listing shows must be accepted.
        let result = config.set_parameter(row.name, &row.value);
        assert!(result.is_ok(), "parameter {} rejected its own value", row.name);
    }
}

proptest! {
    /// Numeric overrides land in the listing verbatim.
    #[test]
    fn numeric_overrides_round_trip(
        value in 1u32..10_000,
        name_index in 0usize..6,
    ) {
        let names = [
            "ipk-cache-size",
            "ipk-fifo-size",
            "scratchpad-size",
            "memory-latency",
            "idle-timeout",
            "max-credits",
        ];
        let name = names[name_index];
        let mut config = Config::default();
        prop_assert!(config.set_parameter(name, &value.to_string()).is_ok());
        let listed = config
            .list_parameters()
            .into_iter()
            .find(|row| row.name == name)
            .map(|row| row.value);
        prop_assert_eq!(listed, Some(value.to_string()));
    }
}
