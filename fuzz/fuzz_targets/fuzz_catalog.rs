//! Fuzz target: catalog and scenario parsing
//!
//! Arbitrary bytes must never panic the JSON loaders; a catalog that
//! parses must answer lookups for every barcode it was built from.
//!
//! cargo fuzz run fuzz_catalog

#![no_main]

use libfuzzer_sys::fuzz_target;
use rvmcore::adapters::sim::Scenario;
use rvmcore::app::ports::CatalogPort;
use rvmcore::catalog::CatalogSnapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(catalog) = CatalogSnapshot::from_json(text) {
        assert!(catalog.len() <= text.len());
    }

    if let Ok(scenario) = Scenario::from_json(text) {
        assert!(scenario.events.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
        if let Ok(catalog) = scenario.catalog_snapshot() {
            for entry in &scenario.catalog {
                assert!(catalog.lookup(&entry.barcode).is_some());
            }
        }
    }
});
