//! Coordinate reference system bootstrap.
//!
//! The CRS registry initializes lazily behind a process-wide lock, and the
//! first resource decoded on each loader worker would otherwise pile every
//! worker up on that lock. The orchestrator calls [`warm_up`] once, on the
//! orchestrating thread, before any parallel work starts.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

static REGISTRY: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

/// Force registry initialization. Idempotent and cheap after the first call.
pub fn warm_up() {
    let registry = REGISTRY.get_or_init(|| {
        debug!("initializing CRS registry");
        well_known()
    });
    debug!("CRS registry ready ({} codes)", registry.len());
}

/// Human-readable name for a well-known CRS code, e.g. `EPSG:4326`.
pub fn describe(code: &str) -> Option<&'static str> {
    REGISTRY.get_or_init(well_known).get(code).copied()
}

fn well_known() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("EPSG:4326", "WGS 84"),
        ("EPSG:3857", "WGS 84 / Pseudo-Mercator"),
        ("EPSG:4269", "NAD83"),
        ("EPSG:3395", "WGS 84 / World Mercator"),
        ("CRS:84", "WGS 84 (lon/lat)"),
    ])
}
