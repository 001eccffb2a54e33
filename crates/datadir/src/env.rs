//! Environment knobs for the loader and persister. Each knob has a sane
//! default and tolerates malformed values by falling back to it.

use std::thread;

use tracing::warn;

pub const LOADER_ENABLED: &str = "ATLAS_LOADER_ENABLED";
pub const LOADER_THREADS: &str = "ATLAS_LOADER_THREADS";
pub const ASYNC_ITERATOR_THREADS: &str = "ATLAS_ASYNC_ITERATOR_THREADS";
pub const RENAME_ATTEMPTS: &str = "ATLAS_RENAME_ATTEMPTS";

/// Hard ceiling for the parallel loader; the workload is I/O bound and wider
/// pools only add contention on the catalog locks.
const MAX_LOADER_THREADS: usize = 16;

const DEFAULT_ASYNC_ITERATOR_THREADS: usize = 4;
const DEFAULT_RENAME_ATTEMPTS: u32 = 100;

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring malformed {name}={raw}");
            None
        }
    }
}

/// Whether the parallel loader is enabled at all. Defaults to `true`;
/// anything other than `false`/`0`/`off` keeps it on.
pub fn loader_enabled() -> bool {
    match std::env::var(LOADER_ENABLED) {
        Ok(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off"),
        Err(_) => true,
    }
}

/// Worker count for the parallel loader: the override if set and positive,
/// otherwise available parallelism capped at [`MAX_LOADER_THREADS`].
pub fn loader_threads() -> usize {
    if let Some(n) = parse_var::<usize>(LOADER_THREADS) {
        if n > 0 {
            return n;
        }
        warn!("ignoring {LOADER_THREADS}=0");
    }
    let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    cores.min(MAX_LOADER_THREADS)
}

/// Worker count for the async resource iterator. `0` and `1` are meaningful
/// (fully synchronous / single background producer), so they pass through.
pub fn async_iterator_threads() -> usize {
    parse_var(ASYNC_ITERATOR_THREADS).unwrap_or(DEFAULT_ASYNC_ITERATOR_THREADS)
}

/// How many numbered alternatives to probe when a rename target file already
/// exists, before giving up.
pub fn rename_attempts() -> u32 {
    match parse_var::<u32>(RENAME_ATTEMPTS) {
        Some(n) if n > 0 => n,
        Some(_) => {
            warn!("ignoring {RENAME_ATTEMPTS}=0");
            DEFAULT_RENAME_ATTEMPTS
        }
        None => DEFAULT_RENAME_ATTEMPTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_positive() {
        // Do not touch the process environment in tests; just exercise the
        // default paths.
        assert!(loader_threads() >= 1);
        assert!(rename_attempts() >= 1);
    }
}
