//! Constants for board geometry, move encoding, identity issuance and the
//! pipeline defaults.
//!
//! Board dimensions are chosen per record at runtime, so nothing here fixes
//! the board size; these are limits and defaults shared across modules.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board size when a record does not declare one.
pub const DEFAULT_SIZE: usize = 19;

/// Largest board side whose fingerprint keys come from the shared,
/// precomputed table. Larger boards build their own table.
pub const PRECOMPUTED_MAX_SIZE: usize = 19;

/// Seed for the shared fingerprint key table.
pub const FINGERPRINT_SEED: u64 = 0x5eed_0f_90_b0a2d;

// =============================================================================
// Move Encoding
// =============================================================================

/// Coordinate alphabet: `a`-`z` map to 0-25, `A`-`Z` map to 26-51.
pub const COORD_ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest board side the move text encoding can address.
pub const MAX_SIZE: usize = COORD_ALPHABET.len();

/// Legacy SGF pass encoding, honoured on boards no larger than 19x19.
pub const LEGACY_PASS: &str = "tt";

// =============================================================================
// Identity Issuance
// =============================================================================

/// Number of redraws allowed on an identifier collision before the
/// generator is declared defective.
pub const IDENTITY_MAX_ATTEMPTS: usize = 100;

/// Identity given to an empty player name. Never issued to a real name.
pub const ANONYMOUS_ID: u32 = 0;

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Default number of workers per stage.
pub const DEFAULT_WORKERS: usize = 1;

/// Default capacity of each inter-stage queue, per worker.
pub const QUEUE_CAPACITY_PER_WORKER: usize = 4096;

/// Maximum number of records read when counting player frequency for the
/// top-cut filter.
pub const TOP_CUT_SAMPLE_LIMIT: usize = 100_000;
