/// Namespace prefixes (canonical form) that never produce output
pub const EXCLUDED_NAMESPACES: &[&str] = &[
    "file",
    "talk",
    "special",
    "wikipedia",
    "wiktionary",
    "user",
    "user_talk",
];

/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Intake slots per worker before the decoder blocks
pub const INTAKE_DEPTH: usize = 4;

/// Outtake slots per worker before workers block on the collector
pub const OUTTAKE_DEPTH: usize = 64;

/// Buffer size for the output writer
pub const OUTPUT_BUFFER_SIZE: usize = 128 * 1024;

/// Buffer size for reading the dump
pub const INPUT_BUFFER_SIZE: usize = 256 * 1024;
