// src/config/constants.rs
//! System-wide configuration constants

/// Control loop timing constants
pub mod timing {
    pub const DEFAULT_TICK_PERIOD_MS: u64 = 1;
    pub const MIN_TICK_PERIOD_MS: u64 = 1;
    pub const MAX_TICK_PERIOD_MS: u64 = 100;

    pub const NANOSECONDS_PER_SECOND: u64 = 1_000_000_000;
}

/// Stimulation channel constants
pub mod stimulation {
    pub const MIN_CHANNEL_INDEX: u8 = 1;
    pub const MAX_CHANNEL_INDEX: u8 = 8;
    pub const MAX_CHANNEL_COUNT: usize = 8;
    pub const MIN_CHANNEL_COUNT: usize = 1;

    /// Rehastim current limit in mA
    pub const MAX_AMPLITUDE_MA: f64 = 130.0;
    pub const DEFAULT_AMPLITUDE_MA: f64 = 20.0;

    /// Amplitude recorded for a configured channel that is not stimulating
    pub const IDLE_AMPLITUDE: f64 = 0.0;
}

/// Device layer constants
pub mod device {
    pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
    pub const DEFAULT_STIMULATION_INTERVAL_MS: u32 = 33;
    pub const DEFAULT_LOW_FREQUENCY_FACTOR: u32 = 0;
    /// Rehastim-class main stimulation interval limits
    pub const MIN_STIMULATION_INTERVAL_MS: u32 = 8;
    pub const MAX_STIMULATION_INTERVAL_MS: u32 = 1025;
    pub const MAX_LOW_FREQUENCY_FACTOR: u32 = 7;
    pub const SIMULATOR_NAME: &str = "SimulatedStimulator";
}

/// Gait constants
pub mod gait {
    pub const DEFAULT_STRIDE_PERIOD_S: f64 = 1.2;
    /// Right leg trails the left by half a stride in a symmetric gait
    pub const DEFAULT_RIGHT_OFFSET: f64 = 0.5;
    pub const MIN_PHASE: f64 = 0.0;
    pub const MAX_PHASE: f64 = 1.0;
}

/// Event log persistence constants
pub mod persistence {
    pub const MAGIC: &[u8; 4] = b"FESL";
    pub const FORMAT_VERSION: u8 = 1;
    /// magic + version + crc32
    pub const HEADER_LEN: usize = 4 + 1 + 4;
    pub const DEFAULT_LOG_PATH: &str = "stimulation_log.fesl";
}

/// Configuration file locations
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "fes.toml";
    pub const LOCAL_CONFIG_FILE: &str = "fes.local.toml";
    pub const ENV_PREFIX: &str = "FES_";
}
