/// Which wire protocol an instance of the core speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Protocol {
    /// 14-symbol, 4-character-alphabet protocol.
    Small,
    /// Decimal-digit protocol framed by `'*'`/`'#'`.
    Full,
    /// 13-symbol, 4-character-alphabet protocol carrying the extended-small
    /// `SET_CREDIT_AND_WIPE_FLAG` payload.
    ExtendedSmall,
}

/// Build-time tuning parameters. Validated once, at construction, so every
/// later read is infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    protocol: Protocol,
    rate_limit_bucket_max: u8,
    rate_limit_refill_seconds: u16,
    rate_limit_initial_count: u8,
    factory_qc_short_lifetime: u8,
    factory_qc_long_lifetime: u8,
    entry_timeout_seconds: u32,
    idle_between_process_seconds: u32,
}

/// Reasons [`Config::new`] can reject a parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ConfigError {
    /// `rate_limit_refill_seconds` was 0 or exceeded 3600.
    #[cfg_attr(feature = "std", error("rate_limit_refill_seconds out of range"))]
    RefillSecondsOutOfRange,
    /// `factory_qc_short_lifetime` or `factory_qc_long_lifetime` exceeded 15.
    #[cfg_attr(feature = "std", error("factory QC lifetime out of range"))]
    QcLifetimeOutOfRange,
}

impl Config {
    /// Validates and constructs a `Config`. `const fn` so invalid
    /// configurations are caught even when built as a `const`.
    pub const fn new(
        protocol: Protocol,
        rate_limit_bucket_max: u8,
        rate_limit_refill_seconds: u16,
        rate_limit_initial_count: u8,
        factory_qc_short_lifetime: u8,
        factory_qc_long_lifetime: u8,
        entry_timeout_seconds: u32,
        idle_between_process_seconds: u32,
    ) -> Self {
        if rate_limit_refill_seconds == 0 || rate_limit_refill_seconds > 3600 {
            panic!("rate_limit_refill_seconds out of range");
        }
        if factory_qc_short_lifetime > 15 || factory_qc_long_lifetime > 15 {
            panic!("factory QC lifetime out of range");
        }
        Self {
            protocol,
            rate_limit_bucket_max,
            rate_limit_refill_seconds,
            rate_limit_initial_count,
            factory_qc_short_lifetime,
            factory_qc_long_lifetime,
            entry_timeout_seconds,
            idle_between_process_seconds,
        }
    }

    /// The protocol this instance speaks.
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Token-bucket capacity, in refill units.
    pub const fn rate_limit_bucket_max(&self) -> u8 {
        self.rate_limit_bucket_max
    }

    /// Seconds represented by one refill token.
    pub const fn rate_limit_refill_seconds(&self) -> u16 {
        self.rate_limit_refill_seconds
    }

    /// Grace-counter seed used the very first time NV has no stored value.
    pub const fn rate_limit_initial_count(&self) -> u8 {
        self.rate_limit_initial_count
    }

    /// Lifetime cap on short (<=10 minute) QC test codes.
    pub const fn factory_qc_short_lifetime(&self) -> u8 {
        self.factory_qc_short_lifetime
    }

    /// Lifetime cap on long (>10 minute) QC test codes.
    pub const fn factory_qc_long_lifetime(&self) -> u8 {
        self.factory_qc_long_lifetime
    }

    /// Seconds of assembler inactivity before a partial entry resets.
    pub const fn entry_timeout_seconds(&self) -> u32 {
        self.entry_timeout_seconds
    }

    /// `process` interval requested while idle.
    pub const fn idle_between_process_seconds(&self) -> u32 {
        self.idle_between_process_seconds
    }

    /// Defaults mirroring the small-protocol reference configuration.
    pub const DEFAULT: Config = Config::new(Protocol::Small, 10, 60, 3, 3, 3, 20, 3600);
}
