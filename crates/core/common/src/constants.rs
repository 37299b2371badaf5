//! Engine-wide defaults
//!
//! Single source of truth for the numbers the services share.

// Time constants
/// Milliseconds in one minute
pub const MILLIS_PER_MIN: u64 = 60_000;

// Feed connection
/// Attempts made to open the live tick feed before giving up
pub const DEFAULT_FEED_RETRY_ATTEMPTS: u32 = 10;
/// Fixed pause between two feed connection attempts
pub const DEFAULT_FEED_RETRY_DELAY_MS: u64 = 100;

// Channels
/// Capacity of tick and candle links; 1 keeps the pipeline in lock-step
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;
/// Default candle resolution
pub const DEFAULT_RESOLUTION_MS: u64 = MILLIS_PER_MIN;

// Order events
/// Tag sent by the store when an order was canceled
pub const ORDER_STATE_CANCEL: &str = "cancel";
/// Tag sent by the store when an order was filled
pub const ORDER_STATE_DONE: &str = "done";
/// Tag sent by the store while an order is still working
pub const ORDER_STATE_WAIT: &str = "wait";
