/// Classification for retry policy.
///
/// Used by the [`RetryExecutor`](crate::retry::RetryExecutor) to decide whether an
/// error is worth another attempt and which delay curve applies.
///
/// # Behavior Summary
///
/// | Class | Retry? | Delay after attempt `n` (0-based) |
/// |-------|--------|-----------------------------------|
/// | `Never` | No | - |
/// | `WithBackoff` | Yes | `initial * 2^n` |
/// | `RateLimited` | Yes | `initial * 2^n * 2` |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the operation was refused before any request went out.
    Never,

    /// Any failed request that is not a rate limit.
    WithBackoff,

    /// The provider answered HTTP 429.
    ///
    /// Still counts toward the attempt budget, but waits twice as long
    /// as a generic failure before the next attempt.
    RateLimited,
}
