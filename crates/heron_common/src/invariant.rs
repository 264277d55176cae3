//! Fatal invariant checks with stable diagnostic codes.
//!
//! A breached invariant here means in-memory or on-disk state is no longer
//! trustworthy; the operation must not continue. Each call site carries a
//! unique numeric code so a production log line can be traced to one place
//! in the source without a backtrace.

/// Unconditionally report a broken invariant and panic. The code and message
/// are logged at ERROR before unwinding.
#[macro_export]
macro_rules! fatal_failed {
    ($code:expr, $($arg:tt)+) => {{
        let msg = ::std::format!($($arg)+);
        ::tracing::error!(code = $code, "Fatal assertion [{}]: {}", $code, msg);
        panic!("fatal assertion [{}]: {}", $code, msg);
    }};
}

/// Check a condition that must hold; panic with the stable code otherwise.
#[macro_export]
macro_rules! fatal_invariant {
    ($code:expr, $cond:expr, $($arg:tt)+) => {{
        if !$cond {
            $crate::fatal_failed!($code, $($arg)+);
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_invariant_holds_is_silent() {
        fatal_invariant!(70000, 1 + 1 == 2, "arithmetic broke");
    }

    #[test]
    #[should_panic(expected = "fatal assertion [70001]")]
    fn test_invariant_breach_panics_with_code() {
        fatal_invariant!(70001, false, "expected breach: {}", "details");
    }

    #[test]
    #[should_panic(expected = "fatal assertion [70002]")]
    fn test_fatal_failed_panics() {
        fatal_failed!(70002, "unconditional");
    }
}
