//! Compile-time configuration of the library.
//!
//! The `testing` feature makes every `threading_assert!` a hard `assert!`
//! and is what the `test-threading` binary is built with. The default
//! `enable-assert` feature maps the macro to `debug_assert!`. With neither
//! feature the checks compile away.

/// True when the crate was built with the `testing` feature.
pub const TESTING: bool = cfg!(feature = "testing");

/// True when `threading_assert!` is checked at runtime in this build.
pub const ASSERTIONS: bool =
    cfg!(feature = "testing") || (cfg!(feature = "enable-assert") && cfg!(debug_assertions));

/// Contract check used across the crate.
#[cfg(feature = "testing")]
#[macro_export]
macro_rules! threading_assert {
    ($($arg:tt)*) => {
        assert!($($arg)*)
    };
}

/// Contract check used across the crate.
#[cfg(all(not(feature = "testing"), feature = "enable-assert"))]
#[macro_export]
macro_rules! threading_assert {
    ($($arg:tt)*) => {
        debug_assert!($($arg)*)
    };
}

/// Contract check used across the crate.
#[cfg(all(not(feature = "testing"), not(feature = "enable-assert")))]
#[macro_export]
macro_rules! threading_assert {
    ($($arg:tt)*) => {
        if false {
            assert!($($arg)*)
        }
    };
}
