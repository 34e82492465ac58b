//! Cross-module tests.

mod helpers;
