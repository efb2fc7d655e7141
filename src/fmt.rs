//! Logging shims.
//!
//! Forwards to `defmt` or `log` depending on which feature is enabled and
//! compiles to nothing when neither is.
#![allow(unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! debug {
            ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
        }
        macro_rules! info {
            ($($arg:tt)*) => { ::defmt::info!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { ::defmt::error!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! debug {
            ($($arg:tt)*) => { ::log::debug!($($arg)*) };
        }
        macro_rules! info {
            ($($arg:tt)*) => { ::log::info!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { ::log::error!($($arg)*) };
        }
    } else {
        macro_rules! debug {
            ($s:literal $(, $x:expr)* $(,)?) => {{
                let _ = ($(&$x),*);
            }};
        }
        macro_rules! info {
            ($s:literal $(, $x:expr)* $(,)?) => {{
                let _ = ($(&$x),*);
            }};
        }
        macro_rules! error {
            ($s:literal $(, $x:expr)* $(,)?) => {{
                let _ = ($(&$x),*);
            }};
        }
    }
}
