// TIMER LOGGING MACROS
#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        print!("{}", $msg);
        colour::green_ln!("{:?}", $time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        // Nothing
    };
}

// SECTION LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_sections")]
macro_rules! section_log {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_sections"))]
macro_rules! section_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
