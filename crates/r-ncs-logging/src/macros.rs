//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Structured logging adapters and sinks."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
/// Emit an informational log enriched with console context.
#[macro_export]
macro_rules! ncs_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::INFO, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::INFO, context = $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with console context.
#[macro_export]
macro_rules! ncs_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::DEBUG, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::DEBUG, context = $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with console context.
#[macro_export]
macro_rules! ncs_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::WARN, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::WARN, context = $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with console context.
#[macro_export]
macro_rules! ncs_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::ERROR, context = $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::ncs_event!(tracing::Level::ERROR, context = $crate::LogContext::default(), $($arg)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! ncs_event {
    ($level:expr, context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            app = ctx.app.unwrap_or(""),
            command = ctx.command.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
