//! ---
//! cb_section: "01-logging"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Study-context logging macros."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
#[doc(hidden)]
#[macro_export]
macro_rules! __cb_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        tracing::event!(
            $level,
            study = ctx.study.unwrap_or(""),
            topology = ctx.topology,
            grounding = ctx.grounding,
            fault_index = ctx.fault_index.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Pipeline stage of one study.
#[macro_export]
macro_rules! cb_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cb_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
}

/// Per-row sweep detail.
#[macro_export]
macro_rules! cb_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cb_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
}

/// Topology advisory that does not stop the study.
#[macro_export]
macro_rules! cb_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cb_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
}

/// Row or stage failure.
#[macro_export]
macro_rules! cb_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cb_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
}
