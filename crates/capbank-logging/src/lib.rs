//! ---
//! cb_section: "01-logging"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Structured logging context and sinks for unbalance studies."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

const LOG_ENV: &str = "CAPBANK_LOG";

/// Console subscriber for runs without a configuration file.
///
/// Events go to stderr; the filter comes from `CAPBANK_LOG`, then `RUST_LOG`, then `info`.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()));
    let _ = Registry::default()
        .with(filter)
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Bank being studied, attached to every event of a sweep.
#[derive(Debug, Clone)]
pub struct LogContext<'a> {
    /// Protection topology key (e.g. `yy_internal_fuses`).
    pub topology: &'a str,
    /// Grounding flag (0 grounded, 1 ungrounded).
    pub grounding: u8,
    /// Configured study name; ad-hoc sweeps have none.
    pub study: Option<&'a str>,
    /// Fault index label (`3`, `SU`, ...) for per-row events.
    pub fault_index: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Context for one bank.
    pub fn new(topology: &'a str, grounding: u8) -> Self {
        Self {
            topology,
            grounding,
            study: None,
            fault_index: None,
        }
    }

    /// Attach the study name, if any.
    pub fn with_study(mut self, study: Option<&'a str>) -> Self {
        self.study = study;
        self
    }

    /// Attach a fault index label.
    pub fn with_fault_index(mut self, fault_index: &'a str) -> Self {
        self.fault_index = Some(fault_index);
        self
    }
}

/// Outcome of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a lifecycle event (`study.sweep`, `arrangement.validate`) for one bank.
pub fn log_system_event(
    ctx: &LogContext,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    // `tracing::event!` needs a constant level, so branch on the outcome.
    match outcome {
        SystemEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            study = ctx.study.unwrap_or(""),
            topology = ctx.topology,
            grounding = ctx.grounding,
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            study = ctx.study.unwrap_or(""),
            topology = ctx.topology,
            grounding = ctx.grounding,
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new("yy_internal_fuses", 1).with_study(Some("substation-a"));
        cb_info!(context = ctx, "sweep started");
        cb_debug!(context = ctx.clone().with_fault_index("2"), "row computed");
        cb_warn!(context = ctx, "topology advisory");
        cb_error!(context = ctx.with_fault_index("SU"), "error code: {}", 42);
    }

    #[test]
    fn context_builder_sets_fields() {
        let ctx = LogContext::new("h_bridge_external_fuses", 0).with_fault_index("7");
        assert_eq!(ctx.topology, "h_bridge_external_fuses");
        assert_eq!(ctx.grounding, 0);
        assert_eq!(ctx.fault_index, Some("7"));
        assert!(ctx.study.is_none());
        assert!(ctx.with_study(None).study.is_none());
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new("y_internal_fuses", 0).with_study(Some("substation-b"));
        log_system_event(
            &ctx,
            "test.event",
            "system event helper executed",
            SystemEventOutcome::Success,
        );
        log_system_event(
            &ctx,
            "test.event",
            "system event helper fault",
            SystemEventOutcome::Fault,
        );
    }
}
