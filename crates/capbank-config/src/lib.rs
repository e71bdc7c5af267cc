//! ---
//! cb_section: "03-configuration"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Study configuration and tracing setup shared by the tools."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
//! Configuration loading and production logging for capacitor-bank studies.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ExportConfig, LoadedAppConfig, LoggingConfig, StudyConfig};
pub use logging::{init_tracing, LogFormat, TracingGuard};
