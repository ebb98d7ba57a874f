//! rabbithole-observability – Structured Logging fuer den Rabbit-Hole-Client
//!
//! Der Client ist ein Endgeraet ohne eigene Netz-Endpunkte; Observability
//! beschraenkt sich deshalb auf das Logging-Setup.

pub mod logging;

pub use logging::{
    log_format_aus_env, log_format_gueltig, log_level_aus_env, log_level_gueltig,
    logging_initialisieren,
};
