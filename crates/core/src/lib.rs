//! rabbithole-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Rabbit-Hole-Crates gemeinsam genutzt werden.

pub mod error;
pub mod transcript;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{RabbitHoleFehler, Result};
pub use transcript::{Ereignisprotokoll, Herkunft, InhaltsTyp, ProtokollEintrag};
pub use types::{Anmeldedaten, EintragsId};
