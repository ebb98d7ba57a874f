//! rabbithole-engine – Session-Protokoll-Engine des Rabbit-Hole-Clients
//!
//! Verbindungs-Lifecycle, Authentifizierungs-Zustandsmaschine, typisierter
//! Nachrichten-Dispatch, ausgehende Befehle mit Vorbedingungspruefung und
//! die Anbindung der Wiedergabe-Warteschlange. Die gesamte Sitzungs-Mutation
//! laeuft durch genau eine Steuerschleife pro Sitzung; externe
//! Kollaborateure arbeiten ueber Befehle und Schnappschuesse.

pub mod callbacks;
pub mod command;
mod dispatcher;
pub mod engine;
pub mod session;
pub mod state;

// Re-Exporte fuer bequemen Zugriff
pub use callbacks::{AnmeldedatenSpeicher, RegistrierungsCallback, VerwerfenderCallback};
pub use command::SitzungsBefehl;
pub use engine::{RabbitHole, RabbitHoleKonfig};
pub use session::{Sitzung, SitzungsGriff, SitzungsUmgebung, SPRACHNOTIZ_NACHLAUF};
pub use state::{SitzungsZustand, ZustandsEreignis};
