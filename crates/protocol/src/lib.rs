//! rabbithole-protocol – Protokoll-Definitionen fuer das Rabbit-Hole-Drahtprotokoll
//!
//! Definiert die typisierten Umschlaege (`{ "type": ..., "data": ... }`) und
//! das frame-basierte Wire-Format (u32 BE Laenge + JSON-Payload) fuer die
//! persistente Socket-Verbindung zum Rabbit-Hole-Server.

pub mod envelope;
pub mod wire;

// Re-Exporte fuer bequemen Zugriff
pub use envelope::{
    ClientEnvelope, LogonRequest, ProtokollFehler, PttSignal, RegisterResult, ServerEnvelope,
};
pub use wire::{FrameCodec, DEFAULT_MAX_FRAME_SIZE};
