//! Fehlertypen fuer die Audio-Seite des Clients

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Seite
#[derive(Debug, Error)]
pub enum AudioFehler {
    #[error("Unbekanntes Clip-Format: {0}")]
    UnbekanntesFormat(String),

    #[error("Wiedergabe fehlgeschlagen: {0}")]
    Wiedergabe(String),

    #[error("Wiedergabe-Warteschlange ist geschlossen")]
    WarteschlangeGeschlossen,

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type AudioResult<T> = Result<T, AudioFehler>;
