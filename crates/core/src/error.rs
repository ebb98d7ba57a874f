//! Fehlertypen fuer den Rabbit-Hole-Client
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Keiner dieser Fehler ist fatal fuer den Prozess – der schlimmste
//! Ausgang ist ein Sitzungs-Reset zurueck auf Unverbunden.

use thiserror::Error;

/// Globaler Result-Alias fuer den Rabbit-Hole-Client
pub type Result<T> = std::result::Result<T, RabbitHoleFehler>;

/// Alle moeglichen Fehler im Rabbit-Hole-Client
#[derive(Debug, Error)]
pub enum RabbitHoleFehler {
    // --- Vorbedingungen ---
    #[error("Vorbedingung verletzt: {0}")]
    Vorbedingung(String),

    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Authentifizierung ---
    #[error("Authentifizierung fehlgeschlagen: {0}")]
    Authentifizierung(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Wiedergabe ---
    #[error("Wiedergabefehler: {0}")]
    Wiedergabe(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RabbitHoleFehler {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die Sitzung unberuehrt laesst
    ///
    /// Vorbedingungs-, Dekodier- und Wiedergabefehler werden geloggt und
    /// uebersprungen; nur Transportfehler setzen den Sitzungszustand zurueck.
    pub fn laesst_sitzung_bestehen(&self) -> bool {
        !matches!(self, Self::Verbindung(_) | Self::Getrennt(_))
    }
}
