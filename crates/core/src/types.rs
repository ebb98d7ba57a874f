//! Gemeinsame Basistypen fuer den Rabbit-Hole-Client
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anmeldedaten des Geraets: IMEI + Account-Key
///
/// Beide Felder muessen nicht-leer sein, bevor ein Logon-Versuch
/// unternommen wird. Ein leeres Feld ist eine Vorbedingungsverletzung,
/// kein Protokollfehler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anmeldedaten {
    /// Geraete-Kennung (IMEI)
    pub imei: String,
    /// Account-Schluessel
    pub account_key: String,
}

impl Anmeldedaten {
    /// Erstellt neue Anmeldedaten
    pub fn neu(imei: impl Into<String>, account_key: impl Into<String>) -> Self {
        Self {
            imei: imei.into(),
            account_key: account_key.into(),
        }
    }

    /// Gibt true zurueck wenn beide Felder nicht-leer sind
    pub fn vollstaendig(&self) -> bool {
        !self.imei.is_empty() && !self.account_key.is_empty()
    }
}

/// Eindeutige ID eines Protokoll-Eintrags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EintragsId(pub Uuid);

impl EintragsId {
    /// Erstellt eine neue zufaellige EintragsId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for EintragsId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for EintragsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "eintrag:{}", self.0)
    }
}
