//! Schnittstellen zu externen Kollaborateuren
//!
//! Die Engine haengt von zwei Aussenseiten ab: einem Anmeldedaten-Speicher
//! (get/set von String-Paaren) und einem Registrierungs-Callback der das
//! Ergebnis der QR-Registrierung entgegennimmt. Beide werden von der
//! aufrufenden Schicht implementiert; die Engine kennt nur die Traits.

use rabbithole_core::{Anmeldedaten, Result};

/// Externer Speicher fuer Anmeldedaten
///
/// Die Persistenz-Strategie (Datei, Keyring, ...) ist Sache des
/// Implementierers.
pub trait AnmeldedatenSpeicher: Send + Sync {
    /// Laedt die zuletzt gespeicherten Anmeldedaten, falls vorhanden
    fn laden(&self) -> Result<Option<Anmeldedaten>>;

    /// Speichert Anmeldedaten; `roh_registrierung` ist das unveraenderte
    /// `data`-JSON der Registrierungs-Antwort, falls die Daten daraus stammen
    fn speichern(&self, daten: &Anmeldedaten, roh_registrierung: Option<&str>) -> Result<()>;
}

/// Callback fuer Registrierungs-Ergebnisse
///
/// Wird bei JEDEM eingehenden Registrierungs-Ergebnis aufgerufen, auch wenn
/// die Sitzung selbst keine Registrierung angestossen hat. Die Engine
/// aendert ihren Authentifizierungszustand dadurch nicht; der Implementierer
/// persistiert die Daten und spielt sie ueber `anmeldedaten_setzen` wieder
/// ein, was den frischen Logon ausloest.
pub trait RegistrierungsCallback: Send + Sync {
    /// `roh` ist das byte-genaue `data`-JSON der Server-Antwort
    fn registriert(&self, imei: &str, account_key: &str, roh: &str);
}

/// Callback-Implementierung die Registrierungen verwirft (fuer Tests und
/// Clients ohne Registrierungs-Flow)
#[derive(Debug, Default)]
pub struct VerwerfenderCallback;

impl RegistrierungsCallback for VerwerfenderCallback {
    fn registriert(&self, imei: &str, _account_key: &str, _roh: &str) {
        tracing::debug!(imei, "Registrierungs-Ergebnis ohne Abnehmer verworfen");
    }
}
