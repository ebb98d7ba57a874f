//! Sitzungskern – Zustand, Dispatch und Befehlsverarbeitung
//!
//! Der Kern gehoert exklusiv der Steuerschleife einer Sitzung und wird nur
//! von dort mutiert. Eingehende Rahmen werden nach `type` geroutet,
//! ausgehende Befehle gegen die Vorbedingungen geprueft und als Umschlaege
//! zurueckgegeben (das eigentliche Senden uebernimmt die Schleife).
//!
//! ## Fehlerverhalten
//! - Unbekannte `type`-Werte: stillschweigend ignoriert
//! - Fehlerhafte Rahmen: geloggt, uebersprungen, Sitzung laeuft weiter
//! - Vorbedingungsverletzungen: Befehl wird fallen gelassen und geloggt

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use rabbithole_audio::{als_daten_url, WiedergabeEinreihung};
use rabbithole_core::{
    Anmeldedaten, Ereignisprotokoll, Herkunft, InhaltsTyp, ProtokollEintrag,
};
use rabbithole_protocol::{ClientEnvelope, LogonRequest, ServerEnvelope};

use crate::callbacks::RegistrierungsCallback;
use crate::command::SitzungsBefehl;
use crate::state::{SitzungsZustand, ZustandsEreignis};

/// Zustand und Kollaborateure einer laufenden Sitzung
pub(crate) struct SitzungsKern {
    zustand: SitzungsZustand,
    anmeldedaten: Anmeldedaten,
    protokoll: Arc<Mutex<Ereignisprotokoll>>,
    wiedergabe: WiedergabeEinreihung,
    registrierung: Arc<dyn RegistrierungsCallback>,
    zustand_tx: watch::Sender<SitzungsZustand>,
}

impl SitzungsKern {
    pub fn neu(
        anmeldedaten: Anmeldedaten,
        protokoll: Arc<Mutex<Ereignisprotokoll>>,
        wiedergabe: WiedergabeEinreihung,
        registrierung: Arc<dyn RegistrierungsCallback>,
        zustand_tx: watch::Sender<SitzungsZustand>,
    ) -> Self {
        Self {
            zustand: SitzungsZustand::Unverbunden,
            anmeldedaten,
            protokoll,
            wiedergabe,
            registrierung,
            zustand_tx,
        }
    }

    /// Aktueller Sitzungszustand
    pub fn zustand(&self) -> SitzungsZustand {
        self.zustand
    }

    /// Wendet ein Zustandsereignis an und publiziert den Folgezustand
    fn wechsle(&mut self, ereignis: ZustandsEreignis) {
        match self.zustand.uebergang(ereignis) {
            Some(neu) => {
                if neu != self.zustand {
                    trace!(von = %self.zustand, nach = %neu, "Zustandswechsel");
                }
                self.zustand = neu;
                self.zustand_tx.send_replace(neu);
            }
            None => {
                warn!(
                    zustand = %self.zustand,
                    ?ereignis,
                    "Unzulaessiges Zustandsereignis verworfen"
                );
            }
        }
    }

    /// Haengt einen System-Eintrag an das Ereignisprotokoll an
    fn logge(&self, inhalt: impl Into<String>) {
        self.protokoll.lock().system(inhalt);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Socket wurde geoeffnet: loggt den Aufbau und startet (falls die
    /// Anmeldedaten vollstaendig sind) genau einen Logon-Versuch
    pub fn geoeffnet(&mut self) -> Option<ClientEnvelope> {
        self.wechsle(ZustandsEreignis::Verbunden);
        self.logge("Connected to Rabbithole");
        self.logon_versuchen()
    }

    /// Socket wurde geschlossen: setzt die Authentifizierung zurueck
    pub fn getrennt(&mut self) {
        self.wechsle(ZustandsEreignis::Getrennt);
        self.logge("Disconnected from Rabbithole");
    }

    /// Transportfehler: geloggt, nicht fatal
    pub fn transportfehler(&mut self, fehler: &std::io::Error) {
        warn!(fehler = %fehler, "Transportfehler");
        self.logge(format!("Error: {}", fehler));
    }

    /// Versucht ein Logon, falls Zustand und Anmeldedaten es erlauben
    ///
    /// Gibt hoechstens einen Logon-Umschlag zurueck. Fehlende Anmeldedaten
    /// sind eine Vorbedingungsverletzung und landen nur im Protokoll.
    fn logon_versuchen(&mut self) -> Option<ClientEnvelope> {
        if self.zustand.ist_authentifiziert() || !self.zustand.kann_authentifizieren() {
            return None;
        }

        if !self.anmeldedaten.vollstaendig() {
            self.logge("Account key or IMEI not provided");
            return None;
        }

        let umschlag = ClientEnvelope::Logon(LogonRequest::from(&self.anmeldedaten));
        if let Ok(json) = umschlag.to_json() {
            self.logge(format!("Authenticating with payload: {}", json));
        }
        self.wechsle(ZustandsEreignis::LogonGesendet);
        Some(umschlag)
    }

    // -----------------------------------------------------------------------
    // Eingehende Rahmen
    // -----------------------------------------------------------------------

    /// Verarbeitet einen eingehenden rohen Rahmen
    ///
    /// Ein fehlerhafter Rahmen beendet die Sitzung nie; er wird geloggt und
    /// der naechste Rahmen verarbeitet.
    pub fn eingehend(&mut self, rahmen: &[u8]) {
        match ServerEnvelope::parse(rahmen) {
            Ok(Some(umschlag)) => self.umschlag_verarbeiten(umschlag),
            Ok(None) => {
                // Unbekannter Typ: Vorwaertskompatibilitaet, kein Fehler
                trace!("Unbekannter Umschlag-Typ ignoriert");
            }
            Err(e) => {
                warn!(fehler = %e, "Rahmen nicht dekodierbar, wird uebersprungen");
                self.logge(format!("Failed to decode message: {}", e));
            }
        }
    }

    fn umschlag_verarbeiten(&mut self, umschlag: ServerEnvelope) {
        match umschlag {
            ServerEnvelope::Logon(status) => {
                if status == "success" {
                    self.wechsle(ZustandsEreignis::LogonErfolg);
                    self.logge("Authenticated successfully");
                } else {
                    debug!(status = %status, "Logon abgelehnt");
                    self.wechsle(ZustandsEreignis::LogonFehlschlag);
                    self.logge("Authentication failed");
                }
            }

            ServerEnvelope::Message(text) => {
                self.protokoll.lock().anhaengen(ProtokollEintrag::neu(
                    Herkunft::Gegenstelle,
                    InhaltsTyp::Text,
                    text,
                ));
            }

            ServerEnvelope::Audio(clip_b64) => {
                if let Err(e) = self.wiedergabe.einreihen(clip_b64) {
                    warn!(fehler = %e, "Clip konnte nicht eingereiht werden");
                }
            }

            ServerEnvelope::Register(ergebnis) => {
                // Callback laeuft immer; den Zustand aendert erst das
                // erneute Einspielen der Anmeldedaten
                self.registrierung
                    .registriert(&ergebnis.imei, &ergebnis.account_key, &ergebnis.roh);
                self.logge(format!("Registered with data: {}", ergebnis.roh));
                self.wechsle(ZustandsEreignis::RegisterErgebnis);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Ausgehende Befehle
    // -----------------------------------------------------------------------

    /// Verarbeitet einen Befehl und gibt die zu sendenden Umschlaege zurueck
    ///
    /// Vorbedingungsverletzungen liefern eine leere Liste (Befehl wird
    /// fallen gelassen). `SprachnotizSenden` wird von der Steuerschleife
    /// zerlegt und erreicht den Kern nicht.
    pub async fn befehl(&mut self, befehl: SitzungsBefehl) -> Vec<ClientEnvelope> {
        match befehl {
            SitzungsBefehl::NachrichtSenden(text) => {
                if !self.zustand.ist_authentifiziert() {
                    debug!("NachrichtSenden ohne Authentifizierung verworfen");
                    return Vec::new();
                }
                let umschlag = ClientEnvelope::message(text);
                if let Ok(json) = umschlag.to_json() {
                    self.logge(format!("Sending message: {}", json));
                }
                vec![umschlag]
            }

            SitzungsBefehl::PttSenden { aktiv, bild } => {
                if !self.zustand.ist_authentifiziert() {
                    debug!("PttSenden ohne Authentifizierung verworfen");
                    return Vec::new();
                }
                self.logge(format!(
                    "Sending PTT with status {} {}",
                    aktiv,
                    if bild.is_empty() {
                        "without image"
                    } else {
                        "with an image"
                    }
                ));
                vec![ClientEnvelope::ptt(aktiv, bild)]
            }

            SitzungsBefehl::AudioSenden(clip) => {
                if !self.zustand.ist_authentifiziert() {
                    debug!("AudioSenden ohne Authentifizierung verworfen");
                    return Vec::new();
                }
                // Umkodierung laeuft asynchron; gesendet wird nur nach
                // erfolgreichem Abschluss
                match als_daten_url(clip).await {
                    Ok(daten_url) => {
                        self.logge("Sending audio");
                        vec![ClientEnvelope::Audio(daten_url)]
                    }
                    Err(e) => {
                        warn!(fehler = %e, "Audio-Clip verworfen");
                        self.logge(format!("Dropped audio clip: {}", e));
                        Vec::new()
                    }
                }
            }

            SitzungsBefehl::Registrieren(qr_b64) => {
                if self.zustand.ist_authentifiziert() || !self.zustand.kann_authentifizieren() {
                    debug!(zustand = %self.zustand, "Registrieren verworfen");
                    return Vec::new();
                }
                let umschlag = ClientEnvelope::Register(qr_b64);
                if let Ok(json) = umschlag.to_json() {
                    self.logge(format!("Registering: {}", json));
                }
                self.wechsle(ZustandsEreignis::RegisterGesendet);
                vec![umschlag]
            }

            SitzungsBefehl::AnmeldedatenSetzen(daten) => {
                self.anmeldedaten = daten;
                // Re-entrant: bei offenem Socket genau ein frischer Versuch
                self.logon_versuchen().into_iter().collect()
            }

            SitzungsBefehl::SprachnotizSenden { .. } => {
                debug!("SprachnotizSenden haette die Steuerschleife zerlegen muessen");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
