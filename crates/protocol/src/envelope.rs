//! Rabbit-Hole-Umschlaege (Envelopes)
//!
//! Jede Nachricht auf dem Draht ist ein JSON-Objekt der Form
//! `{ "type": ..., "data": ... }`. Die `data`-Form haengt vom `type` ab
//! und unterscheidet sich je Richtung (z.B. `logon` traegt ausgehend die
//! Anmeldedaten, eingehend nur den Status-String), daher zwei Enums:
//! `ClientEnvelope` (Client -> Server) und `ServerEnvelope` (Server -> Client).
//!
//! ## Design
//! - Umschlaege sind unabhaengig dekodierbar; kein Umschlag haengt vom
//!   Schema eines vorherigen ab
//! - Unbekannte `type`-Werte werden beim Parsen toleriert (`Ok(None)`),
//!   damit neue Servernachrichten alte Clients nicht brechen
//! - Das `data`-Objekt der Registrierungs-Antwort wird byte-genau als
//!   Roh-JSON weitergereicht (externe Persistenz erwartet das Original)

use rabbithole_core::Anmeldedaten;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Dekodierfehler eines einzelnen Rahmens
///
/// Niemals fatal: der Dispatcher loggt den Fehler und verarbeitet den
/// naechsten Rahmen.
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    #[error("Rahmen ist kein gueltiges JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unerwartete Payload fuer '{typ}': {grund}")]
    Payload { typ: String, grund: String },
}

// ---------------------------------------------------------------------------
// Ausgehende Umschlaege (Client -> Server)
// ---------------------------------------------------------------------------

/// Logon-Anfrage mit den Anmeldedaten des Geraets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogonRequest {
    /// Geraete-Kennung
    pub imei: String,
    /// Account-Schluessel
    #[serde(rename = "accountKey")]
    pub account_key: String,
}

/// Push-to-Talk-Signal
///
/// `active=true` oeffnet das Sendefenster, `active=false` schliesst es.
/// `image` traegt optional eine inline angehaengte JPEG-Daten-URL,
/// leerer String = kein Anhang.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PttSignal {
    pub active: bool,
    pub image: String,
}

/// Alle Nachrichten die der Client sendet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientEnvelope {
    /// Authentifizierungs-Handshake
    Logon(LogonRequest),
    /// Chat-Nachricht (Anzeigetext)
    Message(String),
    /// Push-to-Talk-Signal
    Ptt(PttSignal),
    /// Audio-Clip als WAV-Daten-URL
    Audio(String),
    /// Registrierung mit base64-kodierter QR-Payload
    Register(String),
}

impl From<&Anmeldedaten> for LogonRequest {
    fn from(daten: &Anmeldedaten) -> Self {
        Self {
            imei: daten.imei.clone(),
            account_key: daten.account_key.clone(),
        }
    }
}

impl ClientEnvelope {
    /// Erstellt eine Logon-Anfrage
    pub fn logon(imei: impl Into<String>, account_key: impl Into<String>) -> Self {
        Self::Logon(LogonRequest {
            imei: imei.into(),
            account_key: account_key.into(),
        })
    }

    /// Erstellt eine Chat-Nachricht
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// Erstellt ein PTT-Signal
    pub fn ptt(active: bool, image: impl Into<String>) -> Self {
        Self::Ptt(PttSignal {
            active,
            image: image.into(),
        })
    }

    /// Serialisiert den Umschlag als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Eingehende Umschlaege (Server -> Client)
// ---------------------------------------------------------------------------

/// Ergebnis der Registrierung
///
/// Der Server tauscht die QR-Payload gegen neue Anmeldedaten. `roh` ist
/// das unveraenderte `data`-JSON fuer die externe Persistenz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResult {
    pub imei: String,
    pub account_key: String,
    pub roh: String,
}

/// Alle Nachrichten die der Server sendet
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEnvelope {
    /// Logon-Ergebnis: `"success"` oder ein beliebiger Fehlertext
    Logon(String),
    /// Chat-Nachricht der Gegenstelle (Anzeigetext)
    Message(String),
    /// Synthetisierter Sprach-Clip, base64-kodiert
    Audio(String),
    /// Registrierungs-Ergebnis
    Register(RegisterResult),
}

/// Roh-Umschlag: nur der Typ-Tag wird gelesen, `data` bleibt unangetastet
#[derive(Deserialize)]
struct RawEnvelope<'a> {
    #[serde(rename = "type")]
    typ: String,
    #[serde(borrow)]
    data: &'a RawValue,
}

/// `data`-Form eines eingehenden Audio-Umschlags
#[derive(Deserialize)]
struct AudioDaten {
    audio: String,
}

/// `data`-Form eines eingehenden Register-Umschlags (weitere Felder werden
/// toleriert und nur ueber `roh` weitergereicht)
#[derive(Deserialize)]
struct RegisterDaten {
    imei: String,
    #[serde(rename = "accountKey")]
    account_key: String,
}

impl ServerEnvelope {
    /// Parst einen eingehenden Rahmen
    ///
    /// - `Ok(Some(_))` – bekannter Umschlag
    /// - `Ok(None)` – unbekannter `type` (wird stillschweigend ignoriert)
    /// - `Err(_)` – kein JSON oder falsche `data`-Form (Rahmen ueberspringen)
    pub fn parse(rahmen: &[u8]) -> Result<Option<Self>, ProtokollFehler> {
        let roh: RawEnvelope<'_> = serde_json::from_slice(rahmen)?;
        let data = roh.data.get();

        let umschlag = match roh.typ.as_str() {
            "logon" => {
                let status: String =
                    serde_json::from_str(data).map_err(|e| ProtokollFehler::Payload {
                        typ: roh.typ.clone(),
                        grund: e.to_string(),
                    })?;
                Self::Logon(status)
            }
            "message" => {
                let text: String =
                    serde_json::from_str(data).map_err(|e| ProtokollFehler::Payload {
                        typ: roh.typ.clone(),
                        grund: e.to_string(),
                    })?;
                Self::Message(text)
            }
            "audio" => {
                let daten: AudioDaten =
                    serde_json::from_str(data).map_err(|e| ProtokollFehler::Payload {
                        typ: roh.typ.clone(),
                        grund: e.to_string(),
                    })?;
                Self::Audio(daten.audio)
            }
            "register" => {
                let daten: RegisterDaten =
                    serde_json::from_str(data).map_err(|e| ProtokollFehler::Payload {
                        typ: roh.typ.clone(),
                        grund: e.to_string(),
                    })?;
                Self::Register(RegisterResult {
                    imei: daten.imei,
                    account_key: daten.account_key,
                    roh: data.to_string(),
                })
            }
            // Unbekannte Typen ignorieren (Vorwaertskompatibilitaet)
            _ => return Ok(None),
        };

        Ok(Some(umschlag))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
