//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist (dann ohne Endpunkt, bis `/verbinden` aufgerufen wird).

use serde::{Deserialize, Serialize};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Verbindungs-Einstellungen
    pub verbindung: VerbindungsEinstellungen,
    /// Audio-Einstellungen
    pub audio: AudioEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Verbindungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// Endpunkt des Rabbit-Hole-Servers (`host:port`); leer = kein
    /// automatischer Aufbau beim Start
    pub endpoint: String,
    /// Pfad der Anmeldedaten-Datei
    pub anmeldedaten_datei: String,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            anmeldedaten_datei: "anmeldedaten.toml".into(),
        }
    }
}

/// Audio-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Externer Abspielbefehl; bekommt den Pfad der WAV-Datei als Argument
    pub abspielbefehl: String,
    /// Pflicht-Pause nach jedem abgespielten Clip in Millisekunden
    pub wiedergabe_pause_ms: u64,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            abspielbefehl: "aplay".into(),
            wiedergabe_pause_ms: 200,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.verbindung.endpoint, "");
        assert_eq!(cfg.verbindung.anmeldedaten_datei, "anmeldedaten.toml");
        assert_eq!(cfg.audio.wiedergabe_pause_ms, 200);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [verbindung]
            endpoint = "rabbithole.example:9987"

            [audio]
            abspielbefehl = "paplay"
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.verbindung.endpoint, "rabbithole.example:9987");
        assert_eq!(cfg.audio.abspielbefehl, "paplay");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.audio.wiedergabe_pause_ms, 200);
        assert_eq!(cfg.logging.format, "text");
    }
}
