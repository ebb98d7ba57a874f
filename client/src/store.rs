//! Datei-gestuetzter Anmeldedaten-Speicher
//!
//! Persistiert IMEI, Account-Key und das rohe Registrierungs-JSON in einer
//! kleinen TOML-Datei neben der Konfiguration. Das rohe JSON bleibt beim
//! reinen Anmeldedaten-Update erhalten.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use rabbithole_core::{Anmeldedaten, RabbitHoleFehler, Result};
use rabbithole_engine::AnmeldedatenSpeicher;

/// Dateiformat des Speichers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SpeicherDatei {
    imei: String,
    account_key: String,
    /// Unveraendertes `data`-JSON der letzten Registrierungs-Antwort
    registrierung_roh: Option<String>,
}

/// Anmeldedaten-Speicher auf Basis einer TOML-Datei
pub struct DateiAnmeldedatenSpeicher {
    pfad: PathBuf,
}

impl DateiAnmeldedatenSpeicher {
    pub fn neu(pfad: impl Into<PathBuf>) -> Self {
        Self { pfad: pfad.into() }
    }

    fn lesen(&self) -> Result<Option<SpeicherDatei>> {
        match std::fs::read_to_string(&self.pfad) {
            Ok(inhalt) => {
                let datei: SpeicherDatei = toml::from_str(&inhalt).map_err(|e| {
                    RabbitHoleFehler::Konfiguration(format!(
                        "Anmeldedaten-Datei '{}' nicht lesbar: {}",
                        self.pfad.display(),
                        e
                    ))
                })?;
                Ok(Some(datei))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RabbitHoleFehler::Konfiguration(format!(
                "Anmeldedaten-Datei '{}' nicht lesbar: {}",
                self.pfad.display(),
                e
            ))),
        }
    }

    fn schreiben(&self, datei: &SpeicherDatei) -> Result<()> {
        let inhalt = toml::to_string_pretty(datei)
            .map_err(|e| RabbitHoleFehler::Intern(format!("TOML-Serialisierung: {}", e)))?;
        std::fs::write(&self.pfad, inhalt).map_err(|e| {
            RabbitHoleFehler::Konfiguration(format!(
                "Anmeldedaten-Datei '{}' nicht schreibbar: {}",
                self.pfad.display(),
                e
            ))
        })
    }
}

impl AnmeldedatenSpeicher for DateiAnmeldedatenSpeicher {
    fn laden(&self) -> Result<Option<Anmeldedaten>> {
        let Some(datei) = self.lesen()? else {
            return Ok(None);
        };
        let daten = Anmeldedaten::neu(datei.imei, datei.account_key);
        if daten.vollstaendig() {
            Ok(Some(daten))
        } else {
            Ok(None)
        }
    }

    fn speichern(&self, daten: &Anmeldedaten, roh_registrierung: Option<&str>) -> Result<()> {
        // Bestehendes Roh-JSON erhalten wenn nur die Anmeldedaten wechseln
        let bisher = self.lesen().unwrap_or_default().unwrap_or_default();
        let datei = SpeicherDatei {
            imei: daten.imei.clone(),
            account_key: daten.account_key.clone(),
            registrierung_roh: roh_registrierung
                .map(String::from)
                .or(bisher.registrierung_roh),
        };
        self.schreiben(&datei)
    }
}
