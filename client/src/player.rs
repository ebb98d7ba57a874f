//! Clip-Wiedergabe ueber einen externen Abspielbefehl
//!
//! Dekodiert den base64-Clip in eine temporaere WAV-Datei und startet den
//! konfigurierten Befehl (Standard: `aplay`). Das Prozess-Ende ist das
//! Abschluss-Signal fuer die Wiedergabe-Warteschlange.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

use rabbithole_audio::{AudioFehler, AudioResult, ClipPlayer};

/// Player der einen externen Befehl pro Clip startet
pub struct KommandoPlayer {
    befehl: String,
}

impl KommandoPlayer {
    pub fn neu(befehl: impl Into<String>) -> Self {
        Self {
            befehl: befehl.into(),
        }
    }
}

#[async_trait]
impl ClipPlayer for KommandoPlayer {
    async fn abspielen(&self, clip_b64: &str) -> AudioResult<()> {
        let bytes = BASE64
            .decode(clip_b64)
            .map_err(|e| AudioFehler::Wiedergabe(format!("Clip ist kein Base64: {}", e)))?;

        let pfad = std::env::temp_dir().join(format!("rabbithole-{}.wav", Uuid::new_v4()));
        tokio::fs::write(&pfad, &bytes).await?;

        let ergebnis = tokio::process::Command::new(&self.befehl)
            .arg(&pfad)
            .status()
            .await;

        // Temporaere Datei unabhaengig vom Ausgang entfernen
        let _ = tokio::fs::remove_file(&pfad).await;

        let status = ergebnis.map_err(|e| {
            AudioFehler::Wiedergabe(format!("'{}' liess sich nicht starten: {}", self.befehl, e))
        })?;

        if !status.success() {
            return Err(AudioFehler::Wiedergabe(format!(
                "'{}' beendet mit {}",
                self.befehl, status
            )));
        }
        Ok(())
    }
}
