//! WAV-Erkennung und Daten-URL-Kodierung
//!
//! Ausgehende Clips werden vor dem Senden in eine selbstbeschreibende
//! Daten-URL umkodiert (`data:audio/wav;base64,<payload>`). Nur Clips die
//! als WAV erkannt werden duerfen gesendet werden; alles andere wird vom
//! Aufrufer verworfen und geloggt.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{AudioFehler, AudioResult};

/// Praefix der ausgehenden Audio-Daten-URL
pub const WAV_DATEN_URL_PREFIX: &str = "data:audio/wav;base64,";

/// Prueft ob die Bytes ein RIFF/WAVE-Container sind
///
/// RIFF-Header: Bytes 0..4 = "RIFF", Bytes 8..12 = "WAVE".
pub fn ist_wav(daten: &[u8]) -> bool {
    daten.len() >= 12 && &daten[0..4] == b"RIFF" && &daten[8..12] == b"WAVE"
}

/// Kodiert einen WAV-Clip asynchron in eine Daten-URL
///
/// Die Base64-Kodierung laeuft auf dem Blocking-Pool, damit grosse Clips
/// die Steuerschleife nicht aufhalten. Clips die nicht als WAV erkannt
/// werden, werden mit `UnbekanntesFormat` abgelehnt.
pub async fn als_daten_url(clip: Vec<u8>) -> AudioResult<String> {
    if !ist_wav(&clip) {
        return Err(AudioFehler::UnbekanntesFormat(format!(
            "Clip ({} Bytes) ist kein RIFF/WAVE-Container",
            clip.len()
        )));
    }

    let payload = tokio::task::spawn_blocking(move || BASE64.encode(&clip))
        .await
        .map_err(|e| AudioFehler::Wiedergabe(format!("Kodier-Task abgebrochen: {}", e)))?;

    Ok(format!("{}{}", WAV_DATEN_URL_PREFIX, payload))
}
