//! Rabbit-Hole Begleit-Client – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und faehrt eine
//! kleine Kommandoschleife ueber stdin, die die Engine-Operationen
//! ausloest. Alles Sichtbare laeuft ueber das Ereignisprotokoll (`/log`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use rabbithole_client::{ClientConfig, DateiAnmeldedatenSpeicher, KommandoPlayer};
use rabbithole_core::Anmeldedaten;
use rabbithole_engine::{
    AnmeldedatenSpeicher, RabbitHole, RabbitHoleKonfig, RegistrierungsCallback,
};
use rabbithole_observability::logging_initialisieren;

/// Callback: persistiert neue Anmeldedaten und meldet sie der Hauptschleife,
/// die sie wieder in die Engine einspielt (und damit den frischen Logon
/// ausloest)
struct SpeicherCallback {
    speicher: Arc<DateiAnmeldedatenSpeicher>,
    tx: mpsc::UnboundedSender<Anmeldedaten>,
}

impl RegistrierungsCallback for SpeicherCallback {
    fn registriert(&self, imei: &str, account_key: &str, roh: &str) {
        let daten = Anmeldedaten::neu(imei, account_key);
        if let Err(e) = self.speicher.speichern(&daten, Some(roh)) {
            tracing::warn!(fehler = %e, "Registrierung konnte nicht gespeichert werden");
        }
        let _ = self.tx.send(daten);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("RH_CONFIG").unwrap_or_else(|_| "client.toml".into());
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Rabbit-Hole-Client wird initialisiert"
    );

    let speicher = Arc::new(DateiAnmeldedatenSpeicher::neu(
        &config.verbindung.anmeldedaten_datei,
    ));
    let player = Arc::new(KommandoPlayer::neu(&config.audio.abspielbefehl));

    let (registrierung_tx, mut registrierung_rx) = mpsc::unbounded_channel();
    let callback = Arc::new(SpeicherCallback {
        speicher: speicher.clone(),
        tx: registrierung_tx,
    });

    let mut engine = RabbitHole::neu(
        RabbitHoleKonfig {
            endpoint: Some(config.verbindung.endpoint.clone()).filter(|e| !e.is_empty()),
            wiedergabe_pause: Duration::from_millis(config.audio.wiedergabe_pause_ms),
        },
        player,
        callback,
        Some(speicher),
    );

    if let Err(e) = engine.verbinden().await {
        tracing::warn!(fehler = %e, "Verbindungsaufbau beim Start fehlgeschlagen");
    }

    hilfe_anzeigen();

    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            zeile = zeilen.next_line() => {
                let Some(zeile) = zeile? else { break };
                if !eingabe_verarbeiten(&mut engine, zeile.trim()).await {
                    break;
                }
            }

            // Frisch registrierte Anmeldedaten wieder einspielen
            Some(daten) = registrierung_rx.recv() => {
                tracing::info!(imei = %daten.imei, "Registrierte Anmeldedaten werden eingespielt");
                if let Err(e) = engine.anmeldedaten_setzen(daten).await {
                    tracing::warn!(fehler = %e, "Anmeldedaten konnten nicht eingespielt werden");
                }
            }
        }
    }

    engine.beenden().await;
    Ok(())
}

fn hilfe_anzeigen() {
    println!("Rabbit-Hole-Client. Befehle:");
    println!("  /verbinden <host:port>        Verbindung (neu) aufbauen");
    println!("  /trennen                      Verbindung abbauen");
    println!("  /anmeldung <imei> <key>       Anmeldedaten setzen");
    println!("  /register <payload-datei>     Registrierung mit QR-Payload-Datei");
    println!("  /msg <text>                   Chat-Nachricht senden");
    println!("  /ptt an|aus [jpeg-datei]      PTT-Signal senden");
    println!("  /audio <wav-datei>            WAV-Clip senden");
    println!("  /notiz <wav-datei> [jpeg]     Sprachnotiz (PTT + Clip + PTT)");
    println!("  /status                       Sitzungszustand anzeigen");
    println!("  /log                          Ereignisprotokoll anzeigen");
    println!("  /quit                         Beenden");
}

/// Verarbeitet eine Eingabezeile; `false` beendet die Hauptschleife
async fn eingabe_verarbeiten(engine: &mut RabbitHole, zeile: &str) -> bool {
    if zeile.is_empty() {
        return true;
    }

    let (befehl, rest) = zeile.split_once(' ').unwrap_or((zeile, ""));
    let rest = rest.trim();

    let ergebnis = match befehl {
        "/quit" => return false,
        "/hilfe" => {
            hilfe_anzeigen();
            Ok(())
        }
        "/status" => {
            println!("Zustand: {}", engine.zustand());
            Ok(())
        }
        "/log" => {
            for eintrag in engine.protokoll() {
                println!("[{}] {}", eintrag.zeitpunkt.format("%H:%M:%S"), eintrag.inhalt);
            }
            Ok(())
        }
        "/verbinden" => {
            if rest.is_empty() {
                engine.verbinden().await
            } else {
                engine.endpunkt_setzen(Some(rest.to_string())).await
            }
        }
        "/trennen" => {
            engine.trennen().await;
            Ok(())
        }
        "/anmeldung" => match rest.split_once(' ') {
            Some((imei, key)) => {
                engine
                    .anmeldedaten_setzen(Anmeldedaten::neu(imei.trim(), key.trim()))
                    .await
            }
            None => {
                println!("Verwendung: /anmeldung <imei> <key>");
                Ok(())
            }
        },
        "/register" => match datei_als_b64(rest).await {
            Ok(payload) => mit_griff(engine, |g| async move { g.registrieren(payload).await }).await,
            Err(e) => {
                println!("Payload-Datei nicht lesbar: {}", e);
                Ok(())
            }
        },
        "/msg" => {
            let text = rest.to_string();
            mit_griff(engine, |g| async move { g.nachricht_senden(text).await }).await
        }
        "/ptt" => {
            let (modus, bild_datei) = rest.split_once(' ').unwrap_or((rest, ""));
            let aktiv = modus == "an";
            match bild_anhang(bild_datei.trim()).await {
                Ok(bild) => {
                    mit_griff(engine, |g| async move { g.ptt_senden(aktiv, bild).await }).await
                }
                Err(e) => {
                    println!("Bilddatei nicht lesbar: {}", e);
                    Ok(())
                }
            }
        }
        "/audio" => match tokio::fs::read(rest).await {
            Ok(clip) => mit_griff(engine, |g| async move { g.audio_senden(clip).await }).await,
            Err(e) => {
                println!("WAV-Datei nicht lesbar: {}", e);
                Ok(())
            }
        },
        "/notiz" => {
            let (wav_datei, bild_datei) = rest.split_once(' ').unwrap_or((rest, ""));
            match tokio::fs::read(wav_datei.trim()).await {
                Ok(clip) => match bild_anhang(bild_datei.trim()).await {
                    Ok(bild) => {
                        mit_griff(engine, |g| async move { g.sprachnotiz_senden(clip, bild).await })
                            .await
                    }
                    Err(e) => {
                        println!("Bilddatei nicht lesbar: {}", e);
                        Ok(())
                    }
                },
                Err(e) => {
                    println!("WAV-Datei nicht lesbar: {}", e);
                    Ok(())
                }
            }
        }
        unbekannt => {
            println!("Unbekannter Befehl: {} (/hilfe fuer die Liste)", unbekannt);
            Ok(())
        }
    };

    if let Err(e) = ergebnis {
        println!("Fehler: {}", e);
    }
    true
}

/// Fuehrt eine Operation auf dem Sitzungs-Griff aus, falls eine Sitzung lebt
async fn mit_griff<F, Fut>(engine: &RabbitHole, op: F) -> rabbithole_core::Result<()>
where
    F: FnOnce(rabbithole_engine::SitzungsGriff) -> Fut,
    Fut: std::future::Future<Output = rabbithole_core::Result<()>>,
{
    match engine.griff() {
        Some(griff) => op(griff).await,
        None => {
            println!("Keine Verbindung (erst /verbinden)");
            Ok(())
        }
    }
}

/// Liest eine Datei und gibt ihren Inhalt base64-kodiert zurueck
async fn datei_als_b64(pfad: &str) -> std::io::Result<String> {
    let bytes = tokio::fs::read(pfad).await?;
    Ok(BASE64.encode(bytes))
}

/// Liest eine optionale JPEG-Datei als inline Daten-URL (leer = kein Anhang)
async fn bild_anhang(pfad: &str) -> std::io::Result<String> {
    if pfad.is_empty() {
        return Ok(String::new());
    }
    let bytes = tokio::fs::read(pfad).await?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)))
}
