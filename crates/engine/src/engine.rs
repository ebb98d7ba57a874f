//! RabbitHole – Engine-Fassade ueber Sitzungen, Protokoll und Wiedergabe
//!
//! Haelt die sitzungsuebergreifenden Teile (Ereignisprotokoll,
//! Wiedergabe-Warteschlange, Anmeldedaten) und verwaltet die jeweils eine
//! lebende Sitzung. Ein Endpunkt- oder Anmeldedaten-Wechsel laeuft ueber
//! `umkonfigurieren`: deterministischer Abbau der alten Sitzung, dann
//! Neuaufbau – nie zwei lebende Sockets.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use rabbithole_audio::{ClipPlayer, WiedergabeQueue, STANDARD_PAUSE};
use rabbithole_core::{Anmeldedaten, Ereignisprotokoll, ProtokollEintrag, Result};

use crate::callbacks::{AnmeldedatenSpeicher, RegistrierungsCallback};
use crate::session::{Sitzung, SitzungsGriff, SitzungsUmgebung};
use crate::state::SitzungsZustand;

/// Konfiguration der Engine
#[derive(Debug, Clone)]
pub struct RabbitHoleKonfig {
    /// Verbindungsziel (`host:port`); None oder leer = kein Aufbau
    pub endpoint: Option<String>,
    /// Pflicht-Pause der Wiedergabe-Warteschlange nach jedem Clip
    pub wiedergabe_pause: Duration,
}

impl Default for RabbitHoleKonfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            wiedergabe_pause: STANDARD_PAUSE,
        }
    }
}

/// Die Engine: genau eine lebende Sitzung, sitzungsuebergreifender Rest
pub struct RabbitHole {
    endpoint: Option<String>,
    anmeldedaten: Anmeldedaten,
    protokoll: Arc<Mutex<Ereignisprotokoll>>,
    wiedergabe: WiedergabeQueue,
    registrierung: Arc<dyn RegistrierungsCallback>,
    speicher: Option<Arc<dyn AnmeldedatenSpeicher>>,
    sitzung: Option<Sitzung>,
}

impl RabbitHole {
    /// Erstellt die Engine
    ///
    /// Sind ein Speicher und darin Anmeldedaten vorhanden, werden diese
    /// als Startwert geladen.
    pub fn neu(
        konfig: RabbitHoleKonfig,
        player: Arc<dyn ClipPlayer>,
        registrierung: Arc<dyn RegistrierungsCallback>,
        speicher: Option<Arc<dyn AnmeldedatenSpeicher>>,
    ) -> Self {
        let anmeldedaten = match speicher.as_ref().map(|s| s.laden()) {
            Some(Ok(Some(daten))) => daten,
            Some(Err(e)) => {
                warn!(fehler = %e, "Anmeldedaten konnten nicht geladen werden");
                Anmeldedaten::default()
            }
            _ => Anmeldedaten::default(),
        };

        Self {
            endpoint: konfig.endpoint,
            anmeldedaten,
            protokoll: Arc::new(Mutex::new(Ereignisprotokoll::neu())),
            wiedergabe: WiedergabeQueue::starten(player, konfig.wiedergabe_pause),
            registrierung,
            speicher,
            sitzung: None,
        }
    }

    fn umgebung(&self) -> SitzungsUmgebung {
        SitzungsUmgebung {
            anmeldedaten: self.anmeldedaten.clone(),
            protokoll: self.protokoll.clone(),
            wiedergabe: self.wiedergabe.einreihung(),
            registrierung: self.registrierung.clone(),
        }
    }

    /// Baut die Verbindung zum konfigurierten Endpunkt auf
    ///
    /// Ohne (oder mit leerem) Endpunkt ist der Aufruf ein No-op. Eine
    /// bestehende Sitzung wird vorher deterministisch abgebaut.
    pub async fn verbinden(&mut self) -> Result<()> {
        let Some(endpoint) = self
            .endpoint
            .clone()
            .filter(|e| !e.is_empty())
        else {
            debug!("Kein Endpunkt konfiguriert, Verbindungsaufbau uebersprungen");
            return Ok(());
        };

        // Garantiert: Abbau vor Neuaufbau, nie zwei lebende Sockets
        self.trennen().await;

        let sitzung = Sitzung::verbinden(&endpoint, self.umgebung()).await?;
        self.sitzung = Some(sitzung);
        Ok(())
    }

    /// Wechselt den Endpunkt und baut die Sitzung neu auf
    ///
    /// Die Anmeldedaten bleiben unveraendert. Auch hier: Abbau vor
    /// Neuaufbau.
    pub async fn endpunkt_setzen(&mut self, endpoint: Option<String>) -> Result<()> {
        self.trennen().await;
        self.endpoint = endpoint;
        self.verbinden().await
    }

    /// Tauscht Endpunkt und Anmeldedaten und baut die Sitzung neu auf
    pub async fn umkonfigurieren(
        &mut self,
        endpoint: Option<String>,
        anmeldedaten: Anmeldedaten,
    ) -> Result<()> {
        self.trennen().await;
        self.endpoint = endpoint;
        self.anmeldedaten_merken(anmeldedaten);
        self.verbinden().await
    }

    /// Spielt neue Anmeldedaten ein
    ///
    /// Persistiert (falls ein Speicher vorhanden ist) und reicht die Daten
    /// in eine laufende Sitzung weiter, was dort bei offenem Socket genau
    /// einen frischen Logon-Versuch ausloest.
    pub async fn anmeldedaten_setzen(&mut self, daten: Anmeldedaten) -> Result<()> {
        self.anmeldedaten_merken(daten.clone());
        if let Some(sitzung) = &self.sitzung {
            sitzung.griff().anmeldedaten_setzen(daten).await?;
        }
        Ok(())
    }

    fn anmeldedaten_merken(&mut self, daten: Anmeldedaten) {
        if let Some(speicher) = &self.speicher {
            if let Err(e) = speicher.speichern(&daten, None) {
                warn!(fehler = %e, "Anmeldedaten konnten nicht gespeichert werden");
            }
        }
        self.anmeldedaten = daten;
    }

    /// Baut die laufende Sitzung ab (idempotent)
    pub async fn trennen(&mut self) {
        if let Some(mut sitzung) = self.sitzung.take() {
            sitzung.beenden().await;
        }
    }

    /// Griff auf die laufende Sitzung, falls vorhanden
    pub fn griff(&self) -> Option<SitzungsGriff> {
        self.sitzung.as_ref().map(|s| s.griff())
    }

    /// Aktueller Sitzungszustand (Unverbunden ohne Sitzung)
    pub fn zustand(&self) -> SitzungsZustand {
        self.sitzung
            .as_ref()
            .map(|s| s.zustand())
            .unwrap_or(SitzungsZustand::Unverbunden)
    }

    /// Schnappschuss des Ereignisprotokolls
    pub fn protokoll(&self) -> Vec<ProtokollEintrag> {
        self.protokoll.lock().schnappschuss()
    }

    /// Beendet die Engine: Sitzung abbauen, restliche Clips ausspielen
    pub async fn beenden(mut self) {
        self.trennen().await;
        self.wiedergabe.stoppen().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::VerwerfenderCallback;
    use async_trait::async_trait;
    use rabbithole_audio::AudioResult;

    struct StummerPlayer;

    #[async_trait]
    impl ClipPlayer for StummerPlayer {
        async fn abspielen(&self, _clip_b64: &str) -> AudioResult<()> {
            Ok(())
        }
    }

    fn engine(endpoint: Option<String>) -> RabbitHole {
        RabbitHole::neu(
            RabbitHoleKonfig {
                endpoint,
                wiedergabe_pause: Duration::ZERO,
            },
            Arc::new(StummerPlayer),
            Arc::new(VerwerfenderCallback),
            None,
        )
    }

    #[tokio::test]
    async fn verbinden_ohne_endpunkt_ist_noop() {
        let mut engine = engine(None);
        engine.verbinden().await.unwrap();
        assert!(engine.griff().is_none());
        assert_eq!(engine.zustand(), SitzungsZustand::Unverbunden);
    }

    #[tokio::test]
    async fn verbinden_mit_leerem_endpunkt_ist_noop() {
        let mut engine = engine(Some(String::new()));
        engine.verbinden().await.unwrap();
        assert!(engine.griff().is_none());
    }

    #[tokio::test]
    async fn trennen_ohne_sitzung_ist_idempotent() {
        let mut engine = engine(None);
        engine.trennen().await;
        engine.trennen().await;
        assert_eq!(engine.zustand(), SitzungsZustand::Unverbunden);
    }

    #[tokio::test]
    async fn umkonfigurieren_merkt_anmeldedaten_ohne_endpunkt() {
        let mut engine = engine(None);
        engine
            .umkonfigurieren(None, Anmeldedaten::neu("123", "abc"))
            .await
            .unwrap();
        assert_eq!(engine.anmeldedaten, Anmeldedaten::neu("123", "abc"));
        assert!(engine.griff().is_none());
    }

    #[tokio::test]
    async fn beenden_spielt_warteschlange_aus() {
        let engine = engine(None);
        engine.wiedergabe.einreihen("UklGRg==").unwrap();
        engine.beenden().await;
    }
}
