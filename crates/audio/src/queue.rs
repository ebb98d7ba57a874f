//! Wiedergabe-Warteschlange fuer eingehende Sprach-Clips
//!
//! Strikte FIFO: `einreihen` haengt an, ein einzelner Treiber-Task nimmt
//! den Kopf nur im Leerlauf, spielt ihn vollstaendig ab und rueckt nach
//! einer kurzen Pflicht-Pause weiter. Es spielt nie mehr als ein Clip
//! gleichzeitig; Clips werden genau einmal in Ankunftsreihenfolge gespielt.
//! Wiedergabefehler zaehlen als Abschluss, damit die Warteschlange nie
//! haengen bleibt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{AudioFehler, AudioResult};

/// Pflicht-Pause nach jedem abgeschlossenen Clip
pub const STANDARD_PAUSE: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// ClipPlayer
// ---------------------------------------------------------------------------

/// Externer Kollaborateur: spielt einen base64-kodierten Clip vollstaendig ab
///
/// `abspielen` kehrt erst zurueck wenn die Wiedergabe abgeschlossen oder
/// fehlgeschlagen ist – das Abschluss-Signal IST die Rueckkehr.
#[async_trait]
pub trait ClipPlayer: Send + Sync {
    async fn abspielen(&self, clip_b64: &str) -> AudioResult<()>;
}

// ---------------------------------------------------------------------------
// WiedergabeEintrag
// ---------------------------------------------------------------------------

/// Ein wartender Clip, eindeutig pro Ankunft
#[derive(Debug, Clone)]
pub struct WiedergabeEintrag {
    pub id: Uuid,
    pub clip_b64: String,
}

impl WiedergabeEintrag {
    fn neu(clip_b64: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            clip_b64,
        }
    }
}

// ---------------------------------------------------------------------------
// WiedergabeQueue
// ---------------------------------------------------------------------------

/// Klonbare Einreih-Seite der Warteschlange
///
/// Sitzungen halten nur diese Seite; die Queue selbst (und damit das
/// Stoppen) gehoert der Engine.
#[derive(Clone)]
pub struct WiedergabeEinreihung {
    tx: mpsc::UnboundedSender<WiedergabeEintrag>,
}

impl WiedergabeEinreihung {
    /// Reiht einen base64-kodierten Clip am Ende ein
    pub fn einreihen(&self, clip_b64: impl Into<String>) -> AudioResult<Uuid> {
        let eintrag = WiedergabeEintrag::neu(clip_b64.into());
        let id = eintrag.id;
        self.tx
            .send(eintrag)
            .map_err(|_| AudioFehler::WarteschlangeGeschlossen)?;
        Ok(id)
    }
}

/// Wiedergabe-Warteschlange mit eigenem Treiber-Task
///
/// Lebt auf Engine-Ebene und ueberdauert Sitzungs-Neuaufbauten: ein
/// Verbindungsabbruch verwirft keine bereits angekommenen Clips.
pub struct WiedergabeQueue {
    tx: mpsc::UnboundedSender<WiedergabeEintrag>,
    treiber: JoinHandle<()>,
}

impl WiedergabeQueue {
    /// Startet die Warteschlange mit dem gegebenen Player
    pub fn starten(player: Arc<dyn ClipPlayer>, pause: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let treiber = tokio::spawn(treiber_schleife(player, rx, pause));
        Self { tx, treiber }
    }

    /// Gibt eine klonbare Einreih-Seite zurueck
    pub fn einreihung(&self) -> WiedergabeEinreihung {
        WiedergabeEinreihung {
            tx: self.tx.clone(),
        }
    }

    /// Reiht einen base64-kodierten Clip am Ende ein
    pub fn einreihen(&self, clip_b64: impl Into<String>) -> AudioResult<Uuid> {
        self.einreihung().einreihen(clip_b64)
    }

    /// Spielt die restlichen Clips zu Ende und beendet den Treiber
    ///
    /// Wartet bis auch alle ueber [`WiedergabeQueue::einreihung`]
    /// ausgegebenen Einreih-Seiten fallen gelassen wurden.
    pub async fn stoppen(self) {
        drop(self.tx);
        let _ = self.treiber.await;
    }

    /// Bricht den Treiber sofort ab (wartende Clips verfallen)
    pub fn abbrechen(self) {
        self.treiber.abort();
    }
}

/// Treiber-Schleife: genau ein Clip gleichzeitig, in Ankunftsreihenfolge
async fn treiber_schleife(
    player: Arc<dyn ClipPlayer>,
    mut rx: mpsc::UnboundedReceiver<WiedergabeEintrag>,
    pause: Duration,
) {
    debug!("Wiedergabe-Treiber gestartet");

    while let Some(eintrag) = rx.recv().await {
        trace!(id = %eintrag.id, "Wiedergabe beginnt");

        if let Err(e) = player.abspielen(&eintrag.clip_b64).await {
            // Fehler zaehlt als Abschluss – der naechste Clip rueckt nach
            warn!(id = %eintrag.id, fehler = %e, "Wiedergabefehler, Clip wird uebersprungen");
        }

        tokio::time::sleep(pause).await;
    }

    debug!("Wiedergabe-Treiber beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
