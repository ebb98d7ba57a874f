//! Sitzung – Verbindungs-Lifecycle und Steuerschleife
//!
//! Jede Sitzung besitzt genau einen tokio-Task (die Steuerschleife), der
//! den Socket, die Zustandsmaschine und das Senden exklusiv haelt. Alle
//! Socket-, Timer- und Befehls-Ereignisse laufen als `select!`-Zweige in
//! diese eine Schleife; es gibt keine nebenlaeufige Mutation des
//! Sitzungszustands.
//!
//! ## Lifecycle
//! 1. `verbinden()` / `starten()` – Socket aufbauen, Steuerschleife spawnen
//! 2. Befehle ueber den [`SitzungsGriff`] einreichen
//! 3. `beenden()` – Shutdown signalisieren und auf das Task-Ende warten
//!
//! `beenden()` ist idempotent und deterministisch: nach der Rueckkehr kann
//! die alte Sitzung keine Ereignisse mehr zustellen, eine Nachfolgerin
//! kann gefahrlos aufgebaut werden.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use rabbithole_audio::WiedergabeEinreihung;
use rabbithole_core::{Anmeldedaten, Ereignisprotokoll, RabbitHoleFehler, Result};
use rabbithole_protocol::FrameCodec;

use crate::callbacks::RegistrierungsCallback;
use crate::command::SitzungsBefehl;
use crate::dispatcher::SitzungsKern;
use crate::state::SitzungsZustand;

/// Nachlauf zwischen Audio-Clip und schliessendem PTT-Signal einer
/// Sprachnotiz
pub const SPRACHNOTIZ_NACHLAUF: Duration = Duration::from_millis(500);

/// Kapazitaet des Befehlskanals
const BEFEHL_KAPAZITAET: usize = 64;

// ---------------------------------------------------------------------------
// SitzungsUmgebung
// ---------------------------------------------------------------------------

/// Kollaborateure die eine Sitzung von der Engine erhaelt
///
/// Protokoll und Wiedergabe ueberdauern die einzelne Sitzung; die
/// Anmeldedaten sind der Startwert fuer den Auto-Logon.
#[derive(Clone)]
pub struct SitzungsUmgebung {
    pub anmeldedaten: Anmeldedaten,
    pub protokoll: Arc<Mutex<Ereignisprotokoll>>,
    pub wiedergabe: WiedergabeEinreihung,
    pub registrierung: Arc<dyn RegistrierungsCallback>,
}

// ---------------------------------------------------------------------------
// SitzungsGriff
// ---------------------------------------------------------------------------

/// Klonbarer Zugriff auf eine laufende Sitzung
///
/// Alle Operationen reichen nur einen Befehl in die Steuerschleife ein;
/// die Vorbedingungen prueft der Kern dort. Ein Fehler bedeutet, dass die
/// Sitzung bereits beendet ist.
#[derive(Clone)]
pub struct SitzungsGriff {
    befehle: mpsc::Sender<SitzungsBefehl>,
}

impl SitzungsGriff {
    async fn einreichen(&self, befehl: SitzungsBefehl) -> Result<()> {
        self.befehle
            .send(befehl)
            .await
            .map_err(|_| RabbitHoleFehler::Getrennt("Sitzung ist beendet".into()))
    }

    /// Chat-Nachricht senden (erfordert Authentifizierung)
    pub async fn nachricht_senden(&self, text: impl Into<String>) -> Result<()> {
        self.einreichen(SitzungsBefehl::NachrichtSenden(text.into()))
            .await
    }

    /// PTT-Signal senden (erfordert Authentifizierung)
    pub async fn ptt_senden(&self, aktiv: bool, bild: impl Into<String>) -> Result<()> {
        self.einreichen(SitzungsBefehl::PttSenden {
            aktiv,
            bild: bild.into(),
        })
        .await
    }

    /// Rohen WAV-Clip senden (erfordert Authentifizierung)
    pub async fn audio_senden(&self, clip: Vec<u8>) -> Result<()> {
        self.einreichen(SitzungsBefehl::AudioSenden(clip)).await
    }

    /// Sprachnotiz: PTT auf, Clip senden, nach kurzem Nachlauf PTT zu mit
    /// optionalem Bild-Anhang
    pub async fn sprachnotiz_senden(&self, clip: Vec<u8>, bild: impl Into<String>) -> Result<()> {
        self.einreichen(SitzungsBefehl::SprachnotizSenden {
            clip,
            bild: bild.into(),
        })
        .await
    }

    /// Registrierung mit base64-kodierter QR-Payload
    pub async fn registrieren(&self, qr_b64: impl Into<String>) -> Result<()> {
        self.einreichen(SitzungsBefehl::Registrieren(qr_b64.into()))
            .await
    }

    /// Neue Anmeldedaten einspielen (loest bei offenem Socket genau einen
    /// frischen Logon-Versuch aus)
    pub async fn anmeldedaten_setzen(&self, daten: Anmeldedaten) -> Result<()> {
        self.einreichen(SitzungsBefehl::AnmeldedatenSetzen(daten))
            .await
    }
}

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

/// Eine logische Verbindung zum Rabbit-Hole-Server
pub struct Sitzung {
    griff: SitzungsGriff,
    zustand_rx: watch::Receiver<SitzungsZustand>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Sitzung {
    /// Baut eine TCP-Verbindung zum Endpunkt auf und startet die Sitzung
    pub async fn verbinden(endpoint: &str, umgebung: SitzungsUmgebung) -> Result<Sitzung> {
        info!(endpoint, "Verbinde mit Rabbit Hole");
        let stream = TcpStream::connect(endpoint).await.map_err(|e| {
            RabbitHoleFehler::Verbindung(format!("Aufbau zu {} fehlgeschlagen: {}", endpoint, e))
        })?;
        Ok(Self::starten(stream, umgebung))
    }

    /// Startet die Sitzung auf einem bereits offenen Stream
    ///
    /// Nuetzlich fuer Tests (in-memory Duplex) und alternative Transporte.
    pub fn starten<S>(stream: S, umgebung: SitzungsUmgebung) -> Sitzung
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (befehl_tx, befehl_rx) = mpsc::channel(BEFEHL_KAPAZITAET);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (zustand_tx, zustand_rx) = watch::channel(SitzungsZustand::Unverbunden);

        let kern = SitzungsKern::neu(
            umgebung.anmeldedaten,
            umgebung.protokoll,
            umgebung.wiedergabe,
            umgebung.registrierung,
            zustand_tx,
        );

        let task = tokio::spawn(steuerschleife(
            stream,
            kern,
            befehl_tx.clone(),
            befehl_rx,
            shutdown_rx,
        ));

        Sitzung {
            griff: SitzungsGriff { befehle: befehl_tx },
            zustand_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Gibt einen klonbaren Griff auf die Sitzung zurueck
    pub fn griff(&self) -> SitzungsGriff {
        self.griff.clone()
    }

    /// Aktueller Schnappschuss des Sitzungszustands
    pub fn zustand(&self) -> SitzungsZustand {
        *self.zustand_rx.borrow()
    }

    /// Beobachter fuer Zustandswechsel
    pub fn zustand_beobachten(&self) -> watch::Receiver<SitzungsZustand> {
        self.zustand_rx.clone()
    }

    /// Beendet die Sitzung deterministisch
    ///
    /// Signalisiert den Shutdown und wartet auf das Ende der
    /// Steuerschleife. Idempotent: ein zweiter Aufruf ist ein No-op und
    /// erzeugt keinen weiteren Closed-Uebergang.
    pub async fn beenden(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Sitzung {
    fn drop(&mut self) {
        // Shutdown anstossen; auf das Task-Ende kann Drop nicht warten
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        debug!("Sitzung gedroppt");
    }
}

// ---------------------------------------------------------------------------
// Steuerschleife
// ---------------------------------------------------------------------------

/// Die eine Schleife pro Sitzung: haelt Socket und Kern exklusiv
async fn steuerschleife<S>(
    stream: S,
    mut kern: SitzungsKern,
    befehl_tx: mpsc::Sender<SitzungsBefehl>,
    mut befehl_rx: mpsc::Receiver<SitzungsBefehl>,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut framed = Framed::new(stream, FrameCodec::new());

    debug!("Steuerschleife gestartet");

    // Socket ist offen sobald die Schleife laeuft: Aufbau loggen und ggf.
    // den Auto-Logon senden
    if let Some(logon) = kern.geoeffnet() {
        if let Err(e) = framed.send(logon).await {
            kern.transportfehler(&e);
            kern.getrennt();
            return;
        }
    }

    loop {
        tokio::select! {
            // Eingehender Rahmen von der Gegenstelle
            rahmen = framed.next() => match rahmen {
                Some(Ok(bytes)) => kern.eingehend(&bytes),
                Some(Err(e)) => {
                    kern.transportfehler(&e);
                    break;
                }
                None => {
                    debug!("Gegenstelle hat die Verbindung geschlossen");
                    break;
                }
            },

            // Befehl von aussen
            Some(befehl) = befehl_rx.recv() => {
                if let Err(e) = befehl_verarbeiten(&mut framed, &mut kern, &befehl_tx, befehl).await {
                    kern.transportfehler(&e);
                    break;
                }
            }

            // Shutdown-Signal (auch wenn der Sender kommentarlos faellt)
            _ = &mut shutdown_rx => {
                debug!("Shutdown-Signal, Sitzung wird beendet");
                break;
            }
        }
    }

    kern.getrennt();
    let _ = framed.close().await;
    debug!("Steuerschleife beendet");
}

/// Verarbeitet einen Befehl und sendet die resultierenden Umschlaege
async fn befehl_verarbeiten<S>(
    framed: &mut Framed<S, FrameCodec>,
    kern: &mut SitzungsKern,
    befehl_tx: &mpsc::Sender<SitzungsBefehl>,
    befehl: SitzungsBefehl,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match befehl {
        // Sprachnotiz zerlegen: PTT auf, Clip, nach Nachlauf PTT zu.
        // Das schliessende Signal kommt als verzoegerter Folge-Befehl,
        // damit die Schleife waehrend des Nachlaufs erreichbar bleibt.
        SitzungsBefehl::SprachnotizSenden { clip, bild } => {
            for umschlag in kern
                .befehl(SitzungsBefehl::PttSenden {
                    aktiv: true,
                    bild: String::new(),
                })
                .await
            {
                framed.send(umschlag).await?;
            }
            for umschlag in kern.befehl(SitzungsBefehl::AudioSenden(clip)).await {
                framed.send(umschlag).await?;
            }

            let tx = befehl_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(SPRACHNOTIZ_NACHLAUF).await;
                let _ = tx
                    .send(SitzungsBefehl::PttSenden { aktiv: false, bild })
                    .await;
            });
        }

        andere => {
            for umschlag in kern.befehl(andere).await {
                framed.send(umschlag).await?;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
