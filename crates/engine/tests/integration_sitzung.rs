//! Integrationstests der Sitzungs-Engine
//!
//! Die Tests fahren eine echte Steuerschleife ueber einen in-memory
//! Duplex-Stream; die Testseite spielt den Rabbit-Hole-Server und spricht
//! das rohe Frame-Format (u32 BE Laenge + JSON).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

use rabbithole_audio::{AudioFehler, AudioResult, ClipPlayer, WiedergabeQueue};
use rabbithole_core::{Anmeldedaten, Ereignisprotokoll, Herkunft};
use rabbithole_engine::{
    RegistrierungsCallback, Sitzung, SitzungsUmgebung, SitzungsZustand,
};
use rabbithole_protocol::wire::{read_frame, write_frame, DEFAULT_MAX_FRAME_SIZE};

// ---------------------------------------------------------------------------
// Test-Kollaborateure
// ---------------------------------------------------------------------------

/// Player der die Abspielreihenfolge aufzeichnet und auf Kommando fehlschlaegt
struct TestPlayer {
    gespielt: Mutex<Vec<String>>,
    fehlschlag_bei: Option<String>,
}

impl TestPlayer {
    fn neu(fehlschlag_bei: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            gespielt: Mutex::new(Vec::new()),
            fehlschlag_bei: fehlschlag_bei.map(String::from),
        })
    }
}

#[async_trait]
impl ClipPlayer for TestPlayer {
    async fn abspielen(&self, clip_b64: &str) -> AudioResult<()> {
        self.gespielt.lock().push(clip_b64.to_string());
        if self.fehlschlag_bei.as_deref() == Some(clip_b64) {
            return Err(AudioFehler::Wiedergabe("Testfehler".into()));
        }
        Ok(())
    }
}

/// Callback der alle Registrierungen aufzeichnet
#[derive(Default)]
struct TestCallback {
    aufrufe: Mutex<Vec<(String, String, String)>>,
}

impl RegistrierungsCallback for TestCallback {
    fn registriert(&self, imei: &str, account_key: &str, roh: &str) {
        self.aufrufe
            .lock()
            .push((imei.into(), account_key.into(), roh.into()));
    }
}

// ---------------------------------------------------------------------------
// Aufbau-Hilfen
// ---------------------------------------------------------------------------

struct Testaufbau {
    sitzung: Sitzung,
    server_lesen: ReadHalf<tokio::io::DuplexStream>,
    server_schreiben: WriteHalf<tokio::io::DuplexStream>,
    protokoll: Arc<Mutex<Ereignisprotokoll>>,
    callback: Arc<TestCallback>,
    player: Arc<TestPlayer>,
    _queue: WiedergabeQueue,
}

fn aufbau(anmeldedaten: Anmeldedaten, fehlschlag_bei: Option<&str>) -> Testaufbau {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_lesen, server_schreiben) = tokio::io::split(server);

    let protokoll = Arc::new(Mutex::new(Ereignisprotokoll::neu()));
    let callback = Arc::new(TestCallback::default());
    let player = TestPlayer::neu(fehlschlag_bei);
    let queue = WiedergabeQueue::starten(player.clone(), Duration::from_millis(1));

    let umgebung = SitzungsUmgebung {
        anmeldedaten,
        protokoll: protokoll.clone(),
        wiedergabe: queue.einreihung(),
        registrierung: callback.clone(),
    };

    Testaufbau {
        sitzung: Sitzung::starten(client, umgebung),
        server_lesen,
        server_schreiben,
        protokoll,
        callback,
        player,
        _queue: queue,
    }
}

/// Liest den naechsten Frame auf der Serverseite als UTF-8-String
async fn naechster_frame<R: AsyncRead + Unpin>(lesen: &mut R) -> String {
    let frame = tokio::time::timeout(
        Duration::from_secs(2),
        read_frame(lesen, DEFAULT_MAX_FRAME_SIZE),
    )
    .await
    .expect("Zeitlimit beim Frame-Lesen")
    .expect("Frame-Lesen fehlgeschlagen");
    String::from_utf8(frame).expect("Frame ist kein UTF-8")
}

/// Sendet einen rohen JSON-Frame von der Serverseite
async fn server_sendet<W: AsyncWrite + Unpin>(schreiben: &mut W, json: &str) {
    write_frame(schreiben, json.as_bytes(), DEFAULT_MAX_FRAME_SIZE)
        .await
        .expect("Frame-Schreiben fehlgeschlagen");
}

/// Wartet beschraenkt bis die Bedingung erfuellt ist
async fn warte_bis(beschreibung: &str, mut bedingung: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !bedingung() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Zeitlimit: {}", beschreibung));
}

// ---------------------------------------------------------------------------
// Szenarien
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logon_szenario_bis_authentifiziert() {
    let mut a = aufbau(Anmeldedaten::neu("123", "abc"), None);

    // Auto-Logon: genau dieser Umschlag muss ankommen
    let frame = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(
        frame,
        r#"{"type":"logon","data":{"imei":"123","accountKey":"abc"}}"#
    );

    // Server bestaetigt
    server_sendet(&mut a.server_schreiben, r#"{"type":"logon","data":"success"}"#).await;

    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Authentifiziert)
        .await
        .unwrap();
    assert!(!a.sitzung.zustand().kann_authentifizieren());

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn logon_fehlschlag_bleibt_unauthentifiziert() {
    let mut a = aufbau(Anmeldedaten::neu("123", "falsch"), None);

    let _ = naechster_frame(&mut a.server_lesen).await;
    server_sendet(
        &mut a.server_schreiben,
        r#"{"type":"logon","data":"invalid credentials"}"#,
    )
    .await;

    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Offen)
        .await
        .unwrap();

    let protokoll = a.protokoll.clone();
    warte_bis("Fehlschlag im Protokoll", move || {
        protokoll
            .lock()
            .iter()
            .any(|e| e.inhalt == "Authentication failed")
    })
    .await;

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn nachricht_ohne_authentifizierung_erzeugt_keinen_frame() {
    let mut a = aufbau(Anmeldedaten::default(), None);

    let griff = a.sitzung.griff();
    griff.nachricht_senden("verloren").await.unwrap();
    // Die Registrierung dient als Markierung: kaeme die Nachricht doch auf
    // den Draht, laege sie VOR diesem Frame
    griff.registrieren("Zm9v").await.unwrap();

    let frame = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(frame, r#"{"type":"register","data":"Zm9v"}"#);

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn registrierungs_szenario_mit_rohdaten_callback() {
    let mut a = aufbau(Anmeldedaten::default(), None);

    a.sitzung.griff().registrieren("Zm9v").await.unwrap();
    let frame = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(frame, r#"{"type":"register","data":"Zm9v"}"#);

    server_sendet(
        &mut a.server_schreiben,
        r#"{"type":"register","data":{"imei":"999","accountKey":"k"}}"#,
    )
    .await;

    let callback = a.callback.clone();
    warte_bis("Registrierungs-Callback", move || {
        !callback.aufrufe.lock().is_empty()
    })
    .await;

    assert_eq!(
        a.callback.aufrufe.lock().as_slice(),
        [(
            "999".to_string(),
            "k".to_string(),
            r#"{"imei":"999","accountKey":"k"}"#.to_string()
        )]
    );

    // Das Ergebnis allein authentifiziert nicht
    assert_ne!(a.sitzung.zustand(), SitzungsZustand::Authentifiziert);

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn registrierung_dann_anmeldedaten_loest_frischen_logon_aus() {
    let mut a = aufbau(Anmeldedaten::default(), None);

    a.sitzung.griff().registrieren("Zm9v").await.unwrap();
    let _ = naechster_frame(&mut a.server_lesen).await;

    server_sendet(
        &mut a.server_schreiben,
        r#"{"type":"register","data":{"imei":"999","accountKey":"k"}}"#,
    )
    .await;

    let callback = a.callback.clone();
    warte_bis("Registrierungs-Callback", move || {
        !callback.aufrufe.lock().is_empty()
    })
    .await;

    // Re-entrant: der Aufrufer spielt die neuen Daten ein, der Socket ist
    // noch offen -> genau ein frischer Logon
    a.sitzung
        .griff()
        .anmeldedaten_setzen(Anmeldedaten::neu("999", "k"))
        .await
        .unwrap();

    let frame = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(
        frame,
        r#"{"type":"logon","data":{"imei":"999","accountKey":"k"}}"#
    );

    server_sendet(&mut a.server_schreiben, r#"{"type":"logon","data":"success"}"#).await;
    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Authentifiziert)
        .await
        .unwrap();

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn unbekannte_typen_stoeren_die_sitzung_nicht() {
    let mut a = aufbau(Anmeldedaten::neu("123", "abc"), None);
    let _ = naechster_frame(&mut a.server_lesen).await;

    // Ein Schwall unbekannter Umschlaege, danach ein gueltiger
    server_sendet(&mut a.server_schreiben, r#"{"type":"telemetry","data":1}"#).await;
    server_sendet(&mut a.server_schreiben, r#"{"type":"ota","data":{"v":"2"}}"#).await;
    server_sendet(&mut a.server_schreiben, r#"{"type":"logon","data":"success"}"#).await;

    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Authentifiziert)
        .await
        .unwrap();

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn kaputter_rahmen_beendet_die_sitzung_nicht() {
    let mut a = aufbau(Anmeldedaten::default(), None);

    server_sendet(&mut a.server_schreiben, "das ist kein json").await;
    server_sendet(&mut a.server_schreiben, r#"{"type":"message","data":"danach"}"#).await;

    let protokoll = a.protokoll.clone();
    warte_bis("Nachricht nach kaputtem Rahmen", move || {
        protokoll
            .lock()
            .iter()
            .any(|e| e.inhalt == "danach" && e.herkunft == Herkunft::Gegenstelle)
    })
    .await;

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn wiedergabe_in_reihenfolge_trotz_fehler() {
    // B schlaegt fehl – C muss trotzdem spielen
    let mut a = aufbau(Anmeldedaten::default(), Some("B"));

    for clip in ["A", "B", "C"] {
        server_sendet(
            &mut a.server_schreiben,
            &format!(r#"{{"type":"audio","data":{{"audio":"{}"}}}}"#, clip),
        )
        .await;
    }

    let player = a.player.clone();
    warte_bis("alle Clips gespielt", move || {
        player.gespielt.lock().len() == 3
    })
    .await;

    assert_eq!(*a.player.gespielt.lock(), ["A", "B", "C"]);

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn chat_nachricht_wird_nach_authentifizierung_gesendet() {
    let mut a = aufbau(Anmeldedaten::neu("123", "abc"), None);
    let _ = naechster_frame(&mut a.server_lesen).await;
    server_sendet(&mut a.server_schreiben, r#"{"type":"logon","data":"success"}"#).await;

    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Authentifiziert)
        .await
        .unwrap();

    a.sitzung.griff().nachricht_senden("hallo").await.unwrap();

    let frame = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(frame, r#"{"type":"message","data":"hallo"}"#);

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn sprachnotiz_sendet_ptt_audio_ptt() {
    let mut a = aufbau(Anmeldedaten::neu("123", "abc"), None);
    let _ = naechster_frame(&mut a.server_lesen).await;
    server_sendet(&mut a.server_schreiben, r#"{"type":"logon","data":"success"}"#).await;

    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Authentifiziert)
        .await
        .unwrap();

    // Minimaler WAV-Clip
    let mut clip = Vec::new();
    clip.extend_from_slice(b"RIFF");
    clip.extend_from_slice(&36u32.to_le_bytes());
    clip.extend_from_slice(b"WAVE");
    clip.extend_from_slice(b"fmt ");

    a.sitzung
        .griff()
        .sprachnotiz_senden(clip, "data:image/jpeg;base64,xyz")
        .await
        .unwrap();

    let erster = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(erster, r#"{"type":"ptt","data":{"active":true,"image":""}}"#);

    let zweiter = naechster_frame(&mut a.server_lesen).await;
    assert!(zweiter.starts_with(r#"{"type":"audio","data":"data:audio/wav;base64,"#));

    // Das schliessende Signal kommt nach dem Nachlauf und traegt das Bild
    let dritter = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(
        dritter,
        r#"{"type":"ptt","data":{"active":false,"image":"data:image/jpeg;base64,xyz"}}"#
    );

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn audio_in_fremdformat_erreicht_den_draht_nicht() {
    let mut a = aufbau(Anmeldedaten::neu("123", "abc"), None);
    let _ = naechster_frame(&mut a.server_lesen).await;
    server_sendet(&mut a.server_schreiben, r#"{"type":"logon","data":"success"}"#).await;

    let mut beobachter = a.sitzung.zustand_beobachten();
    beobachter
        .wait_for(|z| *z == SitzungsZustand::Authentifiziert)
        .await
        .unwrap();

    let griff = a.sitzung.griff();
    griff.audio_senden(b"OggS kein wav".to_vec()).await.unwrap();
    // Markierung hinterher: der naechste Frame muss die Nachricht sein
    griff.nachricht_senden("markierung").await.unwrap();

    let frame = naechster_frame(&mut a.server_lesen).await;
    assert_eq!(frame, r#"{"type":"message","data":"markierung"}"#);

    let protokoll = a.protokoll.clone();
    warte_bis("Verwurf im Protokoll", move || {
        protokoll
            .lock()
            .iter()
            .any(|e| e.inhalt.starts_with("Dropped audio clip:"))
    })
    .await;

    a.sitzung.beenden().await;
}

#[tokio::test]
async fn eingehende_nachrichten_in_zustellreihenfolge() {
    let mut a = aufbau(Anmeldedaten::default(), None);

    for i in 0..5 {
        server_sendet(
            &mut a.server_schreiben,
            &format!(r#"{{"type":"message","data":"m{}"}}"#, i),
        )
        .await;
    }

    let protokoll = a.protokoll.clone();
    warte_bis("alle Nachrichten im Protokoll", move || {
        protokoll
            .lock()
            .iter()
            .filter(|e| e.herkunft == Herkunft::Gegenstelle)
            .count()
            == 5
    })
    .await;

    let reihenfolge: Vec<String> = a
        .protokoll
        .lock()
        .iter()
        .filter(|e| e.herkunft == Herkunft::Gegenstelle)
        .map(|e| e.inhalt.clone())
        .collect();
    assert_eq!(reihenfolge, ["m0", "m1", "m2", "m3", "m4"]);

    a.sitzung.beenden().await;
}
