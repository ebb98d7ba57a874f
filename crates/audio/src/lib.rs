//! rabbithole-audio – Audio-Seite des Rabbit-Hole-Clients
//!
//! - WAV-Erkennung und asynchrone Daten-URL-Kodierung fuer ausgehende Clips
//! - `ClipPlayer`-Trait als Schnittstelle zum externen Wiedergabegeraet
//! - Strikt geordnete Wiedergabe-Warteschlange fuer eingehende Sprach-Clips

pub mod error;
pub mod queue;
pub mod wav;

// Bequeme Re-Exporte der wichtigsten Typen
pub use error::{AudioFehler, AudioResult};
pub use queue::{
    ClipPlayer, WiedergabeEinreihung, WiedergabeEintrag, WiedergabeQueue, STANDARD_PAUSE,
};
pub use wav::{als_daten_url, ist_wav, WAV_DATEN_URL_PREFIX};
