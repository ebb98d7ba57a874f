//! rabbithole-client – Bibliotheks-Root
//!
//! Deklariert die Client-Module und stellt sie fuer Integrationstests
//! bereit. Der Einstiegspunkt lebt in `main.rs`.

pub mod config;
pub mod player;
pub mod store;

pub use config::ClientConfig;
pub use player::KommandoPlayer;
pub use store::DateiAnmeldedatenSpeicher;
