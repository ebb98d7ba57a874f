//! Ereignis- und Gespraechsprotokoll
//!
//! Append-only: Eintraege werden ausschliesslich angehaengt, nie geaendert
//! oder entfernt. Die Einfuegereihenfolge ist die Anzeigereihenfolge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EintragsId;

/// Herkunft eines Protokoll-Eintrags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Herkunft {
    /// Vom lokalen Benutzer ausgeloest
    Benutzer,
    /// Von der Gegenstelle empfangen
    Gegenstelle,
    /// Vom Client selbst erzeugt (Lifecycle, Fehler, Diagnose)
    System,
}

/// Inhaltstyp eines Protokoll-Eintrags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InhaltsTyp {
    Text,
    Bild,
    TranskribierteSprache,
}

/// Ein einzelner Eintrag im Ereignisprotokoll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtokollEintrag {
    pub id: EintragsId,
    pub herkunft: Herkunft,
    pub inhalt_typ: InhaltsTyp,
    pub inhalt: String,
    pub zeitpunkt: DateTime<Utc>,
}

impl ProtokollEintrag {
    /// Erstellt einen neuen Eintrag mit aktuellem Zeitstempel
    pub fn neu(herkunft: Herkunft, inhalt_typ: InhaltsTyp, inhalt: impl Into<String>) -> Self {
        Self {
            id: EintragsId::neu(),
            herkunft,
            inhalt_typ,
            inhalt: inhalt.into(),
            zeitpunkt: Utc::now(),
        }
    }

    /// Erstellt einen System-Eintrag (Text)
    pub fn system(inhalt: impl Into<String>) -> Self {
        Self::neu(Herkunft::System, InhaltsTyp::Text, inhalt)
    }
}

/// Append-only Ereignisprotokoll
///
/// Externe Kollaborateure lesen Schnappschuesse; nur die Engine haengt an.
#[derive(Debug, Default)]
pub struct Ereignisprotokoll {
    eintraege: Vec<ProtokollEintrag>,
}

impl Ereignisprotokoll {
    /// Erstellt ein leeres Protokoll
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt einen Eintrag an
    pub fn anhaengen(&mut self, eintrag: ProtokollEintrag) {
        self.eintraege.push(eintrag);
    }

    /// Haengt einen System-Eintrag an
    pub fn system(&mut self, inhalt: impl Into<String>) {
        self.anhaengen(ProtokollEintrag::system(inhalt));
    }

    /// Anzahl der Eintraege
    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    /// Gibt true zurueck wenn das Protokoll leer ist
    pub fn ist_leer(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Kopie aller Eintraege in Einfuegereihenfolge
    pub fn schnappschuss(&self) -> Vec<ProtokollEintrag> {
        self.eintraege.clone()
    }

    /// Iterator ueber die Eintraege in Einfuegereihenfolge
    pub fn iter(&self) -> impl Iterator<Item = &ProtokollEintrag> {
        self.eintraege.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protokoll_haelt_einfuegereihenfolge() {
        let mut log = Ereignisprotokoll::neu();
        log.system("erster");
        log.anhaengen(ProtokollEintrag::neu(
            Herkunft::Gegenstelle,
            InhaltsTyp::Text,
            "zweiter",
        ));
        log.system("dritter");

        let inhalte: Vec<_> = log.iter().map(|e| e.inhalt.as_str()).collect();
        assert_eq!(inhalte, ["erster", "zweiter", "dritter"]);
    }

    #[test]
    fn schnappschuss_ist_kopie() {
        let mut log = Ereignisprotokoll::neu();
        log.system("eintrag");
        let schnappschuss = log.schnappschuss();
        log.system("noch einer");

        assert_eq!(schnappschuss.len(), 1);
        assert_eq!(log.laenge(), 2);
    }

    #[test]
    fn eintraege_haben_eindeutige_ids() {
        let a = ProtokollEintrag::system("a");
        let b = ProtokollEintrag::system("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn eintrag_ist_serde_kompatibel() {
        let eintrag = ProtokollEintrag::neu(Herkunft::Gegenstelle, InhaltsTyp::Text, "hallo");
        let json = serde_json::to_string(&eintrag).unwrap();
        let _: ProtokollEintrag = serde_json::from_str(&json).unwrap();
    }
}
