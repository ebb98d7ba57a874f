//! Sitzungs-Zustandsmaschine
//!
//! Ein einzelnes Tagged-Enum statt getrennter Boolean-Flags
//! (`canAuthenticate`/`authenticated`): unmoegliche Flag-Kombinationen sind
//! damit nicht darstellbar. Alle Uebergaenge laufen zentral durch
//! [`SitzungsZustand::uebergang`].
//!
//! ## Zustandsdiagramm
//! ```text
//! Unverbunden -> Offen -> Authentifizierung -> Authentifiziert
//!                  |  ^          |
//!                  v  |          v
//!                Registrierung <-+
//!     (jeder Zustand) -- Getrennt --> Unverbunden
//! ```

/// Zustand einer Rabbit-Hole-Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SitzungsZustand {
    /// Kein Socket offen
    #[default]
    Unverbunden,
    /// Socket offen, noch nicht authentifiziert
    Offen,
    /// Logon-Anfrage gesendet, Antwort steht aus
    Authentifizierung,
    /// Erfolgreich authentifiziert
    Authentifiziert,
    /// Registrierungs-Anfrage gesendet, Antwort steht aus
    Registrierung,
}

/// Ereignisse die einen Zustandswechsel ausloesen koennen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZustandsEreignis {
    /// Socket wurde geoeffnet
    Verbunden,
    /// Logon-Anfrage wurde gesendet
    LogonGesendet,
    /// Server meldet erfolgreiches Logon
    LogonErfolg,
    /// Server lehnt das Logon ab
    LogonFehlschlag,
    /// Registrierungs-Anfrage wurde gesendet
    RegisterGesendet,
    /// Registrierungs-Ergebnis ist eingetroffen
    RegisterErgebnis,
    /// Socket wurde geschlossen
    Getrennt,
}

impl SitzungsZustand {
    /// Gibt true zurueck wenn die Sitzung authentifiziert ist
    pub fn ist_authentifiziert(&self) -> bool {
        matches!(self, Self::Authentifiziert)
    }

    /// Gibt true zurueck wenn ein Socket offen ist
    pub fn ist_verbunden(&self) -> bool {
        !matches!(self, Self::Unverbunden)
    }

    /// Gibt true zurueck wenn Logon/Registrierung moeglich sind
    ///
    /// Registrierbar heisst: Socket offen und (noch) nicht authentifiziert.
    /// Ein laufendes Logon blockiert die Registrierung nicht.
    pub fn kann_authentifizieren(&self) -> bool {
        matches!(
            self,
            Self::Offen | Self::Authentifizierung | Self::Registrierung
        )
    }

    /// Wendet ein Ereignis auf den Zustand an
    ///
    /// Gibt den Folgezustand zurueck, oder `None` wenn das Ereignis im
    /// aktuellen Zustand unzulaessig ist (der Aufrufer loggt und verwirft).
    pub fn uebergang(self, ereignis: ZustandsEreignis) -> Option<SitzungsZustand> {
        use SitzungsZustand::*;
        use ZustandsEreignis::*;

        match (self, ereignis) {
            // Verbindungsaufbau nur aus dem Leerlauf
            (Unverbunden, Verbunden) => Some(Offen),

            // Logon aus jedem registrierbaren Zustand; ein erneuter Versuch
            // waehrend eines laufenden Logons ist zulaessig (neue Anmeldedaten)
            (Offen | Authentifizierung | Registrierung, LogonGesendet) => Some(Authentifizierung),

            // Ein Erfolg authentifiziert aus jedem verbundenen Zustand
            (Offen | Authentifizierung | Registrierung | Authentifiziert, LogonErfolg) => {
                Some(Authentifiziert)
            }

            // Ein Fehlschlag laesst eine bestehende Authentifizierung unberuehrt
            (Authentifiziert, LogonFehlschlag) => Some(Authentifiziert),
            (Offen | Authentifizierung | Registrierung, LogonFehlschlag) => Some(Offen),

            // Registrierung nie im authentifizierten Zustand
            (Offen | Authentifizierung | Registrierung, RegisterGesendet) => Some(Registrierung),

            // Das Ergebnis beendet nur die laufende Registrierung; in allen
            // anderen Zustaenden aendert es nichts (Callback laeuft trotzdem)
            (Registrierung, RegisterErgebnis) => Some(Offen),
            (Offen | Authentifizierung | Authentifiziert, RegisterErgebnis) => Some(self),

            // Trennung ist immer zulaessig
            (_, Getrennt) => Some(Unverbunden),

            _ => None,
        }
    }
}

impl std::fmt::Display for SitzungsZustand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unverbunden => "unverbunden",
            Self::Offen => "offen",
            Self::Authentifizierung => "authentifizierung",
            Self::Authentifiziert => "authentifiziert",
            Self::Registrierung => "registrierung",
        };
        write!(f, "{}", name)
    }
}
