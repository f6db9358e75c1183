//! Localized user-facing strings.
//!
//! Only the handful of messages the engine renders itself live here:
//! the failure text of a result page, sort labels and proposal headings.

/// A message the engine can render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<'a> {
    UnableToExecuteQuery,
    NoSort,
    Descending,
    Ascending,
    ProposalsForBackend(&'a str),
    ProposalsForTerm(&'a str),
}

/// Translator bound to one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translator {
    English,
    French,
}

impl Translator {
    /// Pick a translator from a locale tag (`fr`, `fr_FR`, `en-US`, ...).
    /// Unknown locales fall back to English.
    pub fn for_locale(locale: &str) -> Self {
        let lang = locale
            .split(['_', '-'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match lang.as_str() {
            "fr" => Translator::French,
            _ => Translator::English,
        }
    }

    pub fn trans(&self, message: &Message<'_>) -> String {
        match (self, message) {
            (Translator::English, Message::UnableToExecuteQuery) => {
                "Unable to execute query".to_string()
            }
            (Translator::French, Message::UnableToExecuteQuery) => {
                "Impossible d'executer la requete".to_string()
            }
            (Translator::English, Message::NoSort) => "No sort".to_string(),
            (Translator::French, Message::NoSort) => "Pas de tri".to_string(),
            (Translator::English, Message::Descending) => "descendant".to_string(),
            (Translator::French, Message::Descending) => "descendant".to_string(),
            (Translator::English, Message::Ascending) => "ascendant".to_string(),
            (Translator::French, Message::Ascending) => "ascendant".to_string(),
            (Translator::English, Message::ProposalsForBackend(name)) => {
                format!("Proposals for database {name}")
            }
            (Translator::French, Message::ProposalsForBackend(name)) => {
                format!("Propositions pour la base {name}")
            }
            (Translator::English, Message::ProposalsForTerm(term)) => {
                format!("Proposals for term \"{term}\"")
            }
            (Translator::French, Message::ProposalsForTerm(term)) => {
                format!("Propositions pour le terme \"{term}\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_resolution() {
        assert_eq!(Translator::for_locale("fr_FR"), Translator::French);
        assert_eq!(Translator::for_locale("FR"), Translator::French);
        assert_eq!(Translator::for_locale("en-US"), Translator::English);
        assert_eq!(Translator::for_locale("de"), Translator::English);
        assert_eq!(Translator::for_locale(""), Translator::English);
    }

    #[test]
    fn test_parameterized_messages() {
        let fr = Translator::French;
        assert_eq!(
            fr.trans(&Message::ProposalsForBackend("photos")),
            "Propositions pour la base photos"
        );
        assert!(Translator::English
            .trans(&Message::ProposalsForTerm("cat"))
            .contains("\"cat\""));
    }
}
