use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wizard_flow::FieldError;

/// Display language, taken from the first path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Fr,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Fr => "fr",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Lang::En),
            "fr" => Ok(Lang::Fr),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// A field error with its message in the requested language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedError {
    pub field: String,
    pub code: String,
    pub message: &'static str,
}

pub fn message(code: &str, lang: Lang) -> &'static str {
    let (en, fr) = match code {
        "required" => ("This field is required.", "Ce champ est obligatoire."),
        "invalid" => ("The value entered is not valid.", "La valeur saisie n'est pas valide."),
        "too-long" => ("The value entered is too long.", "La valeur saisie est trop longue."),
        "characters-invalid" => (
            "The value contains characters that are not allowed.",
            "La valeur contient des caractères non permis.",
        ),
        "future" => ("The date cannot be in the future.", "La date ne peut pas être dans le futur."),
        "mismatch" => ("The values do not match.", "Les valeurs ne correspondent pas."),
        "email-required" => (
            "An email address is required to receive letters by email.",
            "Une adresse courriel est requise pour recevoir les lettres par courriel.",
        ),
        "matches-partner" => (
            "The social insurance number must differ from your partner's.",
            "Le numéro d'assurance sociale doit être différent de celui de votre conjoint.",
        ),
        "matches-applicant" => (
            "The social insurance number must differ from the applicant's.",
            "Le numéro d'assurance sociale doit être différent de celui du demandeur.",
        ),
        "too-old" => (
            "Children must be under 18 years of age.",
            "Les enfants doivent avoir moins de 18 ans.",
        ),
        "must-be-parent" => (
            "You must be the parent or legal guardian of the child.",
            "Vous devez être le parent ou le tuteur légal de l'enfant.",
        ),
        "not-found" => ("The record could not be found.", "L'enregistrement est introuvable."),
        _ => ("The value entered is not valid.", "La valeur saisie n'est pas valide."),
    };
    match lang {
        Lang::En => en,
        Lang::Fr => fr,
    }
}

pub fn localize(errors: Vec<FieldError>, lang: Lang) -> Vec<LocalizedError> {
    errors
        .into_iter()
        .map(|error| LocalizedError {
            message: message(&error.code, lang),
            field: error.field,
            code: error.code,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_path_segment() {
        assert_eq!("en".parse::<Lang>(), Ok(Lang::En));
        assert_eq!("fr".parse::<Lang>(), Ok(Lang::Fr));
        assert!("de".parse::<Lang>().is_err());
        assert!("EN".parse::<Lang>().is_err());
    }

    #[test]
    fn test_localize_keeps_field_and_code() {
        let localized = localize(vec![FieldError::new("email", "mismatch")], Lang::Fr);
        assert_eq!(localized[0].field, "email");
        assert_eq!(localized[0].code, "mismatch");
        assert_eq!(localized[0].message, "Les valeurs ne correspondent pas.");
    }

    #[test]
    fn test_unknown_code_falls_back_to_invalid() {
        assert_eq!(message("no-such-code", Lang::En), message("invalid", Lang::En));
    }
}
