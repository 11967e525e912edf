use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The recognized notification templates. Callers address them by their
/// historical 1-based index on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum TemplateKind {
    Bgmi,
    Hiring,
    Marketing,
}

/// Values substituted into a template's `{{placeholder}}` slots.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariables {
    pub game_type: String,
    pub map_type: String,
    pub date: String,
    pub time: String,
}

impl TemplateKind {
    pub fn from_index(template_type: u8) -> Result<TemplateKind, Error> {
        match template_type {
            1 => Ok(TemplateKind::Bgmi),
            2 => Ok(TemplateKind::Hiring),
            3 => Ok(TemplateKind::Marketing),
            _ => Err(Error::TemplateDoesNotExist { template_type }),
        }
    }

    fn source(&self) -> &'static str {
        match self {
            TemplateKind::Bgmi => include_str!("../../templates/bgmi.html"),
            TemplateKind::Hiring => include_str!("../../templates/hiring.html"),
            TemplateKind::Marketing => include_str!("../../templates/marketing.html"),
        }
    }

    pub fn render(&self, variables: &TemplateVariables) -> String {
        self.source()
            .replace("{{gameType}}", &variables.game_type)
            .replace("{{mapType}}", &variables.map_type)
            .replace("{{date}}", &variables.date)
            .replace("{{time}}", &variables.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> TemplateVariables {
        TemplateVariables {
            game_type: "Solo".to_string(),
            map_type: "Erangel".to_string(),
            date: "2024-01-01".to_string(),
            time: "18:00".to_string(),
        }
    }

    #[test]
    fn resolves_templates_by_historical_index() {
        assert_eq!(TemplateKind::from_index(1).unwrap(), TemplateKind::Bgmi);
        assert_eq!(TemplateKind::from_index(3).unwrap(), TemplateKind::Marketing);
    }

    #[test]
    fn rejects_an_index_out_of_the_recognized_set() {
        assert_eq!(
            TemplateKind::from_index(4).unwrap_err(),
            Error::TemplateDoesNotExist { template_type: 4 }
        );
        assert_eq!(
            TemplateKind::from_index(0).unwrap_err(),
            Error::TemplateDoesNotExist { template_type: 0 }
        );
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let body = TemplateKind::Bgmi.render(&variables());

        assert!(body.contains("Solo"));
        assert!(body.contains("Erangel"));
        assert!(body.contains("2024-01-01"));
        assert!(body.contains("18:00"));
        assert!(!body.contains("{{"));
    }
}
