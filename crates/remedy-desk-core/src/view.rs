//! Screen composition.
//!
//! [`render`] is a pure function of the session snapshot and configuration.
//! The resulting [`Screen`] is plain data; its `Display` impl produces the
//! text layout used by the CLI.

use std::fmt;

use crate::config::DeskConfig;
use crate::matcher::Suggestions;
use crate::models::{PatientForm, Visit};
use crate::session::{RemoteAction, SessionState};

/// Search box panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPanel {
    pub last_query: Option<String>,
    pub searching: bool,
    pub directory_configured: bool,
}

/// Consultation panel. `patient_banner` is `None` until a patient is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationPanel {
    pub patient_banner: Option<String>,
    pub draft_prescription: String,
    pub saving: bool,
}

/// One row of the visit history, numbered for "repeat".
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    /// 1-based
    pub index: usize,
    pub visit: Visit,
}

/// One remedy card in the finder.
#[derive(Debug, Clone, PartialEq)]
pub struct RemedyCard {
    /// 1-based, as accepted by "pick"
    pub index: usize,
    pub name: String,
    pub potency: String,
    pub box_number: String,
    pub available: bool,
}

/// Remedy finder contents.
#[derive(Debug, Clone, PartialEq)]
pub enum RemedyPanel {
    NotSynced,
    TypeToSearch,
    Results(Vec<RemedyCard>),
    NoMatches { token: String, closest: Vec<String> },
}

/// Everything shown on the desk page.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub search: SearchPanel,
    pub registration: PatientForm,
    pub consultation: ConsultationPanel,
    pub history: Vec<HistoryRow>,
    pub remedies: RemedyPanel,
    pub syncing: bool,
    pub catalog_summary: Option<String>,
    pub reference_url: String,
}

/// Compose the screen for `state`.
pub fn render(state: &SessionState, config: &DeskConfig) -> Screen {
    let catalog = state.catalog();

    let remedies = if catalog.is_empty() {
        RemedyPanel::NotSynced
    } else {
        match state.suggestions() {
            Suggestions::TypeToSearch => RemedyPanel::TypeToSearch,
            Suggestions::NoMatches { token, closest } => RemedyPanel::NoMatches { token, closest },
            Suggestions::Hits(hits) => RemedyPanel::Results(
                hits.into_iter()
                    .enumerate()
                    .map(|(i, hit)| RemedyCard {
                        index: i + 1,
                        name: hit.entry.name.unwrap_or_default(),
                        potency: hit.entry.potency,
                        box_number: hit.entry.box_number,
                        available: hit.entry.available,
                    })
                    .collect(),
            ),
        }
    };

    let catalog_summary = (!catalog.is_empty()).then(|| {
        format!(
            "{} remedies, {} available ({})",
            catalog.len(),
            catalog.available_count(),
            catalog.short_fingerprint()
        )
    });

    Screen {
        search: SearchPanel {
            last_query: state.last_search().map(str::to_string),
            searching: state.is_pending(RemoteAction::Search),
            directory_configured: config.is_directory_configured(),
        },
        registration: state.registration_form(),
        consultation: ConsultationPanel {
            patient_banner: state
                .current_patient()
                .map(|p| format!("{} · {} · {}", p.display_name(), p.city, p.phone)),
            draft_prescription: state.draft_prescription().to_string(),
            saving: state.is_pending(RemoteAction::CompleteVisit),
        },
        history: state
            .visit_history()
            .iter()
            .enumerate()
            .map(|(i, visit)| HistoryRow {
                index: i + 1,
                visit: visit.clone(),
            })
            .collect(),
        remedies,
        syncing: state.is_pending(RemoteAction::SyncRemedies),
        catalog_summary,
        reference_url: config.reference_url.clone(),
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Patient search ==")?;
        if !self.search.directory_configured {
            writeln!(f, "  (directory endpoint not configured)")?;
        }
        match &self.search.last_query {
            Some(query) => writeln!(f, "  last search: {}", query)?,
            None => writeln!(f, "  search by phone number")?,
        }
        if self.search.searching {
            writeln!(f, "  searching...")?;
        }

        writeln!(f, "== Registration ==")?;
        let form = &self.registration;
        writeln!(
            f,
            "  first={} last={} sex={} city={} phone={}",
            form.first_name,
            form.last_name,
            form.sex.as_str(),
            form.city,
            form.phone
        )?;

        writeln!(f, "== Consultation ==")?;
        match &self.consultation.patient_banner {
            Some(banner) => {
                writeln!(f, "  patient: {}", banner)?;
                writeln!(f, "  prescription: {}", self.consultation.draft_prescription)?;
                if self.consultation.saving {
                    writeln!(f, "  saving visit...")?;
                }
            }
            None => writeln!(f, "  search or register a patient first")?,
        }

        if !self.history.is_empty() {
            writeln!(f, "== History ==")?;
            for row in &self.history {
                writeln!(
                    f,
                    "  [{}] {} | {} | {} | {}",
                    row.index,
                    row.visit.date,
                    row.visit.symptoms,
                    row.visit.diagnosis,
                    row.visit.prescription
                )?;
            }
        }

        writeln!(f, "== Remedy finder ==")?;
        if let Some(summary) = &self.catalog_summary {
            writeln!(f, "  {}", summary)?;
        }
        if self.syncing {
            writeln!(f, "  syncing...")?;
        }
        match &self.remedies {
            RemedyPanel::NotSynced => writeln!(f, "  remedies not synced yet")?,
            RemedyPanel::TypeToSearch => writeln!(f, "  type to search")?,
            RemedyPanel::Results(cards) => {
                for card in cards {
                    let marker = if card.available { "+" } else { "x" };
                    writeln!(
                        f,
                        "  {} [{}] {} {} (box {})",
                        marker, card.index, card.name, card.potency, card.box_number
                    )?;
                }
            }
            RemedyPanel::NoMatches { token, closest } => {
                writeln!(f, "  no remedies match \"{}\"", token)?;
                if !closest.is_empty() {
                    writeln!(f, "  did you mean: {}", closest.join(", "))?;
                }
            }
        }

        writeln!(f, "== Reference ==")?;
        write!(f, "  {}", self.reference_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RemedyCatalog;
    use crate::directory::PatientRecord;
    use crate::models::{Patient, RemedyEntry, Sex};

    fn state() -> SessionState {
        SessionState::new()
            .catalog_replaced(RemedyCatalog::from_entries(vec![
                RemedyEntry::new("Belladonna", "30C", "4"),
                RemedyEntry::new("Bellis Perennis", "200C", "4").unavailable(),
            ]))
            .patient_loaded(
                "5551234",
                PatientRecord {
                    patient: Patient {
                        first_name: "Asha".into(),
                        last_name: "Rao".into(),
                        sex: Sex::Female,
                        city: "Pune".into(),
                        phone: "5551234".into(),
                    },
                    history: vec![Visit {
                        date: "2024-03-01".into(),
                        symptoms: "fever".into(),
                        diagnosis: "flu".into(),
                        prescription: "Aconite 6C".into(),
                    }],
                },
            )
    }

    #[test]
    fn test_render_empty_session() {
        let screen = render(&SessionState::new(), &DeskConfig::default());
        assert_eq!(screen.remedies, RemedyPanel::NotSynced);
        assert!(screen.consultation.patient_banner.is_none());
        assert!(screen.history.is_empty());
        assert!(!screen.search.directory_configured);

        let text = screen.to_string();
        assert!(text.contains("search or register a patient first"));
        assert!(text.contains("remedies not synced yet"));
    }

    #[test]
    fn test_render_hits_with_availability() {
        let state = state().prescription_edited("bell");
        let screen = render(&state, &DeskConfig::default());
        let RemedyPanel::Results(cards) = &screen.remedies else {
            panic!("expected results, got {:?}", screen.remedies);
        };
        assert_eq!(cards.len(), 2);
        assert!(cards[0].available);
        assert!(!cards[1].available);

        let text = screen.to_string();
        assert!(text.contains("+ [1] Belladonna 30C (box 4)"));
        assert!(text.contains("x [2] Bellis Perennis 200C (box 4)"));
    }

    #[test]
    fn test_render_history_and_banner() {
        let screen = render(&state(), &DeskConfig::default());
        assert_eq!(screen.history.len(), 1);
        assert_eq!(screen.history[0].index, 1);
        assert_eq!(screen.registration.first_name, "Asha");
        assert!(screen.consultation.patient_banner.unwrap().starts_with("Asha Rao"));
        assert_eq!(screen.remedies, RemedyPanel::TypeToSearch);
    }

    #[test]
    fn test_render_no_matches_with_hints() {
        let state = state().prescription_edited("beladona");
        let screen = render(&state, &DeskConfig::default());
        match screen.remedies {
            RemedyPanel::NoMatches { token, closest } => {
                assert_eq!(token, "beladona");
                assert_eq!(closest.first().map(String::as_str), Some("Belladonna"));
            }
            other => panic!("expected no matches, got {:?}", other),
        }
    }

    #[test]
    fn test_render_reference_and_pending() {
        let config = DeskConfig::default();
        let state = SessionState::new().begin(RemoteAction::SyncRemedies).unwrap();
        let screen = render(&state, &config);
        assert!(screen.syncing);
        assert_eq!(screen.reference_url, config.reference_url);
        assert!(screen.to_string().ends_with(&config.reference_url));
    }
}
