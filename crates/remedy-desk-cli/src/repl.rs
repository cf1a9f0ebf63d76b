//! Line commands for the interactive session.

use chrono::NaiveDate;
use remedy_desk_core::{Intent, PatientForm, SessionState, Sex};

pub const HELP: &str = "\
commands:
  search <phone>                          look up a patient
  register first=.. last=.. sex=.. city=.. phone=..
                                          register or update (prefilled from the screen)
  rx <text>                               set the prescription draft
  pick <n>                                add remedy suggestion n
  repeat <n>                              copy the prescription of visit n
  visit symptoms=.. diagnosis=.. [date=YYYY-MM-DD]
                                          save the consultation
  sync                                    reload remedies
  endpoint                                enter the directory URL (not echoed; blank clears)
  show                                    redraw the screen
  reset                                   clear the current patient
  help                                    this text
  quit                                    leave
values containing spaces can be quoted: city=\"New Delhi\"";

/// A parsed session command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    Register(Vec<(String, String)>),
    Prescription(String),
    Pick(usize),
    Repeat(usize),
    Visit(Vec<(String, String)>),
    Sync,
    Endpoint,
    Show,
    Reset,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "search" | "s" => {
            if rest.is_empty() {
                return Err("usage: search <phone>".into());
            }
            Command::Search(rest.to_string())
        }
        "register" | "reg" => Command::Register(parse_fields(rest)?),
        "rx" => Command::Prescription(rest.to_string()),
        "pick" | "p" => Command::Pick(parse_index(rest, "pick")?),
        "repeat" => Command::Repeat(parse_index(rest, "repeat")?),
        "visit" => Command::Visit(parse_fields(rest)?),
        "sync" => Command::Sync,
        "endpoint" => {
            if !rest.is_empty() {
                return Err("usage: endpoint (the URL is asked for on the next line)".into());
            }
            Command::Endpoint
        }
        "show" => Command::Show,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(command))
}

fn parse_index(text: &str, command: &str) -> Result<usize, String> {
    text.parse::<usize>()
        .map_err(|_| format!("usage: {} <n>", command))
}

/// Split `key=value` pairs. Values may be double-quoted.
pub fn parse_fields(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut fields = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        if chars.next() != Some('=') {
            return Err(format!("expected key=value, got '{}'", key));
        }

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(format!("unterminated quote in '{}'", key)),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
        }
        fields.push((key.to_ascii_lowercase(), value));
    }

    Ok(fields)
}

/// Registration form: the screen's prefill overridden by the given fields.
pub fn registration_intent(state: &SessionState, fields: &[(String, String)]) -> Result<Intent, String> {
    let mut form: PatientForm = state.registration_form();
    for (key, value) in fields {
        match key.as_str() {
            "first" | "first_name" => form.first_name = value.clone(),
            "last" | "last_name" => form.last_name = value.clone(),
            "sex" => form.sex = Sex::parse(value),
            "city" => form.city = value.clone(),
            "phone" => form.phone = value.clone(),
            other => return Err(format!("unknown registration field '{}'", other)),
        }
    }
    Ok(Intent::SavePatient(form))
}

/// Consultation form for `today` (or `date=`), carrying the draft prescription.
pub fn visit_intent(
    state: &SessionState,
    fields: &[(String, String)],
    today: NaiveDate,
) -> Result<Intent, String> {
    let date = match fields.iter().find(|(key, _)| key == "date") {
        Some((_, value)) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| format!("date must be YYYY-MM-DD, got '{}'", value))?,
        None => today,
    };

    let mut form = state.visit_form(date);
    for (key, value) in fields {
        match key.as_str() {
            "date" => {}
            "symptoms" => form.set_symptoms(value),
            "diagnosis" => form.diagnosis = value.clone(),
            "rx" | "prescription" => form.prescription = value.clone(),
            other => return Err(format!("unknown visit field '{}'", other)),
        }
    }
    Ok(Intent::CompleteVisit(form))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_line("  "), Ok(None));
        assert_eq!(parse_line("sync"), Ok(Some(Command::Sync)));
        assert_eq!(parse_line("QUIT"), Ok(Some(Command::Quit)));
        assert_eq!(parse_line("pick 3"), Ok(Some(Command::Pick(3))));
        assert_eq!(
            parse_line("search  555 1234 "),
            Ok(Some(Command::Search("555 1234".into())))
        );
        assert!(parse_line("pick x").is_err());
        assert!(parse_line("search").is_err());
        assert!(parse_line("dance").is_err());
    }

    #[test]
    fn test_endpoint_takes_no_inline_url() {
        assert_eq!(parse_line("endpoint"), Ok(Some(Command::Endpoint)));
        assert_eq!(parse_line("ENDPOINT "), Ok(Some(Command::Endpoint)));
        let err = parse_line("endpoint https://script.example/exec").unwrap_err();
        assert!(!err.contains("script.example"));
    }

    #[test]
    fn test_rx_keeps_text() {
        assert_eq!(
            parse_line("rx Aconite 6C, bell"),
            Ok(Some(Command::Prescription("Aconite 6C, bell".into())))
        );
        assert_eq!(parse_line("rx"), Ok(Some(Command::Prescription(String::new()))));
    }

    #[test]
    fn test_parse_fields_with_quotes() {
        let fields = parse_fields(r#"first=Asha city="New Delhi" phone=555"#).unwrap();
        assert_eq!(
            fields,
            vec![
                ("first".to_string(), "Asha".to_string()),
                ("city".to_string(), "New Delhi".to_string()),
                ("phone".to_string(), "555".to_string()),
            ]
        );
        assert!(parse_fields("first").is_err());
        assert!(parse_fields(r#"city="Pune"#).is_err());
    }

    #[test]
    fn test_registration_uses_prefill() {
        let state = SessionState::new().patient_not_found("5551234");
        let fields = parse_fields("first=Asha city=Pune sex=f").unwrap();
        let Ok(Intent::SavePatient(form)) = registration_intent(&state, &fields) else {
            panic!("expected a registration intent");
        };
        assert_eq!(form.phone, "5551234");
        assert_eq!(form.sex, Sex::Female);
        assert!(registration_intent(&state, &parse_fields("age=3").unwrap()).is_err());
    }

    #[test]
    fn test_visit_intent_date() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let state = SessionState::new().prescription_edited("Aconite 6C, ");
        let fields = parse_fields(r#"symptoms="fever, chills" date=2024-03-30"#).unwrap();
        let Ok(Intent::CompleteVisit(form)) = visit_intent(&state, &fields, today) else {
            panic!("expected a visit intent");
        };
        assert_eq!(form.date, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
        assert_eq!(form.symptoms, "2024-03-30; fever, chills");
        assert_eq!(form.prescription, "Aconite 6C, ");

        let bad = parse_fields("date=30/03/2024").unwrap();
        assert!(visit_intent(&state, &bad, today).is_err());
    }
}
