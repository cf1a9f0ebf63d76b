//! End-to-end desk flows against in-memory directory and catalog sources.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use remedy_desk_core::catalog::{CatalogError, CatalogResult, CatalogSource, FileCatalogSource};
use remedy_desk_core::config::{DeskConfig, DirectoryEndpoint};
use remedy_desk_core::desk::{FrontDesk, Intent, NoticeLevel};
use remedy_desk_core::directory::{
    Ack, DirectoryClient, DirectoryError, DirectoryResult, HttpDirectoryClient, PatientRecord,
};
use remedy_desk_core::models::{Patient, PatientForm, Sex, Visit};
use remedy_desk_core::session::SessionState;

/// Directory backed by a shared list of records.
#[derive(Clone, Default)]
struct MemoryDirectory {
    records: Arc<Mutex<Vec<PatientRecord>>>,
}

impl MemoryDirectory {
    fn with_record(record: PatientRecord) -> Self {
        let directory = Self::default();
        directory.records.lock().unwrap().push(record);
        directory
    }
}

impl DirectoryClient for MemoryDirectory {
    fn find_patient(&self, phone: &str) -> DirectoryResult<Option<PatientRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|r| r.patient.phone == phone).cloned())
    }

    fn save_patient(&self, patient: &Patient) -> DirectoryResult<Ack> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.patient.phone == patient.phone) {
            Some(record) => record.patient = patient.clone(),
            None => records.push(PatientRecord {
                patient: patient.clone(),
                history: vec![],
            }),
        }
        Ok(Ack { message: None })
    }

    fn save_visit(&self, phone: &str, visit: &Visit) -> DirectoryResult<Ack> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.patient.phone == phone)
            .ok_or_else(|| DirectoryError::Rejected("unknown patient".into()))?;
        record.history.insert(0, visit.clone());
        Ok(Ack { message: None })
    }
}

/// Catalog source that serves whatever document is currently set.
#[derive(Clone, Default)]
struct SwitchableSheet {
    document: Arc<Mutex<Option<String>>>,
}

impl SwitchableSheet {
    fn set(&self, document: Option<&str>) {
        *self.document.lock().unwrap() = document.map(str::to_string);
    }
}

impl CatalogSource for SwitchableSheet {
    fn fetch(&self, _location: &str) -> CatalogResult<String> {
        self.document
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CatalogError::Fetch("sheet offline".into()))
    }
}

const SHEET: &str = "\
Remedy Name,Potency,BOX Number,Available y/n
Aconite,6C,1,y
Belladonna,30C,4,Yes
Bellis Perennis,30C,4,n
\"Calcarea Carbonica, Hahnemann\",200C,3,y
";

fn asha() -> Patient {
    Patient {
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        sex: Sex::Female,
        city: "Pune".into(),
        phone: "5551234".into(),
    }
}

fn visit(date: &str, prescription: &str) -> Visit {
    Visit {
        date: date.into(),
        symptoms: "cough".into(),
        diagnosis: String::new(),
        prescription: prescription.into(),
    }
}

fn desk(directory: MemoryDirectory, sheet: SwitchableSheet) -> FrontDesk {
    FrontDesk::new(DeskConfig::default(), Box::new(directory), Box::new(sheet))
}

#[test]
fn test_search_returns_history_in_directory_order() {
    let directory = MemoryDirectory::with_record(PatientRecord {
        patient: asha(),
        history: vec![
            visit("2024-03-01", "Aconite 6C"),
            visit("2024-02-10", "Belladonna 30C"),
            visit("2023-12-24", "Bryonia 30C"),
        ],
    });
    let desk = desk(directory, SwitchableSheet::default());

    let t = desk.dispatch(SessionState::new(), Intent::Search { phone: "5551234".into() });
    let dates: Vec<_> = t.state.visit_history().iter().map(|v| v.date.clone()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-02-10", "2023-12-24"]);
    assert_eq!(t.state.current_patient(), Some(&asha()));
}

#[test]
fn test_register_after_not_found_then_record_visit() {
    let directory = MemoryDirectory::default();
    let sheet = SwitchableSheet::default();
    sheet.set(Some(SHEET));
    let desk = desk(directory.clone(), sheet);

    let t = desk.dispatch(SessionState::new(), Intent::Search { phone: "5551234".into() });
    assert_eq!(t.notice.as_ref().unwrap().level, NoticeLevel::Info);
    assert!(t.state.current_patient().is_none());

    // Registration form is prefilled with the searched phone
    let mut form: PatientForm = t.state.registration_form();
    assert_eq!(form.phone, "5551234");
    form.first_name = "Asha".into();
    form.last_name = "Rao".into();
    form.sex = Sex::Female;
    form.city = "Pune".into();

    let t = desk.dispatch(t.state, Intent::SavePatient(form));
    assert_eq!(t.notice.as_ref().unwrap().level, NoticeLevel::Success);

    let t = desk.dispatch(t.state, Intent::SyncRemedies);
    assert_eq!(t.state.catalog().len(), 4);

    let t = desk.dispatch(t.state, Intent::EditPrescription("calc".into()));
    let t = desk.dispatch(t.state, Intent::SelectRemedy(1));
    assert_eq!(t.state.draft_prescription(), "Calcarea Carbonica, Hahnemann 200C, ");

    let date = chrono::NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
    let mut visit_form = t.state.visit_form(date);
    visit_form.symptoms.push_str("dry cough");
    let t = desk.dispatch(t.state, Intent::CompleteVisit(visit_form));
    assert_eq!(t.notice.unwrap().message, "Visit saved!");
    assert_eq!(t.state.visit_history().len(), 1);
    assert_eq!(t.state.draft_prescription(), "");

    // The directory saw the same visit
    let stored = directory.records.lock().unwrap()[0].history[0].clone();
    assert_eq!(stored.date, "2024-04-02");
    assert_eq!(stored.symptoms, "2024-04-02; dry cough");
    assert_eq!(stored.prescription, "Calcarea Carbonica, Hahnemann 200C");
}

#[test]
fn test_selecting_unavailable_remedy_changes_nothing() {
    let sheet = SwitchableSheet::default();
    sheet.set(Some(SHEET));
    let desk = desk(MemoryDirectory::default(), sheet);

    let state = desk.dispatch(SessionState::new(), Intent::SyncRemedies).state;
    let state = desk.dispatch(state, Intent::EditPrescription("Aconite 6C, bell".into())).state;

    let t = desk.dispatch(state.clone(), Intent::SelectRemedy(2));
    assert_eq!(t.state, state);
    assert_eq!(t.notice.unwrap().level, NoticeLevel::Warning);
}

#[test]
fn test_failed_sync_keeps_previous_catalog() {
    let sheet = SwitchableSheet::default();
    sheet.set(Some(SHEET));
    let desk = desk(MemoryDirectory::default(), sheet.clone());

    let loaded = desk.dispatch(SessionState::new(), Intent::SyncRemedies).state;
    let fingerprint = loaded.catalog().fingerprint.clone();

    sheet.set(None);
    let t = desk.dispatch(loaded.clone(), Intent::SyncRemedies);
    let notice = t.notice.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.starts_with("Error loading remedies:"));
    assert_eq!(t.state.catalog(), loaded.catalog());
    assert_eq!(t.state.catalog().fingerprint, fingerprint);

    // A sheet without the name column is a load error too
    sheet.set(Some("Potency,BOX Number\n30C,1\n"));
    let t = desk.dispatch(loaded.clone(), Intent::SyncRemedies);
    assert_eq!(t.state.catalog(), loaded.catalog());
}

#[test]
fn test_resync_of_same_sheet_is_reported_unchanged() {
    let sheet = SwitchableSheet::default();
    sheet.set(Some(SHEET));
    let desk = desk(MemoryDirectory::default(), sheet);

    let state = desk.dispatch(SessionState::new(), Intent::SyncRemedies).state;
    let t = desk.dispatch(state, Intent::SyncRemedies);
    assert!(t.notice.unwrap().message.ends_with("(unchanged)"));
}

#[test]
fn test_unconfigured_directory_makes_no_call() {
    let client = HttpDirectoryClient::new(None, 1).unwrap();
    assert!(matches!(
        client.find_patient("5551234"),
        Err(DirectoryError::ConfigurationMissing)
    ));
    assert!(matches!(
        client.save_patient(&asha()),
        Err(DirectoryError::ConfigurationMissing)
    ));

    let desk = FrontDesk::from_config(DeskConfig::default()).unwrap();
    let t = desk.dispatch(SessionState::new(), Intent::Search { phone: "5551234".into() });
    let notice = t.notice.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.message.contains("not configured"));
}

#[test]
fn test_endpoint_entered_mid_session_enables_search() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/exec", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let body = r#"{"status":"success","patient":{"firstName":"Asha","lastName":"Rao","sex":"Female","city":"Pune","phone":"5551234"},"history":[]}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
    });

    let mut desk = FrontDesk::from_config(DeskConfig::default()).unwrap();
    let t = desk.dispatch(SessionState::new(), Intent::Search { phone: "5551234".into() });
    assert_eq!(t.notice.unwrap().level, NoticeLevel::Warning);

    desk.set_directory_endpoint(&url).unwrap();
    assert!(!format!("{:?}", desk.config()).contains(&url));

    let t = desk.dispatch(t.state, Intent::Search { phone: "5551234".into() });
    server.join().unwrap();
    assert_eq!(t.notice.unwrap().level, NoticeLevel::Success);
    assert_eq!(t.state.current_patient(), Some(&asha()));
}

#[test]
fn test_backdated_visit_lands_in_date_order() {
    let directory = MemoryDirectory::with_record(PatientRecord {
        patient: asha(),
        history: vec![visit("2024-03-01", "Aconite 6C"), visit("2024-01-15", "Bryonia 30C")],
    });
    let desk = desk(directory, SwitchableSheet::default());
    let state = desk
        .dispatch(SessionState::new(), Intent::Search { phone: "5551234".into() })
        .state;

    let date = chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let mut form = state.visit_form(date);
    form.set_symptoms("sore throat");
    form.prescription = "Belladonna 30C, ".into();
    let t = desk.dispatch(state, Intent::CompleteVisit(form));
    assert_eq!(t.notice.unwrap().message, "Visit saved!");

    let dates: Vec<_> = t.state.visit_history().iter().map(|v| v.date.clone()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-02-01", "2024-01-15"]);
    assert_eq!(t.state.visit_history()[1].symptoms, "2024-02-01; sore throat");
}

#[test]
fn test_endpoint_is_redacted() {
    let endpoint = DirectoryEndpoint::new("https://script.example/macros/s/SECRET/exec").unwrap();
    let config = DeskConfig::default().with_endpoint(endpoint.expose());
    assert!(!format!("{:?}", endpoint).contains("SECRET"));
    assert!(!format!("{:?}", config).contains("SECRET"));
}

#[test]
fn test_offline_sheet_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SHEET.as_bytes()).unwrap();

    let catalog = remedy_desk_core::load_catalog(&FileCatalogSource, file.path().to_str().unwrap())
        .unwrap();
    assert_eq!(catalog.len(), 4);
    assert_eq!(catalog.available_count(), 3);
    assert_eq!(
        catalog.get(3).and_then(|e| e.name.as_deref()),
        Some("Calcarea Carbonica, Hahnemann")
    );
}
