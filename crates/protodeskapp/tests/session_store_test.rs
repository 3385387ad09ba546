use protodeskapp::session::{Credentials, FileSessionStore, Session, SessionStore};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_session_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = FileSessionStore::new(dir.path().join("session.json"));
    let session = Session::load(&store).unwrap();
    assert!(session.entries().is_empty());
    assert!(session.credentials().is_none());
}

#[test]
fn test_session_survives_reload() {
    let dir = TempDir::new().unwrap();
    let store = FileSessionStore::new(dir.path().join("session.json"));

    let mut session = Session::default();
    session.set_column_width("User", "name", 180.0);
    session.set_credentials(Some(Credentials {
        user: "admin".to_string(),
        pass: "secret".to_string(),
    }));
    session.save(&store).unwrap();

    let reloaded = Session::load(&store).unwrap();
    assert_eq!(reloaded.column_widths("User").get("name"), Some(&180.0));
    assert_eq!(
        reloaded.credentials().map(|c| c.user),
        Some("admin".to_string())
    );
}

#[test]
fn test_logout_removes_credentials_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    let store = FileSessionStore::new(&path);

    let mut session = Session::default();
    session.set_credentials(Some(Credentials {
        user: "admin".to_string(),
        pass: "secret".to_string(),
    }));
    session.save(&store).unwrap();
    session.set_credentials(None);
    session.save(&store).unwrap();

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(!on_disk.contains("secret"));
}

#[test]
fn test_corrupt_session_file_is_discarded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    fs::write(&path, "not json at all").unwrap();

    let store = FileSessionStore::new(&path);
    assert_eq!(store.read().unwrap().as_deref(), Some("not json at all"));
    let session = Session::load(&store).unwrap();
    assert!(session.entries().is_empty());
}
