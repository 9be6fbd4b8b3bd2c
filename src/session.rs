//! Form sessions
//!
//! A session owns at most one loaded form. Loads and saves are
//! single-flight: a second request while one is running is refused rather
//! than queued.

use crate::bridge::{load_document, LoadedForm, SavedDocument};
use crate::error::{Error, Result};
use crate::form::{ControlState, FormDocument};
use crate::pdf::AcroForm;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// One client's editing session
#[derive(Debug)]
pub struct FormSession<D = AcroForm> {
    id: String,
    generation: u64,
    source_name: Option<String>,
    form: Option<LoadedForm<D>>,
}

impl<D: FormDocument> FormSession<D> {
    pub fn new(id: String) -> Self {
        Self {
            id,
            generation: 0,
            source_name: None,
            form: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Incremented on every load attempt
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn form(&self) -> Option<&LoadedForm<D>> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut LoadedForm<D>> {
        self.form.as_mut()
    }

    /// Replace the loaded form with whatever `loader` produces.
    ///
    /// The previous form is dropped and the generation bumped before the
    /// loader runs, so a failed load never leaves the old form reachable.
    pub fn load_with<F>(&mut self, source_name: String, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<LoadedForm<D>>,
    {
        self.form = None;
        self.generation += 1;
        self.source_name = Some(source_name);

        let form = loader()?;
        self.form = Some(form);
        Ok(())
    }

    /// Apply `controls` built against `generation` and serialize.
    pub fn save(&mut self, generation: u64, controls: &[ControlState]) -> Result<SavedDocument> {
        let current = self.generation;
        let form = self.form.as_mut().ok_or(Error::NoDocumentLoaded)?;
        if generation != current {
            return Err(Error::StaleForm {
                submitted: generation,
                current,
            });
        }
        form.save(controls)
    }
}

impl FormSession<AcroForm> {
    /// Parse `data` and make it the session's form
    pub fn load(&mut self, data: &[u8], password: Option<&str>, source_name: String) -> Result<()> {
        self.load_with(source_name, || load_document(data, password))
    }
}

pub type SharedSession = Arc<tokio::sync::Mutex<FormSession>>;

/// Live sessions, least recently used evicted first
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SharedSession>>,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Open a new empty session
    pub fn create(&self) -> (String, SharedSession) {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(tokio::sync::Mutex::new(FormSession::new(id.clone())));

        if let Some((evicted, _)) = self.sessions.lock().push(id.clone(), session.clone()) {
            tracing::info!(session = %evicted, "evicted least recently used session");
        }
        tracing::debug!(session = %id, "session created");
        (id, session)
    }

    pub fn get(&self, id: &str) -> Result<SharedSession> {
        self.sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound { id: id.to_string() })
    }

    /// Reuse the named session, or open a new one when no id is given
    pub fn get_or_create(&self, id: Option<&str>) -> Result<(String, SharedSession)> {
        match id {
            Some(id) => Ok((id.to_string(), self.get(id)?)),
            None => Ok(self.create()),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.lock().pop(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Take the session for a load or save, refusing if one is running
    pub fn acquire(id: &str, session: &SharedSession) -> Result<OwnedMutexGuard<FormSession>> {
        session
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::SessionBusy { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::fake::{FakeDocument, FakeField};
    use crate::form::InputKind;

    fn fake_form(value: &str) -> Result<LoadedForm<FakeDocument>> {
        LoadedForm::from_document(FakeDocument::new(vec![FakeField::text("Name", Some(value))]))
    }

    fn text_control(value: &str) -> ControlState {
        ControlState {
            field_index: 0,
            input: InputKind::Text,
            value: value.to_string(),
            checked: false,
        }
    }

    #[test]
    fn test_load_bumps_generation() {
        let mut session = FormSession::<FakeDocument>::new("s".into());
        assert_eq!(session.generation(), 0);

        session.load_with("a.pdf".into(), || fake_form("Alice")).unwrap();
        assert_eq!(session.generation(), 1);
        assert_eq!(session.source_name(), Some("a.pdf"));

        session.load_with("b.pdf".into(), || fake_form("Bob")).unwrap();
        assert_eq!(session.generation(), 2);
        let records = session.form().unwrap().records();
        assert_eq!(records[0].value.as_text(), Some("Bob"));
    }

    #[test]
    fn test_failed_load_discards_previous_form() {
        let mut session = FormSession::<FakeDocument>::new("s".into());
        session.load_with("a.pdf".into(), || fake_form("Alice")).unwrap();

        let err = session
            .load_with("bad.pdf".into(), || {
                Err(Error::InvalidPdf {
                    reason: "truncated".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPdf { .. }));
        assert!(session.form().is_none());
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_save_without_form() {
        let mut session = FormSession::<FakeDocument>::new("s".into());
        let err = session.save(0, &[]).unwrap_err();
        assert!(matches!(err, Error::NoDocumentLoaded));
    }

    #[test]
    fn test_save_against_old_generation_is_stale() {
        let mut session = FormSession::<FakeDocument>::new("s".into());
        session.load_with("a.pdf".into(), || fake_form("Alice")).unwrap();
        session.load_with("a.pdf".into(), || fake_form("Alice")).unwrap();

        let err = session.save(1, &[text_control("Bob")]).unwrap_err();
        assert!(matches!(
            err,
            Error::StaleForm {
                submitted: 1,
                current: 2
            }
        ));

        let saved = session.save(2, &[text_control("Bob")]).unwrap();
        assert_eq!(saved.report.written, vec![0]);
    }

    #[test]
    fn test_store_create_get_remove() {
        let store = SessionStore::new(4);
        let (id, _) = store.create();
        assert!(store.get(&id).is_ok());
        assert!(store.remove(&id));
        assert!(matches!(store.get(&id), Err(Error::SessionNotFound { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_evicts_least_recently_used() {
        let store = SessionStore::new(2);
        let (first, _) = store.create();
        let (second, _) = store.create();
        store.get(&first).unwrap();
        let (third, _) = store.create();

        assert!(store.get(&first).is_ok());
        assert!(store.get(&second).is_err());
        assert!(store.get(&third).is_ok());
    }

    #[test]
    fn test_get_or_create_unknown_id() {
        let store = SessionStore::new(2);
        assert!(matches!(
            store.get_or_create(Some("missing")),
            Err(Error::SessionNotFound { .. })
        ));
        let (id, _) = store.get_or_create(None).unwrap();
        assert_eq!(store.get_or_create(Some(&id)).unwrap().0, id);
    }

    #[tokio::test]
    async fn test_acquire_is_single_flight() {
        let store = SessionStore::new(2);
        let (id, session) = store.create();

        let guard = SessionStore::acquire(&id, &session).unwrap();
        assert!(matches!(
            SessionStore::acquire(&id, &session),
            Err(Error::SessionBusy { .. })
        ));

        drop(guard);
        assert!(SessionStore::acquire(&id, &session).is_ok());
    }
}
