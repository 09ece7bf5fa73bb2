//! In-memory `RemoteStore`
//!
//! Behaves like the real store in the ways that matter: names are not unique,
//! lookups return the first match, ids are opaque.

use std::collections::HashSet;
use std::sync::Mutex;

use instrec_backup::remote::{RemoteError, RemoteResult, RemoteStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
    pub is_folder: bool,
    pub content: Vec<u8>,
    pub revisions: usize,
}

#[derive(Default)]
struct StoreState {
    objects: Vec<RemoteObject>,
    next_id: usize,
    failing_uploads: HashSet<String>,
    revoked: bool,
    creates: usize,
    updates: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads of files with this name fail with a server error
    pub fn fail_uploads_named(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(name.to_string());
    }

    /// Every later call fails as if the token had been revoked
    pub fn revoke_access(&self) {
        self.state.lock().unwrap().revoked = true;
    }

    fn check_access(&self) -> RemoteResult<()> {
        if self.state.lock().unwrap().revoked {
            return Err(RemoteError::Auth("token revoked".into()));
        }
        Ok(())
    }

    pub fn objects(&self) -> Vec<RemoteObject> {
        self.state.lock().unwrap().objects.clone()
    }

    pub fn files(&self) -> Vec<RemoteObject> {
        self.objects().into_iter().filter(|o| !o.is_folder).collect()
    }

    pub fn folders(&self) -> Vec<RemoteObject> {
        self.objects().into_iter().filter(|o| o.is_folder).collect()
    }

    pub fn files_in(&self, parent: &str) -> Vec<RemoteObject> {
        self.files()
            .into_iter()
            .filter(|o| o.parent.as_deref() == Some(parent))
            .collect()
    }

    pub fn folder_named(&self, name: &str) -> Option<RemoteObject> {
        self.folders().into_iter().find(|o| o.name == name)
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn update_count(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    fn insert(&self, name: &str, parent: Option<&str>, is_folder: bool, content: Vec<u8>) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("obj-{}", state.next_id);
        state.objects.push(RemoteObject {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
            is_folder,
            content,
            revisions: 1,
        });
        id
    }

    fn find(&self, name: &str, parent: Option<&str>, is_folder: bool) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .find(|o| o.name == name && o.parent.as_deref() == parent && o.is_folder == is_folder)
            .map(|o| o.id.clone())
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn find_folder(&self, name: &str, parent: Option<&str>) -> RemoteResult<Option<String>> {
        self.check_access()?;
        Ok(self.find(name, parent, true))
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> RemoteResult<String> {
        self.check_access()?;
        Ok(self.insert(name, parent, true, Vec::new()))
    }

    async fn find_file(&self, name: &str, parent: &str) -> RemoteResult<Option<String>> {
        self.check_access()?;
        Ok(self.find(name, Some(parent), false))
    }

    async fn create_file(&self, name: &str, parent: &str, content: Vec<u8>) -> RemoteResult<String> {
        self.check_access()?;
        if self.state.lock().unwrap().failing_uploads.contains(name) {
            return Err(RemoteError::Api(500, format!("upload of {} rejected", name)));
        }
        self.state.lock().unwrap().creates += 1;
        Ok(self.insert(name, Some(parent), false, content))
    }

    async fn update_file(&self, id: &str, content: Vec<u8>) -> RemoteResult<()> {
        self.check_access()?;
        let mut state = self.state.lock().unwrap();
        let failing = state.failing_uploads.clone();
        let object = state
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| RemoteError::Api(404, format!("no object {}", id)))?;

        if failing.contains(&object.name) {
            return Err(RemoteError::Api(500, format!("upload of {} rejected", object.name)));
        }

        object.content = content;
        object.revisions += 1;
        state.updates += 1;
        Ok(())
    }
}
