use crate::{
    session::{
        PlayTarget,
        Session,
    },
    session_store::SessionStore,
};
use std::sync::{
    Arc,
    Mutex,
};

#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    session: Arc<Mutex<Option<Session>>>,
    target: Arc<Mutex<Option<PlayTarget>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Arc<Mutex<Option<Session>>> {
        self.session.clone()
    }

    pub fn target(&self) -> Arc<Mutex<Option<PlayTarget>>> {
        self.target.clone()
    }
}

impl SessionStore for InMemorySessionStore {
    fn save(&mut self, session: &Session) -> crate::Result<()> {
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn load(&self) -> crate::Result<Option<Session>> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn clear(&mut self) -> crate::Result<()> {
        *self.session.lock().unwrap() = None;
        *self.target.lock().unwrap() = None;
        Ok(())
    }

    fn save_target(&mut self, target: &PlayTarget) -> crate::Result<()> {
        *self.target.lock().unwrap() = Some(target.clone());
        Ok(())
    }

    fn load_target(&self) -> crate::Result<Option<PlayTarget>> {
        Ok(self.target.lock().unwrap().clone())
    }
}
