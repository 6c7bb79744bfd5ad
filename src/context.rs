use crate::{browser::Browser, identity::Identity};

pub struct SessionContext {
    pub identity: Identity,
    pub browser: Box<dyn Browser>,
}

impl SessionContext {
    pub fn new(identity: Identity, browser: Box<dyn Browser>) -> Self {
        Self { identity, browser }
    }
}
