use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::error::IdentityError;

const LOG_TARGET: &str = "conclave_identity::rws";

/// Reader/Writer/Granter set attached to one target principal. Mutation is
/// restricted to granters of the target (or the kernel, which is an
/// implicit granter over every RWS).
#[derive(Debug, Clone, Default)]
pub struct Rws {
    target: Uuid,
    readers: HashSet<Uuid>,
    writers: HashSet<Uuid>,
    granters: HashSet<Uuid>,
}

impl Rws {
    pub fn new(target: Uuid) -> Self {
        Self { target, readers: HashSet::new(), writers: HashSet::new(), granters: HashSet::new() }
    }

    pub fn target(&self) -> Uuid {
        self.target
    }

    fn require_granter(&self, actor: Uuid, kernel: Uuid) -> Result<(), IdentityError> {
        if actor == kernel || self.granters.contains(&actor) {
            Ok(())
        } else {
            debug!(target: LOG_TARGET, %actor, target = %self.target, "mutation rejected, actor is not a granter");
            Err(IdentityError::NotGranter { actor, target: self.target })
        }
    }

    pub fn add_reader(&mut self, actor: Uuid, kernel: Uuid, reader: Uuid) -> Result<(), IdentityError> {
        self.require_granter(actor, kernel)?;
        self.readers.insert(reader);
        Ok(())
    }

    pub fn remove_reader(&mut self, actor: Uuid, kernel: Uuid, reader: Uuid) -> Result<(), IdentityError> {
        self.require_granter(actor, kernel)?;
        self.readers.remove(&reader);
        Ok(())
    }

    pub fn add_writer(&mut self, actor: Uuid, kernel: Uuid, writer: Uuid) -> Result<(), IdentityError> {
        self.require_granter(actor, kernel)?;
        self.writers.insert(writer);
        Ok(())
    }

    pub fn remove_writer(&mut self, actor: Uuid, kernel: Uuid, writer: Uuid) -> Result<(), IdentityError> {
        self.require_granter(actor, kernel)?;
        self.writers.remove(&writer);
        Ok(())
    }

    pub fn add_granter(&mut self, actor: Uuid, kernel: Uuid, granter: Uuid) -> Result<(), IdentityError> {
        self.require_granter(actor, kernel)?;
        self.granters.insert(granter);
        Ok(())
    }

    pub fn remove_granter(&mut self, actor: Uuid, kernel: Uuid, granter: Uuid) -> Result<(), IdentityError> {
        self.require_granter(actor, kernel)?;
        self.granters.remove(&granter);
        Ok(())
    }

    pub fn can_read(&self, pkr: Uuid) -> bool {
        self.readers.contains(&pkr)
    }

    pub fn can_write(&self, pkr: Uuid) -> bool {
        self.writers.contains(&pkr)
    }

    pub fn can_grant(&self, pkr: Uuid) -> bool {
        self.granters.contains(&pkr)
    }
}
