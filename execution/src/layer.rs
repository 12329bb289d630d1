use anyhow::Result;
use fishhunt_types::{Key, PlayerId, Standing, Value};
use std::collections::BTreeMap;

use crate::state::{State, Status};

/// A staging overlay over the ledger.
///
/// Reads fall through to the underlying state unless the key was written in
/// this layer. Nothing reaches the ledger until [`Layer::commit`] hands the
/// change set to [`State::apply`]; dropping the layer discards every staged
/// write, which is how a failed settlement rolls back.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),
        }
    }

    pub fn stage(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.stage(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }

    /// Ranks against committed state only; staged xp is not visible.
    async fn standing(&self, player: &PlayerId) -> Result<Option<Standing>> {
        self.state.standing(player).await
    }
}
