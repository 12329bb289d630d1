use anyhow::Result;
use fishhunt_types::{
    Buoy, BuoyId, CashoutAccount, CastRecord, Inventory, Key, Player, PlayerId, Rod, RodId,
    Standing, Value,
};
use std::future::Future;

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// The authoritative ledger.
///
/// `apply` must be all-or-nothing: either every change in the batch becomes
/// visible or none does.
pub trait State: Send + Sync {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>> + Send;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>> + Send;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>> + Send;

    /// Position of `player` on the overall XP board, `None` if unknown.
    fn standing(&self, player: &PlayerId)
        -> impl Future<Output = Result<Option<Standing>>> + Send;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> + Send {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    pub fn with_values(values: impl IntoIterator<Item = (Key, Value)>) -> Self {
        Self {
            state: values.into_iter().collect(),
        }
    }
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }

    async fn standing(&self, player: &PlayerId) -> Result<Option<Standing>> {
        let players: Vec<Player> = self
            .state
            .values()
            .filter_map(|value| match value {
                Value::Player(player) => Some(player.clone()),
                _ => None,
            })
            .collect();
        Ok(Standing::rank(&players, player))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

pub(crate) async fn load_buoy<S: State>(state: &S, id: &BuoyId) -> Result<Option<Buoy>> {
    Ok(match state.get(&Key::Buoy(id.clone())).await? {
        Some(Value::Buoy(buoy)) => Some(buoy),
        _ => None,
    })
}

pub(crate) async fn load_rod<S: State>(state: &S, id: &RodId) -> Result<Option<Rod>> {
    Ok(match state.get(&Key::Rod(id.clone())).await? {
        Some(Value::Rod(rod)) => Some(rod),
        _ => None,
    })
}

pub(crate) async fn load_player<S: State>(state: &S, id: &PlayerId) -> Result<Option<Player>> {
    Ok(match state.get(&Key::Player(id.clone())).await? {
        Some(Value::Player(player)) => Some(player),
        _ => None,
    })
}

pub(crate) async fn load_cashout<S: State>(
    state: &S,
    id: &PlayerId,
) -> Result<Option<CashoutAccount>> {
    Ok(match state.get(&Key::Cashout(id.clone())).await? {
        Some(Value::Cashout(account)) => Some(account),
        _ => None,
    })
}

/// Inventories are plain counters, so a missing row reads as an empty one.
pub(crate) async fn load_inventory<S: State>(state: &S, id: &PlayerId) -> Result<Inventory> {
    Ok(match state.get(&Key::Inventory(id.clone())).await? {
        Some(Value::Inventory(inventory)) => inventory,
        _ => Inventory::new(id.clone()),
    })
}

/// Cast records are created lazily, so a missing row reads as a fresh one.
pub(crate) async fn load_cast_record<S: State>(
    state: &S,
    buoy: &BuoyId,
    actor: &PlayerId,
) -> Result<(CastRecord, bool)> {
    Ok(
        match state
            .get(&Key::CastRecord(buoy.clone(), actor.clone()))
            .await?
        {
            Some(Value::CastRecord(record)) => (record, true),
            _ => (CastRecord::default(), false),
        },
    )
}
