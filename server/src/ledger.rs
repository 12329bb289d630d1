//! SQLite-backed ledger.
//!
//! Each entity lives in its own table. Batches from [`State::apply`] run in a
//! single SQLite transaction, and the `CHECK` constraints on balances refuse
//! any write that would make one negative.

use anyhow::{anyhow, bail, Context, Result};
use fishhunt_execution::{State, Status};
use fishhunt_types::{
    Buoy, CashoutAccount, CastRecord, ColorTaxClass, Inventory, Key, Player, PlayerId, Rival,
    Rod, RodTier, Standing, Value, WormTier,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Entities loaded into the ledger at startup.
#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub buoys: Vec<Buoy>,
    #[serde(default)]
    pub rods: Vec<Rod>,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl Fixtures {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("parse fixtures")
    }
}

pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("open ledger db")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory ledger db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema_sqlite(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Writes every fixture entity the ledger does not hold yet, in one
    /// transaction. New players also get a fresh cashout account. Existing
    /// rows are left alone so restarting with the same fixtures keeps
    /// balances. Returns how many entities were written.
    pub async fn register(&mut self, fixtures: Fixtures, now_ms: u64) -> Result<usize> {
        let mut changes = Vec::new();
        for buoy in fixtures.buoys {
            let key = Key::Buoy(buoy.id.clone());
            if self.get(&key).await?.is_none() {
                changes.push((key, Status::Update(Value::Buoy(buoy))));
            }
        }
        for rod in fixtures.rods {
            let key = Key::Rod(rod.id.clone());
            if self.get(&key).await?.is_none() {
                changes.push((key, Status::Update(Value::Rod(rod))));
            }
        }
        for player in fixtures.players {
            let key = Key::Player(player.id.clone());
            if self.get(&key).await?.is_some() {
                continue;
            }
            let account = CashoutAccount::new(player.id.clone(), now_ms);
            changes.push((
                Key::Cashout(player.id.clone()),
                Status::Update(Value::Cashout(account)),
            ));
            changes.push((key, Status::Update(Value::Player(player))));
        }
        let written = changes.len();
        self.apply(changes).await?;
        Ok(written)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("ledger connection poisoned"))
    }
}

impl State for SqliteLedger {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        let conn = self.conn()?;
        read_value(&conn, key)
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        let conn = self.conn()?;
        write_value(&conn, &key, &value)
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        let conn = self.conn()?;
        delete_value(&conn, key)
    }

    async fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin ledger transaction")?;
        for (key, status) in &changes {
            match status {
                Status::Update(value) => write_value(&tx, key, value)?,
                Status::Delete => delete_value(&tx, key)?,
            }
        }
        tx.commit().context("commit ledger transaction")?;
        Ok(())
    }

    async fn standing(&self, player: &PlayerId) -> Result<Option<Standing>> {
        let conn = self.conn()?;
        read_standing(&conn, player)
    }
}

/// Rank, xp and nearest rival above. Ties above resolve to the smallest username.
const STANDING_SQL: &str = "
    WITH board AS (
        SELECT username, display_name, xp, RANK() OVER (ORDER BY xp DESC) AS rank
        FROM players
    )
    SELECT me.rank, me.xp, above.display_name, above.rank, above.xp
    FROM board me
    LEFT JOIN board above ON above.username = (
        SELECT username FROM board
        WHERE xp > me.xp
        ORDER BY xp ASC, username ASC
        LIMIT 1
    )
    WHERE me.username = ?";

fn read_standing(conn: &Connection, player: &PlayerId) -> Result<Option<Standing>> {
    let row = conn
        .query_row(STANDING_SQL, params![player.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })
        .optional()
        .context("read standing")?;
    Ok(row.map(|(rank, xp, name, rival_rank, rival_xp)| {
        let above = match (name, rival_rank, rival_xp) {
            (Some(display_name), Some(rival_rank), Some(rival_xp)) => Some(Rival {
                display_name,
                rank: rival_rank as u64,
                xp_gap: (rival_xp - xp) as u64,
            }),
            _ => None,
        };
        Standing {
            rank: rank as u64,
            xp: xp as u64,
            above,
        }
    }))
}

fn init_schema_sqlite(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS buoys (
             buoy_id TEXT PRIMARY KEY,
             balance REAL NOT NULL CHECK (balance >= 0),
             fishpot REAL NOT NULL DEFAULT 0 CHECK (fishpot >= 0),
             location_name TEXT NOT NULL,
             multiplier REAL NOT NULL DEFAULT 1,
             color TEXT NOT NULL DEFAULT 'blue'
         );
         CREATE TABLE IF NOT EXISTS rods (
             rod_id TEXT PRIMARY KEY,
             owner TEXT NOT NULL,
             small_worms INTEGER NOT NULL DEFAULT 100,
             tasty_worms INTEGER NOT NULL DEFAULT 0,
             enchanted_worms INTEGER NOT NULL DEFAULT 0,
             magic_worms INTEGER NOT NULL DEFAULT 0,
             alacrity_charges INTEGER NOT NULL DEFAULT 0,
             rod_tier INTEGER NOT NULL DEFAULT 1,
             selected_worm INTEGER NOT NULL DEFAULT 1
         );
         CREATE TABLE IF NOT EXISTS players (
             username TEXT PRIMARY KEY,
             display_name TEXT NOT NULL,
             xp INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE IF NOT EXISTS cashout_accounts (
             username TEXT PRIMARY KEY,
             balance REAL NOT NULL DEFAULT 0 CHECK (balance >= 0),
             budget REAL NOT NULL CHECK (budget >= 0),
             last_major_cashout_ms INTEGER NOT NULL,
             max_value REAL NOT NULL
         );
         CREATE TABLE IF NOT EXISTS inventories (
             username TEXT PRIMARY KEY,
             gold INTEGER NOT NULL DEFAULT 0,
             fish INTEGER NOT NULL DEFAULT 0,
             powder INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE IF NOT EXISTS buoy_casts (
             buoy_id TEXT NOT NULL,
             username TEXT NOT NULL,
             casts INTEGER NOT NULL DEFAULT 0,
             last_spook_ms INTEGER,
             PRIMARY KEY (buoy_id, username)
         );",
    )
    .context("init ledger schema")?;
    Ok(())
}

fn read_value(conn: &Connection, key: &Key) -> Result<Option<Value>> {
    let value = match key {
        Key::Buoy(id) => conn
            .query_row(
                "SELECT balance, fishpot, location_name, multiplier, color
                 FROM buoys WHERE buoy_id = ?",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("read buoy")?
            .map(|(balance, fishpot, location_name, multiplier, color)| {
                Ok::<_, anyhow::Error>(Value::Buoy(Buoy {
                    id: id.clone(),
                    balance,
                    fishpot,
                    location_name,
                    multiplier,
                    color: color.parse::<ColorTaxClass>()?,
                }))
            })
            .transpose()?,
        Key::Rod(id) => conn
            .query_row(
                "SELECT owner, small_worms, tasty_worms, enchanted_worms, magic_worms,
                        alacrity_charges, rod_tier, selected_worm
                 FROM rods WHERE rod_id = ?",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        [
                            row.get::<_, u32>(1)?,
                            row.get::<_, u32>(2)?,
                            row.get::<_, u32>(3)?,
                            row.get::<_, u32>(4)?,
                        ],
                        row.get::<_, u32>(5)?,
                        row.get::<_, u8>(6)?,
                        row.get::<_, u8>(7)?,
                    ))
                },
            )
            .optional()
            .context("read rod")?
            .map(|(owner, worms, alacrity_charges, tier, selected)| {
                Ok::<_, anyhow::Error>(Value::Rod(Rod {
                    id: id.clone(),
                    owner: PlayerId::new(owner),
                    worms,
                    alacrity_charges,
                    tier: RodTier::from_code(tier)?,
                    selected_worm: WormTier::from_code(selected)?,
                }))
            })
            .transpose()?,
        Key::Player(id) => conn
            .query_row(
                "SELECT display_name, xp FROM players WHERE username = ?",
                params![id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .context("read player")?
            .map(|(display_name, xp)| {
                Value::Player(Player {
                    id: id.clone(),
                    username: id.to_string(),
                    display_name,
                    xp: xp as u64,
                })
            }),
        Key::Cashout(id) => conn
            .query_row(
                "SELECT balance, budget, last_major_cashout_ms, max_value
                 FROM cashout_accounts WHERE username = ?",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, f64>(3)?,
                    ))
                },
            )
            .optional()
            .context("read cashout account")?
            .map(|(balance, budget, last_major, max_value)| {
                Value::Cashout(CashoutAccount {
                    player: id.clone(),
                    balance,
                    budget,
                    last_major_cashout_ms: last_major as u64,
                    max_value,
                })
            }),
        Key::Inventory(id) => conn
            .query_row(
                "SELECT gold, fish, powder FROM inventories WHERE username = ?",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .context("read inventory")?
            .map(|(gold, fish, powder)| {
                Value::Inventory(Inventory {
                    player: id.clone(),
                    gold: gold as u64,
                    fish: fish as u64,
                    powder: powder as u64,
                })
            }),
        Key::CastRecord(buoy, player) => conn
            .query_row(
                "SELECT casts, last_spook_ms FROM buoy_casts
                 WHERE buoy_id = ? AND username = ?",
                params![buoy.as_str(), player.as_str()],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()
            .context("read cast record")?
            .map(|(casts, last_spook)| {
                Value::CastRecord(CastRecord {
                    casts,
                    last_spook_ms: last_spook.map(|at| at as u64),
                })
            }),
    };
    Ok(value)
}

fn write_value(conn: &Connection, key: &Key, value: &Value) -> Result<()> {
    match (key, value) {
        (Key::Buoy(id), Value::Buoy(buoy)) => {
            ensure_id(id.as_str(), buoy.id.as_str())?;
            conn.execute(
                "INSERT OR REPLACE INTO buoys
                     (buoy_id, balance, fishpot, location_name, multiplier, color)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    id.as_str(),
                    buoy.balance,
                    buoy.fishpot,
                    buoy.location_name,
                    buoy.multiplier,
                    buoy.color.as_str()
                ],
            )
            .context("write buoy")?;
        }
        (Key::Rod(id), Value::Rod(rod)) => {
            ensure_id(id.as_str(), rod.id.as_str())?;
            conn.execute(
                "INSERT OR REPLACE INTO rods
                     (rod_id, owner, small_worms, tasty_worms, enchanted_worms, magic_worms,
                      alacrity_charges, rod_tier, selected_worm)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id.as_str(),
                    rod.owner.as_str(),
                    rod.worms[0],
                    rod.worms[1],
                    rod.worms[2],
                    rod.worms[3],
                    rod.alacrity_charges,
                    rod.tier.code(),
                    rod.selected_worm.code()
                ],
            )
            .context("write rod")?;
        }
        (Key::Player(id), Value::Player(player)) => {
            ensure_id(id.as_str(), player.id.as_str())?;
            conn.execute(
                "INSERT OR REPLACE INTO players (username, display_name, xp) VALUES (?, ?, ?)",
                params![id.as_str(), player.display_name, to_sql_int(player.xp)?],
            )
            .context("write player")?;
        }
        (Key::Cashout(id), Value::Cashout(account)) => {
            ensure_id(id.as_str(), account.player.as_str())?;
            conn.execute(
                "INSERT OR REPLACE INTO cashout_accounts
                     (username, balance, budget, last_major_cashout_ms, max_value)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    id.as_str(),
                    account.balance,
                    account.budget,
                    to_sql_int(account.last_major_cashout_ms)?,
                    account.max_value
                ],
            )
            .context("write cashout account")?;
        }
        (Key::Inventory(id), Value::Inventory(inventory)) => {
            ensure_id(id.as_str(), inventory.player.as_str())?;
            conn.execute(
                "INSERT OR REPLACE INTO inventories (username, gold, fish, powder)
                 VALUES (?, ?, ?, ?)",
                params![
                    id.as_str(),
                    to_sql_int(inventory.gold)?,
                    to_sql_int(inventory.fish)?,
                    to_sql_int(inventory.powder)?
                ],
            )
            .context("write inventory")?;
        }
        (Key::CastRecord(buoy, player), Value::CastRecord(record)) => {
            let last_spook = record.last_spook_ms.map(to_sql_int).transpose()?;
            conn.execute(
                "INSERT OR REPLACE INTO buoy_casts (buoy_id, username, casts, last_spook_ms)
                 VALUES (?, ?, ?, ?)",
                params![buoy.as_str(), player.as_str(), record.casts, last_spook],
            )
            .context("write cast record")?;
        }
        (key, _) => bail!("value does not match key {key:?}"),
    }
    Ok(())
}

fn delete_value(conn: &Connection, key: &Key) -> Result<()> {
    let deleted = match key {
        Key::Buoy(id) => conn.execute("DELETE FROM buoys WHERE buoy_id = ?", params![id.as_str()]),
        Key::Rod(id) => conn.execute("DELETE FROM rods WHERE rod_id = ?", params![id.as_str()]),
        Key::Player(id) => {
            conn.execute("DELETE FROM players WHERE username = ?", params![id.as_str()])
        }
        Key::Cashout(id) => conn.execute(
            "DELETE FROM cashout_accounts WHERE username = ?",
            params![id.as_str()],
        ),
        Key::Inventory(id) => conn.execute(
            "DELETE FROM inventories WHERE username = ?",
            params![id.as_str()],
        ),
        Key::CastRecord(buoy, player) => conn.execute(
            "DELETE FROM buoy_casts WHERE buoy_id = ? AND username = ?",
            params![buoy.as_str(), player.as_str()],
        ),
    };
    deleted.with_context(|| format!("delete {key:?}"))?;
    Ok(())
}

fn ensure_id(key: &str, value: &str) -> Result<()> {
    if key != value {
        bail!("key {key:?} does not match entity id {value:?}");
    }
    Ok(())
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{value} does not fit in an sqlite integer"))
}
