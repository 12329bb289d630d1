use fishhunt_types::{BuoyId, Key, PlayerId, RodId, Value, WormTier};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    admission::{mark_exhausted, refresh_cadence, sync_counter, try_admit, Admission},
    cache::CastCache,
    cashout,
    clock::Clock,
    config::EconomyConfig,
    jackpot::maybe_trigger_jackpot,
    layer::Layer,
    outcome::{CashoutOutcome, CastOutcome, EngineError, Rejection},
    reward::draw_fish,
    settlement::settle,
    state::{load_buoy, load_player, load_rod, State},
};

/// Sequences admission, jackpot, reward and settlement for casts, and runs
/// cashouts, against an injected ledger and cache.
///
/// Every operation holds the ledger lock from its first read to its commit,
/// so two requests can never both spend the last funds of a buoy or the last
/// slot before the cast limit.
pub struct Engine<S: State, C: CastCache> {
    state: Mutex<S>,
    cache: C,
    clock: Arc<dyn Clock>,
    config: EconomyConfig,
}

fn require(field: &'static str, blank: bool) -> Result<(), EngineError> {
    if blank {
        return Err(EngineError::Validation(format!("missing {field}")));
    }
    Ok(())
}

impl<S: State, C: CastCache> Engine<S, C> {
    pub fn new(state: S, cache: C, clock: Arc<dyn Clock>, config: EconomyConfig) -> Self {
        Self {
            state: Mutex::new(state),
            cache,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub async fn cast<R: Rng + Send + ?Sized>(
        &self,
        buoy_id: &BuoyId,
        rod_id: &RodId,
        actor: &PlayerId,
        rng: &mut R,
    ) -> Result<CastOutcome, EngineError> {
        require("buoy", buoy_id.is_blank())?;
        require("rod", rod_id.is_blank())?;
        require("player", actor.is_blank())?;

        let mut state = self.state.lock().await;
        let now_ms = self.clock.now_ms();

        let buoy = load_buoy(&*state, buoy_id)
            .await?
            .ok_or(EngineError::UnknownBuoy)?;
        let rod = load_rod(&*state, rod_id)
            .await?
            .ok_or(EngineError::UnknownRod)?;
        if !rod.is_owned_by(actor) {
            return Err(EngineError::RodNotOwned);
        }
        if load_player(&*state, actor).await?.is_none() {
            return Err(EngineError::UnknownPlayer);
        }

        let admission = try_admit(
            &mut *state,
            &self.cache,
            &self.config,
            buoy_id,
            rod_id,
            actor,
            now_ms,
        )
        .await?;
        if let Admission::Rejected(rejection) = admission {
            return Ok(CastOutcome::Rejected(rejection));
        }

        if let Some(payout) =
            maybe_trigger_jackpot(&mut *state, &self.config, buoy_id, actor, now_ms, rng).await?
        {
            refresh_cadence(&self.cache, &self.config, buoy_id, &rod).await;
            return Ok(CastOutcome::JackpotPaid(payout));
        }

        let fish = draw_fish(&self.config.catalog, buoy.multiplier, rng).ok_or_else(|| {
            EngineError::Validation("fish catalog has nothing to catch".to_string())
        })?;
        debug!(buoy = %buoy_id, %actor, fish = %fish.name, value = fish.multiplied_value(), "fish drawn");

        let outcome = settle(
            &mut *state,
            &self.config,
            buoy_id,
            rod_id,
            actor,
            fish,
            now_ms,
            rng,
        )
        .await?;
        match &outcome {
            CastOutcome::Settled(result) => {
                refresh_cadence(&self.cache, &self.config, buoy_id, &rod).await;
                sync_counter(&self.cache, &self.config, buoy_id, rod_id, actor, result.casts).await;
                if result.casts >= self.config.cast_limit {
                    info!(buoy = %buoy_id, %actor, casts = result.casts, "cast limit reached, pair spooked");
                }
            }
            CastOutcome::Rejected(Rejection::SpookCooldown { .. }) => {
                mark_exhausted(&self.cache, &self.config, buoy_id, rod_id, actor).await;
            }
            _ => {}
        }
        Ok(outcome)
    }

    pub async fn cashout(&self, player: &PlayerId) -> Result<CashoutOutcome, EngineError> {
        require("player", player.is_blank())?;
        let mut state = self.state.lock().await;
        let now_ms = self.clock.now_ms();
        cashout::cashout(&mut *state, player, now_ms, self.config.cashout_window_ms).await
    }

    /// Whether `player` is the registered owner of `rod`.
    pub async fn authenticate(&self, rod: &RodId, player: &PlayerId) -> Result<bool, EngineError> {
        require("rod", rod.is_blank())?;
        require("player", player.is_blank())?;
        let state = self.state.lock().await;
        let rod = load_rod(&*state, rod)
            .await?
            .ok_or(EngineError::UnknownRod)?;
        Ok(rod.is_owned_by(player))
    }

    /// Credits an external deposit to a buoy after its color tax. Returns
    /// the amount actually credited.
    pub async fn deposit(&self, buoy_id: &BuoyId, gross: f64) -> Result<f64, EngineError> {
        require("buoy", buoy_id.is_blank())?;
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let mut buoy = load_buoy(&layer, buoy_id)
            .await?
            .ok_or(EngineError::UnknownBuoy)?;
        let credited = buoy
            .deposit(gross)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let balance = buoy.balance;
        layer.stage(Key::Buoy(buoy_id.clone()), Value::Buoy(buoy));
        let changes = layer.commit();
        state.apply(changes).await?;
        info!(buoy = %buoy_id, gross, credited, balance, "buoy deposit");
        Ok(credited)
    }

    /// Adds purchased worms to a rod. Returns the new count for that tier.
    pub async fn add_worms(
        &self,
        rod_id: &RodId,
        tier: WormTier,
        count: u32,
    ) -> Result<u32, EngineError> {
        require("rod", rod_id.is_blank())?;
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let mut rod = load_rod(&layer, rod_id)
            .await?
            .ok_or(EngineError::UnknownRod)?;
        rod.add_worms(tier, count);
        let total = rod.worms(tier);
        layer.stage(Key::Rod(rod_id.clone()), Value::Rod(rod));
        let changes = layer.commit();
        state.apply(changes).await?;
        debug!(rod = %rod_id, %tier, count, total, "worms added");
        Ok(total)
    }

    /// Reads one ledger entry.
    pub async fn get(&self, key: &Key) -> Result<Option<Value>, EngineError> {
        let state = self.state.lock().await;
        Ok(state.get(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{counter_key, CounterEntry};
    use crate::config::SpookRearm;
    use crate::mocks::{ManualClock, MemoryCache, World};
    use crate::state::Memory;
    use fishhunt_types::{
        Buoy, CashoutAccount, CastRecord, ColorTaxClass, FishCatalog, FishEntry, Player, Rod,
    };
    use rand::{rngs::StdRng, SeedableRng};
    use std::time::Duration;

    const HOUR_MS: u64 = 60 * 60 * 1000;
    const DAY_MS: u64 = 24 * HOUR_MS;
    // 2024-01-03 00:00 UTC, a Wednesday.
    const START_MS: u64 = 1_704_240_000_000;

    /// One fish worth exactly `value`, no lottery, no jackpot.
    fn fixed(value: f64) -> EconomyConfig {
        EconomyConfig {
            lottery_rate: 0.0,
            jackpot_rate: 0.0,
            catalog: FishCatalog {
                fish: vec![FishEntry {
                    name: "Bass".to_string(),
                    base_value: value,
                    class: fishhunt_types::fishing::COMMON_CLASS.to_string(),
                }],
                classes: vec![],
            },
            ..EconomyConfig::default()
        }
    }

    struct Harness {
        engine: Engine<Memory, MemoryCache>,
        clock: Arc<ManualClock>,
        world: World,
        rng: StdRng,
    }

    impl Harness {
        fn new(world: World, config: EconomyConfig) -> Self {
            let clock = Arc::new(ManualClock::new(START_MS));
            let cache = MemoryCache::new(clock.clone());
            let engine = Engine::new(world.memory(), cache, clock.clone(), config);
            Self {
                engine,
                clock,
                world,
                rng: StdRng::seed_from_u64(42),
            }
        }

        async fn cast(&mut self) -> CastOutcome {
            self.engine
                .cast(
                    &self.world.buoy.id,
                    &self.world.rod.id,
                    &self.world.player.id,
                    &mut self.rng,
                )
                .await
                .unwrap()
        }

        async fn buoy(&self) -> Buoy {
            match self
                .engine
                .get(&Key::Buoy(self.world.buoy.id.clone()))
                .await
                .unwrap()
            {
                Some(Value::Buoy(buoy)) => buoy,
                other => panic!("unexpected buoy: {other:?}"),
            }
        }

        async fn rod(&self) -> Rod {
            match self
                .engine
                .get(&Key::Rod(self.world.rod.id.clone()))
                .await
                .unwrap()
            {
                Some(Value::Rod(rod)) => rod,
                other => panic!("unexpected rod: {other:?}"),
            }
        }

        async fn account(&self) -> CashoutAccount {
            match self
                .engine
                .get(&Key::Cashout(self.world.player.id.clone()))
                .await
                .unwrap()
            {
                Some(Value::Cashout(account)) => account,
                other => panic!("unexpected account: {other:?}"),
            }
        }

        async fn counter(&self) -> Option<CounterEntry> {
            let key = counter_key(&self.world.buoy.id, &self.world.rod.id, &self.world.player.id);
            self.engine
                .cache
                .get(&key)
                .await
                .unwrap()
                .map(|raw| serde_json::from_str(&raw).unwrap())
        }

        /// Steps past the small-worm cooldown.
        fn wait(&self) {
            self.clock.advance(Duration::from_secs(100));
        }
    }

    /// An engine shared between tasks, over arbitrary ledger contents.
    fn shared(state: Memory, config: EconomyConfig) -> Arc<Engine<Memory, MemoryCache>> {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = MemoryCache::new(clock.clone());
        Arc::new(Engine::new(state, cache, clock, config))
    }

    /// Runs both casts at once and returns their outcomes.
    async fn race(
        engine: &Arc<Engine<Memory, MemoryCache>>,
        casts: [(BuoyId, RodId, PlayerId); 2],
    ) -> Vec<CastOutcome> {
        let handles: Vec<_> = casts
            .into_iter()
            .enumerate()
            .map(|(seed, (buoy, rod, actor))| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(seed as u64);
                    engine.cast(&buoy, &rod, &actor, &mut rng).await.unwrap()
                })
            })
            .collect();
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        outcomes
    }

    fn second_rod(world: &World, id: &str, owner: &PlayerId) -> (Key, Value) {
        let mut rod = world.rod.clone();
        rod.id = RodId::new(id);
        rod.owner = owner.clone();
        (Key::Rod(rod.id.clone()), Value::Rod(rod))
    }

    #[tokio::test]
    async fn test_cast_settles_fish() {
        let mut h = Harness::new(World::new(100.0, START_MS), fixed(50.0));
        let CastOutcome::Settled(result) = h.cast().await else {
            panic!("expected settlement");
        };
        assert_eq!(result.fish.name, "Bass");
        assert_eq!(h.buoy().await.balance, 50.0);
        assert_eq!(h.buoy().await.fishpot, 0.5);
        assert_eq!(h.account().await.balance, 50.0);
        assert_eq!(h.rod().await.worms(WormTier::Small), 99);
    }

    #[tokio::test]
    async fn test_second_cast_fully_rejected_when_buoy_runs_dry() {
        let mut h = Harness::new(World::new(60.0, START_MS), fixed(50.0));
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
        h.wait();
        let rod_before = h.rod().await;
        let account_before = h.account().await;

        assert_eq!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::InsufficientBuoyFunds {
                available: 10.0,
                requested: 50.0
            })
        );
        assert_eq!(h.buoy().await.balance, 10.0);
        assert_eq!(h.buoy().await.fishpot, 0.5);
        assert_eq!(h.rod().await, rod_before);
        assert_eq!(h.account().await, account_before);
    }

    #[tokio::test]
    async fn test_back_to_back_cast_is_rate_limited() {
        let mut h = Harness::new(World::new(100.0, START_MS), fixed(1.0));
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
        h.clock.advance(Duration::from_secs(5));
        assert_eq!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::RateLimited {
                retry_after: Duration::from_secs(70)
            })
        );
        assert_eq!(h.buoy().await.balance, 99.0);
    }

    #[tokio::test]
    async fn test_alacrity_shortens_cooldown() {
        let mut world = World::new(100.0, START_MS);
        world.rod.alacrity_charges = 2;
        world.rod.selected_worm = WormTier::Magic;
        world.rod.add_worms(WormTier::Magic, 5);
        let mut h = Harness::new(world, fixed(1.0));
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
        assert_eq!(h.rod().await.alacrity_charges, 1);
        // 30s * 0.85
        h.clock.advance(Duration::from_millis(25_400));
        assert!(matches!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::RateLimited { .. })
        ));
        h.clock.advance(Duration::from_millis(100));
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
    }

    #[tokio::test]
    async fn test_jackpot_replaces_settlement() {
        let mut world = World::new(100.0, START_MS);
        world.buoy.fishpot = 40.0;
        world.buoy.color = ColorTaxClass::Yellow;
        let config = EconomyConfig {
            jackpot_rate: 1.0,
            ..fixed(5.0)
        };
        let mut h = Harness::new(world, config);

        let CastOutcome::JackpotPaid(payout) = h.cast().await else {
            panic!("expected jackpot");
        };
        assert_eq!(payout.amount, 30.0);
        assert_eq!(payout.recipient_new_balance, 30.0);
        assert_eq!(h.buoy().await.fishpot, 0.0);
        assert_eq!(h.buoy().await.balance, 100.0);
        assert_eq!(h.rod().await.worms(WormTier::Small), 100);

        // The jackpot still starts the cadence cooldown.
        assert!(matches!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_fifty_one_casts_then_spook_reject_then_rearm() {
        let mut h = Harness::new(World::new(1000.0, START_MS), fixed(1.0));
        for n in 1..=51 {
            let CastOutcome::Settled(result) = h.cast().await else {
                panic!("cast {n} was not settled");
            };
            assert_eq!(result.casts, n);
            h.wait();
        }
        let spooked_at = START_MS + 50 * 100_000;

        let CastOutcome::Rejected(Rejection::SpookCooldown { retry_after }) = h.cast().await
        else {
            panic!("expected spook");
        };
        assert_eq!(
            retry_after,
            Duration::from_millis(DAY_MS - (h.clock.now_ms() - spooked_at))
        );
        assert_eq!(h.buoy().await.balance, 949.0);

        // Window elapsed: this request rearms the record and is refused.
        h.clock.set(spooked_at + DAY_MS + 1);
        assert_eq!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::SpookCooldown {
                retry_after: Duration::ZERO
            })
        );

        // The very next request fishes again; no second window.
        h.wait();
        let CastOutcome::Settled(result) = h.cast().await else {
            panic!("expected settlement after the rearm");
        };
        assert_eq!(result.casts, 1);
        assert_eq!(h.buoy().await.balance, 948.0);
    }

    #[tokio::test]
    async fn test_spook_unblock_policy_admits_after_window() {
        let config = EconomyConfig {
            spook_rearm: SpookRearm::Unblock,
            ..fixed(1.0)
        };
        let mut h = Harness::new(World::new(1000.0, START_MS), config);
        for _ in 0..51 {
            assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
            h.wait();
        }
        assert!(matches!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::SpookCooldown { .. })
        ));

        let spooked_at = START_MS + 50 * 100_000;
        h.clock.set(spooked_at + DAY_MS + 1);
        let CastOutcome::Settled(result) = h.cast().await else {
            panic!("expected settlement");
        };
        assert_eq!(result.casts, 1);
    }

    #[tokio::test]
    async fn test_cache_outage_degrades_to_ledger() {
        let mut h = Harness::new(World::new(100.0, START_MS), fixed(1.0));
        h.engine.cache.set_failing(true);
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
        // Without the cadence key nothing throttles, but the ledger still counts.
        let CastOutcome::Settled(result) = h.cast().await else {
            panic!("expected settlement");
        };
        assert_eq!(result.casts, 2);
        assert_eq!(h.buoy().await.balance, 98.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hung_cache_does_not_hold_the_engine() {
        let config = EconomyConfig {
            cache_timeout_ms: 20,
            ..fixed(1.0)
        };
        let mut world = World::new(100.0, START_MS);
        world.account.balance = 5.0;
        let engine = shared(world.memory(), config);
        engine.cache.set_stalled(true);

        let caster = {
            let engine = engine.clone();
            let buoy = world.buoy.id.clone();
            let rod = world.rod.id.clone();
            let actor = world.player.id.clone();
            tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(0);
                engine.cast(&buoy, &rod, &actor, &mut rng).await.unwrap()
            })
        };
        // Let the cast take the lock and hit the cache first.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let cashout = tokio::time::timeout(Duration::from_secs(5), engine.cashout(&world.player.id))
            .await
            .expect("cashout waited on the cache")
            .unwrap();
        assert!(matches!(cashout, CashoutOutcome::Success { .. }));

        let outcome = tokio::time::timeout(Duration::from_secs(5), caster)
            .await
            .expect("cast waited on the cache")
            .unwrap();
        assert!(matches!(outcome, CastOutcome::Settled(_)));
    }

    #[tokio::test]
    async fn test_counter_tracks_settled_casts_only() {
        let mut h = Harness::new(World::new(60.0, START_MS), fixed(50.0));
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
        assert_eq!(h.counter().await.map(|entry| entry.casts), Some(1));

        h.wait();
        assert!(matches!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::InsufficientBuoyFunds { .. })
        ));
        assert_eq!(h.counter().await.map(|entry| entry.casts), Some(1));

        h.engine.deposit(&h.world.buoy.id, 100.0).await.unwrap();
        h.wait();
        let CastOutcome::Settled(result) = h.cast().await else {
            panic!("expected settlement");
        };
        assert_eq!(result.casts, 2);
        assert_eq!(h.counter().await.map(|entry| entry.casts), Some(2));
    }

    #[tokio::test]
    async fn test_warm_counter_cannot_bypass_recent_spook() {
        let mut h = Harness::new(World::new(100.0, START_MS), fixed(1.0));
        h.engine
            .state
            .lock()
            .await
            .insert(
                Key::CastRecord(h.world.buoy.id.clone(), h.world.player.id.clone()),
                Value::CastRecord(CastRecord {
                    casts: 0,
                    last_spook_ms: Some(START_MS - HOUR_MS),
                }),
            )
            .await
            .unwrap();
        let warm = CounterEntry {
            current_buoy: h.world.buoy.id.clone(),
            casts: 5,
        };
        h.engine
            .cache
            .set_with_expiry(
                &counter_key(&h.world.buoy.id, &h.world.rod.id, &h.world.player.id),
                &serde_json::to_string(&warm).unwrap(),
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert_eq!(
            h.cast().await,
            CastOutcome::Rejected(Rejection::SpookCooldown {
                retry_after: Duration::from_millis(DAY_MS - HOUR_MS)
            })
        );
        assert_eq!(h.buoy().await.balance, 100.0);
        assert_eq!(h.counter().await.map(|entry| entry.casts), Some(51));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_casts_cannot_overdraw_buoy() {
        let world = World::new(60.0, START_MS);
        let bob = Player::new(PlayerId::new("bob"), "Bob");
        let mut values = world.values();
        values.push(second_rod(&world, "rod-2", &bob.id));
        values.push((
            Key::Cashout(bob.id.clone()),
            Value::Cashout(CashoutAccount::new(bob.id.clone(), START_MS)),
        ));
        values.push((Key::Player(bob.id.clone()), Value::Player(bob.clone())));
        let engine = shared(Memory::with_values(values), fixed(50.0));

        let outcomes = race(
            &engine,
            [
                (world.buoy.id.clone(), world.rod.id.clone(), world.player.id.clone()),
                (world.buoy.id.clone(), RodId::new("rod-2"), bob.id.clone()),
            ],
        )
        .await;
        let settled = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CastOutcome::Settled(_)))
            .count();
        assert_eq!(settled, 1);
        assert!(outcomes.contains(&CastOutcome::Rejected(Rejection::InsufficientBuoyFunds {
            available: 10.0,
            requested: 50.0
        })));
        match engine.get(&Key::Buoy(world.buoy.id.clone())).await.unwrap() {
            Some(Value::Buoy(buoy)) => assert_eq!(buoy.balance, 10.0),
            other => panic!("unexpected buoy: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_casts_cannot_pass_cast_limit() {
        let world = World::new(100.0, START_MS);
        let mut values = world.values();
        values.push(second_rod(&world, "rod-2", &world.player.id));
        values.push((
            Key::CastRecord(world.buoy.id.clone(), world.player.id.clone()),
            Value::CastRecord(CastRecord {
                casts: 50,
                last_spook_ms: None,
            }),
        ));
        let engine = shared(Memory::with_values(values), fixed(1.0));

        let outcomes = race(
            &engine,
            [
                (world.buoy.id.clone(), world.rod.id.clone(), world.player.id.clone()),
                (world.buoy.id.clone(), RodId::new("rod-2"), world.player.id.clone()),
            ],
        )
        .await;
        let settled: Vec<_> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                CastOutcome::Settled(result) => Some(result.casts),
                _ => None,
            })
            .collect();
        assert_eq!(settled, vec![51]);
        assert!(outcomes
            .iter()
            .any(|outcome| matches!(outcome, CastOutcome::Rejected(Rejection::SpookCooldown { .. }))));
        match engine.get(&Key::Buoy(world.buoy.id.clone())).await.unwrap() {
            Some(Value::Buoy(buoy)) => assert_eq!(buoy.balance, 99.0),
            other => panic!("unexpected buoy: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cashout_balance_round_trip() {
        let mut h = Harness::new(World::new(1000.0, START_MS), fixed(2.5));
        for _ in 0..4 {
            assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
            h.wait();
        }
        assert_eq!(h.account().await.balance, 10.0);

        let player = h.world.player.id.clone();
        assert_eq!(
            h.engine.cashout(&player).await.unwrap(),
            CashoutOutcome::Success {
                amount_taken: 10.0,
                remaining_balance: 0.0
            }
        );
        assert_eq!(
            h.engine.cashout(&player).await.unwrap(),
            CashoutOutcome::NoBalance { residual: 0.0 }
        );
    }

    #[tokio::test]
    async fn test_cashout_replay_is_out_of_quota() {
        let mut world = World::new(0.0, START_MS);
        world.account.balance = 450.0;
        let h = Harness::new(world, fixed(1.0));
        let player = h.world.player.id.clone();

        assert_eq!(
            h.engine.cashout(&player).await.unwrap(),
            CashoutOutcome::Success {
                amount_taken: 300.0,
                remaining_balance: 150.0
            }
        );
        assert_eq!(
            h.engine.cashout(&player).await.unwrap(),
            CashoutOutcome::OutOfQuota {
                remaining: Duration::from_millis(DAY_MS)
            }
        );
    }

    #[tokio::test]
    async fn test_ownership_and_validation() {
        let mut h = Harness::new(World::new(100.0, START_MS), fixed(1.0));
        let stranger = PlayerId::new("mallory");
        assert!(h
            .engine
            .authenticate(&h.world.rod.id, &h.world.player.id)
            .await
            .unwrap());
        assert!(!h
            .engine
            .authenticate(&h.world.rod.id, &stranger)
            .await
            .unwrap());

        let result = h
            .engine
            .cast(&h.world.buoy.id, &h.world.rod.id, &stranger, &mut h.rng)
            .await;
        assert!(matches!(result, Err(EngineError::RodNotOwned)));

        let result = h
            .engine
            .cast(&BuoyId::new("  "), &h.world.rod.id, &h.world.player.id, &mut h.rng)
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        let result = h
            .engine
            .cast(
                &BuoyId::new("nowhere"),
                &h.world.rod.id,
                &h.world.player.id,
                &mut h.rng,
            )
            .await;
        assert!(matches!(result, Err(EngineError::UnknownBuoy)));
        assert!(matches!(h.cast().await, CastOutcome::Settled(_)));
    }

    #[tokio::test]
    async fn test_deposit_and_add_worms() {
        let mut world = World::new(0.0, START_MS);
        world.buoy.color = ColorTaxClass::Red;
        let h = Harness::new(world, fixed(1.0));

        let credited = h.engine.deposit(&h.world.buoy.id, 100.0).await.unwrap();
        assert_eq!(credited, 50.0);
        assert_eq!(h.buoy().await.balance, 50.0);
        assert!(matches!(
            h.engine.deposit(&h.world.buoy.id, -1.0).await,
            Err(EngineError::Validation(_))
        ));

        let total = h
            .engine
            .add_worms(&h.world.rod.id, WormTier::Tasty, 25)
            .await
            .unwrap();
        assert_eq!(total, 25);
        assert_eq!(h.rod().await.worms(WormTier::Tasty), 25);
    }
}
