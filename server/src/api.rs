use axum::{
    extract::{Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use fishhunt_execution::{
    CashoutOutcome, CastCache, CastOutcome, Engine, EngineError, Rejection, State,
};
use fishhunt_types::{BuoyId, PlayerId, RodId, WormTier};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::render;

/// JSON body of every response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub message: String,
    pub status: u16,
}

fn respond(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Envelope {
        message: message.into(),
        status: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

fn engine_error(err: EngineError) -> Response {
    let status = match &err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::UnknownBuoy | EngineError::UnknownRod | EngineError::UnknownPlayer => {
            StatusCode::NOT_FOUND
        }
        EngineError::RodNotOwned => StatusCode::FORBIDDEN,
        EngineError::StoreUnavailable(_) => {
            error!(?err, "ledger failure");
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong, please try again",
            );
        }
    };
    respond(status, err.to_string())
}

fn required(name: &str, value: Option<String>) -> Result<String, Response> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(respond(
            StatusCode::BAD_REQUEST,
            format!("missing parameter {name}"),
        )),
    }
}

pub struct Api<S: State, C: CastCache> {
    engine: Arc<Engine<S, C>>,
}

impl<S: State + 'static, C: CastCache + 'static> Api<S, C> {
    pub fn new(engine: Arc<Engine<S, C>>) -> Self {
        Self { engine }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(health))
            .route("/cast", put(cast::<S, C>))
            .route("/cashout", post(cashout::<S, C>))
            .route("/auth", get(authenticate::<S, C>))
            .route("/buoy/add-balance", post(add_balance::<S, C>))
            .route("/rod/add-worms", post(add_worms::<S, C>))
            .fallback(not_found)
            .layer(TraceLayer::new_for_http())
            .with_state(self.engine.clone())
    }
}

async fn health() -> Response {
    respond(StatusCode::OK, "fishhunt is running")
}

async fn not_found() -> Response {
    respond(
        StatusCode::NOT_FOUND,
        "You are accessing page that does not exist!",
    )
}

#[derive(Deserialize)]
struct CastParams {
    buoy_uuid: Option<String>,
    rod_uuid: Option<String>,
    player_username: Option<String>,
}

async fn cast<S: State + 'static, C: CastCache + 'static>(
    AxumState(engine): AxumState<Arc<Engine<S, C>>>,
    Query(params): Query<CastParams>,
) -> Response {
    let parsed = (|| {
        Ok::<_, Response>((
            BuoyId::new(required("buoy_uuid", params.buoy_uuid)?),
            RodId::new(required("rod_uuid", params.rod_uuid)?),
            PlayerId::new(required("player_username", params.player_username)?),
        ))
    })();
    let (buoy, rod, player) = match parsed {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let mut rng = StdRng::from_entropy();
    match engine.cast(&buoy, &rod, &player, &mut rng).await {
        Ok(CastOutcome::Settled(result)) => {
            respond(StatusCode::OK, render::settlement(&result, engine.config()))
        }
        Ok(CastOutcome::JackpotPaid(payout)) => {
            respond(StatusCode::OK, render::jackpot(&payout, &player))
        }
        Ok(CastOutcome::Rejected(rejection)) => {
            let status = match rejection {
                Rejection::RateLimited { .. } | Rejection::SpookCooldown { .. } => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                Rejection::InsufficientBuoyFunds { .. } | Rejection::OutOfWorms { .. } => {
                    StatusCode::CONFLICT
                }
            };
            respond(status, render::rejection(&rejection))
        }
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct CashoutParams {
    player_username: Option<String>,
}

async fn cashout<S: State + 'static, C: CastCache + 'static>(
    AxumState(engine): AxumState<Arc<Engine<S, C>>>,
    Query(params): Query<CashoutParams>,
) -> Response {
    let player = match required("player_username", params.player_username) {
        Ok(player) => PlayerId::new(player),
        Err(response) => return response,
    };
    match engine.cashout(&player).await {
        Ok(outcome) => {
            let status = match outcome {
                CashoutOutcome::Success { .. } => StatusCode::OK,
                CashoutOutcome::NoBalance { .. } => StatusCode::CONFLICT,
                CashoutOutcome::OutOfQuota { .. } => StatusCode::TOO_MANY_REQUESTS,
            };
            respond(status, render::cashout(&outcome))
        }
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct AuthParams {
    id: Option<String>,
    username: Option<String>,
}

async fn authenticate<S: State + 'static, C: CastCache + 'static>(
    AxumState(engine): AxumState<Arc<Engine<S, C>>>,
    Query(params): Query<AuthParams>,
) -> Response {
    let (rod, player) = match (required("id", params.id), required("username", params.username))
    {
        (Ok(rod), Ok(player)) => (RodId::new(rod), PlayerId::new(player)),
        (Err(response), _) | (_, Err(response)) => return response,
    };
    match engine.authenticate(&rod, &player).await {
        Ok(true) => respond(StatusCode::OK, "Authorization Successful"),
        Ok(false) => respond(
            StatusCode::FORBIDDEN,
            "Authorization Failed, Rod cannot be transferred to another player",
        ),
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct AddBalanceParams {
    buoy_uuid: Option<String>,
    linden_amount: Option<String>,
}

async fn add_balance<S: State + 'static, C: CastCache + 'static>(
    AxumState(engine): AxumState<Arc<Engine<S, C>>>,
    Query(params): Query<AddBalanceParams>,
) -> Response {
    let buoy = match required("buoy_uuid", params.buoy_uuid) {
        Ok(buoy) => BuoyId::new(buoy),
        Err(response) => return response,
    };
    let gross = match required("linden_amount", params.linden_amount)
        .and_then(|raw| {
            raw.trim().parse::<f64>().map_err(|_| {
                respond(StatusCode::BAD_REQUEST, "linden_amount must be a number")
            })
        }) {
        Ok(gross) => gross,
        Err(response) => return response,
    };
    match engine.deposit(&buoy, gross).await {
        Ok(credited) => respond(
            StatusCode::OK,
            format!(
                "Buoy balance added by {} L$ (tax applied)",
                render::amount(credited)
            ),
        ),
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct AddWormsParams {
    rod_uuid: Option<String>,
    worm_type: Option<String>,
    worm_amount: Option<String>,
}

fn parse_worm_tier(raw: &str) -> Option<WormTier> {
    WormTier::from_shop_name(raw).or_else(|| {
        raw.trim()
            .parse::<u8>()
            .ok()
            .and_then(|code| WormTier::from_code(code).ok())
    })
}

async fn add_worms<S: State + 'static, C: CastCache + 'static>(
    AxumState(engine): AxumState<Arc<Engine<S, C>>>,
    Query(params): Query<AddWormsParams>,
) -> Response {
    let parsed = (|| {
        let rod = RodId::new(required("rod_uuid", params.rod_uuid)?);
        let tier = parse_worm_tier(&required("worm_type", params.worm_type)?)
            .ok_or_else(|| respond(StatusCode::BAD_REQUEST, "unknown worm_type"))?;
        let count = required("worm_amount", params.worm_amount)?
            .trim()
            .parse::<u32>()
            .map_err(|_| {
                respond(
                    StatusCode::BAD_REQUEST,
                    "worm_amount must be a non-negative integer",
                )
            })?;
        Ok::<_, Response>((rod, tier, count))
    })();
    let (rod, tier, count) = match parsed {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match engine.add_worms(&rod, tier, count).await {
        Ok(total) => respond(
            StatusCode::OK,
            format!("Added {count} {tier}, the rod now holds {total}"),
        ),
        Err(err) => engine_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use fishhunt_execution::mocks::{ManualClock, MemoryCache, World};
    use fishhunt_execution::{EconomyConfig, Memory};
    use fishhunt_types::{FishCatalog, FishEntry};
    use tower::ServiceExt;

    // 2024-01-03 00:00 UTC, a Wednesday.
    const START_MS: u64 = 1_704_240_000_000;

    fn router(world: &World) -> Router {
        let clock = Arc::new(ManualClock::new(START_MS));
        let config = EconomyConfig {
            lottery_rate: 0.0,
            jackpot_rate: 0.0,
            catalog: FishCatalog {
                fish: vec![FishEntry {
                    name: "Bass".to_string(),
                    base_value: 50.0,
                    class: "Common".to_string(),
                }],
                classes: vec![],
            },
            ..EconomyConfig::default()
        };
        let engine = Engine::new(
            world.memory(),
            MemoryCache::new(clock.clone()),
            clock,
            config,
        );
        Api::<Memory, MemoryCache>::new(Arc::new(engine)).router()
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, Envelope) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_cast_then_rate_limited() {
        let world = World::new(100.0, START_MS);
        let app = router(&world);
        let uri = "/cast?buoy_uuid=buoy-1&rod_uuid=rod-1&player_username=alice";

        let (status, body) = call(&app, Method::PUT, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, 200);
        assert!(body.message.starts_with("You caught a Bass worth 50.00 L$!"));
        assert!(body.message.ends_with("Rank (overall): 1\nYou are the top fisher!"));

        let (status, body) = call(&app, Method::PUT, uri).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body.message,
            "Wait a moment, your fishing rod is not ready yet (00:01:15)"
        );
    }

    #[tokio::test]
    async fn test_cast_against_dry_buoy_conflicts() {
        let world = World::new(10.0, START_MS);
        let app = router(&world);
        let (status, body) = call(
            &app,
            Method::PUT,
            "/cast?buoy_uuid=buoy-1&rod_uuid=rod-1&player_username=alice",
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.message, "Oops this place has run out of fishes!");
    }

    #[tokio::test]
    async fn test_cast_error_statuses() {
        let world = World::new(100.0, START_MS);
        let app = router(&world);

        let (status, _) = call(&app, Method::PUT, "/cast?buoy_uuid=buoy-1&rod_uuid=rod-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::PUT,
            "/cast?buoy_uuid=buoy-1&rod_uuid=rod-1&player_username=mallory",
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &app,
            Method::PUT,
            "/cast?buoy_uuid=nowhere&rod_uuid=rod-1&player_username=alice",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cashout_flow() {
        let mut world = World::new(0.0, START_MS);
        world.account.balance = 0.999;
        let app = router(&world);
        let (status, body) = call(&app, Method::POST, "/cashout?player_username=alice").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.message, "Not enough balance to cash out (1.00 L$)");

        let mut world = World::new(0.0, START_MS);
        world.account.balance = 400.0;
        let app = router(&world);
        let (status, body) = call(&app, Method::POST, "/cashout?player_username=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.message,
            "Cashed out 300.00 L$, remaining balance 100.00 L$"
        );
        let (status, body) = call(&app, Method::POST, "/cashout?player_username=alice").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body.message,
            "Daily cashout limit reached, you can cash out again in 24:00:00"
        );
    }

    #[tokio::test]
    async fn test_auth() {
        let world = World::new(0.0, START_MS);
        let app = router(&world);
        let (status, _) = call(&app, Method::GET, "/auth?id=rod-1&username=alice").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, Method::GET, "/auth?id=rod-1&username=bob").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.status, 403);
        let (status, _) = call(&app, Method::GET, "/auth?id=rod-9&username=alice").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_shop_endpoints() {
        let world = World::new(0.0, START_MS);
        let app = router(&world);
        let (status, body) = call(
            &app,
            Method::POST,
            "/buoy/add-balance?buoy_uuid=buoy-1&linden_amount=100",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.message, "Buoy balance added by 85.00 L$ (tax applied)");

        let (status, _) = call(
            &app,
            Method::POST,
            "/buoy/add-balance?buoy_uuid=buoy-1&linden_amount=lots",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            Method::POST,
            "/rod/add-worms?rod_uuid=rod-1&worm_type=magic_worms&worm_amount=10",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.message, "Added 10 Magic Worms, the rod now holds 10");

        let (status, _) = call(
            &app,
            Method::POST,
            "/rod/add-worms?rod_uuid=rod-1&worm_type=golden&worm_amount=10",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let world = World::new(0.0, START_MS);
        let app = router(&world);
        let (status, body) = call(&app, Method::GET, "/leaderboard").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "You are accessing page that does not exist!");
        let (status, _) = call(&app, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_parse_worm_tier() {
        assert_eq!(parse_worm_tier("tasty_worms"), Some(WormTier::Tasty));
        assert_eq!(parse_worm_tier("3"), Some(WormTier::Enchanted));
        assert_eq!(parse_worm_tier("9"), None);
    }
}
