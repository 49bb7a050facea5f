//! Rutastic command-line client.
//!
//! Restores the session and the last filter, runs the filter once, optionally
//! casts a vote or loads a route page, prints the resulting state as JSON and
//! saves the filter for next time.

use rutastic_client::api_client::RestClient;
use rutastic_client::config::ClientConfig;
use rutastic_client::detail::RouteDetail;
use rutastic_client::error::ClientError;
use rutastic_client::persistence::{self, PersistedState};
use rutastic_client::store::LeaderboardCache;
use rutastic_client::telemetry;
use rutastic_client::{
    IdentityBroadcaster, KudoOverlayResolver, KudoRatingConsistencyProtocol, Notification,
    NotificationCenter, QueryStateStore, RouteDetailLoader, SessionController, VoteOrigin,
    VoteReceipt,
};
use rutastic_core::{Identity, KudoOverlay, RouteId, RouteQuery, RouteSummary, ValidationError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    vote: Option<(RouteId, i8)>,
    detail: Option<RouteId>,
    json_logs: bool,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    identity: Option<Identity>,
    latest_query: RouteQuery,
    routes: Vec<RouteSummary>,
    leaderboards: LeaderboardCache,
    overlay: KudoOverlay,
    vote: Option<&'a VoteReceipt>,
    detail: Option<&'a RouteDetail>,
    notifications: Vec<Notification>,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = ClientConfig::load()?;
    telemetry::init_tracing(&config.log_filter, args.json_logs)?;

    let api = Arc::new(RestClient::new(&config)?);
    let identity = Arc::new(IdentityBroadcaster::new());
    let overlay = Arc::new(KudoOverlayResolver::new(api.clone(), Arc::clone(&identity)));
    let store = Arc::new(
        QueryStateStore::new(api.clone(), api.clone(), overlay).with_policy(config.stale_responses),
    );
    let notifications = Arc::new(NotificationCenter::new());
    let session = SessionController::new(api.clone(), Arc::clone(&store));
    let votes =
        KudoRatingConsistencyProtocol::new(api.clone(), Arc::clone(&store), Arc::clone(&notifications));
    let details = RouteDetailLoader::new(
        api.clone(),
        api.clone(),
        Arc::clone(&store),
        Arc::clone(&notifications),
    )
    .with_related_limit(config.related_routes_limit);

    if let Err(err) = session.restore().await {
        warn!(error = %err, "Session restore failed, continuing signed out");
    }

    let query = match persistence::load(&config.persistence_path) {
        Ok(Some(state)) => state.latest_query,
        Ok(None) => RouteQuery::all(),
        Err(err) => {
            warn!(error = %err, path = %config.persistence_path.display(), "Ignoring unreadable saved state");
            RouteQuery::all()
        }
    };
    if let Err(err) = store.execute_filter(query).await {
        warn!(error = %err, "Initial filter failed");
    }

    let receipt = match args.vote {
        Some((route_id, direction)) => {
            match votes.submit_vote(route_id, direction, VoteOrigin::List).await {
                Ok(receipt) => Some(receipt),
                Err(err) => {
                    warn!(route_id = %route_id, error = %err, "Vote not applied");
                    None
                }
            }
        }
        None => None,
    };

    let detail = match args.detail {
        Some(route_id) => match details.load(route_id).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                warn!(route_id = %route_id, error = %err, "Route detail unavailable");
                None
            }
        },
        None => None,
    };

    let snapshot = Snapshot {
        identity: identity.current_identity(),
        latest_query: store.latest_query(),
        routes: store.routes(),
        leaderboards: store.leaderboards(),
        overlay: store.overlay(),
        vote: receipt.as_ref(),
        detail: detail.as_ref(),
        notifications: notifications.drain(),
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    let persisted = PersistedState {
        latest_query: store.latest_query(),
    };
    persistence::save(&config.persistence_path, &persisted)?;
    info!(vote_state = ?votes.state(), "Done");
    Ok(())
}

fn parse_args<I>(args: I) -> Result<CliArgs, ValidationError>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                args.next();
            }
            "--json-logs" => parsed.json_logs = true,
            "--vote" => {
                let route_id = parse_route_id(args.next())?;
                let direction = args
                    .next()
                    .and_then(|raw| raw.parse::<i8>().ok())
                    .ok_or_else(|| invalid("--vote", "expected <route-id> <+1|-1>"))?;
                parsed.vote = Some((route_id, direction));
            }
            "--detail" => parsed.detail = Some(parse_route_id(args.next())?),
            other => return Err(invalid("arguments", &format!("unknown argument '{}'", other))),
        }
    }
    Ok(parsed)
}

fn parse_route_id(raw: Option<String>) -> Result<RouteId, ValidationError> {
    raw.and_then(|raw| raw.parse::<i64>().ok())
        .map(RouteId::new)
        .ok_or_else(|| invalid("route_id", "expected a numeric route id"))
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
