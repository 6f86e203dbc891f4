//! verdict-cli: headless runner for the punishment engine.
//!
//! Usage:
//!   verdict-cli record --db bans.db --type ban --uuid <uuid> --reason griefing --duration 3600
//!   verdict-cli revoke --db bans.db --type ban --id 3
//!   verdict-cli list --db bans.db --type ban --limit 20
//!   verdict-cli associate --db bans.db --uuid <uuid> --address 203.0.113.9
//!   verdict-cli check --db bans.db --uuid <uuid> --address 203.0.113.9

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::env;
use std::net::IpAddr;
use std::path::Path;
use uuid::Uuid;
use verdict_core::config::EngineConfig;
use verdict_core::punishment::{
    EscalationTrack, NetworkAddress, Operator, PunishmentDraft, PunishmentType, Scope, Victim,
    PERMANENT_END,
};
use verdict_core::selection::{Selection, SelectionPredicate, SortDirective};
use verdict_core::store::PunishmentStore;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let db = flag_value(&args, "--db").unwrap_or("punishments.db");

    let config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => EngineConfig::default(),
    };

    let mut store = PunishmentStore::open(db)?;
    store.migrate()?;
    store.set_dimension_retry_attempts(config.dimension_retry_attempts);

    match command {
        "record" => record(&store, &args),
        "revoke" => revoke(&store, &args),
        "list" => list(&store, &args),
        "associate" => associate(&store, &args),
        "check" => check(&store, &args, &config),
        _ => {
            println!("commands: record, revoke, list, associate, check");
            println!("common flags: --db <path> --config <engine.json>");
            Ok(())
        }
    }
}

fn record(store: &PunishmentStore, args: &[String]) -> Result<()> {
    let kind = parse_type(args)?;
    let victim = parse_victim(args)?;
    let reason = flag_value(args, "--reason").unwrap_or("").to_string();
    let duration = parse_arg(args, "--duration", 0i64);
    let operator = match flag_value(args, "--operator") {
        Some(raw) => Operator::Player {
            uuid: Uuid::parse_str(raw).context("bad --operator uuid")?,
        },
        None => Operator::Console,
    };
    let now = Utc::now().timestamp();
    let end = if duration > 0 { now + duration } else { PERMANENT_END };

    let draft = PunishmentDraft {
        kind,
        victim,
        operator,
        reason,
        scope: parse_scope(args)?,
        track: parse_track(args)?,
        start: now,
        end,
    };
    match store.record_punishment(&draft)? {
        Some(punishment) => println!("{}", serde_json::to_string(&punishment)?),
        None => println!("victim already has an active {kind}"),
    }
    Ok(())
}

fn revoke(store: &PunishmentStore, args: &[String]) -> Result<()> {
    let kind = parse_type(args)?;
    let removed = match flag_value(args, "--id") {
        Some(raw) => {
            let id: i64 = raw.parse().context("bad --id")?;
            store.revoke_by_id(kind, id)?
        }
        None => store.revoke_by_type_and_victim(kind, &parse_victim(args)?)?,
    };
    println!("{}", if removed { "revoked" } else { "nothing to revoke" });
    Ok(())
}

fn list(store: &PunishmentStore, args: &[String]) -> Result<()> {
    let mut builder = Selection::builder()
        .active_only(!args.iter().any(|a| a == "--all"))
        .skip(parse_arg(args, "--skip", 0u64))
        .limit(parse_arg(args, "--limit", 0u64))
        .sort([SortDirective::NewestFirst]);
    if flag_value(args, "--type").is_some() {
        builder = builder.kinds(SelectionPredicate::matching_only(parse_type(args)?));
    }
    let selection = builder.build();

    let now = Utc::now().timestamp();
    let total = store.count_matching(&selection, now)?;
    for punishment in store.all_matching(&selection, now)? {
        println!("{}", serde_json::to_string(&punishment)?);
    }
    println!("({total} matching)");
    Ok(())
}

fn associate(store: &PunishmentStore, args: &[String]) -> Result<()> {
    let (uuid, address) = parse_identity(args)?;
    store.record_association(uuid, address, Utc::now().timestamp())?;
    println!("associated {uuid} with {address}");
    Ok(())
}

/// Run the applicability check a server would run at connect/chat time.
fn check(store: &PunishmentStore, args: &[String], config: &EngineConfig) -> Result<()> {
    let (uuid, address) = parse_identity(args)?;
    let history = store.address_history();
    for kind in PunishmentType::STORED {
        let applicable =
            store.applicable_to(uuid, address, kind, config.address_strictness, &history)?;
        for punishment in applicable {
            println!("{}", serde_json::to_string(&punishment)?);
        }
    }
    Ok(())
}

fn parse_type(args: &[String]) -> Result<PunishmentType> {
    match flag_value(args, "--type") {
        Some("ban") => Ok(PunishmentType::Ban),
        Some("mute") => Ok(PunishmentType::Mute),
        Some("warn") => Ok(PunishmentType::Warn),
        Some("kick") => Ok(PunishmentType::Kick),
        Some(other) => bail!("unknown punishment type: {other}"),
        None => bail!("--type is required (ban, mute, warn, kick)"),
    }
}

fn parse_victim(args: &[String]) -> Result<Victim> {
    let uuid = flag_value(args, "--uuid")
        .map(Uuid::parse_str)
        .transpose()
        .context("bad --uuid")?;
    let address = flag_value(args, "--address")
        .map(|raw| raw.parse::<IpAddr>())
        .transpose()
        .context("bad --address")?
        .map(NetworkAddress);
    match (uuid, address) {
        (Some(uuid), None) => Ok(Victim::Player { uuid }),
        (None, Some(address)) => Ok(Victim::Address { address }),
        (Some(uuid), Some(address)) => Ok(Victim::Composite { uuid, address }),
        (None, None) => bail!("provide --uuid and/or --address"),
    }
}

fn parse_identity(args: &[String]) -> Result<(Uuid, NetworkAddress)> {
    let uuid = flag_value(args, "--uuid").context("--uuid is required")?;
    let address = flag_value(args, "--address").context("--address is required")?;
    Ok((
        Uuid::parse_str(uuid).context("bad --uuid")?,
        NetworkAddress(address.parse::<IpAddr>().context("bad --address")?),
    ))
}

/// `--scope server:lobby` or `--scope category:minigames`; absent = global.
fn parse_scope(args: &[String]) -> Result<Scope> {
    let Some(raw) = flag_value(args, "--scope") else {
        return Ok(Scope::Global);
    };
    match raw.split_once(':') {
        Some(("server", name)) => Ok(Scope::Server { name: name.to_string() }),
        Some(("category", name)) => Ok(Scope::Category { name: name.to_string() }),
        _ => bail!("bad --scope, expected server:<name> or category:<name>"),
    }
}

/// `--track <namespace>:<value>`; absent = no track.
fn parse_track(args: &[String]) -> Result<Option<EscalationTrack>> {
    let Some(raw) = flag_value(args, "--track") else {
        return Ok(None);
    };
    match raw.split_once(':') {
        Some((namespace, value)) if !namespace.is_empty() && !value.is_empty() => {
            Ok(Some(EscalationTrack {
                namespace: namespace.to_string(),
                value: value.to_string(),
            }))
        }
        _ => bail!("bad --track, expected <namespace>:<value>"),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
