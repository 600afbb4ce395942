//! Randomized exerciser for `AvlTree`.
//!
//! Usage: `cargo run --example driver [OPS] [KEY_RANGE] [SEED]`
//!
//! Inserts `OPS` random integer keys, probes `OPS` random keys, then attempts
//! `2 * OPS` random removals, checking the tallies against `len()` after each
//! phase. Set `RUST_LOG=avl_rs=trace` to watch individual rotations.

use std::process::ExitCode;

use avl_rs::{AvlTree, Error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_OPS: usize = 50_000;
const DEFAULT_KEY_RANGE: u32 = 200_000;

fn arg<T: std::str::FromStr>(n: usize, name: &str, default: T) -> Result<T, String> {
    match std::env::args().nth(n) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid {name}: {raw:?}")),
        None => Ok(default),
    }
}

fn empty_tree() -> Result<(), String> {
    let mut t = AvlTree::new();
    info!(tree = ?t, "fresh tree");

    if t.len() != 0 || t.clear() != 0 || t.len() != 0 {
        return Err("fresh tree is not empty".into());
    }
    if t.contains(b"") {
        return Err("empty tree reports a member".into());
    }
    if t.remove(b"") != Err(Error::NotFound) {
        return Err("remove on empty tree did not report NotFound".into());
    }
    t.destroy();
    Ok(())
}

fn random_ops(ops: usize, key_range: u32, seed: u64) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = AvlTree::new();

    let (mut ok, mut exist, mut nomem) = (0usize, 0usize, 0usize);
    for _ in 0..ops {
        let v: u32 = rng.gen_range(0..key_range);
        match t.insert(&v.to_ne_bytes()) {
            Ok(()) => ok += 1,
            Err(Error::AlreadyExists) => exist += 1,
            Err(Error::OutOfMemory) => nomem += 1,
            Err(e) => return Err(format!("insert returned {e}")),
        }
    }
    info!(ok, exist, nomem, height = t.height(), "insert phase");
    if t.len() != ok {
        return Err(format!("len {} after {ok} successful inserts", t.len()));
    }

    let (mut found, mut not_found) = (0usize, 0usize);
    for _ in 0..ops {
        let v: u32 = rng.gen_range(0..key_range);
        if t.contains(&v.to_ne_bytes()) {
            found += 1;
        } else {
            not_found += 1;
        }
    }
    info!(found, not_found, "find phase");

    let mut deleted = 0usize;
    for _ in 0..ops * 2 {
        let v: u32 = rng.gen_range(0..key_range);
        if t.remove(&v.to_ne_bytes()).is_ok() {
            deleted += 1;
        }
    }
    info!(deleted, len = t.len(), "delete phase");

    if t.len() + deleted != ok {
        return Err(format!(
            "len {} + deleted {deleted} != inserted {ok}",
            t.len()
        ));
    }

    #[cfg(debug_assertions)]
    t.validate().map_err(|e| e.to_string())?;

    let released = t.clear();
    if t.len() != 0 {
        return Err("tree not empty after clear".into());
    }
    info!(released, "cleared");
    t.destroy();
    Ok(())
}

fn run() -> Result<(), String> {
    let ops = arg(1, "OPS", DEFAULT_OPS)?;
    let key_range = arg(2, "KEY_RANGE", DEFAULT_KEY_RANGE)?;
    if key_range == 0 {
        return Err("KEY_RANGE must be positive".into());
    }
    let seed = arg(3, "SEED", rand::thread_rng().gen::<u64>())?;
    info!(ops, key_range, seed, "starting");

    empty_tree()?;
    random_ops(ops, key_range, seed)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avl_rs=info,driver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => {
            info!("all checks passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
