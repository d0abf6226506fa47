//! Randomized law checks over a payload (or a synthetic one).
//!
//! For every trial a random FilterSpec is drawn, widened by dropping one
//! predicate, and the identity and subset laws are checked against the
//! index. Exits non-zero on the first violation.
//!
//! Env: SEED (42), TRIALS (500), SITREP_DATA (synthetic payload when unset
//! or missing), SYNTH_EVENTS (2000).

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use std::env;

use sitrep::config::EngineConfig;
use sitrep::index::EventIndex;
use sitrep::logging::{log, obj, ts_epoch_ms, v_str, Domain, Level};
use sitrep::raw::load_path;
use sitrep::synth::{random_spec, synthetic_records, widen};
use sitrep::verify::{assert_identity_law, assert_index_invariants, assert_subset};

fn main() -> Result<()> {
    let seed = env::var("SEED").ok().and_then(|v| v.parse().ok()).unwrap_or(42u64);
    let trials = env::var("TRIALS").ok().and_then(|v| v.parse().ok()).unwrap_or(500usize);
    let synth_events = env::var("SYNTH_EVENTS").ok().and_then(|v| v.parse().ok()).unwrap_or(2000usize);
    let cfg = EngineConfig::from_env();
    let now = ts_epoch_ms();

    let raws = if cfg.data_path.exists() {
        load_path(&cfg.data_path)?.0
    } else {
        eprintln!("{} not found, using synthetic payload", cfg.data_path.display());
        synthetic_records(seed, synth_events, now, 30)
    };
    let index = EventIndex::build(&raws, cfg.synonyms()?, now);

    if let Err(v) = assert_index_invariants(&index).and_then(|_| assert_identity_law(&index)) {
        eprintln!("index violation: {}", v);
        std::process::exit(2);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for trial in 0..trials {
        let spec = random_spec(&mut rng, &index);
        let wide = widen(&mut rng, &spec);
        if let Err(v) = assert_subset(&index, &spec, &wide) {
            eprintln!("trial {} violation: {}", trial, v);
            eprintln!("narrow: {}", serde_json::to_string(&spec)?);
            eprintln!("wide:   {}", serde_json::to_string(&wide)?);
            std::process::exit(1);
        }
    }

    log(
        Level::Info,
        Domain::System,
        "trials_passed",
        obj(&[
            ("trials", serde_json::json!(trials)),
            ("indexed", serde_json::json!(index.len())),
            ("seed", v_str(&seed.to_string())),
        ]),
    );
    println!("trials={} indexed={} ok", trials, index.len());
    Ok(())
}
