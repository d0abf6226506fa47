//! Load a GeoJSON payload, build the index and print the filtered view.
//!
//! Usage:
//!   sitrep [payload.geojson] [options]
//!
//! Options:
//!   --from=<date>          Inclusive start date
//!   --to=<date>            Inclusive end date (whole day)
//!   --category=<label>     Exact category label, e.g. "Drone Strike"
//!   --actor=<code>         Exact actor code, e.g. RUS
//!   --q=<text>             Free-text search with synonym expansion
//!   --severity=<list>      Comma-separated: low,medium,high,critical
//!   --recent=<hours>       Recency window anchored to the newest event
//!   --persist              Keep strategically persistent events past the window
//!   --limit=<n>            Maximum events printed (default FEED_LIMIT)
//!   --summary              Print aggregates, gallery and map batching instead of events
//!
//! The payload path falls back to SITREP_DATA. GALLERY_LIMIT and MAP_BATCH
//! shape the `--summary` output.

use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;

use sitrep::aggregate::{overview, top_n, ViewLimits};
use sitrep::config::EngineConfig;
use sitrep::filter::{apply, FilterInput};
use sitrep::index::EventIndex;
use sitrep::logging::{log, obj, ts_epoch_ms, v_str, Domain, Level};
use sitrep::raw::load_path;

struct CliArgs {
    path: PathBuf,
    input: FilterInput,
    limit: usize,
    summary: bool,
}

fn parse_args(cfg: &EngineConfig) -> CliArgs {
    let mut args = CliArgs {
        path: cfg.data_path.clone(),
        input: FilterInput {
            recency_hours: cfg.recency_hours,
            persistence: cfg.persistence,
            ..FilterInput::default()
        },
        limit: cfg.feed_limit,
        summary: false,
    };
    for arg in std::env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("--from=") {
            args.input.start_date = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--to=") {
            args.input.end_date = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--category=") {
            args.input.category = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--actor=") {
            args.input.actor = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--q=") {
            args.input.search_text = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--severity=") {
            args.input.severities = v.split(',').map(|s| s.trim().to_string()).collect();
        } else if let Some(v) = arg.strip_prefix("--recent=") {
            match v.parse() {
                Ok(h) => args.input.recency_hours = h,
                Err(_) => eprintln!("ignoring bad --recent value: {}", v),
            }
        } else if let Some(v) = arg.strip_prefix("--limit=") {
            match v.parse() {
                Ok(n) => args.limit = n,
                Err(_) => eprintln!("ignoring bad --limit value: {}", v),
            }
        } else if arg == "--persist" {
            args.input.persistence = true;
        } else if arg == "--summary" {
            args.summary = true;
        } else if arg.starts_with("--") {
            eprintln!("unknown option: {}", arg);
        } else {
            args.path = PathBuf::from(arg);
        }
    }
    args
}

fn main() -> Result<()> {
    let cfg = EngineConfig::from_env();
    let args = parse_args(&cfg);
    let synonyms = cfg.synonyms()?;

    let (raws, info) = load_path(&args.path)?;
    let index = EventIndex::build(&raws, synonyms, ts_epoch_ms());
    let spec = args.input.into_spec();
    let visible = apply(&index, &spec);

    log(
        Level::Info,
        Domain::System,
        "query_done",
        obj(&[
            ("path", v_str(&args.path.display().to_string())),
            ("active", json!(spec.active_predicates())),
            ("visible", json!(visible.len())),
            ("indexed", json!(index.len())),
        ]),
    );

    let limits = ViewLimits { feed: args.limit, ..cfg.view_limits() };
    let payload = if args.summary {
        json!({
            "payload": info,
            "report": index.report(),
            "overview": overview(&visible, limits),
        })
    } else {
        json!({
            "payload": info,
            "report": index.report(),
            "visible": visible.len(),
            "events": top_n(&visible, args.limit),
        })
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
