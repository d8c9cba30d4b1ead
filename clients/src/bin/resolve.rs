//! `kbf-resolve` — resolves names through the facade against an in-memory
//! knowledge base.
//!
//! **Usage:**
//! ```text
//! kbf-resolve [--fixture <path>] [--config <path>] [--kind <kind>] [--create] [--json] <name>...
//! ```
//!
//! Without `--fixture` the bundled animals fixture is used. Logging follows
//! `RUST_LOG`, falling back to the `[log]` section of the configuration.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kbf_kinds::{Kind, KindRegistry};
use kbf_memory::MemoryKb;
use kbfacade::render::json::object_to_json;
use kbfacade::{Factory, FactoryConfig, FacadeError, FacadeObject, KbStatus};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Resolve knowledge-base names to typed facade objects.
#[derive(Parser)]
#[command(
    name = "kbf-resolve",
    about = "Resolve names to facade objects of a requested kind",
    version
)]
struct Args {
    /// Knowledge-base fixture (JSON). Defaults to the bundled animals fixture.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Factory configuration (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Requested kind.
    #[arg(long, default_value = "Object")]
    kind: Kind,

    /// Create missing names and coerce terms to the requested kind.
    #[arg(long)]
    create: bool,

    /// Print one JSON object per name instead of text.
    #[arg(long)]
    json: bool,

    /// Names to resolve.
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FactoryConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FactoryConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let kb = match &args.fixture {
        Some(path) => MemoryKb::load(path)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?,
        None => MemoryKb::animals().context("Failed to load the bundled fixture")?,
    };
    info!(fixture = ?args.fixture, kind = %args.kind, "resolving {} name(s)", args.names.len());

    let factory = Factory::with_config(
        Arc::new(kb),
        Arc::new(KindRegistry::standard()),
        config,
    );

    let mut failed = 0usize;
    for name in &args.names {
        let outcome = if args.create {
            factory.find_or_create(name.as_str(), args.kind)
        } else {
            factory.get(name.as_str(), args.kind)
        };
        match outcome {
            Ok(object) => {
                let arity = describe_arity(&factory, &object)?;
                if args.json {
                    let mut value = object_to_json(&object);
                    if let (Value::Object(map), Some(arity)) = (&mut value, arity) {
                        map.insert("arity".to_owned(), Value::String(arity));
                    }
                    println!("{}", json!({ "name": name, "object": value }));
                } else {
                    match arity {
                        Some(arity) => println!("{name}\t{}\tarity {arity}", object.kind()),
                        None => println!("{name}\t{}", object.kind()),
                    }
                }
            }
            Err(err) => {
                failed += 1;
                let status = status_of(&factory, name, args.kind, &err);
                debug!(%name, error = %err, "resolution failed");
                if args.json {
                    println!(
                        "{}",
                        json!({ "name": name, "status": status, "error": err.to_string() })
                    );
                } else {
                    println!("{name}\t{status}\t{err}");
                }
            }
        }
    }

    if failed > 0 {
        process::exit(1);
    }
    Ok(())
}

fn describe_arity(factory: &Factory, object: &FacadeObject) -> Result<Option<String>> {
    if object.as_relation().is_none() {
        return Ok(None);
    }
    let arity = factory
        .arity_of(object)
        .with_context(|| format!("Failed to read the arity of {object}"))?;
    Ok(Some(arity.to_string()))
}

fn status_of(factory: &Factory, name: &str, kind: Kind, err: &FacadeError) -> &'static str {
    if matches!(err, FacadeError::NotFound { .. }) {
        return "missing";
    }
    match factory.get_status(name, kind) {
        Ok(KbStatus::ExistsAsKind) => "exists",
        Ok(KbStatus::ExistsNotAsKind) => "other-kind",
        Ok(KbStatus::DoesNotExist) => "missing",
        Err(_) => "error",
    }
}
