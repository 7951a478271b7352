//! Inputwatch CLI - inspect and exercise call-site interception
//!
//! Commands:
//!   inputwatch selectors          - List intercepted selectors
//!   inputwatch probe <selector>   - Link and invoke one call site, printing observed inputs

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use inputwatch::{
    CallFlags, CallSiteLinker, DynamicLinker, InterceptorRegistry, LinkRequest, PropertyMap,
    PropertyStore, RecordingEnvironment, Signature, SystemFacade, Value,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inputwatch")]
#[command(about = "Call-site interception for build input tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectors that have interceptors
    Selectors {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Link a method call site through the interceptors and invoke it once
    Probe {
        /// Method name at the call site
        selector: String,

        /// Call arguments: `null`, `{k=v,...}` for a map, anything else is a string
        args: Vec<String>,

        /// Initial property, as KEY=VALUE (repeatable)
        #[arg(long = "prop", short = 'D')]
        props: Vec<String>,

        /// Name of the calling unit
        #[arg(long, default_value = "build.gradle")]
        consumer: String,

        /// Which object receives the call
        #[arg(long, value_enum, default_value_t = Receiver::System)]
        receiver: Receiver,

        /// Pass the arguments spread from a single array
        #[arg(long)]
        spread: bool,

        /// Use safe navigation (`?.`) at the call site
        #[arg(long)]
        safe: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Receiver {
    /// The environment facade the interceptors are scoped to
    System,
    /// A different object of the same type
    Other,
    Null,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Selectors { json } => selectors_command(json),
        Commands::Probe {
            selector,
            args,
            props,
            consumer,
            receiver,
            spread,
            safe,
            json,
        } => {
            let mut flags = CallFlags::empty();
            flags.set(CallFlags::SPREAD_CALL, spread);
            flags.set(CallFlags::SAFE_NAVIGATION, safe);
            probe_command(&selector, &args, &props, &consumer, receiver, flags, json)
        }
    }
}

fn selectors_command(json: bool) -> anyhow::Result<()> {
    let store = Arc::new(PropertyStore::new(PropertyMap::new()));
    let recorder = Arc::new(RecordingEnvironment::new(store.clone()));
    let registry = InterceptorRegistry::standard(SystemFacade::object(store), recorder)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry.selectors())?);
    } else {
        for selector in registry.selectors() {
            println!("{}", selector);
        }
    }
    Ok(())
}

fn parse_property(spec: &str) -> anyhow::Result<(String, Value)> {
    let (key, value) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", spec))?;
    if key.is_empty() {
        bail!("empty property key in '{}'", spec);
    }
    Ok((key.to_string(), Value::from(value)))
}

fn parse_argument(arg: &str) -> anyhow::Result<Value> {
    if arg == "null" {
        return Ok(Value::Null);
    }
    if let Some(body) = arg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let mut map = PropertyMap::new();
        for entry in body.split(',').filter(|e| !e.is_empty()) {
            let (key, value) = parse_property(entry)?;
            map.insert(key, value);
        }
        return Ok(Value::Map(map));
    }
    Ok(Value::from(arg))
}

fn probe_command(
    selector: &str,
    args: &[String],
    props: &[String],
    consumer: &str,
    receiver: Receiver,
    flags: CallFlags,
    json: bool,
) -> anyhow::Result<()> {
    let initial = props
        .iter()
        .map(|p| parse_property(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let store = Arc::new(PropertyStore::new(initial.clone()));
    let system = SystemFacade::object(store.clone());
    let recorder = Arc::new(RecordingEnvironment::new(store.clone()));
    let registry = InterceptorRegistry::standard(system.clone(), recorder.clone())?;
    let linker = CallSiteLinker::new(Arc::new(registry), Arc::new(DynamicLinker::new()));

    let receiver = match receiver {
        Receiver::System => Value::Object(system),
        Receiver::Other => Value::Object(SystemFacade::object(Arc::new(PropertyStore::new(
            initial,
        )))),
        Receiver::Null => Value::Null,
    };
    let logical = args
        .iter()
        .map(|a| parse_argument(a))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut packed = vec![receiver];
    if flags.is_spread() {
        packed.push(Value::Array(logical));
    } else {
        packed.extend(logical);
    }

    let request = LinkRequest::method(consumer, selector, Signature::generic(packed.len()))
        .with_flags(flags);
    let site = linker
        .bootstrap(&request)
        .with_context(|| format!("failed to link call site for {}", selector))?;
    let result = site
        .invoke(&packed)
        .map_err(|e| anyhow!("{}() raised: {}", selector, e))?;

    let observed = recorder.observed();
    if json {
        let report = serde_json::json!({
            "result": result,
            "observed": observed,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("result: {}", serde_json::to_string(&result)?);
        if observed.is_empty() {
            println!("observed: none");
        }
        for input in &observed {
            println!("observed: {}", serde_json::to_string(input)?);
        }
    }
    Ok(())
}
