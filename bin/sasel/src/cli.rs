//! Command line interface.

use std::{
    fmt,
    net::{IpAddr, Ipv6Addr},
    path::PathBuf,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr, bail, eyre};
use sasel::{
    Interface, InterfaceId, OutputFlags, PacketOptions, RouteCache, RouteQuery, ScopedAddr,
    SelectionConfig, SelectionPath, SourceHints, SourceSelector,
};
use sasel_policy::PolicySnapshot;
use sasel_primitives::Scope;
use serde::Serialize;

/// What-if IPv6 source address and route selection.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration (applies to all subcommands).
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Host description (interfaces, addresses, routes, routers).
    #[arg(long, short = 't', value_name = "FILE")]
    topology: PathBuf,

    /// Selection settings. Defaults apply when omitted.
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,

    #[command(subcommand)]
    command: Command,
}

/// Logging options.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct LogArgs {
    /// Silence all output but errors.
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,

    /// Verbose mode (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbosity: u8,

    /// Log filter directive (e.g., "sasel_scorer=trace").
    #[arg(long = "log.filter", value_name = "DIRECTIVE", global = true)]
    pub(crate) filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json", global = true)]
    pub(crate) json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pick the source address for a destination.
    Source(SourceArgs),
    /// Resolve the outgoing interface and route for a destination.
    Route(RouteArgs),
    /// Show the policy table, or the entry an address matches.
    Policy {
        address: Option<Ipv6Addr>,
    },
}

/// Options shared by every send.
#[derive(Debug, clap::Args)]
struct SendArgs {
    /// Destination, optionally zoned by interface name or index (`fe80::1%en0`).
    destination: String,

    /// Pin the outgoing interface.
    #[arg(long, short = 'i', value_name = "NAME")]
    interface: Option<String>,

    /// Explicit source address.
    #[arg(long, short = 's', value_name = "ADDR")]
    source: Option<String>,

    /// Explicit next hop.
    #[arg(long, value_name = "ADDR")]
    next_hop: Option<IpAddr>,

    #[arg(long)]
    no_cellular: bool,

    #[arg(long)]
    no_expensive: bool,

    #[arg(long)]
    no_constrained: bool,

    #[arg(long, conflicts_with = "prefer_temporary")]
    prefer_stable: bool,

    #[arg(long)]
    prefer_temporary: bool,

    /// Ask for a CLAT46 source address.
    #[arg(long)]
    clat46: bool,

    /// Accept sources on expensive interfaces other than the outgoing one.
    #[arg(long)]
    allow_expensive_secondary: bool,
}

#[derive(Debug, clap::Args)]
struct SourceArgs {
    #[command(flatten)]
    send: SendArgs,

    /// Address the socket is already bound to.
    #[arg(long, value_name = "ADDR")]
    bound: Option<String>,

    /// Rank candidates only, without resolving a route.
    #[arg(long)]
    core: bool,

    /// Log every scorer decision at debug level.
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, clap::Args)]
struct RouteArgs {
    #[command(flatten)]
    send: SendArgs,

    /// Clone a host route out of a cloning route.
    #[arg(long)]
    clone: bool,

    /// Succeed without a route when the interface is pinned.
    #[arg(long)]
    allow_no_route: bool,
}

impl SendArgs {
    fn flags(&self) -> OutputFlags {
        let mut flags = OutputFlags::empty();
        flags.set(OutputFlags::NO_CELLULAR, self.no_cellular);
        flags.set(OutputFlags::NO_EXPENSIVE, self.no_expensive);
        flags.set(OutputFlags::NO_CONSTRAINED, self.no_constrained);
        flags.set(OutputFlags::PREFER_STABLE, self.prefer_stable);
        flags.set(OutputFlags::PREFER_TEMPORARY, self.prefer_temporary);
        flags.set(OutputFlags::CLAT46, self.clat46);
        flags.set(OutputFlags::ALLOW_EXPENSIVE_SECONDARY, self.allow_expensive_secondary);
        flags
    }

    fn options(&self, selector: &SourceSelector) -> Result<PacketOptions> {
        let mut options = PacketOptions::new().with_flags(self.flags());
        if let Some(name) = &self.interface {
            options = options.with_interface(interface(selector, name)?.id());
        }
        if let Some(source) = &self.source {
            options = options.with_source(parse_scoped(selector, source)?);
        }
        if let Some(next_hop) = self.next_hop {
            options = options.with_next_hop(next_hop);
        }
        Ok(options)
    }
}

impl Cli {
    pub(crate) fn run(&self) -> Result<()> {
        let tables = crate::topology::Topology::load(&self.topology)?.build()?;
        let config = match &self.config {
            Some(path) => SelectionConfig::load(path)
                .wrap_err_with(|| format!("loading configuration {}", path.display()))?,
            None => SelectionConfig::default(),
        };
        let selector = SourceSelector::new(tables, config);

        match &self.command {
            Command::Source(args) => self.emit(&source(&selector, args)?),
            Command::Route(args) => self.emit(&route(&selector, args)?),
            Command::Policy { address } => self.emit(&policy(&selector, *address)),
        }
    }

    fn emit<T: Serialize + fmt::Display>(&self, report: &T) -> Result<()> {
        if self.json_output {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            println!("{report}");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SourceReport {
    source: String,
    interface: Option<String>,
    path: Option<SelectionPath>,
    rule: Option<String>,
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(interface) = &self.interface {
            write!(f, " dev {interface}")?;
        }
        if let Some(path) = self.path {
            write!(f, " ({path})")?;
        }
        if let Some(rule) = &self.rule {
            write!(f, " rule {rule}")?;
        }
        Ok(())
    }
}

fn source(selector: &SourceSelector, args: &SourceArgs) -> Result<SourceReport> {
    let destination = parse_scoped(selector, &args.send.destination)?;

    if args.core {
        let pinned = args
            .send
            .interface
            .as_deref()
            .map(|name| interface(selector, name))
            .transpose()?;
        let scored = selector.select_source_core(
            destination,
            SourceHints::from(args.send.flags()),
            pinned.as_ref(),
            args.debug,
        )?;
        return Ok(SourceReport {
            source: scored.address.scoped().to_string(),
            interface: Some(scored.address.interface().name().to_owned()),
            path: None,
            rule: Some(scored.rule.to_string()),
        });
    }

    let mut options = args.send.options(selector)?;
    let bound = args
        .bound
        .as_deref()
        .map(|b| parse_scoped(selector, b))
        .transpose()?;
    let mut cache = RouteCache::new();
    let chosen = selector.select_source(destination, &mut options, bound, None, &mut cache)?;
    Ok(SourceReport {
        source: chosen.address.to_string(),
        interface: chosen.interface.map(|i| i.name().to_owned()),
        path: Some(chosen.path),
        rule: chosen.rule.map(|r| r.to_string()),
    })
}

#[derive(Debug, Serialize)]
struct RouteReport {
    interface: String,
    route: Option<String>,
    local_destination: bool,
}

impl fmt::Display for RouteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route {
            Some(route) => write!(f, "{route}")?,
            None => write!(f, "dev {} (no route)", self.interface)?,
        }
        if self.local_destination {
            write!(f, " [local]")?;
        }
        Ok(())
    }
}

fn route(selector: &SourceSelector, args: &RouteArgs) -> Result<RouteReport> {
    let destination = parse_scoped(selector, &args.send.destination)?;
    let mut options = args.send.options(selector)?;
    let source = options.source;
    let query = RouteQuery::new(destination)
        .with_source(source)
        .with_options(&mut options)
        .cloning(args.clone)
        .allow_no_route(args.allow_no_route);
    let selection = selector.select_route(query, &mut RouteCache::new())?;
    Ok(RouteReport {
        interface: selection.interface.name().to_owned(),
        route: selection.route.map(|r| r.to_string()),
        local_destination: selection.local_destination,
    })
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct PolicyReport(Vec<PolicySnapshot>);

impl fmt::Display for PolicyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} {:>10} {:>5}", "prefix", "precedence", "label")?;
        for entry in &self.0 {
            writeln!(
                f,
                "{:<20} {:>10} {:>5}",
                entry.prefix.to_string(),
                entry.precedence,
                entry.label.to_string()
            )?;
        }
        Ok(())
    }
}

fn policy(selector: &SourceSelector, address: Option<Ipv6Addr>) -> PolicyReport {
    match address {
        Some(addr) => PolicyReport(vec![selector.policy().lookup(&addr).snapshot()]),
        None => PolicyReport(selector.policy().snapshot()),
    }
}

/// An interface by name, or by index when the name is numeric.
fn interface(selector: &SourceSelector, name: &str) -> Result<Arc<Interface>> {
    let interfaces = &selector.tables().interfaces;
    let found = match name.parse::<u32>() {
        Ok(index) => interfaces.get(InterfaceId::new(index)),
        Err(_) => interfaces.by_name(name),
    };
    found.ok_or_else(|| eyre!("unknown interface {name}"))
}

/// Parse `addr` or `addr%zone`, resolving the zone through the interface's
/// zone table.
fn parse_scoped(selector: &SourceSelector, input: &str) -> Result<ScopedAddr> {
    let (addr, zone) = match input.split_once('%') {
        Some((addr, zone)) => (addr, Some(zone)),
        None => (input, None),
    };
    let addr: Ipv6Addr = addr.parse().wrap_err_with(|| format!("invalid address {input}"))?;
    let Some(zone) = zone else {
        return Ok(ScopedAddr::unzoned(addr));
    };

    let scope = Scope::of(&addr);
    if !scope.is_zoned() {
        bail!("{input}: {scope} addresses take no zone");
    }
    let interface = interface(selector, zone)?;
    Ok(ScopedAddr::new(addr, interface.zones().zone(scope)))
}
