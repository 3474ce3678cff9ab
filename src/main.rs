use anyhow::{Context, bail};
use cass_bulk::engine::ring::{
    Partitioner, ReplicationFactor, RingEntry, RingTopology, TokenPartitioner,
};
use cass_bulk::logging;
use clap::Parser;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "cass_bulk")]
#[command(about = "Print the token-range partition plan of a ring", long_about = None)]
struct Args {
    /// JSON file holding the ring as an array of entries
    #[arg(short, long)]
    ring: PathBuf,

    /// Partitioner class name, short or fully qualified
    #[arg(long, default_value = "Murmur3Partitioner")]
    partitioner: String,

    /// Replication as DC=N pairs (DC1=3,DC2=3); a bare number means SimpleStrategy
    #[arg(long, default_value = "3")]
    replication: String,

    /// Only plan against nodes of this datacenter
    #[arg(long)]
    dc: Option<String>,

    #[arg(short, long, default_value = "1")]
    parallelism: usize,

    #[arg(long, default_value = "1")]
    cores: usize,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

fn parse_replication(value: &str) -> anyhow::Result<ReplicationFactor> {
    if let Ok(n) = value.trim().parse::<usize>() {
        return Ok(ReplicationFactor::simple(n));
    }
    let mut datacenters = Vec::new();
    for pair in value.split(',').filter(|p| !p.trim().is_empty()) {
        let Some((dc, n)) = pair.split_once('=') else {
            bail!("expected DC=N, got {pair}");
        };
        let n: usize = n
            .trim()
            .parse()
            .with_context(|| format!("replica count of {dc}"))?;
        datacenters.push((dc.trim().to_string(), n));
    }
    Ok(ReplicationFactor::network_topology(datacenters))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init()?;

    let raw = fs::read_to_string(&args.ring)
        .with_context(|| format!("reading ring file {}", args.ring.display()))?;
    let entries: Vec<RingEntry> = serde_json::from_str(&raw).context("parsing ring file")?;
    let partitioner = Partitioner::from_class_name(&args.partitioner)?;
    let replication = parse_replication(&args.replication)?;

    let ring = RingTopology::new(partitioner, replication, entries, args.dc.as_deref())?;
    let plan = TokenPartitioner::new(&ring, args.parallelism, args.cores)?;
    info!(
        target: "cass_bulk::ring",
        partitions = plan.num_partitions(),
        "Plan computed"
    );

    let mut rows = Vec::with_capacity(plan.num_partitions());
    for (id, range) in plan.ranges().iter().enumerate() {
        let replicas: Vec<&str> = plan
            .replicas_for_partition(&ring, id)?
            .iter()
            .map(|r| r.fqdn.as_str())
            .collect();
        let replica_sets = ring.replica_sets_for_range(range).len();
        if args.json {
            rows.push(json!({
                "partition": id,
                "lower": range.lower().to_string(),
                "upper": range.upper().to_string(),
                "replica_sets": replica_sets,
                "replicas": replicas,
            }));
        } else {
            println!("{id:>5}  {range}  sets={replica_sets}  {}", replicas.join(","));
        }
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}
