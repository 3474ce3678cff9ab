use crate::engine::ring::{
    Partitioner, ReplicationFactor, RingEntry, RingTopology, Token,
};

pub struct RingFactory {
    partitioner: Partitioner,
    replication: ReplicationFactor,
    datacenters: Vec<(String, usize)>,
    racks_per_dc: usize,
    filter_dc: Option<String>,
    overrides: Vec<(usize, String, String)>,
}

impl RingFactory {
    pub fn new() -> Self {
        Self {
            partitioner: Partitioner::Murmur3,
            replication: ReplicationFactor::network_topology([("DC1", 3)]),
            datacenters: vec![("DC1".to_string(), 12)],
            racks_per_dc: 1,
            filter_dc: None,
            overrides: Vec::new(),
        }
    }

    pub fn with_nodes(mut self, count: usize) -> Self {
        self.datacenters = vec![("DC1".to_string(), count)];
        self
    }

    pub fn with_datacenters(mut self, dcs: &[(&str, usize)]) -> Self {
        self.datacenters = dcs.iter().map(|(dc, n)| (dc.to_string(), *n)).collect();
        self
    }

    pub fn with_replication(mut self, replication: ReplicationFactor) -> Self {
        self.replication = replication;
        self
    }

    pub fn with_partitioner(mut self, partitioner: Partitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn with_racks(mut self, racks: usize) -> Self {
        self.racks_per_dc = racks.max(1);
        self
    }

    pub fn with_filter(mut self, dc: &str) -> Self {
        self.filter_dc = Some(dc.to_string());
        self
    }

    /// Overrides status/state of the node at ring position `index`.
    pub fn with_node_state(mut self, index: usize, status: &str, state: &str) -> Self {
        self.overrides
            .push((index, status.to_string(), state.to_string()));
        self
    }

    /// Evenly spaced tokens; the last node always owns the maximum token.
    pub fn entries(&self) -> Vec<RingEntry> {
        let total: usize = self.datacenters.iter().map(|(_, n)| *n).sum();
        let full = self.partitioner.full_range();
        let step = full.width() / total as u128;
        let mut dcs = Vec::with_capacity(total);
        let mut remaining: Vec<(String, usize)> = self.datacenters.clone();
        // interleave datacenters around the ring
        while dcs.len() < total {
            for (dc, left) in remaining.iter_mut() {
                if *left > 0 {
                    dcs.push(dc.clone());
                    *left -= 1;
                }
            }
        }

        let mut per_dc_index = std::collections::HashMap::<String, usize>::new();
        (0..total)
            .map(|i| {
                let dc = dcs[i].clone();
                let n = per_dc_index.entry(dc.clone()).or_insert(0);
                let local = *n;
                *n += 1;
                let token = Token(
                    full.lower().0 + (step * (i as u128 + 1)) as i128 - 1,
                );
                let token = if i + 1 == total {
                    self.partitioner.max_token()
                } else {
                    token
                };
                let (status, state) = self
                    .overrides
                    .iter()
                    .rev()
                    .find(|(idx, _, _)| *idx == i)
                    .map(|(_, s, st)| (s.clone(), st.clone()))
                    .unwrap_or_else(|| ("UP".to_string(), "NORMAL".to_string()));
                RingEntry {
                    token,
                    fqdn: format!("{}-node{}.local", dc.to_lowercase(), local + 1),
                    address: format!("127.0.{}.{}", i / 250, i % 250 + 1),
                    port: 9042,
                    datacenter: dc,
                    rack: format!("rack{}", local % self.racks_per_dc + 1),
                    status,
                    state,
                }
            })
            .collect()
    }

    pub fn create(self) -> RingTopology {
        let entries = self.entries();
        RingTopology::new(
            self.partitioner,
            self.replication,
            entries,
            self.filter_dc.as_deref(),
        )
        .expect("valid test ring")
    }
}
