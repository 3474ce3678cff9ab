use crate::engine::ring::Partitioner;
use crate::test_helpers::factories::RingFactory;

#[test]
fn builds_twelve_node_ring_ending_at_max_token() {
    let ring = RingFactory::new().create();
    assert_eq!(ring.entries().len(), 12);
    assert_eq!(
        ring.entries().last().unwrap().token,
        Partitioner::Murmur3.max_token()
    );
    assert_eq!(ring.entries()[0].fqdn, "dc1-node1.local");
}

#[test]
fn interleaves_datacenters() {
    let entries = RingFactory::new()
        .with_datacenters(&[("DC1", 2), ("DC2", 2)])
        .entries();
    let dcs: Vec<&str> = entries.iter().map(|e| e.datacenter.as_str()).collect();
    assert_eq!(dcs, vec!["DC1", "DC2", "DC1", "DC2"]);
}
