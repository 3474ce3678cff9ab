use crate::engine::errors::RingError;
use crate::engine::ring::{Partitioner, Token, TokenRange};

#[test]
fn partitioner_accepts_short_and_qualified_names() {
    assert_eq!(
        Partitioner::from_class_name("org.apache.cassandra.dht.Murmur3Partitioner").unwrap(),
        Partitioner::Murmur3
    );
    assert_eq!(
        Partitioner::from_class_name("RandomPartitioner").unwrap(),
        Partitioner::Random
    );
    assert!(matches!(
        Partitioner::from_class_name("ByteOrderedPartitioner"),
        Err(RingError::UnsupportedPartitioner(_))
    ));
}

#[test]
fn murmur3_full_range_spans_two_to_the_sixty_four() {
    let full = Partitioner::Murmur3.full_range();
    assert_eq!(full.lower(), Token::from(i64::MIN));
    assert_eq!(full.last(), Token::from(i64::MAX));
    assert_eq!(full.width(), 1u128 << 64);
}

#[test]
fn random_tokens_stay_inside_the_token_space() {
    let p = Partitioner::Random;
    for key in [&b"a"[..], b"partition", b"", b"\x00\x01\x02"] {
        let t = p.token(key);
        assert!(p.contains(t), "{t} outside random token space");
        assert!(t.value() >= 0);
    }
}

#[test]
fn empty_range_is_rejected() {
    let t = Token::new(5);
    assert!(matches!(
        TokenRange::new(t, t),
        Err(RingError::EmptyRange { .. })
    ));
    assert!(TokenRange::new(Token::new(6), t).is_err());
}

#[test]
fn range_is_half_open() {
    let r = TokenRange::new(Token::new(-10), Token::new(10)).unwrap();
    assert!(r.contains(Token::new(-10)));
    assert!(r.contains(Token::new(9)));
    assert!(!r.contains(Token::new(10)));
    assert_eq!(r.last(), Token::new(9));
    assert_eq!(r.width(), 20);
    assert_eq!(r.to_string(), "[-10, 10)");
}

#[test]
fn intersection_ignores_touching_bounds() {
    let a = TokenRange::new(Token::new(0), Token::new(10)).unwrap();
    let b = TokenRange::new(Token::new(10), Token::new(20)).unwrap();
    let c = TokenRange::new(Token::new(9), Token::new(11)).unwrap();
    assert!(!a.intersects(&b));
    assert!(a.intersects(&c));
    assert!(b.intersects(&c));
    assert_eq!(a.intersection(&b), None);
    assert_eq!(
        a.intersection(&c),
        Some(TokenRange::new(Token::new(9), Token::new(10)).unwrap())
    );
}

#[test]
fn offset_splits_the_full_ring_without_overflow() {
    let full = Partitioner::Murmur3.full_range();
    assert_eq!(full.offset(1, 2), Token::new(0));
    let random = Partitioner::Random.full_range();
    let mid = random.offset(1, 2);
    assert!(random.contains(mid));
}
