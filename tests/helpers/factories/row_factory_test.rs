use crate::engine::ring::{Partitioner, Token, TokenRange};
use crate::test_helpers::factories::RowFactory;

#[test]
fn rows_are_sorted_and_inside_range() {
    let range = TokenRange::new(Token(0), Partitioner::Murmur3.full_range().upper()).unwrap();
    let factory = RowFactory::new().in_range(range);
    let rows = factory.create_list(25);

    assert_eq!(rows.len(), 25);
    let tokens: Vec<Token> = rows.iter().map(|r| factory.token_of(r)).collect();
    assert!(tokens.windows(2).all(|w| w[0] <= w[1]));
    assert!(tokens.iter().all(|t| range.contains(*t)));
    assert!(!range.contains(factory.token_of(&factory.outside())));
}
