// Chain invariants and end-to-end scenarios (genesis, mining, adjacency,
// replacement, retargeting) independent of networking.

use loomchain::consensus::chain::Chain;
use loomchain::consensus::genesis::mine_genesis;

const INTERVAL: u64 = 5;

#[test]
fn genesis_block_is_fixed_and_valid() {
    let chain = Chain::new(INTERVAL);
    assert_eq!(chain.length(), 1);
    assert!(chain.is_valid_chain());
    let genesis = mine_genesis();
    assert_eq!(chain.tip(), &genesis);
}

#[test]
fn mine_ten_blocks_with_one_retarget_step() {
    let mut chain = Chain::new(INTERVAL);
    let genesis_target = chain.tip().target.clone();
    for i in 0..9 {
        assert!(chain.mine(format!("payload-{i}")));
    }
    assert_eq!(chain.length(), 10);
    assert_eq!(chain.tip().target, genesis_target, "no retarget before height 10");

    assert!(chain.mine("payload-9".into()));
    assert_eq!(chain.length(), 11);
    assert!(chain.is_valid_chain());
}

#[test]
fn add_block_rejects_non_adjacent_block() {
    let mut chain = Chain::new(INTERVAL);
    let mut detached = Chain::new(INTERVAL);
    detached.mine("a".into());
    detached.mine("b".into());

    let non_adjacent = detached.blocks()[2].clone();
    assert!(!chain.add_block(non_adjacent));
    assert_eq!(chain.length(), 1);
}

#[test]
fn replace_accepts_strictly_longer_chain() {
    let mut chain = Chain::new(INTERVAL);
    let mut longer = Chain::new(INTERVAL);
    longer.mine("a".into());
    longer.mine("b".into());

    assert!(chain.replace(longer.clone()));
    assert_eq!(chain, longer);
    assert_eq!(chain.length(), 3);
}

#[test]
fn replace_does_not_accept_equal_length_tie() {
    let mut chain = Chain::new(INTERVAL);
    chain.mine("a".into());
    let same_length = {
        let mut c = Chain::new(INTERVAL);
        c.mine("different-payload".into());
        c
    };
    assert!(!chain.replace(same_length));
    assert_eq!(chain.length(), 2);
}

#[test]
fn replace_rejects_shorter_candidate() {
    let mut chain = Chain::new(INTERVAL);
    chain.mine("a".into());
    chain.mine("b".into());
    let shorter = Chain::new(INTERVAL);
    assert!(!chain.replace(shorter));
    assert_eq!(chain.length(), 3);
}

#[test]
fn tampered_block_fails_validation_round_trip() {
    let mut chain = Chain::new(INTERVAL);
    chain.mine("legit".into());
    let mut wire = chain.to_wire();
    // Flip a data byte without re-mining; the stored hash no longer matches.
    wire.blocks[1].data.push('!');
    assert!(Chain::from_wire(wire, INTERVAL).is_none());
}

#[test]
fn wire_round_trip_preserves_chain() {
    let mut chain = Chain::new(INTERVAL);
    chain.mine("a".into());
    chain.mine("b".into());
    let wire = chain.to_wire();
    let restored = Chain::from_wire(wire, INTERVAL).expect("valid wire chain parses");
    assert_eq!(chain, restored);
}
