//! Run candidate search against realistic hands.

use fzmahjong_tiles::{ChiCandidate, RunPosition, Tile, TileFace, TileKind, chi_candidates};

fn tile(kind: TileKind, rank: i64, id: &str) -> Tile {
    Tile::new(kind, rank, id).expect("valid tile")
}

fn face(kind: TileKind, rank: i64) -> TileFace {
    TileFace::new(kind, rank).expect("valid face")
}

fn positions(candidates: &[ChiCandidate]) -> Vec<RunPosition> {
    candidates.iter().map(|c| c.position).collect()
}

#[test]
fn test_gap_filled_by_discard() {
    let hand = vec![tile(TileKind::Wan, 2, "w2"), tile(TileKind::Wan, 4, "w4")];
    let discarded = tile(TileKind::Wan, 3, "w3");
    let gold = face(TileKind::Tiao, 1);

    let candidates = chi_candidates(&hand, &discarded, Some(&gold));

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].first.rank(), 2);
    assert_eq!(candidates[0].second.rank(), 4);
    assert_eq!(candidates[0].position, RunPosition::Mid);
}

#[test]
fn test_gold_in_hand_suppresses_runs_using_it() {
    let hand = vec![tile(TileKind::Bing, 3, "b3"), tile(TileKind::Bing, 4, "b4")];
    let discarded = tile(TileKind::Bing, 5, "b5");
    let gold = face(TileKind::Bing, 4);

    let candidates = chi_candidates(&hand, &discarded, Some(&gold));

    assert!(candidates.is_empty());
}

#[test]
fn test_honor_and_flower_discards_have_no_runs() {
    let hand = vec![
        tile(TileKind::Wind, 1, "e1"),
        tile(TileKind::Wind, 2, "s1"),
        tile(TileKind::Wind, 3, "w1"),
        tile(TileKind::Dragon, 1, "r1"),
        tile(TileKind::Dragon, 3, "g1"),
    ];

    for (kind, rank) in [
        (TileKind::Wind, 2),
        (TileKind::Dragon, 2),
        (TileKind::Flower, 3),
    ] {
        let discarded = tile(kind, rank, "d");
        assert!(chi_candidates(&hand, &discarded, None).is_empty());
    }
}

#[test]
fn test_gold_discard_voids_search() {
    let hand = vec![tile(TileKind::Tiao, 4, "t4"), tile(TileKind::Tiao, 6, "t6")];
    let discarded = tile(TileKind::Tiao, 5, "t5");
    let gold = face(TileKind::Tiao, 5);

    assert!(chi_candidates(&hand, &discarded, Some(&gold)).is_empty());
}

#[test]
fn test_flipping_a_mid_neighbour_to_gold_keeps_other_positions() {
    let hand = vec![
        tile(TileKind::Wan, 3, "w3"),
        tile(TileKind::Wan, 4, "w4"),
        tile(TileKind::Wan, 6, "w6"),
        tile(TileKind::Wan, 7, "w7"),
    ];
    let discarded = tile(TileKind::Wan, 5, "w5");

    let plain = chi_candidates(&hand, &discarded, None);
    assert_eq!(
        positions(&plain),
        [RunPosition::Low, RunPosition::Mid, RunPosition::High]
    );

    // Only rank 4 is gold: LOW (3,4) and MID (4,6) vanish, HIGH (6,7) survives.
    let gold = face(TileKind::Wan, 4);
    let with_gold = chi_candidates(&hand, &discarded, Some(&gold));
    assert_eq!(positions(&with_gold), [RunPosition::High]);
}

#[test]
fn test_mid_removed_when_outer_neighbour_is_gold() {
    let hand = vec![
        tile(TileKind::Bing, 1, "b1"),
        tile(TileKind::Bing, 2, "b2"),
        tile(TileKind::Bing, 4, "b4"),
    ];
    let discarded = tile(TileKind::Bing, 3, "b3");

    assert_eq!(
        positions(&chi_candidates(&hand, &discarded, None)),
        [RunPosition::Low, RunPosition::Mid]
    );

    let gold = face(TileKind::Bing, 4);
    assert_eq!(
        positions(&chi_candidates(&hand, &discarded, Some(&gold))),
        [RunPosition::Low]
    );
}

#[test]
fn test_other_suits_never_mix() {
    let hand = vec![tile(TileKind::Wan, 2, "w2"), tile(TileKind::Tiao, 4, "t4")];
    let discarded = tile(TileKind::Bing, 3, "b3");

    assert!(chi_candidates(&hand, &discarded, None).is_empty());
}

#[test]
fn test_wire_tiles_feed_the_search() {
    let hand: Vec<Tile> = serde_json::from_str(
        r#"[{"type":"TIAO","value":7,"id":"TIAO7_1"},{"type":"TIAO","value":8,"id":"TIAO8_2"}]"#,
    )
    .expect("hand parses");
    let discarded: Tile =
        serde_json::from_str(r#"{"type":"TIAO","value":9,"id":"TIAO9_3"}"#).expect("tile parses");

    let candidates = chi_candidates(&hand, &discarded, None);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].tile_ids(), ("TIAO7_1", "TIAO8_2"));
    assert_eq!(candidates[0].position, RunPosition::Low);
}
