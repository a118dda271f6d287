//! Integration tests for leaf decoding and bottom-up propagation.

use rstest::rstest;

use biogeo::domain::{
    compute_biogeography, extract, parse_newick, DomainError, NodeId, PhyloTree, Propagator,
    RoundingPolicy,
};

/// Annotate the whole tree with default settings.
fn annotate(newick: &str) -> PhyloTree {
    let mut tree = parse_newick(newick).expect("parse tree");
    let root = tree.root().expect("root");
    compute_biogeography(&mut tree, root).expect("propagate");
    tree
}

fn pairs(tree: &PhyloTree, idx: NodeId) -> Vec<(String, f64)> {
    tree.node(idx)
        .and_then(|n| n.biogeography.as_ref())
        .map(|b| b.iter().map(|(c, p)| (c.to_string(), p)).collect())
        .unwrap_or_default()
}

#[rstest]
#[case("Panthera_leo_AB1_AF", "Panthera leo", "AF")]
#[case("Puma_concolor_XY99_NA", "Puma concolor", "NA")]
#[case("Homo_sapiens_SEA", "Homo sapiens", "SEA")]
#[case("Canis_lupus_sub_1_2_OC", "Canis lupus", "OC")]
fn given_leaf_label_when_extracting_then_splits_name_and_location(
    #[case] label: &str,
    #[case] display: &str,
    #[case] location: &str,
) {
    let leaf = extract(label).unwrap();
    assert_eq!(leaf.display_name, display);
    assert_eq!(leaf.location.as_str(), location);
}

#[rstest]
#[case("OnlyOneUnderscore_x")]
#[case("nounderscore")]
#[case("Genus__AF")]
#[case("Genus_species_")]
fn given_malformed_label_when_extracting_then_fails(#[case] label: &str) {
    assert!(matches!(extract(label), Err(DomainError::MalformedLabel { .. })));
}

#[test]
fn given_single_leaf_when_propagating_then_leaf_is_certain() {
    let tree = annotate("Panthera_leo_AB1_AF;");
    let root = tree.root().unwrap();

    assert_eq!(pairs(&tree, root), vec![("AF".to_string(), 1.0)]);
    assert_eq!(tree.node(root).unwrap().display_name.as_deref(), Some("Panthera leo"));
}

#[test]
fn given_single_child_when_propagating_then_passes_distribution_through() {
    let tree = annotate("((Panthera_leo_AB1_AF,Puma_concolor_AB2_NA));");
    let root = tree.root().unwrap();
    let child = tree.node(root).unwrap().children[0];

    assert_eq!(pairs(&tree, root), pairs(&tree, child));
}

#[test]
fn given_binary_split_when_propagating_then_halves() {
    let tree = annotate("(Panthera_leo_AB1_AF,Puma_concolor_AB2_NA);");
    let root = tree.root().unwrap();

    assert_eq!(
        pairs(&tree, root),
        vec![("AF".to_string(), 0.5), ("NA".to_string(), 0.5)]
    );
}

#[test]
fn given_three_way_split_when_propagating_then_rounds_to_two_decimals() {
    let tree = annotate("(a_b_1_AF,a_b_2_NA,a_b_3_AF);");
    let root = tree.root().unwrap();

    assert_eq!(
        pairs(&tree, root),
        vec![("AF".to_string(), 0.67), ("NA".to_string(), 0.33)]
    );
}

#[test]
fn given_unbalanced_children_when_propagating_then_weights_children_not_leaves() {
    // the (AF,AF,AF) clade counts once, the lone NA leaf counts once
    let tree = annotate("((a_b_1_AF,a_b_2_AF,a_b_3_AF),a_b_4_NA);");
    let root = tree.root().unwrap();

    assert_eq!(
        pairs(&tree, root),
        vec![("AF".to_string(), 0.5), ("NA".to_string(), 0.5)]
    );
}

#[test]
fn given_annotated_tree_when_checking_every_node_then_sums_to_one() {
    let tree = annotate("((a_b_1_AF,a_b_2_NA,a_b_3_SEA),(a_b_4_OC,(a_b_5_SA,a_b_6_MAD,a_b_7_AF)),a_b_8_NA);");

    for (idx, node) in tree.iter() {
        let b = node.biogeography.as_ref().expect("every node annotated");
        assert!((b.total() - 1.0).abs() <= 0.01, "node {:?} sums to {}", idx, b.total());
        let ps: Vec<f64> = b.iter().map(|(_, p)| p).collect();
        assert!(ps.windows(2).all(|w| w[0] >= w[1]), "not descending: {ps:?}");
    }
}

#[test]
fn given_equal_probabilities_when_propagating_then_keeps_encounter_order() {
    let first = annotate("(a_b_1_NA,a_b_2_AF);");
    let again = annotate("(a_b_1_NA,a_b_2_AF);");
    let swapped = annotate("(a_b_1_AF,a_b_2_NA);");

    let order = |t: &PhyloTree| -> Vec<String> {
        pairs(t, t.root().unwrap()).into_iter().map(|(c, _)| c).collect()
    };
    assert_eq!(order(&first), vec!["NA", "AF"]);
    assert_eq!(order(&first), order(&again));
    assert_eq!(order(&swapped), vec!["AF", "NA"]);
}

#[test]
fn given_malformed_leaf_when_propagating_then_aborts_without_annotating() {
    let mut tree = parse_newick("((Panthera_leo_AB1_AF,Puma_concolor_AB2_NA),OnlyOneUnderscore_x);").unwrap();
    let root = tree.root().unwrap();

    let err = compute_biogeography(&mut tree, root).unwrap_err();

    assert!(matches!(err, DomainError::MalformedLabel { ref label, .. } if label == "OnlyOneUnderscore_x"));
    assert!(tree.iter().all(|(_, n)| n.biogeography.is_none() && n.display_name.is_none()));
}

#[test]
fn given_subtree_start_when_propagating_then_leaves_rest_untouched() {
    let mut tree = parse_newick("((a_b_1_AF,a_b_2_SA)inner,a_b_3_NA);").unwrap();
    let inner = tree.find_by_label("inner").unwrap();

    let result = compute_biogeography(&mut tree, inner).unwrap();

    assert_eq!(result.get("AF"), Some(0.5));
    assert!(tree.node(tree.root().unwrap()).unwrap().biogeography.is_none());
}

#[rstest]
#[case(RoundingPolicy::Presentation)]
#[case(RoundingPolicy::PerNode)]
fn given_rounding_policy_when_propagating_then_stored_values_sum_in_steps(#[case] policy: RoundingPolicy) {
    let mut tree = parse_newick("((a_b_1_AF,a_b_2_NA,a_b_3_SA),(a_b_4_AF,a_b_5_OC,a_b_6_SEA),a_b_7_MAD);").unwrap();
    let root = tree.root().unwrap();

    let result = Propagator::new(2, policy).compute(&mut tree, root).unwrap();

    assert_eq!(result.precision(), 2);
    let steps: i64 = result.iter().map(|(_, p)| (p * 100.0).round() as i64).sum();
    assert_eq!(steps, 100);
}

/// Caterpillar of `leaves` leaves, built through the arena API so construction
/// itself does not depend on parser nesting.
fn caterpillar(leaves: usize) -> PhyloTree {
    const LOCATIONS: [&str; 4] = ["AF", "NA", "SA", "OC"];
    let mut tree = PhyloTree::new();
    let mut spine = tree.insert_internal("", None).unwrap();
    for i in 0..leaves - 2 {
        let loc = LOCATIONS[i % LOCATIONS.len()];
        tree.insert_leaf(format!("Genus_sp{i}_X{i}_{loc}"), Some(spine)).unwrap();
        spine = tree.insert_internal("", Some(spine)).unwrap();
    }
    tree.insert_leaf("Genus_last_Y1_AF", Some(spine)).unwrap();
    tree.insert_leaf("Genus_last_Y2_NA", Some(spine)).unwrap();
    tree
}

#[test]
fn given_deep_caterpillar_when_propagating_then_completes_without_recursion() {
    let mut tree = caterpillar(5_001);
    assert!(tree.len() >= 10_000);
    let root = tree.root().unwrap();

    let result = compute_biogeography(&mut tree, root).unwrap();

    assert!((result.total() - 1.0).abs() <= 0.01);
    // top leaf contributes 0.5 directly
    assert_eq!(result.dominant().map(|(c, _)| c.as_str()), Some("AF"));
    assert!(tree.iter().all(|(_, n)| n.biogeography.is_some()));
}
