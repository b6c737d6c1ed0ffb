use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1 as corev1;
use rstest::*;

use super::*;
use crate::protocol::NodeList;

fn make_node(name: &str, labels: &[(&str, &str)]) -> corev1::Node {
    let mut node = corev1::Node::default();
    node.metadata.name = Some(name.to_string());

    if !labels.is_empty() {
        let mut node_labels = BTreeMap::new();
        for (k, v) in labels {
            node_labels.insert(k.to_string(), v.to_string());
        }
        node.metadata.labels = Some(node_labels);
    }

    return node;
}

fn args_with_nodes(nodes: Vec<corev1::Node>) -> ExtenderArgs {
    return ExtenderArgs {
        pod: corev1::Pod::default(),
        nodes: Some(NodeList { metadata: Default::default(), items: nodes }),
        node_names: None,
    };
}

#[fixture]
fn extender() -> Extender {
    return Extender::new(Arc::new(NodeCache::new()));
}

#[rstest]
fn test_filter_empty_input_is_echoed(extender: Extender) {
    let result = extender.filter(ExtenderArgs::default());

    assert!(result.nodes.is_none());
    assert_eq!(result.node_names, Some(Vec::new()));
    assert_eq!(result.error, "");
}

#[rstest]
fn test_filter_keeps_only_labeled_nodes(extender: Extender) {
    let args = args_with_nodes(vec![
        make_node("gpu1", &[(CAPABILITY_LABEL, "3")]),
        make_node("plain", &[("zone", "a")]),
        make_node("gpu2", &[(CAPABILITY_LABEL, "7")]),
    ]);

    let result = extender.filter(args);

    let names: Vec<_> = result.nodes.unwrap().items.iter().map(|n| n.name_any()).collect();
    assert_eq!(names, vec!["gpu1", "gpu2"]);
    assert_eq!(result.node_names, Some(vec!["gpu1".to_string(), "gpu2".to_string()]));
}

#[rstest]
fn test_filter_falls_back_when_nothing_matches(extender: Extender) {
    let args = args_with_nodes(vec![make_node("plain1", &[]), make_node("plain2", &[("zone", "a")])]);

    let result = extender.filter(args);

    // No label match is not a rejection: the unfiltered set comes back with
    // no name list so the default scheduler policy takes over.
    let names: Vec<_> = result.nodes.unwrap().items.iter().map(|n| n.name_any()).collect();
    assert_eq!(names, vec!["plain1", "plain2"]);
    assert!(result.node_names.is_none());
    assert_eq!(result.error, "");
}

#[rstest]
fn test_filter_resolves_node_names_through_cache() {
    let cache = Arc::new(NodeCache::new());
    cache.put(make_node("gpu1", &[(CAPABILITY_LABEL, "3")]));
    cache.put(make_node("plain", &[]));
    let extender = Extender::new(cache);

    let args = ExtenderArgs {
        pod: corev1::Pod::default(),
        nodes: None,
        node_names: Some(vec!["gpu1".to_string(), "plain".to_string(), "unknown".to_string()]),
    };

    let result = extender.filter(args);
    assert_eq!(result.node_names, Some(vec!["gpu1".to_string()]));
}

#[rstest]
fn test_filter_only_one_picks_highest_score(extender: Extender) {
    let args = args_with_nodes(vec![
        make_node("a", &[(CAPABILITY_LABEL, "3")]),
        make_node("b", &[(CAPABILITY_LABEL, "7")]),
        make_node("c", &[]),
    ]);

    let result = extender.filter_only_one(args);

    let items = result.nodes.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name_any(), "b");
    assert_eq!(compute_score(&items[0]), 7);
    assert_eq!(result.node_names, Some(vec!["b".to_string()]));
}

#[rstest]
fn test_filter_only_one_breaks_ties_by_name(extender: Extender) {
    let args = args_with_nodes(vec![
        make_node("a", &[(CAPABILITY_LABEL, "5")]),
        make_node("b", &[(CAPABILITY_LABEL, "5")]),
    ]);

    let result = extender.filter_only_one(args);
    assert_eq!(result.node_names, Some(vec!["b".to_string()]));
}

#[rstest]
fn test_filter_only_one_falls_back_when_nothing_matches(extender: Extender) {
    let args = args_with_nodes(vec![make_node("plain1", &[]), make_node("plain2", &[])]);

    let result = extender.filter_only_one(args);

    assert_eq!(result.nodes.unwrap().items.len(), 2);
    assert!(result.node_names.is_none());
    assert_eq!(result.error, "");
}

#[rstest]
#[case::valid(Some("42"), 42)]
#[case::missing(None, 0)]
#[case::unparseable(Some("a100"), 0)]
#[case::negative(Some("-3"), 0)]
fn test_compute_score(#[case] label_value: Option<&str>, #[case] expected: i64) {
    let node = match label_value {
        Some(v) => make_node("node1", &[(CAPABILITY_LABEL, v)]),
        None => make_node("node1", &[]),
    };

    assert_eq!(compute_score(&node), expected);
}

#[rstest]
fn test_prioritize_override_label_wins(extender: Extender) {
    let args = args_with_nodes(vec![make_node(
        "special",
        &[(PRIORITY_OVERRIDE_LABEL, ""), (CAPABILITY_LABEL, "tesla-t4")],
    )]);

    let result = extender.prioritize(args);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].host, "special");
    assert_eq!(result[0].score, PRIORITY_OVERRIDE_SCORE);
}

#[rstest]
fn test_prioritize_scores_hardware_classes_in_input_order(extender: Extender) {
    let args = args_with_nodes(vec![
        make_node("t4", &[(CAPABILITY_LABEL, "tesla-t4")]),
        make_node("a100", &[(CAPABILITY_LABEL, "ampere-a100")]),
        make_node("volta", &[(CAPABILITY_LABEL, "volta-v100")]),
    ]);

    let result = extender.prioritize(args);

    let scored: Vec<_> = result.iter().map(|hp| (hp.host.as_str(), hp.score)).collect();
    assert_eq!(scored, vec![("t4", 50), ("a100", 80), ("volta", 0)]);
}

#[rstest]
fn test_prioritize_omits_unlabeled_nodes(extender: Extender) {
    let args = args_with_nodes(vec![
        make_node("plain", &[("zone", "a")]),
        make_node("t4", &[(CAPABILITY_LABEL, "tesla-t4")]),
    ]);

    let result = extender.prioritize(args);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].host, "t4");
}
