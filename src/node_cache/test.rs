use std::collections::BTreeMap;

use k8s_openapi::api::core::v1 as corev1;
use rstest::*;

use super::*;

fn make_node(name: &str, zone: &str) -> corev1::Node {
    let mut node = corev1::Node::default();
    node.metadata.name = Some(name.to_string());

    let mut node_labels = BTreeMap::new();
    node_labels.insert("zone".to_string(), zone.to_string());
    node.metadata.labels = Some(node_labels);

    return node;
}

fn zone_of(node: &corev1::Node) -> String {
    return node.metadata.labels.as_ref().unwrap()["zone"].clone();
}

#[fixture]
fn cache() -> NodeCache {
    return NodeCache::new();
}

#[rstest]
fn test_get_missing_node(cache: NodeCache) {
    assert!(cache.get("node1").is_none());
    assert!(cache.is_empty());
}

#[rstest]
fn test_put_then_get(cache: NodeCache) {
    cache.put(make_node("node1", "a"));

    let node = cache.get("node1").unwrap();
    assert_eq!(node.name_any(), "node1");
    assert_eq!(zone_of(&node), "a");
}

#[rstest]
fn test_put_is_last_write_wins(cache: NodeCache) {
    cache.put(make_node("node1", "a"));
    cache.put(make_node("node1", "b"));

    assert_eq!(cache.len(), 1);
    assert_eq!(zone_of(&cache.get("node1").unwrap()), "b");
}

#[rstest]
fn test_remove_then_get(cache: NodeCache) {
    cache.put(make_node("node1", "a"));
    cache.put(make_node("node2", "a"));
    cache.remove("node1");

    assert!(cache.get("node1").is_none());
    assert!(cache.get("node2").is_some());
}

#[rstest]
fn test_remove_missing_is_a_noop(cache: NodeCache) {
    cache.put(make_node("node1", "a"));
    cache.remove("node2");

    assert_eq!(cache.len(), 1);
}

#[rstest]
fn test_replace_drops_absent_nodes(cache: NodeCache) {
    cache.put(make_node("node1", "a"));
    cache.put(make_node("node2", "a"));

    cache.replace(vec![make_node("node2", "b"), make_node("node3", "b")]);

    assert!(cache.get("node1").is_none());
    assert_eq!(zone_of(&cache.get("node2").unwrap()), "b");
    assert!(cache.get("node3").is_some());
    assert_eq!(cache.len(), 2);
}
