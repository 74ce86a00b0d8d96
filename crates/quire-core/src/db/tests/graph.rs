use super::{save, store};
use crate::db::{DanglingLink, GraphEdge, NodeKind};

#[test]
fn test_graph_nodes_edges_and_degree() {
    let store = store();
    save(&store, "a", "# A\n#x links [[b]] and [[missing]]");
    save(&store, "b", "# B\nback to [[a]]");
    save(&store, "c", "# C\nalone");

    let graph = store.get_graph_data().unwrap();

    assert_eq!(graph.nodes.len(), 3);
    let node = |id: &str| graph.nodes.iter().find(|n| n.id == id).unwrap();
    assert_eq!(node("a").degree, 2);
    assert_eq!(node("b").degree, 2);
    assert_eq!(node("c").degree, 0);
    assert_eq!(node("a").tags, vec!["x"]);
    assert_eq!(node("a").title, "A");
    assert_eq!(node("a").kind, NodeKind::Note);

    assert_eq!(
        graph.edges,
        vec![
            GraphEdge {
                source: "a".into(),
                target: "b".into()
            },
            GraphEdge {
                source: "b".into(),
                target: "a".into()
            },
        ]
    );
    assert_eq!(
        graph.dangling,
        vec![DanglingLink {
            source: "a".into(),
            target: "missing".into()
        }]
    );
}

#[test]
fn test_graph_marks_journals() {
    let store = store();
    let journal = store
        .create_journal(Some(chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
        .unwrap();

    let graph = store.get_graph_data().unwrap();
    assert_eq!(graph.nodes.len(), 1);
    assert_eq!(graph.nodes[0].id, journal.id);
    assert_eq!(graph.nodes[0].kind, NodeKind::Journal);
}

#[test]
fn test_link_becomes_edge_once_target_exists() {
    let store = store();
    save(&store, "a", "[[later]]");
    assert_eq!(store.get_graph_data().unwrap().dangling.len(), 1);

    save(&store, "later", "now here");
    let graph = store.get_graph_data().unwrap();
    assert!(graph.dangling.is_empty());
    assert_eq!(graph.edges.len(), 1);
}

#[test]
fn test_graph_serializes_kind_as_type() {
    let store = store();
    save(&store, "a", "x");
    let json = serde_json::to_value(store.get_graph_data().unwrap()).unwrap();
    assert_eq!(json["nodes"][0]["type"], "note");
}

#[test]
fn test_self_link_counts_once_in_degree() {
    let store = store();
    save(&store, "a", "# A\nsee [[a]]");

    let graph = store.get_graph_data().unwrap();
    assert_eq!(
        graph.edges,
        vec![GraphEdge {
            source: "a".into(),
            target: "a".into()
        }]
    );
    assert_eq!(graph.nodes[0].degree, 1);
    assert!(graph.dangling.is_empty());
}
