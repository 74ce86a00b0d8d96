use super::Store;
use crate::error::{QuireError, Result};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Journal,
    Note,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Resolved edges touching this node, in either direction
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// A link whose target note does not exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingLink {
    pub source: String,
    pub target: String,
}

/// The whole note graph. Links to missing notes never become nodes or
/// edges; they are listed separately in `dangling`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub dangling: Vec<DanglingLink>,
}

impl Store {
    pub fn get_graph_data(&self) -> Result<GraphData> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, is_journal FROM notes ORDER BY id")
            .map_err(|e| QuireError::db("prepare graph node query", e))?;
        let mut nodes = stmt
            .query_map([], |row| {
                Ok(GraphNode {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    tags: Vec::new(),
                    kind: if row.get::<_, i64>(2)? == 1 {
                        NodeKind::Journal
                    } else {
                        NodeKind::Note
                    },
                    degree: 0,
                })
            })
            .map_err(|e| QuireError::db("query graph nodes", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read graph nodes", e))?;

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let mut stmt = self
            .conn
            .prepare(
                "SELECT nt.note_id, t.name FROM note_tags nt
                 JOIN tags t ON t.id = nt.tag_id
                 ORDER BY nt.note_id, t.name",
            )
            .map_err(|e| QuireError::db("prepare graph tag query", e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| QuireError::db("query graph tags", e))?;
        while let Some(row) = rows
            .next()
            .map_err(|e| QuireError::db("read graph tags", e))?
        {
            let note_id: String = row.get(0).map_err(|e| QuireError::db("read tag owner", e))?;
            let name: String = row.get(1).map_err(|e| QuireError::db("read tag name", e))?;
            if let Some(&i) = index.get(&note_id) {
                nodes[i].tags.push(name);
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT from_note_id, to_note_id FROM links ORDER BY from_note_id, to_note_id")
            .map_err(|e| QuireError::db("prepare graph edge query", e))?;
        let links = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| QuireError::db("query graph edges", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read graph edges", e))?;

        let mut edges = Vec::new();
        let mut dangling = Vec::new();
        for (source, target) in links {
            match (index.get(&source), index.get(&target)) {
                (Some(&s), Some(&t)) => {
                    nodes[s].degree += 1;
                    // A self-link is one edge touching one node
                    if s != t {
                        nodes[t].degree += 1;
                    }
                    edges.push(GraphEdge { source, target });
                }
                _ => dangling.push(DanglingLink { source, target }),
            }
        }

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            dangling = dangling.len(),
            "Built graph"
        );

        Ok(GraphData {
            nodes,
            edges,
            dangling,
        })
    }
}
