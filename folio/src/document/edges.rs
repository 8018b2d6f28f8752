use super::{Document, Edge, EdgeId, NodeId};
use crate::error::Result;

impl Document {
    /// Link `source` to `target`. The edge is recorded on both endpoints.
    pub fn add_reference_to(&mut self, source: NodeId, target: NodeId, kind: &str) -> Result<EdgeId> {
        // Validate both ends before touching either list.
        self.node(source)?;
        self.node(target)?;

        self.edges.push(Some(Edge {
            source,
            target,
            kind: kind.to_string(),
        }));
        let id = EdgeId(self.edges.len() - 1);
        self.node_mut(source)?.outbound.push(id);
        self.node_mut(target)?.inbound.push(id);
        Ok(id)
    }

    /// Link `source` to `target`, seen from the target's side.
    pub fn add_reference_from(&mut self, target: NodeId, source: NodeId, kind: &str) -> Result<EdgeId> {
        self.add_reference_to(source, target, kind)
    }

    /// Remove every edge from `source` to `target`. Returns false if there was none.
    pub fn remove_reference_to(&mut self, source: NodeId, target: NodeId) -> Result<bool> {
        let matching: Vec<EdgeId> = self
            .node(source)?
            .outbound
            .iter()
            .copied()
            .filter(|&e| self.edge(e).is_some_and(|edge| edge.target == target))
            .collect();
        if matching.is_empty() {
            log::warn!("No reference from {source} to {target}");
            return Ok(false);
        }
        for edge in matching {
            self.detach_edge(edge);
        }
        Ok(true)
    }

    /// Remove every edge from `source` to `target`, seen from the target's side.
    pub fn remove_reference_from(&mut self, target: NodeId, source: NodeId) -> Result<bool> {
        self.remove_reference_to(source, target)
    }

    /// Drop an edge from both endpoint lists and from the edge arena.
    pub(crate) fn detach_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if let Ok(source) = self.node_mut(edge.source) {
            source.outbound.retain(|&e| e != id);
        }
        if let Ok(target) = self.node_mut(edge.target) {
            target.inbound.retain(|&e| e != id);
        }
    }

    pub fn outbound_edges(&self, id: NodeId) -> Result<Vec<&Edge>> {
        Ok(self
            .node(id)?
            .outbound
            .iter()
            .filter_map(|&e| self.edge(e))
            .collect())
    }

    pub fn inbound_edges(&self, id: NodeId) -> Result<Vec<&Edge>> {
        Ok(self
            .node(id)?
            .inbound
            .iter()
            .filter_map(|&e| self.edge(e))
            .collect())
    }

    pub fn outbound_edges_of_kind(&self, id: NodeId, kind: &str) -> Result<Vec<&Edge>> {
        let mut edges = self.outbound_edges(id)?;
        edges.retain(|e| e.kind == kind);
        Ok(edges)
    }

    pub fn inbound_edges_of_kind(&self, id: NodeId, kind: &str) -> Result<Vec<&Edge>> {
        let mut edges = self.inbound_edges(id)?;
        edges.retain(|e| e.kind == kind);
        Ok(edges)
    }

    pub fn outbound_edges_to(&self, source: NodeId, target: NodeId) -> Result<Vec<&Edge>> {
        let mut edges = self.outbound_edges(source)?;
        edges.retain(|e| e.target == target);
        Ok(edges)
    }

    pub fn inbound_edges_from(&self, target: NodeId, source: NodeId) -> Result<Vec<&Edge>> {
        let mut edges = self.inbound_edges(target)?;
        edges.retain(|e| e.source == source);
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use crate::document::tests::test_document;
    use crate::error::FolioError;

    #[test]
    fn test_edges_are_symmetric() {
        let mut doc = test_document();
        let chapter = doc.create_node("Chapter").unwrap();
        let page = doc.create_node("page").unwrap();
        let other = doc.create_node("page").unwrap();

        doc.add_reference_to(chapter, page, "logical_physical").unwrap();
        doc.add_reference_from(other, chapter, "logical_physical").unwrap();

        assert_eq!(doc.outbound_edges_to(chapter, page).unwrap().len(), 1);
        assert_eq!(doc.inbound_edges_from(page, chapter).unwrap().len(), 1);
        assert_eq!(doc.inbound_edges_from(other, chapter).unwrap().len(), 1);
        assert!(doc.outbound_edges_to(page, chapter).unwrap().is_empty());
        assert_eq!(doc.outbound_edges(chapter).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_reference_removes_both_sides_and_all_duplicates() {
        let mut doc = test_document();
        let chapter = doc.create_node("Chapter").unwrap();
        let page = doc.create_node("page").unwrap();
        let other = doc.create_node("page").unwrap();
        doc.add_reference_to(chapter, page, "logical_physical").unwrap();
        doc.add_reference_to(chapter, page, "logical_physical").unwrap();
        doc.add_reference_to(chapter, other, "logical_physical").unwrap();

        assert!(doc.remove_reference_from(page, chapter).unwrap());
        assert!(doc.outbound_edges_to(chapter, page).unwrap().is_empty());
        assert!(doc.inbound_edges(page).unwrap().is_empty());
        assert_eq!(doc.outbound_edges(chapter).unwrap().len(), 1);

        assert!(!doc.remove_reference_to(chapter, page).unwrap());
    }

    #[test]
    fn test_edges_by_kind() {
        let mut doc = test_document();
        let a = doc.create_node("Chapter").unwrap();
        let b = doc.create_node("Chapter").unwrap();
        doc.add_reference_to(a, b, "logical_physical").unwrap();
        doc.add_reference_to(a, b, "see_also").unwrap();

        assert_eq!(doc.outbound_edges_of_kind(a, "see_also").unwrap().len(), 1);
        assert_eq!(doc.inbound_edges_of_kind(b, "logical_physical").unwrap().len(), 1);
        assert!(doc.inbound_edges_of_kind(a, "see_also").unwrap().is_empty());
    }

    #[test]
    fn test_edge_to_unknown_node_fails() {
        let mut doc = test_document();
        let a = doc.create_node("Chapter").unwrap();
        let b = doc.create_node("Chapter").unwrap();
        doc.delete_node(b).unwrap();
        assert!(matches!(
            doc.add_reference_to(a, b, "x"),
            Err(FolioError::UnknownNode(_))
        ));
        assert!(doc.outbound_edges(a).unwrap().is_empty());
    }
}
