//! REST resource paths
//!
//! Paths are relative to the client's base URL. Ids are trimmed so values
//! copied from a UI never produce `//` segments.

use crate::models::BlockId;

pub fn document_path(document_id: &str) -> String {
    format!("/documents/{}", document_id.trim())
}

pub fn blocks_path(document_id: &str) -> String {
    format!("/documents/{}/blocks", document_id.trim())
}

pub fn block_path(document_id: &str, block_id: &BlockId) -> String {
    format!(
        "/documents/{}/blocks/{}",
        document_id.trim(),
        block_id.as_str().trim()
    )
}

pub fn reorder_path(document_id: &str) -> String {
    format!("/documents/{}/blocks/reorder", document_id.trim())
}

/// Live progress stream of one agent run
pub fn agent_run_stream_path(run_id: &str) -> String {
    format!("/agent-runs/{}/stream", run_id.trim())
}

/// Workspace resources outside the document editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Documents,
    Tasks,
    Projects,
    Agents,
    Webhooks,
    TimeEntries,
    Comments,
    Notifications,
    KnowledgeDocuments,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Documents,
        ResourceKind::Tasks,
        ResourceKind::Projects,
        ResourceKind::Agents,
        ResourceKind::Webhooks,
        ResourceKind::TimeEntries,
        ResourceKind::Comments,
        ResourceKind::Notifications,
        ResourceKind::KnowledgeDocuments,
    ];

    pub fn segment(&self) -> &'static str {
        match self {
            ResourceKind::Documents => "documents",
            ResourceKind::Tasks => "tasks",
            ResourceKind::Projects => "projects",
            ResourceKind::Agents => "agents",
            ResourceKind::Webhooks => "webhooks",
            ResourceKind::TimeEntries => "time-entries",
            ResourceKind::Comments => "comments",
            ResourceKind::Notifications => "notifications",
            ResourceKind::KnowledgeDocuments => "knowledge",
        }
    }

    pub fn collection_path(&self) -> String {
        format!("/{}", self.segment())
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.segment(), id.trim())
    }

    /// Collection filtered to one project, e.g. `/projects/p-1/tasks`
    pub fn project_collection_path(&self, project_id: &str) -> String {
        format!("/projects/{}/{}", project_id.trim(), self.segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_paths() {
        let block = BlockId::new("42");
        assert_eq!(document_path(" doc-1 "), "/documents/doc-1");
        assert_eq!(blocks_path("doc-1"), "/documents/doc-1/blocks");
        assert_eq!(block_path("doc-1", &block), "/documents/doc-1/blocks/42");
        assert_eq!(reorder_path("doc-1"), "/documents/doc-1/blocks/reorder");
        assert_eq!(agent_run_stream_path("run-9"), "/agent-runs/run-9/stream");
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(ResourceKind::TimeEntries.collection_path(), "/time-entries");
        assert_eq!(ResourceKind::Agents.item_path("a-1"), "/agents/a-1");
        assert_eq!(
            ResourceKind::Tasks.project_collection_path("p-7"),
            "/projects/p-7/tasks"
        );

        let mut segments: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.segment()).collect();
        segments.sort();
        segments.dedup();
        assert_eq!(segments.len(), ResourceKind::ALL.len());
    }
}
