use serde::{Deserialize, Serialize};

/// Identifier of an index on the service.
pub type IndexId = u64;

/// Caller-chosen identifier of a vector record.
pub type UserId = u64;

/// Body of `POST /index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexRequest {
    pub id: IndexId,
    pub k: usize,
    pub dimension: usize,
}

/// Body of `POST /index/{index_id}/insert`.
///
/// The vector length is not checked against the index dimension here;
/// the service rejects mismatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertVectorRequest {
    pub id_user: UserId,
    pub vector: Vec<f64>,
}

/// Body of `POST /index/{index_id}/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub vector: Vec<f64>,
}

/// The HTTP operations the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateIndex,
    InsertVector,
    Search,
    ListIndices,
    GetIndexInfo,
    DeleteIndex,
    Health,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateIndex => "create_index",
            Operation::InsertVector => "insert_vector",
            Operation::Search => "search",
            Operation::ListIndices => "list_indices",
            Operation::GetIndexInfo => "get_index_info",
            Operation::DeleteIndex => "delete_index",
            Operation::Health => "check_health",
        }
    }

    /// Whether the operation changes state on the service.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::CreateIndex | Operation::InsertVector | Operation::DeleteIndex
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
