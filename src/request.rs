//! Request builders for every service operation.
//!
//! Each builder produces a pure [`ApiRequest`] value: method, path and an
//! optional JSON body. Nothing here touches the network, so wire shapes can
//! be checked without a running service.

use reqwest::Method;
use serde::Serialize;

use crate::error::Result;
use crate::types::{
    CreateIndexRequest, IndexId, InsertVectorRequest, Operation, SearchRequest, UserId,
};

/// A fully-formed request, relative to the service base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub operation: Operation,
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn new(operation: Operation, method: Method, path: String) -> Self {
        Self {
            operation,
            method,
            path,
            body: None,
        }
    }

    fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn create_index(id: IndexId, k: usize, dimension: usize) -> Result<Self> {
        Self::new(Operation::CreateIndex, Method::POST, "/index".to_string())
            .with_body(&CreateIndexRequest { id, k, dimension })
    }

    pub fn insert_vector(index_id: IndexId, id_user: UserId, vector: &[f64]) -> Result<Self> {
        Self::new(
            Operation::InsertVector,
            Method::POST,
            format!("/index/{index_id}/insert"),
        )
        .with_body(&InsertVectorRequest {
            id_user,
            vector: vector.to_vec(),
        })
    }

    pub fn search(index_id: IndexId, vector: &[f64]) -> Result<Self> {
        Self::new(
            Operation::Search,
            Method::POST,
            format!("/index/{index_id}/search"),
        )
        .with_body(&SearchRequest {
            vector: vector.to_vec(),
        })
    }

    pub fn list_indices() -> Self {
        Self::new(Operation::ListIndices, Method::GET, "/index".to_string())
    }

    pub fn get_index_info(id: IndexId) -> Self {
        Self::new(Operation::GetIndexInfo, Method::GET, format!("/index/{id}"))
    }

    pub fn delete_index(id: IndexId) -> Self {
        Self::new(Operation::DeleteIndex, Method::DELETE, format!("/index/{id}"))
    }

    pub fn health() -> Self {
        Self::new(Operation::Health, Method::GET, "/health".to_string())
    }
}
