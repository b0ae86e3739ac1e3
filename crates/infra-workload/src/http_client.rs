// JSON-RPC workload API client
// Talks to the remote executor that owns workload lifecycles. The only
// error shape the engine cares about specially is the conflict on create;
// everything else maps onto the port's generic variants.

use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};
use tracing::debug;

use covalent_core::domain::Workload;
use covalent_core::port::{WorkloadApi, WorkloadApiError, WorkloadCreateRequest};

/// Application error codes used by the remote executor.
pub mod code {
    /// Workload id not found
    pub const NOT_FOUND: i32 = 4001;
    /// Workload id already exists
    pub const CONFLICT: i32 = 4002;
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateResponse {
    workload_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GetRequest {
    workload_id: String,
}

/// JSON-RPC client against the remote workload executor.
#[derive(Debug)]
pub struct HttpWorkloadClient {
    client: HttpClient,
}

impl HttpWorkloadClient {
    /// Build a client for the executor's RPC endpoint
    /// (e.g. `http://127.0.0.1:9530`).
    pub fn connect(
        url: impl AsRef<str>,
        request_timeout: Duration,
    ) -> Result<Self, WorkloadApiError> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(url.as_ref())
            .map_err(|e| WorkloadApiError::Transport(format!("Failed to create client: {e}")))?;

        Ok(Self { client })
    }

    fn map_error(workload_id: &str, e: ClientError) -> WorkloadApiError {
        match e {
            ClientError::Call(call_err) => match call_err.code() {
                code::CONFLICT => WorkloadApiError::Conflict,
                code::NOT_FOUND => WorkloadApiError::NotFound(workload_id.to_string()),
                other => WorkloadApiError::Server {
                    code: other,
                    message: call_err.message().to_string(),
                },
            },
            other => WorkloadApiError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl WorkloadApi for HttpWorkloadClient {
    async fn create(&self, request: WorkloadCreateRequest) -> Result<(), WorkloadApiError> {
        let workload_id = request.workload_id.clone();
        let params = rpc_params![request];

        let response: CreateResponse = self
            .client
            .request("workload.create.v1", params)
            .await
            .map_err(|e| Self::map_error(&workload_id, e))?;

        debug!(workload_id = %response.workload_id, "Workload create acknowledged");
        Ok(())
    }

    async fn get(&self, workload_id: &str) -> Result<Workload, WorkloadApiError> {
        let params = rpc_params![GetRequest {
            workload_id: workload_id.to_string(),
        }];

        self.client
            .request("workload.get.v1", params)
            .await
            .map_err(|e| Self::map_error(workload_id, e))
    }
}
