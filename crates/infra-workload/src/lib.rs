// Covalent Infra-Workload
// Remote execution adapters: JSON-RPC workload API client and the shared
// filesystem output store.

pub mod fs_output_store;
pub mod http_client;

pub use fs_output_store::FsOutputStore;
pub use http_client::HttpWorkloadClient;
