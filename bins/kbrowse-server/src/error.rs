#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("cluster: {0}")]
    Cluster(#[from] kbrowse_api::ClusterError),

    #[error("{0}")]
    Search(#[from] kbrowse_engine::SearchError),

    #[error("api: {0}")]
    Api(String),

    #[error("output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
