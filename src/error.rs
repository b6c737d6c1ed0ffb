use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("decode-request-failed: {0}")]
    DecodeRequest(serde_json::Error),

    #[error("encode-response-failed: {0}")]
    EncodeResponse(serde_json::Error),

    #[error("node-list-failed: {0}")]
    NodeList(#[from] kube::Error),

    #[error("owner-fetch-failed: {kind} {namespace}/{name}: {source}")]
    OwnerFetch {
        kind: String,
        namespace: String,
        name: String,
        source: kube::Error,
    },

    #[error("cycle-state-missing: no sticky state recorded for pod {pod}")]
    CycleStateMissing { pod: String },

    #[error("serve-failed: {0}")]
    Serve(#[from] hyper::Error),

    #[error("invalid-listen-addr: {0}")]
    InvalidListenAddr(#[from] std::net::AddrParseError),
}
