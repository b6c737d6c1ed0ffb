use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::{
    HeaderValue,
    CONTENT_TYPE,
};
use hyper::service::{
    make_service_fn,
    service_fn,
};
use hyper::{
    Body,
    Method,
    Request,
    Response,
    Server,
    StatusCode,
};
use tracing::*;

use crate::error::{
    Error,
    Result,
};
use crate::extender::Extender;
use crate::protocol::ExtenderArgs;

enum Route {
    Filter,
    AllInOne,
    Prioritize,
}

/// Serve the extender webhook until ctrl-c / SIGTERM.
pub async fn serve(addr: SocketAddr, extender: Arc<Extender>) -> Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let extender = extender.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let extender = extender.clone();
                async move { Ok::<_, Infallible>(handle(extender, req).await) }
            }))
        }
    });

    info!("extender listening on http://{addr}");
    Server::bind(&addr)
        .serve(make_svc)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    return Ok(());
}

async fn handle(extender: Arc<Extender>, req: Request<Body>) -> Response<Body> {
    let route = match (req.method(), req.uri().path()) {
        (&Method::POST, "/filter") => Route::Filter,
        (&Method::POST, "/allinone") => Route::AllInOne,
        (&Method::POST, "/prioritize") => Route::Prioritize,
        (&Method::POST, _) => return status_response(StatusCode::NOT_FOUND),
        _ => return status_response(StatusCode::METHOD_NOT_ALLOWED),
    };

    // Malformed requests are client errors; the decision is not computed.
    let args = match decode_args(req).await {
        Ok(args) => args,
        Err(err) => {
            warn!("failed to decode extender args: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err);
        },
    };

    let encoded = match route {
        Route::Filter => serde_json::to_vec(&extender.filter(args)),
        Route::AllInOne => serde_json::to_vec(&extender.filter_only_one(args)),
        Route::Prioritize => serde_json::to_vec(&extender.prioritize(args)),
    };

    return match encoded {
        Ok(body) => json_response(body),
        Err(err) => {
            let err = Error::EncodeResponse(err);
            error!("{err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err)
        },
    };
}

async fn decode_args(req: Request<Body>) -> Result<ExtenderArgs> {
    let body = hyper::body::to_bytes(req.into_body()).await?;
    return serde_json::from_slice(&body).map_err(Error::DecodeRequest);
}

fn json_response(body: Vec<u8>) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    resp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    return resp;
}

fn status_response(code: StatusCode) -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = code;
    return resp;
}

fn error_response(code: StatusCode, err: &Error) -> Response<Body> {
    let mut resp = Response::new(Body::from(err.to_string()));
    *resp.status_mut() = code;
    return resp;
}

async fn shutdown_signal() {
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install shutdown signal handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = term.recv() => {},
    }
    info!("shutdown signal received");
}
