pub mod v1;

use crate::server::Server;
use std::sync::Arc;
use warp::Filter;

/// Every versioned route under `/api`, with rejections rendered as envelopes.
pub fn api(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    let translator = server.translator.clone();
    warp::path("api")
        .and(warp::path("v1"))
        .and(v1::routes(server))
        .recover(move |err| v1::recover_error(err, translator.clone()))
}
