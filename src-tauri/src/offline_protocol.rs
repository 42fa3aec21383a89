use tauri::{
    http::{header, Method, Request, Response, StatusCode, Uri},
    AppHandle, Manager, UriSchemeResponder,
};
use url::Url;

use crate::{
    append_cache_log, network::ResourceResponse, offline_cache::InterceptError,
    OfflineCacheState,
};

/// Maps `gamehub://localhost/<path>?<query>` (or `http://gamehub.localhost/...`
/// on Windows) onto the origin.
pub(crate) fn origin_url_for_request(origin_url: &Url, uri: &Uri) -> Result<Url, String> {
    let mut relative = uri.path().trim_start_matches('/').to_string();
    if let Some(query) = uri.query() {
        relative.push('?');
        relative.push_str(query);
    }

    let resolved = origin_url
        .join(&relative)
        .map_err(|error| format!("Invalid offline request path '{}': {error}", uri.path()))?;
    if resolved.origin() != origin_url.origin() {
        return Err(format!("Offline request escapes origin: {resolved}"));
    }
    Ok(resolved)
}

fn status_response(status: StatusCode) -> Response<Vec<u8>> {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, header::HeaderValue::from_static("*"));
    response
}

/// Answers a `HEAD` with the status and headers of the `GET`, without a body.
pub(crate) fn build_protocol_response<F>(
    method: &Method,
    url: &Url,
    result: Result<ResourceResponse, InterceptError>,
    log: F,
) -> Response<Vec<u8>>
where
    F: Fn(&str),
{
    let resource = match result {
        Ok(resource) => resource,
        Err(error) => {
            log(&format!("offline request for {url} failed: {error}"));
            return status_response(StatusCode::BAD_GATEWAY);
        }
    };

    let Ok(status) = StatusCode::from_u16(resource.status) else {
        log(&format!(
            "offline request for {url} returned invalid status {}",
            resource.status
        ));
        return status_response(StatusCode::BAD_GATEWAY);
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    if let Some(content_type) = resource.content_type.as_deref() {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let body = if *method == Method::HEAD {
        Vec::new()
    } else {
        resource.body
    };
    builder.body(body).unwrap_or_else(|error| {
        log(&format!("failed to build offline response for {url}: {error}"));
        status_response(StatusCode::BAD_GATEWAY)
    })
}

pub(crate) fn handle_offline_request(
    app_handle: AppHandle,
    request: Request<Vec<u8>>,
    responder: UriSchemeResponder,
) {
    if *request.method() != Method::GET && *request.method() != Method::HEAD {
        responder.respond(status_response(StatusCode::METHOD_NOT_ALLOWED));
        return;
    }

    let Some(state) = app_handle.try_state::<OfflineCacheState>() else {
        append_cache_log("offline request received before cache state was managed");
        responder.respond(status_response(StatusCode::SERVICE_UNAVAILABLE));
        return;
    };
    let cache = state.cache.clone();
    let method = request.method().clone();

    let url = match origin_url_for_request(&cache.config().origin_url, request.uri()) {
        Ok(url) => url,
        Err(error) => {
            append_cache_log(&error);
            responder.respond(status_response(StatusCode::BAD_REQUEST));
            return;
        }
    };

    tauri::async_runtime::spawn(async move {
        let result = cache.intercept(&url).await;
        responder.respond(build_protocol_response(
            &method,
            &url,
            result,
            append_cache_log,
        ));
    });
}
