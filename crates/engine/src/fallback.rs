//! Substitute responses for when neither network nor cache can answer.

use tidecache_core::http::OFFLINE_HEADER;
use tidecache_core::{Error, Response, StoredRecord};

/// Global flag set by the inert script stub. Host pages can check it to
/// detect that a chunk failed to load while offline.
pub const CHUNK_FAILED_FLAG: &str = "__TIDECACHE_CHUNK_FAILED__";

/// An importable, side-effect-only ES module standing in for a missing chunk.
pub fn script_stub(path: &str) -> Response {
    let path = path.replace('\\', "\\\\").replace('"', "\\\"");
    let body = format!(
        "console.warn(\"[tidecache] script unavailable offline: {path}\");\n\
         globalThis.{CHUNK_FAILED_FLAG} = true;\n\
         export {{}};\n"
    );
    Response::ok("application/javascript; charset=utf-8", body).with_header("cache-control", "no-store")
}

pub fn empty_stylesheet() -> Response {
    Response::ok("text/css; charset=utf-8", "/* unavailable offline */\n").with_header("cache-control", "no-store")
}

/// A small SVG placeholder with `label` rendered in the middle.
pub fn placeholder_image(label: &str) -> Response {
    let label = escape_xml(label);
    let body = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"200\" height=\"200\" viewBox=\"0 0 200 200\">\
         <rect width=\"200\" height=\"200\" fill=\"#e5e7eb\"/>\
         <text x=\"100\" y=\"105\" font-family=\"sans-serif\" font-size=\"16\" fill=\"#6b7280\" \
         text-anchor=\"middle\">{label}</text></svg>"
    );
    Response::ok("image/svg+xml", body).with_header("cache-control", "no-store")
}

/// Minimal offline page, installed when the real one cannot be fetched.
pub fn offline_document() -> Response {
    let body = "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
                <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
                <title>Offline</title>\n</head>\n<body>\n<main>\n<h1>You are offline</h1>\n\
                <p>This page has not been saved for offline use yet. Reconnect and try again.</p>\n\
                </main>\n</body>\n</html>\n";
    Response::ok("text/html; charset=utf-8", body)
}

/// JSON response rebuilt from a stored record, marked as offline-origin.
pub fn offline_json(record: &StoredRecord) -> Result<Response, Error> {
    let body = serde_json::to_vec(&record.data)?;
    Ok(Response::ok("application/json", body)
        .with_header(OFFLINE_HEADER, "1")
        .with_header("x-offline-captured-at", &record.timestamp.to_string()))
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
