//! Decoding curl's `--include` output.
//!
//! With `--include`, curl writes the status line and headers, a blank line,
//! then the body. When the request went through a proxy, the proxy's own
//! `CONNECT` reply comes first, in the same shape.

use crate::response::{Response, ResponseBody, ResponseHeaders};
use crate::{Error, Result};

const BLOCK_SEPARATOR: &str = "\r\n\r\n";
const LINE_SEPARATOR: &str = "\r\n";
const HEADER_SEPARATOR: &str = ": ";

/// Parses one attempt's raw stdout into a response.
///
/// When `proxied` is set, the first block is the proxy's connection reply and
/// is dropped unconditionally.
///
/// # Errors
///
/// * [`Error::MalformedResponse`] if the expected blocks are missing
/// * [`Error::MalformedHeader`] if a header line has no `": "` separator
/// * [`Error::DeserializationFailed`] if a JSON content type has an invalid body
///
/// # Examples
///
/// ```
/// use curlew::parse_response;
///
/// let raw = "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\n\r\nnot found";
/// let response = parse_response(raw, false).unwrap();
///
/// assert_eq!(response.status_code, 404);
/// assert_eq!(response.header("content-type"), Some("text/plain"));
/// assert_eq!(response.body.as_text(), Some("not found"));
/// ```
pub fn parse_response(raw: &str, proxied: bool) -> Result<Response<ResponseBody>> {
    let raw = if proxied {
        raw.split_once(BLOCK_SEPARATOR)
            .map(|(_, rest)| rest)
            .ok_or_else(|| malformed("missing proxy connection block"))?
    } else {
        raw
    };

    let (head, body) = raw
        .split_once(BLOCK_SEPARATOR)
        .ok_or_else(|| malformed("missing blank line between headers and body"))?;

    let mut lines = head.split(LINE_SEPARATOR);
    let status_code = lines.next().map(parse_status_code).unwrap_or(0);

    let mut headers = ResponseHeaders::new();
    for line in lines {
        let (name, value) = split_header(line)?;
        headers.insert(name, value);
    }

    let body = if is_json(&headers) {
        match serde_json::from_str(body) {
            Ok(value) => ResponseBody::Json(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    status = status_code,
                    raw_response = %body,
                    "Failed to decode JSON response body"
                );
                return Err(Error::DeserializationFailed {
                    raw_response: body.to_string(),
                    serde_error: e.to_string(),
                    status: status_code,
                });
            }
        }
    } else {
        ResponseBody::Text(body.to_string())
    };

    Ok(Response::new(status_code, headers, body))
}

/// The second whitespace-delimited token of the status line, or 0.
fn parse_status_code(status_line: &str) -> u16 {
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}

fn split_header(line: &str) -> Result<(&str, &str)> {
    if let Some(pair) = line.split_once(HEADER_SEPARATOR) {
        return Ok(pair);
    }
    // `Name:` with an empty value
    match line.strip_suffix(':') {
        Some(name) if !name.is_empty() => Ok((name, "")),
        _ => Err(Error::MalformedHeader {
            line: line.to_string(),
        }),
    }
}

fn malformed(reason: &str) -> Error {
    Error::MalformedResponse(reason.to_string())
}

fn is_json(headers: &ResponseHeaders) -> bool {
    headers
        .get("content-type")
        .is_some_and(|ct| ct.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_text() {
        let raw = "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\n\r\nnot found";
        let response = parse_response(raw, false).unwrap();

        assert_eq!(response.status_code, 404);
        assert_eq!(
            response.headers.iter().collect::<Vec<_>>(),
            vec![("content-type", "text/plain")]
        );
        assert_eq!(response.body, ResponseBody::Text("not found".to_string()));
    }

    #[test]
    fn test_json_body() {
        let raw = concat!(
            "HTTP/2 200\r\n",
            "content-type: application/json; charset=utf-8\r\n",
            "\r\n",
            "{\"id\":1,\"tags\":[\"a\"]}"
        );
        let response = parse_response(raw, false).unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.body,
            ResponseBody::Json(json!({ "id": 1, "tags": ["a"] }))
        );
    }

    #[test]
    fn test_invalid_json_body() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{not json";
        match parse_response(raw, false) {
            Err(Error::DeserializationFailed {
                raw_response,
                status,
                ..
            }) => {
                assert_eq!(raw_response, "{not json");
                assert_eq!(status, 200);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_json_content_type_is_prefix_match() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/json\r\n\r\n{}";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(response.body, ResponseBody::Text("{}".to_string()));
    }

    #[test]
    fn test_repeated_header_last_wins() {
        let raw = "HTTP/1.1 200 OK\r\nX-Id: 1\r\nx-id: 2\r\nX-ID: 3\r\n\r\n";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(response.header("x-id"), Some("3"));
        assert_eq!(response.headers.len(), 1);
    }

    #[test]
    fn test_set_cookie_keeps_order() {
        let raw = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Set-Cookie: a=1\r\n",
            "Server: t\r\n",
            "set-cookie: b=2\r\n",
            "SET-COOKIE: c=3\r\n",
            "\r\n",
            "ok"
        );
        let response = parse_response(raw, false).unwrap();
        assert_eq!(
            response.headers.set_cookie().unwrap(),
            ["a=1", "b=2", "c=3"].map(String::from)
        );
        assert_eq!(response.header("server"), Some("t"));
    }

    #[test]
    fn test_single_set_cookie_is_still_a_sequence() {
        let raw = "HTTP/1.1 200 OK\r\nSet-Cookie: session=xyz; Path=/\r\n\r\n";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(
            response.headers.set_cookie(),
            Some(&["session=xyz; Path=/".to_string()][..])
        );
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let raw = "HTTP/1.1 200 OK\r\nX-Note: a: b: c\r\n\r\n";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(response.header("x-note"), Some("a: b: c"));
    }

    #[test]
    fn test_empty_header_value() {
        let raw = "HTTP/1.1 200 OK\r\nX-Empty:\r\n\r\n";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(response.header("x-empty"), Some(""));
    }

    #[test]
    fn test_malformed_header_line() {
        let raw = "HTTP/1.1 200 OK\r\nthis is not a header\r\n\r\nbody";
        match parse_response(raw, false) {
            Err(Error::MalformedHeader { line }) => assert_eq!(line, "this is not a header"),
            other => panic!("Expected MalformedHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_status_defaults_to_zero() {
        let response = parse_response("garbage\r\n\r\n", false).unwrap();
        assert_eq!(response.status_code, 0);

        let response = parse_response("HTTP/1.1 abc\r\n\r\n", false).unwrap();
        assert_eq!(response.status_code, 0);
    }

    #[test]
    fn test_missing_separator() {
        let result = parse_response("HTTP/1.1 200 OK\r\nServer: t\r\n", false);
        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_proxy_block_is_discarded() {
        let raw = concat!(
            "HTTP/1.1 200 Connection established\r\n\r\n",
            "HTTP/1.1 201 Created\r\nLocation: /x\r\n\r\n",
            "created"
        );
        let response = parse_response(raw, true).unwrap();
        assert_eq!(response.status_code, 201);
        assert_eq!(response.header("location"), Some("/x"));
        assert_eq!(response.body, ResponseBody::Text("created".to_string()));

        // without the flag the proxy reply is taken as the response
        let response = parse_response(raw, false).unwrap();
        assert_eq!(response.status_code, 200);
    }

    #[test]
    fn test_proxied_without_target_block() {
        let raw = "HTTP/1.1 200 Connection established\r\n\r\n";
        let result = parse_response(raw, true);
        assert!(matches!(result, Err(Error::MalformedResponse(_))));

        let result = parse_response("HTTP/1.1 200 OK", true);
        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_body_with_blank_lines_is_kept_whole() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\npara one\r\n\r\npara two";
        let response = parse_response(raw, false).unwrap();
        assert_eq!(
            response.body,
            ResponseBody::Text("para one\r\n\r\npara two".to_string())
        );
    }
}
