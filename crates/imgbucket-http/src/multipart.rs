//! `multipart/form-data` parsing for uploads.
//!
//! Works on the already-collected body. Part bodies are zero-copy slices of
//! the request [`Bytes`].

use bytes::Bytes;
use imgbucket_core::error::GatewayError;

/// One part of a multipart submission.
#[derive(Debug, Clone)]
pub struct FormPart {
    /// The `name` parameter of `Content-Disposition`.
    pub name: String,
    /// The `filename` parameter, if any.
    pub filename: Option<String>,
    /// The part's `Content-Type`, if any.
    pub content_type: Option<String>,
    /// The part content.
    pub data: Bytes,
}

/// A parsed multipart form-data submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// The first part named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Remove and return the first part named `name`.
    pub fn take(&mut self, name: &str) -> Option<FormPart> {
        let idx = self.parts.iter().position(|p| p.name == name)?;
        Some(self.parts.remove(idx))
    }

    /// Number of named parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the form has no named parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Extract the boundary string from a `Content-Type: multipart/form-data; boundary=...` header.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidUpload`] if the Content-Type is not
/// multipart/form-data or the boundary parameter is absent or empty.
pub fn extract_boundary(content_type: &str) -> Result<String, GatewayError> {
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(GatewayError::InvalidUpload(format!(
            "expected multipart/form-data, got: {content_type}"
        )));
    }

    for part in content_type.split(';') {
        let trimmed = part.trim();
        if trimmed.len() >= 9 && trimmed[..9].eq_ignore_ascii_case("boundary=") {
            let boundary = trimmed[9..].trim_matches('"').to_owned();
            if boundary.is_empty() {
                return Err(GatewayError::InvalidUpload(
                    "empty boundary in Content-Type".to_owned(),
                ));
            }
            return Ok(boundary);
        }
    }

    Err(GatewayError::InvalidUpload(
        "missing boundary in Content-Type".to_owned(),
    ))
}

/// Parse a multipart/form-data body.
///
/// Parts without a `Content-Disposition` name are skipped.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidUpload`] if the body contains no
/// boundary delimiter at all.
pub fn parse_multipart(body: &Bytes, boundary: &str) -> Result<MultipartForm, GatewayError> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    if find_bytes(body, delimiter.as_bytes()).is_none() {
        return Err(GatewayError::InvalidUpload(
            "multipart body does not contain the boundary".to_owned(),
        ));
    }

    let mut form = MultipartForm::default();
    for part_bytes in split_multipart_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes()) {
        let Some((headers_section, part_body)) = split_headers_body(part_bytes) else {
            continue;
        };

        let disposition = parse_content_disposition(headers_section);
        let Some(name) = disposition.name else {
            continue;
        };

        form.parts.push(FormPart {
            name,
            filename: disposition.filename,
            content_type: parse_part_content_type(headers_section),
            data: body.slice_ref(part_body),
        });
    }

    Ok(form)
}

/// Split the multipart body into individual parts by boundary.
fn split_multipart_parts<'a>(
    body: &'a [u8],
    delimiter: &[u8],
    end_delimiter: &[u8],
) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut remaining = body;

    // Skip the preamble.
    if let Some(pos) = find_bytes(remaining, delimiter) {
        remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
    } else {
        return parts;
    }

    loop {
        if remaining.starts_with(b"--") || remaining.is_empty() {
            break;
        }

        if let Some(pos) = find_bytes(remaining, delimiter) {
            parts.push(strip_trailing_crlf(&remaining[..pos]));
            remaining = &remaining[pos + delimiter.len()..];
            if remaining.starts_with(b"--") {
                break;
            }
            remaining = skip_crlf(remaining);
        } else {
            // Unterminated final part.
            let part = strip_trailing_crlf(remaining);
            let part = part.strip_suffix(end_delimiter).unwrap_or(part);
            if !part.is_empty() {
                parts.push(part);
            }
            break;
        }
    }

    parts
}

/// Split a part into headers section and body at the first blank line.
fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut filename = None;

    for line in headers_str.split("\r\n") {
        if !line.to_ascii_lowercase().starts_with("content-disposition:") {
            continue;
        }
        for param in split_params(line).into_iter().skip(1) {
            let Some((key, value)) = param.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_owned();
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => name = Some(value),
                "filename" => filename = Some(value),
                _ => {}
            }
        }
    }

    ContentDisposition { name, filename }
}

/// Split a header line on `;` outside double-quoted strings.
fn split_params(line: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&line[start..]);
    params
}

fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("content-type")
            .then(|| value.trim().to_owned())
    })
}

/// Find the position of a needle in a haystack.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}
