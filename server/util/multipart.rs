//! Minimal multipart/form-data parsing for the `/score-file` upload.

/// Returns the index of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        if let Some(pos) = find_subsequence(&haystack[start..], needle) {
            result.push(&haystack[start..start + pos]);
            start += pos + needle.len();
        } else {
            result.push(&haystack[start..]);
            break;
        }
    }
    result
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|s| s.trim())
        .find(|s| s.starts_with("boundary="))
        .map(|s| s["boundary=".len()..].trim_matches('"').to_owned())
}

/// One uploaded file from a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Returns the first part carrying a `filename=` attribute.
pub fn extract_first_file(body: &[u8], boundary: &str) -> Option<FilePart> {
    let delimiter = format!("--{}", boundary);
    let parts = split_on(body, delimiter.as_bytes());

    for part in parts {
        let sep = b"\r\n\r\n";
        let Some(sep_pos) = find_subsequence(part, sep) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&part[..sep_pos]);
        if !headers.contains("filename=") {
            continue;
        }
        let raw = &part[sep_pos + sep.len()..];
        let bytes = raw.strip_suffix(b"\r\n").unwrap_or(raw).to_vec();
        return Some(FilePart {
            filename: quoted_attribute(&headers, "filename"),
            content_type: header_value(&headers, "content-type"),
            bytes,
        });
    }
    None
}

/// Parses `key="..."` out of a Content-Disposition header block.
fn quoted_attribute(headers: &str, key: &str) -> Option<String> {
    let needle = format!("{}=\"", key);
    let pos = headers.find(&needle)?;
    let rest = &headers[pos + needle.len()..];
    let end = rest.find('"')?;
    Some(rest[..end].to_owned())
}

/// Case-insensitive lookup of one header line in a part's header block.
fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_owned())
    })
}
