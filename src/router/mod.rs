// Router module
//
// Renders delivery paths from the configured route template and matches
// inbound paths back into their `{format}`, `{id}` and `{file}` parts.

use http::Uri;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    Format,
    Id,
    File,
}

impl Param {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "format" => Some(Param::Format),
            "id" => Some(Param::Id),
            "file" => Some(Param::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(Param),
}

/// Route parameters extracted from an inbound path (percent-decoded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub format: String,
    pub id: String,
    pub file: String,
}

/// Parsed route template such as `/media/image/{format}/{id}/{file}`
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template. `{file}` must be the last segment since it may span
    /// several path components; the other placeholders must be separated by
    /// literal text.
    pub fn parse(template: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| format!("Unclosed placeholder in route '{}'", template))?;
            let name = &rest[open + 1..close];
            let param = Param::from_name(name).ok_or_else(|| {
                format!("Unknown placeholder '{{{}}}' in route '{}'", name, template)
            })?;
            if let Some(Segment::Param(_)) = segments.last() {
                return Err(format!(
                    "Placeholders must be separated by literal text in route '{}'",
                    template
                ));
            }
            if segments.contains(&Segment::Param(param)) {
                return Err(format!(
                    "Placeholder '{{{}}}' appears twice in route '{}'",
                    name, template
                ));
            }
            segments.push(Segment::Param(param));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        for param in [Param::Format, Param::Id, Param::File] {
            if !segments.contains(&Segment::Param(param)) {
                return Err(format!(
                    "Route '{}' is missing a {:?} placeholder",
                    template, param
                ));
            }
        }
        if segments.last() != Some(&Segment::Param(Param::File)) {
            return Err(format!(
                "Route '{}' must end with the {{file}} placeholder",
                template
            ));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Render a path. Each component of `file` is percent-encoded separately
    /// so its `/` separators survive.
    pub fn render(&self, format: &str, id: &str, file: &str) -> String {
        let mut path = String::with_capacity(self.raw.len() + file.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(Param::Format) => path.push_str(&urlencoding::encode(format)),
                Segment::Param(Param::Id) => path.push_str(&urlencoding::encode(id)),
                Segment::Param(Param::File) => {
                    let encoded: Vec<_> = file.split('/').map(urlencoding::encode).collect();
                    path.push_str(&encoded.join("/"));
                }
            }
        }
        path
    }

    /// Match a request path (no query string) against the template
    pub fn match_path(&self, path: &str) -> Option<RouteParams> {
        let mut rest = path;
        let mut format = None;
        let mut id = None;
        let mut file = None;

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    rest = rest.strip_prefix(literal.as_str())?;
                }
                Segment::Param(Param::File) => {
                    file = Some(decode(rest)?);
                    rest = "";
                }
                Segment::Param(param) => {
                    // parse() guarantees a literal follows
                    let Some(Segment::Literal(next)) = self.segments.get(i + 1) else {
                        return None;
                    };
                    let end = rest.find(next.as_str())?;
                    let raw = &rest[..end];
                    if raw.contains('/') {
                        return None;
                    }
                    let value = decode(raw)?;
                    match param {
                        Param::Format => format = Some(value),
                        _ => id = Some(value),
                    }
                    rest = &rest[end..];
                }
            }
        }

        if !rest.is_empty() {
            return None;
        }

        Some(RouteParams {
            format: format?,
            id: id?,
            file: file?,
        })
    }
}

fn decode(value: &str) -> Option<String> {
    urlencoding::decode(value).ok().map(|v| v.into_owned())
}

/// Parse a query string into decoded key-value pairs
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(
                key.to_string(),
                urlencoding::decode(&value.replace('+', " "))
                    .unwrap_or_default()
                    .to_string(),
            );
        }
    }
    params
}

/// Split a path-and-query string into the matched route and its query
pub fn match_uri(
    template: &RouteTemplate,
    uri: &str,
) -> Option<(RouteParams, HashMap<String, String>)> {
    let uri: Uri = uri.parse().ok()?;
    let params = template.match_path(uri.path())?;
    let query = uri.query().map(parse_query).unwrap_or_default();
    Some((params, query))
}
