use crate::domain::RelationId;
use crate::error::{ConversionError, FetchError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const USER_AGENT: &str = concat!("relation-geojson/", env!("CARGO_PKG_VERSION"));

/// Raw Overpass API response
#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Set by Overpass when the query ran into a runtime error
    #[serde(default)]
    pub remark: Option<String>,
}

/// A single element from Overpass (node, way or relation)
#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub nodes: Option<Vec<u64>>,
    /// Inline way geometry produced by `out geom`. Entries are null for
    /// nodes Overpass could not place.
    #[serde(default)]
    pub geometry: Option<Vec<Option<LatLon>>>,
    #[serde(default)]
    pub members: Option<Vec<Member>>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

impl Element {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A relation member. With `out geom` way members carry their geometry
/// and node members their coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "ref")]
    pub ref_: u64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub geometry: Option<Vec<Option<LatLon>>>,
}

/// Status and body of an Overpass HTTP response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Result of the fetch step: either a parsed document or the failing status
#[derive(Debug)]
pub enum FetchOutcome {
    Success(OverpassResponse),
    Failure { status: u16 },
}

/// Something that can run an Overpass query against an endpoint
pub trait Fetcher {
    fn fetch(&self, endpoint: &str, query: &str) -> Result<RawResponse, FetchError>;
}

/// Overpass QL for a relation and everything it references, with full geometry
pub fn build_relation_query(relation: RelationId) -> String {
    format!(
        r#"[out:json];
relation({relation});
(._;>;);
out geom;"#,
        relation = relation
    )
}

/// Blocking HTTP fetcher. Sends a single GET with the query in the `data`
/// parameter and never retries.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// `timeout` of `None` blocks until the server answers or the connection fails.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, endpoint: &str, query: &str) -> Result<RawResponse, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            endpoint: endpoint.to_string(),
            source: Box::new(e),
        };

        let response = self
            .client
            .get(endpoint)
            .query(&[("data", query)])
            .send()
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(transport)?;

        Ok(RawResponse { status, body })
    }
}

/// Split a response into success (200, parsed) or failure (any other status)
pub fn classify_response(response: RawResponse) -> Result<FetchOutcome, ConversionError> {
    match response.status {
        200 => {
            let document: OverpassResponse = serde_json::from_str(&response.body)?;
            Ok(FetchOutcome::Success(document))
        }
        status => Ok(FetchOutcome::Failure { status }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_build_relation_query() {
        for id in [1u64, 42, 6386965, u64::MAX] {
            let query = build_relation_query(RelationId::new(id).unwrap());
            assert!(query.contains(&id.to_string()));
            assert!(query.contains("relation"));
            assert!(query.contains("out geom"));
        }
    }

    #[test]
    fn test_query_layout() {
        let query = build_relation_query(RelationId::new(6386965).unwrap());
        assert_eq!(
            query,
            "[out:json];\nrelation(6386965);\n(._;>;);\nout geom;"
        );
    }

    /// Serve one canned HTTP response on a local port and hand back the raw request
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/api/interpreter", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8(request).unwrap()
        });

        (endpoint, handle)
    }

    #[test]
    fn test_http_fetcher_sends_get_and_passes_status_through() {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(10))).unwrap();
        let query = build_relation_query(RelationId::new(42).unwrap());

        let response = fetcher.fetch(&endpoint, &query).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "not found");

        let request = server.join().unwrap();
        assert!(
            request.starts_with(
                "GET /api/interpreter?data=%5Bout%3Ajson%5D%3B%0Arelation%2842%29%3B"
            ),
            "unexpected request: {}",
            request
        );
        assert!(
            request
                .to_lowercase()
                .contains(&format!("user-agent: {}", USER_AGENT.to_lowercase()))
        );
    }

    #[test]
    fn test_http_fetcher_transport_failure() {
        // Bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(10))).unwrap();

        let result = fetcher.fetch(&format!("http://{}/api/interpreter", addr), "[out:json];");
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }

    #[test]
    fn test_parse_overpass_response() {
        let json = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 51.5, "lon": -0.1},
                {"type": "way", "id": 2, "nodes": [1, 3],
                 "geometry": [{"lat": 51.5, "lon": -0.1}, null],
                 "tags": {"highway": "primary"}},
                {"type": "relation", "id": 3,
                 "members": [{"type": "way", "ref": 2, "role": "outer"}],
                 "tags": {"type": "boundary"}}
            ]
        }"#;

        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.elements.len(), 3);
        assert_eq!(response.elements[1].tag("highway"), Some("primary"));
        let geometry = response.elements[1].geometry.as_ref().unwrap();
        assert_eq!(geometry.len(), 2);
        assert!(geometry[1].is_none());
        let members = response.elements[2].members.as_ref().unwrap();
        assert_eq!(members[0].ref_, 2);
        assert_eq!(members[0].role, "outer");
        assert!(response.remark.is_none());
    }

    #[test]
    fn test_classify_success() {
        let outcome = classify_response(RawResponse {
            status: 200,
            body: r#"{"elements": [{"type": "node", "id": 1, "lat": 0.0, "lon": 0.0}]}"#
                .to_string(),
        })
        .unwrap();

        match outcome {
            FetchOutcome::Success(doc) => assert_eq!(doc.elements.len(), 1),
            FetchOutcome::Failure { status } => panic!("unexpected failure {}", status),
        }
    }

    #[test]
    fn test_classify_failure_skips_body() {
        let outcome = classify_response(RawResponse {
            status: 429,
            body: "<html>rate limited</html>".to_string(),
        })
        .unwrap();

        assert!(matches!(outcome, FetchOutcome::Failure { status: 429 }));
    }

    #[test]
    fn test_classify_invalid_json() {
        let result = classify_response(RawResponse {
            status: 200,
            body: "not json".to_string(),
        });

        assert!(matches!(result, Err(ConversionError::InvalidJson(_))));
    }
}
