pub mod overpass;

pub use overpass::{
    Fetcher, FetchOutcome, HttpFetcher, OVERPASS_URL, OverpassResponse, RawResponse,
    build_relation_query, classify_response,
};
