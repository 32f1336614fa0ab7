//! Wire payloads for the mocked source, introspection and CDN services

use serde_json::{Value, json};

/// Epoch seconds every fixture post is taken at (2023-05-17 12:00:00 UTC)
pub const TAKEN_AT: i64 = 1_684_324_800;

/// Bytes every CDN file is served with
pub const JPEG_BYTES: &[u8] = b"\xFF\xD8fixture";

/// One row of a tabular source page
pub fn source_row(id: &str, link: &str) -> Value {
    json!({ "id": id, "fields": { "Id": id, "Image Link": link } })
}

/// A source page; `offset` links to the next page
pub fn source_page(rows: Vec<Value>, offset: Option<&str>) -> Value {
    match offset {
        Some(offset) => json!({ "records": rows, "offset": offset }),
        None => json!({ "records": rows }),
    }
}

/// Metadata of a single-image post served from `cdn`
pub fn single_post_payload(cdn: &str, shortcode: &str) -> Value {
    json!({
        "graphql": {
            "shortcode_media": {
                "__typename": "GraphImage",
                "display_url": format!("{cdn}/{shortcode}/primary.jpg"),
                "is_video": false,
                "taken_at_timestamp": TAKEN_AT,
                "edge_media_to_caption": {
                    "edges": [ { "node": { "text": format!("caption for {shortcode}") } } ]
                }
            }
        }
    })
}

/// Metadata of a multi-image post with `children` images served from `cdn`
pub fn sidecar_post_payload(cdn: &str, shortcode: &str, children: usize) -> Value {
    let edges: Vec<Value> = (1..=children)
        .map(|i| {
            json!({ "node": {
                "display_url": format!("{cdn}/{shortcode}/{i}.jpg"),
                "is_video": false
            } })
        })
        .collect();

    json!({
        "graphql": {
            "shortcode_media": {
                "__typename": "GraphSidecar",
                "display_url": format!("{cdn}/{shortcode}/primary.jpg"),
                "is_video": false,
                "taken_at_timestamp": TAKEN_AT,
                "edge_sidecar_to_children": { "edges": edges }
            }
        }
    })
}
