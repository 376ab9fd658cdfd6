//! Node diagnostics page: version, ports, chain height and neighbours.
//!
//! The data comes from two read-only views so the page can be produced
//! without a running network stack.

use crate::config::NodeConfig;
use crate::types::bytes::Bytes;
use std::fmt::Write;

pub const VERIFY_NODE: &str = "Verify Node";
pub const SERVICE_NODE: &str = "Service Node";

/// A connected peer as reported by the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub id: u64,
    pub public_key: Bytes,
    pub addr: String,
    pub http_info_port: u16,
    pub http_info_start: bool,
}

/// Local node identity and its peers.
pub trait NodeView {
    fn id(&self) -> u64;
    fn public_key(&self) -> Bytes;
    fn neighbors(&self) -> Vec<Neighbor>;
}

/// Chain state the page reports.
pub trait LedgerView {
    fn block_height(&self) -> u32;
    /// Public keys of the current bookkeepers.
    fn bookkeepers(&self) -> Vec<Bytes>;
}

/// One neighbour row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborInfo {
    pub id: String,
    pub node_type: &'static str,
    pub addr: String,
    pub http_info_addr: String,
    pub http_info_port: u16,
    pub http_info_start: bool,
}

/// Everything shown on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub node_version: String,
    pub block_height: u32,
    pub neighbor_count: usize,
    pub neighbors: Vec<NeighborInfo>,
    pub http_rest_port: u16,
    pub http_ws_port: u16,
    pub http_json_port: u16,
    pub http_local_port: u16,
    pub node_port: u16,
    pub node_id: String,
    pub node_type: &'static str,
}

fn node_type(key: &Bytes, bookkeepers: &[Bytes]) -> &'static str {
    if bookkeepers.contains(key) {
        VERIFY_NODE
    } else {
        SERVICE_NODE
    }
}

/// Collects the page contents; neighbours come out sorted by HTTP info address.
pub fn build_page_info(config: &NodeConfig, node: &dyn NodeView, ledger: &dyn LedgerView) -> PageInfo {
    let bookkeepers = ledger.bookkeepers();

    let mut neighbors: Vec<NeighborInfo> = node
        .neighbors()
        .into_iter()
        .map(|n| NeighborInfo {
            id: format!("0x{:x}", n.id),
            node_type: node_type(&n.public_key, &bookkeepers),
            http_info_addr: format!("{}:{}", n.addr, n.http_info_port),
            addr: n.addr,
            http_info_port: n.http_info_port,
            http_info_start: n.http_info_start,
        })
        .collect();
    neighbors.sort_by(|a, b| a.http_info_addr.cmp(&b.http_info_addr));

    PageInfo {
        node_version: config.version.clone(),
        block_height: ledger.block_height(),
        neighbor_count: neighbors.len(),
        neighbors,
        http_rest_port: config.http_rest_port,
        http_ws_port: config.http_ws_port,
        http_json_port: config.http_json_port,
        http_local_port: config.http_local_port,
        node_port: config.node_port,
        node_id: format!("0x{:x}", node.id()),
        node_type: node_type(&node.public_key(), &bookkeepers),
    }
}

/// Escapes text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the diagnostics page as a standalone HTML document.
pub fn render_page(info: &PageInfo) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Node Info</title></head>\n<body>\n",
    );

    let rows: [(&str, String); 10] = [
        ("Node Version", info.node_version.clone()),
        ("Node Id", info.node_id.clone()),
        ("Node Type", info.node_type.to_string()),
        ("Block Height", info.block_height.to_string()),
        ("Node Port", info.node_port.to_string()),
        ("HTTP REST Port", info.http_rest_port.to_string()),
        ("HTTP WebSocket Port", info.http_ws_port.to_string()),
        ("HTTP JSON-RPC Port", info.http_json_port.to_string()),
        ("HTTP Local Port", info.http_local_port.to_string()),
        ("Neighbor Count", info.neighbor_count.to_string()),
    ];
    html.push_str("<table id=\"node\">\n");
    for (label, value) in &rows {
        let _ = writeln!(html, "<tr><th>{label}</th><td>{}</td></tr>", escape_html(value));
    }
    html.push_str("</table>\n");

    html.push_str(
        "<table id=\"neighbors\">\n<tr><th>Id</th><th>Type</th><th>Address</th><th>Info</th></tr>\n",
    );
    for n in &info.neighbors {
        let id = escape_html(&n.id);
        let addr = escape_html(&n.addr);
        let info_cell = if n.http_info_start {
            let target = escape_html(&n.http_info_addr);
            format!("<a href=\"http://{target}/info\">{target}</a>")
        } else {
            "closed".to_string()
        };
        let _ = writeln!(
            html,
            "<tr><td>{id}</td><td>{}</td><td>{addr}</td><td>{info_cell}</td></tr>",
            n.node_type
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}
