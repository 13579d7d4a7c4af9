//! Export a document as wire JSON or as a standalone SVG.

use pm_core::{Document, Edge, EdgeStyle, Node, NodeKind, Port, Position};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Rendered size of a primary icon card.
pub const ICON_CARD_SIZE: f32 = 120.0;
const ICON_SIZE: f32 = 64.0;
const COMPANION_WIDTH: f32 = 200.0;
const LINE_HEIGHT: f32 = 16.0;
const CARD_PADDING: f32 = 8.0;
const CORNER_RADIUS: f32 = 8.0;
const PAD: f32 = 16.0;

/// The persisted `{nodes, edges, meta}` shape, pretty-printed.
pub fn export_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Axis-aligned box of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Bounds {
    fn anchor(&self, port: Port) -> (f32, f32) {
        match port {
            Port::Top => (self.x + self.width / 2.0, self.y),
            Port::Bottom => (self.x + self.width / 2.0, self.y + self.height),
            Port::Left => (self.x, self.y + self.height / 2.0),
            Port::Right => (self.x + self.width, self.y + self.height / 2.0),
        }
    }
}

fn node_bounds(node: &Node) -> Bounds {
    let Position { x, y } = node.position;
    match &node.kind {
        NodeKind::Primary(_) => Bounds {
            x,
            y,
            width: ICON_CARD_SIZE,
            height: ICON_CARD_SIZE,
        },
        NodeKind::Companion(data) => Bounds {
            x,
            y,
            width: COMPANION_WIDTH,
            height: visible_lines(&data.text, data.line_clamp).len() as f32 * LINE_HEIGHT
                + CARD_PADDING * 2.0,
        },
    }
}

/// Lines of `text`, cut to `clamp` with an ellipsis on the last kept line.
/// A clamp of `0` means no clamp.
fn visible_lines(text: &str, clamp: Option<u32>) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    match clamp {
        Some(n) if n > 0 && (n as usize) < lines.len() => {
            let n = n as usize;
            let mut kept: Vec<String> = lines[..n].iter().map(|l| l.to_string()).collect();
            if let Some(last) = kept.last_mut() {
                last.push('…');
            }
            kept
        }
        _ => lines.iter().map(|l| l.to_string()).collect(),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the document as a standalone SVG string.
///
/// Edges are painted first so cards sit on top of them; nodes are painted
/// in document order.
pub fn export_svg(doc: &Document) -> String {
    let bounds: HashMap<_, _> = doc.nodes().iter().map(|n| (n.id, node_bounds(n))).collect();

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for b in bounds.values() {
        min_x = min_x.min(b.x);
        min_y = min_y.min(b.y);
        max_x = max_x.max(b.x + b.width);
        max_y = max_y.max(b.y + b.height);
    }
    if bounds.is_empty() {
        (min_x, min_y, max_x, max_y) = (0.0, 0.0, 800.0, 600.0);
    }

    let width = max_x - min_x + PAD * 2.0;
    let height = max_y - min_y + PAD * 2.0;
    let offset_x = min_x - PAD;
    let offset_y = min_y - PAD;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    svg.push_str("<style>\n");
    svg.push_str("  text { font-family: Inter, system-ui, sans-serif; font-size: 12px; }\n");
    svg.push_str("  .card { fill: #ffffff; stroke: #d0d0d6; stroke-width: 1; }\n");
    svg.push_str("  .detail { fill: #fafaf5; stroke: #c8c8b4; stroke-width: 1; }\n");
    svg.push_str("</style>\n");
    svg.push_str("<defs>\n");
    svg.push_str(
        "  <marker id=\"arrowclosed\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"#b1b1b7\" /></marker>\n",
    );
    svg.push_str("</defs>\n");
    let _ = writeln!(svg, "<g transform=\"translate({}, {})\">", -offset_x, -offset_y);

    for edge in doc.edges() {
        let (Some(s), Some(t)) = (bounds.get(&edge.source), bounds.get(&edge.target)) else {
            continue;
        };
        render_edge(&mut svg, edge, s, t);
    }
    for node in doc.nodes() {
        render_node(&mut svg, node);
    }

    svg.push_str("</g>\n</svg>");
    svg
}

fn render_edge(out: &mut String, edge: &Edge, source: &Bounds, target: &Bounds) {
    let (sx, sy) = source.anchor(edge.source_port.unwrap_or(Port::Right));
    let (tx, ty) = target.anchor(edge.target_port.unwrap_or(Port::Left));
    let d = edge_path(edge.style, (sx, sy), (tx, ty));

    let mut attrs = format!("fill=\"none\" stroke=\"#b1b1b7\" stroke-width=\"{}\"", edge.stroke.width);
    if let Some(dash) = &edge.stroke.dash {
        let _ = write!(attrs, " stroke-dasharray=\"{}\"", escape_xml(dash));
    }
    if let Some(opacity) = edge.stroke.opacity {
        let _ = write!(attrs, " opacity=\"{opacity}\"");
    }
    if edge.marker_end.is_some() {
        attrs.push_str(" marker-end=\"url(#arrowclosed)\"");
    }
    let _ = writeln!(out, "  <path d=\"{d}\" {attrs} />");
}

/// SVG path data for one edge route.
fn edge_path(style: EdgeStyle, (sx, sy): (f32, f32), (tx, ty): (f32, f32)) -> String {
    let mx = (sx + tx) / 2.0;
    match style {
        EdgeStyle::Straight => format!("M {sx} {sy} L {tx} {ty}"),
        EdgeStyle::Orthogonal => format!("M {sx} {sy} L {mx} {sy} L {mx} {ty} L {tx} {ty}"),
        EdgeStyle::RoundedOrthogonal => {
            let dy = ty - sy;
            if dy.abs() < f32::EPSILON {
                return format!("M {sx} {sy} L {tx} {ty}");
            }
            let r = CORNER_RADIUS
                .min((mx - sx).abs())
                .min((tx - mx).abs())
                .min(dy.abs() / 2.0);
            let dir_y = dy.signum();
            let dir_in = (mx - sx).signum();
            let dir_out = (tx - mx).signum();
            format!(
                "M {sx} {sy} L {} {sy} Q {mx} {sy} {mx} {} L {mx} {} Q {mx} {ty} {} {ty} L {tx} {ty}",
                mx - dir_in * r,
                sy + dir_y * r,
                ty - dir_y * r,
                mx + dir_out * r,
            )
        }
        EdgeStyle::Bezier => {
            let k = ((tx - sx).abs() / 2.0).max(25.0);
            format!("M {sx} {sy} C {} {sy} {} {ty} {tx} {ty}", sx + k, tx - k)
        }
    }
}

fn render_node(out: &mut String, node: &Node) {
    let b = node_bounds(node);
    match &node.kind {
        NodeKind::Primary(data) => {
            let _ = writeln!(
                out,
                "  <rect class=\"card\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{CORNER_RADIUS}\" ry=\"{CORNER_RADIUS}\" />",
                b.x, b.y, b.width, b.height
            );
            if let Some(icon) = &data.icon_ref {
                let _ = writeln!(
                    out,
                    "  <image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{ICON_SIZE}\" height=\"{ICON_SIZE}\" />",
                    escape_xml(icon),
                    b.x + (b.width - ICON_SIZE) / 2.0,
                    b.y + CARD_PADDING * 2.0
                );
            }
            let _ = writeln!(
                out,
                "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\">{}</text>",
                b.x + b.width / 2.0,
                b.y + b.height - CARD_PADDING * 2.0,
                escape_xml(&data.title)
            );
        }
        NodeKind::Companion(data) => {
            let _ = writeln!(
                out,
                "  <rect class=\"detail\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"4\" ry=\"4\" />",
                b.x, b.y, b.width, b.height
            );
            let mut y = b.y + CARD_PADDING + LINE_HEIGHT * 0.8;
            for line in visible_lines(&data.text, data.line_clamp) {
                let _ = writeln!(
                    out,
                    "  <text x=\"{}\" y=\"{y}\">{}</text>",
                    b.x + CARD_PADDING,
                    escape_xml(&line)
                );
                y += LINE_HEIGHT;
            }
        }
    }
}
