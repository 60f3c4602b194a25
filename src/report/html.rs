//! Self-contained HTML visualization.
//!
//! One static page with a Plotly scatter of the 2-D projection coloured by
//! cluster, a vis-network force-directed view of the similarity graph and
//! the per-cluster narration. Script libraries load from their CDNs; all
//! data is inlined.

use crate::analysis::AnalysisResult;
use crate::error::{AnalysisError, RunResult};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-latest.min.js";
const VIS_NETWORK_CDN: &str = "https://unpkg.com/vis-network/standalone/umd/vis-network.min.js";

/// Hover titles are cut to this many characters.
const HOVER_TITLE_CHARS: usize = 50;

const NO_TSNE: &str = "<p>No t-SNE data available</p>";
const NO_NETWORK: &str = "<p>No network graph data available</p>";

/// Renders the visualization page for `result`.
///
/// Word-cloud images are linked by their recorded paths, which suits a page
/// served from the working directory.
#[must_use]
pub fn render_visualization(result: &AnalysisResult) -> String {
    render_page(result, None)
}

/// Renders the page for a file placed in `page_dir`; word-cloud links are
/// made relative to that directory.
#[must_use]
pub fn render_visualization_in(result: &AnalysisResult, page_dir: &Path) -> String {
    render_page(result, Some(page_dir))
}

fn render_page(result: &AnalysisResult, page_dir: Option<&Path>) -> String {
    let plot_html = render_scatter(result).unwrap_or_else(|| NO_TSNE.to_string());
    let network_html = render_network(result).unwrap_or_else(|| NO_NETWORK.to_string());
    let summaries_html = render_cluster_summaries(result, page_dir);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Document Analysis Visualization</title>
    <script src="{PLOTLY_CDN}"></script>
    <script src="{VIS_NETWORK_CDN}"></script>
    <style>
        body {{
            font-family: Arial, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }}
        h1, h2, h3 {{
            color: #333;
        }}
        .container {{
            max-width: 1200px;
            margin: 0 auto;
            background-color: white;
            padding: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}
        .section {{
            margin: 30px 0;
        }}
        .cluster img {{
            max-width: 100%;
            border: 1px solid #ddd;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Document Analysis Visualization</h1>

        <div class="section">
            <h2>t-SNE Cluster Visualization</h2>
            {plot_html}
        </div>

        <div class="section">
            <h2>Document Correlation Network</h2>
            {network_html}
        </div>
{summaries_html}    </div>
</body>
</html>
"#
    )
}

/// Writes the page to `path`.
///
/// # Errors
/// Returns [`AnalysisError::FileWrite`] when the file cannot be written.
pub fn write_visualization_html(result: &AnalysisResult, path: &Path) -> RunResult<()> {
    let page_dir = path.parent().unwrap_or(Path::new(""));
    std::fs::write(path, render_visualization_in(result, page_dir)).map_err(|source| {
        AnalysisError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Writes the page and reports success as a flag; failures are logged.
pub fn create_visualization_html(result: &AnalysisResult, path: &Path) -> bool {
    match write_visualization_html(result, path) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Error creating visualization HTML: {e}");
            false
        }
    }
}

fn render_scatter(result: &AnalysisResult) -> Option<String> {
    if result.tsne_coordinates.is_empty() || result.cluster_labels.is_empty() {
        return None;
    }

    // One trace per cluster, in order of first appearance.
    let mut categories: Vec<String> = Vec::new();
    for label in &result.cluster_labels {
        let name = label.to_string();
        if !categories.contains(&name) {
            categories.push(name);
        }
    }

    let traces: Vec<Value> = categories
        .iter()
        .map(|category| {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            let mut titles = Vec::new();
            for (i, (label, point)) in result
                .cluster_labels
                .iter()
                .zip(&result.tsne_coordinates)
                .enumerate()
            {
                if label.to_string() != *category {
                    continue;
                }
                xs.push(point.first().copied().unwrap_or(0.0));
                ys.push(point.get(1).copied().unwrap_or(0.0));
                titles.push(hover_title(result, i));
            }
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": category,
                "x": xs,
                "y": ys,
                "hovertext": titles,
                "hoverinfo": "text",
                "marker": {"size": 10, "opacity": 0.7},
            })
        })
        .collect();

    let layout = json!({
        "title": {"text": "Document Clusters (t-SNE Visualization)"},
        "xaxis": {"title": {"text": "t-SNE Dimension 1"}},
        "yaxis": {"title": {"text": "t-SNE Dimension 2"}},
        "legend": {"title": {"text": "Cluster"}},
        "width": 900,
        "height": 600,
        "hovermode": "closest",
    });

    Some(format!(
        r#"<div id="tsne-plot"></div>
            <script type="text/javascript">
              Plotly.newPlot('tsne-plot', {}, {});
            </script>"#,
        script_json(&Value::Array(traces)),
        script_json(&layout)
    ))
}

fn hover_title(result: &AnalysisResult, position: usize) -> String {
    let title = result
        .document_metadata
        .get(position)
        .map(|doc| doc.title.as_str())
        .filter(|title| !title.is_empty())
        .unwrap_or("Unknown");
    title.chars().take(HOVER_TITLE_CHARS).collect()
}

fn render_network(result: &AnalysisResult) -> Option<String> {
    let graph = &result.network_graph;
    if graph.node_count() == 0 {
        return None;
    }

    let nodes: Vec<Value> = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, id)| json!({"id": id, "title": hover_title(result, i)}))
        .collect();
    let edges: Vec<Value> = graph
        .edges()
        .iter()
        .map(|edge| {
            json!({
                "from": graph.nodes()[edge.source],
                "to": graph.nodes()[edge.target],
                "value": edge.weight,
            })
        })
        .collect();

    Some(format!(
        r#"<div id="network" style="width: 100%; height: 600px; border: 1px solid #ddd;"></div>
            <script type="text/javascript">
              var nodes = new vis.DataSet({nodes});
              var edges = new vis.DataSet({edges});
              var container = document.getElementById('network');
              var data = {{
                nodes: nodes,
                edges: edges
              }};
              var options = {{
                nodes: {{
                  shape: 'dot',
                  size: 16,
                  font: {{ size: 12 }},
                  borderWidth: 2
                }},
                edges: {{
                  width: 0.15,
                  smooth: {{ type: 'continuous' }}
                }},
                physics: {{
                  stabilization: false,
                  barnesHut: {{
                    gravitationalConstant: -2000,
                    springConstant: 0.001,
                    springLength: 200
                  }}
                }}
              }};
              var network = new vis.Network(container, data, options);
            </script>"#,
        nodes = script_json(&Value::Array(nodes)),
        edges = script_json(&Value::Array(edges)),
    ))
}

fn render_cluster_summaries(result: &AnalysisResult, page_dir: Option<&Path>) -> String {
    let labels: BTreeSet<_> = result
        .cluster_summaries
        .keys()
        .chain(result.cluster_wordclouds.keys())
        .copied()
        .collect();
    if labels.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        "\n        <div class=\"section\">\n            <h2>Cluster Summaries</h2>\n",
    );
    for label in labels {
        html.push_str(&format!(
            "            <div class=\"cluster\">\n                <h3>Cluster {label}</h3>\n"
        ));
        if let Some(summary) = result.cluster_summaries.get(&label) {
            html.push_str(&format!(
                "                <p>{}</p>\n",
                escape_html(summary)
            ));
        }
        if let Some(path) = result.cluster_wordclouds.get(&label) {
            let src = match page_dir {
                Some(dir) => relative_src(Path::new(path), dir),
                None => path.clone(),
            };
            html.push_str(&format!(
                "                <img src=\"{}\" alt=\"Word cloud for cluster {label}\">\n",
                escape_html(&src)
            ));
        }
        html.push_str("            </div>\n");
    }
    html.push_str("        </div>\n");
    html
}

/// Link to `image` from a page in `page_dir`, with `/` separators.
///
/// Relative inputs are taken against the working directory. Paths on
/// different roots stay absolute.
fn relative_src(image: &Path, page_dir: &Path) -> String {
    let image = lexical_absolute(image);
    let base = lexical_absolute(page_dir);
    let image_parts: Vec<Component<'_>> = image.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = image_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return image.to_string_lossy().into_owned();
    }

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        image_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

fn lexical_absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut normal = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    normal
}

/// JSON safe to inline inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
