//! Persisted outputs of an analysis run: the JSON report and the HTML
//! visualization.

mod html;
mod serialize;

pub use html::{
    create_visualization_html, render_visualization, render_visualization_in,
    write_visualization_html,
};
pub use serialize::{
    ResultValue, analysis_to_json, save_analysis_results, serialize, write_analysis_results,
};
