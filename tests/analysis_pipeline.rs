//! End-to-end runs of the analysis pipeline over vector files on disk.

use corpusmap::io::ExitCode;
use corpusmap::narration::LlmError;
use corpusmap::vector::ProjectionParams;
use corpusmap::{
    AnalysisOptions, AnalysisRun, ClusterLabel, ClusteringMethod, PostProcessor, Settings,
    TextGenerator,
};
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

struct AlwaysFails;

impl TextGenerator for AlwaysFails {
    fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Status {
            status: 503,
            body: "model not loaded".to_string(),
        })
    }
}

struct Canned;

impl TextGenerator for Canned {
    fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok("  These theses study shared methods.  ".to_string())
    }
}

fn write_vector(dir: &Path, index: usize, id: &str, summary: &str, embedding: Value) {
    let record = json!({
        "document_id": id,
        "index": index,
        "metadata": {
            "title": format!("Thesis {id}"),
            "author": format!("Author {index}"),
            "url": format!("https://repo.example/handle/{id}"),
            "summary": summary,
            "model_name": "all-MiniLM-L6-v2"
        },
        "text_data": {"extracted_text": summary},
        "vector": {
            "embedding": embedding,
            "embedding_type": "sentence_transformer"
        }
    });
    let name = format!("{index:04}_{id}_vector.json");
    std::fs::write(dir.join(name), serde_json::to_string_pretty(&record).unwrap()).unwrap();
}

fn options_in(temp_dir: &TempDir) -> AnalysisOptions {
    AnalysisOptions {
        input_dir: temp_dir.path().join("production"),
        output_json: temp_dir.path().join("analysis_results.json"),
        output_html: temp_dir.path().join("visualization.html"),
        output_dir: temp_dir.path().join("clouds"),
        projection: ProjectionParams {
            max_iterations: 300,
            ..ProjectionParams::default()
        },
        ..AnalysisOptions::default()
    }
}

/// Two well separated groups of five 5-dimensional documents.
fn write_two_groups(dir: &Path) {
    for i in 0..5 {
        let offset = i as f64 * 0.01;
        write_vector(
            dir,
            i + 1,
            &format!("soil{i}"),
            "Soil erosion and irrigation in coastal farmland",
            json!([1.0 + offset, 0.9, 0.1, 0.0, 0.05 + offset]),
        );
    }
    for i in 0..5 {
        let offset = i as f64 * 0.01;
        write_vector(
            dir,
            i + 6,
            &format!("net{i}"),
            "Neural network pruning for embedded devices",
            json!([0.0, 0.1 + offset, 0.9, 1.0, 0.8 - offset]),
        );
    }
}

fn production_dir(temp_dir: &TempDir) -> std::path::PathBuf {
    let dir = temp_dir.path().join("production");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_empty_directory_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    production_dir(&temp_dir);
    let options = options_in(&temp_dir);

    let run = PostProcessor::new(options.clone()).run_full_analysis().unwrap();

    assert!(run.result.is_none());
    assert!(run.narrations.is_empty());
    assert!(!options.output_json.exists());
    assert!(!options.output_html.exists());
    assert!(!options.output_dir.exists());
    assert_eq!(ExitCode::from_run(&run), ExitCode::EmptyCorpus);
}

#[test]
fn test_missing_directory_is_empty_run() {
    let temp_dir = TempDir::new().unwrap();
    let run = PostProcessor::new(options_in(&temp_dir))
        .run_full_analysis()
        .unwrap();
    assert!(run.result.is_none());
}

#[test]
fn test_records_without_embeddings_are_excluded() {
    let temp_dir = TempDir::new().unwrap();
    let dir = production_dir(&temp_dir);
    write_two_groups(&dir);
    write_vector(&dir, 11, "nullvec", "No vector here", Value::Null);
    write_vector(&dir, 12, "emptyvec", "Empty vector", json!([]));
    std::fs::write(dir.join("0013_broken_vector.json"), "{ not json").unwrap();
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let run = PostProcessor::new(options_in(&temp_dir))
        .run_full_analysis()
        .unwrap();
    let result = run.result.unwrap();

    // The broken file never loads; the two empty embeddings load but are dropped.
    assert_eq!(result.n_documents, 12);
    assert_eq!(result.cluster_labels.len(), 10);
    assert_eq!(result.document_metadata.len(), 10);
    assert!(
        result
            .document_metadata
            .iter()
            .all(|d| d.document_id != "nullvec" && d.document_id != "emptyvec")
    );
    assert_eq!(result.network_graph.node_count(), 10);
}

#[test]
fn test_majority_dimension_kept() {
    let temp_dir = TempDir::new().unwrap();
    let dir = production_dir(&temp_dir);
    for i in 0..8 {
        let v = i as f64;
        write_vector(
            &dir,
            i + 1,
            &format!("five{i}"),
            "Coastal hydrology survey",
            json!([v, 1.0, v * 0.5, 2.0 - v * 0.1, 0.3]),
        );
    }
    write_vector(&dir, 9, "three0", "Short vector", json!([1.0, 2.0, 3.0]));
    write_vector(&dir, 10, "three1", "Short vector", json!([3.0, 2.0, 1.0]));

    let run = PostProcessor::new(options_in(&temp_dir))
        .run_full_analysis()
        .unwrap();
    let result = run.result.unwrap();

    assert_eq!(result.n_documents, 10);
    assert_eq!(result.embedding_dimension, 5);
    assert_eq!(result.cluster_labels.len(), 8);
    assert_eq!(result.similarity_matrix.len(), 8);
    assert!(
        result
            .document_metadata
            .iter()
            .all(|d| d.document_id.starts_with("five"))
    );
}

#[test]
fn test_failing_llm_still_produces_everything_else() {
    let temp_dir = TempDir::new().unwrap();
    write_two_groups(&production_dir(&temp_dir));

    let options = AnalysisOptions {
        n_clusters: Some(2),
        ..options_in(&temp_dir)
    };
    let run = PostProcessor::new(options.clone())
        .with_generator(&AlwaysFails)
        .run_full_analysis()
        .unwrap();

    assert!(run.outputs_saved());
    let result = run.result.as_ref().unwrap();
    assert!(result.cluster_summaries.is_empty());
    assert_eq!(result.cluster_labels.len(), 10);
    assert_eq!(result.similarity_matrix.len(), 10);
    assert_eq!(result.tsne_coordinates.len(), 10);
    assert_eq!(result.n_clusters, 2);

    // Word clouds do not depend on the LLM.
    assert_eq!(result.cluster_wordclouds.len(), 2);
    for path in result.cluster_wordclouds.values() {
        assert!(Path::new(path).is_file());
    }
    assert!(options.output_dir.join("cluster_0_wordcloud.png").is_file());
    assert_eq!(ExitCode::from_run(&run), ExitCode::Success);
}

#[test]
fn test_groups_are_separated_and_narrated() {
    let temp_dir = TempDir::new().unwrap();
    write_two_groups(&production_dir(&temp_dir));

    let options = AnalysisOptions {
        n_clusters: Some(2),
        ..options_in(&temp_dir)
    };
    let run = PostProcessor::new(options)
        .with_generator(&Canned)
        .run_full_analysis()
        .unwrap();
    let result = run.result.unwrap();

    let labels = &result.cluster_labels;
    assert!(labels[..5].iter().all(|l| *l == labels[0]));
    assert!(labels[5..].iter().all(|l| *l == labels[5]));
    assert_ne!(labels[0], labels[5]);

    assert_eq!(result.cluster_summaries.len(), 2);
    assert!(
        result
            .cluster_summaries
            .values()
            .all(|s| s == "These theses study shared methods.")
    );

    // Documents within a group are linked; none across groups.
    let graph = &result.network_graph;
    assert_eq!(graph.node_count(), 10);
    for edge in graph.edges() {
        assert_eq!(edge.source < 5, edge.target < 5);
    }
    assert!(graph.edge_count() >= 20);
}

#[test]
fn test_projection_shape_for_ten_documents() {
    let temp_dir = TempDir::new().unwrap();
    let dir = production_dir(&temp_dir);
    for i in 0..10 {
        let v = i as f64;
        write_vector(
            &dir,
            i + 1,
            &format!("doc{i}"),
            "Thesis on urban planning",
            json!([v.sin(), v.cos(), v * 0.1, (v * 0.7).sin(), 1.0 - v * 0.05]),
        );
    }

    let run = PostProcessor::new(options_in(&temp_dir))
        .run_full_analysis()
        .unwrap();
    let result = run.result.unwrap();

    assert_eq!(result.tsne_coordinates.len(), 10);
    assert!(result.tsne_coordinates.iter().all(|p| p.len() == 2));
    assert!(result.tsne_coordinates.iter().flatten().all(|x| x.is_finite()));
    // k = max(2, floor(sqrt(10)))
    assert_eq!(result.n_clusters, 3);
    assert!(result.cluster_labels.iter().all(|l| (0..3).contains(&l.get())));
}

#[test]
fn test_threshold_scenario_three_documents() {
    let temp_dir = TempDir::new().unwrap();
    let dir = production_dir(&temp_dir);
    write_vector(&dir, 1, "a", "First", json!([0.1, 0.2, 0.3, 0.4, 0.5]));
    write_vector(&dir, 2, "b", "Second", json!([0.15, 0.25, 0.35, 0.45, 0.55]));
    write_vector(&dir, 3, "c", "Third", json!([0.9, 0.8, 0.7, 0.6, 0.5]));

    let options = AnalysisOptions {
        network_threshold: 0.99,
        ..options_in(&temp_dir)
    };
    let run = PostProcessor::new(options).run_full_analysis().unwrap();
    let result = run.result.unwrap();

    let sim = &result.similarity_matrix;
    assert!(sim.get(0, 1) > sim.get(0, 2));
    for i in 0..3 {
        assert!((sim.get(i, i) - 1.0).abs() < 1e-12);
        for j in 0..3 {
            assert!((sim.get(i, j) - sim.get(j, i)).abs() < 1e-12);
        }
    }

    let graph = &result.network_graph;
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!((graph.edges()[0].source, graph.edges()[0].target), (0, 1));
    assert_eq!(graph.degree(2), 0);
}

#[test]
fn test_dbscan_run() {
    let temp_dir = TempDir::new().unwrap();
    write_two_groups(&production_dir(&temp_dir));

    let options = AnalysisOptions {
        clustering_method: ClusteringMethod::Dbscan,
        ..options_in(&temp_dir)
    };
    let run: AnalysisRun = PostProcessor::new(options).run_full_analysis().unwrap();
    let result = run.result.unwrap();

    assert_eq!(result.cluster_labels.len(), 10);
    assert!(
        result
            .cluster_labels
            .iter()
            .all(|l| l.get() >= ClusterLabel::NOISE.get())
    );
}

#[test]
fn test_unsupported_method_fails_fast() {
    let mut settings = Settings::default();
    settings.analysis.clustering_method = "spectral".to_string();

    let err = AnalysisOptions::from_settings(&settings).unwrap_err();
    assert_eq!(err.status_code(), "UNSUPPORTED_METHOD");
    assert_eq!(ExitCode::from_error(&err), ExitCode::UnsupportedOperation);
}

#[test]
fn test_zero_clusters_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_two_groups(&production_dir(&temp_dir));

    let options = AnalysisOptions {
        n_clusters: Some(0),
        ..options_in(&temp_dir)
    };
    let err = PostProcessor::new(options.clone())
        .run_full_analysis()
        .unwrap_err();
    assert_eq!(err.status_code(), "INVALID_CLUSTER_COUNT");
    assert!(!options.output_json.exists());
}
